//! The editable cost sheet: the preview written out for the user to fill in
//! with any spreadsheet program, then read back.
//!
//! Layout: `Row` (1-based source row), the selected columns, `Item Cost`,
//! `Shipping Material Cost`. The `Row` column is what keeps edits attached to
//! the right order when the sheet comes back.

use models::{
    coerce, OrderTable, PreviewRow, PreviewTable, COL_ITEM_COST, COL_ROW,
    COL_SHIPPING_MATERIAL_COST,
};
use rust_xlsxwriter::{Format, Workbook, Worksheet};
use std::path::Path;
use tracing::info;

use crate::{decode_text_lossy, parse_csv_table, read_xlsx_table, FileFormat, IngestError, Result};

pub const COST_SHEET_NAME: &str = "Costs";

pub fn write_cost_sheet<P: AsRef<Path>>(preview: &PreviewTable, path: P) -> Result<()> {
    let path = path.as_ref();
    let mut workbook = build_workbook(preview)?;
    workbook.save(path)?;
    info!(path = %path.display(), rows = preview.len(), "wrote cost sheet");
    Ok(())
}

pub fn cost_sheet_to_buffer(preview: &PreviewTable) -> Result<Vec<u8>> {
    let mut workbook = build_workbook(preview)?;
    Ok(workbook.save_to_buffer()?)
}

fn build_workbook(preview: &PreviewTable) -> Result<Workbook> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();
    let ws = workbook.add_worksheet();
    ws.set_name(COST_SHEET_NAME)?;

    ws.write_string_with_format(0, 0, COL_ROW, &bold)?;
    for (c, name) in preview.header().iter().enumerate() {
        ws.write_string_with_format(0, (c + 1) as u16, name, &bold)?;
    }

    let cost_col = (preview.columns.len() + 1) as u16;
    for (i, row) in preview.rows.iter().enumerate() {
        let r = (i + 1) as u32;
        ws.write_number(r, 0, (row.source_row + 1) as f64)?;
        for (c, cell) in row.cells.iter().enumerate() {
            ws.write_string(r, (c + 1) as u16, cell)?;
        }
        write_cost(ws, r, cost_col, &row.item_cost)?;
        write_cost(ws, r, cost_col + 1, &row.shipping_material_cost)?;
    }

    ws.set_freeze_panes(1, 0)?;
    Ok(workbook)
}

fn write_cost(ws: &mut Worksheet, row: u32, col: u16, value: &str) -> Result<()> {
    match coerce::parse_amount(value) {
        Some(v) => ws.write_number(row, col, v)?,
        None => ws.write_string(row, col, value)?,
    };
    Ok(())
}

/// Reads an edited cost sheet (xlsx or csv) back into a preview.
///
/// `Row`, `Item Cost` and `Shipping Material Cost` are required. Cost cells
/// are kept verbatim; coercion happens at aggregation time.
pub fn read_cost_sheet(bytes: &[u8], format: FileFormat) -> Result<PreviewTable> {
    let table = match format {
        FileFormat::Csv => parse_csv_table(&decode_text_lossy(bytes))?,
        FileFormat::Xlsx => read_xlsx_table(bytes, None, 0)?,
    };
    preview_from_table(&table)
}

fn preview_from_table(table: &OrderTable) -> Result<PreviewTable> {
    let require = |name: &str| {
        table
            .column_index(name)
            .ok_or_else(|| IngestError::MissingColumn(name.to_string()))
    };
    let idx_row = require(COL_ROW)?;
    let idx_item = require(COL_ITEM_COST)?;
    let idx_ship = require(COL_SHIPPING_MATERIAL_COST)?;

    let data_idx: Vec<usize> = (0..table.columns.len())
        .filter(|i| ![idx_row, idx_item, idx_ship].contains(i))
        .collect();
    let columns = data_idx.iter().map(|&i| table.columns[i].clone()).collect();

    let mut rows = Vec::with_capacity(table.len());
    for (n, row) in table.rows.iter().enumerate() {
        let raw = row[idx_row].trim();
        let source_row = parse_row_number(raw).ok_or_else(|| {
            IngestError::Parse(format!(
                "cost sheet line {}: invalid {} value '{}'",
                n + 2,
                COL_ROW,
                raw
            ))
        })?;

        rows.push(PreviewRow {
            source_row,
            cells: data_idx.iter().map(|&i| row[i].clone()).collect(),
            item_cost: row[idx_item].clone(),
            shipping_material_cost: row[idx_ship].clone(),
        });
    }

    Ok(PreviewTable { columns, rows })
}

/// 1-based row number to zero-based index.
fn parse_row_number(raw: &str) -> Option<usize> {
    let v = coerce::parse_amount(raw)?;
    if v >= 1.0 && v.fract() == 0.0 {
        Some(v as usize - 1)
    } else {
        None
    }
}
