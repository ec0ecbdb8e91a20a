//! Flat spreadsheet export of the merged table.

use anyhow::{Context, Result};
use models::{
    coerce, OrderTable, COL_DISCOUNT, COL_GROSS_AMOUNT, COL_ITEM_COST, COL_ITEM_PRICE,
    COL_ORDER_EARNINGS, COL_QUANTITY, COL_REFUND_AMOUNT, COL_SHIPPING_MATERIAL_COST,
};
use rust_xlsxwriter::{Format, Workbook};
use std::path::Path;
use tracing::info;

pub const ORDERS_SHEET_NAME: &str = "eBay Data";

/// Columns written as numbers when their cell parses; everything else stays
/// text so identifiers keep every digit.
const NUMERIC_COLUMNS: &[&str] = &[
    COL_ITEM_PRICE,
    COL_QUANTITY,
    COL_GROSS_AMOUNT,
    COL_DISCOUNT,
    COL_ORDER_EARNINGS,
    COL_REFUND_AMOUNT,
    COL_ITEM_COST,
    COL_SHIPPING_MATERIAL_COST,
];

pub fn write_orders_xlsx(merged: &OrderTable, path: &Path) -> Result<()> {
    let mut workbook = build_workbook(merged)?;
    workbook
        .save(path)
        .with_context(|| format!("Failed to save Excel file: {}", path.display()))?;
    info!(path = %path.display(), rows = merged.len(), "wrote orders workbook");
    Ok(())
}

pub fn orders_to_buffer(merged: &OrderTable) -> Result<Vec<u8>> {
    let mut workbook = build_workbook(merged)?;
    Ok(workbook.save_to_buffer()?)
}

fn build_workbook(merged: &OrderTable) -> Result<Workbook> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();
    let money = Format::new().set_num_format("#,##0.00");
    let ws = workbook.add_worksheet();
    ws.set_name(ORDERS_SHEET_NAME)?;

    let numeric: Vec<bool> = merged
        .columns
        .iter()
        .map(|c| NUMERIC_COLUMNS.contains(&c.trim()))
        .collect();

    for (c, name) in merged.columns.iter().enumerate() {
        ws.write_string_with_format(0, c as u16, name, &bold)?;
    }

    for (r, row) in merged.rows.iter().enumerate() {
        let xr = (r + 1) as u32;
        for (c, cell) in row.iter().enumerate() {
            let xc = c as u16;
            match coerce::parse_amount(cell).filter(|_| numeric[c]) {
                Some(v) if merged.columns[c].trim() == COL_QUANTITY => {
                    ws.write_number(xr, xc, v)?;
                }
                Some(v) => {
                    ws.write_number_with_format(xr, xc, v, &money)?;
                }
                None => {
                    ws.write_string(xr, xc, cell)?;
                }
            }
        }
    }

    ws.set_freeze_panes(1, 0)?;
    ws.autofit();
    Ok(workbook)
}
