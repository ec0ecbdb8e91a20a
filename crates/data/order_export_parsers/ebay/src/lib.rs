pub mod cost_sheet;

use calamine::{Data, Reader, Xlsx};
use chrono::{Duration, NaiveDate};
use models::{
    OrderTable, PreviewRow, PreviewTable, Settings, COL_ITEM_COST, COL_ROW,
    COL_SHIPPING_MATERIAL_COST,
};
use std::{fmt, fs, io::Cursor, path::Path};
use thiserror::Error;
use tracing::{debug, info, warn};

pub use cost_sheet::{cost_sheet_to_buffer, read_cost_sheet, write_cost_sheet};

pub type Result<T> = std::result::Result<T, IngestError>;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Unsupported file type '{0}' (expected csv or xlsx)")]
    UnsupportedFormat(String),

    #[error("Could not find a header row starting with '{sentinel}'")]
    HeaderNotFound { sentinel: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("No columns selected")]
    EmptySelection,

    #[error("Unknown column '{0}'")]
    UnknownColumn(String),

    #[error("Missing required column '{0}'")]
    MissingColumn(String),

    #[error("Workbook error: {0}")]
    Workbook(#[from] rust_xlsxwriter::XlsxError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Csv,
    Xlsx,
}

impl FileFormat {
    pub fn from_extension(ext: &str) -> Result<Self> {
        match ext.trim().trim_start_matches('.').to_ascii_lowercase().as_str() {
            "csv" => Ok(FileFormat::Csv),
            "xlsx" => Ok(FileFormat::Xlsx),
            other => Err(IngestError::UnsupportedFormat(other.to_string())),
        }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("");
        Self::from_extension(ext)
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileFormat::Csv => write!(f, "csv"),
            FileFormat::Xlsx => write!(f, "xlsx"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub header_sentinel: String,
    /// Zero-based header row within the used range of the worksheet.
    pub xlsx_header_row: usize,
    /// Worksheet to read; the first one when None.
    pub sheet_name: Option<String>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

impl LoadOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            header_sentinel: settings.header_sentinel.clone(),
            xlsx_header_row: settings.xlsx_header_row,
            sheet_name: None,
        }
    }

    pub fn with_sheet(mut self, sheet_name: impl Into<String>) -> Self {
        self.sheet_name = Some(sheet_name.into());
        self
    }
}

/// Which columns end up on the editable cost sheet.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnSelection {
    /// Proposed list; entries missing from the table are dropped silently.
    Default(Vec<String>),
    /// User's choice; every entry must exist.
    Explicit(Vec<String>),
}

/// Parses an order export into the full table.
pub fn load_table(bytes: &[u8], format: FileFormat, options: &LoadOptions) -> Result<OrderTable> {
    let table = match format {
        FileFormat::Csv => load_csv(bytes, &options.header_sentinel)?,
        FileFormat::Xlsx => {
            read_xlsx_table(bytes, options.sheet_name.as_deref(), options.xlsx_header_row)?
        }
    };
    info!(
        format = %format,
        rows = table.len(),
        columns = table.columns.len(),
        "loaded order export"
    );
    Ok(table)
}

pub fn load_table_from_path<P: AsRef<Path>>(path: P, options: &LoadOptions) -> Result<OrderTable> {
    let path = path.as_ref();
    let format = FileFormat::from_path(path)?;
    let bytes = fs::read(path)?;
    load_table(&bytes, format, options)
}

fn load_csv(bytes: &[u8], sentinel: &str) -> Result<OrderTable> {
    let decoded = decode_text_lossy(bytes);

    // Reports start with banner lines (seller, period, totals) before the table
    let (header_line, csv_text) =
        slice_to_header(&decoded, sentinel).ok_or_else(|| IngestError::HeaderNotFound {
            sentinel: sentinel.to_string(),
        })?;
    debug!(line = header_line + 1, "found header row");

    parse_csv_table(csv_text)
}

/// Parses CSV text whose first line is the header. Rows with more fields than
/// the header, or that the reader rejects, are skipped; short rows are padded.
pub(crate) fn parse_csv_table(csv_text: &str) -> Result<OrderTable> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(csv_text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| IngestError::Parse(format!("cannot read header row: {}", e)))?
        .clone();
    let columns: Vec<String> = headers.iter().map(|h| h.to_string()).collect();

    let mut rows = Vec::new();
    let mut skipped = 0usize;

    for (row_idx, rec) in reader.records().enumerate() {
        let rec = match rec {
            Ok(r) => r,
            Err(e) => {
                warn!("skipping unreadable row {}: {}", row_idx + 2, e);
                skipped += 1;
                continue;
            }
        };

        if rec.len() > columns.len() {
            warn!(
                "skipping row {}: expected {} fields, saw {}",
                row_idx + 2,
                columns.len(),
                rec.len()
            );
            skipped += 1;
            continue;
        }

        if rec.iter().all(|f| f.is_empty()) {
            continue;
        }

        rows.push(rec.iter().map(|f| f.to_string()).collect());
    }

    if skipped > 0 {
        warn!("skipped {} malformed rows", skipped);
    }

    Ok(OrderTable::new(columns, rows))
}

/// Decode export bytes into text.
///
/// Exports are UTF-8, sometimes with a BOM. Invalid sequences are dropped
/// rather than failing the load.
fn decode_text_lossy(bytes: &[u8]) -> String {
    let (decoded, _, had_errors) = encoding_rs::UTF_8.decode(bytes);
    if had_errors {
        warn!("input contains invalid UTF-8; dropping undecodable bytes");
        decoded.replace('\u{FFFD}', "")
    } else {
        decoded.into_owned()
    }
}

/// Linear scan for the first line starting with `sentinel`. Returns the
/// zero-based line number and the text from that line on.
fn slice_to_header<'a>(text: &'a str, sentinel: &str) -> Option<(usize, &'a str)> {
    let mut offset = 0;
    for (line_no, line) in text.split_inclusive('\n').enumerate() {
        let probe = line.trim_start().trim_start_matches('"');
        if probe.starts_with(sentinel) {
            return Some((line_no, &text[offset..]));
        }
        offset += line.len();
    }
    None
}

pub(crate) fn read_xlsx_table(
    bytes: &[u8],
    sheet_name: Option<&str>,
    header_row: usize,
) -> Result<OrderTable> {
    let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes))
        .map_err(|e| IngestError::Parse(format!("cannot open workbook: {}", e)))?;

    let range = match sheet_name {
        Some(name) => workbook
            .worksheet_range(name)
            .map_err(|e| IngestError::Parse(format!("cannot read sheet '{}': {}", name, e)))?,
        None => workbook
            .worksheet_range_at(0)
            .ok_or_else(|| IngestError::Parse("workbook has no worksheets".to_string()))?
            .map_err(|e| IngestError::Parse(format!("cannot read first sheet: {}", e)))?,
    };

    let mut rows_iter = range.rows().skip(header_row);
    let header = rows_iter.next().ok_or_else(|| {
        IngestError::Parse(format!("worksheet has no header at row {}", header_row + 1))
    })?;
    let columns: Vec<String> = header.iter().map(|c| cell_text(c).trim().to_string()).collect();

    let rows = rows_iter
        .map(|row| row.iter().map(cell_text).collect::<Vec<_>>())
        .filter(|row| row.iter().any(|c| !c.trim().is_empty()))
        .collect();

    Ok(OrderTable::new(columns, rows))
}

/// Cell as text. Integral floats lose the trailing `.0`, Excel dates become
/// `YYYY-MM-DD`, error cells are blank.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::String(s) => s.clone(),
        Data::Float(f) => {
            if f.fract() == 0.0 && f.abs() < 1e15 {
                format!("{}", *f as i64)
            } else {
                f.to_string()
            }
        }
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => excel_serial_to_date(dt.as_f64())
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| dt.as_f64().to_string()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        // Empty and error cells
        _ => String::new(),
    }
}

/// Excel serial date conversion using 1899-12-30 base (common convention).
fn excel_serial_to_date(v: f64) -> Option<NaiveDate> {
    if !v.is_finite() {
        return None;
    }
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    base.checked_add_signed(Duration::days(v.floor() as i64))
}

/// Resolves the cost-sheet columns against the parsed table.
/// Names the cost sheet writes itself; a data column with one of these names
/// would shadow the edited value when the sheet is read back.
const RESERVED_COLUMNS: &[&str] = &[COL_ROW, COL_ITEM_COST, COL_SHIPPING_MATERIAL_COST];

pub fn select_columns(table: &OrderTable, selection: &ColumnSelection) -> Result<Vec<String>> {
    let mut selected: Vec<String> = match selection {
        ColumnSelection::Default(proposed) => proposed
            .iter()
            .filter(|c| table.has_column(c))
            .cloned()
            .collect(),
        ColumnSelection::Explicit(chosen) => {
            if let Some(unknown) = chosen.iter().find(|c| !table.has_column(c)) {
                return Err(IngestError::UnknownColumn(unknown.clone()));
            }
            chosen.clone()
        }
    };

    selected.retain(|c| {
        let reserved = RESERVED_COLUMNS.contains(&c.trim());
        if reserved {
            warn!(column = %c, "column name is reserved for the cost sheet, leaving it out");
        }
        !reserved
    });

    if selected.is_empty() {
        return Err(IngestError::EmptySelection);
    }
    Ok(selected)
}

/// Builds the editable view: selected columns plus zeroed cost cells, one
/// row per table row, each tagged with its source index.
pub fn build_preview(table: &OrderTable, selection: &ColumnSelection) -> Result<PreviewTable> {
    let columns = select_columns(table, selection)?;
    let indices: Vec<usize> = columns
        .iter()
        .filter_map(|c| table.column_index(c))
        .collect();

    let rows = table
        .rows
        .iter()
        .enumerate()
        .map(|(source_row, row)| PreviewRow {
            source_row,
            cells: indices.iter().map(|&i| row[i].clone()).collect(),
            item_cost: "0".to_string(),
            shipping_material_cost: "0".to_string(),
        })
        .collect();

    Ok(PreviewTable { columns, rows })
}

#[cfg(test)]
mod tests {
    use super::*;
    use models::{COL_CREATION_DATE, COL_ITEM_ID, COL_ORDER_EARNINGS};
    use rust_xlsxwriter::Workbook;

    const HEADER: &str = "Order creation date,Order number,Item ID,Item title,Item price,Quantity,Gross amount,Discount,Order earnings";

    fn export_with_banner(banner_lines: usize, body: &str) -> String {
        let mut s = String::new();
        for i in 0..banner_lines {
            s.push_str(&format!("Banner line {},,\n", i + 1));
        }
        s.push_str(HEADER);
        s.push('\n');
        s.push_str(body);
        s
    }

    fn body() -> &'static str {
        "2024-01-05,11-1,1001,Vintage lamp,25.00,1,25.00,0,21.40\n\
         2024-01-09,11-2,1002,\"Mug, ceramic\",10.00,2,20.00,--,17.10\n"
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(FileFormat::from_extension("CSV").unwrap(), FileFormat::Csv);
        assert_eq!(FileFormat::from_extension(".xlsx").unwrap(), FileFormat::Xlsx);
        assert_eq!(
            FileFormat::from_path(Path::new("report/Orders.XLSX")).unwrap(),
            FileFormat::Xlsx
        );
        assert!(matches!(
            FileFormat::from_extension("xls"),
            Err(IngestError::UnsupportedFormat(e)) if e == "xls"
        ));
        assert!(matches!(
            FileFormat::from_path(Path::new("no_extension")),
            Err(IngestError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_header_found_after_banner_lines() {
        let csv = export_with_banner(14, body());
        let table = load_table(csv.as_bytes(), FileFormat::Csv, &LoadOptions::default()).unwrap();

        assert_eq!(table.columns[0], COL_CREATION_DATE);
        assert_eq!(table.len(), 2);
        assert_eq!(table.cell(1, "Item title"), Some("Mug, ceramic"));
        assert_eq!(table.cell(1, "Discount"), Some("--"));
    }

    #[test]
    fn test_header_line_number() {
        let csv = export_with_banner(14, body());
        let (line, rest) = slice_to_header(&csv, "Order creation date").unwrap();
        assert_eq!(line, 14);
        assert!(rest.starts_with(HEADER));
    }

    #[test]
    fn test_missing_header() {
        let csv = "Some report\nDate,Amount\n2024-01-01,5\n";
        let err = load_table(csv.as_bytes(), FileFormat::Csv, &LoadOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            IngestError::HeaderNotFound { ref sentinel } if sentinel == "Order creation date"
        ));
    }

    #[test]
    fn test_bom_and_invalid_bytes_are_tolerated() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice(b"Seller report \xff\xfe\n");
        bytes.extend_from_slice(export_with_banner(0, body()).as_bytes());

        let table = load_table(&bytes, FileFormat::Csv, &LoadOptions::default()).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.cell(0, COL_ITEM_ID), Some("1001"));
    }

    #[test]
    fn test_quoted_header_is_found() {
        let csv = "banner\n\"Order creation date\",\"Order earnings\"\n2024-02-01,5.00\n";
        let table = load_table(csv.as_bytes(), FileFormat::Csv, &LoadOptions::default()).unwrap();
        assert_eq!(table.cell(0, COL_ORDER_EARNINGS), Some("5.00"));
    }

    #[test]
    fn test_bad_lines_are_skipped() {
        let body = "2024-01-05,11-1,1001,Lamp,25.00,1,25.00,0,21.40\n\
                    2024-01-06,11-9,1009,Too,many,fields,in,this,row,x,y\n\
                    ,,,,,,,,\n\
                    2024-01-07,11-3,1003,Short row\n";
        let csv = export_with_banner(2, body);
        let table = load_table(csv.as_bytes(), FileFormat::Csv, &LoadOptions::default()).unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.cell(1, COL_ITEM_ID), Some("1003"));
        assert_eq!(table.cell(1, COL_ORDER_EARNINGS), Some(""));
    }

    #[test]
    fn test_custom_sentinel() {
        let csv = "x\nDate,Earnings\n2024-01-01,3\n";
        let options = LoadOptions {
            header_sentinel: "Date,".to_string(),
            ..LoadOptions::default()
        };
        let table = load_table(csv.as_bytes(), FileFormat::Csv, &options).unwrap();
        assert_eq!(table.columns, vec!["Date", "Earnings"]);
    }

    fn sample_workbook() -> Vec<u8> {
        let mut workbook = Workbook::new();
        let ws = workbook.add_worksheet();
        ws.write_string(0, 0, COL_CREATION_DATE).unwrap();
        ws.write_string(0, 1, COL_ITEM_ID).unwrap();
        ws.write_string(0, 2, COL_ORDER_EARNINGS).unwrap();
        ws.write_string(1, 0, "2024-03-01").unwrap();
        ws.write_number(1, 1, 1001.0).unwrap();
        ws.write_number(1, 2, 12.5).unwrap();
        ws.write_string(3, 0, "2024-03-02").unwrap();
        ws.write_number(3, 1, 1002.0).unwrap();
        ws.write_string(3, 2, "--").unwrap();
        workbook.save_to_buffer().unwrap()
    }

    #[test]
    fn test_xlsx_reads_header_row_directly() {
        let bytes = sample_workbook();
        let table = load_table(&bytes, FileFormat::Xlsx, &LoadOptions::default()).unwrap();

        assert_eq!(table.columns, vec![COL_CREATION_DATE, COL_ITEM_ID, COL_ORDER_EARNINGS]);
        // empty row 2 is dropped
        assert_eq!(table.len(), 2);
        assert_eq!(table.cell(0, COL_ITEM_ID), Some("1001"));
        assert_eq!(table.cell(0, COL_ORDER_EARNINGS), Some("12.5"));
        assert_eq!(table.cell(1, COL_ORDER_EARNINGS), Some("--"));
    }

    #[test]
    fn test_xlsx_named_sheet() {
        let bytes = sample_workbook();
        let options = LoadOptions::default().with_sheet("Sheet1");
        assert_eq!(load_table(&bytes, FileFormat::Xlsx, &options).unwrap().len(), 2);

        let options = LoadOptions::default().with_sheet("Orders");
        let err = load_table(&bytes, FileFormat::Xlsx, &options).unwrap_err();
        assert!(matches!(err, IngestError::Parse(_)));
    }

    #[test]
    fn test_xlsx_garbage_is_parse_error() {
        let err = load_table(b"not a zip", FileFormat::Xlsx, &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, IngestError::Parse(_)));
    }

    #[test]
    fn test_excel_serial_dates() {
        assert_eq!(
            excel_serial_to_date(45292.0),
            NaiveDate::from_ymd_opt(2024, 1, 1)
        );
        assert_eq!(excel_serial_to_date(f64::NAN), None);
    }

    #[test]
    fn test_default_selection_drops_absent_columns() {
        let table = OrderTable::new(
            vec![COL_ITEM_ID.into(), COL_ORDER_EARNINGS.into()],
            vec![vec!["1".into(), "2".into()]],
        );
        let selected =
            select_columns(&table, &ColumnSelection::Default(models::default_preview_columns()))
                .unwrap();
        assert_eq!(selected, vec![COL_ITEM_ID, COL_ORDER_EARNINGS]);
    }

    #[test]
    fn test_empty_selection() {
        let table = OrderTable::new(vec![COL_ITEM_ID.into()], vec![vec!["1".into()]]);
        let err = build_preview(&table, &ColumnSelection::Explicit(Vec::new())).unwrap_err();
        assert!(matches!(err, IngestError::EmptySelection));

        // nothing from the default list present
        let err = build_preview(
            &table,
            &ColumnSelection::Default(vec!["Quantity".to_string()]),
        )
        .unwrap_err();
        assert!(matches!(err, IngestError::EmptySelection));
    }

    #[test]
    fn test_explicit_selection_rejects_unknown() {
        let table = OrderTable::new(vec![COL_ITEM_ID.into()], vec![vec!["1".into()]]);
        let err = select_columns(
            &table,
            &ColumnSelection::Explicit(vec![COL_ITEM_ID.into(), "Buyer".into()]),
        )
        .unwrap_err();
        assert!(matches!(err, IngestError::UnknownColumn(c) if c == "Buyer"));
    }

    #[test]
    fn test_reserved_columns_are_left_out() {
        let table = OrderTable::new(
            vec![
                COL_ITEM_ID.into(),
                "Row".into(),
                "Item Cost".into(),
                "Shipping Material Cost".into(),
            ],
            vec![vec!["1".into(), "9".into(), "3.50".into(), "1.25".into()]],
        );
        let preview = build_preview(
            &table,
            &ColumnSelection::Explicit(vec![
                "Row".into(),
                COL_ITEM_ID.into(),
                "Item Cost".into(),
                "Shipping Material Cost".into(),
            ]),
        )
        .unwrap();

        assert_eq!(preview.columns, vec![COL_ITEM_ID]);
        assert_eq!(
            preview.header(),
            vec![COL_ITEM_ID, "Item Cost", "Shipping Material Cost"]
        );

        // only reserved names chosen
        let err = select_columns(&table, &ColumnSelection::Explicit(vec!["Item Cost".into()]))
            .unwrap_err();
        assert!(matches!(err, IngestError::EmptySelection));
    }

    #[test]
    fn test_preview_rows_are_tagged_and_zeroed() {
        let csv = export_with_banner(3, body());
        let table = load_table(csv.as_bytes(), FileFormat::Csv, &LoadOptions::default()).unwrap();
        let preview = build_preview(
            &table,
            &ColumnSelection::Explicit(vec![COL_ORDER_EARNINGS.into(), COL_ITEM_ID.into()]),
        )
        .unwrap();

        assert_eq!(preview.len(), 2);
        assert_eq!(preview.rows[1].source_row, 1);
        assert_eq!(preview.rows[1].cells, vec!["17.10", "1002"]);
        assert_eq!(preview.rows[1].item_cost, "0");
        assert_eq!(preview.rows[1].shipping_material_cost, "0");
        assert_eq!(preview.header().len(), 4);
        // full table keeps every column
        assert_eq!(table.columns.len(), 9);
    }
}
