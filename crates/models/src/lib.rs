pub mod coerce;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// Source columns of the eBay "Order earnings" report
pub const COL_CREATION_DATE: &str = "Order creation date";
pub const COL_ITEM_ID: &str = "Item ID";
pub const COL_ITEM_TITLE: &str = "Item title";
pub const COL_ITEM_PRICE: &str = "Item price";
pub const COL_QUANTITY: &str = "Quantity";
pub const COL_GROSS_AMOUNT: &str = "Gross amount";
pub const COL_DISCOUNT: &str = "Discount";
pub const COL_ORDER_EARNINGS: &str = "Order earnings";
pub const COL_REFUND_AMOUNT: &str = "Refund amount";

// Columns added for manual cost entry
pub const COL_ITEM_COST: &str = "Item Cost";
pub const COL_SHIPPING_MATERIAL_COST: &str = "Shipping Material Cost";

/// Row number column of the cost sheet (1-based index into the source table).
pub const COL_ROW: &str = "Row";

pub const DEFAULT_HEADER_SENTINEL: &str = COL_CREATION_DATE;
pub const DEFAULT_DATE_RANGE_PLACEHOLDER: &str = "unknown_date_range";

pub fn default_preview_columns() -> Vec<String> {
	[
		COL_CREATION_DATE,
		COL_ITEM_ID,
		COL_ITEM_TITLE,
		COL_ITEM_PRICE,
		COL_QUANTITY,
		COL_GROSS_AMOUNT,
		COL_DISCOUNT,
		COL_ORDER_EARNINGS,
	]
	.iter()
	.map(|c| c.to_string())
	.collect()
}

// Settings models
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
	/// Text the real header line of a CSV export starts with.
	pub header_sentinel: String,
	/// Columns proposed for the cost sheet when none are given explicitly.
	pub preview_columns: Vec<String>,
	/// Label used in titles and filenames when no creation date parses.
	pub date_range_placeholder: String,
	/// Zero-based header row for spreadsheet input.
	pub xlsx_header_row: usize,
	pub currency_symbol: String,
}

impl Default for Settings {
	fn default() -> Self {
		Self {
			header_sentinel: DEFAULT_HEADER_SENTINEL.to_string(),
			preview_columns: default_preview_columns(),
			date_range_placeholder: DEFAULT_DATE_RANGE_PLACEHOLDER.to_string(),
			xlsx_header_row: 0,
			currency_symbol: "$".to_string(),
		}
	}
}

/// The full parsed export. Cells are kept as raw text so that every original
/// column survives merging and export untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderTable {
	pub columns: Vec<String>,
	pub rows: Vec<Vec<String>>,
}

impl OrderTable {
	/// Builds a table, padding or truncating every row to the column count.
	pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
		let width = columns.len();
		let rows = rows
			.into_iter()
			.map(|mut row| {
				row.resize(width, String::new());
				row
			})
			.collect();
		Self { columns, rows }
	}

	pub fn len(&self) -> usize {
		self.rows.len()
	}

	pub fn is_empty(&self) -> bool {
		self.rows.is_empty()
	}

	pub fn column_index(&self, name: &str) -> Option<usize> {
		self.columns.iter().position(|c| c.trim() == name)
	}

	pub fn has_column(&self, name: &str) -> bool {
		self.column_index(name).is_some()
	}

	pub fn cell(&self, row: usize, name: &str) -> Option<&str> {
		let idx = self.column_index(name)?;
		self.rows.get(row)?.get(idx).map(|s| s.as_str())
	}

	/// Overwrites column `name`, appending it first if the table lacks it.
	/// Missing values are filled with an empty cell.
	pub fn set_column<I>(&mut self, name: &str, values: I)
	where
		I: IntoIterator<Item = String>,
	{
		let idx = match self.column_index(name) {
			Some(i) => i,
			None => {
				self.columns.push(name.to_string());
				for row in self.rows.iter_mut() {
					row.push(String::new());
				}
				self.columns.len() - 1
			}
		};

		let mut values = values.into_iter();
		for row in self.rows.iter_mut() {
			row[idx] = values.next().unwrap_or_default();
		}
	}

	/// Typed view over every row. Coercion never fails.
	pub fn records(&self) -> Vec<OrderRecord> {
		let col = |name: &str| self.column_index(name);
		let idx_date = col(COL_CREATION_DATE);
		let idx_item_id = col(COL_ITEM_ID);
		let idx_title = col(COL_ITEM_TITLE);
		let idx_price = col(COL_ITEM_PRICE);
		let idx_qty = col(COL_QUANTITY);
		let idx_gross = col(COL_GROSS_AMOUNT);
		let idx_discount = col(COL_DISCOUNT);
		let idx_earnings = col(COL_ORDER_EARNINGS);
		let idx_refund = col(COL_REFUND_AMOUNT);
		let idx_item_cost = col(COL_ITEM_COST);
		let idx_shipping = col(COL_SHIPPING_MATERIAL_COST);

		self.rows
			.iter()
			.map(|row| {
				let get = |idx: Option<usize>| idx.and_then(|i| row.get(i)).map(|s| s.as_str());
				OrderRecord {
					creation_date: get(idx_date).and_then(coerce::parse_date),
					item_id: get(idx_item_id).unwrap_or("").trim().to_string(),
					item_title: get(idx_title).unwrap_or("").trim().to_string(),
					item_price: get(idx_price).and_then(coerce::parse_amount),
					quantity: get(idx_qty).map(coerce::parse_quantity).unwrap_or(0),
					gross_amount: get(idx_gross).and_then(coerce::parse_amount),
					discount: get(idx_discount).and_then(coerce::parse_amount),
					order_earnings: get(idx_earnings).and_then(coerce::parse_amount),
					refund_amount: get(idx_refund).map(coerce::amount_or_zero).unwrap_or(0.0),
					item_cost: get(idx_item_cost).map(coerce::amount_or_zero).unwrap_or(0.0),
					shipping_material_cost: get(idx_shipping)
						.map(coerce::amount_or_zero)
						.unwrap_or(0.0),
				}
			})
			.collect()
	}
}

/// One order line with every field coerced to its semantic type.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderRecord {
	pub creation_date: Option<NaiveDate>,
	pub item_id: String,
	pub item_title: String,
	pub item_price: Option<f64>,
	pub quantity: u32,
	pub gross_amount: Option<f64>,
	pub discount: Option<f64>,
	pub order_earnings: Option<f64>,
	pub refund_amount: f64,
	pub item_cost: f64,
	pub shipping_material_cost: f64,
}

/// The editable surface handed to the user: selected columns plus the two
/// cost columns. Each row remembers which source row it came from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreviewTable {
	pub columns: Vec<String>,
	pub rows: Vec<PreviewRow>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PreviewRow {
	/// Zero-based index of the row in the full `OrderTable`.
	pub source_row: usize,
	pub cells: Vec<String>,
	pub item_cost: String,
	pub shipping_material_cost: String,
}

impl PreviewTable {
	pub fn len(&self) -> usize {
		self.rows.len()
	}

	pub fn is_empty(&self) -> bool {
		self.rows.is_empty()
	}

	/// Column headers as shown to the user, cost columns last.
	pub fn header(&self) -> Vec<String> {
		let mut header = self.columns.clone();
		header.push(COL_ITEM_COST.to_string());
		header.push(COL_SHIPPING_MATERIAL_COST.to_string());
		header
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
	pub start: NaiveDate,
	pub end: NaiveDate,
}

impl DateRange {
	/// Smallest range covering every date, or None for an empty input.
	pub fn from_dates<I>(dates: I) -> Option<Self>
	where
		I: IntoIterator<Item = NaiveDate>,
	{
		dates.into_iter().fold(None, |acc, d| match acc {
			None => Some(DateRange { start: d, end: d }),
			Some(r) => Some(DateRange {
				start: r.start.min(d),
				end: r.end.max(d),
			}),
		})
	}

	/// e.g. `2024-01-01_to_2024-12-31`
	pub fn file_label(&self) -> String {
		format!(
			"{}_to_{}",
			self.start.format("%Y-%m-%d"),
			self.end.format("%Y-%m-%d")
		)
	}

	/// e.g. `Jan 01, 2024 - Dec 31, 2024`
	pub fn display_label(&self) -> String {
		format!(
			"{} - {}",
			self.start.format("%b %d, %Y"),
			self.end.format("%b %d, %Y")
		)
	}
}

// Output models
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfitSummary {
	pub revenue_total: f64,
	pub item_cost_total: f64,
	pub shipping_cost_total: f64,
	/// Refunds as a negative number (money lost).
	pub returns_total: f64,
	pub combined_costs: f64,
	pub net_profit: f64,
	pub date_range: Option<DateRange>,
	pub row_count: usize,
}

impl ProfitSummary {
	/// Copy with every amount rounded to cents, for display only.
	pub fn rounded(&self) -> Self {
		Self {
			revenue_total: round2(self.revenue_total),
			item_cost_total: round2(self.item_cost_total),
			shipping_cost_total: round2(self.shipping_cost_total),
			returns_total: round2(self.returns_total),
			combined_costs: round2(self.combined_costs),
			net_profit: round2(self.net_profit),
			date_range: self.date_range,
			row_count: self.row_count,
		}
	}

	pub fn file_label(&self, placeholder: &str) -> String {
		self.date_range
			.map(|r| r.file_label())
			.unwrap_or_else(|| placeholder.to_string())
	}

	pub fn display_label(&self, placeholder: &str) -> String {
		self.date_range
			.map(|r| r.display_label())
			.unwrap_or_else(|| placeholder.to_string())
	}
}

pub fn round2(v: f64) -> f64 {
	let r = (v * 100.0).round() / 100.0;
	// avoid printing "-0.00"
	if r == 0.0 { 0.0 } else { r }
}
