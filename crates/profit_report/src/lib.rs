pub mod merge;
pub mod pdf;
pub mod report;
pub mod summary;
pub mod xlsx;

use anyhow::{Context, Result};
use chrono::Utc;
use models::{OrderTable, ProfitSummary, Settings};
use serde::Serialize;
use std::{fs, path::Path};

pub use merge::{check_alignment, merge_costs, AlignmentError};
pub use pdf::{summary_pdf_bytes, write_summary_pdf};
pub use report::{format_currency, ReportDocument, ReportLine};
pub use summary::{compute_summary, summarize};
pub use xlsx::{orders_to_buffer, write_orders_xlsx, ORDERS_SHEET_NAME};

/// Result of one aggregation pass: the summary plus the merged table that
/// feeds the spreadsheet export.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfitReport {
    pub summary: ProfitSummary,
    pub merged: OrderTable,
}

impl ProfitReport {
    pub fn document(&self, settings: &Settings) -> ReportDocument {
        ReportDocument::from_summary(&self.summary, settings)
    }

    /// `ebay_orders_<start>_to_<end>.xlsx`
    pub fn orders_filename(&self, settings: &Settings) -> String {
        format!(
            "ebay_orders_{}.xlsx",
            self.summary.file_label(&settings.date_range_placeholder)
        )
    }

    /// `ebay_profit_summary_<start>_to_<end>.pdf`
    pub fn summary_filename(&self, settings: &Settings) -> String {
        format!(
            "ebay_profit_summary_{}.pdf",
            self.summary.file_label(&settings.date_range_placeholder)
        )
    }

    pub fn summary_json_filename(&self, settings: &Settings) -> String {
        format!(
            "ebay_profit_summary_{}.json",
            self.summary.file_label(&settings.date_range_placeholder)
        )
    }
}

#[derive(Debug, Serialize)]
pub struct SummaryOutput {
    pub generated_at: String,
    pub date_range: String,
    pub summary: ProfitSummary,
}

/// Writes the rounded summary as pretty JSON.
pub fn write_summary_json(report: &ProfitReport, settings: &Settings, path: &Path) -> Result<()> {
    let output = SummaryOutput {
        generated_at: Utc::now().to_rfc3339(),
        date_range: report
            .summary
            .display_label(&settings.date_range_placeholder),
        summary: report.summary.rounded(),
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Creating output directory {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(&output)?;
    fs::write(path, json).with_context(|| format!("Writing {}", path.display()))?;
    Ok(())
}
