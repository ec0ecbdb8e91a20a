use models::{OrderTable, PreviewTable, COL_ITEM_COST, COL_SHIPPING_MATERIAL_COST};
use thiserror::Error;
use tracing::warn;

/// The cost sheet no longer lines up one-to-one with the export it came from.
/// Row numbers in messages are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AlignmentError {
    #[error("cost sheet has {edited} rows but the export has {expected}")]
    RowCount { expected: usize, edited: usize },

    #[error("cost sheet line {line} points at row {row}, past the end of the export ({len} rows)")]
    OutOfRange { line: usize, row: usize, len: usize },

    #[error("cost sheet line {line} holds row {found} where row {expected} was expected (rows reordered, duplicated or removed)")]
    OutOfOrder {
        line: usize,
        expected: usize,
        found: usize,
    },
}

/// Requires the edited view to cover every export row exactly once, in order.
pub fn check_alignment(full: &OrderTable, edited: &PreviewTable) -> Result<(), AlignmentError> {
    for (pos, row) in edited.rows.iter().enumerate() {
        if row.source_row >= full.len() {
            return Err(AlignmentError::OutOfRange {
                line: pos + 1,
                row: row.source_row + 1,
                len: full.len(),
            });
        }
        if row.source_row != pos {
            return Err(AlignmentError::OutOfOrder {
                line: pos + 1,
                expected: pos + 1,
                found: row.source_row + 1,
            });
        }
    }

    if edited.len() != full.len() {
        return Err(AlignmentError::RowCount {
            expected: full.len(),
            edited: edited.len(),
        });
    }
    Ok(())
}

/// Copies the full table and overwrites both cost columns from the edited
/// view, matching on each preview row's source index.
///
/// Rows without an edit keep any cost already in the table, else `"0"`.
/// Edits pointing past the table are dropped.
pub fn merge_costs(full: &OrderTable, edited: &PreviewTable) -> OrderTable {
    let existing = |row: usize, col: &str| {
        full.cell(row, col)
            .filter(|v| !v.trim().is_empty())
            .unwrap_or("0")
            .to_string()
    };
    let mut item_costs: Vec<String> = (0..full.len()).map(|i| existing(i, COL_ITEM_COST)).collect();
    let mut shipping_costs: Vec<String> = (0..full.len())
        .map(|i| existing(i, COL_SHIPPING_MATERIAL_COST))
        .collect();

    let mut dropped = 0usize;
    for row in &edited.rows {
        match (
            item_costs.get_mut(row.source_row),
            shipping_costs.get_mut(row.source_row),
        ) {
            (Some(item), Some(shipping)) => {
                *item = row.item_cost.clone();
                *shipping = row.shipping_material_cost.clone();
            }
            _ => dropped += 1,
        }
    }
    if dropped > 0 {
        warn!("ignored {} cost edits that point past the end of the export", dropped);
    }

    let mut merged = full.clone();
    merged.set_column(COL_ITEM_COST, item_costs);
    merged.set_column(COL_SHIPPING_MATERIAL_COST, shipping_costs);
    merged
}
