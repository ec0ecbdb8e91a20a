use models::{DateRange, OrderTable, PreviewTable, ProfitSummary};
use tracing::debug;

use crate::{merge::merge_costs, ProfitReport};

/// Merges the edited costs into the full table and summarizes it.
///
/// Never fails: unreadable numbers count as zero and unreadable dates are
/// left out of the date range only. Alignment is the caller's concern, see
/// [`crate::check_alignment`].
pub fn compute_summary(full: &OrderTable, edited: &PreviewTable) -> ProfitReport {
    let merged = merge_costs(full, edited);
    let summary = summarize(&merged);
    ProfitReport { summary, merged }
}

/// Totals over an already merged table. Pure; the same table always gives
/// the same summary.
///
/// Returns are reported but not taken out of net profit.
pub fn summarize(merged: &OrderTable) -> ProfitSummary {
    let records = merged.records();

    let revenue_total: f64 = records.iter().filter_map(|r| r.order_earnings).sum();
    let item_cost_total: f64 = records.iter().map(|r| r.item_cost).sum();
    let shipping_cost_total: f64 = records.iter().map(|r| r.shipping_material_cost).sum();

    // Refunds show as money lost whichever sign the export uses
    let refunds: f64 = records.iter().map(|r| r.refund_amount.abs()).sum();
    let returns_total = if refunds == 0.0 { 0.0 } else { -refunds };

    let combined_costs = item_cost_total + shipping_cost_total;
    let net_profit = revenue_total - combined_costs;

    let date_range = DateRange::from_dates(records.iter().filter_map(|r| r.creation_date));
    let undated = records.iter().filter(|r| r.creation_date.is_none()).count();
    if undated > 0 {
        debug!("{} rows without a readable creation date", undated);
    }

    ProfitSummary {
        revenue_total,
        item_cost_total,
        shipping_cost_total,
        returns_total,
        combined_costs,
        net_profit,
        date_range,
        row_count: records.len(),
    }
}
