use models::{round2, ProfitSummary, Settings};
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct ReportLine {
    pub label: String,
    pub amount: f64,
}

/// Fixed-layout summary: a title, then revenue, item costs, shipping costs,
/// returns, combined costs and net profit, in that order.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportDocument {
    pub title: String,
    pub currency_symbol: String,
    pub lines: Vec<ReportLine>,
}

impl ReportDocument {
    pub fn from_summary(summary: &ProfitSummary, settings: &Settings) -> Self {
        let s = summary.rounded();
        let line = |label: &str, amount: f64| ReportLine {
            label: label.to_string(),
            amount,
        };

        Self {
            title: format!(
                "eBay Profit Summary ({})",
                summary.display_label(&settings.date_range_placeholder)
            ),
            currency_symbol: settings.currency_symbol.clone(),
            lines: vec![
                line("Total Revenue", s.revenue_total),
                line("Total Item Costs", s.item_cost_total),
                line("Total Shipping Material Costs", s.shipping_cost_total),
                line("Total Returns", s.returns_total),
                line("Combined Costs", s.combined_costs),
                line("Net Profit", s.net_profit),
            ],
        }
    }

    /// `Label: $1,234.56` for each line.
    pub fn formatted_lines(&self) -> Vec<String> {
        self.lines
            .iter()
            .map(|l| format!("{}: {}", l.label, format_currency(l.amount, &self.currency_symbol)))
            .collect()
    }
}

impl fmt::Display for ReportDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.title)?;
        for line in self.formatted_lines() {
            writeln!(f, "  {}", line)?;
        }
        Ok(())
    }
}

/// Symbol, then the amount grouped by thousands with two decimals. The sign
/// goes after the symbol: `$-1,234.50`.
pub fn format_currency(amount: f64, symbol: &str) -> String {
    let amount = round2(amount);
    let sign = if amount < 0.0 { "-" } else { "" };
    let fixed = format!("{:.2}", amount.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    format!("{}{}{}.{}", symbol, sign, group_thousands(int_part), frac_part)
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
