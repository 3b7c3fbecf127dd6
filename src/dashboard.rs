//! Dashboard metrics and the server-rendered dashboard page.

use crate::models::{amount_json, format_amount_fixed, InvoiceRecord, RiskLevel};
use bigdecimal::BigDecimal;
use serde::Serialize;
use std::fmt::Write as _;

/// Invoice counts per risk level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RiskHistogram {
    pub low: usize,
    pub medium: usize,
    pub high: usize,
}

impl RiskHistogram {
    pub fn count_for(&self, level: RiskLevel) -> usize {
        match level {
            RiskLevel::Low => self.low,
            RiskLevel::Medium => self.medium,
            RiskLevel::High => self.high,
        }
    }

    fn record(&mut self, level: RiskLevel) {
        match level {
            RiskLevel::Low => self.low += 1,
            RiskLevel::Medium => self.medium += 1,
            RiskLevel::High => self.high += 1,
        }
    }

    /// Non-empty buckets in Low, Medium, High order.
    pub fn entries(&self) -> Vec<(RiskLevel, usize)> {
        RiskLevel::ALL
            .iter()
            .map(|level| (*level, self.count_for(*level)))
            .filter(|(_, count)| *count > 0)
            .collect()
    }
}

/// Summary figures shown above the invoice table.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Metrics {
    pub count: usize,
    #[serde(serialize_with = "amount_json::serialize")]
    pub total_amount: BigDecimal,
    pub risk_histogram: RiskHistogram,
}

pub fn summarize(records: &[InvoiceRecord]) -> Metrics {
    records.iter().fold(Metrics::default(), |mut metrics, record| {
        metrics.count += 1;
        metrics.total_amount += &record.amount;
        metrics.risk_histogram.record(record.risk_score);
        metrics
    })
}

/// Renders the dashboard page for `records`, which are expected newest first.
pub fn render_dashboard(records: &[InvoiceRecord], metrics: &Metrics) -> String {
    let mut html = String::with_capacity(2048 + records.len() * 256);

    html.push_str(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Compliance Dashboard</title>
    <style>
        body { font-family: system-ui, sans-serif; background: #030712; color: #d1d5db; margin: 0; padding: 2rem; }
        h1 { color: #fff; }
        table { width: 100%; border-collapse: collapse; background: #111827; }
        th, td { padding: 1rem; text-align: left; border-top: 1px solid #1f2937; }
        th { background: #1f2937; color: #9ca3af; text-transform: uppercase; font-size: 0.8rem; }
        .summary { display: flex; gap: 2rem; margin-bottom: 2rem; }
        .status-VALID, .risk-Low { color: #4ade80; }
        .status-PENDING, .risk-Medium { color: #facc15; }
        .status-FLAG_INVALID_GST, .risk-High { color: #f87171; }
        .empty { text-align: center; color: #6b7280; padding: 3rem; }
    </style>
</head>
<body>
    <h1>Compliance Dashboard</h1>
    <p><a href="/export">Export to CSV</a></p>
"#,
    );

    let _ = write!(
        html,
        "    <div class=\"summary\">\n        <div>Invoices: <strong>{}</strong></div>\n        <div>Total amount: <strong>&#8377;{}</strong></div>\n",
        metrics.count,
        format_amount_fixed(&metrics.total_amount)
    );
    let entries = metrics.risk_histogram.entries();
    if !entries.is_empty() {
        html.push_str("        <ul class=\"risk-histogram\">\n");
        for (level, count) in entries {
            let _ = writeln!(
                html,
                "            <li class=\"risk-{}\">{} Risk: {}</li>",
                level, level, count
            );
        }
        html.push_str("        </ul>\n");
    }
    html.push_str("    </div>\n");

    html.push_str(
        "    <table>\n        <thead>\n            <tr><th>Vendor</th><th>Invoice #</th><th>Amount</th><th>Compliance Status</th><th>Risk Level</th></tr>\n        </thead>\n        <tbody>\n",
    );

    for record in records {
        let _ = writeln!(
            html,
            "            <tr><td>{}</td><td>{}</td><td>&#8377;{}</td><td class=\"status-{}\">{}</td><td class=\"risk-{}\">{}</td></tr>",
            escape_html(or_default(&record.vendor_name, "Unknown")),
            escape_html(or_default(&record.invoice_number, "N/A")),
            format_amount_fixed(&record.amount),
            record.status,
            record.status,
            record.risk_score,
            record.risk_score,
        );
    }

    if records.is_empty() {
        html.push_str(
            "            <tr><td colspan=\"5\" class=\"empty\">No invoices processed yet. Upload one to see it here!</td></tr>\n",
        );
    }

    html.push_str("        </tbody>\n    </table>\n</body>\n</html>\n");
    html
}

fn or_default<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.trim().is_empty() {
        fallback
    } else {
        value
    }
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
