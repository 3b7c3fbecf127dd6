/// Property-based tests using proptest
/// Tests invariants that should hold for all inputs
use bigdecimal::BigDecimal;
use chrono::{NaiveDate, Utc};
use invoice_intake::compliance::evaluate;
use invoice_intake::csv_export::to_csv;
use invoice_intake::dashboard::summarize;
use invoice_intake::models::{ComplianceStatus, ExtractedFields, InvoiceRecord, RiskLevel};
use proptest::prelude::*;

fn fields(
    vendor: String,
    amount: u64,
    gstin: Option<String>,
    tax_rate: Option<f64>,
) -> ExtractedFields {
    ExtractedFields {
        vendor_name: vendor,
        invoice_number: "INV".to_string(),
        amount: BigDecimal::from(amount),
        date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        gstin,
        tax_rate,
    }
}

/// `cents` is the amount in hundredths, so fractional totals are exercised.
fn record(id: i64, vendor: String, cents: u32, risk: RiskLevel) -> InvoiceRecord {
    InvoiceRecord {
        id,
        vendor_name: vendor,
        invoice_number: format!("INV-{}", id),
        amount: BigDecimal::new(cents.into(), 2),
        date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        gstin: None,
        tax_rate: None,
        status: ComplianceStatus::FlagInvalidGst,
        risk_score: risk,
        file_url: None,
        created_at: Utc::now(),
    }
}

fn risk_strategy() -> impl Strategy<Value = RiskLevel> {
    prop_oneof![
        Just(RiskLevel::Low),
        Just(RiskLevel::Medium),
        Just(RiskLevel::High)
    ]
}

// Property: the compliance verdict only depends on GSTIN / tax-rate presence
proptest! {
    #[test]
    fn missing_gstin_is_always_high_risk(
        vendor in "\\PC*",
        amount in 0u64..1_000_000_000,
        tax_rate in proptest::option::of(0.0f64..100.0)
    ) {
        prop_assert_eq!(
            evaluate(&fields(vendor, amount, None, tax_rate)),
            (ComplianceStatus::FlagInvalidGst, RiskLevel::High)
        );
    }

    #[test]
    fn gstin_without_tax_rate_is_pending(
        vendor in "\\PC*",
        amount in 0u64..1_000_000_000,
        gstin in "[0-9A-Z]{15}"
    ) {
        prop_assert_eq!(
            evaluate(&fields(vendor, amount, Some(gstin), None)),
            (ComplianceStatus::Pending, RiskLevel::Medium)
        );
    }

    #[test]
    fn gstin_and_tax_rate_is_valid(
        vendor in "\\PC*",
        amount in 0u64..1_000_000_000,
        gstin in "[0-9A-Z]{15}",
        tax_rate in 0.0f64..100.0
    ) {
        prop_assert_eq!(
            evaluate(&fields(vendor, amount, Some(gstin), Some(tax_rate))),
            (ComplianceStatus::Valid, RiskLevel::Low)
        );
    }
}

// Property: metrics agree with the records they summarize
proptest! {
    #[test]
    fn summary_counts_every_record(
        items in proptest::collection::vec((0u32..100_000, risk_strategy()), 0..50)
    ) {
        let records: Vec<InvoiceRecord> = items
            .iter()
            .enumerate()
            .map(|(i, (cents, risk))| record(i as i64 + 1, "V".to_string(), *cents, *risk))
            .collect();

        let metrics = summarize(&records);
        let expected_cents: u64 = items.iter().map(|(c, _)| u64::from(*c)).sum();

        prop_assert_eq!(metrics.count, records.len());
        prop_assert_eq!(metrics.total_amount, BigDecimal::new(expected_cents.into(), 2));

        let histogram = metrics.risk_histogram;
        prop_assert_eq!(histogram.low + histogram.medium + histogram.high, records.len());
        for (_, count) in histogram.entries() {
            prop_assert!(count > 0);
        }
    }
}

// Property: CSV has one line per record plus the header
proptest! {
    #[test]
    fn csv_has_header_plus_one_line_per_record(
        vendors in proptest::collection::vec("[^\\r\\n]*", 1..20)
    ) {
        let records: Vec<InvoiceRecord> = vendors
            .into_iter()
            .enumerate()
            .map(|(i, v)| record(i as i64 + 1, v, 1000, RiskLevel::High))
            .collect();

        let csv = to_csv(&records);
        prop_assert_eq!(csv.split('\n').count(), records.len() + 1);
        prop_assert!(!csv.ends_with('\n'));
        for line in csv.split('\n').skip(1) {
            prop_assert!(line.starts_with('"') && line.ends_with('"'));
        }
    }
}
