//! SAR report generation against a populated store.

use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;
use sar_desk_core::{
    case::{Customer, Direction, RiskLevel, Transaction, TransactionType, Typology},
    desk::Desk,
    error::DeskError,
    report::{ACTIVITY_DETAIL, CONCLUSION, EXECUTIVE_SUMMARY},
};

fn customer(desk: &Desk) {
    desk.store
        .insert_customer(&Customer {
            id: "CUST-8821".into(),
            name: "Aries Import/Export Ltd.".into(),
            risk_level: RiskLevel::High,
        })
        .unwrap();
}

fn txn(id: &str, day: u32, amount: &str, flagged: bool) -> Transaction {
    Transaction {
        id: id.into(),
        customer_id: "CUST-8821".into(),
        timestamp: Utc.with_ymd_and_hms(2023, 10, day, 10, 30, 0).unwrap(),
        amount: amount.parse::<Decimal>().unwrap(),
        currency: "USD".into(),
        counterparty: "Global Trade Partners".into(),
        txn_type: TransactionType::Wire,
        direction: Direction::Outbound,
        flagged,
        description: None,
    }
}

fn open(desk: &Desk, case_id: &str) {
    desk.lifecycle
        .open_case(
            case_id,
            "CUST-8821",
            Utc.with_ymd_and_hms(2023, 10, 22, 9, 0, 0).unwrap(),
            "System",
        )
        .unwrap();
}

#[test]
fn aggregate_covers_all_flow_and_evidence_only_flagged() {
    let desk = Desk::build_test().unwrap();
    customer(&desk);
    desk.store.insert_transaction(&txn("TRX-1", 18, "5000", true)).unwrap();
    desk.store.insert_transaction(&txn("TRX-2", 19, "200", false)).unwrap();
    open(&desk, "C-1");

    let report = desk.reports.generate("C-1").unwrap();
    let info = &report.suspicious_activity_information;

    assert_eq!(info.cumulative_amount, Decimal::new(5200, 0));
    assert_eq!(info.transaction_count, 2);
    assert_eq!(info.flagged_count, 1);
    assert_eq!(info.date_range_start, "2023-10-18");
    assert_eq!(info.date_range_end, "2023-10-19");
    assert!(report.narrative[0].content.contains("$5,200.00"));
    assert_eq!(report.narrative[1].supporting_evidence, vec!["TRX-1"]);
    assert_eq!(report.subject_information.id, "CUST-8821");
    assert_eq!(report.subject_information.risk_rating, RiskLevel::High);
}

#[test]
fn case_without_transactions_still_has_three_sections() {
    let desk = Desk::build_test().unwrap();
    customer(&desk);
    open(&desk, "C-1");

    let report = desk.reports.generate("C-1").unwrap();
    let info = &report.suspicious_activity_information;

    assert_eq!(info.cumulative_amount, Decimal::ZERO);
    assert_eq!(info.date_range_start, "");
    assert_eq!(info.date_range_end, "");
    assert_eq!(info.currency, "USD");
    let titles: Vec<&str> = report.narrative.iter().map(|s| s.title.as_str()).collect();
    assert_eq!(titles, [EXECUTIVE_SUMMARY, ACTIVITY_DETAIL, CONCLUSION]);
    assert!(report.narrative.iter().all(|s| s.supporting_evidence.is_empty()));
}

#[test]
fn unknown_case_is_not_found() {
    let desk = Desk::build_test().unwrap();
    let err = desk.reports.generate("C-404").unwrap_err();
    assert!(matches!(err, DeskError::NotFound { .. }));
}

#[test]
fn category_follows_recorded_typologies() {
    let desk = Desk::build_test().unwrap();
    customer(&desk);
    open(&desk, "C-1");
    for (id, name, confidence) in [("TYP-02", "Rapid Movement", 0.85), ("TYP-01", "Structuring", 0.98)] {
        desk.store
            .record_typology(
                "C-1",
                &Typology {
                    id: id.into(),
                    name: name.into(),
                    confidence,
                },
            )
            .unwrap();
    }

    let report = desk.reports.generate("C-1").unwrap();
    assert_eq!(report.suspicious_activity_information.category, "Structuring");
    assert_eq!(report.typologies[0].id, "TYP-01");
    assert_eq!(report.typologies.len(), 2);
}

#[test]
fn generation_is_deterministic_and_side_effect_free() {
    let desk = Desk::build_test().unwrap();
    customer(&desk);
    desk.store.insert_transaction(&txn("TRX-1", 12, "9800", true)).unwrap();
    desk.store.insert_transaction(&txn("TRX-2", 13, "9500", true)).unwrap();
    open(&desk, "C-1");
    let trail = desk.ledger.entries_for_case("C-1").unwrap();
    let status = desk.store.get_status("C-1").unwrap();

    let first = desk.reports.generate("C-1").unwrap();
    let mut second = desk.reports.generate("C-1").unwrap();
    second.generated_at = first.generated_at;

    assert_eq!(first, second);
    assert_eq!(desk.ledger.entries_for_case("C-1").unwrap(), trail);
    assert_eq!(desk.store.get_status("C-1").unwrap(), status);
}

#[test]
fn filed_case_can_still_be_reported() {
    let desk = Desk::build_test().unwrap();
    customer(&desk);
    desk.store.insert_transaction(&txn("TRX-1", 12, "9800", true)).unwrap();
    open(&desk, "C-1");
    desk.lifecycle.submit_sar("C-1", "Sarah Jenkins").unwrap();

    let report = desk.reports.generate("C-1").unwrap();
    assert_eq!(report.case_id, "C-1");
    assert_eq!(report.narrative[1].supporting_evidence, vec!["TRX-1"]);
}
