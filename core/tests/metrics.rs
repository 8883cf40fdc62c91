//! Dashboard metrics and active case listing.

use chrono::{Duration, Utc};
use sar_desk_core::{
    case::{CaseStatus, Customer, RiskLevel},
    config::DeskConfig,
    desk::Desk,
    policy::RiskScorer,
    store::CaseStore,
};
use std::sync::Arc;

fn add_case(desk: &Desk, case_id: &str, risk: RiskLevel, opened_days_ago: i64) {
    let customer_id = format!("CUST-{case_id}");
    desk.store
        .insert_customer(&Customer {
            id: customer_id.clone(),
            name: format!("Customer {case_id}"),
            risk_level: risk,
        })
        .unwrap();
    desk.lifecycle
        .open_case(
            case_id,
            &customer_id,
            Utc::now() - Duration::days(opened_days_ago),
            "System",
        )
        .unwrap();
}

#[test]
fn empty_desk_reports_zeroes_and_unknown_average() {
    let desk = Desk::build_test().unwrap();
    let m = desk.metrics.snapshot().unwrap();
    assert_eq!(m.open_cases, 0);
    assert_eq!(m.high_risk_alerts, 0);
    assert_eq!(m.sars_filed, 0);
    assert_eq!(m.avg_resolution_days, None);
    assert_eq!(m.resolution_sample, 0);
}

#[test]
fn counts_split_open_high_risk_and_filed() {
    let desk = Desk::build_test().unwrap();
    add_case(&desk, "C-1", RiskLevel::High, 1);
    add_case(&desk, "C-2", RiskLevel::High, 2);
    add_case(&desk, "C-3", RiskLevel::Low, 3);
    add_case(&desk, "C-4", RiskLevel::Medium, 4);
    desk.lifecycle.escalate("C-1", "a").unwrap();
    desk.lifecycle.submit_sar("C-2", "a").unwrap();
    desk.lifecycle.submit_sar("C-4", "a").unwrap();

    let m = desk.metrics.snapshot().unwrap();
    assert_eq!(m.open_cases, 2);
    assert_eq!(m.high_risk_alerts, 1);
    assert_eq!(m.sars_filed, 2);
    assert_eq!(m.resolution_sample, 2);
    let avg = m.avg_resolution_days.unwrap();
    assert!((avg - 3.0).abs() < 0.01, "got {avg}");
}

#[test]
fn filing_moves_a_case_between_counters() {
    let desk = Desk::build_test().unwrap();
    add_case(&desk, "C-1", RiskLevel::High, 4);
    let before = desk.metrics.snapshot().unwrap();

    desk.lifecycle.submit_sar("C-1", "a").unwrap();
    let after = desk.metrics.snapshot().unwrap();

    assert_eq!(after.open_cases, before.open_cases - 1);
    assert_eq!(after.sars_filed, before.sars_filed + 1);
    assert_eq!(after.high_risk_alerts, 0);
    let avg = after.avg_resolution_days.unwrap();
    assert!((avg - 4.0).abs() < 0.01, "got {avg}");
    assert!(after.last_updated >= before.last_updated);
}

#[test]
fn active_cases_exclude_filed_and_list_newest_first() {
    let desk = Desk::build_test().unwrap();
    add_case(&desk, "C-old", RiskLevel::Low, 9);
    add_case(&desk, "C-new", RiskLevel::High, 1);
    add_case(&desk, "C-mid", RiskLevel::Medium, 5);
    add_case(&desk, "C-done", RiskLevel::High, 3);
    desk.lifecycle.submit_sar("C-done", "a").unwrap();

    let active = desk.store.get_active_cases().unwrap();
    let ids: Vec<&str> = active.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, ["C-new", "C-mid", "C-old"]);
    assert!(active.iter().all(|c| c.status != CaseStatus::Filed));

    let scores: Vec<u8> = active.iter().map(|c| c.risk_score).collect();
    assert_eq!(scores, [90, 50, 50]);
}

struct Banded;

impl RiskScorer for Banded {
    fn score(&self, level: RiskLevel) -> u8 {
        match level {
            RiskLevel::High => 99,
            RiskLevel::Medium => 60,
            RiskLevel::Low => 10,
        }
    }
}

#[test]
fn custom_risk_scorer_applies_at_read_time() {
    let store = CaseStore::in_memory().unwrap().with_risk_scorer(Banded);
    store.migrate().unwrap();
    let desk = Desk::with_store(Arc::new(store), &DeskConfig::default_test());
    add_case(&desk, "C-1", RiskLevel::Medium, 1);
    add_case(&desk, "C-2", RiskLevel::Low, 2);

    let detail = desk.store.get_case_detail("C-1").unwrap();
    assert_eq!(detail.summary.risk_score, 60);
    let scores: Vec<u8> = desk
        .store
        .get_active_cases()
        .unwrap()
        .iter()
        .map(|c| c.risk_score)
        .collect();
    assert_eq!(scores, [60, 10]);
}
