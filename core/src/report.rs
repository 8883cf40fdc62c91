//! SAR report generation.
//!
//! A report is a pure projection of a case's current transactions and
//! typologies. Only `generated_at` differs between two reports built from
//! the same store state. Generation never writes to the store or ledger and
//! works on filed cases too.
//!
//! POLICY:
//!   - Totals cover every transaction of the case, flagged or not, and are
//!     kept per currency. Amounts in different currencies are never added.
//!   - The headline `cumulative_amount` is the total in the configured
//!     default currency when the case has activity in it (or none at all),
//!     otherwise in the alphabetically first currency present.
//!   - Section 2 cites at most `illustrative_txn_cap` flagged transactions
//!     (newest first) in its prose; its evidence list carries all of them.

use crate::{
    case::{CaseDetail, RiskLevel, Transaction, Typology},
    config::ReportConfig,
    error::DeskResult,
    store::CaseStore,
    types::CaseId,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

pub const EXECUTIVE_SUMMARY: &str = "1.0 Executive Summary";
pub const ACTIVITY_DETAIL: &str = "2.0 Suspicious Activity Detail";
pub const CONCLUSION: &str = "3.0 Conclusion";

const FALLBACK_CATEGORY: &str = "Other Suspicious Activity";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarrativeSection {
    pub title: String,
    pub content: String,
    /// Transaction ids backing the section.
    pub supporting_evidence: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectInformation {
    pub name: String,
    pub id: String,
    pub risk_rating: RiskLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityInformation {
    pub category: String,
    /// Total in `currency`.
    pub cumulative_amount: Decimal,
    pub currency: String,
    /// Total flow per currency code.
    pub totals_by_currency: BTreeMap<String, Decimal>,
    /// Oldest transaction date, `YYYY-MM-DD`; empty without transactions.
    pub date_range_start: String,
    /// Newest transaction date, `YYYY-MM-DD`; empty without transactions.
    pub date_range_end: String,
    pub transaction_count: usize,
    pub flagged_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SarReport {
    pub case_id: CaseId,
    pub generated_at: DateTime<Utc>,
    pub filing_institution: String,
    pub subject_information: SubjectInformation,
    pub suspicious_activity_information: ActivityInformation,
    pub typologies: Vec<Typology>,
    pub narrative: Vec<NarrativeSection>,
}

pub struct ReportGenerator {
    store: Arc<CaseStore>,
    config: ReportConfig,
}

impl ReportGenerator {
    pub fn new(store: Arc<CaseStore>, config: ReportConfig) -> Self {
        Self { store, config }
    }

    /// Build the SAR report for a case. Fails with `NotFound` if it is absent.
    pub fn generate(&self, case_id: &str) -> DeskResult<SarReport> {
        let detail = self.store.get_case_detail(case_id)?;
        let report = build_report(&detail, &self.config, Utc::now());
        log::debug!(
            "SAR report for {case_id}: {} over {} transactions",
            report.suspicious_activity_information.cumulative_amount,
            report.suspicious_activity_information.transaction_count
        );
        Ok(report)
    }
}

/// Assemble a report from a loaded case. Transactions are expected newest first.
pub fn build_report(
    detail: &CaseDetail,
    config: &ReportConfig,
    generated_at: DateTime<Utc>,
) -> SarReport {
    let summary = &detail.summary;
    let transactions = &detail.transactions;

    let mut totals_by_currency: BTreeMap<String, Decimal> = BTreeMap::new();
    for t in transactions {
        *totals_by_currency.entry(t.currency.clone()).or_default() += t.amount;
    }
    let flagged: Vec<&Transaction> = transactions.iter().filter(|t| t.flagged).collect();
    let currency = if totals_by_currency.is_empty()
        || totals_by_currency.contains_key(&config.default_currency)
    {
        config.default_currency.clone()
    } else {
        totals_by_currency
            .keys()
            .next()
            .cloned()
            .unwrap_or_else(|| config.default_currency.clone())
    };
    let total_flow = totals_by_currency
        .get(&currency)
        .copied()
        .unwrap_or(Decimal::ZERO);

    // Headline currency first, then the rest alphabetically.
    let mut flows = vec![format_amount(total_flow, &currency)];
    flows.extend(
        totals_by_currency
            .iter()
            .filter(|(code, _)| **code != currency)
            .map(|(code, amount)| format_amount(*amount, code)),
    );
    let category = primary_typology(&detail.typologies)
        .map(|t| t.name.clone())
        .unwrap_or_else(|| FALLBACK_CATEGORY.to_string());

    let date_range_start = transactions.last().map(day).unwrap_or_default();
    let date_range_end = transactions.first().map(day).unwrap_or_default();

    // 1. Executive summary
    let mut summary_text = format!(
        "A review of transaction activity for {} ({}) was conducted following alerts for \
         potential {}. The customer is rated {} risk. The review identified {} in aggregate \
         suspicious flows",
        summary.customer_name,
        summary.customer_id,
        category.to_lowercase(),
        summary.risk_level.as_str().to_lowercase(),
        flows.join(" and "),
    );
    if transactions.is_empty() {
        summary_text.push('.');
    } else {
        summary_text.push_str(&format!(
            " across {} transactions between {} and {}.",
            transactions.len(),
            date_range_start,
            date_range_end
        ));
    }
    if !detail.typologies.is_empty() {
        let listed: Vec<String> = detail
            .typologies
            .iter()
            .map(|t| format!("{} ({:.1}% confidence)", t.name, t.confidence * 100.0))
            .collect();
        summary_text.push_str(&format!(" Detected typologies: {}.", listed.join(", ")));
    }

    // 2. Suspicious activity detail
    let detail_text = if flagged.is_empty() {
        "No transactions on the account were flagged by transaction monitoring. The aggregate \
         flow above reflects all recorded activity."
            .to_string()
    } else {
        let cited: Vec<String> = flagged
            .iter()
            .take(config.illustrative_txn_cap)
            .map(|t| format!("{} ({})", t.id, format_amount(t.amount, &t.currency)))
            .collect();
        let mut text = format!(
            "{} of {} transactions were flagged by transaction monitoring as consistent with {}. \
             Specific transactions include {}",
            flagged.len(),
            transactions.len(),
            category.to_lowercase(),
            cited.join(", "),
        );
        let uncited = flagged.len().saturating_sub(cited.len());
        if uncited > 0 {
            text.push_str(&format!(
                ", with {uncited} further flagged transactions listed as supporting evidence"
            ));
        }
        text.push('.');
        text
    };

    // 3. Conclusion
    let conclusion_text = "The pattern of activity is inconsistent with the customer's historical \
         profile and stated business purpose. SAR filing is recommended pursuant to \
         31 C.F.R. 1020.320(a)(2)."
        .to_string();

    let narrative = vec![
        NarrativeSection {
            title: EXECUTIVE_SUMMARY.into(),
            content: summary_text,
            supporting_evidence: Vec::new(),
        },
        NarrativeSection {
            title: ACTIVITY_DETAIL.into(),
            content: detail_text,
            supporting_evidence: flagged.iter().map(|t| t.id.clone()).collect(),
        },
        NarrativeSection {
            title: CONCLUSION.into(),
            content: conclusion_text,
            supporting_evidence: Vec::new(),
        },
    ];

    SarReport {
        case_id: summary.id.clone(),
        generated_at,
        filing_institution: config.filing_institution.clone(),
        subject_information: SubjectInformation {
            name: summary.customer_name.clone(),
            id: summary.customer_id.clone(),
            risk_rating: summary.risk_level,
        },
        suspicious_activity_information: ActivityInformation {
            category,
            cumulative_amount: total_flow,
            currency,
            totals_by_currency,
            date_range_start,
            date_range_end,
            transaction_count: transactions.len(),
            flagged_count: flagged.len(),
        },
        typologies: detail.typologies.clone(),
        narrative,
    }
}

/// Highest confidence wins; ties go to the lowest id.
fn primary_typology(typologies: &[Typology]) -> Option<&Typology> {
    typologies.iter().max_by(|a, b| {
        a.confidence
            .total_cmp(&b.confidence)
            .then_with(|| b.id.cmp(&a.id))
    })
}

fn day(t: &Transaction) -> String {
    t.timestamp.format("%Y-%m-%d").to_string()
}

/// `$12,345.60` for USD, `12,345.60 EUR` otherwise.
pub fn format_amount(amount: Decimal, currency: &str) -> String {
    let rounded = amount.round_dp(2);
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    let text = format!("{:.2}", rounded.abs());
    let (whole, frac) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    if currency == "USD" {
        format!("{sign}${grouped}.{frac}")
    } else {
        format!("{sign}{grouped}.{frac} {currency}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::case::{CaseStatus, CaseSummary, Direction, TransactionType};
    use chrono::TimeZone;
    use rust_decimal::prelude::FromPrimitive;

    fn priced(id: &str, day: u32, amount: i64, currency: &str) -> Transaction {
        Transaction {
            currency: currency.into(),
            ..txn(id, day, amount, true)
        }
    }

    fn txn(id: &str, day: u32, amount: i64, flagged: bool) -> Transaction {
        Transaction {
            id: id.into(),
            customer_id: "CUST-1".into(),
            timestamp: Utc.with_ymd_and_hms(2023, 10, day, 12, 0, 0).unwrap(),
            amount: Decimal::from_i64(amount).unwrap(),
            currency: "USD".into(),
            counterparty: "Cash Deposit".into(),
            txn_type: TransactionType::Cash,
            direction: Direction::Inbound,
            flagged,
            description: None,
        }
    }

    fn detail(transactions: Vec<Transaction>, typologies: Vec<Typology>) -> CaseDetail {
        CaseDetail {
            summary: CaseSummary {
                id: "C-1".into(),
                customer_name: "Aries Import/Export Ltd.".into(),
                customer_id: "CUST-1".into(),
                opened_at: Utc.with_ymd_and_hms(2023, 10, 22, 9, 0, 0).unwrap(),
                risk_score: 90,
                risk_level: RiskLevel::High,
                status: CaseStatus::InReview,
                assignee: None,
            },
            transactions,
            typologies,
        }
    }

    #[test]
    fn formats_amounts_with_grouping() {
        let amt = |s: &str| s.parse::<Decimal>().unwrap();
        assert_eq!(format_amount(amt("5200"), "USD"), "$5,200.00");
        assert_eq!(format_amount(amt("1234567.891"), "USD"), "$1,234,567.89");
        assert_eq!(format_amount(amt("999.5"), "EUR"), "999.50 EUR");
        assert_eq!(format_amount(amt("-42"), "USD"), "-$42.00");
        assert_eq!(format_amount(Decimal::ZERO, "USD"), "$0.00");
    }

    #[test]
    fn prose_cites_at_most_the_cap_but_evidence_lists_all_flagged() {
        let txns = vec![
            txn("T5", 20, 9900, true),
            txn("T4", 18, 9900, true),
            txn("T3", 15, 500, false),
            txn("T2", 13, 9500, true),
            txn("T1", 12, 9800, true),
        ];
        let report = build_report(&detail(txns, vec![]), &ReportConfig::default(), Utc::now());
        let section = &report.narrative[1];

        assert_eq!(section.supporting_evidence, vec!["T5", "T4", "T2", "T1"]);
        assert!(section.content.contains("T5 ($9,900.00)"));
        assert!(section.content.contains("T2 ($9,500.00)"));
        assert!(!section.content.contains("T1 ("));
        assert!(section.content.contains("1 further flagged"));
    }

    #[test]
    fn date_range_runs_oldest_to_newest() {
        let txns = vec![txn("T2", 20, 100, false), txn("T1", 12, 100, false)];
        let report = build_report(&detail(txns, vec![]), &ReportConfig::default(), Utc::now());
        let info = &report.suspicious_activity_information;
        assert_eq!(info.date_range_start, "2023-10-12");
        assert_eq!(info.date_range_end, "2023-10-20");
        assert_eq!(info.category, FALLBACK_CATEGORY);
    }

    #[test]
    fn category_is_highest_confidence_typology() {
        let typologies = vec![
            Typology { id: "TYP-02".into(), name: "Rapid Movement".into(), confidence: 0.85 },
            Typology { id: "TYP-01".into(), name: "Structuring".into(), confidence: 0.98 },
        ];
        let report = build_report(&detail(vec![], typologies), &ReportConfig::default(), Utc::now());
        assert_eq!(report.suspicious_activity_information.category, "Structuring");
        assert!(report.narrative[0].content.contains("potential structuring"));
        assert!(report.narrative[0].content.contains("Structuring (98.0% confidence)"));
    }

    #[test]
    fn same_input_differs_only_in_timestamp() {
        let case = detail(vec![txn("T1", 12, 5000, true)], vec![]);
        let config = ReportConfig::default();
        let a = build_report(&case, &config, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        let mut b = build_report(&case, &config, Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap());
        assert_ne!(a, b);
        b.generated_at = a.generated_at;
        assert_eq!(a, b);
    }

    #[test]
    fn currencies_are_totalled_separately() {
        let txns = vec![priced("T2", 14, 200, "USD"), priced("T1", 12, 5000, "EUR")];
        let report = build_report(&detail(txns, vec![]), &ReportConfig::default(), Utc::now());
        let info = &report.suspicious_activity_information;

        assert_eq!(info.currency, "USD");
        assert_eq!(info.cumulative_amount, Decimal::from(200));
        assert_eq!(info.totals_by_currency["EUR"], Decimal::from(5000));
        assert_eq!(info.totals_by_currency["USD"], Decimal::from(200));

        let summary = &report.narrative[0].content;
        assert!(summary.contains("identified $200.00 and 5,000.00 EUR in aggregate"), "{summary}");
        assert!(!summary.contains("5,200"));
    }

    #[test]
    fn headline_falls_back_to_a_present_currency() {
        let txns = vec![priced("T2", 14, 300, "GBP"), priced("T1", 12, 999, "EUR")];
        let report = build_report(&detail(txns, vec![]), &ReportConfig::default(), Utc::now());
        let info = &report.suspicious_activity_information;

        assert_eq!(info.currency, "EUR");
        assert_eq!(info.cumulative_amount, Decimal::from(999));
        assert!(report.narrative[0].content.contains("999.00 EUR and 300.00 GBP"));
    }

    #[test]
    fn confidence_keeps_one_decimal() {
        let typologies = vec![
            Typology { id: "TYP-01".into(), name: "Structuring".into(), confidence: 0.99 },
            Typology { id: "TYP-02".into(), name: "Layering".into(), confidence: 0.985 },
        ];
        let report = build_report(&detail(vec![], typologies), &ReportConfig::default(), Utc::now());
        let summary = &report.narrative[0].content;
        assert!(summary.contains("Structuring (99.0% confidence)"));
        assert!(summary.contains("Layering (98.5% confidence)"));
    }
}
