//! Customer-health classification for the customer map.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

use crate::display::round_to_two_decimals;
use crate::entities::{ContractStatus, RenewalLikelihood};
use crate::revenue::activity::{contract_run_rate_at, contract_value_at};
use crate::revenue::billing::sli_monthly_value;
use crate::snapshot::{load_tenant, ContractRecord, OrganizationRecord, SnapshotAccessor};
use crate::types::{with_metadata, ComputationOutput, Money};
use crate::AnalyticsResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CustomerState {
    Ok,
    MediumRisk,
    HighRisk,
    Churned,
}

impl CustomerState {
    pub fn from_likelihood(likelihood: RenewalLikelihood) -> Self {
        match likelihood {
            RenewalLikelihood::High => CustomerState::Ok,
            RenewalLikelihood::Medium => CustomerState::MediumRisk,
            RenewalLikelihood::Low | RenewalLikelihood::Zero => CustomerState::HighRisk,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerMapEntry {
    pub organization_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_name: Option<String>,
    /// Earliest service start among the contracts that decided the state
    pub contract_signed_date: DateTime<Utc>,
    pub state: CustomerState,
    /// Annual recurring revenue (monthly value x 12)
    pub arr: Money,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Live, out-of-contract or ended, with at least one line item that earns
/// recurring revenue and did not end the instant it started.
fn is_qualifying(record: &ContractRecord) -> bool {
    matches!(
        record.contract.status,
        ContractStatus::Live | ContractStatus::OutOfContract | ContractStatus::Ended
    ) && record
        .service_line_items
        .iter()
        .any(|item| !item.ended_immediately() && sli_monthly_value(item) > Decimal::ZERO)
}

fn signed_date(records: &[&ContractRecord]) -> Option<DateTime<Utc>> {
    let service_start = records
        .iter()
        .filter_map(|r| r.contract.service_started_at)
        .min();
    service_start.or_else(|| {
        records
            .iter()
            .flat_map(|r| r.service_line_items.iter().map(|item| item.started_at))
            .min()
    })
}

/// The last instant the contract was earning: just before its end, or just
/// before its last line item ended.
fn last_active_instant(record: &ContractRecord, as_of: DateTime<Utc>) -> DateTime<Utc> {
    let end = record.contract.ended_at.or_else(|| {
        let items = &record.service_line_items;
        if items.iter().any(|item| item.ended_at.is_none()) {
            None
        } else {
            items.iter().filter_map(|item| item.ended_at).max()
        }
    });
    match end {
        Some(end) => end.checked_sub_signed(Duration::nanoseconds(1)).unwrap_or(end),
        None => as_of,
    }
}

/// Likelihood a contract contributes to its organization's worst case.
///
/// Only an open renewal speaks for a live contract. An out-of-contract
/// contract without one is treated as Medium.
fn contract_likelihood(record: &ContractRecord) -> Option<RenewalLikelihood> {
    let open = record
        .active_renewal
        .as_ref()
        .filter(|o| o.is_open())
        .and_then(|o| o.likelihood());
    match record.contract.status {
        ContractStatus::OutOfContract => open.or(Some(RenewalLikelihood::Medium)),
        _ => open,
    }
}

fn annualize(monthly: Money) -> Money {
    round_to_two_decimals(monthly * dec!(12))
}

/// Classify one organization; `None` when it has no qualifying contract.
pub fn classify_organization(
    org: &OrganizationRecord,
    as_of: DateTime<Utc>,
) -> Option<CustomerMapEntry> {
    let qualifying: Vec<&ContractRecord> =
        org.contracts.iter().filter(|r| is_qualifying(r)).collect();
    if qualifying.is_empty() {
        return None;
    }

    let (ended, running): (Vec<&ContractRecord>, Vec<&ContractRecord>) = qualifying
        .into_iter()
        .partition(|r| r.contract.status == ContractStatus::Ended);

    let (state, signed, monthly) = if running.is_empty() {
        let monthly: Money = ended
            .iter()
            .map(|r| contract_value_at(r, last_active_instant(r, as_of)))
            .sum();
        (CustomerState::Churned, signed_date(&ended)?, monthly)
    } else {
        let worst = running.iter().filter_map(|r| contract_likelihood(r)).min();
        let state = worst
            .map(CustomerState::from_likelihood)
            .unwrap_or(CustomerState::Ok);
        let monthly: Money = running.iter().map(|r| contract_run_rate_at(r, as_of)).sum();
        (state, signed_date(&running)?, monthly)
    };

    Some(CustomerMapEntry {
        organization_id: org.organization.id.clone(),
        organization_name: org.organization.name.clone(),
        contract_signed_date: signed,
        state,
        arr: annualize(monthly),
    })
}

// ---------------------------------------------------------------------------
// Function: customer_map
// ---------------------------------------------------------------------------

/// Health state, signing date and ARR for every reportable customer with a
/// revenue-bearing contract, in the tenant's organization order.
pub fn customer_map(
    accessor: &dyn SnapshotAccessor,
    tenant: &str,
    as_of: DateTime<Utc>,
) -> AnalyticsResult<ComputationOutput<Vec<CustomerMapEntry>>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let book = load_tenant(accessor, tenant, &mut warnings)?;

    let mut entries = Vec::new();
    let mut skipped = 0usize;
    for org in book.reportable_customers() {
        match classify_organization(org, as_of) {
            Some(entry) => entries.push(entry),
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        warnings.push(format!(
            "{skipped} customer organization(s) without a revenue-bearing contract were left out"
        ));
    }

    debug!(
        tenant,
        customers = entries.len(),
        skipped,
        "computed customer map"
    );

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Customer map: worst open-renewal likelihood across running contracts \
         (High=OK, Medium=MEDIUM_RISK, Low/Zero=HIGH_RISK), CHURNED when every \
         qualifying contract ended; ARR = monthly recurring value x 12",
        &serde_json::json!({
            "tenant": tenant,
            "as_of": as_of.to_rfc3339(),
            "out_of_contract_default": "MEDIUM",
        }),
        warnings,
        elapsed,
        entries,
    ))
}
