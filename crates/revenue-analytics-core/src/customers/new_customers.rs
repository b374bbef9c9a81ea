use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Instant;
use tracing::debug;

use crate::display::{compute_numbers_display, percentage_change};
use crate::entities::{Contract, ContractStatus};
use crate::period::{MonthBucket, Period};
use crate::snapshot::{load_tenant, SnapshotAccessor};
use crate::types::{trailing_pair, with_metadata, ComputationOutput, Percentage};
use crate::AnalyticsResult;

// ---------------------------------------------------------------------------
// Output types — New customers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NewCustomersMonth {
    pub year: i32,
    pub month: u32,
    pub count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCustomersOutput {
    pub this_month_count: u32,
    /// Relative change against the previous month; 0 for a one-month period
    pub this_month_increase_percentage: Percentage,
    pub this_month_increase_display: String,
    pub per_month: Vec<NewCustomersMonth>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Service started in the bucket and the contract outlived the month.
pub fn signed_in(contract: &Contract, bucket: &MonthBucket) -> bool {
    contract.status != ContractStatus::Draft
        && contract
            .service_started_at
            .is_some_and(|started| bucket.contains(started))
        && contract.ended_at.map_or(true, |end| end >= bucket.end)
}

// ---------------------------------------------------------------------------
// Function: new_customers
// ---------------------------------------------------------------------------

/// Distinct organizations that started a contract in each month.
pub fn new_customers(
    accessor: &dyn SnapshotAccessor,
    tenant: &str,
    period: &Period,
) -> AnalyticsResult<ComputationOutput<NewCustomersOutput>> {
    let start = Instant::now();
    let buckets = period.buckets()?;
    let mut warnings: Vec<String> = Vec::new();

    let book = load_tenant(accessor, tenant, &mut warnings)?;

    let undated = book
        .visible()
        .flat_map(|org| org.contracts.iter())
        .filter(|r| {
            r.contract.status != ContractStatus::Draft && r.contract.service_started_at.is_none()
        })
        .count();
    if undated > 0 {
        warnings.push(format!(
            "{undated} contract(s) have no service start date and cannot be counted"
        ));
    }

    let per_month: Vec<NewCustomersMonth> = buckets
        .iter()
        .map(|bucket| {
            let signed: HashSet<&str> = book
                .visible()
                .filter(|org| org.contracts.iter().any(|r| signed_in(&r.contract, bucket)))
                .map(|org| org.organization.id.as_str())
                .collect();
            NewCustomersMonth {
                year: bucket.year(),
                month: bucket.month_number(),
                count: signed.len() as u32,
            }
        })
        .collect();

    let (previous, current) = trailing_pair(&per_month);
    let previous_count = Decimal::from(previous.count);
    let current_count = Decimal::from(current.count);
    let increase = if per_month.len() > 1 {
        percentage_change(previous_count, current_count)
    } else {
        Decimal::ZERO
    };

    debug!(
        tenant,
        months = per_month.len(),
        this_month = current.count,
        "computed new customers"
    );

    let output = NewCustomersOutput {
        this_month_count: current.count,
        this_month_increase_percentage: increase,
        this_month_increase_display: compute_numbers_display(previous_count, current_count),
        per_month,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "New customers: distinct non-hidden organizations whose contract service \
         started in the month and did not end before the month closed",
        &serde_json::json!({
            "tenant": tenant,
            "period_start": period.start.to_rfc3339(),
            "period_end": period.end.to_rfc3339(),
            "excluded_statuses": ["DRAFT"],
        }),
        warnings,
        elapsed,
        output,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::period::YearMonth;
    use chrono::{DateTime, TimeZone, Utc};

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn contract(started: DateTime<Utc>, ended: Option<DateTime<Utc>>) -> Contract {
        Contract {
            id: "c1".into(),
            organization_id: "o1".into(),
            status: ContractStatus::Live,
            service_started_at: Some(started),
            ended_at: ended,
            billing_cycle: None,
            renewal_cycle: None,
            renewal_periods: None,
        }
    }

    fn july() -> MonthBucket {
        MonthBucket::for_month(YearMonth { year: 2023, month: 7 }).unwrap()
    }

    #[test]
    fn test_signed_at_month_edges() {
        assert!(signed_in(&contract(at(2023, 7, 1), None), &july()));
        let last_instant = Utc.with_ymd_and_hms(2023, 7, 31, 23, 59, 59).unwrap();
        assert!(signed_in(&contract(last_instant, None), &july()));
        assert!(!signed_in(&contract(at(2023, 6, 30), None), &july()));
        assert!(!signed_in(&contract(at(2023, 8, 1), None), &july()));
    }

    #[test]
    fn test_ended_within_month_not_counted() {
        let started = at(2023, 7, 10);
        assert!(!signed_in(&contract(started, Some(started)), &july()));
        assert!(!signed_in(&contract(started, Some(at(2023, 7, 31))), &july()));
        assert!(signed_in(&contract(started, Some(at(2023, 8, 1))), &july()));
    }

    #[test]
    fn test_draft_not_counted() {
        let mut c = contract(at(2023, 7, 10), None);
        c.status = ContractStatus::Draft;
        assert!(!signed_in(&c, &july()));
    }
}
