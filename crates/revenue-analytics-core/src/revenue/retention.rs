use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

use crate::display::{compute_percentages_display, round_to_two_decimals};
use crate::entities::{Contract, ContractStatus};
use crate::period::{MonthBucket, Period, YearMonth};
use crate::snapshot::{load_tenant, SnapshotAccessor};
use crate::types::{trailing_pair, with_metadata, ComputationOutput, Percentage};
use crate::AnalyticsResult;

// ---------------------------------------------------------------------------
// Output types — Retention rate
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RetentionMonth {
    pub year: i32,
    pub month: u32,
    pub renew_count: u32,
    pub churn_count: u32,
}

impl RetentionMonth {
    fn is_empty(&self) -> bool {
        self.renew_count == 0 && self.churn_count == 0
    }

    /// Renewals over renewals plus churns, 0 when neither happened.
    pub fn rate(&self) -> Percentage {
        if self.is_empty() {
            return Decimal::ZERO;
        }
        let renew = Decimal::from(self.renew_count);
        let total = Decimal::from(self.renew_count + self.churn_count);
        round_to_two_decimals(renew / total * dec!(100))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetentionRateOutput {
    /// Last month's rate; -100 when activity stopped after a month with some
    pub retention_rate: Percentage,
    /// Percentage-point change, clamped to ±100
    pub increase_percentage: String,
    pub per_month: Vec<RetentionMonth>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// The contract reaches a renewal date in the bucket's month and is still
/// running when the month closes.
pub fn renews_in(contract: &Contract, bucket: &MonthBucket) -> bool {
    if !contract.counts_for_revenue() {
        return false;
    }
    let (Some(interval), Some(started)) =
        (contract.renewal_interval_months(), contract.service_started_at)
    else {
        return false;
    };
    let elapsed = YearMonth::of(started).months_until(&bucket.month);
    if elapsed <= 0 || elapsed % i64::from(interval) != 0 {
        return false;
    }
    contract.ended_at.map_or(true, |end| end >= bucket.end)
}

pub fn churns_in(contract: &Contract, bucket: &MonthBucket) -> bool {
    contract.status == ContractStatus::Ended
        && contract.ended_at.is_some_and(|end| bucket.contains(end))
}

// ---------------------------------------------------------------------------
// Function: retention_rate
// ---------------------------------------------------------------------------

/// Contracts renewed versus contracts churned, per month.
pub fn retention_rate(
    accessor: &dyn SnapshotAccessor,
    tenant: &str,
    period: &Period,
) -> AnalyticsResult<ComputationOutput<RetentionRateOutput>> {
    let start = Instant::now();
    let buckets = period.buckets()?;
    let mut warnings: Vec<String> = Vec::new();

    let book = load_tenant(accessor, tenant, &mut warnings)?;
    let contracts: Vec<&Contract> = book
        .reportable_customers()
        .flat_map(|org| org.contracts.iter().map(|r| &r.contract))
        .collect();

    let without_cycle = contracts
        .iter()
        .filter(|c| c.counts_for_revenue() && c.renewal_cycle.is_none())
        .count();
    if without_cycle > 0 {
        warnings.push(format!(
            "{without_cycle} contract(s) have no renewal cycle and never count as renewals"
        ));
    }

    let per_month: Vec<RetentionMonth> = buckets
        .iter()
        .map(|bucket| RetentionMonth {
            year: bucket.year(),
            month: bucket.month_number(),
            renew_count: contracts.iter().filter(|c| renews_in(c, bucket)).count() as u32,
            churn_count: contracts.iter().filter(|c| churns_in(c, bucket)).count() as u32,
        })
        .collect();

    let (previous, current) = trailing_pair(&per_month);
    let retention = if current.is_empty() {
        if previous.is_empty() {
            Decimal::ZERO
        } else {
            dec!(-100)
        }
    } else {
        current.rate()
    };

    debug!(
        tenant,
        months = per_month.len(),
        retention_rate = %retention,
        "computed retention rate"
    );

    let output = RetentionRateOutput {
        retention_rate: retention,
        increase_percentage: compute_percentages_display(previous.rate(), retention),
        per_month,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Retention rate: contracts reaching a renewal date over renewals plus \
         contracts that ended in the month",
        &serde_json::json!({
            "tenant": tenant,
            "period_start": period.start.to_rfc3339(),
            "period_end": period.end.to_rfc3339(),
            "contracts": contracts.len(),
            "renewal_cycle_months": { "MONTHLY": 1, "QUARTERLY": 3, "ANNUAL": 12 },
        }),
        warnings,
        elapsed,
        output,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::RenewalCycle;
    use chrono::{DateTime, TimeZone, Utc};

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn bucket(y: i32, m: u32) -> MonthBucket {
        MonthBucket::for_month(YearMonth { year: y, month: m }).unwrap()
    }

    fn contract(cycle: RenewalCycle, periods: Option<u32>) -> Contract {
        Contract {
            id: "c1".into(),
            organization_id: "o1".into(),
            status: ContractStatus::Live,
            service_started_at: Some(at(2023, 6, 10)),
            ended_at: None,
            billing_cycle: None,
            renewal_cycle: Some(cycle),
            renewal_periods: periods,
        }
    }

    #[test]
    fn test_start_month_is_not_a_renewal() {
        let c = contract(RenewalCycle::Monthly, None);
        assert!(!renews_in(&c, &bucket(2023, 6)));
        assert!(renews_in(&c, &bucket(2023, 7)));
    }

    #[test]
    fn test_quarterly_cadence() {
        let c = contract(RenewalCycle::Quarterly, None);
        let hits: Vec<u32> = (1..=12)
            .filter(|m| renews_in(&c, &bucket(2024, *m)))
            .collect();
        assert_eq!(hits, vec![3, 6, 9, 12]);
    }

    #[test]
    fn test_ended_before_month_close_does_not_renew() {
        let mut c = contract(RenewalCycle::Monthly, None);
        c.ended_at = Some(at(2023, 7, 20));
        assert!(!renews_in(&c, &bucket(2023, 7)));
        c.status = ContractStatus::Ended;
        assert!(churns_in(&c, &bucket(2023, 7)));
    }

    #[test]
    fn test_rate_rounding() {
        let month = RetentionMonth {
            year: 2024,
            month: 1,
            renew_count: 2,
            churn_count: 1,
        };
        assert_eq!(month.rate(), dec!(66.67));
        assert_eq!(RetentionMonth::default().rate(), dec!(0));
    }
}
