use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

use crate::display::{compute_numbers_display, percentage_change, round_to_two_decimals};
use crate::period::Period;
use crate::revenue::activity::contract_value_in;
use crate::snapshot::{load_tenant, SnapshotAccessor};
use crate::types::{trailing_pair, with_metadata, ComputationOutput, Money, Percentage};
use crate::AnalyticsResult;

// ---------------------------------------------------------------------------
// Output types — Gross revenue retention
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrrMonth {
    pub year: i32,
    pub month: u32,
    pub percentage: Percentage,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrossRevenueRetentionOutput {
    /// Last month's GRR; -100 when it dropped to zero from a nonzero month
    pub gross_revenue_retention: Percentage,
    pub increase_percentage: String,
    pub increase_percentage_value: Percentage,
    pub per_month: Vec<GrrMonth>,
}

// ---------------------------------------------------------------------------
// Function: gross_revenue_retention
// ---------------------------------------------------------------------------

/// Revenue retained against each contract's running peak.
///
/// Every contract keeps the highest monthly value it has reached so far in
/// the window. A month's GRR is the current value of all contracts over the
/// sum of their peaks, capped at 100. Growth can therefore never lift GRR
/// above what was already earned, while any contraction or churn lowers it
/// for the rest of the window.
pub fn gross_revenue_retention(
    accessor: &dyn SnapshotAccessor,
    tenant: &str,
    period: &Period,
) -> AnalyticsResult<ComputationOutput<GrossRevenueRetentionOutput>> {
    let start = Instant::now();
    let buckets = period.buckets()?;
    let mut warnings: Vec<String> = Vec::new();

    let book = load_tenant(accessor, tenant, &mut warnings)?;
    let contracts: Vec<_> = book
        .reportable_customers()
        .flat_map(|org| org.contracts.iter())
        .collect();

    let mut peaks: Vec<Money> = vec![Decimal::ZERO; contracts.len()];
    let mut per_month = Vec::with_capacity(buckets.len());

    for bucket in &buckets {
        let mut retained = Decimal::ZERO;
        let mut baseline = Decimal::ZERO;
        for (record, peak) in contracts.iter().zip(peaks.iter_mut()) {
            let value = contract_value_in(record, bucket);
            if value > *peak {
                *peak = value;
            }
            retained += value;
            baseline += *peak;
        }

        let percentage = if baseline > Decimal::ZERO {
            round_to_two_decimals(retained / baseline * dec!(100)).min(dec!(100))
        } else {
            Decimal::ZERO
        };
        per_month.push(GrrMonth {
            year: bucket.year(),
            month: bucket.month_number(),
            percentage,
        });
    }

    let values: Vec<Percentage> = per_month.iter().map(|m| m.percentage).collect();
    let (previous, current) = trailing_pair(&values);

    let headline = if current.is_zero() {
        if previous.is_zero() {
            Decimal::ZERO
        } else {
            dec!(-100)
        }
    } else {
        round_to_two_decimals(current)
    };

    if values.iter().all(|v| v.is_zero()) && !contracts.is_empty() {
        warnings.push(
            "No recurring revenue in the period; GRR is zero for every month".to_string(),
        );
    }

    debug!(
        tenant,
        months = per_month.len(),
        contracts = contracts.len(),
        grr = %headline,
        "computed gross revenue retention"
    );

    let output = GrossRevenueRetentionOutput {
        gross_revenue_retention: headline,
        increase_percentage: compute_numbers_display(previous, current),
        increase_percentage_value: percentage_change(previous, current),
        per_month,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Gross revenue retention: sum of current contract MRR over sum of each \
         contract's peak MRR within the window, capped at 100%",
        &serde_json::json!({
            "tenant": tenant,
            "period_start": period.start.to_rfc3339(),
            "period_end": period.end.to_rfc3339(),
            "contracts": contracts.len(),
            "cap": "100",
            "rounding": "2 decimals, half away from zero",
        }),
        warnings,
        elapsed,
        output,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::*;
    use crate::snapshot::InMemorySnapshot;
    use chrono::{DateTime, TimeZone, Utc};

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn snapshot_with(
        items: Vec<(Decimal, DateTime<Utc>, Option<DateTime<Utc>>)>,
    ) -> InMemorySnapshot {
        let mut snapshot = InMemorySnapshot::new("t")
            .with_organization(Organization {
                id: "o1".into(),
                name: None,
                relationship: Relationship::Customer,
                hide: false,
            })
            .with_contract(Contract {
                id: "c1".into(),
                organization_id: "o1".into(),
                status: ContractStatus::Live,
                service_started_at: Some(at(2022, 1, 1)),
                ended_at: None,
                billing_cycle: None,
                renewal_cycle: None,
                renewal_periods: None,
            });
        for (i, (price, start, end)) in items.into_iter().enumerate() {
            snapshot = snapshot.with_service_line_item(ServiceLineItem {
                id: format!("s{i}"),
                contract_id: "c1".into(),
                billed_type: BilledType::Monthly,
                price,
                quantity: dec!(1),
                started_at: start,
                ended_at: end,
                parent_id: None,
                is_canceled: false,
            });
        }
        snapshot
    }

    #[test]
    fn test_expansion_capped_at_hundred() {
        let snapshot = snapshot_with(vec![
            (dec!(10), at(2022, 1, 1), None),
            (dec!(10), at(2022, 3, 1), None),
        ]);
        let period = Period::new(at(2022, 1, 1), at(2022, 4, 1)).unwrap();
        let out = gross_revenue_retention(&snapshot, "t", &period).unwrap().result;
        assert!(out.per_month.iter().all(|m| m.percentage == dec!(100)));
        assert_eq!(out.increase_percentage, "0%");
        assert_eq!(out.increase_percentage_value, dec!(0));
    }

    #[test]
    fn test_contraction_lowers_retention() {
        let snapshot = snapshot_with(vec![
            (dec!(30), at(2022, 1, 1), Some(at(2022, 3, 1))),
            (dec!(10), at(2022, 1, 1), None),
        ]);
        let period = Period::new(at(2022, 1, 1), at(2022, 3, 1)).unwrap();
        let out = gross_revenue_retention(&snapshot, "t", &period).unwrap().result;
        let values: Vec<Decimal> = out.per_month.iter().map(|m| m.percentage).collect();
        assert_eq!(values, vec![dec!(100), dec!(100), dec!(25)]);
        assert_eq!(out.gross_revenue_retention, dec!(25));
        assert_eq!(out.increase_percentage_value, dec!(-75));
    }

    #[test]
    fn test_drop_to_zero_headline() {
        let snapshot = snapshot_with(vec![(dec!(10), at(2022, 1, 1), Some(at(2022, 2, 1)))]);
        let period = Period::new(at(2022, 1, 1), at(2022, 2, 1)).unwrap();
        let out = gross_revenue_retention(&snapshot, "t", &period).unwrap().result;
        assert_eq!(out.gross_revenue_retention, dec!(-100));
        assert_eq!(out.increase_percentage, "-100%");
    }
}
