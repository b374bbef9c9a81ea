use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

use crate::display::{compute_numbers_display, round_to_two_decimals};
use crate::period::Period;
use crate::revenue::activity::contract_value_in;
use crate::snapshot::{load_tenant, SnapshotAccessor};
use crate::types::{trailing_pair, with_metadata, ComputationOutput, Money};
use crate::AnalyticsResult;

// ---------------------------------------------------------------------------
// Output types — MRR per customer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MrrMonth {
    pub year: i32,
    pub month: u32,
    /// Recurring monthly revenue divided by the customer count
    pub value: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MrrPerCustomerOutput {
    /// Value of the last month in the period
    pub mrr_per_customer: Money,
    /// Change against the previous month, e.g. `"+2"`, `"-50%"`, `"1.5×"`
    pub increase_percentage: String,
    pub per_month: Vec<MrrMonth>,
}

// ---------------------------------------------------------------------------
// Function: mrr_per_customer
// ---------------------------------------------------------------------------

/// Monthly recurring revenue per reportable customer, one value per month.
pub fn mrr_per_customer(
    accessor: &dyn SnapshotAccessor,
    tenant: &str,
    period: &Period,
) -> AnalyticsResult<ComputationOutput<MrrPerCustomerOutput>> {
    let start = Instant::now();
    let buckets = period.buckets()?;
    let mut warnings: Vec<String> = Vec::new();

    let book = load_tenant(accessor, tenant, &mut warnings)?;
    let customers: Vec<_> = book.reportable_customers().collect();
    let customer_count = Decimal::from(customers.len() as u64);

    let mut per_month = Vec::with_capacity(buckets.len());
    for bucket in &buckets {
        let total: Money = customers
            .iter()
            .flat_map(|org| org.contracts.iter())
            .map(|record| contract_value_in(record, bucket))
            .sum();

        let value = if total.is_zero() || customer_count.is_zero() {
            Decimal::ZERO
        } else {
            round_to_two_decimals(total / customer_count)
        };
        per_month.push(MrrMonth {
            year: bucket.year(),
            month: bucket.month_number(),
            value,
        });
    }

    let values: Vec<Money> = per_month.iter().map(|m| m.value).collect();
    let (previous, current) = trailing_pair(&values);

    if customers.is_empty() {
        warnings.push("Tenant has no reportable customers; MRR is zero".to_string());
    }

    debug!(
        tenant,
        months = per_month.len(),
        customers = customers.len(),
        mrr_per_customer = %current,
        "computed MRR per customer"
    );

    let output = MrrPerCustomerOutput {
        mrr_per_customer: current,
        increase_percentage: compute_numbers_display(previous, current),
        per_month,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "MRR per customer: monthly-equivalent value of active service line items \
         (lineage-aware) over Customer, non-hidden organizations, divided by their count",
        &serde_json::json!({
            "tenant": tenant,
            "period_start": period.start.to_rfc3339(),
            "period_end": period.end.to_rfc3339(),
            "customer_count": customers.len(),
            "billing_normalization": "monthly x1, quarterly /3, annually /12",
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
    use rust_decimal_macros::dec;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn customer(id: &str) -> Organization {
        Organization {
            id: id.into(),
            name: None,
            relationship: Relationship::Customer,
            hide: false,
        }
    }

    fn live_contract(id: &str, org: &str) -> Contract {
        Contract {
            id: id.into(),
            organization_id: org.into(),
            status: ContractStatus::Live,
            service_started_at: Some(at(2023, 1, 1)),
            ended_at: None,
            billing_cycle: None,
            renewal_cycle: None,
            renewal_periods: None,
        }
    }

    fn sli(
        id: &str,
        contract: &str,
        billed: BilledType,
        price: Decimal,
        qty: Decimal,
        start: DateTime<Utc>,
    ) -> ServiceLineItem {
        ServiceLineItem {
            id: id.into(),
            contract_id: contract.into(),
            billed_type: billed,
            price,
            quantity: qty,
            started_at: start,
            ended_at: None,
            parent_id: None,
            is_canceled: false,
        }
    }

    #[test]
    fn test_single_month_annual() {
        let snapshot = InMemorySnapshot::new("t")
            .with_organization(customer("o1"))
            .with_contract(live_contract("c1", "o1"))
            .with_service_line_item(sli(
                "s1",
                "c1",
                BilledType::Annually,
                dec!(12),
                dec!(2),
                at(2023, 7, 1),
            ));
        let period = Period::new(at(2023, 7, 1), at(2023, 7, 1)).unwrap();

        let out = mrr_per_customer(&snapshot, "t", &period).unwrap().result;
        assert_eq!(out.per_month.len(), 1);
        assert_eq!(out.mrr_per_customer, dec!(2));
        assert_eq!(out.increase_percentage, "+2");
    }

    #[test]
    fn test_hidden_and_prospects_excluded() {
        let mut hidden = customer("o2");
        hidden.hide = true;
        let mut prospect = customer("o3");
        prospect.relationship = Relationship::Prospect;
        let snapshot = InMemorySnapshot::new("t")
            .with_organization(customer("o1"))
            .with_organization(hidden)
            .with_organization(prospect)
            .with_contract(live_contract("c1", "o1"))
            .with_contract(live_contract("c2", "o2"))
            .with_contract(live_contract("c3", "o3"))
            .with_service_line_item(sli(
                "s1",
                "c1",
                BilledType::Monthly,
                dec!(2),
                dec!(1),
                at(2023, 7, 1),
            ))
            .with_service_line_item(sli(
                "s2",
                "c2",
                BilledType::Monthly,
                dec!(50),
                dec!(1),
                at(2023, 7, 1),
            ))
            .with_service_line_item(sli(
                "s3",
                "c3",
                BilledType::Monthly,
                dec!(50),
                dec!(1),
                at(2023, 7, 1),
            ));
        let period = Period::new(at(2023, 7, 1), at(2023, 7, 31)).unwrap();

        let out = mrr_per_customer(&snapshot, "t", &period).unwrap().result;
        assert_eq!(out.mrr_per_customer, dec!(2));
    }

    #[test]
    fn test_empty_tenant_warns() {
        let snapshot = InMemorySnapshot::new("t");
        let period = Period::new(at(2023, 1, 1), at(2023, 3, 1)).unwrap();
        let out = mrr_per_customer(&snapshot, "t", &period).unwrap();
        assert_eq!(out.result.per_month.len(), 3);
        assert_eq!(out.result.increase_percentage, "0%");
        assert_eq!(out.warnings.len(), 1);
    }
}
