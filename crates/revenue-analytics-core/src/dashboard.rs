//! All dashboard metrics for one tenant and period in a single call.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::info;

use crate::customers::health::{customer_map, CustomerMapEntry};
use crate::customers::new_customers::{new_customers, NewCustomersOutput};
use crate::onboarding::completion::{onboarding_completion, OnboardingCompletionOutput};
use crate::onboarding::time_to_onboard::{time_to_onboard, TimeToOnboardOutput};
use crate::period::Period;
use crate::revenue::arr_breakdown::{arr_breakdown, ArrBreakdownOutput};
use crate::revenue::at_risk::{revenue_at_risk, RevenueAtRiskOutput};
use crate::revenue::grr::{gross_revenue_retention, GrossRevenueRetentionOutput};
use crate::revenue::mrr::{mrr_per_customer, MrrPerCustomerOutput};
use crate::revenue::retention::{retention_rate, RetentionRateOutput};
use crate::snapshot::SnapshotAccessor;
use crate::types::{with_metadata, ComputationOutput};
use crate::AnalyticsResult;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardOutput {
    pub tenant: String,
    pub new_customers: NewCustomersOutput,
    pub mrr_per_customer: MrrPerCustomerOutput,
    pub gross_revenue_retention: GrossRevenueRetentionOutput,
    pub arr_breakdown: ArrBreakdownOutput,
    pub revenue_at_risk: RevenueAtRiskOutput,
    pub retention_rate: RetentionRateOutput,
    pub customer_map: Vec<CustomerMapEntry>,
    pub onboarding_completion: OnboardingCompletionOutput,
    pub time_to_onboard: TimeToOnboardOutput,
}

/// Unwrap a metric envelope, keeping its warnings under the metric's name.
fn collect<T: Serialize>(
    name: &str,
    output: ComputationOutput<T>,
    warnings: &mut Vec<String>,
) -> T {
    warnings.extend(output.warnings.into_iter().map(|w| format!("{name}: {w}")));
    output.result
}

pub fn build_dashboard(
    accessor: &dyn SnapshotAccessor,
    tenant: &str,
    period: &Period,
    as_of: DateTime<Utc>,
) -> AnalyticsResult<ComputationOutput<DashboardOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let output = DashboardOutput {
        tenant: tenant.to_string(),
        new_customers: collect(
            "new_customers",
            new_customers(accessor, tenant, period)?,
            &mut warnings,
        ),
        mrr_per_customer: collect(
            "mrr_per_customer",
            mrr_per_customer(accessor, tenant, period)?,
            &mut warnings,
        ),
        gross_revenue_retention: collect(
            "gross_revenue_retention",
            gross_revenue_retention(accessor, tenant, period)?,
            &mut warnings,
        ),
        arr_breakdown: collect(
            "arr_breakdown",
            arr_breakdown(accessor, tenant, period)?,
            &mut warnings,
        ),
        revenue_at_risk: collect(
            "revenue_at_risk",
            revenue_at_risk(accessor, tenant, period)?,
            &mut warnings,
        ),
        retention_rate: collect(
            "retention_rate",
            retention_rate(accessor, tenant, period)?,
            &mut warnings,
        ),
        customer_map: collect(
            "customer_map",
            customer_map(accessor, tenant, as_of)?,
            &mut warnings,
        ),
        onboarding_completion: collect(
            "onboarding_completion",
            onboarding_completion(accessor, tenant, period)?,
            &mut warnings,
        ),
        time_to_onboard: collect(
            "time_to_onboard",
            time_to_onboard(accessor, tenant, period)?,
            &mut warnings,
        ),
    };

    info!(
        tenant,
        customers = output.customer_map.len(),
        warnings = warnings.len(),
        "built dashboard"
    );

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Dashboard: every revenue, customer-health and onboarding metric over one period",
        &serde_json::json!({
            "tenant": tenant,
            "period_start": period.start.to_rfc3339(),
            "period_end": period.end.to_rfc3339(),
            "as_of": as_of.to_rfc3339(),
        }),
        warnings,
        elapsed,
        output,
    ))
}
