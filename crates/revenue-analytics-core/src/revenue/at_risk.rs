use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, warn};

use crate::entities::{ContractStatus, RenewalLikelihood};
use crate::period::Period;
use crate::snapshot::{load_tenant, SnapshotAccessor};
use crate::types::{with_metadata, ComputationOutput, Money};
use crate::AnalyticsResult;

// ---------------------------------------------------------------------------
// Output types — Revenue at risk
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevenueAtRiskOutput {
    /// Renewal value with High likelihood
    pub high_confidence: Money,
    /// Renewal value with Medium, Low or Zero likelihood
    pub at_risk: Money,
}

// ---------------------------------------------------------------------------
// Function: revenue_at_risk
// ---------------------------------------------------------------------------

/// Split open renewal value on live contracts by renewal likelihood.
///
/// A live contract is current for the period when its service started on or
/// before the period end, or has no recorded start.
pub fn revenue_at_risk(
    accessor: &dyn SnapshotAccessor,
    tenant: &str,
    period: &Period,
) -> AnalyticsResult<ComputationOutput<RevenueAtRiskOutput>> {
    let start = Instant::now();
    period.buckets()?;
    let mut warnings: Vec<String> = Vec::new();

    let book = load_tenant(accessor, tenant, &mut warnings)?;

    let mut high_confidence = Decimal::ZERO;
    let mut at_risk = Decimal::ZERO;
    let mut renewals_counted = 0usize;

    for org in book.reportable_customers() {
        for record in &org.contracts {
            let contract = &record.contract;
            if contract.status != ContractStatus::Live {
                continue;
            }
            if contract
                .service_started_at
                .is_some_and(|started| started > period.end)
            {
                continue;
            }
            let Some(opportunity) = record
                .active_renewal
                .as_ref()
                .filter(|o| o.is_open())
            else {
                continue;
            };

            match opportunity.likelihood() {
                Some(RenewalLikelihood::High) => high_confidence += opportunity.max_amount,
                Some(_) => at_risk += opportunity.max_amount,
                None => {
                    warn!(tenant, opportunity = %opportunity.id, "open renewal without likelihood");
                    warnings.push(format!(
                        "Renewal opportunity {} has no likelihood and was not classified",
                        opportunity.id
                    ));
                    continue;
                }
            }
            renewals_counted += 1;
        }
    }

    debug!(
        tenant,
        renewals = renewals_counted,
        high_confidence = %high_confidence,
        at_risk = %at_risk,
        "computed revenue at risk"
    );

    let output = RevenueAtRiskOutput {
        high_confidence,
        at_risk,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Revenue at risk: max amount of open renewal opportunities on live contracts, \
         High likelihood as high confidence, every other likelihood as at risk",
        &serde_json::json!({
            "tenant": tenant,
            "period_start": period.start.to_rfc3339(),
            "period_end": period.end.to_rfc3339(),
            "renewals_counted": renewals_counted,
        }),
        warnings,
        elapsed,
        output,
    ))
}
