use revenue_analytics_core::config::AnalyticsConfig;
use revenue_analytics_core::customers::{health, new_customers};
use serde_json::Value;

use super::{prepare, MetricArgs};

pub fn run_new_customers(
    args: MetricArgs,
    config: &AnalyticsConfig,
) -> Result<Value, Box<dyn std::error::Error>> {
    let ctx = prepare(&args, config)?;
    let result = new_customers::new_customers(&ctx.snapshot, &ctx.tenant, &ctx.period)?;
    Ok(serde_json::to_value(result)?)
}

/// The customer map is a point-in-time view; only `--as-of` matters.
pub fn run_customer_map(
    args: MetricArgs,
    config: &AnalyticsConfig,
) -> Result<Value, Box<dyn std::error::Error>> {
    let ctx = prepare(&args, config)?;
    let result = health::customer_map(&ctx.snapshot, &ctx.tenant, ctx.as_of)?;
    Ok(serde_json::to_value(result)?)
}
