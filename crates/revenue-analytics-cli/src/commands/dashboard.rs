use revenue_analytics_core::config::AnalyticsConfig;
use revenue_analytics_core::dashboard::build_dashboard;
use serde_json::Value;

use super::{prepare, MetricArgs};

pub fn run_dashboard(
    args: MetricArgs,
    config: &AnalyticsConfig,
) -> Result<Value, Box<dyn std::error::Error>> {
    let ctx = prepare(&args, config)?;
    let result = build_dashboard(&ctx.snapshot, &ctx.tenant, &ctx.period, ctx.as_of)?;
    Ok(serde_json::to_value(result)?)
}
