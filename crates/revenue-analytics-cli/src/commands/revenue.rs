use revenue_analytics_core::config::AnalyticsConfig;
use revenue_analytics_core::revenue::{arr_breakdown, at_risk, grr, mrr, retention};
use serde_json::Value;

use super::{prepare, MetricArgs};

pub fn run_mrr_per_customer(
    args: MetricArgs,
    config: &AnalyticsConfig,
) -> Result<Value, Box<dyn std::error::Error>> {
    let ctx = prepare(&args, config)?;
    let result = mrr::mrr_per_customer(&ctx.snapshot, &ctx.tenant, &ctx.period)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_grr(
    args: MetricArgs,
    config: &AnalyticsConfig,
) -> Result<Value, Box<dyn std::error::Error>> {
    let ctx = prepare(&args, config)?;
    let result = grr::gross_revenue_retention(&ctx.snapshot, &ctx.tenant, &ctx.period)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_arr_breakdown(
    args: MetricArgs,
    config: &AnalyticsConfig,
) -> Result<Value, Box<dyn std::error::Error>> {
    let ctx = prepare(&args, config)?;
    let result = arr_breakdown::arr_breakdown(&ctx.snapshot, &ctx.tenant, &ctx.period)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_revenue_at_risk(
    args: MetricArgs,
    config: &AnalyticsConfig,
) -> Result<Value, Box<dyn std::error::Error>> {
    let ctx = prepare(&args, config)?;
    let result = at_risk::revenue_at_risk(&ctx.snapshot, &ctx.tenant, &ctx.period)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_retention_rate(
    args: MetricArgs,
    config: &AnalyticsConfig,
) -> Result<Value, Box<dyn std::error::Error>> {
    let ctx = prepare(&args, config)?;
    let result = retention::retention_rate(&ctx.snapshot, &ctx.tenant, &ctx.period)?;
    Ok(serde_json::to_value(result)?)
}
