use revenue_analytics_core::config::AnalyticsConfig;
use revenue_analytics_core::onboarding::{completion, time_to_onboard};
use serde_json::Value;

use super::{prepare, MetricArgs};

pub fn run_onboarding_completion(
    args: MetricArgs,
    config: &AnalyticsConfig,
) -> Result<Value, Box<dyn std::error::Error>> {
    let ctx = prepare(&args, config)?;
    let result = completion::onboarding_completion(&ctx.snapshot, &ctx.tenant, &ctx.period)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_time_to_onboard(
    args: MetricArgs,
    config: &AnalyticsConfig,
) -> Result<Value, Box<dyn std::error::Error>> {
    let ctx = prepare(&args, config)?;
    let result = time_to_onboard::time_to_onboard(&ctx.snapshot, &ctx.tenant, &ctx.period)?;
    Ok(serde_json::to_value(result)?)
}
