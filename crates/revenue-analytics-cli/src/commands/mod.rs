pub mod customers;
pub mod dashboard;
pub mod onboarding;
pub mod revenue;
pub mod snapshot;

use chrono::{DateTime, Utc};
use clap::Args;
use revenue_analytics_core::config::{parse_instant, AnalyticsConfig};
use revenue_analytics_core::period::Period;
use revenue_analytics_core::snapshot::InMemorySnapshot;
use tracing::info;

use crate::input;

/// Arguments shared by every metric command
#[derive(Args, Debug, Clone, Default)]
pub struct MetricArgs {
    /// Path to a JSON or YAML tenant snapshot (reads stdin when omitted)
    #[arg(long)]
    pub input: Option<String>,

    /// Tenant to report on (defaults to config, then the snapshot's tenant)
    #[arg(long)]
    pub tenant: Option<String>,

    /// Period start, RFC 3339 or YYYY-MM-DD
    #[arg(long)]
    pub start: Option<String>,

    /// Period end, RFC 3339 or YYYY-MM-DD
    #[arg(long)]
    pub end: Option<String>,

    /// Instant treated as "now"
    #[arg(long)]
    pub as_of: Option<String>,
}

/// Everything a metric needs once the arguments are resolved.
pub struct MetricContext {
    pub snapshot: InMemorySnapshot,
    pub tenant: String,
    pub period: Period,
    pub as_of: DateTime<Utc>,
}

/// Load a snapshot from `--input` or stdin and check its references.
pub fn load_snapshot(path: Option<&str>) -> Result<InMemorySnapshot, Box<dyn std::error::Error>> {
    let snapshot: InMemorySnapshot = if let Some(path) = path {
        input::file::read_structured(path)?
    } else if let Some(snapshot) = input::stdin::read_stdin()? {
        snapshot
    } else {
        return Err("--input is required (or pipe a snapshot on stdin)".into());
    };
    snapshot.validate()?;
    Ok(snapshot)
}

pub fn prepare(
    args: &MetricArgs,
    config: &AnalyticsConfig,
) -> Result<MetricContext, Box<dyn std::error::Error>> {
    let mut config = config.clone();
    if let Some(raw) = args.as_of.as_deref() {
        config.as_of = Some(parse_instant(raw)?);
    }

    let snapshot = load_snapshot(args.input.as_deref())?;
    let tenant = args
        .tenant
        .clone()
        .or_else(|| config.tenant.clone())
        .unwrap_or_else(|| snapshot.tenant.clone());

    let start = args.start.as_deref().map(parse_instant).transpose()?;
    let end = args.end.as_deref().map(parse_instant).transpose()?;
    let period = config.resolve_period(start, end)?;
    let as_of = config.now();

    info!(
        tenant = %tenant,
        start = %period.start,
        end = %period.end,
        organizations = snapshot.organizations.len(),
        "prepared metric input"
    );

    Ok(MetricContext {
        snapshot,
        tenant,
        period,
        as_of,
    })
}
