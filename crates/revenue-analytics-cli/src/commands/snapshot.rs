use clap::Args;
use serde_json::{json, Value};

use super::load_snapshot;

/// Arguments for snapshot validation
#[derive(Args)]
pub struct ValidateArgs {
    /// Path to a JSON or YAML tenant snapshot (reads stdin when omitted)
    #[arg(long)]
    pub input: Option<String>,
}

/// Check referential integrity and report entity counts.
pub fn run_validate(args: ValidateArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let snapshot = load_snapshot(args.input.as_deref())?;
    Ok(json!({
        "result": {
            "valid": true,
            "tenant": snapshot.tenant,
            "organizations": snapshot.organizations.len(),
            "contracts": snapshot.contracts.len(),
            "service_line_items": snapshot.service_line_items.len(),
            "opportunities": snapshot.opportunities.len(),
            "actions": snapshot.actions.len(),
        }
    }))
}
