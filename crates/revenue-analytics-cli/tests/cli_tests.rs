use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use serde_json::Value;
use std::io::Write;
use std::process::{Command, Output};
use std::str::FromStr;

const SNAPSHOT: &str = r#"{
  "tenant": "acme",
  "organizations": [
    { "id": "o1", "name": "Acme Corp", "relationship": "CUSTOMER" },
    { "id": "o2", "relationship": "PROSPECT" }
  ],
  "contracts": [
    {
      "id": "c1",
      "organization_id": "o1",
      "status": "LIVE",
      "service_started_at": "2024-01-10T00:00:00Z",
      "renewal_cycle": "MONTHLY"
    }
  ],
  "service_line_items": [
    {
      "id": "s1",
      "contract_id": "c1",
      "billed_type": "MONTHLY",
      "price": "10",
      "quantity": "2",
      "started_at": "2024-01-10T00:00:00Z"
    }
  ],
  "opportunities": [
    {
      "id": "op1",
      "contract_id": "c1",
      "internal_type": "RENEWAL",
      "internal_stage": "OPEN",
      "max_amount": "240",
      "renewal_details": { "renewal_likelihood": "MEDIUM" }
    }
  ],
  "actions": [
    {
      "id": "a1",
      "organization_id": "o1",
      "type": "ONBOARDING_STATUS_CHANGED",
      "created_at": "2024-02-01T08:00:00Z",
      "properties": { "status": "LATE" }
    },
    {
      "id": "a2",
      "organization_id": "o1",
      "type": "ONBOARDING_STATUS_CHANGED",
      "created_at": "2024-02-01T20:00:00Z",
      "properties": { "status": "DONE" }
    }
  ]
}"#;

fn snapshot_file(contents: &str, suffix: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

fn revdash(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_revdash"))
        .args(args)
        .env_remove("REVDASH_AS_OF")
        .env_remove("REVDASH_WINDOW_MONTHS")
        .env_remove("REVDASH_TENANT")
        .output()
        .unwrap()
}

fn json_output(args: &[&str]) -> Value {
    let out = revdash(args);
    assert!(
        out.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&out.stderr)
    );
    serde_json::from_slice(&out.stdout).unwrap()
}

fn decimal(value: &Value) -> Decimal {
    Decimal::from_str(value.as_str().unwrap()).unwrap()
}

// ===========================================================================
// Metric commands
// ===========================================================================

#[test]
fn test_mrr_per_customer_command() {
    let file = snapshot_file(SNAPSHOT, ".json");
    let path = file.path().to_str().unwrap();
    let v = json_output(&[
        "mrr-per-customer",
        "--input",
        path,
        "--start",
        "2024-01-01",
        "--end",
        "2024-02-15",
    ]);

    assert_eq!(decimal(&v["result"]["mrr_per_customer"]), Decimal::from(20));
    assert_eq!(v["result"]["per_month"].as_array().unwrap().len(), 2);
    assert!(v["methodology"].as_str().unwrap().starts_with("MRR per customer"));
}

#[test]
fn test_arr_breakdown_command() {
    let file = snapshot_file(SNAPSHOT, ".json");
    let path = file.path().to_str().unwrap();
    let v = json_output(&[
        "arr-breakdown",
        "--input",
        path,
        "--start",
        "2024-01-01",
        "--end",
        "2024-02-15",
    ]);

    assert_eq!(decimal(&v["result"]["arr_breakdown"]), Decimal::from(240));
    assert_eq!(v["result"]["increase_percentage"], "0%");
    let months = v["result"]["per_month"].as_array().unwrap();
    assert_eq!(months.len(), 2);
    assert_eq!(decimal(&months[1]["cancellations"]), Decimal::ZERO);
}

#[test]
fn test_customer_map_uses_as_of() {
    let file = snapshot_file(SNAPSHOT, ".json");
    let path = file.path().to_str().unwrap();
    let v = json_output(&["customer-map", "--input", path, "--as-of", "2024-03-01"]);

    let entries = v["result"].as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["state"], "MEDIUM_RISK");
    assert_eq!(decimal(&entries[0]["arr"]), Decimal::from(240));
}

#[test]
fn test_dashboard_from_yaml_config_window() {
    let file = snapshot_file(SNAPSHOT, ".json");
    let config = snapshot_file("window_months: 3\nas_of: 2024-02-20T00:00:00Z\n", ".yaml");
    let v = json_output(&[
        "dashboard",
        "--input",
        file.path().to_str().unwrap(),
        "--config",
        config.path().to_str().unwrap(),
    ]);

    let result = &v["result"];
    assert_eq!(result["tenant"], "acme");
    assert_eq!(result["new_customers"]["per_month"].as_array().unwrap().len(), 3);
    assert_eq!(result["new_customers"]["this_month_count"], 0);
    assert_eq!(
        decimal(&result["onboarding_completion"]["completion_percentage"]),
        Decimal::from(100)
    );
    assert_eq!(
        decimal(&result["time_to_onboard"]["time_to_onboard"]),
        Decimal::from_str("0.5").unwrap()
    );
}

#[test]
fn test_minimal_output_prints_headline() {
    let file = snapshot_file(SNAPSHOT, ".json");
    let out = revdash(&[
        "revenue-at-risk",
        "--input",
        file.path().to_str().unwrap(),
        "--start",
        "2024-01-01",
        "--end",
        "2024-02-01",
        "--output",
        "minimal",
    ]);
    assert!(out.status.success());
    assert_eq!(String::from_utf8_lossy(&out.stdout).trim(), "240");
}

#[test]
fn test_env_tenant_override_reaches_accessor() {
    let file = snapshot_file(SNAPSHOT, ".json");
    let out = Command::new(env!("CARGO_BIN_EXE_revdash"))
        .args(["grr", "--input", file.path().to_str().unwrap()])
        .env("REVDASH_TENANT", "someone-else")
        .env("REVDASH_AS_OF", "2024-02-20")
        .output()
        .unwrap();
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("Unknown tenant"));
}

// ===========================================================================
// Errors and housekeeping
// ===========================================================================

#[test]
fn test_inverted_period_fails() {
    let file = snapshot_file(SNAPSHOT, ".json");
    let out = revdash(&[
        "grr",
        "--input",
        file.path().to_str().unwrap(),
        "--start",
        "2024-03-01",
        "--end",
        "2024-01-01",
    ]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("Failed to get the data for period"));
}

#[test]
fn test_validate_reports_counts() {
    let file = snapshot_file(SNAPSHOT, ".json");
    let v = json_output(&["validate", "--input", file.path().to_str().unwrap()]);
    assert_eq!(v["result"]["valid"], true);
    assert_eq!(v["result"]["contracts"], 1);
    assert_eq!(v["result"]["actions"], 2);
}

#[test]
fn test_validate_rejects_dangling_reference() {
    let broken = SNAPSHOT.replace(r#""organization_id": "o1",
      "status""#, r#""organization_id": "missing",
      "status""#);
    let file = snapshot_file(&broken, ".json");
    let out = revdash(&["validate", "--input", file.path().to_str().unwrap()]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("unknown organization"));
}

#[test]
fn test_version() {
    let v = json_output(&["version"]);
    assert_eq!(v["result"]["name"], "revdash");
}
