use napi::Result as NapiResult;
use napi_derive::napi;
use serde::Serialize;

use revenue_analytics_core::config::parse_instant;
use revenue_analytics_core::period::Period;
use revenue_analytics_core::snapshot::InMemorySnapshot;
use revenue_analytics_core::{customers, dashboard, onboarding, revenue};

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

fn parse_snapshot(snapshot_json: &str) -> NapiResult<InMemorySnapshot> {
    let snapshot: InMemorySnapshot =
        serde_json::from_str(snapshot_json).map_err(to_napi_error)?;
    snapshot.validate().map_err(to_napi_error)?;
    Ok(snapshot)
}

fn parse_period(start: &str, end: &str) -> NapiResult<Period> {
    let start = parse_instant(start).map_err(to_napi_error)?;
    let end = parse_instant(end).map_err(to_napi_error)?;
    Period::new(start, end).map_err(to_napi_error)
}

fn to_json(output: &impl Serialize) -> NapiResult<String> {
    serde_json::to_string(output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Revenue
// ---------------------------------------------------------------------------

#[napi]
pub fn mrr_per_customer(
    snapshot_json: String,
    tenant: String,
    start: String,
    end: String,
) -> NapiResult<String> {
    let snapshot = parse_snapshot(&snapshot_json)?;
    let period = parse_period(&start, &end)?;
    let output = revenue::mrr::mrr_per_customer(&snapshot, &tenant, &period)
        .map_err(to_napi_error)?;
    to_json(&output)
}

#[napi]
pub fn gross_revenue_retention(
    snapshot_json: String,
    tenant: String,
    start: String,
    end: String,
) -> NapiResult<String> {
    let snapshot = parse_snapshot(&snapshot_json)?;
    let period = parse_period(&start, &end)?;
    let output = revenue::grr::gross_revenue_retention(&snapshot, &tenant, &period)
        .map_err(to_napi_error)?;
    to_json(&output)
}

#[napi]
pub fn arr_breakdown(
    snapshot_json: String,
    tenant: String,
    start: String,
    end: String,
) -> NapiResult<String> {
    let snapshot = parse_snapshot(&snapshot_json)?;
    let period = parse_period(&start, &end)?;
    let output = revenue::arr_breakdown::arr_breakdown(&snapshot, &tenant, &period)
        .map_err(to_napi_error)?;
    to_json(&output)
}

#[napi]
pub fn revenue_at_risk(
    snapshot_json: String,
    tenant: String,
    start: String,
    end: String,
) -> NapiResult<String> {
    let snapshot = parse_snapshot(&snapshot_json)?;
    let period = parse_period(&start, &end)?;
    let output = revenue::at_risk::revenue_at_risk(&snapshot, &tenant, &period)
        .map_err(to_napi_error)?;
    to_json(&output)
}

#[napi]
pub fn retention_rate(
    snapshot_json: String,
    tenant: String,
    start: String,
    end: String,
) -> NapiResult<String> {
    let snapshot = parse_snapshot(&snapshot_json)?;
    let period = parse_period(&start, &end)?;
    let output = revenue::retention::retention_rate(&snapshot, &tenant, &period)
        .map_err(to_napi_error)?;
    to_json(&output)
}

// ---------------------------------------------------------------------------
// Customers
// ---------------------------------------------------------------------------

#[napi]
pub fn new_customers(
    snapshot_json: String,
    tenant: String,
    start: String,
    end: String,
) -> NapiResult<String> {
    let snapshot = parse_snapshot(&snapshot_json)?;
    let period = parse_period(&start, &end)?;
    let output = customers::new_customers::new_customers(&snapshot, &tenant, &period)
        .map_err(to_napi_error)?;
    to_json(&output)
}

#[napi]
pub fn customer_map(snapshot_json: String, tenant: String, as_of: String) -> NapiResult<String> {
    let snapshot = parse_snapshot(&snapshot_json)?;
    let as_of = parse_instant(&as_of).map_err(to_napi_error)?;
    let output =
        customers::health::customer_map(&snapshot, &tenant, as_of).map_err(to_napi_error)?;
    to_json(&output)
}

// ---------------------------------------------------------------------------
// Onboarding
// ---------------------------------------------------------------------------

#[napi]
pub fn onboarding_completion(
    snapshot_json: String,
    tenant: String,
    start: String,
    end: String,
) -> NapiResult<String> {
    let snapshot = parse_snapshot(&snapshot_json)?;
    let period = parse_period(&start, &end)?;
    let output = onboarding::completion::onboarding_completion(&snapshot, &tenant, &period)
        .map_err(to_napi_error)?;
    to_json(&output)
}

#[napi]
pub fn time_to_onboard(
    snapshot_json: String,
    tenant: String,
    start: String,
    end: String,
) -> NapiResult<String> {
    let snapshot = parse_snapshot(&snapshot_json)?;
    let period = parse_period(&start, &end)?;
    let output = onboarding::time_to_onboard::time_to_onboard(&snapshot, &tenant, &period)
        .map_err(to_napi_error)?;
    to_json(&output)
}

// ---------------------------------------------------------------------------
// Dashboard
// ---------------------------------------------------------------------------

#[napi]
pub fn build_dashboard(
    snapshot_json: String,
    tenant: String,
    start: String,
    end: String,
    as_of: String,
) -> NapiResult<String> {
    let snapshot = parse_snapshot(&snapshot_json)?;
    let period = parse_period(&start, &end)?;
    let as_of = parse_instant(&as_of).map_err(to_napi_error)?;
    let output = dashboard::build_dashboard(&snapshot, &tenant, &period, as_of)
        .map_err(to_napi_error)?;
    to_json(&output)
}

#[napi]
pub fn validate_snapshot(snapshot_json: String) -> NapiResult<bool> {
    parse_snapshot(&snapshot_json).map(|_| true)
}
