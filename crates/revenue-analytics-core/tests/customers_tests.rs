use chrono::{DateTime, TimeZone, Utc};
use pretty_assertions::assert_eq;
use revenue_analytics_core::customers::health::{customer_map, CustomerState};
use revenue_analytics_core::customers::new_customers::new_customers;
use revenue_analytics_core::entities::*;
use revenue_analytics_core::period::Period;
use revenue_analytics_core::snapshot::InMemorySnapshot;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

const TENANT: &str = "acme-tenant";

// ===========================================================================
// Fixtures
// ===========================================================================

fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
}

fn as_of() -> DateTime<Utc> {
    at(2024, 2, 15)
}

fn org(id: &str, relationship: Relationship, hide: bool) -> Organization {
    Organization {
        id: id.into(),
        name: Some(format!("Org {id}")),
        relationship,
        hide,
    }
}

fn contract(id: &str, org: &str, status: ContractStatus, started: DateTime<Utc>) -> Contract {
    Contract {
        id: id.into(),
        organization_id: org.into(),
        status,
        service_started_at: Some(started),
        ended_at: None,
        billing_cycle: Some(BilledType::Monthly),
        renewal_cycle: Some(RenewalCycle::Annual),
        renewal_periods: None,
    }
}

fn monthly_item(
    id: &str,
    contract: &str,
    price: Decimal,
    started: DateTime<Utc>,
) -> ServiceLineItem {
    ServiceLineItem {
        id: id.into(),
        contract_id: contract.into(),
        billed_type: BilledType::Monthly,
        price,
        quantity: dec!(1),
        started_at: started,
        ended_at: None,
        parent_id: None,
        is_canceled: false,
    }
}

fn open_renewal(id: &str, contract: &str, likelihood: RenewalLikelihood) -> Opportunity {
    Opportunity {
        id: id.into(),
        contract_id: contract.into(),
        internal_type: OpportunityInternalType::Renewal,
        internal_stage: OpportunityStage::Open,
        max_amount: dec!(12),
        renewal_details: RenewalDetails {
            renewal_likelihood: Some(likelihood),
        },
        created_at: Some(at(2024, 1, 2)),
        closed_at: None,
    }
}

// ===========================================================================
// Customer map
// ===========================================================================

fn health_snapshot() -> InMemorySnapshot {
    let mut ended = contract("c3", "o2", ContractStatus::Ended, at(2023, 3, 1));
    ended.ended_at = Some(at(2023, 12, 1));

    InMemorySnapshot::new(TENANT)
        // o1: two running contracts, worst renewal is Medium
        .with_organization(org("o1", Relationship::Customer, false))
        .with_contract(contract("c1", "o1", ContractStatus::Live, at(2023, 5, 10)))
        .with_contract(contract("c2", "o1", ContractStatus::Live, at(2023, 7, 1)))
        .with_service_line_item(monthly_item("s1", "c1", dec!(1), at(2023, 5, 10)))
        .with_service_line_item(monthly_item("s2", "c2", dec!(1), at(2023, 7, 1)))
        .with_opportunity(open_renewal("op1", "c1", RenewalLikelihood::High))
        .with_opportunity(open_renewal("op2", "c2", RenewalLikelihood::Medium))
        // o2: everything ended
        .with_organization(org("o2", Relationship::Customer, false))
        .with_contract(ended)
        .with_service_line_item(monthly_item("s3", "c3", dec!(5), at(2023, 3, 1)))
        // o3: hidden
        .with_organization(org("o3", Relationship::Customer, true))
        .with_contract(contract("c4", "o3", ContractStatus::Live, at(2023, 1, 1)))
        .with_service_line_item(monthly_item("s4", "c4", dec!(100), at(2023, 1, 1)))
        // o4: prospect
        .with_organization(org("o4", Relationship::Prospect, false))
        .with_contract(contract("c5", "o4", ContractStatus::Live, at(2023, 1, 1)))
        .with_service_line_item(monthly_item("s5", "c5", dec!(100), at(2023, 1, 1)))
        // o5: draft only
        .with_organization(org("o5", Relationship::Customer, false))
        .with_contract(contract("c6", "o5", ContractStatus::Draft, at(2024, 3, 1)))
        .with_service_line_item(monthly_item("s6", "c6", dec!(100), at(2024, 3, 1)))
}

#[test]
fn test_customer_map_states_and_arr() {
    let out = customer_map(&health_snapshot(), TENANT, as_of()).unwrap();
    let entries = &out.result;

    assert_eq!(entries.len(), 2);

    assert_eq!(entries[0].organization_id, "o1");
    assert_eq!(entries[0].state, CustomerState::MediumRisk);
    assert_eq!(entries[0].arr, dec!(24));
    assert_eq!(entries[0].contract_signed_date, at(2023, 5, 10));

    assert_eq!(entries[1].organization_id, "o2");
    assert_eq!(entries[1].state, CustomerState::Churned);
    assert_eq!(entries[1].arr, dec!(60));
}

#[test]
fn test_customer_map_reports_skipped_customers() {
    let out = customer_map(&health_snapshot(), TENANT, as_of()).unwrap();
    assert_eq!(out.warnings.len(), 1);
    assert!(out.warnings[0].starts_with("1 customer organization"));
}

#[test]
fn test_customer_map_state_wire_format() {
    let out = customer_map(&health_snapshot(), TENANT, as_of()).unwrap();
    let json = serde_json::to_value(&out.result).unwrap();
    assert_eq!(json[0]["state"], "MEDIUM_RISK");
    assert_eq!(json[1]["state"], "CHURNED");
}

#[test]
fn test_customer_map_counts_items_starting_after_as_of() {
    let snapshot = InMemorySnapshot::new(TENANT)
        .with_organization(org("o1", Relationship::Customer, false))
        .with_contract(contract("c1", "o1", ContractStatus::Live, at(2022, 1, 1)))
        .with_service_line_item(monthly_item("s1", "c1", dec!(10), at(2024, 6, 1)));

    let out = customer_map(&snapshot, TENANT, at(2024, 3, 1)).unwrap();
    assert_eq!(out.result.len(), 1);
    assert_eq!(out.result[0].state, CustomerState::Ok);
    assert_eq!(out.result[0].arr, dec!(120));
}

#[test]
fn test_customer_map_uses_latest_version_of_replaced_item() {
    let mut first = monthly_item("s1", "c1", dec!(10), at(2023, 1, 1));
    first.ended_at = Some(at(2024, 4, 1));
    first.is_canceled = true;
    let mut second = monthly_item("s2", "c1", dec!(15), at(2024, 4, 1));
    second.parent_id = Some("s1".into());

    let snapshot = InMemorySnapshot::new(TENANT)
        .with_organization(org("o1", Relationship::Customer, false))
        .with_contract(contract("c1", "o1", ContractStatus::Live, at(2023, 1, 1)))
        .with_service_line_item(first)
        .with_service_line_item(second);

    let out = customer_map(&snapshot, TENANT, as_of()).unwrap();
    assert_eq!(out.result[0].arr, dec!(180));
}

// ===========================================================================
// New customers
// ===========================================================================

fn signing_snapshot() -> InMemorySnapshot {
    let mut short = contract("c5", "o5", ContractStatus::Live, at(2024, 2, 2));
    short.ended_at = Some(at(2024, 2, 20));

    InMemorySnapshot::new(TENANT)
        .with_organization(org("o1", Relationship::Customer, false))
        .with_contract(contract("c1", "o1", ContractStatus::Live, at(2024, 1, 5)))
        .with_organization(org("o2", Relationship::Customer, false))
        .with_contract(contract("c2", "o2", ContractStatus::Live, at(2024, 2, 10)))
        // second contract for the same organization in the same month
        .with_contract(contract("c2b", "o2", ContractStatus::Scheduled, at(2024, 2, 11)))
        .with_organization(org("o3", Relationship::Prospect, false))
        .with_contract(contract("c3", "o3", ContractStatus::Live, at(2024, 2, 3)))
        .with_organization(org("o4", Relationship::Customer, true))
        .with_contract(contract("c4", "o4", ContractStatus::Live, at(2024, 2, 3)))
        .with_organization(org("o5", Relationship::Customer, false))
        .with_contract(short)
        .with_organization(org("o6", Relationship::Customer, false))
        .with_contract(contract("c6", "o6", ContractStatus::Draft, at(2024, 2, 3)))
}

#[test]
fn test_new_customers_per_month() {
    let period = Period::new(at(2024, 1, 1), at(2024, 2, 28)).unwrap();
    let out = new_customers(&signing_snapshot(), TENANT, &period).unwrap();
    let r = &out.result;

    let counts: Vec<u32> = r.per_month.iter().map(|m| m.count).collect();
    assert_eq!(counts, vec![1, 2]);
    assert_eq!(r.this_month_count, 2);
    assert_eq!(r.this_month_increase_percentage, dec!(100));
    assert_eq!(r.this_month_increase_display, "+100%");
}

#[test]
fn test_new_customers_single_month_has_no_increase() {
    let period = Period::new(at(2024, 1, 1), at(2024, 1, 31)).unwrap();
    let out = new_customers(&signing_snapshot(), TENANT, &period).unwrap();
    let r = &out.result;

    assert_eq!(r.per_month.len(), 1);
    assert_eq!(r.this_month_count, 1);
    assert_eq!(r.this_month_increase_percentage, Decimal::ZERO);
}

#[test]
fn test_new_customers_empty_tenant() {
    let period = Period::new(at(2024, 1, 1), at(2024, 3, 1)).unwrap();
    let out = new_customers(&InMemorySnapshot::new(TENANT), TENANT, &period).unwrap();
    let r = &out.result;

    assert_eq!(r.per_month.len(), 3);
    assert!(r.per_month.iter().all(|m| m.count == 0));
    assert_eq!(r.this_month_increase_percentage, Decimal::ZERO);
    assert_eq!(r.this_month_increase_display, "0%");
}
