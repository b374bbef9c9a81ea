//! Read access to a tenant's entity graph.
//!
//! Metrics never talk to storage directly. They go through
//! [`SnapshotAccessor`], and most of them first flatten the tenant into a
//! [`CustomerBook`] with [`load_tenant`].

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::entities::{Action, Contract, Opportunity, Organization, ServiceLineItem};
use crate::error::AnalyticsError;
use crate::AnalyticsResult;

// ---------------------------------------------------------------------------
// Accessor trait
// ---------------------------------------------------------------------------

pub trait SnapshotAccessor {
    /// Organizations of the tenant, in creation order.
    fn organizations(&self, tenant: &str) -> AnalyticsResult<Vec<Organization>>;

    fn contracts(&self, organization_id: &str) -> AnalyticsResult<Vec<Contract>>;

    fn service_line_items(&self, contract_id: &str) -> AnalyticsResult<Vec<ServiceLineItem>>;

    fn opportunities(&self, contract_id: &str) -> AnalyticsResult<Vec<Opportunity>>;

    fn actions(&self, organization_id: &str) -> AnalyticsResult<Vec<Action>>;

    /// The opportunity currently representing the contract's renewal.
    fn active_renewal_opportunity(
        &self,
        contract_id: &str,
    ) -> AnalyticsResult<Option<Opportunity>> {
        Ok(select_active_renewal(&self.opportunities(contract_id)?))
    }
}

/// Open renewal if there is one (latest created wins), otherwise the most
/// recently closed renewal.
pub fn select_active_renewal(opportunities: &[Opportunity]) -> Option<Opportunity> {
    let renewals = || opportunities.iter().filter(|o| o.is_renewal());

    let open = renewals()
        .filter(|o| o.is_open())
        .max_by_key(|o| o.created_at);
    if let Some(open) = open {
        return Some(open.clone());
    }

    renewals()
        .max_by_key(|o| (o.closed_at, o.created_at))
        .cloned()
}

// ---------------------------------------------------------------------------
// In-memory snapshot
// ---------------------------------------------------------------------------

/// A single tenant's entities held in vectors, in insertion order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InMemorySnapshot {
    pub tenant: String,
    #[serde(default)]
    pub organizations: Vec<Organization>,
    #[serde(default)]
    pub contracts: Vec<Contract>,
    #[serde(default)]
    pub service_line_items: Vec<ServiceLineItem>,
    #[serde(default)]
    pub opportunities: Vec<Opportunity>,
    #[serde(default)]
    pub actions: Vec<Action>,
}

impl InMemorySnapshot {
    pub fn new(tenant: impl Into<String>) -> Self {
        InMemorySnapshot {
            tenant: tenant.into(),
            ..Default::default()
        }
    }

    pub fn with_organization(mut self, organization: Organization) -> Self {
        self.organizations.push(organization);
        self
    }

    pub fn with_contract(mut self, contract: Contract) -> Self {
        self.contracts.push(contract);
        self
    }

    pub fn with_service_line_item(mut self, item: ServiceLineItem) -> Self {
        self.service_line_items.push(item);
        self
    }

    pub fn with_opportunity(mut self, opportunity: Opportunity) -> Self {
        self.opportunities.push(opportunity);
        self
    }

    pub fn with_action(mut self, action: Action) -> Self {
        self.actions.push(action);
        self
    }

    /// Referential integrity and value sanity checks.
    pub fn validate(&self) -> AnalyticsResult<()> {
        if self.tenant.trim().is_empty() {
            return Err(AnalyticsError::invalid_input("tenant", "must not be empty"));
        }

        let org_ids: HashSet<&str> = self.organizations.iter().map(|o| o.id.as_str()).collect();
        if org_ids.len() != self.organizations.len() {
            return Err(AnalyticsError::invalid_input(
                "organizations",
                "duplicate organization id",
            ));
        }

        let contract_ids: HashSet<&str> = self.contracts.iter().map(|c| c.id.as_str()).collect();
        if contract_ids.len() != self.contracts.len() {
            return Err(AnalyticsError::invalid_input(
                "contracts",
                "duplicate contract id",
            ));
        }
        for contract in &self.contracts {
            if !org_ids.contains(contract.organization_id.as_str()) {
                return Err(AnalyticsError::invalid_input(
                    format!("contracts[{}].organization_id", contract.id),
                    format!("unknown organization '{}'", contract.organization_id),
                ));
            }
        }

        for item in &self.service_line_items {
            if !contract_ids.contains(item.contract_id.as_str()) {
                return Err(AnalyticsError::invalid_input(
                    format!("service_line_items[{}].contract_id", item.id),
                    format!("unknown contract '{}'", item.contract_id),
                ));
            }
            if item.quantity.is_sign_negative() && !item.quantity.is_zero() {
                return Err(AnalyticsError::invalid_input(
                    format!("service_line_items[{}].quantity", item.id),
                    "must not be negative",
                ));
            }
        }

        for opportunity in &self.opportunities {
            if !contract_ids.contains(opportunity.contract_id.as_str()) {
                return Err(AnalyticsError::invalid_input(
                    format!("opportunities[{}].contract_id", opportunity.id),
                    format!("unknown contract '{}'", opportunity.contract_id),
                ));
            }
        }

        for action in &self.actions {
            if !org_ids.contains(action.organization_id.as_str()) {
                return Err(AnalyticsError::invalid_input(
                    format!("actions[{}].organization_id", action.id),
                    format!("unknown organization '{}'", action.organization_id),
                ));
            }
        }

        Ok(())
    }
}

impl SnapshotAccessor for InMemorySnapshot {
    fn organizations(&self, tenant: &str) -> AnalyticsResult<Vec<Organization>> {
        if tenant != self.tenant {
            return Err(AnalyticsError::UnknownTenant(tenant.to_string()));
        }
        Ok(self.organizations.clone())
    }

    fn contracts(&self, organization_id: &str) -> AnalyticsResult<Vec<Contract>> {
        Ok(self
            .contracts
            .iter()
            .filter(|c| c.organization_id == organization_id)
            .cloned()
            .collect())
    }

    fn service_line_items(&self, contract_id: &str) -> AnalyticsResult<Vec<ServiceLineItem>> {
        Ok(self
            .service_line_items
            .iter()
            .filter(|s| s.contract_id == contract_id)
            .cloned()
            .collect())
    }

    fn opportunities(&self, contract_id: &str) -> AnalyticsResult<Vec<Opportunity>> {
        Ok(self
            .opportunities
            .iter()
            .filter(|o| o.contract_id == contract_id)
            .cloned()
            .collect())
    }

    fn actions(&self, organization_id: &str) -> AnalyticsResult<Vec<Action>> {
        Ok(self
            .actions
            .iter()
            .filter(|a| a.organization_id == organization_id)
            .cloned()
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Flattened tenant view
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ContractRecord {
    pub contract: Contract,
    pub service_line_items: Vec<ServiceLineItem>,
    pub opportunities: Vec<Opportunity>,
    pub active_renewal: Option<Opportunity>,
}

#[derive(Debug, Clone)]
pub struct OrganizationRecord {
    pub organization: Organization,
    pub contracts: Vec<ContractRecord>,
    pub actions: Vec<Action>,
}

/// Everything the metrics read for one tenant, fetched once.
#[derive(Debug, Clone, Default)]
pub struct CustomerBook {
    pub organizations: Vec<OrganizationRecord>,
}

impl CustomerBook {
    /// Customer, non-hidden organizations.
    pub fn reportable_customers(&self) -> impl Iterator<Item = &OrganizationRecord> {
        self.organizations
            .iter()
            .filter(|o| o.organization.is_reportable_customer())
    }

    /// Non-hidden organizations of any relationship.
    pub fn visible(&self) -> impl Iterator<Item = &OrganizationRecord> {
        self.organizations.iter().filter(|o| !o.organization.hide)
    }
}

/// Walk the accessor for one tenant. Suspicious data is reported in
/// `warnings` and kept; only accessor failures abort.
pub fn load_tenant(
    accessor: &dyn SnapshotAccessor,
    tenant: &str,
    warnings: &mut Vec<String>,
) -> AnalyticsResult<CustomerBook> {
    let mut organizations = Vec::new();

    for organization in accessor.organizations(tenant)? {
        let mut contracts = Vec::new();
        for contract in accessor.contracts(&organization.id)? {
            let service_line_items = accessor.service_line_items(&contract.id)?;
            for item in &service_line_items {
                if item.price.is_sign_negative() && !item.price.is_zero() {
                    let msg = format!("Service line item {} has a negative price", item.id);
                    warn!(tenant, sli = %item.id, "negative service line item price");
                    warnings.push(msg);
                }
            }

            let opportunities = accessor.opportunities(&contract.id)?;
            let open_renewals = opportunities
                .iter()
                .filter(|o| o.is_renewal() && o.is_open())
                .count();
            if open_renewals > 1 {
                warn!(
                    tenant,
                    contract = %contract.id,
                    open_renewals,
                    "several open renewal opportunities"
                );
                warnings.push(format!(
                    "Contract {} has {open_renewals} open renewal opportunities; using the latest",
                    contract.id
                ));
            }
            let active_renewal = accessor.active_renewal_opportunity(&contract.id)?;

            contracts.push(ContractRecord {
                contract,
                service_line_items,
                opportunities,
                active_renewal,
            });
        }

        let actions = accessor.actions(&organization.id)?;
        organizations.push(OrganizationRecord {
            organization,
            contracts,
            actions,
        });
    }

    Ok(CustomerBook { organizations })
}
