//! Read-only CRM entities consumed by the analytics engine.
//!
//! Enum values serialize in SCREAMING_SNAKE_CASE (`"OUT_OF_CONTRACT"`,
//! `"ANNUALLY"`), the form in which the CRM stores them.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::Money;

// ---------------------------------------------------------------------------
// Organization
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Relationship {
    Customer,
    Prospect,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub relationship: Relationship,
    /// Hidden organizations are excluded from every dashboard
    #[serde(default)]
    pub hide: bool,
}

impl Organization {
    /// Customer relationship and not hidden.
    pub fn is_reportable_customer(&self) -> bool {
        self.relationship == Relationship::Customer && !self.hide
    }
}

// ---------------------------------------------------------------------------
// Contract
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContractStatus {
    Draft,
    Scheduled,
    Live,
    OutOfContract,
    Ended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RenewalCycle {
    Monthly,
    Quarterly,
    Annual,
}

impl RenewalCycle {
    pub fn months(&self) -> u32 {
        match self {
            RenewalCycle::Monthly => 1,
            RenewalCycle::Quarterly => 3,
            RenewalCycle::Annual => 12,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contract {
    pub id: String,
    pub organization_id: String,
    pub status: ContractStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub billing_cycle: Option<BilledType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub renewal_cycle: Option<RenewalCycle>,
    /// Number of cycles per renewal (multi-year contracts); 1 when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub renewal_periods: Option<u32>,
}

impl Contract {
    /// Draft and scheduled contracts never carry recurring revenue.
    pub fn counts_for_revenue(&self) -> bool {
        !matches!(self.status, ContractStatus::Draft | ContractStatus::Scheduled)
    }

    /// Months between renewals, or None for contracts that never renew.
    pub fn renewal_interval_months(&self) -> Option<u32> {
        let periods = self.renewal_periods.unwrap_or(1).max(1);
        self.renewal_cycle.map(|c| c.months() * periods)
    }
}

// ---------------------------------------------------------------------------
// Service line item
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BilledType {
    Monthly,
    Quarterly,
    Annually,
    Once,
    Usage,
    #[serde(other)]
    None,
}

impl BilledType {
    /// Length of one billing period in months; None for non-recurring billing.
    pub fn months(&self) -> Option<u32> {
        match self {
            BilledType::Monthly => Some(1),
            BilledType::Quarterly => Some(3),
            BilledType::Annually => Some(12),
            BilledType::Once | BilledType::Usage | BilledType::None => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceLineItem {
    pub id: String,
    pub contract_id: String,
    pub billed_type: BilledType,
    pub price: Money,
    pub quantity: Decimal,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    /// The item this one supersedes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub is_canceled: bool,
}

impl ServiceLineItem {
    /// Ended at (or before) the instant it started.
    pub fn ended_immediately(&self) -> bool {
        matches!(self.ended_at, Some(end) if end <= self.started_at)
    }
}

// ---------------------------------------------------------------------------
// Opportunity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OpportunityInternalType {
    Renewal,
    Nbo,
    Upsell,
    CrossSell,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OpportunityStage {
    Open,
    ClosedWon,
    ClosedLost,
}

/// Ordered worst to best, so `min()` over a set of likelihoods is the worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RenewalLikelihood {
    Zero,
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RenewalDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub renewal_likelihood: Option<RenewalLikelihood>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Opportunity {
    pub id: String,
    pub contract_id: String,
    pub internal_type: OpportunityInternalType,
    pub internal_stage: OpportunityStage,
    #[serde(default)]
    pub max_amount: Money,
    #[serde(default)]
    pub renewal_details: RenewalDetails,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<DateTime<Utc>>,
}

impl Opportunity {
    pub fn is_renewal(&self) -> bool {
        self.internal_type == OpportunityInternalType::Renewal
    }

    pub fn is_open(&self) -> bool {
        self.internal_stage == OpportunityStage::Open
    }

    pub fn likelihood(&self) -> Option<RenewalLikelihood> {
        self.renewal_details.renewal_likelihood
    }
}

// ---------------------------------------------------------------------------
// Action
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionType {
    OnboardingStatusChanged,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OnboardingStatus {
    NotApplicable,
    NotStarted,
    OnTrack,
    Late,
    Stuck,
    Done,
    Successful,
    Unknown,
}

impl OnboardingStatus {
    /// Parse a stored status label. Unrecognised labels map to `Unknown`.
    pub fn parse(label: &str) -> Self {
        match label.trim().to_ascii_uppercase().as_str() {
            "NOT_APPLICABLE" => OnboardingStatus::NotApplicable,
            "NOT_STARTED" => OnboardingStatus::NotStarted,
            "ON_TRACK" => OnboardingStatus::OnTrack,
            "LATE" => OnboardingStatus::Late,
            "STUCK" => OnboardingStatus::Stuck,
            "DONE" => OnboardingStatus::Done,
            "SUCCESSFUL" => OnboardingStatus::Successful,
            _ => OnboardingStatus::Unknown,
        }
    }

    /// Statuses that close an onboarding attempt.
    pub fn is_completion(&self) -> bool {
        matches!(self, OnboardingStatus::Done | OnboardingStatus::Successful)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    pub id: String,
    pub organization_id: String,
    #[serde(rename = "type")]
    pub action_type: ActionType,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

impl Action {
    /// The onboarding status carried by an `OnboardingStatusChanged` action.
    pub fn onboarding_status(&self) -> Option<OnboardingStatus> {
        if self.action_type != ActionType::OnboardingStatusChanged {
            return None;
        }
        self.properties
            .get("status")
            .map(|s| OnboardingStatus::parse(s))
    }
}
