//! Which service line items earn revenue in a given month.
//!
//! Items that replace one another through `parent_id` are folded into a
//! [`Lineage`]: one revenue slot whose value in a month is that of the most
//! recently started member active in the month, so a cancelled item and its
//! replacement never both count.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::entities::{Contract, ServiceLineItem};
use crate::period::MonthBucket;
use crate::revenue::billing::sli_monthly_value;
use crate::snapshot::ContractRecord;
use crate::types::Money;

// ---------------------------------------------------------------------------
// Single items
// ---------------------------------------------------------------------------

/// Active iff it started before the bucket ends and has not ended by the
/// bucket's first instant. An item ended at its start instant is never active.
pub fn is_active_in(item: &ServiceLineItem, bucket: &MonthBucket) -> bool {
    !item.ended_immediately()
        && item.started_at < bucket.end
        && item.ended_at.map_or(true, |end| end > bucket.start)
}

pub fn is_active_at(item: &ServiceLineItem, at: DateTime<Utc>) -> bool {
    !item.ended_immediately()
        && item.started_at <= at
        && item.ended_at.map_or(true, |end| end > at)
}

/// A contract passes revenue through for every month up to and including
/// the one that contains its end.
pub fn contract_counts_in(contract: &Contract, bucket: &MonthBucket) -> bool {
    contract.counts_for_revenue() && contract.ended_at.map_or(true, |end| end >= bucket.start)
}

// ---------------------------------------------------------------------------
// Lineages
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Lineage<'a> {
    /// Id of the oldest known ancestor, or the dangling parent id
    pub root_id: String,
    /// Ordered by `started_at`
    pub members: Vec<&'a ServiceLineItem>,
}

impl<'a> Lineage<'a> {
    /// Member whose value the slot carries in the bucket.
    pub fn effective_in(&self, bucket: &MonthBucket) -> Option<&'a ServiceLineItem> {
        self.members
            .iter()
            .rev()
            .find(|item| is_active_in(item, bucket))
            .copied()
    }

    pub fn value_in(&self, bucket: &MonthBucket) -> Money {
        self.effective_in(bucket)
            .map(sli_monthly_value)
            .unwrap_or(Decimal::ZERO)
    }

    pub fn value_at(&self, at: DateTime<Utc>) -> Money {
        self.members
            .iter()
            .rev()
            .find(|item| is_active_at(item, at))
            .map(|item| sli_monthly_value(item))
            .unwrap_or(Decimal::ZERO)
    }

    /// Latest-started member still running at `at`, including one that has
    /// not started yet.
    pub fn head_at(&self, at: DateTime<Utc>) -> Option<&'a ServiceLineItem> {
        self.members
            .iter()
            .rev()
            .find(|item| !item.ended_immediately() && item.ended_at.map_or(true, |end| end > at))
            .copied()
    }
}

fn root_of<'a>(item: &'a ServiceLineItem, by_id: &HashMap<&'a str, &'a ServiceLineItem>) -> String {
    let mut current = item;
    let mut seen: HashSet<&str> = HashSet::new();
    seen.insert(current.id.as_str());

    loop {
        let Some(parent_id) = current.parent_id.as_deref() else {
            return current.id.clone();
        };
        match by_id.get(parent_id) {
            None => return parent_id.to_string(),
            Some(&parent) => {
                if !seen.insert(parent.id.as_str()) {
                    // cycle: every member resolves to the same smallest id
                    return seen
                        .iter()
                        .min()
                        .map(|id| id.to_string())
                        .unwrap_or_else(|| current.id.clone());
                }
                current = parent;
            }
        }
    }
}

/// Group items into lineages, in order of each root's first appearance.
pub fn group_lineages(items: &[ServiceLineItem]) -> Vec<Lineage<'_>> {
    let by_id: HashMap<&str, &ServiceLineItem> =
        items.iter().map(|item| (item.id.as_str(), item)).collect();

    let mut lineages: Vec<Lineage<'_>> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for item in items {
        let root = root_of(item, &by_id);
        match index.get(&root) {
            Some(&i) => lineages[i].members.push(item),
            None => {
                index.insert(root.clone(), lineages.len());
                lineages.push(Lineage {
                    root_id: root,
                    members: vec![item],
                });
            }
        }
    }

    for lineage in &mut lineages {
        lineage.members.sort_by_key(|item| item.started_at);
    }
    lineages
}

// ---------------------------------------------------------------------------
// Contract value
// ---------------------------------------------------------------------------

/// Recurring monthly value the contract earns in the bucket.
pub fn contract_value_in(record: &ContractRecord, bucket: &MonthBucket) -> Money {
    if !contract_counts_in(&record.contract, bucket) {
        return Decimal::ZERO;
    }
    group_lineages(&record.service_line_items)
        .iter()
        .map(|lineage| lineage.value_in(bucket))
        .sum()
}

/// Recurring monthly value at one instant, ignoring the contract's status.
pub fn contract_value_at(record: &ContractRecord, at: DateTime<Utc>) -> Money {
    group_lineages(&record.service_line_items)
        .iter()
        .map(|lineage| lineage.value_at(at))
        .sum()
}

/// Monthly value the contract is set to earn from `at` on: each lineage's
/// [`Lineage::head_at`], so committed items that start later already count.
pub fn contract_run_rate_at(record: &ContractRecord, at: DateTime<Utc>) -> Money {
    group_lineages(&record.service_line_items)
        .iter()
        .filter_map(|lineage| lineage.head_at(at))
        .map(sli_monthly_value)
        .sum()
}
