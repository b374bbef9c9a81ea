//! Replay of an organization's onboarding status log.
//!
//! The ordered log is split into attempts. An attempt opens at the first
//! status after a completion (or at the very first status) and is closed by
//! the next `DONE` / `SUCCESSFUL`. A completion that directly follows another
//! completion changes nothing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::entities::{Action, ActionType, OnboardingStatus};
use crate::period::MonthBucket;
use crate::snapshot::CustomerBook;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub at: DateTime<Utc>,
    pub status: OnboardingStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OnboardingAttempt {
    pub started_at: DateTime<Utc>,
    pub first_status: OnboardingStatus,
    /// Instants of every status change belonging to the attempt
    pub events: Vec<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub completed_with: Option<OnboardingStatus>,
}

impl OnboardingAttempt {
    fn open(change: &StatusChange) -> Self {
        OnboardingAttempt {
            started_at: change.at,
            first_status: change.status,
            events: vec![change.at],
            completed_at: None,
            completed_with: None,
        }
    }

    pub fn completed_in(&self, bucket: &MonthBucket) -> bool {
        self.completed_at.is_some_and(|at| bucket.contains(at))
    }

    pub fn touches(&self, bucket: &MonthBucket) -> bool {
        self.events.iter().any(|at| bucket.contains(*at))
    }

    /// Closed by `DONE` after at least one non-completion status.
    pub fn is_measurable(&self) -> bool {
        self.completed_with == Some(OnboardingStatus::Done) && !self.first_status.is_completion()
    }

    /// Seconds from the first status to the completion.
    pub fn duration_seconds(&self) -> Option<i64> {
        self.completed_at
            .map(|done| (done - self.started_at).num_seconds())
    }
}

// ---------------------------------------------------------------------------
// Functions
// ---------------------------------------------------------------------------

/// Onboarding status changes in chronological order. Actions of other types
/// are ignored; onboarding actions without a status are reported and skipped.
pub fn status_changes(actions: &[Action], warnings: &mut Vec<String>) -> Vec<StatusChange> {
    let mut changes: Vec<StatusChange> = Vec::new();
    for action in actions {
        if action.action_type != ActionType::OnboardingStatusChanged {
            continue;
        }
        match action.onboarding_status() {
            Some(status) => changes.push(StatusChange {
                at: action.created_at,
                status,
            }),
            None => {
                warn!(action = %action.id, "onboarding action without a status");
                warnings.push(format!(
                    "Onboarding action {} has no status and was skipped",
                    action.id
                ));
            }
        }
    }
    changes.sort_by_key(|c| c.at);
    changes
}

pub fn attempts(changes: &[StatusChange]) -> Vec<OnboardingAttempt> {
    let mut closed = Vec::new();
    let mut current: Option<OnboardingAttempt> = None;
    let mut previous: Option<OnboardingStatus> = None;

    for change in changes {
        if change.status.is_completion() {
            if previous.is_some_and(|p| p.is_completion()) {
                previous = Some(change.status);
                continue;
            }
            let mut attempt = match current.take() {
                Some(mut open) => {
                    open.events.push(change.at);
                    open
                }
                None => OnboardingAttempt::open(change),
            };
            attempt.completed_at = Some(change.at);
            attempt.completed_with = Some(change.status);
            closed.push(attempt);
        } else {
            match current.as_mut() {
                Some(open) => open.events.push(change.at),
                None => current = Some(OnboardingAttempt::open(change)),
            }
        }
        previous = Some(change.status);
    }

    if let Some(open) = current {
        closed.push(open);
    }
    closed
}

/// Attempts of every non-hidden organization in the tenant. Empty when no
/// organization has an onboarding status.
pub fn tenant_attempts(book: &CustomerBook, warnings: &mut Vec<String>) -> Vec<OnboardingAttempt> {
    book.visible()
        .flat_map(|org| attempts(&status_changes(&org.actions, warnings)))
        .collect()
}
