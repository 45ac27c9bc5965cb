use serde::Serialize;

use crate::models::{SubscriptionSnapshot, SubscriptionStatus};

/// Derived access classification for a subscribed caller.
///
/// Mutually exclusive, recomputed on every protected request from the live
/// subscription snapshot. Nothing is persisted; the billing service is the
/// only party that transitions subscription state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessState {
    /// Full access: active, or trialing with the trial still running.
    Active,
    /// Trialing with the trial boundary in the past. Access denied; the
    /// billing service flips the status itself, we never simulate it.
    TrialExpired,
    /// Any other status (past_due, canceled, incomplete, ...).
    Inactive,
}

impl AccessState {
    /// Pure classification function. `now` is Unix seconds.
    pub fn classify(snapshot: &SubscriptionSnapshot, now: i64) -> Self {
        match snapshot.status {
            SubscriptionStatus::Active => AccessState::Active,
            SubscriptionStatus::Trialing => match snapshot.trial_end {
                Some(trial_end) if trial_end <= now => AccessState::TrialExpired,
                _ => AccessState::Active,
            },
            _ => AccessState::Inactive,
        }
    }

    /// User-visible message for denied states; `None` means access granted.
    /// Single mapping so the message is never re-derived ad hoc per page.
    pub fn denial_message(&self) -> Option<&'static str> {
        match self {
            AccessState::Active => None,
            AccessState::TrialExpired => {
                Some("Your trial has ended. Please renew your subscription to continue.")
            }
            AccessState::Inactive => {
                Some("Your subscription is not active. Please renew your subscription to continue.")
            }
        }
    }
}
