use serde::{Deserialize, Serialize};

/// Subscription status as reported by the billing service.
///
/// The billing service owns this state; we only reflect it at read time.
/// Unrecognized statuses deserialize to `Unknown` and gate as inactive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Trialing,
    PastDue,
    Canceled,
    Incomplete,
    IncompleteExpired,
    Unpaid,
    Paused,
    #[serde(other)]
    Unknown,
}

/// Live snapshot of an externally-owned subscription.
///
/// Fetched fresh on every protected request, never cached beyond one
/// request lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionSnapshot {
    pub id: String,
    pub status: SubscriptionStatus,
    /// End of the current billing period (Unix seconds).
    pub current_period_end: i64,
    pub cancel_at_period_end: bool,
    /// Trial boundary (Unix seconds), present only for trial subscriptions.
    pub trial_end: Option<i64>,
    /// Product behind the subscription's first item, used by reconciliation
    /// to resolve the plan name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
}
