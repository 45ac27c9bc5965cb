use serde::{Deserialize, Serialize};

/// Profile record augmenting an external identity with onboarding and
/// billing linkage. Keyed by the identity id; lives in the external
/// profile store, never locally.
///
/// Invariants maintained by the coordinator:
/// - `onboarded == true` implies `name` is non-empty
/// - `subscription_id` present implies `customer_id` present
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    #[serde(default)]
    pub onboarded: bool,
    /// Plan label mirrored from the billing service during reconciliation.
    pub plan_name: Option<String>,
    /// Billing customer reference, set once at onboarding completion.
    pub customer_id: Option<String>,
    /// Billing subscription reference, set once a paid plan is chosen.
    pub subscription_id: Option<String>,
    pub created_at: i64,
}

impl Profile {
    /// Fresh profile inserted at signup: not onboarded, no billing linkage.
    pub fn new(id: &str, email: &str, name: &str, created_at: i64) -> Self {
        Self {
            id: id.to_string(),
            email: email.to_string(),
            name: Some(name.to_string()),
            onboarded: false,
            plan_name: None,
            customer_id: None,
            subscription_id: None,
            created_at,
        }
    }

    /// URL slug for the plan-keyed chat route ("Pro Plan" -> "pro-plan").
    pub fn plan_slug(&self) -> Option<String> {
        self.plan_name
            .as_ref()
            .map(|p| p.trim().to_lowercase().replace(' ', "-"))
    }
}

/// Partial update applied to a profile via the external store.
/// Only set fields are sent; the store applies row-level update semantics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfilePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub onboarded: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription_id: Option<String>,
}

impl ProfilePatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.onboarded.is_none()
            && self.plan_name.is_none()
            && self.customer_id.is_none()
            && self.subscription_id.is_none()
    }

    /// Applies the patch to an owned profile. Used by in-memory stores;
    /// the HTTP store sends the patch as-is.
    pub fn apply(&self, profile: &mut Profile) {
        if let Some(ref name) = self.name {
            profile.name = Some(name.clone());
        }
        if let Some(onboarded) = self.onboarded {
            profile.onboarded = onboarded;
        }
        if let Some(ref plan_name) = self.plan_name {
            profile.plan_name = Some(plan_name.clone());
        }
        if let Some(ref customer_id) = self.customer_id {
            profile.customer_id = Some(customer_id.clone());
        }
        if let Some(ref subscription_id) = self.subscription_id {
            profile.subscription_id = Some(subscription_id.clone());
        }
    }
}
