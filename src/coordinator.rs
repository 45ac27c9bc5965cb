//! Account Lifecycle Coordinator.
//!
//! Reconciles the identity backend, the profile store, and the billing
//! service into one derived access state per request, and drives the two
//! transitions this service owns: onboarding completion and checkout
//! reconciliation. Every operation takes the resolved caller explicitly;
//! there is no ambient current-user state.

use std::sync::Arc;

use serde::Serialize;

use crate::error::{msg, AppError, OptionExt, Result};
use crate::middleware::Caller;
use crate::models::{AccessState, Profile, ProfilePatch, SubscriptionSnapshot};
use crate::payments::Billing;
use crate::stores::ProfileStore;

/// Outcome of the onboarding gate for a protected request.
#[derive(Debug, Clone)]
pub enum Gate {
    /// Profile absent or `onboarded == false`: caller must complete onboarding.
    NeedsOnboarding,
    /// Onboarded but no subscription reference yet: caller must pick a plan.
    NeedsPlanSelection(Profile),
    /// Subscription reference present; access nuance is the subscription
    /// gate's business.
    Granted(Profile),
}

impl Gate {
    /// Route the caller should be sent to when not granted.
    pub fn redirect(&self) -> Option<&'static str> {
        match self {
            Gate::NeedsOnboarding => Some("/"),
            Gate::NeedsPlanSelection(_) => Some("/pricing"),
            Gate::Granted(_) => None,
        }
    }
}

/// Live subscription view returned by `GET /subscription`.
#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionOverview {
    pub plan_name: Option<String>,
    pub subscription: SubscriptionSnapshot,
    pub access: AccessState,
}

pub struct Coordinator {
    profiles: Arc<dyn ProfileStore>,
    billing: Arc<dyn Billing>,
}

impl Coordinator {
    pub fn new(profiles: Arc<dyn ProfileStore>, billing: Arc<dyn Billing>) -> Self {
        Self { profiles, billing }
    }

    /// Inserts the default profile created at signup. Kept on the
    /// coordinator so the profile store handle stays behind one seam.
    pub async fn insert_profile(&self, profile: &Profile) -> Result<()> {
        self.profiles.insert(profile).await
    }

    /// Onboarding gate: classifies the caller from the profile record.
    ///
    /// A profile can be absent for a moment right after signup (the insert
    /// races the first protected request); that reads as not onboarded.
    pub async fn resolve_gate(&self, caller: &Caller) -> Result<Gate> {
        let profile = match self.profiles.get(&caller.id).await? {
            Some(p) => p,
            None => return Ok(Gate::NeedsOnboarding),
        };

        if !profile.onboarded {
            return Ok(Gate::NeedsOnboarding);
        }

        if profile.subscription_id.is_none() {
            return Ok(Gate::NeedsPlanSelection(profile));
        }

        Ok(Gate::Granted(profile))
    }

    /// One-time onboarding transition, atomic-or-none from the caller's view.
    ///
    /// Order matters: the billing customer is created first, and the profile
    /// write carries name + onboarded + customer reference in a single
    /// update. If customer creation fails, the profile is untouched and the
    /// caller stays un-onboarded. If the profile write fails afterwards, the
    /// orphaned billing customer is logged and not retried - it is inert,
    /// never referenced by any profile.
    pub async fn complete_onboarding(&self, caller: &Caller, name: &str) -> Result<Profile> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::BadRequest(msg::NAME_EMPTY.into()));
        }

        let existing = self.profiles.get(&caller.id).await?;
        if let Some(ref profile) = existing
            && profile.onboarded
        {
            // Already onboarded: no-op rather than minting another customer.
            // A concurrent pair of requests can still slip past this check;
            // the duplicate customer is tolerated.
            return Ok(profile.clone());
        }

        let customer_id = self
            .billing
            .create_customer(name, &caller.email, &caller.id)
            .await?;

        let result = match existing {
            Some(mut profile) => {
                let patch = ProfilePatch {
                    name: Some(name.to_string()),
                    onboarded: Some(true),
                    customer_id: Some(customer_id.clone()),
                    ..Default::default()
                };
                self.profiles.update(&caller.id, &patch).await.map(|_| {
                    patch.apply(&mut profile);
                    profile
                })
            }
            None => {
                let mut profile =
                    Profile::new(&caller.id, &caller.email, name, chrono::Utc::now().timestamp());
                profile.onboarded = true;
                profile.customer_id = Some(customer_id.clone());
                self.profiles.insert(&profile).await.map(|_| profile)
            }
        };

        if result.is_err() {
            tracing::warn!(
                "Profile write failed after customer creation; orphaned billing customer {} for identity {}",
                customer_id,
                caller.id
            );
        }

        result
    }

    /// Fresh checkout session secret for the hosted pricing widget.
    ///
    /// A missing customer reference here is an ordering bug, not user error:
    /// the onboarding gate guarantees onboarding (and thus customer
    /// creation) happened before plan selection is reachable.
    pub async fn checkout_secret(&self, caller: &Caller) -> Result<String> {
        let profile = self.profiles.get(&caller.id).await?;
        let customer_id = profile
            .and_then(|p| p.customer_id)
            .ok_or_else(|| {
                AppError::Internal(format!(
                    "customer reference missing for onboarded identity {}",
                    caller.id
                ))
            })?;

        self.billing.create_customer_session(&customer_id).await
    }

    /// Live subscription overview plus derived access state.
    pub async fn subscription_overview(&self, caller: &Caller) -> Result<SubscriptionOverview> {
        let profile = self
            .profiles
            .get(&caller.id)
            .await?
            .or_not_found(msg::NO_SUBSCRIPTION)?;

        let subscription_id = profile
            .subscription_id
            .as_deref()
            .or_not_found(msg::NO_SUBSCRIPTION)?;

        let subscription = self.billing.get_subscription(subscription_id).await?;
        let access = AccessState::classify(&subscription, chrono::Utc::now().timestamp());

        Ok(SubscriptionOverview {
            plan_name: profile.plan_name.clone(),
            subscription,
            access,
        })
    }

    /// Access classification for an already-loaded profile (the chat gate),
    /// from a fresh subscription snapshot.
    pub async fn access_for(&self, profile: &Profile) -> Result<AccessState> {
        let subscription_id = profile
            .subscription_id
            .as_deref()
            .or_not_found(msg::NO_SUBSCRIPTION)?;

        let subscription = self.billing.get_subscription(subscription_id).await?;
        Ok(AccessState::classify(
            &subscription,
            chrono::Utc::now().timestamp(),
        ))
    }

    /// Voluntary cancellation: flags cancel-at-period-end on the live
    /// subscription. Status (and thus access) is unchanged until the
    /// billing service flips it at the period boundary; no local simulation.
    pub async fn cancel_subscription(&self, caller: &Caller) -> Result<SubscriptionSnapshot> {
        let profile = self
            .profiles
            .get(&caller.id)
            .await?
            .or_not_found(msg::NO_SUBSCRIPTION)?;

        let subscription_id = profile
            .subscription_id
            .as_deref()
            .or_not_found(msg::NO_SUBSCRIPTION)?;

        self.billing
            .set_cancel_at_period_end(subscription_id, true)
            .await
    }

    /// Webhook-driven reconciliation of a completed checkout.
    ///
    /// Syncs externally-owned billing truth (subscription reference, plan
    /// name) into the matched profile. The whole chain must succeed:
    /// subscription fetch, product fetch, then one idempotent overwrite.
    /// Redelivery of the same event lands on the same state, so no
    /// dedupe-by-event-id bookkeeping is kept. If a non-idempotent field
    /// (e.g. a counter) is ever added to this update, a dedupe store by
    /// event id becomes mandatory.
    pub async fn reconcile_checkout(&self, customer_id: &str, subscription_id: &str) -> Result<()> {
        let profile = self
            .profiles
            .get_by_customer(customer_id)
            .await?
            .ok_or_else(|| {
                tracing::error!("No profile found for billing customer {}", customer_id);
                AppError::BadRequest(msg::UNKNOWN_WEBHOOK_CUSTOMER.into())
            })?;

        let subscription = self.billing.get_subscription(subscription_id).await?;
        let product_id = subscription.product_id.as_deref().ok_or_else(|| {
            AppError::Upstream(format!(
                "subscription {} has no product reference",
                subscription_id
            ))
        })?;
        let plan_name = self.billing.get_product_name(product_id).await?;

        let patch = ProfilePatch {
            subscription_id: Some(subscription_id.to_string()),
            plan_name: Some(plan_name.clone()),
            ..Default::default()
        };
        self.profiles.update(&profile.id, &patch).await?;

        tracing::info!(
            "Reconciled checkout for customer {}: plan '{}', subscription {}",
            customer_id,
            plan_name,
            subscription_id
        );

        Ok(())
    }
}
