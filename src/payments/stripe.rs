use async_trait::async_trait;
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::Deserialize;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::config::BillingConfig;
use crate::error::{msg, AppError, Result};
use crate::models::{SubscriptionSnapshot, SubscriptionStatus};

type HmacSha256 = Hmac<Sha256>;

/// Contract with the payments backend. The backend owns customer and
/// subscription objects; we hold opaque references and call through.
///
/// Trait seam so tests can substitute a fake (e.g. to simulate customer
/// creation failing mid-onboarding).
#[async_trait]
pub trait Billing: Send + Sync {
    /// Creates a billing customer keyed by the identity's email and id.
    async fn create_customer(&self, name: &str, email: &str, identity_id: &str) -> Result<String>;

    /// Issues a fresh, short-lived client secret for the hosted pricing
    /// widget. Re-issued on every render, never persisted.
    async fn create_customer_session(&self, customer_id: &str) -> Result<String>;

    async fn get_subscription(&self, subscription_id: &str) -> Result<SubscriptionSnapshot>;

    /// Flags the subscription to cancel at period end. Status is unchanged
    /// until the billing service itself flips it at the boundary.
    async fn set_cancel_at_period_end(
        &self,
        subscription_id: &str,
        cancel: bool,
    ) -> Result<SubscriptionSnapshot>;

    async fn get_product_name(&self, product_id: &str) -> Result<String>;

    /// Verifies a webhook payload against the shared signing secret.
    /// `Ok(false)` is a well-formed but wrong signature; `Err` is a
    /// malformed header.
    fn verify_webhook_signature(&self, payload: &[u8], signature: &str) -> Result<bool>;
}

#[derive(Debug, Deserialize)]
struct CreateCustomerResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct CustomerSessionResponse {
    client_secret: String,
}

#[derive(Debug, Deserialize)]
struct ProductResponse {
    name: String,
}

#[derive(Debug, Deserialize)]
struct StripeSubscription {
    id: String,
    status: SubscriptionStatus,
    #[serde(default)]
    cancel_at_period_end: bool,
    trial_end: Option<i64>,
    items: StripeSubscriptionItems,
}

#[derive(Debug, Deserialize)]
struct StripeSubscriptionItems {
    data: Vec<StripeSubscriptionItem>,
}

#[derive(Debug, Deserialize)]
struct StripeSubscriptionItem {
    current_period_end: Option<i64>,
    price: Option<StripePrice>,
}

#[derive(Debug, Deserialize)]
struct StripePrice {
    product: String,
}

impl StripeSubscription {
    /// Period end and product live on the first subscription item; this
    /// service only ever deals with single-item subscriptions from the
    /// pricing table.
    fn into_snapshot(self) -> SubscriptionSnapshot {
        let first = self.items.data.into_iter().next();
        SubscriptionSnapshot {
            id: self.id,
            status: self.status,
            current_period_end: first
                .as_ref()
                .and_then(|i| i.current_period_end)
                .unwrap_or(0),
            cancel_at_period_end: self.cancel_at_period_end,
            trial_end: self.trial_end,
            product_id: first.and_then(|i| i.price).map(|p| p.product),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StripeClient {
    client: Client,
    secret_key: String,
    webhook_secret: String,
}

impl StripeClient {
    pub fn new(config: &BillingConfig) -> Self {
        Self {
            client: Client::new(),
            secret_key: config.secret_key.clone(),
            webhook_secret: config.webhook_secret.clone(),
        }
    }

    /// Maximum age of a webhook timestamp before it's rejected (in seconds).
    /// Stripe recommends 300 seconds (5 minutes).
    const WEBHOOK_TIMESTAMP_TOLERANCE_SECS: i64 = 300;

    async fn post_form<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        form: &[(&str, &str)],
    ) -> Result<T> {
        let response = self
            .client
            .post(url)
            .basic_auth(&self.secret_key, None::<&str>)
            .form(form)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Stripe API error: {}", e)))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream(format!("Stripe API error: {}", error_text)));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("Failed to parse Stripe response: {}", e)))
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self
            .client
            .get(url)
            .basic_auth(&self.secret_key, None::<&str>)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Stripe API error: {}", e)))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream(format!("Stripe API error: {}", error_text)));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("Failed to parse Stripe response: {}", e)))
    }
}

#[async_trait]
impl Billing for StripeClient {
    async fn create_customer(&self, name: &str, email: &str, identity_id: &str) -> Result<String> {
        let response: CreateCustomerResponse = self
            .post_form(
                "https://api.stripe.com/v1/customers",
                &[
                    ("name", name),
                    ("email", email),
                    ("metadata[identity_id]", identity_id),
                ],
            )
            .await?;

        Ok(response.id)
    }

    async fn create_customer_session(&self, customer_id: &str) -> Result<String> {
        let response: CustomerSessionResponse = self
            .post_form(
                "https://api.stripe.com/v1/customer_sessions",
                &[
                    ("customer", customer_id),
                    ("components[pricing_table][enabled]", "true"),
                ],
            )
            .await?;

        Ok(response.client_secret)
    }

    async fn get_subscription(&self, subscription_id: &str) -> Result<SubscriptionSnapshot> {
        let url = format!("https://api.stripe.com/v1/subscriptions/{}", subscription_id);
        let subscription: StripeSubscription = self.get_json(&url).await?;
        Ok(subscription.into_snapshot())
    }

    async fn set_cancel_at_period_end(
        &self,
        subscription_id: &str,
        cancel: bool,
    ) -> Result<SubscriptionSnapshot> {
        let url = format!("https://api.stripe.com/v1/subscriptions/{}", subscription_id);
        let value = if cancel { "true" } else { "false" };
        let subscription: StripeSubscription = self
            .post_form(&url, &[("cancel_at_period_end", value)])
            .await?;
        Ok(subscription.into_snapshot())
    }

    async fn get_product_name(&self, product_id: &str) -> Result<String> {
        let url = format!("https://api.stripe.com/v1/products/{}", product_id);
        let product: ProductResponse = self.get_json(&url).await?;
        Ok(product.name)
    }

    fn verify_webhook_signature(&self, payload: &[u8], signature: &str) -> Result<bool> {
        // Stripe signature format: t=timestamp,v1=signature
        let parts: Vec<&str> = signature.split(',').collect();

        let mut timestamp = None;
        let mut sig_v1 = None;

        for part in parts {
            if let Some(t) = part.strip_prefix("t=") {
                timestamp = Some(t);
            } else if let Some(s) = part.strip_prefix("v1=") {
                sig_v1 = Some(s);
            }
        }

        let timestamp_str =
            timestamp.ok_or_else(|| AppError::BadRequest(msg::INVALID_SIGNATURE_FORMAT.into()))?;
        let sig_v1 =
            sig_v1.ok_or_else(|| AppError::BadRequest(msg::INVALID_SIGNATURE_FORMAT.into()))?;

        // Reject stale timestamps to prevent replay.
        let timestamp: i64 = timestamp_str
            .parse()
            .map_err(|_| AppError::BadRequest(msg::INVALID_TIMESTAMP_IN_SIGNATURE.into()))?;

        let now = chrono::Utc::now().timestamp();
        let age = now - timestamp;

        if age > Self::WEBHOOK_TIMESTAMP_TOLERANCE_SECS {
            tracing::warn!(
                "Stripe webhook rejected: timestamp too old (age={}s, max={}s)",
                age,
                Self::WEBHOOK_TIMESTAMP_TOLERANCE_SECS
            );
            return Ok(false);
        }

        // Clock skew tolerance for timestamps from the future: 60 seconds.
        if age < -60 {
            tracing::warn!("Stripe webhook rejected: timestamp in the future (age={}s)", age);
            return Ok(false);
        }

        let signed_payload = format!("{}.{}", timestamp_str, String::from_utf8_lossy(payload));

        let mut mac = HmacSha256::new_from_slice(self.webhook_secret.as_bytes())
            .map_err(|_| AppError::Internal(msg::INVALID_WEBHOOK_SECRET.into()))?;
        mac.update(signed_payload.as_bytes());
        let expected = hex::encode(mac.finalize().into_bytes());

        // Constant-time comparison; signature length is not secret
        // (always 64 hex chars for SHA-256).
        let expected_bytes = expected.as_bytes();
        let provided_bytes = sig_v1.as_bytes();

        if expected_bytes.len() != provided_bytes.len() {
            return Ok(false);
        }

        Ok(expected_bytes.ct_eq(provided_bytes).into())
    }
}

// ============ webhook event payloads ============

/// Generic Stripe webhook event - object is parsed based on event_type.
#[derive(Debug, Deserialize)]
pub struct StripeWebhookEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: StripeEventData,
}

#[derive(Debug, Deserialize)]
pub struct StripeEventData {
    pub object: serde_json::Value,
}

/// Object payload of a `checkout.session.completed` event. Only the two
/// references reconciliation needs are extracted.
#[derive(Debug, Deserialize)]
pub struct StripeCheckoutSession {
    pub customer: Option<String>,
    pub subscription: Option<String>,
}
