use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};

use crate::error::{msg, AppError};
use crate::payments::{StripeCheckoutSession, StripeWebhookEvent};
use crate::state::AppState;

/// Result type for webhook processing steps: status + static message.
type WebhookResult = (StatusCode, &'static str);

fn extract_signature(headers: &HeaderMap) -> Result<&str, WebhookResult> {
    headers
        .get("stripe-signature")
        .ok_or((StatusCode::BAD_REQUEST, msg::MISSING_SIGNATURE_HEADER))?
        .to_str()
        .map_err(|e| {
            tracing::debug!("Invalid UTF-8 in Stripe signature header: {}", e);
            (StatusCode::BAD_REQUEST, "Invalid signature header")
        })
}

/// Stripe webhook endpoint: verify, then parse, then reconcile.
///
/// Verification against the shared signing secret is a hard boundary - the
/// body is never parsed before the signature checks out. Only
/// `checkout.session.completed` is acted on; every other event type is
/// acknowledged and ignored. Redelivery of the same event is safe because
/// reconciliation is an idempotent overwrite.
pub async fn handle_stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    match process(&state, &headers, &body).await {
        Ok(message) => (StatusCode::OK, message).into_response(),
        Err((status, message)) => (status, message).into_response(),
    }
}

async fn process(
    state: &AppState,
    headers: &HeaderMap,
    body: &Bytes,
) -> Result<&'static str, WebhookResult> {
    // Step 1: verify. Missing header, malformed header, stale timestamp,
    // and wrong signature all answer 400 before any parsing happens.
    let signature = extract_signature(headers)?;

    let verified = state
        .billing
        .verify_webhook_signature(body, signature)
        .map_err(|e| {
            tracing::warn!("Webhook signature rejected: {}", e);
            (StatusCode::BAD_REQUEST, msg::INVALID_SIGNATURE_FORMAT)
        })?;

    if !verified {
        tracing::warn!("Webhook signature verification failed");
        return Err((StatusCode::BAD_REQUEST, msg::INVALID_SIGNATURE));
    }

    // Step 2: parse, only now that the payload is authenticated.
    let event: StripeWebhookEvent = serde_json::from_slice(body).map_err(|e| {
        tracing::error!("Failed to parse Stripe webhook: {}", e);
        (StatusCode::BAD_REQUEST, "Invalid JSON")
    })?;

    if event.event_type != "checkout.session.completed" {
        tracing::debug!("Ignoring Stripe event type {}", event.event_type);
        return Ok("Ignored");
    }

    let session: StripeCheckoutSession =
        serde_json::from_value(event.data.object).map_err(|e| {
            tracing::error!("Failed to parse checkout session: {}", e);
            (StatusCode::BAD_REQUEST, "Invalid checkout session")
        })?;

    let customer_id = session
        .customer
        .ok_or((StatusCode::BAD_REQUEST, "Checkout session has no customer"))?;
    let subscription_id = session.subscription.ok_or((
        StatusCode::BAD_REQUEST,
        "Checkout session has no subscription",
    ))?;

    // Step 3: reconcile. Consistency faults answer 400 with no local retry;
    // upstream failures answer 502 so the provider's redelivery kicks in.
    match state
        .coordinator
        .reconcile_checkout(&customer_id, &subscription_id)
        .await
    {
        Ok(()) => Ok("Reconciled"),
        Err(AppError::BadRequest(_)) => {
            Err((StatusCode::BAD_REQUEST, msg::UNKNOWN_WEBHOOK_CUSTOMER))
        }
        Err(e) => {
            tracing::error!("Checkout reconciliation failed: {}", e);
            Err((StatusCode::BAD_GATEWAY, "Reconciliation failed"))
        }
    }
}
