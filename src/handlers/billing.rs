use axum::{
    extract::State,
    response::{IntoResponse, Response},
    Extension,
};
use serde::Serialize;

use crate::coordinator::{Gate, SubscriptionOverview};
use crate::error::Result;
use crate::extractors::Json;
use crate::handlers::see_other;
use crate::middleware::Caller;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct PricingResponse {
    pub pricing_table_id: String,
    pub publishable_key: String,
    /// Ephemeral, scoped to this render; the hosted widget requires a fresh
    /// one per page view, so it is never persisted or reused.
    pub customer_session_client_secret: String,
    pub client_reference_id: String,
}

/// Plan selection page data. Requires a completed onboarding (the customer
/// reference must exist); callers who haven't onboarded are redirected back.
pub async fn pricing(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> Result<Response> {
    if let Gate::NeedsOnboarding = state.coordinator.resolve_gate(&caller).await? {
        return Ok(see_other("/"));
    }

    let secret = state.coordinator.checkout_secret(&caller).await?;

    Ok(Json(PricingResponse {
        pricing_table_id: state.pricing_table_id.clone(),
        publishable_key: state.publishable_key.clone(),
        customer_session_client_secret: secret,
        client_reference_id: caller.id,
    })
    .into_response())
}

/// Live subscription overview: plan label from the profile, fresh snapshot
/// from the billing service, derived access state. 404 when no subscription
/// reference exists yet.
pub async fn subscription_status(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<SubscriptionOverview>> {
    let overview = state.coordinator.subscription_overview(&caller).await?;
    Ok(Json(overview))
}

#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub success: bool,
    pub cancel_at_period_end: bool,
    pub current_period_end: i64,
}

/// Voluntary cancellation: flips cancel-at-period-end on the live
/// subscription. Access stays whatever the live status says until the
/// billing service transitions it at the period boundary.
pub async fn cancel_subscription(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<CancelResponse>> {
    let snapshot = state.coordinator.cancel_subscription(&caller).await?;

    Ok(Json(CancelResponse {
        success: true,
        cancel_at_period_end: snapshot.cancel_at_period_end,
        current_period_end: snapshot.current_period_end,
    }))
}
