use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
    Extension,
};
use serde::Serialize;

use crate::coordinator::Gate;
use crate::error::Result;
use crate::extractors::Json;
use crate::handlers::see_other;
use crate::middleware::Caller;
use crate::models::AccessState;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub access: AccessState,
    pub plan_name: String,
    /// Denial message when access is not granted; the chat greeting otherwise.
    pub message: String,
}

/// Plan-gated chat route.
///
/// Gate order: onboarding, then plan selection, then canonical plan slug
/// (a caller on `/chat/basic` with a Pro profile is redirected to
/// `/chat/pro`), then the live subscription classification. The response
/// message is a pure mapping from the derived state - no ad hoc boolean
/// checks per page.
pub async fn chat(
    State(state): State<AppState>,
    Path(plan): Path<String>,
    Extension(caller): Extension<Caller>,
) -> Result<Response> {
    let profile = match state.coordinator.resolve_gate(&caller).await? {
        Gate::Granted(profile) => profile,
        gate => return Ok(see_other(gate.redirect().unwrap_or("/"))),
    };

    // A subscription reference without a plan name means reconciliation has
    // not landed yet (the webhook latency window); treat as unselected.
    let slug = match profile.plan_slug() {
        Some(slug) => slug,
        None => return Ok(see_other("/pricing")),
    };

    if slug != plan {
        let canonical = format!("/chat/{}", slug);
        return Ok(see_other(&canonical));
    }

    let access = state.coordinator.access_for(&profile).await?;
    let plan_name = profile.plan_name.unwrap_or_default();

    let message = match access.denial_message() {
        Some(denied) => denied.to_string(),
        None => format!("Welcome to the {} chat", plan_name),
    };

    Ok(Json(ChatResponse {
        access,
        plan_name,
        message,
    })
    .into_response())
}
