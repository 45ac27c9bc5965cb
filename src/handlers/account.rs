use axum::{extract::State, Extension};
use serde::Serialize;

use crate::coordinator::Gate;
use crate::error::Result;
use crate::extractors::Json;
use crate::middleware::Caller;
use crate::models::OnboardRequest;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GateState {
    NeedsOnboarding,
    NeedsPlanSelection,
    Granted,
}

#[derive(Debug, Serialize)]
pub struct HomeResponse {
    pub state: GateState,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<&'static str>,
}

/// Welcome route. Doubles as the onboarding entry point: the gate state in
/// the body tells the client whether to render onboarding, send the caller
/// to plan selection, or greet them.
pub async fn home(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<HomeResponse>> {
    let gate = state.coordinator.resolve_gate(&caller).await?;
    let redirect = gate.redirect();

    let response = match gate {
        Gate::NeedsOnboarding => HomeResponse {
            state: GateState::NeedsOnboarding,
            email: caller.email,
            name: None,
            plan_name: None,
            redirect: None,
        },
        Gate::NeedsPlanSelection(profile) => HomeResponse {
            state: GateState::NeedsPlanSelection,
            email: caller.email,
            name: profile.name,
            plan_name: None,
            redirect,
        },
        Gate::Granted(profile) => HomeResponse {
            state: GateState::Granted,
            email: caller.email,
            name: profile.name,
            plan_name: profile.plan_name,
            redirect: None,
        },
    };

    Ok(Json(response))
}

#[derive(Debug, Serialize)]
pub struct OnboardResponse {
    pub message: &'static str,
    pub customer_id: String,
}

/// One-time onboarding completion: billing customer first, then the profile
/// write. Atomic-or-none from the caller's perspective (see Coordinator).
pub async fn onboard(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Json(request): Json<OnboardRequest>,
) -> Result<Json<OnboardResponse>> {
    request.validate()?;

    let profile = state
        .coordinator
        .complete_onboarding(&caller, &request.name)
        .await?;

    // Invariant on the way out: onboarded implies a customer reference.
    let customer_id = profile.customer_id.clone().ok_or_else(|| {
        crate::error::AppError::Internal(format!(
            "onboarded profile {} has no customer reference",
            profile.id
        ))
    })?;

    Ok(Json(OnboardResponse {
        message: "Onboarding complete",
        customer_id,
    }))
}
