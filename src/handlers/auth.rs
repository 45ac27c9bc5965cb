use axum::{extract::State, http::StatusCode, Extension};
use serde::Serialize;

use crate::error::Result;
use crate::extractors::Json;
use crate::middleware::Caller;
use crate::models::{LoginRequest, Profile, SignupRequest};
use crate::state::AppState;
use crate::stores::Session;

#[derive(Debug, Serialize)]
pub struct SignupResponse {
    pub message: &'static str,
    pub session: Session,
}

/// Creates the identity, then inserts the default (un-onboarded) profile.
/// Validation happens before any external call. If the profile insert fails
/// after the identity exists, the identity is not rolled back (the identity
/// backend owns account deletion); the error is logged and surfaced, and
/// the gate treats the missing profile as not onboarded.
pub async fn signup(
    State(state): State<AppState>,
    Json(request): Json<SignupRequest>,
) -> Result<(StatusCode, Json<SignupResponse>)> {
    request.validate()?;

    let session = state
        .identity
        .sign_up(&request.email, &request.password, request.name.trim())
        .await?;

    let profile = Profile::new(
        &session.user.id,
        &session.user.email,
        request.name.trim(),
        chrono::Utc::now().timestamp(),
    );

    if let Err(e) = state.coordinator.insert_profile(&profile).await {
        tracing::error!(
            "Profile insert failed after signup for {}: {}",
            session.user.id,
            e
        );
        return Err(e);
    }

    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            message: "Account created successfully",
            session,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<Session>> {
    request.validate()?;

    let session = state
        .identity
        .sign_in(&request.email, &request.password)
        .await?;

    Ok(Json(session))
}

#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub message: &'static str,
}

pub async fn logout(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<LogoutResponse>> {
    state.identity.sign_out(&caller.token).await?;
    Ok(Json(LogoutResponse {
        message: "Signed out",
    }))
}
