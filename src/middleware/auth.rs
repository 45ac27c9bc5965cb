use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::error::{AppError, Result};
use crate::state::AppState;

/// Request-scoped caller context: the resolved identity plus the session
/// token it was resolved from. Inserted by `require_caller` and passed
/// explicitly into every coordinator operation - never a process-wide
/// singleton.
#[derive(Debug, Clone)]
pub struct Caller {
    pub id: String,
    pub email: String,
    pub token: String,
}

/// Resolves the bearer session token into a `Caller` via the identity
/// backend, or answers with a 401 challenge. Guards every protected route.
pub async fn require_caller(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response> {
    let auth_header = request
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .ok_or(AppError::Unauthorized)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(AppError::Unauthorized)?
        .to_string();

    let identity = state
        .identity
        .current_user(&token)
        .await?
        .ok_or(AppError::Unauthorized)?;

    request.extensions_mut().insert(Caller {
        id: identity.id,
        email: identity.email,
        token,
    });

    Ok(next.run(request).await)
}
