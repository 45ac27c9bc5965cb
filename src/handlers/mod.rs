pub mod account;
pub mod auth;
pub mod billing;
pub mod chat;
pub mod webhooks;

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use crate::middleware::require_caller;
use crate::state::AppState;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Serialize)]
struct RedirectBody {
    redirect: String,
}

/// 303 redirect with a JSON body carrying the target, so both browser-style
/// and API clients can follow it.
pub(crate) fn see_other(location: &str) -> Response {
    (
        StatusCode::SEE_OTHER,
        [(header::LOCATION, location.to_string())],
        Json(RedirectBody {
            redirect: location.to_string(),
        }),
    )
        .into_response()
}

pub fn router(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/", get(account::home))
        .route("/onboard", post(account::onboard))
        .route("/pricing", get(billing::pricing))
        .route("/subscription", get(billing::subscription_status))
        .route("/subscription/cancel", post(billing::cancel_subscription))
        .route("/chat/{plan}", get(chat::chat))
        .route("/logout", post(auth::logout))
        .layer(axum::middleware::from_fn_with_state(state, require_caller));

    Router::new()
        .route("/health", get(health))
        .route("/signup", post(auth::signup))
        .route("/login", post(auth::login))
        .route("/webhooks/stripe", post(webhooks::handle_stripe_webhook))
        .merge(protected)
}
