//! Plangate - account lifecycle coordinator for a subscription-gated app
//!
//! This library wires three externally-owned systems (identity backend,
//! profile store, Stripe) into one derived access state per request:
//! onboarding gate, checkout initiation, webhook reconciliation, and the
//! subscription access gate.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod payments;
pub mod state;
pub mod stores;
