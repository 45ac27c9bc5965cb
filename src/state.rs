use std::sync::Arc;

use crate::config::Config;
use crate::coordinator::Coordinator;
use crate::payments::{Billing, StripeClient};
use crate::stores::{HttpIdentityStore, HttpProfileStore, IdentityStore, ProfileStore};

/// Application state shared across handlers.
///
/// Holds trait-object handles to the three external systems so tests can
/// substitute in-memory fakes. There is no local database and no shared
/// cache; every request performs its own round-trips.
#[derive(Clone)]
pub struct AppState {
    pub identity: Arc<dyn IdentityStore>,
    pub billing: Arc<dyn Billing>,
    pub coordinator: Arc<Coordinator>,
    /// Passed through to the client next to the checkout session secret.
    pub pricing_table_id: String,
    pub publishable_key: String,
}

impl AppState {
    pub fn from_config(config: &Config) -> Self {
        let identity: Arc<dyn IdentityStore> = Arc::new(HttpIdentityStore::new(&config.identity));
        let profiles: Arc<dyn ProfileStore> = Arc::new(HttpProfileStore::new(&config.profiles));
        let billing: Arc<dyn Billing> = Arc::new(StripeClient::new(&config.billing));

        Self {
            identity,
            coordinator: Arc::new(Coordinator::new(profiles, billing.clone())),
            billing,
            pricing_table_id: config.billing.pricing_table_id.clone(),
            publishable_key: config.billing.publishable_key.clone(),
        }
    }

    /// Assembles state from pre-built store handles (used by tests).
    pub fn with_stores(
        identity: Arc<dyn IdentityStore>,
        profiles: Arc<dyn ProfileStore>,
        billing: Arc<dyn Billing>,
        pricing_table_id: &str,
        publishable_key: &str,
    ) -> Self {
        Self {
            identity,
            coordinator: Arc::new(Coordinator::new(profiles, billing.clone())),
            billing,
            pricing_table_id: pricing_table_id.to_string(),
            publishable_key: publishable_key.to_string(),
        }
    }
}
