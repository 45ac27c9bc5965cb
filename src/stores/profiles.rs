use async_trait::async_trait;
use reqwest::Client;

use crate::config::ProfileStoreConfig;
use crate::error::{AppError, Result};
use crate::models::{Profile, ProfilePatch};

/// Contract with the external profile store. One record per identity,
/// keyed by the identity id; the store owns row-level update atomicity.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<Profile>>;

    /// Reverse lookup used by webhook reconciliation.
    async fn get_by_customer(&self, customer_id: &str) -> Result<Option<Profile>>;

    async fn insert(&self, profile: &Profile) -> Result<()>;

    async fn update(&self, id: &str, patch: &ProfilePatch) -> Result<()>;
}

/// HTTP client for a PostgREST-style profile table API.
///
/// Filters are passed as `column=eq.value` query parameters; reads return
/// a JSON array (zero or one rows for our unique keys).
#[derive(Debug, Clone)]
pub struct HttpProfileStore {
    client: Client,
    base_url: String,
    api_key: String,
}

impl HttpProfileStore {
    pub fn new(config: &ProfileStoreConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        }
    }

    fn table_url(&self) -> String {
        format!("{}/profiles", self.base_url)
    }

    async fn get_one(&self, column: &str, value: &str) -> Result<Option<Profile>> {
        let response = self
            .client
            .get(self.table_url())
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .query(&[(column, format!("eq.{}", value))])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppError::Upstream(format!(
                "profile store returned {} on {} lookup",
                response.status(),
                column
            )));
        }

        let mut rows: Vec<Profile> = response.json().await?;
        Ok(rows.pop())
    }
}

#[async_trait]
impl ProfileStore for HttpProfileStore {
    async fn get(&self, id: &str) -> Result<Option<Profile>> {
        self.get_one("id", id).await
    }

    async fn get_by_customer(&self, customer_id: &str) -> Result<Option<Profile>> {
        self.get_one("customer_id", customer_id).await
    }

    async fn insert(&self, profile: &Profile) -> Result<()> {
        let response = self
            .client
            .post(self.table_url())
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .json(profile)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppError::Upstream(format!(
                "profile store returned {} on insert",
                response.status()
            )));
        }

        Ok(())
    }

    async fn update(&self, id: &str, patch: &ProfilePatch) -> Result<()> {
        if patch.is_empty() {
            return Ok(());
        }

        let response = self
            .client
            .patch(self.table_url())
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .query(&[("id", format!("eq.{}", id))])
            .json(patch)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppError::Upstream(format!(
                "profile store returned {} on update",
                response.status()
            )));
        }

        Ok(())
    }
}
