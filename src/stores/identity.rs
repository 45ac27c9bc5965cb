use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::config::IdentityConfig;
use crate::error::{AppError, Result};

/// An authenticated account record in the external auth backend.
/// Read-only to this service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub email: String,
}

/// Session issued by the identity backend on signup/login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub expires_in: i64,
    pub user: Identity,
}

/// Contract with the external identity backend. The backend owns
/// credentials and token issuance; we only call through.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Creates the account and logs it in (the backend auto-issues a session).
    async fn sign_up(&self, email: &str, password: &str, name: &str) -> Result<Session>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session>;

    async fn sign_out(&self, token: &str) -> Result<()>;

    /// Resolves the caller behind a session token. `None` means the token
    /// is missing, expired, or revoked - an authentication fault upstream.
    async fn current_user(&self, token: &str) -> Result<Option<Identity>>;
}

#[derive(Debug, Serialize)]
struct CredentialsRequest<'a> {
    email: &'a str,
    password: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<SignupMetadata<'a>>,
}

#[derive(Debug, Serialize)]
struct SignupMetadata<'a> {
    name: &'a str,
}

#[derive(Debug, Deserialize)]
struct AuthErrorBody {
    #[serde(alias = "msg", alias = "error_description")]
    message: Option<String>,
}

/// HTTP client for a GoTrue-style identity API.
#[derive(Debug, Clone)]
pub struct HttpIdentityStore {
    client: Client,
    base_url: String,
    api_key: String,
}

impl HttpIdentityStore {
    pub fn new(config: &IdentityConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Auth backend rejections surface as validation-style errors with the
    /// backend's own message (wrong password, duplicate email, ...).
    async fn auth_error(response: reqwest::Response) -> AppError {
        let status = response.status();
        let message = response
            .json::<AuthErrorBody>()
            .await
            .ok()
            .and_then(|b| b.message)
            .unwrap_or_else(|| format!("identity backend returned {}", status));
        AppError::BadRequest(message)
    }
}

#[async_trait]
impl IdentityStore for HttpIdentityStore {
    async fn sign_up(&self, email: &str, password: &str, name: &str) -> Result<Session> {
        let response = self
            .client
            .post(self.url("/signup"))
            .header("apikey", &self.api_key)
            .json(&CredentialsRequest {
                email,
                password,
                data: Some(SignupMetadata { name }),
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::auth_error(response).await);
        }

        Ok(response.json().await?)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        let response = self
            .client
            .post(self.url("/token?grant_type=password"))
            .header("apikey", &self.api_key)
            .json(&CredentialsRequest {
                email,
                password,
                data: None,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::auth_error(response).await);
        }

        Ok(response.json().await?)
    }

    async fn sign_out(&self, token: &str) -> Result<()> {
        let response = self
            .client
            .post(self.url("/logout"))
            .header("apikey", &self.api_key)
            .bearer_auth(token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::auth_error(response).await);
        }

        Ok(())
    }

    async fn current_user(&self, token: &str) -> Result<Option<Identity>> {
        let response = self
            .client
            .get(self.url("/user"))
            .header("apikey", &self.api_key)
            .bearer_auth(token)
            .send()
            .await?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Ok(None),
            status if status.is_success() => Ok(Some(response.json().await?)),
            status => Err(AppError::Upstream(format!(
                "identity backend returned {} on user lookup",
                status
            ))),
        }
    }
}
