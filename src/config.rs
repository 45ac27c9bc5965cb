use std::env;

/// Credentials for the external identity backend (auth + session tokens).
#[derive(Debug, Clone)]
pub struct IdentityConfig {
    pub base_url: String,
    pub api_key: String,
}

/// Credentials for the external profile store (one record per identity).
#[derive(Debug, Clone)]
pub struct ProfileStoreConfig {
    pub base_url: String,
    pub api_key: String,
}

/// Stripe credentials and pricing-table passthrough values.
#[derive(Debug, Clone)]
pub struct BillingConfig {
    pub secret_key: String,
    pub webhook_secret: String,
    /// Published to the client together with the checkout session secret.
    pub publishable_key: String,
    pub pricing_table_id: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub base_url: String,
    pub dev_mode: bool,
    pub identity: IdentityConfig,
    pub profiles: ProfileStoreConfig,
    pub billing: BillingConfig,
}

fn required(key: &str) -> Result<String, String> {
    env::var(key).map_err(|_| format!("{} is not set", key))
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        dotenvy::dotenv().ok();

        let dev_mode = env::var("PLANGATE_ENV")
            .map(|v| v == "dev" || v == "development")
            .unwrap_or(false);

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port: u16 = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);

        let base_url =
            env::var("BASE_URL").unwrap_or_else(|_| format!("http://{}:{}", host, port));

        Ok(Self {
            host,
            port,
            base_url,
            dev_mode,
            identity: IdentityConfig {
                base_url: required("IDENTITY_URL")?,
                api_key: required("IDENTITY_API_KEY")?,
            },
            profiles: ProfileStoreConfig {
                base_url: required("PROFILE_STORE_URL")?,
                api_key: required("PROFILE_STORE_API_KEY")?,
            },
            billing: BillingConfig {
                secret_key: required("STRIPE_SECRET")?,
                webhook_secret: required("STRIPE_WEBHOOK_SECRET")?,
                publishable_key: required("STRIPE_PUBLISHABLE_KEY")?,
                pricing_table_id: required("STRIPE_PRICING_TABLE_ID")?,
            },
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
