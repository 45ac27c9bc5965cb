//! Test utilities and in-memory fakes for Plangate integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use hmac::{Hmac, Mac};
use sha2::Sha256;

pub use plangate::coordinator::{Coordinator, Gate};
pub use plangate::error::{msg, AppError, Result};
pub use plangate::middleware::Caller;
pub use plangate::models::{
    AccessState, Profile, ProfilePatch, SubscriptionSnapshot, SubscriptionStatus,
};
pub use plangate::payments::Billing;
pub use plangate::state::AppState;
pub use plangate::stores::{Identity, IdentityStore, ProfileStore, Session};

pub const TEST_WEBHOOK_SECRET: &str = "whsec_test_secret";

// ============ identity fake ============

#[derive(Default)]
pub struct MemoryIdentityStore {
    users: Mutex<HashMap<String, (String, Identity)>>,
    tokens: Mutex<HashMap<String, Identity>>,
}

impl MemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn issue_token(&self, identity: &Identity) -> Session {
        let token = uuid::Uuid::new_v4().to_string();
        self.tokens
            .lock()
            .unwrap()
            .insert(token.clone(), identity.clone());
        Session {
            access_token: token,
            expires_in: 3600,
            user: identity.clone(),
        }
    }
}

#[async_trait]
impl IdentityStore for MemoryIdentityStore {
    async fn sign_up(&self, email: &str, password: &str, _name: &str) -> Result<Session> {
        let mut users = self.users.lock().unwrap();
        if users.contains_key(email) {
            return Err(AppError::BadRequest("User already registered".into()));
        }
        let identity = Identity {
            id: uuid::Uuid::new_v4().to_string(),
            email: email.to_string(),
        };
        users.insert(email.to_string(), (password.to_string(), identity.clone()));
        drop(users);
        Ok(self.issue_token(&identity))
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        let users = self.users.lock().unwrap();
        let identity = match users.get(email) {
            Some((stored, identity)) if stored == password => identity.clone(),
            _ => return Err(AppError::BadRequest("Invalid login credentials".into())),
        };
        drop(users);
        Ok(self.issue_token(&identity))
    }

    async fn sign_out(&self, token: &str) -> Result<()> {
        self.tokens.lock().unwrap().remove(token);
        Ok(())
    }

    async fn current_user(&self, token: &str) -> Result<Option<Identity>> {
        Ok(self.tokens.lock().unwrap().get(token).cloned())
    }
}

// ============ profile store fake ============

#[derive(Default)]
pub struct MemoryProfileStore {
    rows: Mutex<HashMap<String, Profile>>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Direct read for assertions.
    pub fn snapshot(&self, id: &str) -> Option<Profile> {
        self.rows.lock().unwrap().get(id).cloned()
    }

    pub fn put(&self, profile: Profile) {
        self.rows.lock().unwrap().insert(profile.id.clone(), profile);
    }
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn get(&self, id: &str) -> Result<Option<Profile>> {
        Ok(self.rows.lock().unwrap().get(id).cloned())
    }

    async fn get_by_customer(&self, customer_id: &str) -> Result<Option<Profile>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .values()
            .find(|p| p.customer_id.as_deref() == Some(customer_id))
            .cloned())
    }

    async fn insert(&self, profile: &Profile) -> Result<()> {
        self.rows
            .lock()
            .unwrap()
            .insert(profile.id.clone(), profile.clone());
        Ok(())
    }

    async fn update(&self, id: &str, patch: &ProfilePatch) -> Result<()> {
        let mut rows = self.rows.lock().unwrap();
        let profile = rows
            .get_mut(id)
            .ok_or_else(|| AppError::NotFound(msg::PROFILE_NOT_FOUND.into()))?;
        patch.apply(profile);
        Ok(())
    }
}

/// Profile store whose writes always fail, for the orphaned-customer path.
pub struct FailingWriteProfileStore {
    pub inner: MemoryProfileStore,
}

#[async_trait]
impl ProfileStore for FailingWriteProfileStore {
    async fn get(&self, id: &str) -> Result<Option<Profile>> {
        self.inner.get(id).await
    }

    async fn get_by_customer(&self, customer_id: &str) -> Result<Option<Profile>> {
        self.inner.get_by_customer(customer_id).await
    }

    async fn insert(&self, _profile: &Profile) -> Result<()> {
        Err(AppError::Upstream("profile store write failed".into()))
    }

    async fn update(&self, _id: &str, _patch: &ProfilePatch) -> Result<()> {
        Err(AppError::Upstream("profile store write failed".into()))
    }
}

// ============ billing fake ============

#[derive(Debug, Clone)]
pub struct CreatedCustomer {
    pub id: String,
    pub name: String,
    pub email: String,
    pub identity_id: String,
}

pub struct FakeBilling {
    pub webhook_secret: String,
    pub fail_customer_create: AtomicBool,
    pub customers: Mutex<Vec<CreatedCustomer>>,
    pub subscriptions: Mutex<HashMap<String, SubscriptionSnapshot>>,
    pub products: Mutex<HashMap<String, String>>,
    session_counter: AtomicU64,
}

impl FakeBilling {
    pub fn new() -> Self {
        Self {
            webhook_secret: TEST_WEBHOOK_SECRET.to_string(),
            fail_customer_create: AtomicBool::new(false),
            customers: Mutex::new(Vec::new()),
            subscriptions: Mutex::new(HashMap::new()),
            products: Mutex::new(HashMap::new()),
            session_counter: AtomicU64::new(0),
        }
    }

    pub fn seed_subscription(&self, snapshot: SubscriptionSnapshot) {
        self.subscriptions
            .lock()
            .unwrap()
            .insert(snapshot.id.clone(), snapshot);
    }

    pub fn seed_product(&self, product_id: &str, name: &str) {
        self.products
            .lock()
            .unwrap()
            .insert(product_id.to_string(), name.to_string());
    }

    pub fn customer_count(&self) -> usize {
        self.customers.lock().unwrap().len()
    }
}

#[async_trait]
impl Billing for FakeBilling {
    async fn create_customer(&self, name: &str, email: &str, identity_id: &str) -> Result<String> {
        if self.fail_customer_create.load(Ordering::SeqCst) {
            return Err(AppError::Upstream("simulated customer creation failure".into()));
        }
        let mut customers = self.customers.lock().unwrap();
        let id = format!("cus_{}", customers.len() + 1);
        customers.push(CreatedCustomer {
            id: id.clone(),
            name: name.to_string(),
            email: email.to_string(),
            identity_id: identity_id.to_string(),
        });
        Ok(id)
    }

    async fn create_customer_session(&self, customer_id: &str) -> Result<String> {
        let known = self
            .customers
            .lock()
            .unwrap()
            .iter()
            .any(|c| c.id == customer_id);
        if !known {
            return Err(AppError::Upstream(format!("unknown customer {}", customer_id)));
        }
        let n = self.session_counter.fetch_add(1, Ordering::SeqCst);
        Ok(format!("cuss_secret_{}", n))
    }

    async fn get_subscription(&self, subscription_id: &str) -> Result<SubscriptionSnapshot> {
        self.subscriptions
            .lock()
            .unwrap()
            .get(subscription_id)
            .cloned()
            .ok_or_else(|| AppError::Upstream(format!("unknown subscription {}", subscription_id)))
    }

    async fn set_cancel_at_period_end(
        &self,
        subscription_id: &str,
        cancel: bool,
    ) -> Result<SubscriptionSnapshot> {
        let mut subscriptions = self.subscriptions.lock().unwrap();
        let snapshot = subscriptions
            .get_mut(subscription_id)
            .ok_or_else(|| AppError::Upstream(format!("unknown subscription {}", subscription_id)))?;
        snapshot.cancel_at_period_end = cancel;
        Ok(snapshot.clone())
    }

    async fn get_product_name(&self, product_id: &str) -> Result<String> {
        self.products
            .lock()
            .unwrap()
            .get(product_id)
            .cloned()
            .ok_or_else(|| AppError::Upstream(format!("unknown product {}", product_id)))
    }

    fn verify_webhook_signature(&self, payload: &[u8], signature: &str) -> Result<bool> {
        let mut timestamp = None;
        let mut sig_v1 = None;
        for part in signature.split(',') {
            if let Some(t) = part.strip_prefix("t=") {
                timestamp = Some(t);
            } else if let Some(s) = part.strip_prefix("v1=") {
                sig_v1 = Some(s);
            }
        }
        let (timestamp, sig_v1) = match (timestamp, sig_v1) {
            (Some(t), Some(s)) => (t, s),
            _ => return Err(AppError::BadRequest(msg::INVALID_SIGNATURE_FORMAT.into())),
        };
        Ok(compute_stripe_signature(payload, &self.webhook_secret, timestamp) == sig_v1)
    }
}

// ============ fixtures ============

pub fn compute_stripe_signature(payload: &[u8], secret: &str, timestamp: &str) -> String {
    type HmacSha256 = Hmac<Sha256>;

    let signed_payload = format!("{}.{}", timestamp, String::from_utf8_lossy(payload));
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(signed_payload.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Full `stripe-signature` header value for a payload, signed now.
pub fn sign_payload(payload: &[u8], secret: &str) -> String {
    let timestamp = chrono::Utc::now().timestamp().to_string();
    let signature = compute_stripe_signature(payload, secret, &timestamp);
    format!("t={},v1={}", timestamp, signature)
}

pub struct TestWorld {
    pub identity: Arc<MemoryIdentityStore>,
    pub profiles: Arc<MemoryProfileStore>,
    pub billing: Arc<FakeBilling>,
    pub state: AppState,
}

impl TestWorld {
    pub fn new() -> Self {
        let identity = Arc::new(MemoryIdentityStore::new());
        let profiles = Arc::new(MemoryProfileStore::new());
        let billing = Arc::new(FakeBilling::new());
        let state = AppState::with_stores(
            identity.clone(),
            profiles.clone(),
            billing.clone(),
            "prctbl_test",
            "pk_test",
        );
        Self {
            identity,
            profiles,
            billing,
            state,
        }
    }

    pub fn app(&self) -> Router {
        plangate::handlers::router(self.state.clone()).with_state(self.state.clone())
    }

    pub fn coordinator(&self) -> Arc<Coordinator> {
        self.state.coordinator.clone()
    }
}

pub fn caller(id: &str, email: &str) -> Caller {
    Caller {
        id: id.to_string(),
        email: email.to_string(),
        token: "test-token".to_string(),
    }
}

pub fn active_subscription(id: &str, product_id: &str) -> SubscriptionSnapshot {
    SubscriptionSnapshot {
        id: id.to_string(),
        status: SubscriptionStatus::Active,
        current_period_end: chrono::Utc::now().timestamp() + 30 * 86_400,
        cancel_at_period_end: false,
        trial_end: None,
        product_id: Some(product_id.to_string()),
    }
}
