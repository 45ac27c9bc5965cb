//! Onboarding completion tests: atomic-or-none semantics and invariants.

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use common::*;

#[tokio::test]
async fn onboarding_sets_name_flag_and_customer_reference() {
    let world = TestWorld::new();
    world.profiles.put(Profile::new("u1", "ada@example.com", "Ada", 0));

    let profile = world
        .coordinator()
        .complete_onboarding(&caller("u1", "ada@example.com"), "  Ada Lovelace ")
        .await
        .expect("onboarding should succeed");

    assert!(profile.onboarded);
    assert_eq!(profile.name.as_deref(), Some("Ada Lovelace"));
    assert_eq!(profile.customer_id.as_deref(), Some("cus_1"));

    // Invariant: onboarded implies non-empty name, in the store too.
    let stored = world.profiles.snapshot("u1").unwrap();
    assert!(stored.onboarded);
    assert!(!stored.name.as_deref().unwrap_or("").is_empty());
    assert_eq!(stored.customer_id.as_deref(), Some("cus_1"));

    let customers = world.billing.customers.lock().unwrap();
    assert_eq!(customers.len(), 1);
    assert_eq!(customers[0].email, "ada@example.com");
    assert_eq!(customers[0].identity_id, "u1");
}

#[tokio::test]
async fn billing_failure_leaves_profile_unonboarded() {
    let world = TestWorld::new();
    world.profiles.put(Profile::new("u1", "ada@example.com", "Ada", 0));
    world.billing.fail_customer_create.store(true, Ordering::SeqCst);

    let result = world
        .coordinator()
        .complete_onboarding(&caller("u1", "ada@example.com"), "Ada")
        .await;

    assert!(result.is_err());
    let stored = world.profiles.snapshot("u1").unwrap();
    assert!(!stored.onboarded);
    assert!(stored.customer_id.is_none());
}

#[tokio::test]
async fn empty_name_is_rejected_before_any_external_call() {
    let world = TestWorld::new();
    world.profiles.put(Profile::new("u1", "ada@example.com", "Ada", 0));

    let result = world
        .coordinator()
        .complete_onboarding(&caller("u1", "ada@example.com"), "   ")
        .await;

    assert!(matches!(result, Err(AppError::BadRequest(_))));
    assert_eq!(world.billing.customer_count(), 0, "No customer should be created");
    assert!(!world.profiles.snapshot("u1").unwrap().onboarded);
}

#[tokio::test]
async fn repeat_onboarding_does_not_mint_another_customer() {
    let world = TestWorld::new();
    world.profiles.put(Profile::new("u1", "ada@example.com", "Ada", 0));

    let coordinator = world.coordinator();
    let caller = caller("u1", "ada@example.com");
    coordinator.complete_onboarding(&caller, "Ada").await.unwrap();
    let second = coordinator.complete_onboarding(&caller, "Ada Again").await.unwrap();

    assert_eq!(world.billing.customer_count(), 1);
    // The no-op returns the committed state, not the new name.
    assert_eq!(second.name.as_deref(), Some("Ada"));
}

#[tokio::test]
async fn absent_profile_is_created_on_onboarding() {
    // The signup-time insert can race the first onboarding request; the
    // coordinator inserts a fresh profile instead of failing.
    let world = TestWorld::new();

    let profile = world
        .coordinator()
        .complete_onboarding(&caller("u1", "ada@example.com"), "Ada")
        .await
        .expect("onboarding should create the profile");

    assert!(profile.onboarded);
    assert!(world.profiles.snapshot("u1").is_some());
}

#[tokio::test]
async fn profile_write_failure_surfaces_and_orphans_customer() {
    let profiles = Arc::new(FailingWriteProfileStore {
        inner: MemoryProfileStore::new(),
    });
    profiles
        .inner
        .put(Profile::new("u1", "ada@example.com", "Ada", 0));

    let identity = Arc::new(MemoryIdentityStore::new());
    let billing = Arc::new(FakeBilling::new());
    let state = AppState::with_stores(
        identity,
        profiles.clone(),
        billing.clone(),
        "prctbl_test",
        "pk_test",
    );

    let result = state
        .coordinator
        .complete_onboarding(&caller("u1", "ada@example.com"), "Ada")
        .await;

    assert!(result.is_err());
    // The customer was created before the write failed: orphaned, logged,
    // not retried. The profile itself is unchanged.
    assert_eq!(billing.customer_count(), 1);
    assert!(!profiles.inner.snapshot("u1").unwrap().onboarded);
}
