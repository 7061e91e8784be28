//! Session rotation: a live refresh credential buys a fresh pair and the
//! presented pair stops working.

use auth_service::errors::AuthError;
use auth_service::models::{Role, TokenPair};
use auth_service::services::session_rotator::ACCOUNT_DELETED_MESSAGE;
use auth_test_utils::*;
use chrono::Utc;
use tonic::Code;

const T0: i64 = 1_700_000_000;

async fn logged_in(role: Role) -> (TestServices, uuid::Uuid, TokenPair) {
    let user = TestUserBuilder::new().role(role).build();
    let id = user.id;
    let email = user.email.clone();
    let services = TestServices::new(
        MockSessionStore::new().with_now(T0),
        MockUserRepository::new().with_user(user),
    );
    let pair = services
        .login
        .login(&email, TEST_PASSWORD, role, T0)
        .await
        .expect("login should succeed");
    (services, id, pair)
}

#[tokio::test]
async fn test_rotate_invalidates_presented_pair() -> Result<(), anyhow::Error> {
    let (services, id, old) = logged_in(Role::Customer).await;

    let new = services
        .rotator
        .rotate(&old.access_token, &old.refresh_token, T0 + 10)
        .await?;

    assert_ne!(new.access_token, old.access_token);
    assert!(!services.store.contains(&old.access_token));
    assert!(!services.store.contains(&old.refresh_token));

    let claims = services.verifier.verify_access(&new.access_token, T0 + 10).await?;
    assert_eq!(claims.subject_id(), Some(id));
    assert_eq!(claims.role, Some(Role::Customer));
    assert_eq!(claims.iat, T0 + 10);

    Ok(())
}

#[tokio::test]
async fn test_rotate_twice_with_same_refresh_fails() -> Result<(), anyhow::Error> {
    let (services, _, old) = logged_in(Role::Committee).await;

    services
        .rotator
        .rotate(&old.access_token, &old.refresh_token, T0)
        .await?;
    let second = services
        .rotator
        .rotate(&old.access_token, &old.refresh_token, T0)
        .await;

    assert!(matches!(
        second,
        Err(AuthError::Unauthenticated(msg)) if msg == "refresh token expired"
    ));

    Ok(())
}

#[tokio::test]
async fn test_rotate_without_access_credential() -> Result<(), anyhow::Error> {
    let (services, _, old) = logged_in(Role::Customer).await;

    services.rotator.rotate("", &old.refresh_token, T0).await?;

    // Only the refresh credential was presented, so only it is revoked
    assert!(services.store.contains(&old.access_token));
    assert!(!services.store.contains(&old.refresh_token));

    Ok(())
}

#[tokio::test]
async fn test_rotate_with_access_credential_rejected() {
    let (services, _, old) = logged_in(Role::Customer).await;

    let result = services
        .rotator
        .rotate(&old.access_token, &old.access_token, T0)
        .await;

    assert!(matches!(result, Err(AuthError::Unauthenticated(_))));
    assert!(services.store.contains(&old.refresh_token));
}

#[tokio::test]
async fn test_rotate_for_deleted_account_rejected() {
    let (services, id, old) = logged_in(Role::Customer).await;
    let mut user = services.users.user(id).expect("seeded user");
    user.deleted_at = Some(Utc::now());
    user.is_active = false;
    services.users.insert(user);

    let result = services
        .rotator
        .rotate(&old.access_token, &old.refresh_token, T0)
        .await;

    assert!(matches!(
        result,
        Err(AuthError::Unauthenticated(msg)) if msg == ACCOUNT_DELETED_MESSAGE
    ));
    assert!(
        services.store.contains(&old.refresh_token),
        "a rejected rotation revokes nothing"
    );
}

#[tokio::test]
async fn test_rotate_for_missing_user_not_found() {
    let user = TestUserBuilder::new().build();
    let services = TestServices::new(
        MockSessionStore::new().with_now(T0),
        MockUserRepository::new(),
    );
    // Issue directly; the subject never existed in the user store
    let pair = services
        .issuer
        .issue_pair(&user.identity(), T0)
        .await
        .expect("issue should succeed");

    let result = services
        .rotator
        .rotate(&pair.access_token, &pair.refresh_token, T0)
        .await;

    assert!(matches!(result, Err(AuthError::NotFound(_))));
}

#[tokio::test]
async fn test_rotate_leaves_another_users_credentials() -> Result<(), anyhow::Error> {
    let alice = TestUserBuilder::new().email("alice@example.com").build();
    let mallory = TestUserBuilder::new().email("mallory@example.com").build();
    let services = TestServices::new(
        MockSessionStore::new().with_now(T0),
        MockUserRepository::new().with_user(alice).with_user(mallory),
    );
    let alice_pair = services
        .login
        .login("alice@example.com", TEST_PASSWORD, Role::Customer, T0)
        .await?;
    let mallory_pair = services
        .login
        .login("mallory@example.com", TEST_PASSWORD, Role::Customer, T0)
        .await?;

    // Alice's credentials in the access slot, Mallory's refresh in the refresh slot
    services
        .rotator
        .rotate(&alice_pair.refresh_token, &mallory_pair.refresh_token, T0)
        .await?;
    services
        .rotator
        .rotate(&alice_pair.access_token, &mallory_pair.access_token, T0)
        .await
        .expect_err("an access credential is not a refresh credential");

    assert!(services.store.contains(&alice_pair.access_token));
    assert!(services.store.contains(&alice_pair.refresh_token));
    assert!(!services.store.contains(&mallory_pair.refresh_token));

    // Alice can still rotate her own session
    services
        .rotator
        .rotate(&alice_pair.access_token, &alice_pair.refresh_token, T0)
        .await?;
    assert!(!services.store.contains(&alice_pair.access_token));

    Ok(())
}

#[tokio::test]
async fn test_rotate_ignores_foreign_access_credential() -> Result<(), anyhow::Error> {
    let (services, _, own) = logged_in(Role::Customer).await;
    let other = TestUserBuilder::new().email("other@example.com").build();
    services.users.insert(other);
    let other_pair = services
        .login
        .login("other@example.com", TEST_PASSWORD, Role::Customer, T0)
        .await?;

    services
        .rotator
        .rotate(&other_pair.access_token, &own.refresh_token, T0)
        .await?;

    assert!(services.store.contains(&other_pair.access_token));
    assert!(!services.store.contains(&own.refresh_token));
    assert!(
        services.store.contains(&own.access_token),
        "own access credential was not presented"
    );

    Ok(())
}

#[tokio::test]
async fn test_rotate_revocation_failure_is_internal_and_keeps_new_pair() {
    let (services, _, old) = logged_in(Role::Customer).await;
    assert_eq!(services.store.len(), 2);
    services.store.set_fail_deletes(true);

    let result = services
        .rotator
        .rotate(&old.access_token, &old.refresh_token, T0)
        .await;

    let err = match result {
        Err(err @ AuthError::Store(_)) => err,
        other => panic!("Expected Store error, got {:?}", other),
    };
    assert_eq!(tonic::Status::from(err).code(), Code::Internal);

    // The new pair was recorded before revocation failed
    assert_eq!(services.store.len(), 4);
    assert!(services.store.contains(&old.access_token));
    assert!(services.store.contains(&old.refresh_token));
}
