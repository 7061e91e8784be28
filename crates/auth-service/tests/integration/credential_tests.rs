//! Credential issuance and verification over the in-memory session store.
//!
//! ## Test Categories
//!
//! - **Issuance**: entries recorded per credential with their own expiry
//! - **Verification**: liveness, signature and expiry, in that order
//! - **Store faults**: failures and timeouts surface as opaque internal errors

use auth_service::crypto::{INVALID_TOKEN, UNEXPECTED_SIGNING_METHOD};
use auth_service::errors::{AuthError, INTERNAL_ERROR_MESSAGE};
use auth_service::models::{CredentialKind, RequestClaims, Role};
use auth_service::services::credential_verifier::CredentialVerifier;
use auth_service::services::{unix_now, TokenSettings};
use auth_service::store::{SessionEntry, SessionRecord, SessionStore};
use auth_test_utils::*;
use common::secret::SecretString;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use std::sync::Arc;
use std::time::Duration;
use tonic::Code;

const T0: i64 = 1_700_000_000;

fn unauthenticated(result: Result<RequestClaims, AuthError>) -> String {
    match result {
        Err(AuthError::Unauthenticated(msg)) => msg,
        other => panic!("Expected Unauthenticated, got {:?}", other),
    }
}

fn services_at(now: i64) -> TestServices {
    TestServices::new(
        MockSessionStore::new().with_now(now),
        MockUserRepository::new(),
    )
}

// ============================================================================
// Issuance
// ============================================================================

#[tokio::test]
async fn test_issue_pair_records_both_credentials() -> Result<(), anyhow::Error> {
    let services = services_at(T0);
    let user = TestUserBuilder::new().role(Role::Committee).build();

    let pair = services.issuer.issue_pair(&user.identity(), T0).await?;

    let access = services.store.record(&pair.access_token).expect("access recorded");
    let refresh = services.store.record(&pair.refresh_token).expect("refresh recorded");

    assert_eq!(access.kind, CredentialKind::Access);
    assert_eq!(access.expires_at, T0 + TEST_ACCESS_TTL.as_secs() as i64);
    assert_eq!(refresh.kind, CredentialKind::Refresh);
    assert_eq!(refresh.expires_at, T0 + TEST_REFRESH_TTL.as_secs() as i64);
    assert_eq!(services.store.set_calls(), 1, "pair is written in one call");

    Ok(())
}

#[tokio::test]
async fn test_issue_in_same_second_yields_distinct_credentials() -> Result<(), anyhow::Error> {
    let services = services_at(T0);
    let identity = TestUserBuilder::new().build().identity();

    let first = services.issuer.issue_access(&identity, T0).await?;
    let second = services.issuer.issue_access(&identity, T0).await?;

    assert_ne!(first, second);
    assert_eq!(services.store.len(), 2);

    Ok(())
}

#[tokio::test]
async fn test_issue_with_failing_store_records_nothing() {
    let services = services_at(T0);
    services.store.set_failing(true);
    let identity = TestUserBuilder::new().build().identity();

    let result = services.issuer.issue_pair(&identity, T0).await;

    assert!(matches!(result, Err(AuthError::Store(_))));
    services.store.set_failing(false);
    assert!(services.store.is_empty());
}

// ============================================================================
// Verification
// ============================================================================

#[tokio::test]
async fn test_verify_access_round_trip() -> Result<(), anyhow::Error> {
    let services = services_at(T0);
    let user = TestUserBuilder::new().name("Grace").role(Role::Admin).build();

    let pair = services.issuer.issue_pair(&user.identity(), T0).await?;
    let claims = services.verifier.verify_access(&pair.access_token, T0 + 1).await?;

    assert_eq!(claims.sub, user.id.to_string());
    assert_eq!(claims.name.as_deref(), Some("Grace"));
    assert_eq!(claims.role, Some(Role::Admin));
    assert_eq!(claims.iat, T0);

    Ok(())
}

#[tokio::test]
async fn test_verify_refresh_carries_subject_only() -> Result<(), anyhow::Error> {
    let services = services_at(T0);
    let user = TestUserBuilder::new().build();

    let pair = services.issuer.issue_pair(&user.identity(), T0).await?;
    let claims = services.verifier.verify_refresh(&pair.refresh_token, T0).await?;

    assert_eq!(claims.subject_id(), Some(user.id));
    assert!(claims.role.is_none());
    assert!(claims.name.is_none());

    Ok(())
}

#[tokio::test]
async fn test_verify_expiry_boundary() -> Result<(), anyhow::Error> {
    let services = services_at(T0);
    let identity = TestUserBuilder::new().build().identity();
    let token = services.issuer.issue_access(&identity, T0).await?;
    let exp = T0 + TEST_ACCESS_TTL.as_secs() as i64;

    // Store clock stays at T0, so only the exp claim decides
    assert!(services.verifier.verify_access(&token, exp - 1).await.is_ok());
    assert_eq!(
        unauthenticated(services.verifier.verify_access(&token, exp).await),
        "token expired"
    );

    Ok(())
}

#[tokio::test]
async fn test_verify_after_store_expiry() -> Result<(), anyhow::Error> {
    let services = services_at(T0);
    let identity = TestUserBuilder::new().build().identity();
    let pair = services.issuer.issue_pair(&identity, T0).await?;

    services.store.set_now(T0 + TEST_REFRESH_TTL.as_secs() as i64);

    assert_eq!(
        unauthenticated(services.verifier.verify_refresh(&pair.refresh_token, T0).await),
        "refresh token expired"
    );

    Ok(())
}

#[tokio::test]
async fn test_verify_revoked_credential() -> Result<(), anyhow::Error> {
    let services = services_at(T0);
    let identity = TestUserBuilder::new().build().identity();
    let pair = services.issuer.issue_pair(&identity, T0).await?;

    assert!(services.store.evict(&pair.access_token));

    assert_eq!(
        unauthenticated(services.verifier.verify_access(&pair.access_token, T0).await),
        "token expired"
    );
    // The paired refresh credential is independent
    assert!(services.verifier.verify_refresh(&pair.refresh_token, T0).await.is_ok());

    Ok(())
}

#[tokio::test]
async fn test_verify_wrong_kind_rejected() -> Result<(), anyhow::Error> {
    let services = services_at(T0);
    let identity = TestUserBuilder::new().build().identity();
    let pair = services.issuer.issue_pair(&identity, T0).await?;

    assert_eq!(
        unauthenticated(services.verifier.verify_access(&pair.refresh_token, T0).await),
        INVALID_TOKEN
    );
    assert_eq!(
        unauthenticated(services.verifier.verify_refresh(&pair.access_token, T0).await),
        INVALID_TOKEN
    );

    Ok(())
}

#[tokio::test]
async fn test_verify_with_other_secret_rejected() -> Result<(), anyhow::Error> {
    let services = services_at(T0);
    let identity = TestUserBuilder::new().build().identity();
    let token = services.issuer.issue_access(&identity, T0).await?;

    let other = Arc::new(TokenSettings {
        access_secret: SecretString::from("a-completely-different-access-secret-value"),
        ..test_token_settings()
    });
    let verifier = CredentialVerifier::new(Arc::new(services.store.clone()), other);

    assert_eq!(
        unauthenticated(verifier.verify_access(&token, T0).await),
        INVALID_TOKEN
    );

    Ok(())
}

#[tokio::test]
async fn test_verify_foreign_algorithm_rejected() -> Result<(), anyhow::Error> {
    let services = services_at(T0);
    let claims = RequestClaims {
        sub: uuid::Uuid::new_v4().to_string(),
        name: Some("Mallory".to_string()),
        role: Some(Role::Admin),
        iat: T0,
        exp: T0 + 60,
        jti: "jti".to_string(),
    };
    let token = encode(
        &Header::new(Algorithm::HS512),
        &claims,
        &EncodingKey::from_secret(TEST_ACCESS_SECRET.as_bytes()),
    )?;

    // Present in the store, so the signature check is what rejects it
    services
        .store
        .set(&[SessionEntry {
            token: token.clone(),
            record: SessionRecord {
                kind: CredentialKind::Access,
                expires_at: T0 + 60,
            },
        }])
        .await?;

    assert_eq!(
        unauthenticated(services.verifier.verify_access(&token, T0).await),
        UNEXPECTED_SIGNING_METHOD
    );

    Ok(())
}

// ============================================================================
// Store faults
// ============================================================================

#[tokio::test]
async fn test_verify_with_failing_store_is_opaque_internal() -> Result<(), anyhow::Error> {
    let services = TestServices::new(MockSessionStore::new(), MockUserRepository::new());
    let identity = TestUserBuilder::new().build().identity();
    let token = services.issuer.issue_access(&identity, unix_now()).await?;

    services.store.set_failing(true);
    let err = services
        .verifier
        .verify_access(&token, unix_now())
        .await
        .unwrap_err();

    let status = tonic::Status::from(err);
    assert_eq!(status.code(), Code::Internal);
    assert_eq!(status.message(), INTERNAL_ERROR_MESSAGE);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_verify_times_out_on_slow_store() {
    let services = TestServices::new(
        MockSessionStore::new().with_delay(Duration::from_secs(30)),
        MockUserRepository::new(),
    );

    let err = services
        .verifier
        .verify_access("abc.def.ghi", T0)
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::Timeout("session_store.get")));
    assert_eq!(tonic::Status::from(err).code(), Code::Internal);
}
