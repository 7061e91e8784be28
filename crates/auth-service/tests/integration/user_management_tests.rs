//! Account administration and self-service profile operations.

use auth_service::errors::AuthError;
use auth_service::models::{RequestClaims, Role, UserFilter, UserUpdate};
use auth_service::repositories::users::DUPLICATE_EMAIL_MESSAGE;
use auth_service::services::session_rotator::ACCOUNT_DELETED_MESSAGE;
use auth_service::services::unix_now;
use auth_service::services::user_service::NewAccount;
use auth_test_utils::*;
use chrono::{Duration as ChronoDuration, Utc};
use common::secret::SecretString;
use uuid::Uuid;

fn services_with(users: MockUserRepository) -> TestServices {
    TestServices::new(MockSessionStore::new(), users)
}

fn account(email: &str, password: &str) -> NewAccount {
    NewAccount {
        name: "Lena".to_string(),
        email: email.to_string(),
        password: SecretString::from(password),
        role: Role::Customer,
        is_active: true,
        note: "walk-in".to_string(),
    }
}

fn claims_for(id: Uuid) -> RequestClaims {
    RequestClaims {
        sub: id.to_string(),
        name: None,
        role: Some(Role::Customer),
        iat: 0,
        exp: i64::MAX,
        jti: "jti".to_string(),
    }
}

fn invalid_argument<T: std::fmt::Debug>(result: Result<T, AuthError>) -> String {
    match result {
        Err(AuthError::InvalidArgument(msg)) => msg,
        other => panic!("Expected InvalidArgument, got {:?}", other),
    }
}

// ============================================================================
// Create
// ============================================================================

#[tokio::test]
async fn test_create_user_then_login() -> Result<(), anyhow::Error> {
    let services = services_with(MockUserRepository::new());

    let created = services
        .user_service
        .create_user(account("  Lena@Example.com", "s3cret-pass"))
        .await?;

    assert_eq!(created.email, "lena@example.com");
    assert_ne!(created.password_hash, "s3cret-pass");
    assert!(created.deleted_at.is_none());

    let pair = services
        .login
        .login("lena@example.com", "s3cret-pass", Role::Customer, unix_now())
        .await?;
    assert!(services.store.contains(&pair.access_token));

    Ok(())
}

#[tokio::test]
async fn test_create_user_duplicate_email_rejected() {
    let existing = TestUserBuilder::new().email("taken@example.com").build();
    let services = services_with(MockUserRepository::new().with_user(existing));

    let result = services
        .user_service
        .create_user(account("TAKEN@example.com", "s3cret-pass"))
        .await;

    assert_eq!(invalid_argument(result), DUPLICATE_EMAIL_MESSAGE);
}

#[tokio::test]
async fn test_create_user_validation() {
    let services = services_with(MockUserRepository::new());

    let short = services
        .user_service
        .create_user(account("ok@example.com", "short"))
        .await;
    assert!(invalid_argument(short).contains("at least 8"));

    let bad_email = services
        .user_service
        .create_user(account("not-an-email", "s3cret-pass"))
        .await;
    assert_eq!(invalid_argument(bad_email), "invalid email format");

    let mut nameless = account("ok@example.com", "s3cret-pass");
    nameless.name = "  ".to_string();
    let nameless = services.user_service.create_user(nameless).await;
    assert_eq!(invalid_argument(nameless), "name is required");
}

// ============================================================================
// List / get
// ============================================================================

#[tokio::test]
async fn test_list_users_filters_and_orders() -> Result<(), anyhow::Error> {
    let now = Utc::now();
    let older = TestUserBuilder::new()
        .name("Older Customer")
        .created_at(now - ChronoDuration::hours(2))
        .build();
    let newer = TestUserBuilder::new()
        .name("Newer Committee")
        .role(Role::Committee)
        .created_at(now - ChronoDuration::hours(1))
        .build();
    let admin = TestUserBuilder::new().role(Role::Admin).build();
    let deleted = TestUserBuilder::new().deleted().build();
    let inactive = TestUserBuilder::new().inactive().build();

    let services = services_with(
        MockUserRepository::new()
            .with_user(older.clone())
            .with_user(newer.clone())
            .with_user(admin)
            .with_user(deleted)
            .with_user(inactive.clone()),
    );

    let active = services
        .user_service
        .list_users(UserFilter {
            search: None,
            is_active: true,
        })
        .await?;
    let ids: Vec<Uuid> = active.iter().map(|u| u.id).collect();
    assert_eq!(ids, vec![newer.id, older.id]);

    let inactive_only = services
        .user_service
        .list_users(UserFilter {
            search: None,
            is_active: false,
        })
        .await?;
    assert_eq!(inactive_only.len(), 1);
    assert_eq!(inactive_only.first().map(|u| u.id), Some(inactive.id));

    let searched = services
        .user_service
        .list_users(UserFilter {
            search: Some("committee".to_string()),
            is_active: true,
        })
        .await?;
    assert_eq!(searched.len(), 1);
    assert_eq!(searched.first().map(|u| u.id), Some(newer.id));

    Ok(())
}

#[tokio::test]
async fn test_get_user_errors() {
    let services = services_with(MockUserRepository::new());

    let bad = services.user_service.get_user("not-a-uuid").await;
    assert_eq!(invalid_argument(bad), "invalid user id");

    let missing = services.user_service.get_user(&Uuid::new_v4().to_string()).await;
    assert!(matches!(missing, Err(AuthError::NotFound(_))));
}

#[tokio::test]
async fn test_get_user_includes_soft_deleted() -> Result<(), anyhow::Error> {
    let deleted = TestUserBuilder::new().deleted().build();
    let services = services_with(MockUserRepository::new().with_user(deleted.clone()));

    let found = services.user_service.get_user(&deleted.id.to_string()).await?;
    assert!(found.deleted_at.is_some());

    Ok(())
}

// ============================================================================
// Update / delete
// ============================================================================

#[tokio::test]
async fn test_update_user() -> Result<(), anyhow::Error> {
    let user = TestUserBuilder::new().build();
    let services = services_with(MockUserRepository::new().with_user(user.clone()));

    services
        .user_service
        .update_user(
            &user.id.to_string(),
            UserUpdate {
                name: " Renamed ".to_string(),
                is_active: false,
                note: "moved".to_string(),
            },
        )
        .await?;

    let stored = services.users.user(user.id).expect("user still stored");
    assert_eq!(stored.name, "Renamed");
    assert!(!stored.is_active);
    assert_eq!(stored.note, "moved");

    let missing = services
        .user_service
        .update_user(
            &Uuid::new_v4().to_string(),
            UserUpdate {
                name: "x".to_string(),
                is_active: true,
                note: String::new(),
            },
        )
        .await;
    assert!(matches!(missing, Err(AuthError::NotFound(_))));

    Ok(())
}

#[tokio::test]
async fn test_delete_user_soft_deletes_and_blocks_login() -> Result<(), anyhow::Error> {
    let user = TestUserBuilder::new().email("mo@example.com").build();
    let services = services_with(MockUserRepository::new().with_user(user.clone()));

    services.user_service.delete_user(&user.id.to_string()).await?;

    let stored = services.users.user(user.id).expect("row is kept");
    assert!(stored.deleted_at.is_some());
    assert!(!stored.is_active);

    let again = services.user_service.delete_user(&user.id.to_string()).await;
    assert!(matches!(again, Err(AuthError::NotFound(_))));

    let login = services
        .login
        .login("mo@example.com", TEST_PASSWORD, Role::Customer, unix_now())
        .await;
    assert!(matches!(
        login,
        Err(AuthError::Unauthenticated(msg)) if msg == ACCOUNT_DELETED_MESSAGE
    ));

    Ok(())
}

// ============================================================================
// Profile / password
// ============================================================================

#[tokio::test]
async fn test_get_profile_returns_callers_record() -> Result<(), anyhow::Error> {
    let user = TestUserBuilder::new().name("Nia").build();
    let services = services_with(MockUserRepository::new().with_user(user.clone()));

    let profile = services.user_service.get_profile(&claims_for(user.id)).await?;

    assert_eq!(profile.id, user.id);
    assert_eq!(profile.name, "Nia");

    Ok(())
}

#[tokio::test]
async fn test_change_password() -> Result<(), anyhow::Error> {
    let user = TestUserBuilder::new().email("omar@example.com").build();
    let services = services_with(MockUserRepository::new().with_user(user.clone()));
    let claims = claims_for(user.id);

    let wrong_old = services
        .user_service
        .change_password(
            &claims,
            &SecretString::from("not-the-password"),
            &SecretString::from("brand-new-pass"),
        )
        .await;
    assert_eq!(invalid_argument(wrong_old), "incorrect old password");

    let too_short = services
        .user_service
        .change_password(
            &claims,
            &SecretString::from(TEST_PASSWORD),
            &SecretString::from("short"),
        )
        .await;
    assert!(invalid_argument(too_short).contains("at least 8"));

    services
        .user_service
        .change_password(
            &claims,
            &SecretString::from(TEST_PASSWORD),
            &SecretString::from("brand-new-pass"),
        )
        .await?;

    let now = unix_now();
    assert!(services
        .login
        .login("omar@example.com", "brand-new-pass", Role::Customer, now)
        .await
        .is_ok());
    assert!(services
        .login
        .login("omar@example.com", TEST_PASSWORD, Role::Customer, now)
        .await
        .is_err());

    Ok(())
}
