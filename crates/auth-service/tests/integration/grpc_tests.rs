//! E2E tests through a real tonic server with the request gate installed.
//!
//! ## Test Naming
//!
//! Tests follow the convention: `test_grpc_<feature>_<scenario>`

use auth_proto::{
    role, ChangePasswordRequest, CreateUserRequest, Empty, GetAllUserRequest, LoginRequest,
    LogoutRequest, RefreshTokenRequest,
};
use auth_service::grpc::policy::ROLE_NOT_ALLOWED_MESSAGE;
use auth_service::models::Role;
use auth_test_utils::*;
use tonic::Code;

fn login_request(email: &str, password: &str) -> LoginRequest {
    LoginRequest {
        email: email.to_string(),
        password: password.to_string(),
    }
}

async fn server_with(users: &[auth_service::models::User]) -> Result<TestAuthServer, anyhow::Error> {
    let repo = MockUserRepository::new();
    for user in users {
        repo.insert(user.clone());
    }
    TestAuthServer::spawn(MockSessionStore::new(), repo).await
}

#[tokio::test]
async fn test_grpc_admin_session_lifecycle() -> Result<(), anyhow::Error> {
    // Arrange
    let admin = TestUserBuilder::new()
        .email("root@example.com")
        .name("Root")
        .role(Role::Admin)
        .build();
    let customer = TestUserBuilder::new().build();
    let server = server_with(&[admin.clone(), customer.clone()]).await?;
    let mut client = server.client().await?;

    // Act: login and call a restricted operation
    let pair = client
        .login_admin(login_request("root@example.com", TEST_PASSWORD))
        .await?
        .into_inner();

    let listed = client
        .get_all_user(bearer_request(
            GetAllUserRequest {
                search: String::new(),
                is_active: true,
            },
            &pair.access_token,
        ))
        .await?
        .into_inner();

    // Assert: admins are never listed
    assert_eq!(listed.users.len(), 1);
    assert_eq!(
        listed.users.first().map(|u| u.id.clone()),
        Some(customer.id.to_string())
    );

    let verified = client
        .verify(bearer_request(Empty {}, &pair.access_token))
        .await?
        .into_inner();
    assert_eq!(verified.id, admin.id.to_string());
    assert_eq!(verified.name, "Root");
    assert_eq!(verified.role, role::ADMIN);
    assert!(verified.expires_at > 0);

    // Act: logout, then retry
    client
        .logout(bearer_request(
            LogoutRequest {
                refresh_token: pair.refresh_token.clone(),
            },
            &pair.access_token,
        ))
        .await?;

    let status = client
        .get_all_user(bearer_request(
            GetAllUserRequest {
                search: String::new(),
                is_active: true,
            },
            &pair.access_token,
        ))
        .await
        .unwrap_err();

    // Assert
    assert_eq!(status.code(), Code::Unauthenticated);
    assert_eq!(status.message(), "token expired");
    assert!(server.services().store.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_grpc_restricted_without_token_rejected() -> Result<(), anyhow::Error> {
    let server = server_with(&[]).await?;
    let mut client = server.client().await?;

    let status = client.verify(Empty {}).await.unwrap_err();

    assert_eq!(status.code(), Code::Unauthenticated);
    assert_eq!(status.message(), "authorization token is not provided");

    Ok(())
}

#[tokio::test]
async fn test_grpc_customer_denied_admin_operation() -> Result<(), anyhow::Error> {
    let customer = TestUserBuilder::new()
        .email("pat@example.com")
        .name("Pat")
        .build();
    let server = server_with(&[customer]).await?;
    let mut client = server.client().await?;

    let pair = client
        .login_customer(login_request("pat@example.com", TEST_PASSWORD))
        .await?
        .into_inner();

    let status = client
        .get_all_user(bearer_request(GetAllUserRequest::default(), &pair.access_token))
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::Unauthenticated);
    assert_eq!(status.message(), ROLE_NOT_ALLOWED_MESSAGE);

    // Own-profile operations stay open to any role
    let profile = client
        .get_profile_by_id(bearer_request(Empty {}, &pair.access_token))
        .await?
        .into_inner();
    assert_eq!(profile.name, "Pat");
    assert_eq!(profile.deleted_at, 0);

    Ok(())
}

#[tokio::test]
async fn test_grpc_login_wrong_endpoint_looks_like_wrong_password() -> Result<(), anyhow::Error> {
    let customer = TestUserBuilder::new().email("quinn@example.com").build();
    let server = server_with(&[customer]).await?;
    let mut client = server.client().await?;

    let wrong_endpoint = client
        .login_admin(login_request("quinn@example.com", TEST_PASSWORD))
        .await
        .unwrap_err();
    let wrong_password = client
        .login_customer(login_request("quinn@example.com", "nope-nope-nope"))
        .await
        .unwrap_err();

    assert_eq!(wrong_endpoint.code(), Code::InvalidArgument);
    assert_eq!(wrong_endpoint.code(), wrong_password.code());
    assert_eq!(wrong_endpoint.message(), wrong_password.message());

    Ok(())
}

#[tokio::test]
async fn test_grpc_refresh_token_rotation() -> Result<(), anyhow::Error> {
    let user = TestUserBuilder::new()
        .email("rae@example.com")
        .role(Role::Committee)
        .build();
    let server = server_with(&[user]).await?;
    let mut client = server.client().await?;

    let old = client
        .login_committee(login_request("rae@example.com", TEST_PASSWORD))
        .await?
        .into_inner();

    let new = client
        .refresh_token(RefreshTokenRequest {
            access_token: old.access_token.clone(),
            refresh_token: old.refresh_token.clone(),
        })
        .await?
        .into_inner();

    let stale = client
        .verify(bearer_request(Empty {}, &old.access_token))
        .await
        .unwrap_err();
    assert_eq!(stale.code(), Code::Unauthenticated);

    let fresh = client
        .verify(bearer_request(Empty {}, &new.access_token))
        .await?
        .into_inner();
    assert_eq!(fresh.role, role::COMMITTEE);

    let missing = client
        .refresh_token(RefreshTokenRequest::default())
        .await
        .unwrap_err();
    assert_eq!(missing.code(), Code::InvalidArgument);

    Ok(())
}

#[tokio::test]
async fn test_grpc_refresh_credential_as_bearer_rejected() -> Result<(), anyhow::Error> {
    let user = TestUserBuilder::new().email("sam@example.com").build();
    let server = server_with(&[user]).await?;
    let mut client = server.client().await?;

    let pair = client
        .login_customer(login_request("sam@example.com", TEST_PASSWORD))
        .await?
        .into_inner();

    let status = client
        .verify(bearer_request(Empty {}, &pair.refresh_token))
        .await
        .unwrap_err();

    assert_eq!(status.code(), Code::Unauthenticated);
    assert_eq!(status.message(), "invalid token");

    Ok(())
}

#[tokio::test]
async fn test_grpc_create_user_and_change_password() -> Result<(), anyhow::Error> {
    let admin = TestUserBuilder::new()
        .email("ops@example.com")
        .role(Role::Admin)
        .build();
    let server = server_with(&[admin]).await?;
    let mut client = server.client().await?;

    let admin_pair = client
        .login_admin(login_request("ops@example.com", TEST_PASSWORD))
        .await?
        .into_inner();

    let bad_role = client
        .create_user(bearer_request(
            CreateUserRequest {
                name: "Tess".to_string(),
                role: 42,
                email: "tess@example.com".to_string(),
                password: "first-password".to_string(),
                is_active: true,
                note: String::new(),
            },
            &admin_pair.access_token,
        ))
        .await
        .unwrap_err();
    assert_eq!(bad_role.code(), Code::InvalidArgument);

    client
        .create_user(bearer_request(
            CreateUserRequest {
                name: "Tess".to_string(),
                role: role::COMMITTEE,
                email: "tess@example.com".to_string(),
                password: "first-password".to_string(),
                is_active: true,
                note: "treasurer".to_string(),
            },
            &admin_pair.access_token,
        ))
        .await?;

    let tess = client
        .login_committee(login_request("tess@example.com", "first-password"))
        .await?
        .into_inner();

    client
        .change_password(bearer_request(
            ChangePasswordRequest {
                old_password: "first-password".to_string(),
                new_password: "second-password".to_string(),
            },
            &tess.access_token,
        ))
        .await?;

    let relogin = client
        .login_committee(login_request("tess@example.com", "second-password"))
        .await;
    assert!(relogin.is_ok());

    Ok(())
}
