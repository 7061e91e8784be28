//! Deterministic fixtures: secrets, token settings, users and a wired
//! service bundle.

use crate::mock_session_store::MockSessionStore;
use crate::mock_user_repository::MockUserRepository;
use auth_service::models::{Role, User};
use auth_service::services::credential_issuer::CredentialIssuer;
use auth_service::services::credential_verifier::CredentialVerifier;
use auth_service::services::login_service::LoginService;
use auth_service::services::session_rotator::SessionRotator;
use auth_service::services::user_service::UserService;
use auth_service::services::TokenSettings;
use chrono::{DateTime, Utc};
use common::secret::SecretString;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

pub const TEST_ACCESS_SECRET: &str = "test-access-secret-0123456789abcdef-access";
pub const TEST_REFRESH_SECRET: &str = "test-refresh-secret-0123456789abcdef-refresh";

/// Password every [`TestUserBuilder`] user is created with.
pub const TEST_PASSWORD: &str = "correct-horse-battery";

/// Lowest accepted cost, keeps fixture hashing fast.
pub const TEST_BCRYPT_COST: u32 = 10;

pub const TEST_ACCESS_TTL: Duration = Duration::from_secs(3600);
pub const TEST_REFRESH_TTL: Duration = Duration::from_secs(7 * 24 * 3600);
pub const TEST_TIMEOUT: Duration = Duration::from_secs(2);

/// Token settings with the fixed test secrets.
pub fn test_token_settings() -> TokenSettings {
    TokenSettings {
        access_secret: SecretString::from(TEST_ACCESS_SECRET),
        refresh_secret: SecretString::from(TEST_REFRESH_SECRET),
        access_ttl: TEST_ACCESS_TTL,
        refresh_ttl: TEST_REFRESH_TTL,
        timeout: TEST_TIMEOUT,
    }
}

/// Environment variables accepted by `Config::from_vars`.
pub fn test_config_vars() -> HashMap<String, String> {
    HashMap::from([
        (
            "DATABASE_URL".to_string(),
            "postgresql://localhost/auth_test".to_string(),
        ),
        ("ACCESS_TOKEN_SECRET".to_string(), TEST_ACCESS_SECRET.to_string()),
        ("REFRESH_TOKEN_SECRET".to_string(), TEST_REFRESH_SECRET.to_string()),
        ("BCRYPT_COST".to_string(), TEST_BCRYPT_COST.to_string()),
    ])
}

/// Builder for seeded users.
///
/// Defaults to an active customer whose password is [`TEST_PASSWORD`].
pub struct TestUserBuilder {
    id: Uuid,
    name: String,
    email: String,
    password: String,
    role: Role,
    is_active: bool,
    note: String,
    created_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl Default for TestUserBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestUserBuilder {
    pub fn new() -> Self {
        let id = Uuid::new_v4();
        Self {
            id,
            name: "Test User".to_string(),
            email: format!("user-{}@example.com", id.simple()),
            password: TEST_PASSWORD.to_string(),
            role: Role::Customer,
            is_active: true,
            note: String::new(),
            created_at: Utc::now(),
            deleted_at: None,
        }
    }

    pub fn id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }

    pub fn name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn email(mut self, email: &str) -> Self {
        self.email = email.to_string();
        self
    }

    pub fn password(mut self, password: &str) -> Self {
        self.password = password.to_string();
        self
    }

    pub fn role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    pub fn note(mut self, note: &str) -> Self {
        self.note = note.to_string();
        self
    }

    pub fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// Soft-deleted: `deleted_at` set and `is_active` cleared.
    pub fn deleted(mut self) -> Self {
        self.deleted_at = Some(Utc::now());
        self.is_active = false;
        self
    }

    pub fn build(self) -> User {
        let password_hash =
            bcrypt::hash(&self.password, TEST_BCRYPT_COST).expect("bcrypt hashing failed");

        User {
            id: self.id,
            name: self.name,
            email: self.email,
            password_hash,
            role: self.role,
            is_active: self.is_active,
            note: self.note,
            created_at: self.created_at,
            updated_at: self.created_at,
            deleted_at: self.deleted_at,
        }
    }
}

/// All services wired over the in-memory stores.
#[derive(Clone)]
pub struct TestServices {
    pub store: MockSessionStore,
    pub users: MockUserRepository,
    pub settings: Arc<TokenSettings>,
    pub issuer: CredentialIssuer,
    pub verifier: CredentialVerifier,
    pub login: LoginService,
    pub rotator: SessionRotator,
    pub user_service: UserService,
}

impl TestServices {
    pub fn new(store: MockSessionStore, users: MockUserRepository) -> Self {
        Self::with_settings(store, users, test_token_settings())
    }

    pub fn with_settings(
        store: MockSessionStore,
        users: MockUserRepository,
        settings: TokenSettings,
    ) -> Self {
        let settings = Arc::new(settings);
        let store_dyn: Arc<dyn auth_service::store::SessionStore> = Arc::new(store.clone());
        let users_dyn: Arc<dyn auth_service::repositories::users::UserRepository> =
            Arc::new(users.clone());

        let issuer = CredentialIssuer::new(Arc::clone(&store_dyn), Arc::clone(&settings));
        let verifier = CredentialVerifier::new(Arc::clone(&store_dyn), Arc::clone(&settings));
        let login = LoginService::new(
            Arc::clone(&users_dyn),
            issuer.clone(),
            verifier.clone(),
            Arc::clone(&store_dyn),
            Arc::clone(&settings),
        );
        let rotator = SessionRotator::new(
            verifier.clone(),
            issuer.clone(),
            Arc::clone(&users_dyn),
            Arc::clone(&store_dyn),
            Arc::clone(&settings),
        );
        let user_service = UserService::new(users_dyn, Arc::clone(&settings), TEST_BCRYPT_COST);

        Self {
            store,
            users,
            settings,
            issuer,
            verifier,
            login,
            rotator,
            user_service,
        }
    }
}
