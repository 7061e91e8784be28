//! Account administration and self-service profile operations.

use crate::crypto;
use crate::errors::AuthError;
use crate::models::{NewUser, RequestClaims, Role, User, UserFilter, UserUpdate};
use crate::observability::hash_for_correlation;
use crate::repositories::users::UserRepository;
use crate::services::login_service::normalize_email;
use crate::services::{bounded, TokenSettings};
use common::secret::{ExposeSecret, SecretString};
use std::fmt;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

// Configuration
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Fields for an account created by an administrator.
#[derive(Clone)]
pub struct NewAccount {
    pub name: String,
    pub email: String,
    pub password: SecretString,
    pub role: Role,
    pub is_active: bool,
    pub note: String,
}

impl fmt::Debug for NewAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewAccount")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .field("role", &self.role)
            .field("is_active", &self.is_active)
            .field("note", &self.note)
            .finish()
    }
}

/// Parse a user id from a request field.
pub fn parse_user_id(id: &str) -> Result<Uuid, AuthError> {
    Uuid::parse_str(id.trim()).map_err(|_| AuthError::invalid_argument("invalid user id"))
}

fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::invalid_argument(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<(), AuthError> {
    let valid = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.') && !domain.contains('@'));
    if !valid {
        return Err(AuthError::invalid_argument("invalid email format"));
    }
    Ok(())
}

fn validate_name(name: &str) -> Result<(), AuthError> {
    if name.trim().is_empty() {
        return Err(AuthError::invalid_argument("name is required"));
    }
    Ok(())
}

fn not_found(id: Uuid) -> AuthError {
    AuthError::not_found(format!("user with id {} not found", id))
}

/// Business logic for user management.
#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn UserRepository>,
    settings: Arc<TokenSettings>,
    bcrypt_cost: u32,
}

impl UserService {
    pub fn new(users: Arc<dyn UserRepository>, settings: Arc<TokenSettings>, bcrypt_cost: u32) -> Self {
        Self {
            users,
            settings,
            bcrypt_cost,
        }
    }

    async fn find(&self, id: Uuid) -> Result<User, AuthError> {
        bounded(
            self.settings.timeout,
            "user_store.get_by_id",
            self.users.get_by_id(id),
        )
        .await?
        .ok_or_else(|| not_found(id))
    }

    /// Create an account. The email must be unused.
    #[instrument(skip_all, fields(role = %account.role))]
    pub async fn create_user(&self, account: NewAccount) -> Result<User, AuthError> {
        let email = normalize_email(&account.email);
        validate_name(&account.name)?;
        validate_email(&email)?;
        validate_password(account.password.expose_secret())?;

        let password_hash = crypto::hash_password(account.password.expose_secret(), self.bcrypt_cost)?;

        let user = bounded(
            self.settings.timeout,
            "user_store.create",
            self.users.create(NewUser {
                name: account.name.trim().to_string(),
                email,
                password_hash,
                role: account.role,
                is_active: account.is_active,
                note: account.note,
            }),
        )
        .await?;

        tracing::info!(
            target: "auth.users",
            user = %hash_for_correlation(&user.id.to_string()),
            role = %user.role,
            "User created"
        );

        Ok(user)
    }

    /// List non-admin, non-deleted users.
    #[instrument(skip_all)]
    pub async fn list_users(&self, filter: UserFilter) -> Result<Vec<User>, AuthError> {
        bounded(self.settings.timeout, "user_store.list", self.users.list(&filter)).await
    }

    #[instrument(skip_all)]
    pub async fn get_user(&self, id: &str) -> Result<User, AuthError> {
        let id = parse_user_id(id)?;
        self.find(id).await
    }

    #[instrument(skip_all)]
    pub async fn update_user(&self, id: &str, update: UserUpdate) -> Result<(), AuthError> {
        let id = parse_user_id(id)?;
        validate_name(&update.name)?;

        let update = UserUpdate {
            name: update.name.trim().to_string(),
            ..update
        };

        let updated = bounded(
            self.settings.timeout,
            "user_store.update",
            self.users.update(id, &update),
        )
        .await?;

        if !updated {
            return Err(not_found(id));
        }
        Ok(())
    }

    /// Soft-delete an account. Its live credentials expire naturally.
    #[instrument(skip_all)]
    pub async fn delete_user(&self, id: &str) -> Result<(), AuthError> {
        let id = parse_user_id(id)?;

        let deleted = bounded(
            self.settings.timeout,
            "user_store.soft_delete",
            self.users.soft_delete(id),
        )
        .await?;

        if !deleted {
            return Err(not_found(id));
        }

        tracing::info!(
            target: "auth.users",
            user = %hash_for_correlation(&id.to_string()),
            "User soft-deleted"
        );
        Ok(())
    }

    /// The caller's own record.
    #[instrument(skip_all)]
    pub async fn get_profile(&self, caller: &RequestClaims) -> Result<User, AuthError> {
        let id = caller
            .subject_id()
            .ok_or_else(|| AuthError::unauthenticated(crypto::INVALID_TOKEN))?;
        self.find(id).await
    }

    /// Change the caller's password after checking the current one.
    #[instrument(skip_all)]
    pub async fn change_password(
        &self,
        caller: &RequestClaims,
        old_password: &SecretString,
        new_password: &SecretString,
    ) -> Result<(), AuthError> {
        let user = self.get_profile(caller).await?;

        if !crypto::verify_password(old_password.expose_secret(), &user.password_hash)? {
            return Err(AuthError::invalid_argument("incorrect old password"));
        }
        validate_password(new_password.expose_secret())?;

        let password_hash = crypto::hash_password(new_password.expose_secret(), self.bcrypt_cost)?;

        let updated = bounded(
            self.settings.timeout,
            "user_store.update_password",
            self.users.update_password(user.id, &password_hash),
        )
        .await?;

        if !updated {
            return Err(not_found(user.id));
        }

        tracing::info!(
            target: "auth.users",
            user = %hash_for_correlation(&user.id.to_string()),
            "Password changed"
        );
        Ok(())
    }
}
