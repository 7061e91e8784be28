//! User store access.
//!
//! `UserRepository` is the seam the services depend on; `PgUserRepository`
//! implements it over a Postgres pool with runtime-checked queries.

use crate::errors::AuthError;
use crate::models::{NewUser, Role, User, UserFilter, UserUpdate};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::str::FromStr;
use uuid::Uuid;

/// Message returned when creating an account whose email is taken.
pub const DUPLICATE_EMAIL_MESSAGE: &str = "user already exists with the given email";

/// Lookup and mutation of user records.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find a user by normalized email, including soft-deleted accounts.
    async fn get_by_email(&self, email: &str) -> Result<Option<User>, AuthError>;

    /// Find a user by id, including soft-deleted accounts.
    async fn get_by_id(&self, id: Uuid) -> Result<Option<User>, AuthError>;

    /// Insert a new user. A taken email fails `InvalidArgument`.
    async fn create(&self, user: NewUser) -> Result<User, AuthError>;

    /// Non-admin, non-deleted users matching the filter, newest first.
    async fn list(&self, filter: &UserFilter) -> Result<Vec<User>, AuthError>;

    /// Update a live user. Returns `false` if no live user has this id.
    async fn update(&self, id: Uuid, update: &UserUpdate) -> Result<bool, AuthError>;

    /// Replace a live user's password hash. Returns `false` if not found.
    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<bool, AuthError>;

    /// Soft-delete a live user (sets `deleted_at`, clears `is_active`).
    /// Returns `false` if no live user has this id.
    async fn soft_delete(&self, id: Uuid) -> Result<bool, AuthError>;
}

/// Row shape of the users table.
#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    name: String,
    email: String,
    password_hash: String,
    role: String,
    is_active: bool,
    note: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl TryFrom<UserRow> for User {
    type Error = AuthError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role = Role::from_str(&row.role).map_err(AuthError::Database)?;

        Ok(User {
            id: row.id,
            name: row.name,
            email: row.email,
            password_hash: row.password_hash,
            role,
            is_active: row.is_active,
            note: row.note,
            created_at: row.created_at,
            updated_at: row.updated_at,
            deleted_at: row.deleted_at,
        })
    }
}

/// Escape `%`, `_` and `\` so a search term matches literally inside ILIKE.
pub fn like_pattern(search: &str) -> String {
    let mut escaped = String::with_capacity(search.len() + 2);
    escaped.push('%');
    for c in search.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// Postgres-backed user repository.
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const USER_COLUMNS: &str = "id, name, email, password_hash, role, is_active, note, \
                            created_at, updated_at, deleted_at";

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn get_by_email(&self, email: &str) -> Result<Option<User>, AuthError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AuthError::Database(format!("Failed to fetch user by email: {}", e)))?;

        row.map(User::try_from).transpose()
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<User>, AuthError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AuthError::Database(format!("Failed to fetch user by id: {}", e)))?;

        row.map(User::try_from).transpose()
    }

    async fn create(&self, user: NewUser) -> Result<User, AuthError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            INSERT INTO users (name, email, password_hash, role, is_active, note)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(user.is_active)
        .bind(&user.note)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                AuthError::invalid_argument(DUPLICATE_EMAIL_MESSAGE)
            }
            _ => AuthError::Database(format!("Failed to create user: {}", e)),
        })?;

        User::try_from(row)
    }

    async fn list(&self, filter: &UserFilter) -> Result<Vec<User>, AuthError> {
        let pattern = filter
            .search
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(like_pattern);

        let rows = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            WHERE deleted_at IS NULL
              AND role <> 'admin'
              AND is_active = $1
              AND ($2::TEXT IS NULL OR name ILIKE $2 OR email ILIKE $2)
            ORDER BY created_at DESC
            "#
        ))
        .bind(filter.is_active)
        .bind(pattern)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AuthError::Database(format!("Failed to list users: {}", e)))?;

        rows.into_iter().map(User::try_from).collect()
    }

    async fn update(&self, id: Uuid, update: &UserUpdate) -> Result<bool, AuthError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET name = $2, is_active = $3, note = $4, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .bind(&update.name)
        .bind(update.is_active)
        .bind(&update.note)
        .execute(&self.pool)
        .await
        .map_err(|e| AuthError::Database(format!("Failed to update user: {}", e)))?;

        Ok(result.rows_affected() > 0)
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<bool, AuthError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET password_hash = $2, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .bind(password_hash)
        .execute(&self.pool)
        .await
        .map_err(|e| AuthError::Database(format!("Failed to update password: {}", e)))?;

        Ok(result.rows_affected() > 0)
    }

    async fn soft_delete(&self, id: Uuid) -> Result<bool, AuthError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET deleted_at = NOW(), is_active = FALSE, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| AuthError::Database(format!("Failed to delete user: {}", e)))?;

        Ok(result.rows_affected() > 0)
    }
}
