//! In-memory user repository.
//!
//! Mirrors the Postgres repository's rules: emails are unique, listing
//! skips admins and soft-deleted users, and mutations only touch live
//! users.

use async_trait::async_trait;
use auth_service::errors::AuthError;
use auth_service::models::{NewUser, Role, User, UserFilter, UserUpdate};
use auth_service::repositories::users::{UserRepository, DUPLICATE_EMAIL_MESSAGE};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Mock user store for service and handler tests.
#[derive(Debug, Clone, Default)]
pub struct MockUserRepository {
    inner: Arc<Mutex<MockUserRepositoryInner>>,
}

#[derive(Debug, Default)]
struct MockUserRepositoryInner {
    users: HashMap<Uuid, User>,
    failing: bool,
}

impl MockUserRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a user.
    #[must_use]
    pub fn with_user(self, user: User) -> Self {
        self.insert(user);
        self
    }

    pub fn insert(&self, user: User) {
        self.inner.lock().unwrap().users.insert(user.id, user);
    }

    /// Current stored copy of a user.
    pub fn user(&self, id: Uuid) -> Option<User> {
        self.inner.lock().unwrap().users.get(&id).cloned()
    }

    /// Make every subsequent call fail as if the database were down.
    pub fn set_failing(&self, failing: bool) {
        self.inner.lock().unwrap().failing = failing;
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, MockUserRepositoryInner>, AuthError> {
        let inner = self.inner.lock().unwrap();
        if inner.failing {
            return Err(AuthError::Database("mock user store unavailable".to_string()));
        }
        Ok(inner)
    }
}

fn live_mut(inner: &mut MockUserRepositoryInner, id: Uuid) -> Option<&mut User> {
    inner
        .users
        .get_mut(&id)
        .filter(|user| user.deleted_at.is_none())
}

#[async_trait]
impl UserRepository for MockUserRepository {
    async fn get_by_email(&self, email: &str) -> Result<Option<User>, AuthError> {
        let inner = self.lock()?;
        Ok(inner.users.values().find(|u| u.email == email).cloned())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<User>, AuthError> {
        Ok(self.lock()?.users.get(&id).cloned())
    }

    async fn create(&self, user: NewUser) -> Result<User, AuthError> {
        let mut inner = self.lock()?;
        if inner.users.values().any(|u| u.email == user.email) {
            return Err(AuthError::invalid_argument(DUPLICATE_EMAIL_MESSAGE));
        }

        let now = Utc::now();
        let created = User {
            id: Uuid::new_v4(),
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            role: user.role,
            is_active: user.is_active,
            note: user.note,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        inner.users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn list(&self, filter: &UserFilter) -> Result<Vec<User>, AuthError> {
        let inner = self.lock()?;
        let search = filter.search.as_ref().map(|s| s.to_lowercase());

        let mut users: Vec<User> = inner
            .users
            .values()
            .filter(|u| u.deleted_at.is_none() && u.role != Role::Admin)
            .filter(|u| u.is_active == filter.is_active)
            .filter(|u| {
                search.as_ref().map_or(true, |s| {
                    u.name.to_lowercase().contains(s) || u.email.to_lowercase().contains(s)
                })
            })
            .cloned()
            .collect();

        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(users)
    }

    async fn update(&self, id: Uuid, update: &UserUpdate) -> Result<bool, AuthError> {
        let mut inner = self.lock()?;
        let Some(user) = live_mut(&mut inner, id) else {
            return Ok(false);
        };

        user.name = update.name.clone();
        user.is_active = update.is_active;
        user.note = update.note.clone();
        user.updated_at = Utc::now();
        Ok(true)
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<bool, AuthError> {
        let mut inner = self.lock()?;
        let Some(user) = live_mut(&mut inner, id) else {
            return Ok(false);
        };

        user.password_hash = password_hash.to_string();
        user.updated_at = Utc::now();
        Ok(true)
    }

    async fn soft_delete(&self, id: Uuid) -> Result<bool, AuthError> {
        let mut inner = self.lock()?;
        let Some(user) = live_mut(&mut inner, id) else {
            return Ok(false);
        };

        let now = Utc::now();
        user.deleted_at = Some(now);
        user.is_active = false;
        user.updated_at = now;
        Ok(true)
    }
}
