use anyhow::{Context, Result};
use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::Utc;
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ActiveModelTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, SqlErr,
};
use tokio::task;

use crate::config::SecurityConfig;
use crate::entities::users;

/// Input to the account factory operations.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub is_seller: bool,
}

/// Partial profile update; `None` fields are left untouched.
#[derive(Debug, Default)]
pub struct UserChanges {
    pub email: Option<String>,
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub is_seller: Option<bool>,
}

impl UserChanges {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.email.is_none()
            && self.password.is_none()
            && self.first_name.is_none()
            && self.last_name.is_none()
            && self.is_seller.is_none()
    }
}

/// Errors from account writes that callers branch on.
#[derive(Debug, thiserror::Error)]
pub enum UserWriteError {
    #[error("The given email must be set")]
    EmptyEmail,

    /// The storage-layer unique index rejected the email.
    #[error("Email already exists.")]
    EmailTaken,

    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub struct UserRepository {
    conn: DatabaseConnection,
}

impl UserRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Create a regular account. Regular accounts are staff but never
    /// superusers; the seller flag comes from the caller.
    pub async fn create_user(
        &self,
        new: NewUser,
        security: &SecurityConfig,
    ) -> Result<users::Model, UserWriteError> {
        self.create(new, true, false, security).await
    }

    /// Create a superuser. Staff and superuser flags are forced on and the
    /// seller flag forced off, regardless of caller input.
    pub async fn create_superuser(
        &self,
        email: &str,
        password: &str,
        first_name: &str,
        last_name: &str,
        security: &SecurityConfig,
    ) -> Result<users::Model, UserWriteError> {
        let new = NewUser {
            email: email.to_string(),
            password: password.to_string(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            is_seller: false,
        };
        self.create(new, true, true, security).await
    }

    async fn create(
        &self,
        new: NewUser,
        is_staff: bool,
        is_superuser: bool,
        security: &SecurityConfig,
    ) -> Result<users::Model, UserWriteError> {
        if new.email.trim().is_empty() {
            return Err(UserWriteError::EmptyEmail);
        }

        let password = new.password;
        let config = security.clone();
        let password_hash = task::spawn_blocking(move || hash_password(&password, Some(&config)))
            .await
            .context("Password hashing task panicked")??;

        let now = Utc::now();

        let user = users::ActiveModel {
            email: Set(normalize_email(&new.email)),
            password_hash: Set(password_hash),
            first_name: Set(new.first_name),
            last_name: Set(new.last_name),
            is_seller: Set(new.is_seller),
            is_active: Set(true),
            is_staff: Set(is_staff),
            is_superuser: Set(is_superuser),
            date_joined: Set(now),
            last_login: Set(now),
            ..Default::default()
        };

        match user.insert(&self.conn).await {
            Ok(model) => Ok(model),
            Err(err) => match err.sql_err() {
                Some(SqlErr::UniqueConstraintViolation(_)) => Err(UserWriteError::EmailTaken),
                _ => Err(UserWriteError::Database(err)),
            },
        }
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: i32) -> Result<Option<users::Model>> {
        users::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query user by ID")
    }

    /// Get user by email. The match is case-insensitive so lookups agree
    /// with the NOCASE unique index on the column.
    pub async fn get_by_email(&self, email: &str) -> Result<Option<users::Model>> {
        users::Entity::find()
            .filter(Expr::expr(Func::lower(Expr::col(users::Column::Email))).eq(email.to_lowercase()))
            .one(&self.conn)
            .await
            .context("Failed to query user by email")
    }

    /// Page through all users in id order; returns the page plus the total
    /// user count.
    pub async fn list(&self, page: u64, page_size: u64) -> Result<(Vec<users::Model>, u64)> {
        let paginator = users::Entity::find()
            .order_by_asc(users::Column::Id)
            .paginate(&self.conn, page_size);

        let count = paginator.num_items().await.context("Failed to count users")?;
        let items = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .context("Failed to fetch user page")?;

        Ok((items, count))
    }

    /// The `limit` most recently joined users, newest first.
    pub async fn newest(&self, limit: u64) -> Result<Vec<users::Model>> {
        users::Entity::find()
            .order_by_desc(users::Column::DateJoined)
            .limit(limit)
            .all(&self.conn)
            .await
            .context("Failed to query newest users")
    }

    /// Apply a partial profile update. A provided password is re-hashed; a
    /// provided email is re-normalized and subject to the unique index.
    pub async fn update_profile(
        &self,
        user: users::Model,
        changes: UserChanges,
        security: &SecurityConfig,
    ) -> Result<users::Model, UserWriteError> {
        let mut active: users::ActiveModel = user.into();

        if let Some(email) = changes.email {
            if email.trim().is_empty() {
                return Err(UserWriteError::EmptyEmail);
            }
            active.email = Set(normalize_email(&email));
        }

        if let Some(password) = changes.password {
            let config = security.clone();
            let hash = task::spawn_blocking(move || hash_password(&password, Some(&config)))
                .await
                .context("Password hashing task panicked")??;
            active.password_hash = Set(hash);
        }

        if let Some(first_name) = changes.first_name {
            active.first_name = Set(first_name);
        }

        if let Some(last_name) = changes.last_name {
            active.last_name = Set(last_name);
        }

        if let Some(is_seller) = changes.is_seller {
            active.is_seller = Set(is_seller);
        }

        match active.update(&self.conn).await {
            Ok(model) => Ok(model),
            Err(err) => match err.sql_err() {
                Some(SqlErr::UniqueConstraintViolation(_)) => Err(UserWriteError::EmailTaken),
                _ => Err(UserWriteError::Database(err)),
            },
        }
    }

    /// Flip the active flag (admin deactivation path).
    pub async fn set_active(&self, user: users::Model, is_active: bool) -> Result<users::Model> {
        let mut active: users::ActiveModel = user.into();
        active.is_active = Set(is_active);

        active
            .update(&self.conn)
            .await
            .context("Failed to update account active flag")
    }

    /// Hard-delete an account; the FK cascades take its products and token
    /// along. No HTTP route reaches this, it exists for operator tooling.
    pub async fn delete(&self, id: i32) -> Result<bool> {
        let result = users::Entity::delete_by_id(id)
            .exec(&self.conn)
            .await
            .context("Failed to delete user")?;
        Ok(result.rows_affected > 0)
    }

    /// Verify a password against a stored hash.
    /// Note: This uses `spawn_blocking` because Argon2 hashing is CPU-intensive
    /// and would block the async runtime if run directly.
    pub async fn verify_password(&self, user: &users::Model, password: &str) -> Result<bool> {
        let password_hash = user.password_hash.clone();
        let password = password.to_string();

        let is_valid = task::spawn_blocking(move || {
            let parsed_hash = PasswordHash::new(&password_hash)
                .map_err(|e| anyhow::anyhow!("Invalid password hash format: {e}"))?;

            let argon2 = Argon2::default();
            Ok::<bool, anyhow::Error>(
                argon2
                    .verify_password(password.as_bytes(), &parsed_hash)
                    .is_ok(),
            )
        })
        .await
        .context("Password verification task panicked")??;

        Ok(is_valid)
    }
}

/// Hash a password using Argon2id with optional custom params.
/// If config is None, uses default (high memory) params.
pub fn hash_password(password: &str, config: Option<&SecurityConfig>) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    let argon2 = if let Some(cfg) = config {
        let params = Params::new(
            cfg.argon2_memory_cost_kib,
            cfg.argon2_time_cost,
            cfg.argon2_parallelism,
            None, // output length (use default)
        )
        .map_err(|e| anyhow::anyhow!("Invalid Argon2 params: {e}"))?;
        Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
    } else {
        Argon2::default()
    };

    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))?;

    Ok(hash.to_string())
}

/// Lowercase the domain half of an email address, leaving the local part as
/// submitted.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    let email = email.trim();
    email.rsplit_once('@').map_or_else(
        || email.to_string(),
        |(local, domain)| format!("{local}@{}", domain.to_lowercase()),
    )
}
