use anyhow::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::config::SecurityConfig;
use crate::entities::{auth_tokens, products, users};

pub mod migrator;
pub mod repositories;

pub use repositories::product::{NewProduct, ProductChanges};
pub use repositories::user::{NewUser, UserChanges, UserWriteError};

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        let in_memory = db_url.contains(":memory:");

        if !in_memory {
            let path_str = db_url.trim_start_matches("sqlite:");
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        // Each pooled connection to an in-memory sqlite sees its own empty
        // database, so those pools are pinned to one long-lived connection.
        let (max_connections, min_connections) = if in_memory {
            (1, 1)
        } else {
            (max_connections, min_connections)
        };

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .sqlx_logging(false);

        if !in_memory {
            opt.idle_timeout(Duration::from_secs(300))
                .max_lifetime(Duration::from_secs(600));
        }

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    fn product_repo(&self) -> repositories::product::ProductRepository {
        repositories::product::ProductRepository::new(self.conn.clone())
    }

    fn token_repo(&self) -> repositories::token::TokenRepository {
        repositories::token::TokenRepository::new(self.conn.clone())
    }

    // ========== Account Methods ==========

    pub async fn create_user(
        &self,
        new: NewUser,
        security: &SecurityConfig,
    ) -> Result<users::Model, UserWriteError> {
        self.user_repo().create_user(new, security).await
    }

    pub async fn create_superuser(
        &self,
        email: &str,
        password: &str,
        first_name: &str,
        last_name: &str,
        security: &SecurityConfig,
    ) -> Result<users::Model, UserWriteError> {
        self.user_repo()
            .create_superuser(email, password, first_name, last_name, security)
            .await
    }

    pub async fn get_user_by_id(&self, id: i32) -> Result<Option<users::Model>> {
        self.user_repo().get_by_id(id).await
    }

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<users::Model>> {
        self.user_repo().get_by_email(email).await
    }

    pub async fn list_users(&self, page: u64, page_size: u64) -> Result<(Vec<users::Model>, u64)> {
        self.user_repo().list(page, page_size).await
    }

    pub async fn newest_users(&self, limit: u64) -> Result<Vec<users::Model>> {
        self.user_repo().newest(limit).await
    }

    pub async fn update_user_profile(
        &self,
        user: users::Model,
        changes: UserChanges,
        security: &SecurityConfig,
    ) -> Result<users::Model, UserWriteError> {
        self.user_repo()
            .update_profile(user, changes, security)
            .await
    }

    pub async fn set_user_active(
        &self,
        user: users::Model,
        is_active: bool,
    ) -> Result<users::Model> {
        self.user_repo().set_active(user, is_active).await
    }

    pub async fn verify_user_password(&self, user: &users::Model, password: &str) -> Result<bool> {
        self.user_repo().verify_password(user, password).await
    }

    pub async fn delete_user(&self, id: i32) -> Result<bool> {
        self.user_repo().delete(id).await
    }

    // ========== Token Methods ==========

    pub async fn token_for_user(&self, user_id: i32) -> Result<auth_tokens::Model> {
        self.token_repo().get_or_create(user_id).await
    }

    pub async fn user_for_token(&self, key: &str) -> Result<Option<users::Model>> {
        self.token_repo().resolve_user(key).await
    }

    // ========== Product Methods ==========

    pub async fn create_product(
        &self,
        owner_id: i32,
        new: NewProduct,
    ) -> Result<products::Model> {
        self.product_repo().create(owner_id, new).await
    }

    pub async fn get_product(&self, id: i32) -> Result<Option<products::Model>> {
        self.product_repo().get(id).await
    }

    pub async fn get_product_with_owner(
        &self,
        id: i32,
    ) -> Result<Option<(products::Model, users::Model)>> {
        self.product_repo().get_with_owner(id).await
    }

    pub async fn list_products(&self) -> Result<Vec<products::Model>> {
        self.product_repo().list().await
    }

    pub async fn products_for_owner(&self, owner_id: i32) -> Result<Vec<products::Model>> {
        self.product_repo().list_for_owner(owner_id).await
    }

    pub async fn update_product(
        &self,
        product: products::Model,
        changes: ProductChanges,
    ) -> Result<products::Model> {
        self.product_repo().update(product, changes).await
    }

    pub async fn reassign_products(&self, from: i32, to: i32) -> Result<u64> {
        self.product_repo().reassign_owner(from, to).await
    }
}
