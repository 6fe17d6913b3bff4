use anyhow::{Context, Result};
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};

use crate::entities::{products, users};

/// Input to product creation; the owner comes from the request context, the
/// active flag always starts true.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub description: String,
    pub price: Decimal,
    pub quantity: i32,
}

/// Partial product update; `None` fields are left untouched.
#[derive(Debug, Default)]
pub struct ProductChanges {
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub quantity: Option<i32>,
}

impl ProductChanges {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.description.is_none() && self.price.is_none() && self.quantity.is_none()
    }
}

pub struct ProductRepository {
    conn: DatabaseConnection,
}

impl ProductRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn create(&self, owner_id: i32, new: NewProduct) -> Result<products::Model> {
        let product = products::ActiveModel {
            description: Set(new.description),
            price: Set(new.price),
            quantity: Set(new.quantity),
            is_active: Set(true),
            user_id: Set(owner_id),
            ..Default::default()
        };

        product
            .insert(&self.conn)
            .await
            .context("Failed to insert product")
    }

    pub async fn get(&self, id: i32) -> Result<Option<products::Model>> {
        products::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query product by ID")
    }

    /// Fetch a product together with its owner row. The foreign key
    /// guarantees the owner exists; a missing join row is a corrupt store.
    pub async fn get_with_owner(&self, id: i32) -> Result<Option<(products::Model, users::Model)>> {
        let row = products::Entity::find_by_id(id)
            .find_also_related(users::Entity)
            .one(&self.conn)
            .await
            .context("Failed to query product with owner")?;

        match row {
            Some((product, Some(owner))) => Ok(Some((product, owner))),
            Some((product, None)) => anyhow::bail!("product {} has no owner row", product.id),
            None => Ok(None),
        }
    }

    pub async fn list(&self) -> Result<Vec<products::Model>> {
        products::Entity::find()
            .order_by_asc(products::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to list products")
    }

    pub async fn list_for_owner(&self, owner_id: i32) -> Result<Vec<products::Model>> {
        products::Entity::find()
            .filter(products::Column::UserId.eq(owner_id))
            .order_by_asc(products::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to list products for owner")
    }

    pub async fn update(
        &self,
        product: products::Model,
        changes: ProductChanges,
    ) -> Result<products::Model> {
        let mut active: products::ActiveModel = product.into();

        if let Some(description) = changes.description {
            active.description = Set(description);
        }

        if let Some(price) = changes.price {
            active.price = Set(price);
        }

        if let Some(quantity) = changes.quantity {
            active.quantity = Set(quantity);
        }

        active
            .update(&self.conn)
            .await
            .context("Failed to update product")
    }

    /// Move every product owned by `from` to `to`; returns how many moved.
    pub async fn reassign_owner(&self, from: i32, to: i32) -> Result<u64> {
        let result = products::Entity::update_many()
            .col_expr(products::Column::UserId, Expr::value(to))
            .filter(products::Column::UserId.eq(from))
            .exec(&self.conn)
            .await
            .context("Failed to reassign products")?;

        Ok(result.rows_affected)
    }
}
