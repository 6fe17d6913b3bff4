use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use super::accounts::UserBody;
use super::auth::CurrentUser;
use super::error::{ApiError, FieldErrors};
use super::{AppState, permissions, validation};
use crate::db::{NewProduct, ProductChanges};
use crate::entities::{products, users};

// ============================================================================
// Request/Response Types
// ============================================================================

/// Detail form: what create and update hand back, seller embedded.
/// `Decimal` serializes as a string, so prices read "2500.00" on the wire.
#[derive(Serialize)]
pub struct ProductBody {
    pub id: i32,
    pub description: String,
    pub price: Decimal,
    pub quantity: i32,
    pub seller: UserBody,
    pub is_active: bool,
}

/// Listing form: flat rows with only the seller's id.
#[derive(Serialize)]
pub struct ProductRow {
    pub description: String,
    pub price: Decimal,
    pub quantity: i32,
    pub is_active: bool,
    pub seller_id: i32,
}

impl From<products::Model> for ProductRow {
    fn from(product: products::Model) -> Self {
        Self {
            description: product.description,
            price: product.price,
            quantity: product.quantity,
            is_active: product.is_active,
            seller_id: product.user_id,
        }
    }
}

fn detail_body(product: products::Model, owner: users::Model) -> ProductBody {
    ProductBody {
        id: product.id,
        description: product.description,
        price: product.price,
        quantity: product.quantity,
        seller: UserBody::from(owner),
        is_active: product.is_active,
    }
}

#[derive(Deserialize)]
pub struct ProductPayload {
    pub description: Option<Value>,
    pub price: Option<Value>,
    pub quantity: Option<Value>,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/products/
/// Sellers list a new product. Ownership and the active flag are assigned
/// server-side; the payload only carries the three writable fields.
pub async fn create_product(
    State(state): State<Arc<AppState>>,
    CurrentUser(principal): CurrentUser,
    Json(payload): Json<ProductPayload>,
) -> Result<(StatusCode, Json<ProductBody>), ApiError> {
    if !permissions::is_authenticated_seller(&principal) {
        tracing::warn!(user_id = principal.id, "Product creation refused for non-seller");
        return Err(ApiError::PermissionDenied);
    }

    let mut errors = FieldErrors::new();
    let description = validation::string_field(
        &mut errors,
        "description",
        payload.description.as_ref(),
        true,
        None,
    );
    let price = validation::price_field(&mut errors, "price", payload.price.as_ref(), true);
    let quantity =
        validation::quantity_field(&mut errors, "quantity", payload.quantity.as_ref(), true);

    let new_product = match (description, price, quantity) {
        (Some(description), Some(price), Some(quantity)) if errors.is_empty() => NewProduct {
            description,
            price,
            quantity,
        },
        _ => return Err(ApiError::Validation(errors)),
    };

    let product = state.store.create_product(principal.id, new_product).await?;

    tracing::info!(
        product_id = product.id,
        user_id = principal.id,
        "Product created"
    );

    Ok((StatusCode::CREATED, Json(detail_body(product, principal))))
}

/// GET /api/products/
/// Public, unpaginated catalog in id order.
pub async fn list_products(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ProductRow>>, ApiError> {
    let products = state.store.list_products().await?;
    Ok(Json(products.into_iter().map(ProductRow::from).collect()))
}

/// GET /api/products/{id}/
/// Public detail lookup, rendered in the flat listing form.
pub async fn retrieve_product(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ProductRow>, ApiError> {
    let product = state
        .store
        .get_product(id)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(ProductRow::from(product)))
}

/// PATCH /api/products/{id}/
/// Partial update by the owning seller. Absent fields keep their values;
/// ownership and the active flag cannot be written through this route.
pub async fn update_product(
    State(state): State<Arc<AppState>>,
    CurrentUser(principal): CurrentUser,
    Path(id): Path<i32>,
    Json(payload): Json<ProductPayload>,
) -> Result<Json<ProductBody>, ApiError> {
    let (product, owner) = state
        .store
        .get_product_with_owner(id)
        .await?
        .ok_or(ApiError::NotFound)?;

    if !permissions::is_product_owner(&principal, &product) {
        tracing::warn!(
            user_id = principal.id,
            product_id = product.id,
            "Product update refused"
        );
        return Err(ApiError::PermissionDenied);
    }

    let mut errors = FieldErrors::new();
    let description = validation::string_field(
        &mut errors,
        "description",
        payload.description.as_ref(),
        false,
        None,
    );
    let price = validation::price_field(&mut errors, "price", payload.price.as_ref(), false);
    let quantity =
        validation::quantity_field(&mut errors, "quantity", payload.quantity.as_ref(), false);

    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    let changes = ProductChanges {
        description,
        price,
        quantity,
    };

    let product = if changes.is_empty() {
        product
    } else {
        state.store.update_product(product, changes).await?
    };

    Ok(Json(detail_body(product, owner)))
}
