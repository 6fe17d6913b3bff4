use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use super::auth::CurrentUser;
use super::error::{ApiError, FieldErrors};
use super::{AppState, permissions, validation};
use crate::db::{NewUser, UserChanges};
use crate::entities::users;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Wire form of an account. The password hash never leaves the server and
/// the numeric id is deliberately absent from this shape.
#[derive(Serialize)]
pub struct UserBody {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_seller: bool,
    pub date_joined: DateTime<Utc>,
}

impl From<users::Model> for UserBody {
    fn from(user: users::Model) -> Self {
        Self {
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            is_seller: user.is_seller,
            date_joined: user.date_joined,
        }
    }
}

/// Wire form used by the management endpoint: identity plus the active flag.
#[derive(Serialize)]
pub struct ActivationBody {
    pub id: i32,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_seller: bool,
    pub is_active: bool,
}

impl From<users::Model> for ActivationBody {
    fn from(user: users::Model) -> Self {
        Self {
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            is_seller: user.is_seller,
            is_active: user.is_active,
        }
    }
}

/// Raw registration/profile payload. Fields stay as JSON values so the
/// validators can report every problem in one pass instead of bailing on
/// the first type mismatch.
#[derive(Deserialize)]
pub struct UserPayload {
    pub email: Option<Value>,
    pub password: Option<Value>,
    pub first_name: Option<Value>,
    pub last_name: Option<Value>,
    pub is_seller: Option<Value>,
}

#[derive(Deserialize)]
pub struct ActivationPayload {
    pub is_active: Option<Value>,
}

/// Pagination query. Values arrive as strings so that junk like `?page=abc`
/// falls back to the defaults instead of failing deserialization.
#[derive(Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
    pub page_size: Option<String>,
}

#[derive(Serialize)]
pub struct UserPage {
    pub count: u64,
    pub results: Vec<UserBody>,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/accounts/
/// Open registration. Every profile field is required and the email must be
/// unused; uniqueness failures land in the same error map as everything else.
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<UserPayload>,
) -> Result<(StatusCode, Json<UserBody>), ApiError> {
    let mut errors = FieldErrors::new();

    let email = validation::email_field(&mut errors, "email", payload.email.as_ref(), true);
    let password = validation::string_field(
        &mut errors,
        "password",
        payload.password.as_ref(),
        true,
        Some(validation::PASSWORD_MAX_LENGTH),
    );
    let first_name = validation::string_field(
        &mut errors,
        "first_name",
        payload.first_name.as_ref(),
        true,
        Some(validation::NAME_MAX_LENGTH),
    );
    let last_name = validation::string_field(
        &mut errors,
        "last_name",
        payload.last_name.as_ref(),
        true,
        Some(validation::NAME_MAX_LENGTH),
    );
    let is_seller = validation::bool_field(&mut errors, "is_seller", payload.is_seller.as_ref(), true);

    if let Some(email) = email.as_deref()
        && state.store.find_user_by_email(email).await?.is_some()
    {
        errors.add("email", validation::EMAIL_TAKEN);
    }

    let new_user = match (email, password, first_name, last_name, is_seller) {
        (Some(email), Some(password), Some(first_name), Some(last_name), Some(is_seller))
            if errors.is_empty() =>
        {
            NewUser {
                email,
                password,
                first_name,
                last_name,
                is_seller,
            }
        }
        _ => return Err(ApiError::Validation(errors)),
    };

    let user = state
        .store
        .create_user(new_user, &state.config.security)
        .await?;

    tracing::info!(user_id = user.id, "Account registered");

    Ok((StatusCode::CREATED, Json(UserBody::from(user))))
}

/// GET /api/accounts/
/// Public paginated listing in plain id order.
pub async fn list_accounts(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PageQuery>,
) -> Result<Json<UserPage>, ApiError> {
    let page = query
        .page
        .as_deref()
        .and_then(|raw| raw.parse().ok())
        .filter(|page| *page >= 1)
        .unwrap_or(1);
    let page_size = query
        .page_size
        .as_deref()
        .and_then(|raw| raw.parse().ok())
        .filter(|size| *size >= 1)
        .unwrap_or(state.config.api.page_size)
        .min(state.config.api.max_page_size);

    let (users, count) = state.store.list_users(page, page_size).await?;

    Ok(Json(UserPage {
        count,
        results: users.into_iter().map(UserBody::from).collect(),
    }))
}

/// GET /api/accounts/newest/{n}/
/// The n most recently joined accounts, newest first, as a plain array.
pub async fn newest_accounts(
    State(state): State<Arc<AppState>>,
    Path(n): Path<u64>,
) -> Result<Json<Vec<UserBody>>, ApiError> {
    let users = state.store.newest_users(n).await?;
    Ok(Json(users.into_iter().map(UserBody::from).collect()))
}

/// PATCH /api/accounts/{id}/
/// Partial profile update, restricted to the account's own user. Fields that
/// are absent keep their stored values; fields that are present must pass
/// the same checks registration applies.
pub async fn update_account(
    State(state): State<Arc<AppState>>,
    CurrentUser(principal): CurrentUser,
    Path(id): Path<i32>,
    Json(payload): Json<UserPayload>,
) -> Result<Json<UserBody>, ApiError> {
    let target = state
        .store
        .get_user_by_id(id)
        .await?
        .ok_or(ApiError::NotFound)?;

    if !permissions::is_account_owner(&principal, &target) {
        tracing::warn!(
            user_id = principal.id,
            target_id = target.id,
            "Account update refused"
        );
        return Err(ApiError::PermissionDenied);
    }

    let mut errors = FieldErrors::new();

    let email = validation::email_field(&mut errors, "email", payload.email.as_ref(), false);
    let password = validation::string_field(
        &mut errors,
        "password",
        payload.password.as_ref(),
        false,
        Some(validation::PASSWORD_MAX_LENGTH),
    );
    let first_name = validation::string_field(
        &mut errors,
        "first_name",
        payload.first_name.as_ref(),
        false,
        Some(validation::NAME_MAX_LENGTH),
    );
    let last_name = validation::string_field(
        &mut errors,
        "last_name",
        payload.last_name.as_ref(),
        false,
        Some(validation::NAME_MAX_LENGTH),
    );
    let is_seller =
        validation::bool_field(&mut errors, "is_seller", payload.is_seller.as_ref(), false);

    // A new email must not belong to anyone else; keeping your own is fine.
    if let Some(email) = email.as_deref()
        && let Some(existing) = state.store.find_user_by_email(email).await?
        && existing.id != target.id
    {
        errors.add("email", validation::EMAIL_TAKEN);
    }

    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    let changes = UserChanges {
        email,
        password,
        first_name,
        last_name,
        is_seller,
    };

    if changes.is_empty() {
        return Ok(Json(UserBody::from(target)));
    }

    let user = state
        .store
        .update_user_profile(target, changes, &state.config.security)
        .await?;

    Ok(Json(UserBody::from(user)))
}

/// PATCH /api/accounts/{id}/management/
/// Superuser-only switch for the active flag. Everything else in the body
/// is read-only here and silently ignored.
pub async fn change_active(
    State(state): State<Arc<AppState>>,
    CurrentUser(principal): CurrentUser,
    Path(id): Path<i32>,
    Json(payload): Json<ActivationPayload>,
) -> Result<Json<ActivationBody>, ApiError> {
    let target = state
        .store
        .get_user_by_id(id)
        .await?
        .ok_or(ApiError::NotFound)?;

    if !permissions::is_admin(&principal) {
        tracing::warn!(
            user_id = principal.id,
            target_id = target.id,
            "Account management refused"
        );
        return Err(ApiError::PermissionDenied);
    }

    let mut errors = FieldErrors::new();
    let is_active =
        validation::bool_field(&mut errors, "is_active", payload.is_active.as_ref(), false);
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    let user = match is_active {
        Some(flag) => {
            tracing::info!(user_id = target.id, is_active = flag, "Account flag changed");
            state.store.set_user_active(target, flag).await?
        }
        None => target,
    };

    Ok(Json(ActivationBody::from(user)))
}
