use axum::{
    Json,
    extract::{FromRequestParts, State},
    http::{HeaderMap, request::Parts},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use super::error::{ApiError, FieldErrors};
use super::{AppState, validation};
use crate::entities::users;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Deserialize)]
pub struct LoginPayload {
    pub email: Option<Value>,
    pub password: Option<Value>,
}

#[derive(Serialize)]
pub struct TokenResponse {
    pub token: String,
}

// ============================================================================
// Extractor
// ============================================================================

/// The authenticated principal, resolved from `Authorization: Token <key>`.
///
/// Routes that require authentication take this extractor as an argument;
/// public routes simply don't. Permission checks then receive the inner
/// model explicitly, so every handler spells out whose identity it acts on.
pub struct CurrentUser(pub users::Model);

impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let key = extract_token_key(&parts.headers).ok_or(ApiError::NotAuthenticated)?;

        let user = state
            .store
            .user_for_token(&key)
            .await?
            .ok_or(ApiError::InvalidToken)?;

        if !user.is_active {
            tracing::warn!(user_id = user.id, "Token presented for deactivated account");
            return Err(ApiError::InactiveUser);
        }

        tracing::Span::current().record("user_id", user.id);
        Ok(Self(user))
    }
}

/// Extract the key from an `Authorization: Token <key>` header. Any other
/// scheme counts as no credentials at all.
fn extract_token_key(headers: &HeaderMap) -> Option<String> {
    let auth_header = headers.get("Authorization")?;
    let auth_str = auth_header.to_str().ok()?;
    let key = auth_str.strip_prefix("Token ")?.trim();

    if key.is_empty() {
        None
    } else {
        Some(key.to_string())
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/login/
/// Validate credentials and return the account's token. The token is minted
/// on first successful login and stays stable on every later one.
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginPayload>,
) -> Result<Json<TokenResponse>, ApiError> {
    let mut errors = FieldErrors::new();
    let email = validation::string_field(&mut errors, "email", payload.email.as_ref(), true, None);
    let password =
        validation::string_field(&mut errors, "password", payload.password.as_ref(), true, None);

    let (email, password) = match (email, password) {
        (Some(email), Some(password)) if errors.is_empty() => (email, password),
        _ => return Err(ApiError::Validation(errors)),
    };

    // Unknown address, wrong password and deactivated account all collapse
    // into the same answer so callers can't probe which emails exist.
    let Some(user) = state.store.find_user_by_email(&email).await? else {
        tracing::warn!(%email, "Login failed");
        return Err(ApiError::BadCredentials);
    };

    if !user.is_active || !state.store.verify_user_password(&user, &password).await? {
        tracing::warn!(%email, "Login failed");
        return Err(ApiError::BadCredentials);
    }

    let token = state.store.token_for_user(user.id).await?;

    Ok(Json(TokenResponse { token: token.key }))
}
