use axum::{
    extract::{FromRequest, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use chrono::{DateTime, Utc};

use crate::constants::{
    ERR_INVALID_EMAIL, ERR_INVALID_FULL_NAME, ERR_PASSWORD_TOO_SHORT, MIN_PASSWORD_LEN,
};
use crate::db::users;
use crate::error::{AppError, Result};
use crate::models::{User, UserRecord};
use crate::security::{verify_token, TokenError, TokenKind};
use crate::AppState;

/// Convert Unix timestamp to RFC3339 string, defaulting to now if invalid
pub fn timestamp_to_rfc3339(timestamp: i64) -> String {
    DateTime::from_timestamp(timestamp, 0)
        .unwrap_or_else(Utc::now)
        .to_rfc3339()
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        tracing::debug!("Rejected bearer token: {:?}", err);
        AppError::Unauthorized
    }
}

/// JSON request body whose rejections are reported as `{"error": ...}`
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

/// Normalize and validate an email address from a request body
pub fn validated_email(raw: &str) -> Result<String> {
    let email = User::normalize_email(raw);
    if !User::validate_email(&email) {
        return Err(AppError::InvalidInput(ERR_INVALID_EMAIL.to_string()));
    }
    Ok(email)
}

/// Trim and validate a full name from a request body
pub fn validated_full_name(raw: &str) -> Result<String> {
    if !User::validate_full_name(raw) {
        return Err(AppError::InvalidInput(ERR_INVALID_FULL_NAME.to_string()));
    }
    Ok(raw.trim().to_string())
}

/// Validate a new password
pub fn validate_password(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::InvalidInput(ERR_PASSWORD_TOO_SHORT.to_string()));
    }
    Ok(())
}

/// Authenticated caller, resolved from an `Authorization: Bearer <access token>` header
///
/// Rejects with 401 when the header is missing, the token is invalid or
/// expired, or the user no longer exists.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
    pub record: UserRecord,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> std::result::Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or(AppError::Unauthorized)?;

        let user_id = verify_token(
            token,
            TokenKind::Access,
            Utc::now().timestamp(),
            &state.config.app_secret_key,
        )?;

        let db = state.db.clone();
        let lookup_id = user_id.clone();
        let record = tokio::task::spawn_blocking(move || users::get_user(&db, &lookup_id))
            .await??
            .ok_or_else(|| {
                tracing::warn!("Valid token for deleted user {}", user_id);
                AppError::UserNotFound
            })?;

        Ok(AuthUser { user_id, record })
    }
}
