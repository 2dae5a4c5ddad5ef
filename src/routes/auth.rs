use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::constants::ERR_MISSING_CREDENTIALS;
use crate::db::users;
use crate::error::{AppError, Result};
use crate::models::{User, UserRecord};
use crate::routes::validation::{
    validate_password, validated_email, validated_full_name, AppJson,
};
use crate::security::{
    generate_salt, hash_password, issue_token, verify_password, verify_token, TokenKind,
};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh: String,
}

#[derive(Debug, Serialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: User,
    pub tokens: TokenPair,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub access: String,
}

fn issue_tokens(config: &Config, user_id: &str, now: i64) -> TokenPair {
    TokenPair {
        access: issue_token(
            TokenKind::Access,
            user_id,
            now + config.access_token_ttl_secs,
            &config.app_secret_key,
        ),
        refresh: issue_token(
            TokenKind::Refresh,
            user_id,
            now + config.refresh_token_ttl_secs,
            &config.app_secret_key,
        ),
    }
}

/// Register a new user
///
/// Validates the email, full name and password, stores the account and
/// returns the new profile with a fresh token pair.
///
/// Returns 409 Conflict if the email is already registered.
pub async fn register(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>)> {
    let email = validated_email(&payload.email)?;
    let full_name = validated_full_name(&payload.full_name)?;
    validate_password(&payload.password)?;

    let db = state.db.clone();
    let pepper = state.config.password_pepper.clone();
    let password = payload.password;

    let (user_id, record) = tokio::task::spawn_blocking(move || -> Result<(String, UserRecord)> {
        let password_salt = generate_salt();
        let record = UserRecord {
            email,
            full_name,
            password_hash: hash_password(&password, &password_salt, &pepper),
            password_salt,
            date_joined: Utc::now().timestamp(),
        };

        let user_id = users::create_user(&db, &record)?;
        Ok((user_id, record))
    })
    .await??;

    tracing::info!("New user registered: {}", user_id);

    let tokens = issue_tokens(&state.config, &user_id, Utc::now().timestamp());

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            user: User::from_record(&user_id, &record),
            tokens,
        }),
    ))
}

/// Log in with email and password
///
/// Unknown emails and wrong passwords produce the same error.
pub async fn login(
    State(state): State<AppState>,
    AppJson(payload): AppJson<LoginRequest>,
) -> Result<Json<AuthResponse>> {
    if payload.email.trim().is_empty() || payload.password.is_empty() {
        return Err(AppError::InvalidInput(ERR_MISSING_CREDENTIALS.to_string()));
    }

    let email = User::normalize_email(&payload.email);
    let db = state.db.clone();
    let pepper = state.config.password_pepper.clone();
    let password = payload.password;

    let (user_id, record) = tokio::task::spawn_blocking(move || -> Result<(String, UserRecord)> {
        match users::find_by_email(&db, &email)? {
            Some((user_id, record))
                if verify_password(
                    &password,
                    &record.password_salt,
                    &pepper,
                    &record.password_hash,
                ) =>
            {
                Ok((user_id, record))
            }
            _ => Err(AppError::InvalidCredentials),
        }
    })
    .await?
    .inspect_err(|_| tracing::warn!("Failed login attempt"))?;

    tracing::info!("User logged in: {}", user_id);

    let tokens = issue_tokens(&state.config, &user_id, Utc::now().timestamp());

    Ok(Json(AuthResponse {
        user: User::from_record(&user_id, &record),
        tokens,
    }))
}

/// Exchange a refresh token for a new access token
pub async fn refresh_token(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RefreshRequest>,
) -> Result<Json<RefreshResponse>> {
    let now = Utc::now().timestamp();
    let user_id = verify_token(
        &payload.refresh,
        TokenKind::Refresh,
        now,
        &state.config.app_secret_key,
    )?;

    let db = state.db.clone();
    let lookup_id = user_id.clone();
    let exists = tokio::task::spawn_blocking(move || users::get_user(&db, &lookup_id))
        .await??
        .is_some();
    if !exists {
        return Err(AppError::UserNotFound);
    }

    Ok(Json(RefreshResponse {
        access: issue_token(
            TokenKind::Access,
            &user_id,
            now + state.config.access_token_ttl_secs,
            &state.config.app_secret_key,
        ),
    }))
}
