use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::db::users;
use crate::error::{AppError, Result};
use crate::models::User;
use crate::routes::validation::{validated_email, validated_full_name, AppJson, AuthUser};
use crate::security::verify_password;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub email: Option<String>,
    pub full_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteAccountRequest {
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct DeleteAccountResponse {
    pub success: bool,
    pub message: String,
}

/// Current user's profile
pub async fn get_profile(auth: AuthUser) -> Json<User> {
    Json(User::from_record(&auth.user_id, &auth.record))
}

/// Update the current user's email and/or full name
///
/// Omitted fields are left unchanged. Returns 409 Conflict if the new email
/// belongs to another account.
pub async fn update_profile(
    State(state): State<AppState>,
    auth: AuthUser,
    AppJson(payload): AppJson<UpdateProfileRequest>,
) -> Result<Json<User>> {
    let email = payload.email.as_deref().map(validated_email).transpose()?;
    let full_name = payload
        .full_name
        .as_deref()
        .map(validated_full_name)
        .transpose()?;

    let db = state.db.clone();
    let user_id = auth.user_id.clone();
    let record =
        tokio::task::spawn_blocking(move || users::update_profile(&db, &user_id, email, full_name))
            .await??;

    tracing::info!("Profile updated for user {}", auth.user_id);

    Ok(Json(User::from_record(&auth.user_id, &record)))
}

/// Delete the current user and all associated data
///
/// This endpoint permanently deletes:
/// - User record and email index entry
/// - All analyses and their uploaded images
/// - All weekly summaries
///
/// # Security
/// - Requires a valid access token
/// - Requires the account password as confirmation
///
/// # Note
/// This action is irreversible.
pub async fn delete_account(
    State(state): State<AppState>,
    auth: AuthUser,
    AppJson(payload): AppJson<DeleteAccountRequest>,
) -> Result<Json<DeleteAccountResponse>> {
    let db = state.db.clone();
    let pepper = state.config.password_pepper.clone();
    let user_id = auth.user_id.clone();
    let record = auth.record;

    let images = tokio::task::spawn_blocking(move || -> Result<Vec<String>> {
        if !verify_password(
            &payload.password,
            &record.password_salt,
            &pepper,
            &record.password_hash,
        ) {
            tracing::warn!("Account deletion with wrong password for user {}", user_id);
            return Err(AppError::InvalidCredentials);
        }

        users::delete_user(&db, &user_id)
    })
    .await??;

    // Image files are removed only once the records are gone
    let media_root = Path::new(&state.config.media_root);
    for image in &images {
        if let Err(e) = tokio::fs::remove_file(media_root.join(image)).await {
            tracing::warn!("Failed to remove image {}: {}", image, e);
        }
    }

    tracing::info!(
        "User {} and all associated data deleted ({} images)",
        auth.user_id,
        images.len()
    );

    Ok(Json(DeleteAccountResponse {
        success: true,
        message: "User and all associated data permanently deleted".to_string(),
    }))
}
