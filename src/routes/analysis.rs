use axum::{
    body::Bytes,
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use std::path::PathBuf;

use crate::constants::*;
use crate::db::analyses;
use crate::error::{AppError, Result};
use crate::models::{Analysis, AnalysisRecord};
use crate::routes::validation::AuthUser;
use crate::AppState;

/// Accepted image file extensions
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "bmp", "heic"];

struct ImageUpload {
    bytes: Bytes,
    extension: String,
}

/// Pick the stored file extension from the client file name, falling back to
/// the content type
fn image_extension(file_name: Option<&str>, content_type: &str) -> String {
    let from_name = file_name
        .and_then(|name| std::path::Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .filter(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()));

    if let Some(ext) = from_name {
        return ext;
    }

    match content_type.strip_prefix("image/") {
        Some("jpeg") | Some("pjpeg") => "jpg".to_string(),
        Some(subtype) if IMAGE_EXTENSIONS.contains(&subtype) => subtype.to_string(),
        _ => "jpg".to_string(),
    }
}

/// Pull the `image` field out of a multipart body
async fn read_image_field(multipart: &mut Multipart) -> Result<ImageUpload> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("image") {
            continue;
        }

        let content_type = field.content_type().unwrap_or_default().to_string();
        if !content_type.starts_with("image/") {
            tracing::warn!("Rejected upload with content type {:?}", content_type);
            return Err(AppError::InvalidInput(ERR_NOT_AN_IMAGE.to_string()));
        }

        let extension = image_extension(field.file_name(), &content_type);
        let bytes = field.bytes().await?;

        if bytes.is_empty() {
            return Err(AppError::InvalidInput(ERR_NOT_AN_IMAGE.to_string()));
        }
        if bytes.len() > MAX_IMAGE_SIZE_BYTES {
            return Err(AppError::PayloadTooLarge);
        }

        return Ok(ImageUpload { bytes, extension });
    }

    Err(AppError::InvalidInput(ERR_MISSING_IMAGE.to_string()))
}

async fn discard_image(path: &std::path::Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        tracing::warn!("Failed to remove image {}: {}", path.display(), e);
    }
}

/// Upload a face image and analyze it
///
/// The image is written under the media root, handed to the configured
/// analyzer, and stored together with its result. If the analyzer fails, the
/// image is removed and nothing is recorded.
pub async fn create_analysis(
    State(state): State<AppState>,
    auth: AuthUser,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<Analysis>)> {
    let upload = read_image_field(&mut multipart).await?;

    if upload.bytes.len() > WARN_IMAGE_SIZE_BYTES {
        tracing::info!(
            "Large image from user {}: {} bytes",
            auth.user_id,
            upload.bytes.len()
        );
    }

    let analysis_id = uuid::Uuid::new_v4().to_string();
    let relative_path = format!("{}/{}.{}", FACIAL_IMAGES_DIR, analysis_id, upload.extension);
    let media_root = PathBuf::from(&state.config.media_root);
    let image_path = media_root.join(&relative_path);

    tokio::fs::create_dir_all(media_root.join(FACIAL_IMAGES_DIR)).await?;
    tokio::fs::write(&image_path, &upload.bytes).await?;

    let analyzer = state.analyzer.clone();
    let analyze_path = image_path.clone();
    let outcome = tokio::task::spawn_blocking(move || analyzer.analyze(&analyze_path))
        .await
        .map_err(|join_err| join_err.to_string())
        .and_then(|analyzed| analyzed);

    let result = match outcome {
        Ok(result) => result,
        Err(reason) => {
            discard_image(&image_path).await;
            return Err(AppError::AnalysisFailed(reason));
        }
    };

    let record = AnalysisRecord {
        id: analysis_id,
        owner_id: auth.user_id.clone(),
        image: relative_path,
        result: Some(result),
        created_at: Utc::now().timestamp(),
    };

    let db = state.db.clone();
    let to_store = record.clone();
    let stored = tokio::task::spawn_blocking(move || analyses::insert_analysis(&db, &to_store))
        .await
        .map_err(AppError::from)
        .and_then(|inserted| inserted);
    if let Err(e) = stored {
        discard_image(&image_path).await;
        return Err(e);
    }

    tracing::info!(
        "Analysis {} stored for user {} ({} bytes)",
        record.id,
        auth.user_id,
        upload.bytes.len()
    );

    Ok((
        StatusCode::CREATED,
        Json(Analysis::from_record(record, &auth.record.email)),
    ))
}

/// List the current user's analyses, newest first
pub async fn list_analyses(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<Analysis>>> {
    let db = state.db.clone();
    let user_id = auth.user_id.clone();
    let records =
        tokio::task::spawn_blocking(move || analyses::list_for_user(&db, &user_id)).await??;

    Ok(Json(
        records
            .into_iter()
            .map(|r| Analysis::from_record(r, &auth.record.email))
            .collect(),
    ))
}

/// Retrieve one of the current user's analyses
///
/// Analyses owned by other users are reported as not found.
pub async fn get_analysis(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(analysis_id): Path<String>,
) -> Result<Json<Analysis>> {
    let db = state.db.clone();
    let user_id = auth.user_id.clone();
    let record = tokio::task::spawn_blocking(move || {
        analyses::get_for_user(&db, &user_id, &analysis_id)
    })
    .await??;

    Ok(Json(Analysis::from_record(record, &auth.record.email)))
}
