pub mod admin;
pub mod analysis;
pub mod auth;
pub mod health;
pub mod profile;
pub mod summary;
pub mod validation;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::services::ServeDir;

use crate::constants::{MAX_IMAGE_SIZE_BYTES, MEDIA_URL_PREFIX};
use crate::AppState;

pub use admin::admin_stats;
pub use analysis::{create_analysis, get_analysis, list_analyses};
pub use auth::{login, refresh_token, register};
pub use health::health_check;
pub use profile::{delete_account, get_profile, update_profile};
pub use summary::{summary_history, weekly_summary};
pub use validation::{timestamp_to_rfc3339, AppJson, AuthUser};

/// Multipart framing allowance on top of the image itself
const UPLOAD_OVERHEAD_BYTES: usize = 64 * 1024;

/// Build the application router with every endpoint and the media file service
pub fn router(state: AppState) -> Router {
    let media = ServeDir::new(&state.config.media_root);

    Router::new()
        .route("/health", get(health_check))
        // Authentication
        .route("/api/auth/register/", post(register))
        .route("/api/auth/login/", post(login))
        .route("/api/auth/token/refresh/", post(refresh_token))
        // User profile
        .route(
            "/api/user/profile/",
            get(get_profile)
                .put(update_profile)
                .patch(update_profile)
                .delete(delete_account),
        )
        // Facial analysis
        .route(
            "/api/analysis/",
            post(create_analysis)
                .layer(DefaultBodyLimit::max(MAX_IMAGE_SIZE_BYTES + UPLOAD_OVERHEAD_BYTES)),
        )
        .route("/api/analysis/list/", get(list_analyses))
        .route("/api/analysis/{id}/", get(get_analysis))
        // Weekly summary
        .route("/api/summary/weekly/", get(weekly_summary))
        .route("/api/summary/history/", get(summary_history))
        // Admin
        .route("/admin/stats", get(admin_stats))
        .nest_service(MEDIA_URL_PREFIX, media)
        .with_state(state)
}
