use axum::{extract::State, Json};
use chrono::Utc;

use crate::analysis::summarize;
use crate::db::summaries;
use crate::error::Result;
use crate::models::{WeekWindow, WeeklySummary};
use crate::routes::validation::AuthUser;
use crate::AppState;

/// Summary of the current week (Monday to Sunday, UTC)
///
/// Recomputed from the week's analyses on every request and stored,
/// replacing any earlier summary of the same week.
pub async fn weekly_summary(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<WeeklySummary>> {
    let now = Utc::now();
    let window = WeekWindow::containing(now.date_naive());

    let db = state.db.clone();
    let user_id = auth.user_id.clone();
    let record = tokio::task::spawn_blocking(move || {
        summaries::refresh_weekly_summary(&db, &user_id, window, now.timestamp(), summarize)
    })
    .await??;

    tracing::info!(
        "Weekly summary for user {} ({} to {}): {} analyses",
        auth.user_id,
        window.start,
        window.end,
        record.total_analyses
    );

    Ok(Json(WeeklySummary::from_record(record, &auth.record.email)))
}

/// All stored weekly summaries of the current user, most recent week first
pub async fn summary_history(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<WeeklySummary>>> {
    let db = state.db.clone();
    let user_id = auth.user_id.clone();
    let records = tokio::task::spawn_blocking(move || summaries::history(&db, &user_id)).await??;

    Ok(Json(
        records
            .into_iter()
            .map(|r| WeeklySummary::from_record(r, &auth.record.email))
            .collect(),
    ))
}
