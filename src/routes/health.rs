use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::db::tables;
use crate::AppState;

/// Health check endpoint
///
/// Reports whether the database can be read. Used by load balancers and
/// monitoring systems.
pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    let db = state.db.clone();
    let db_status = tokio::task::spawn_blocking(move || {
        match db
            .begin_read()
            .map_err(redb::Error::from)
            .and_then(|txn| {
                txn.open_table(tables::USERS)
                    .map(|_| ())
                    .map_err(redb::Error::from)
            })
        {
            Ok(_) => "connected",
            Err(e) => {
                tracing::error!("Database health check failed: {:?}", e);
                "disconnected"
            }
        }
    })
    .await
    .unwrap_or("error");

    Json(json!({
        "status": if db_status == "connected" { "healthy" } else { "unhealthy" },
        "database": db_status,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
