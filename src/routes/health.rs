use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};

use crate::AppState;

/// Liveness plus a database ping; also reports how far the migration ledger
/// has advanced, which is the first thing to check on a misbehaving deploy.
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let applied: Result<i64, _> = sqlx::query_scalar("SELECT COUNT(*) FROM _schema_migrations")
        .fetch_one(&state.db)
        .await;
    match applied {
        Ok(n) => (
            StatusCode::OK,
            Json(json!({ "status": "ok", "db": "connected", "migrations_applied": n })),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "error", "db": e.to_string() })),
        ),
    }
}
