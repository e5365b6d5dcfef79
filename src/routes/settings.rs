use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};
use sqlx::PgPool;

use crate::{
    middleware::admin::AdminAuth,
    models::settings::{ModuleAccess, Settings, UpdateSettingsRequest},
    AppState,
};

/// Exactly one settings row should exist; that is application logic, not a
/// database constraint, so every read goes through get-or-create.
async fn get_or_create(pool: &PgPool) -> sqlx::Result<Settings> {
    if let Some(settings) = sqlx::query_as::<_, Settings>("SELECT * FROM settings LIMIT 1")
        .fetch_optional(pool)
        .await?
    {
        return Ok(settings);
    }
    let defaults = serde_json::to_value(ModuleAccess::default_access())
        .expect("default module access serializes");
    sqlx::query_as::<_, Settings>(
        "INSERT INTO settings (module_access) VALUES ($1) RETURNING *",
    )
    .bind(defaults)
    .fetch_one(pool)
    .await
}

/// GET /settings
pub async fn get_settings(
    State(state): State<AppState>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    get_or_create(&state.db)
        .await
        .map(|s| Json(serde_json::to_value(s).unwrap()))
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
        })
}

/// PUT /settings — admin only
pub async fn update_settings(
    State(state): State<AppState>,
    _auth: AdminAuth,
    Json(body): Json<UpdateSettingsRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let current = get_or_create(&state.db).await.map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": e.to_string() })),
        )
    })?;

    sqlx::query_as::<_, Settings>(
        "UPDATE settings SET
           currency       = COALESCE($2, currency),
           invoice_prefix = COALESCE($3, invoice_prefix),
           motto          = COALESCE($4, motto),
           updated_at     = NOW()
         WHERE id = $1
         RETURNING *",
    )
    .bind(current.id)
    .bind(&body.currency)
    .bind(&body.invoice_prefix)
    .bind(&body.motto)
    .fetch_one(&state.db)
    .await
    .map(|s| Json(serde_json::to_value(s).unwrap()))
    .map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": e.to_string() })),
        )
    })
}

/// PUT /settings/module-access — admin only. The role and feature key sets
/// are closed; a typoed key is a 400, not a silent write.
pub async fn update_module_access(
    State(state): State<AppState>,
    _auth: AdminAuth,
    Json(body): Json<ModuleAccess>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    if let Err(reason) = body.validate() {
        return Err((StatusCode::BAD_REQUEST, Json(json!({ "error": reason }))));
    }

    let current = get_or_create(&state.db).await.map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": e.to_string() })),
        )
    })?;

    let document = serde_json::to_value(&body).unwrap();
    sqlx::query_as::<_, Settings>(
        "UPDATE settings SET module_access = $2, updated_at = NOW()
         WHERE id = $1
         RETURNING *",
    )
    .bind(current.id)
    .bind(document)
    .fetch_one(&state.db)
    .await
    .map(|s| Json(serde_json::to_value(s).unwrap()))
    .map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": e.to_string() })),
        )
    })
}
