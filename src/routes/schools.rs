use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    db::migrations::helpers::is_unique_violation,
    middleware::admin::AdminAuth,
    models::school::{
        is_valid_phone, CreateSchoolRequest, School, UpdateSchoolRequest, INVALID_PHONE_MESSAGE,
    },
    services::school_codes,
    AppState,
};

pub async fn list_schools(
    State(state): State<AppState>,
    _auth: AdminAuth,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    sqlx::query_as::<_, School>("SELECT * FROM schools ORDER BY name")
        .fetch_all(&state.db)
        .await
        .map(|items| Json(serde_json::to_value(items).unwrap()))
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
        })
}

pub async fn create_school(
    State(state): State<AppState>,
    _auth: AdminAuth,
    Json(body): Json<CreateSchoolRequest>,
) -> Result<(StatusCode, Json<Value>), (StatusCode, Json<Value>)> {
    if let Some(phone) = body.phone.as_deref() {
        if !is_valid_phone(phone) {
            return Err((
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": INVALID_PHONE_MESSAGE })),
            ));
        }
    }

    let code = school_codes::normalize_code(&body.code);
    if code.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "School code is required" })),
        ));
    }

    let school = sqlx::query_as::<_, School>(
        "INSERT INTO schools (name, code, logo_url, address, phone, subscription_end_date)
         VALUES ($1, $2, $3, $4, $5, $6)
         RETURNING *",
    )
    .bind(&body.name)
    .bind(&code)
    .bind(&body.logo_url)
    .bind(&body.address)
    .bind(&body.phone)
    .bind(body.subscription_end_date)
    .fetch_one(&state.db)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            (
                StatusCode::CONFLICT,
                Json(json!({ "error": format!("School code '{code}' is already in use") })),
            )
        } else {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
        }
    })?;

    Ok((StatusCode::CREATED, Json(serde_json::to_value(school).unwrap())))
}

pub async fn update_school(
    State(state): State<AppState>,
    _auth: AdminAuth,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateSchoolRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    if let Some(phone) = body.phone.as_deref() {
        if !is_valid_phone(phone) {
            return Err((
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": INVALID_PHONE_MESSAGE })),
            ));
        }
    }

    sqlx::query_as::<_, School>(
        "UPDATE schools SET
           name      = COALESCE($2, name),
           logo_url  = COALESCE($3, logo_url),
           address   = COALESCE($4, address),
           phone     = COALESCE($5, phone),
           is_active = COALESCE($6, is_active),
           subscription_end_date = COALESCE($7, subscription_end_date),
           updated_at = NOW()
         WHERE id = $1
         RETURNING *",
    )
    .bind(id)
    .bind(&body.name)
    .bind(&body.logo_url)
    .bind(&body.address)
    .bind(&body.phone)
    .bind(body.is_active)
    .bind(body.subscription_end_date)
    .fetch_optional(&state.db)
    .await
    .map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": e.to_string() })),
        )
    })?
    .map(|s| Json(serde_json::to_value(s).unwrap()))
    .ok_or((
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "School not found" })),
    ))
}

/// Candidate code for the create form. Uniqueness is only guaranteed by the
/// index on `schools.code` at insert time.
pub async fn generate_code(
    State(state): State<AppState>,
    _auth: AdminAuth,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    school_codes::generate_candidate_code(&state.db)
        .await
        .map(|code| Json(json!({ "code": code })))
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
        })
}

pub async fn get_profile(
    State(state): State<AppState>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    sqlx::query_as::<_, School>("SELECT * FROM schools ORDER BY created_at LIMIT 1")
        .fetch_optional(&state.db)
        .await
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
        })?
        .map(|s| Json(serde_json::to_value(s).unwrap()))
        .ok_or((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "No school profile configured" })),
        ))
}
