//! Timetable storage surface. Slot generation itself is an external concern;
//! these handlers only manage versions and individual slot assignments, and
//! the two composite uniques on `timetable_slots` decide conflicts.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    middleware::admin::AdminAuth,
    models::timetable::{
        AssignSlotRequest, CreateVersionRequest, EditSlotRequest, TimetableConfig, TimetableSlot,
        TimetableVersion, UpsertConfigRequest,
    },
    AppState,
};

fn internal_error(e: sqlx::Error) -> (StatusCode, Json<Value>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": e.to_string() })),
    )
}

/// Maps a slot-write failure to 409 when one of the two conflict constraints
/// rejected it, naming the double-booked party.
fn slot_conflict_error(e: sqlx::Error) -> (StatusCode, Json<Value>) {
    if let sqlx::Error::Database(db) = &e {
        match db.constraint() {
            Some("uq_slot_teacher_period") => {
                return (
                    StatusCode::CONFLICT,
                    Json(json!({ "error": "Teacher is already booked for this period" })),
                );
            }
            Some("uq_slot_class_period") => {
                return (
                    StatusCode::CONFLICT,
                    Json(json!({ "error": "Class is already booked for this period" })),
                );
            }
            _ => {}
        }
    }
    internal_error(e)
}

// ─── Config ───────────────────────────────────────────────────────────────────

pub async fn get_config(
    State(state): State<AppState>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    sqlx::query_as::<_, TimetableConfig>("SELECT * FROM timetable_configs LIMIT 1")
        .fetch_optional(&state.db)
        .await
        .map_err(internal_error)?
        .map(|c| Json(serde_json::to_value(c).unwrap()))
        .ok_or((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Timetable is not configured" })),
        ))
}

pub async fn upsert_config(
    State(state): State<AppState>,
    _auth: AdminAuth,
    Json(body): Json<UpsertConfigRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let existing: Option<Uuid> = sqlx::query_scalar("SELECT id FROM timetable_configs LIMIT 1")
        .fetch_optional(&state.db)
        .await
        .map_err(internal_error)?;

    let config = match existing {
        Some(id) => sqlx::query_as::<_, TimetableConfig>(
            "UPDATE timetable_configs SET
               periods_per_day  = $2,
               day_start        = $3,
               day_end          = $4,
               break_periods    = COALESCE($5, break_periods),
               lessons_per_week = COALESCE($6, lessons_per_week),
               active_days      = COALESCE($7, active_days),
               updated_at       = NOW()
             WHERE id = $1
             RETURNING *",
        )
        .bind(id)
        .bind(body.periods_per_day)
        .bind(body.day_start)
        .bind(body.day_end)
        .bind(&body.break_periods)
        .bind(&body.lessons_per_week)
        .bind(&body.active_days)
        .fetch_one(&state.db)
        .await,
        None => sqlx::query_as::<_, TimetableConfig>(
            "INSERT INTO timetable_configs
               (periods_per_day, day_start, day_end, break_periods, lessons_per_week, active_days)
             VALUES ($1, $2, $3,
                     COALESCE($4, '[]'::jsonb),
                     COALESCE($5, '{}'::jsonb),
                     COALESCE($6, '[1,2,3,4,5]'::jsonb))
             RETURNING *",
        )
        .bind(body.periods_per_day)
        .bind(body.day_start)
        .bind(body.day_end)
        .bind(&body.break_periods)
        .bind(&body.lessons_per_week)
        .bind(&body.active_days)
        .fetch_one(&state.db)
        .await,
    }
    .map_err(internal_error)?;

    Ok(Json(serde_json::to_value(config).unwrap()))
}

// ─── Versions ─────────────────────────────────────────────────────────────────

pub async fn list_versions(
    State(state): State<AppState>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    sqlx::query_as::<_, TimetableVersion>(
        "SELECT * FROM timetable_versions ORDER BY created_at DESC",
    )
    .fetch_all(&state.db)
    .await
    .map(|items| Json(serde_json::to_value(items).unwrap()))
    .map_err(internal_error)
}

pub async fn create_version(
    State(state): State<AppState>,
    _auth: AdminAuth,
    Json(body): Json<CreateVersionRequest>,
) -> Result<(StatusCode, Json<Value>), (StatusCode, Json<Value>)> {
    let version = sqlx::query_as::<_, TimetableVersion>(
        "INSERT INTO timetable_versions (name) VALUES ($1) RETURNING *",
    )
    .bind(&body.name)
    .fetch_one(&state.db)
    .await
    .map_err(internal_error)?;

    Ok((StatusCode::CREATED, Json(serde_json::to_value(version).unwrap())))
}

/// At most one version is active; flipping happens in one transaction.
pub async fn activate_version(
    State(state): State<AppState>,
    _auth: AdminAuth,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let mut tx = state.db.begin().await.map_err(internal_error)?;

    sqlx::query("UPDATE timetable_versions SET is_active = FALSE, updated_at = NOW() WHERE is_active")
        .execute(&mut *tx)
        .await
        .map_err(internal_error)?;

    let version = sqlx::query_as::<_, TimetableVersion>(
        "UPDATE timetable_versions SET is_active = TRUE, updated_at = NOW()
         WHERE id = $1
         RETURNING *",
    )
    .bind(id)
    .fetch_optional(&mut *tx)
    .await
    .map_err(internal_error)?
    .ok_or((
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "Timetable version not found" })),
    ))?;

    tx.commit().await.map_err(internal_error)?;
    Ok(Json(serde_json::to_value(version).unwrap()))
}

/// At most one version is published, same convention as active.
pub async fn publish_version(
    State(state): State<AppState>,
    _auth: AdminAuth,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let mut tx = state.db.begin().await.map_err(internal_error)?;

    sqlx::query(
        "UPDATE timetable_versions SET is_published = FALSE, updated_at = NOW() WHERE is_published",
    )
    .execute(&mut *tx)
    .await
    .map_err(internal_error)?;

    let version = sqlx::query_as::<_, TimetableVersion>(
        "UPDATE timetable_versions SET is_published = TRUE, updated_at = NOW()
         WHERE id = $1
         RETURNING *",
    )
    .bind(id)
    .fetch_optional(&mut *tx)
    .await
    .map_err(internal_error)?
    .ok_or((
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "Timetable version not found" })),
    ))?;

    tx.commit().await.map_err(internal_error)?;
    Ok(Json(serde_json::to_value(version).unwrap()))
}

// ─── Slots ────────────────────────────────────────────────────────────────────

pub async fn list_slots(
    State(state): State<AppState>,
    Path(version_id): Path<Uuid>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    sqlx::query_as::<_, TimetableSlot>(
        "SELECT * FROM timetable_slots
         WHERE version_id = $1
         ORDER BY day_of_week, period_number",
    )
    .bind(version_id)
    .fetch_all(&state.db)
    .await
    .map(|items| Json(serde_json::to_value(items).unwrap()))
    .map_err(internal_error)
}

pub async fn assign_slot(
    State(state): State<AppState>,
    _auth: AdminAuth,
    Path(version_id): Path<Uuid>,
    Json(body): Json<AssignSlotRequest>,
) -> Result<(StatusCode, Json<Value>), (StatusCode, Json<Value>)> {
    let slot = sqlx::query_as::<_, TimetableSlot>(
        "INSERT INTO timetable_slots
           (version_id, class_id, subject_id, teacher_id, day_of_week, period_number)
         VALUES ($1, $2, $3, $4, $5, $6)
         RETURNING *",
    )
    .bind(version_id)
    .bind(body.class_id)
    .bind(body.subject_id)
    .bind(body.teacher_id)
    .bind(body.day_of_week)
    .bind(body.period_number)
    .fetch_one(&state.db)
    .await
    .map_err(slot_conflict_error)?;

    Ok((StatusCode::CREATED, Json(serde_json::to_value(slot).unwrap())))
}

/// Human override of a generated assignment: records editor and timestamp.
pub async fn edit_slot(
    State(state): State<AppState>,
    _auth: AdminAuth,
    Path(id): Path<Uuid>,
    Json(body): Json<EditSlotRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    sqlx::query_as::<_, TimetableSlot>(
        "UPDATE timetable_slots SET
           teacher_id         = COALESCE($2, teacher_id),
           subject_id         = COALESCE($3, subject_id),
           is_manually_edited = TRUE,
           edited_by          = $4,
           edited_at          = NOW()
         WHERE id = $1
         RETURNING *",
    )
    .bind(id)
    .bind(body.teacher_id)
    .bind(body.subject_id)
    .bind(body.edited_by)
    .fetch_optional(&state.db)
    .await
    .map_err(slot_conflict_error)?
    .map(|s| Json(serde_json::to_value(s).unwrap()))
    .ok_or((
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "Timetable slot not found" })),
    ))
}
