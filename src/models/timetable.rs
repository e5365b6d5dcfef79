use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct TimetableConfig {
    pub id: Uuid,
    pub periods_per_day: i16,
    pub day_start: NaiveTime,
    pub day_end: NaiveTime,
    pub break_periods: serde_json::Value,
    pub lessons_per_week: serde_json::Value,
    pub active_days: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct TimetableVersion {
    pub id: Uuid,
    pub name: String,
    pub is_active: bool,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct TimetableSlot {
    pub id: Uuid,
    pub version_id: Uuid,
    pub class_id: Uuid,
    pub subject_id: Uuid,
    pub teacher_id: Uuid,
    pub day_of_week: i16,
    pub period_number: i16,
    pub is_manually_edited: bool,
    pub edited_by: Option<Uuid>,
    pub edited_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct UpsertConfigRequest {
    pub periods_per_day: i16,
    pub day_start: NaiveTime,
    pub day_end: NaiveTime,
    pub break_periods: Option<serde_json::Value>,
    pub lessons_per_week: Option<serde_json::Value>,
    pub active_days: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct CreateVersionRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct AssignSlotRequest {
    pub class_id: Uuid,
    pub subject_id: Uuid,
    pub teacher_id: Uuid,
    pub day_of_week: i16,
    pub period_number: i16,
}

/// Manual override of a generated assignment; records who edited and when.
#[derive(Debug, Deserialize)]
pub struct EditSlotRequest {
    pub teacher_id: Option<Uuid>,
    pub subject_id: Option<Uuid>,
    pub edited_by: Uuid,
}
