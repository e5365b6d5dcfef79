use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct School {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub logo_url: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub subscription_end_date: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateSchoolRequest {
    pub name: String,
    pub code: String,
    pub logo_url: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub subscription_end_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateSchoolRequest {
    pub name: Option<String>,
    pub logo_url: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub is_active: Option<bool>,
    pub subscription_end_date: Option<DateTime<Utc>>,
}

pub const INVALID_PHONE_MESSAGE: &str = "Contact number must be 9 to 15 digits";

/// A contact number is valid iff it is an optional leading `+` followed by
/// 9 to 15 digits.
pub fn is_valid_phone(s: &str) -> bool {
    let digits = s.strip_prefix('+').unwrap_or(s);
    (9..=15).contains(&digits.len()) && digits.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_international_and_local_numbers() {
        assert!(is_valid_phone("+263771234567"));
        assert!(is_valid_phone("0771234567"));
    }

    #[test]
    fn rejects_short_and_non_numeric_input() {
        assert!(!is_valid_phone("123"));
        assert!(!is_valid_phone("not-a-number"));
    }

    #[test]
    fn rejects_empty_and_plus_only() {
        assert!(!is_valid_phone(""));
        assert!(!is_valid_phone("+"));
    }

    #[test]
    fn rejects_more_than_fifteen_digits() {
        assert!(!is_valid_phone("+1234567890123456"));
        assert!(is_valid_phone("+123456789012345"));
    }
}
