use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Settings {
    pub id: Uuid,
    pub currency: String,
    pub invoice_prefix: String,
    pub motto: Option<String>,
    pub module_access: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Role names the module-access document may key on.
pub const ROLES: &[&str] = &["teachers", "parents", "accountant", "admin", "demo_user"];

/// Feature names a role entry may key on.
pub const FEATURES: &[&str] = &[
    "dashboard",
    "students",
    "teachers",
    "classes",
    "subjects",
    "exams",
    "marks",
    "invoices",
    "attendance",
    "record_books",
    "messages",
    "reports",
    "timetable",
    "settings",
];

/// Nested permission document persisted as JSONB on settings: role name to
/// feature name to boolean. Key sets are closed and checked at the boundary
/// so a typoed key is rejected instead of silently accepted; absent entries
/// mean "no access" to consumers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModuleAccess(pub BTreeMap<String, BTreeMap<String, bool>>);

impl ModuleAccess {
    pub fn validate(&self) -> Result<(), String> {
        for (role, features) in &self.0 {
            if !ROLES.contains(&role.as_str()) {
                return Err(format!("Unknown role: {role}"));
            }
            for feature in features.keys() {
                if !FEATURES.contains(&feature.as_str()) {
                    return Err(format!("Unknown feature: {feature}"));
                }
            }
        }
        Ok(())
    }

    pub fn allows(&self, role: &str, feature: &str) -> bool {
        self.0
            .get(role)
            .and_then(|features| features.get(feature))
            .copied()
            .unwrap_or(false)
    }

    /// The document new deployments start from: admins see everything,
    /// teaching staff their day-to-day modules, parents and demo accounts a
    /// read-only slice.
    pub fn default_access() -> Self {
        let mut doc = BTreeMap::new();
        doc.insert(
            "admin".to_string(),
            FEATURES.iter().map(|f| (f.to_string(), true)).collect(),
        );
        doc.insert(
            "teachers".to_string(),
            [
                "dashboard",
                "students",
                "classes",
                "subjects",
                "exams",
                "marks",
                "attendance",
                "record_books",
                "messages",
                "timetable",
            ]
            .iter()
            .map(|f| (f.to_string(), true))
            .collect(),
        );
        doc.insert(
            "parents".to_string(),
            ["dashboard", "invoices", "messages", "reports"]
                .iter()
                .map(|f| (f.to_string(), true))
                .collect(),
        );
        doc.insert(
            "accountant".to_string(),
            ["dashboard", "invoices", "reports"]
                .iter()
                .map(|f| (f.to_string(), true))
                .collect(),
        );
        doc.insert(
            "demo_user".to_string(),
            [("dashboard".to_string(), true)].into_iter().collect(),
        );
        ModuleAccess(doc)
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateSettingsRequest {
    pub currency: Option<String>,
    pub invoice_prefix: Option<String>,
    pub motto: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_access_passes_validation() {
        ModuleAccess::default_access().validate().unwrap();
    }

    #[test]
    fn unknown_role_is_rejected() {
        let mut doc = ModuleAccess::default();
        doc.0
            .insert("janitor".into(), BTreeMap::from([("dashboard".into(), true)]));
        assert!(doc.validate().unwrap_err().contains("janitor"));
    }

    #[test]
    fn unknown_feature_is_rejected() {
        let mut doc = ModuleAccess::default();
        doc.0
            .insert("admin".into(), BTreeMap::from([("payrol".into(), true)]));
        assert!(doc.validate().unwrap_err().contains("payrol"));
    }

    #[test]
    fn absent_entries_mean_no_access() {
        let doc = ModuleAccess::default_access();
        assert!(doc.allows("admin", "invoices"));
        assert!(!doc.allows("demo_user", "invoices"));
        assert!(!doc.allows("parents", "marks"));
        // Role missing from the document entirely.
        assert!(!ModuleAccess::default().allows("admin", "dashboard"));
    }
}
