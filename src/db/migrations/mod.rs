//! The schema migration ledger: an ordered registry of transform steps, each
//! identified by a monotonic timestamp-style id, applied in ascending order by
//! the runner and tracked durably in the `_schema_migrations` table.

pub mod helpers;
pub mod runner;

pub mod m20240108_000001_initial_schema;
pub mod m20240115_000001_add_teacher_classes;
pub mod m20240122_000001_add_subject_category;
pub mod m20240203_000001_round_test_scores_to_integer;
pub mod m20240214_000001_add_multitenancy;
pub mod m20240302_000001_add_settings_module_access;
pub mod m20240310_000001_require_record_book_subject;
pub mod m20240318_000001_add_school_motto;
pub mod m20240402_000001_add_student_transfers;
pub mod m20240415_000001_add_student_enrollments;
pub mod m20240503_000001_remove_multitenancy;
pub mod m20240506_000001_add_school_profile;
pub mod m20240601_000001_create_timetable_tables;

use async_trait::async_trait;
use sqlx::PgConnection;

/// One step of the ledger. `up` and `down` run inside the transaction the
/// runner opens for the step; failure aborts that transaction and stops the
/// whole ledger application for the operator to intervene.
#[async_trait]
pub trait Migration: Send + Sync {
    fn id(&self) -> i64;
    fn name(&self) -> &'static str;

    /// Steps that destroy information they cannot restore return `false`;
    /// the runner then refuses to invoke `down` at all.
    fn reversible(&self) -> bool {
        true
    }

    async fn up(&self, conn: &mut PgConnection) -> anyhow::Result<()>;
    async fn down(&self, conn: &mut PgConnection) -> anyhow::Result<()>;
}

#[derive(Debug, thiserror::Error)]
pub enum MigrateError {
    #[error("migration {id} ({name}) is irreversible and cannot be reverted")]
    Irreversible { id: i64, name: &'static str },

    #[error(
        "migration ledger is out of order: step {unapplied} is pending but later step {applied} is recorded as applied"
    )]
    OutOfOrder { unapplied: i64, applied: i64 },

    #[error("migration ledger records unknown step id {id}")]
    UnknownApplied { id: i64 },
}

/// Every step, ascending by id. New steps are appended here.
pub fn registry() -> Vec<Box<dyn Migration>> {
    vec![
        Box::new(m20240108_000001_initial_schema::InitialSchema),
        Box::new(m20240115_000001_add_teacher_classes::AddTeacherClasses),
        Box::new(m20240122_000001_add_subject_category::AddSubjectCategory),
        Box::new(m20240203_000001_round_test_scores_to_integer::RoundTestScoresToInteger),
        Box::new(m20240214_000001_add_multitenancy::AddMultitenancy),
        Box::new(m20240302_000001_add_settings_module_access::AddSettingsModuleAccess),
        Box::new(m20240310_000001_require_record_book_subject::RequireRecordBookSubject),
        Box::new(m20240318_000001_add_school_motto::AddSchoolMotto),
        Box::new(m20240402_000001_add_student_transfers::AddStudentTransfers),
        Box::new(m20240415_000001_add_student_enrollments::AddStudentEnrollments),
        Box::new(m20240503_000001_remove_multitenancy::RemoveMultitenancy),
        Box::new(m20240506_000001_add_school_profile::AddSchoolProfile),
        Box::new(m20240601_000001_create_timetable_tables::CreateTimetableTables),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_ids_are_strictly_increasing() {
        let steps = registry();
        for pair in steps.windows(2) {
            assert!(
                pair[0].id() < pair[1].id(),
                "{} must come before {}",
                pair[0].id(),
                pair[1].id()
            );
        }
    }

    #[test]
    fn registry_names_are_unique() {
        let steps = registry();
        let mut names: Vec<_> = steps.iter().map(|s| s.name()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), steps.len());
    }

    #[test]
    fn multitenancy_removal_is_flagged_irreversible() {
        let steps = registry();
        let removal = steps
            .iter()
            .find(|s| s.name() == "remove_multitenancy")
            .unwrap();
        assert!(!removal.reversible());
        // Every other step can be reverted.
        assert!(steps
            .iter()
            .filter(|s| s.name() != "remove_multitenancy")
            .all(|s| s.reversible()));
    }
}
