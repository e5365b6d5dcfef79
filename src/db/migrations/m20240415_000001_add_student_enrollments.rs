//! Enrollment history: one row per period of active membership in a class.
//! Multiple rows per student over time are the history, not a single state.

use async_trait::async_trait;
use sqlx::PgConnection;

use super::helpers::RunExec;
use super::Migration;

pub struct AddStudentEnrollments;

#[async_trait]
impl Migration for AddStudentEnrollments {
    fn id(&self) -> i64 {
        20240415000001
    }

    fn name(&self) -> &'static str {
        "add_student_enrollments"
    }

    async fn up(&self, conn: &mut PgConnection) -> anyhow::Result<()> {
        sqlx::raw_sql(
            r#"CREATE TABLE IF NOT EXISTS student_enrollments (
                id           UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                student_id   UUID NOT NULL REFERENCES students(id) ON DELETE CASCADE,
                class_id     UUID NOT NULL REFERENCES classes(id) ON DELETE CASCADE,
                enrolled_on  DATE NOT NULL DEFAULT CURRENT_DATE,
                withdrawn_on DATE,
                is_active    BOOLEAN NOT NULL DEFAULT TRUE,
                created_at   TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )"#,
        )
        .run(&mut *conn)
        .await?;

        sqlx::raw_sql(
            "CREATE INDEX IF NOT EXISTS idx_student_enrollments_student
             ON student_enrollments (student_id)",
        )
        .run(&mut *conn)
        .await?;
        Ok(())
    }

    async fn down(&self, conn: &mut PgConnection) -> anyhow::Result<()> {
        sqlx::raw_sql("DROP TABLE IF EXISTS student_enrollments")
            .run(&mut *conn)
            .await?;
        Ok(())
    }
}
