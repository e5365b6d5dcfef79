//! Append-only history of students moving between classes (`internal`) or
//! leaving to another institution (`external`). Class references survive
//! class deletion as NULLs; the staff member who processed the transfer is
//! delete-restricted so the audit trail keeps a valid reference.

use async_trait::async_trait;
use sqlx::PgConnection;

use super::helpers::RunExec;
use super::Migration;

pub struct AddStudentTransfers;

#[async_trait]
impl Migration for AddStudentTransfers {
    fn id(&self) -> i64 {
        20240402000001
    }

    fn name(&self) -> &'static str {
        "add_student_transfers"
    }

    async fn up(&self, conn: &mut PgConnection) -> anyhow::Result<()> {
        sqlx::raw_sql(
            r#"CREATE TABLE IF NOT EXISTS student_transfers (
                id                 UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                student_id         UUID NOT NULL REFERENCES students(id) ON DELETE CASCADE,
                transfer_type      VARCHAR(16) NOT NULL
                    CHECK (transfer_type IN ('internal', 'external')),
                previous_class_id  UUID REFERENCES classes(id) ON DELETE SET NULL,
                new_class_id       UUID REFERENCES classes(id) ON DELETE SET NULL,
                destination_school VARCHAR(255),
                reason             TEXT,
                processed_by       UUID NOT NULL REFERENCES users(id) ON DELETE RESTRICT,
                transferred_at     TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )"#,
        )
        .run(&mut *conn)
        .await?;

        sqlx::raw_sql(
            "CREATE INDEX IF NOT EXISTS idx_student_transfers_student
             ON student_transfers (student_id)",
        )
        .run(&mut *conn)
        .await?;
        Ok(())
    }

    async fn down(&self, conn: &mut PgConnection) -> anyhow::Result<()> {
        sqlx::raw_sql("DROP TABLE IF EXISTS student_transfers")
            .run(&mut *conn)
            .await?;
        Ok(())
    }
}
