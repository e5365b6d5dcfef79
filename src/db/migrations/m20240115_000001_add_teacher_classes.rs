//! Junction between teachers and the classes they take; a given
//! (teacher, class) pair may appear at most once.

use async_trait::async_trait;
use sqlx::PgConnection;

use super::helpers::RunExec;
use super::Migration;

pub struct AddTeacherClasses;

#[async_trait]
impl Migration for AddTeacherClasses {
    fn id(&self) -> i64 {
        20240115000001
    }

    fn name(&self) -> &'static str {
        "add_teacher_classes"
    }

    async fn up(&self, conn: &mut PgConnection) -> anyhow::Result<()> {
        sqlx::raw_sql(
            r#"CREATE TABLE IF NOT EXISTS teacher_classes (
                teacher_id  UUID NOT NULL REFERENCES teachers(id) ON DELETE CASCADE,
                class_id    UUID NOT NULL REFERENCES classes(id) ON DELETE CASCADE,
                assigned_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                PRIMARY KEY (teacher_id, class_id)
            )"#,
        )
        .run(&mut *conn)
        .await?;
        Ok(())
    }

    async fn down(&self, conn: &mut PgConnection) -> anyhow::Result<()> {
        sqlx::raw_sql("DROP TABLE IF EXISTS teacher_classes")
            .run(&mut *conn)
            .await?;
        Ok(())
    }
}
