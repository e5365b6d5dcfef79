//! Adds a category label to subjects. Safe to re-run against a database
//! where the column already exists.

use async_trait::async_trait;
use sqlx::PgConnection;

use super::helpers::RunExec;
use super::Migration;

pub struct AddSubjectCategory;

#[async_trait]
impl Migration for AddSubjectCategory {
    fn id(&self) -> i64 {
        20240122000001
    }

    fn name(&self) -> &'static str {
        "add_subject_category"
    }

    async fn up(&self, conn: &mut PgConnection) -> anyhow::Result<()> {
        sqlx::raw_sql(
            "ALTER TABLE subjects
             ADD COLUMN IF NOT EXISTS category VARCHAR(32) NOT NULL DEFAULT 'core'",
        )
        .run(&mut *conn)
        .await?;
        Ok(())
    }

    async fn down(&self, conn: &mut PgConnection) -> anyhow::Result<()> {
        sqlx::raw_sql("ALTER TABLE subjects DROP COLUMN IF EXISTS category")
            .run(&mut *conn)
            .await?;
        Ok(())
    }
}
