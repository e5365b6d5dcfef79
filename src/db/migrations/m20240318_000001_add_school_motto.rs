//! School motto string on settings. Safe to re-run.

use async_trait::async_trait;
use sqlx::PgConnection;

use super::helpers::RunExec;
use super::Migration;

pub struct AddSchoolMotto;

#[async_trait]
impl Migration for AddSchoolMotto {
    fn id(&self) -> i64 {
        20240318000001
    }

    fn name(&self) -> &'static str {
        "add_school_motto"
    }

    async fn up(&self, conn: &mut PgConnection) -> anyhow::Result<()> {
        sqlx::raw_sql("ALTER TABLE settings ADD COLUMN IF NOT EXISTS motto VARCHAR(255)")
            .run(&mut *conn)
            .await?;
        Ok(())
    }

    async fn down(&self, conn: &mut PgConnection) -> anyhow::Result<()> {
        sqlx::raw_sql("ALTER TABLE settings DROP COLUMN IF EXISTS motto")
            .run(&mut *conn)
            .await?;
        Ok(())
    }
}
