//! Reintroduces `schools` as a simple single-tenant profile table. The
//! dedicated unique index on `code` is the storage-level backstop for the
//! code generator: concurrent creations cannot both win.

use async_trait::async_trait;
use sqlx::PgConnection;

use super::helpers::RunExec;
use super::Migration;

pub struct AddSchoolProfile;

#[async_trait]
impl Migration for AddSchoolProfile {
    fn id(&self) -> i64 {
        20240506000001
    }

    fn name(&self) -> &'static str {
        "add_school_profile"
    }

    async fn up(&self, conn: &mut PgConnection) -> anyhow::Result<()> {
        sqlx::raw_sql(
            r#"CREATE TABLE IF NOT EXISTS schools (
                id                    UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                name                  VARCHAR(255) NOT NULL,
                code                  VARCHAR(32) NOT NULL,
                logo_url              TEXT,
                address               TEXT,
                phone                 VARCHAR(32),
                subscription_end_date TIMESTAMPTZ,
                is_active             BOOLEAN NOT NULL DEFAULT TRUE,
                created_at            TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at            TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )"#,
        )
        .run(&mut *conn)
        .await?;

        sqlx::raw_sql("CREATE UNIQUE INDEX IF NOT EXISTS idx_schools_code ON schools (code)")
            .run(&mut *conn)
            .await?;
        Ok(())
    }

    async fn down(&self, conn: &mut PgConnection) -> anyhow::Result<()> {
        sqlx::raw_sql("DROP INDEX IF EXISTS idx_schools_code")
            .run(&mut *conn)
            .await?;
        sqlx::raw_sql("DROP TABLE IF EXISTS schools")
            .run(&mut *conn)
            .await?;
        Ok(())
    }
}
