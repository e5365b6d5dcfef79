//! Adds the per-role module access document to settings and backfills
//! existing rows with the default role → feature map.

use async_trait::async_trait;
use sqlx::PgConnection;

use crate::models::settings::ModuleAccess;

use super::helpers::RunExec;
use super::Migration;

pub struct AddSettingsModuleAccess;

#[async_trait]
impl Migration for AddSettingsModuleAccess {
    fn id(&self) -> i64 {
        20240302000001
    }

    fn name(&self) -> &'static str {
        "add_settings_module_access"
    }

    async fn up(&self, conn: &mut PgConnection) -> anyhow::Result<()> {
        sqlx::raw_sql(
            "ALTER TABLE settings
             ADD COLUMN IF NOT EXISTS module_access JSONB NOT NULL DEFAULT '{}'::jsonb",
        )
        .run(&mut *conn)
        .await?;

        let defaults = serde_json::to_value(ModuleAccess::default_access())?;
        sqlx::query("UPDATE settings SET module_access = $1 WHERE module_access = '{}'::jsonb")
            .bind(defaults)
            .run(&mut *conn)
            .await?;
        Ok(())
    }

    async fn down(&self, conn: &mut PgConnection) -> anyhow::Result<()> {
        sqlx::raw_sql("ALTER TABLE settings DROP COLUMN IF EXISTS module_access")
            .run(&mut *conn)
            .await?;
        Ok(())
    }
}
