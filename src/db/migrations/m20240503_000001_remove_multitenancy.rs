//! Returns the database to a single-tenant model: drops every `school_id`
//! column with its constraints and indexes, restores the global uniques, and
//! removes the `schools` registry.
//!
//! Irreversible: the tenant assignments destroyed here cannot be restored,
//! so `reversible()` is false and `down` fails unconditionally.
//!
//! Column drops are best-effort; a column already gone (SQLSTATE 42703, e.g.
//! from an earlier partial run) is skipped via a savepoint so the enclosing
//! transaction stays usable.

use async_trait::async_trait;
use sqlx::PgConnection;

use super::helpers::{constraint_exists, is_undefined_column};
use super::m20240214_000001_add_multitenancy::TENANT_TABLES;
use super::helpers::RunExec;
use super::Migration;

pub struct RemoveMultitenancy;

async fn drop_school_id_column(conn: &mut PgConnection, table: &str) -> anyhow::Result<()> {
    sqlx::raw_sql("SAVEPOINT drop_school_id")
        .run(&mut *conn)
        .await?;
    match sqlx::raw_sql(&format!("ALTER TABLE {table} DROP COLUMN school_id"))
        .run(&mut *conn)
        .await
    {
        Ok(_) => {
            sqlx::raw_sql("RELEASE SAVEPOINT drop_school_id")
                .run(&mut *conn)
                .await?;
        }
        Err(e) if is_undefined_column(&e) => {
            sqlx::raw_sql("ROLLBACK TO SAVEPOINT drop_school_id")
                .run(&mut *conn)
                .await?;
            tracing::warn!("school_id already dropped on {}, skipping", table);
        }
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

#[async_trait]
impl Migration for RemoveMultitenancy {
    fn id(&self) -> i64 {
        20240503000001
    }

    fn name(&self) -> &'static str {
        "remove_multitenancy"
    }

    fn reversible(&self) -> bool {
        false
    }

    async fn up(&self, conn: &mut PgConnection) -> anyhow::Result<()> {
        // Per-tenant uniques go first; they reference school_id.
        sqlx::raw_sql("ALTER TABLE users DROP CONSTRAINT IF EXISTS uq_users_email_school")
            .run(&mut *conn)
            .await?;
        sqlx::raw_sql(
            "ALTER TABLE students DROP CONSTRAINT IF EXISTS uq_students_student_number_school",
        )
        .run(&mut *conn)
        .await?;

        for table in TENANT_TABLES {
            sqlx::raw_sql(&format!(
                "ALTER TABLE {table} DROP CONSTRAINT IF EXISTS fk_{table}_school"
            ))
            .run(&mut *conn)
            .await?;
            sqlx::raw_sql(&format!("DROP INDEX IF EXISTS idx_{table}_school_id"))
                .run(&mut *conn)
                .await?;
            drop_school_id_column(&mut *conn, table).await?;
        }

        // Uniqueness becomes global again.
        if !constraint_exists(&mut *conn, "users", "users_email_key").await? {
            sqlx::raw_sql("ALTER TABLE users ADD CONSTRAINT users_email_key UNIQUE (email)")
                .run(&mut *conn)
                .await?;
        }
        if !constraint_exists(&mut *conn, "students", "students_student_number_key").await? {
            sqlx::raw_sql(
                "ALTER TABLE students
                 ADD CONSTRAINT students_student_number_key UNIQUE (student_number)",
            )
            .run(&mut *conn)
            .await?;
        }

        sqlx::raw_sql("DROP TABLE IF EXISTS schools")
            .run(&mut *conn)
            .await?;
        Ok(())
    }

    async fn down(&self, _conn: &mut PgConnection) -> anyhow::Result<()> {
        anyhow::bail!(
            "remove_multitenancy cannot be reverted: the school_id tenant assignments \
             were dropped and cannot be reconstructed"
        )
    }
}
