//! Partitions every domain table by school: creates the `schools` registry,
//! seeds a default school, and retrofits a required `school_id` onto each
//! tenant-scoped table. Uniqueness that was previously global (user email,
//! student number) becomes per-tenant.
//!
//! A new required relationship on populated tables forces the three-phase
//! sub-protocol: add the column nullable, backfill every row, only then
//! promote to NOT NULL and attach constraints. Every sub-change is guarded
//! by a catalog check so the step can resume after a partial prior failure.

use async_trait::async_trait;
use sqlx::PgConnection;
use uuid::Uuid;

use super::helpers::{column_exists, constraint_exists, index_exists, table_exists};
use super::helpers::RunExec;
use super::Migration;

pub const TENANT_TABLES: &[&str] = &[
    "users",
    "students",
    "teachers",
    "parents",
    "classes",
    "subjects",
    "exams",
    "marks",
    "invoices",
    "invoice_uniform_items",
    "uniform_items",
    "settings",
    "attendance",
    "messages",
    "report_card_remarks",
];

pub struct AddMultitenancy;

#[async_trait]
impl Migration for AddMultitenancy {
    fn id(&self) -> i64 {
        20240214000001
    }

    fn name(&self) -> &'static str {
        "add_multitenancy"
    }

    async fn up(&self, conn: &mut PgConnection) -> anyhow::Result<()> {
        // --- Schools registry ---
        if !table_exists(&mut *conn, "schools").await? {
            sqlx::raw_sql(
                r#"CREATE TABLE schools (
                    id                    UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                    name                  VARCHAR(255) NOT NULL,
                    code                  VARCHAR(32) NOT NULL,
                    is_active             BOOLEAN NOT NULL DEFAULT TRUE,
                    subscription_end_date TIMESTAMPTZ,
                    created_at            TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                    updated_at            TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                    CONSTRAINT schools_code_key UNIQUE (code)
                )"#,
            )
            .run(&mut *conn)
            .await?;
        }

        // --- Seed the default school all existing rows are assigned to ---
        let default_school: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM schools WHERE code = 'default'")
                .fetch_optional(&mut *conn)
                .await?;
        let default_school = match default_school {
            Some(id) => id,
            None => {
                let id: Uuid = sqlx::query_scalar(
                    "INSERT INTO schools (name, code) VALUES ('Default School', 'default')
                     RETURNING id",
                )
                .fetch_one(&mut *conn)
                .await?;
                tracing::info!("Seeded default school {}", id);
                id
            }
        };

        // --- Retrofit school_id onto every tenant-scoped table ---
        for table in TENANT_TABLES {
            if !column_exists(&mut *conn, table, "school_id").await? {
                sqlx::raw_sql(&format!("ALTER TABLE {table} ADD COLUMN school_id UUID"))
                    .run(&mut *conn)
                    .await?;
            }

            sqlx::query(&format!(
                "UPDATE {table} SET school_id = $1 WHERE school_id IS NULL"
            ))
            .bind(default_school)
            .run(&mut *conn)
            .await?;

            sqlx::raw_sql(&format!(
                "ALTER TABLE {table} ALTER COLUMN school_id SET NOT NULL"
            ))
            .run(&mut *conn)
            .await?;

            let fk = format!("fk_{table}_school");
            if !constraint_exists(&mut *conn, table, &fk).await? {
                sqlx::raw_sql(&format!(
                    "ALTER TABLE {table}
                     ADD CONSTRAINT {fk} FOREIGN KEY (school_id) REFERENCES schools(id)"
                ))
                .run(&mut *conn)
                .await?;
            }

            let index = format!("idx_{table}_school_id");
            if !index_exists(&mut *conn, &index).await? {
                sqlx::raw_sql(&format!("CREATE INDEX {index} ON {table} (school_id)"))
                    .run(&mut *conn)
                    .await?;
            }
        }

        // --- Previously-global uniques become per-tenant ---
        if constraint_exists(&mut *conn, "users", "users_email_key").await? {
            sqlx::raw_sql("ALTER TABLE users DROP CONSTRAINT users_email_key")
                .run(&mut *conn)
                .await?;
        }
        if !constraint_exists(&mut *conn, "users", "uq_users_email_school").await? {
            sqlx::raw_sql(
                "ALTER TABLE users
                 ADD CONSTRAINT uq_users_email_school UNIQUE (email, school_id)",
            )
            .run(&mut *conn)
            .await?;
        }

        if constraint_exists(&mut *conn, "students", "students_student_number_key").await? {
            sqlx::raw_sql("ALTER TABLE students DROP CONSTRAINT students_student_number_key")
                .run(&mut *conn)
                .await?;
        }
        if !constraint_exists(&mut *conn, "students", "uq_students_student_number_school").await? {
            sqlx::raw_sql(
                "ALTER TABLE students
                 ADD CONSTRAINT uq_students_student_number_school
                 UNIQUE (student_number, school_id)",
            )
            .run(&mut *conn)
            .await?;
        }

        Ok(())
    }

    async fn down(&self, conn: &mut PgConnection) -> anyhow::Result<()> {
        // Undo in the opposite order: scoped uniques back to global first,
        // then constraints and indexes before the columns they reference.
        sqlx::raw_sql("ALTER TABLE students DROP CONSTRAINT IF EXISTS uq_students_student_number_school")
            .run(&mut *conn)
            .await?;
        if !constraint_exists(&mut *conn, "students", "students_student_number_key").await? {
            sqlx::raw_sql(
                "ALTER TABLE students
                 ADD CONSTRAINT students_student_number_key UNIQUE (student_number)",
            )
            .run(&mut *conn)
            .await?;
        }

        sqlx::raw_sql("ALTER TABLE users DROP CONSTRAINT IF EXISTS uq_users_email_school")
            .run(&mut *conn)
            .await?;
        if !constraint_exists(&mut *conn, "users", "users_email_key").await? {
            sqlx::raw_sql("ALTER TABLE users ADD CONSTRAINT users_email_key UNIQUE (email)")
                .run(&mut *conn)
                .await?;
        }

        for table in TENANT_TABLES.iter().rev() {
            sqlx::raw_sql(&format!("DROP INDEX IF EXISTS idx_{table}_school_id"))
                .run(&mut *conn)
                .await?;
            sqlx::raw_sql(&format!(
                "ALTER TABLE {table} DROP CONSTRAINT IF EXISTS fk_{table}_school"
            ))
            .run(&mut *conn)
            .await?;
            sqlx::raw_sql(&format!("ALTER TABLE {table} DROP COLUMN IF EXISTS school_id"))
                .run(&mut *conn)
                .await?;
        }

        sqlx::raw_sql("DROP TABLE IF EXISTS schools")
            .run(&mut *conn)
            .await?;
        Ok(())
    }
}
