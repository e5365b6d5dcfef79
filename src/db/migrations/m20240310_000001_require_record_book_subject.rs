//! Record-book entries become subject-scoped: the uniqueness key gains
//! `subject_id`, and pre-existing rows with no subject reference are deleted.
//! The deletion is intentional and lossy; those historical records cannot be
//! attributed to a subject and are unrecoverable afterwards.

use async_trait::async_trait;
use sqlx::PgConnection;

use super::helpers::{column_exists, constraint_exists};
use super::helpers::RunExec;
use super::Migration;

pub struct RequireRecordBookSubject;

#[async_trait]
impl Migration for RequireRecordBookSubject {
    fn id(&self) -> i64 {
        20240310000001
    }

    fn name(&self) -> &'static str {
        "require_record_book_subject"
    }

    async fn up(&self, conn: &mut PgConnection) -> anyhow::Result<()> {
        if !column_exists(&mut *conn, "record_books", "subject_id").await? {
            sqlx::raw_sql("ALTER TABLE record_books ADD COLUMN subject_id UUID")
                .run(&mut *conn)
                .await?;
        }

        let deleted = sqlx::query("DELETE FROM record_books WHERE subject_id IS NULL")
            .run(&mut *conn)
            .await?
            .rows_affected();
        if deleted > 0 {
            tracing::warn!("Deleted {} record book entries with no subject reference", deleted);
        }

        sqlx::raw_sql("ALTER TABLE record_books ALTER COLUMN subject_id SET NOT NULL")
            .run(&mut *conn)
            .await?;

        if !constraint_exists(&mut *conn, "record_books", "fk_record_books_subject").await? {
            sqlx::raw_sql(
                "ALTER TABLE record_books
                 ADD CONSTRAINT fk_record_books_subject
                 FOREIGN KEY (subject_id) REFERENCES subjects(id) ON DELETE CASCADE",
            )
            .run(&mut *conn)
            .await?;
        }

        if constraint_exists(&mut *conn, "record_books", "uq_record_books_entry").await? {
            sqlx::raw_sql("ALTER TABLE record_books DROP CONSTRAINT uq_record_books_entry")
                .run(&mut *conn)
                .await?;
        }
        if !constraint_exists(&mut *conn, "record_books", "uq_record_books_entry_subject").await? {
            sqlx::raw_sql(
                "ALTER TABLE record_books
                 ADD CONSTRAINT uq_record_books_entry_subject
                 UNIQUE (student_id, teacher_id, class_id, subject_id, term, year)",
            )
            .run(&mut *conn)
            .await?;
        }

        Ok(())
    }

    async fn down(&self, conn: &mut PgConnection) -> anyhow::Result<()> {
        // Restores the old uniqueness key and drops the column. Rows deleted
        // by `up` stay deleted.
        sqlx::raw_sql(
            "ALTER TABLE record_books DROP CONSTRAINT IF EXISTS uq_record_books_entry_subject",
        )
        .run(&mut *conn)
        .await?;
        if !constraint_exists(&mut *conn, "record_books", "uq_record_books_entry").await? {
            sqlx::raw_sql(
                "ALTER TABLE record_books
                 ADD CONSTRAINT uq_record_books_entry
                 UNIQUE (student_id, teacher_id, class_id, term, year)",
            )
            .run(&mut *conn)
            .await?;
        }
        sqlx::raw_sql(
            "ALTER TABLE record_books DROP CONSTRAINT IF EXISTS fk_record_books_subject",
        )
        .run(&mut *conn)
        .await?;
        sqlx::raw_sql("ALTER TABLE record_books DROP COLUMN IF EXISTS subject_id")
            .run(&mut *conn)
            .await?;
        Ok(())
    }
}
