use sqlx::postgres::PgQueryResult;
use sqlx::{Execute, Executor, PgConnection, Postgres};

/// Adapter so migration steps can write `query.run(&mut *conn)` instead of
/// `query.execute(&mut *conn)`. Inside an `#[async_trait]` method the latter
/// trips rustc's "implementation of `Executor` is not general enough" limit
/// on `&mut PgConnection`; routing the executor as the receiver
/// (`conn.execute(query)`) is the form that resolves. This trait just packages
/// that flip behind the original call shape — it is behaviourally identical to
/// calling `Executor::execute`.
pub trait RunExec<'q>: Execute<'q, Postgres> + Sized + 'q {
    #[allow(async_fn_in_trait)]
    async fn run(self, conn: &mut PgConnection) -> sqlx::Result<PgQueryResult> {
        conn.execute(self).await
    }
}

impl<'q, T: Execute<'q, Postgres> + Sized + 'q> RunExec<'q> for T {}

/// Catalog probes used by steps that must resume cleanly after a partial
/// prior failure: every structural change is guarded by "create only if not
/// already present" / "drop only if present" checks built on these.

pub async fn table_exists(conn: &mut PgConnection, table: &str) -> sqlx::Result<bool> {
    sqlx::query_scalar(
        "SELECT EXISTS (
           SELECT 1 FROM information_schema.tables
           WHERE table_schema = 'public' AND table_name = $1
         )",
    )
    .bind(table)
    .fetch_one(conn)
    .await
}

pub async fn column_exists(
    conn: &mut PgConnection,
    table: &str,
    column: &str,
) -> sqlx::Result<bool> {
    sqlx::query_scalar(
        "SELECT EXISTS (
           SELECT 1 FROM information_schema.columns
           WHERE table_schema = 'public' AND table_name = $1 AND column_name = $2
         )",
    )
    .bind(table)
    .bind(column)
    .fetch_one(conn)
    .await
}

/// Data type of a column as reported by the catalog (`numeric`, `integer`, …),
/// or `None` if the column does not exist.
pub async fn column_data_type(
    conn: &mut PgConnection,
    table: &str,
    column: &str,
) -> sqlx::Result<Option<String>> {
    sqlx::query_scalar(
        "SELECT data_type FROM information_schema.columns
         WHERE table_schema = 'public' AND table_name = $1 AND column_name = $2",
    )
    .bind(table)
    .bind(column)
    .fetch_optional(conn)
    .await
}

pub async fn index_exists(conn: &mut PgConnection, index: &str) -> sqlx::Result<bool> {
    sqlx::query_scalar(
        "SELECT EXISTS (
           SELECT 1 FROM pg_indexes
           WHERE schemaname = 'public' AND indexname = $1
         )",
    )
    .bind(index)
    .fetch_one(conn)
    .await
}

pub async fn constraint_exists(
    conn: &mut PgConnection,
    table: &str,
    constraint: &str,
) -> sqlx::Result<bool> {
    sqlx::query_scalar(
        "SELECT EXISTS (
           SELECT 1 FROM information_schema.table_constraints
           WHERE table_schema = 'public' AND table_name = $1 AND constraint_name = $2
         )",
    )
    .bind(table)
    .bind(constraint)
    .fetch_one(conn)
    .await
}

/// SQLSTATE 42703 — "column does not exist". Best-effort cleanup treats this
/// as already done and continues.
pub fn is_undefined_column(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some("42703"))
}

/// SQLSTATE 23505 — unique constraint violation.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some("23505"))
}
