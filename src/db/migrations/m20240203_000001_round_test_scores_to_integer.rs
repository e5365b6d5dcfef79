//! Narrows the record-book test score columns from DECIMAL(5,2) to INTEGER,
//! rounding existing values (87.6 becomes 88). Columns already narrowed are
//! skipped, so a partially applied run resumes cleanly.

use async_trait::async_trait;
use sqlx::PgConnection;

use super::helpers::column_data_type;
use super::helpers::RunExec;
use super::Migration;

pub struct RoundTestScoresToInteger;

#[async_trait]
impl Migration for RoundTestScoresToInteger {
    fn id(&self) -> i64 {
        20240203000001
    }

    fn name(&self) -> &'static str {
        "round_test_scores_to_integer"
    }

    async fn up(&self, conn: &mut PgConnection) -> anyhow::Result<()> {
        for n in 1..=10 {
            let column = format!("test{n}_score");
            let data_type = column_data_type(&mut *conn, "record_books", &column).await?;
            if data_type.as_deref() != Some("numeric") {
                continue;
            }
            sqlx::raw_sql(&format!(
                "UPDATE record_books SET {column} = ROUND({column}) WHERE {column} IS NOT NULL"
            ))
            .run(&mut *conn)
            .await?;
            sqlx::raw_sql(&format!(
                "ALTER TABLE record_books
                 ALTER COLUMN {column} TYPE INTEGER USING ROUND({column})::INTEGER"
            ))
            .run(&mut *conn)
            .await?;
        }
        Ok(())
    }

    async fn down(&self, conn: &mut PgConnection) -> anyhow::Result<()> {
        // Widens the columns back; the fractional parts rounded away by `up`
        // are gone.
        for n in 1..=10 {
            let column = format!("test{n}_score");
            if column_data_type(&mut *conn, "record_books", &column).await?.as_deref()
                != Some("integer")
            {
                continue;
            }
            sqlx::raw_sql(&format!(
                "ALTER TABLE record_books
                 ALTER COLUMN {column} TYPE DECIMAL(5,2) USING {column}::DECIMAL(5,2)"
            ))
            .run(&mut *conn)
            .await?;
        }
        Ok(())
    }
}
