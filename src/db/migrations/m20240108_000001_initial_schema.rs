//! Baseline schema: the core record tables the rest of the ledger evolves.

use async_trait::async_trait;
use sqlx::PgConnection;

use super::helpers::RunExec;
use super::Migration;

pub struct InitialSchema;

#[async_trait]
impl Migration for InitialSchema {
    fn id(&self) -> i64 {
        20240108000001
    }

    fn name(&self) -> &'static str {
        "initial_schema"
    }

    async fn up(&self, conn: &mut PgConnection) -> anyhow::Result<()> {
        // --- Users (staff logins) ---
        sqlx::raw_sql(
            r#"CREATE TABLE IF NOT EXISTS users (
                id            UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                email         VARCHAR(255) NOT NULL,
                password_hash TEXT NOT NULL,
                full_name     VARCHAR(255) NOT NULL,
                role          VARCHAR(32) NOT NULL DEFAULT 'teachers',
                phone         VARCHAR(32),
                is_active     BOOLEAN NOT NULL DEFAULT TRUE,
                created_at    TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at    TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                CONSTRAINT users_email_key UNIQUE (email)
            )"#,
        )
        .run(&mut *conn)
        .await?;

        // --- Classes ---
        sqlx::raw_sql(
            r#"CREATE TABLE IF NOT EXISTS classes (
                id         UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                name       VARCHAR(64) NOT NULL,
                form_level SMALLINT,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )"#,
        )
        .run(&mut *conn)
        .await?;

        // --- Teachers ---
        sqlx::raw_sql(
            r#"CREATE TABLE IF NOT EXISTS teachers (
                id         UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                first_name VARCHAR(128) NOT NULL,
                last_name  VARCHAR(128) NOT NULL,
                email      VARCHAR(255),
                phone      VARCHAR(32),
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )"#,
        )
        .run(&mut *conn)
        .await?;

        // --- Parents ---
        sqlx::raw_sql(
            r#"CREATE TABLE IF NOT EXISTS parents (
                id         UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                first_name VARCHAR(128) NOT NULL,
                last_name  VARCHAR(128) NOT NULL,
                phone      VARCHAR(32),
                email      VARCHAR(255),
                address    TEXT,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )"#,
        )
        .run(&mut *conn)
        .await?;

        // --- Students ---
        sqlx::raw_sql(
            r#"CREATE TABLE IF NOT EXISTS students (
                id             UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                first_name     VARCHAR(128) NOT NULL,
                last_name      VARCHAR(128) NOT NULL,
                student_number VARCHAR(32) NOT NULL,
                date_of_birth  DATE,
                gender         VARCHAR(16),
                class_id       UUID REFERENCES classes(id) ON DELETE SET NULL,
                parent_id      UUID REFERENCES parents(id) ON DELETE SET NULL,
                is_active      BOOLEAN NOT NULL DEFAULT TRUE,
                created_at     TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at     TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                CONSTRAINT students_student_number_key UNIQUE (student_number)
            )"#,
        )
        .run(&mut *conn)
        .await?;

        // --- Subjects ---
        sqlx::raw_sql(
            r#"CREATE TABLE IF NOT EXISTS subjects (
                id         UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                name       VARCHAR(128) NOT NULL,
                code       VARCHAR(16),
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )"#,
        )
        .run(&mut *conn)
        .await?;

        // --- Exams ---
        sqlx::raw_sql(
            r#"CREATE TABLE IF NOT EXISTS exams (
                id         UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                name       VARCHAR(255) NOT NULL,
                class_id   UUID REFERENCES classes(id) ON DELETE CASCADE,
                subject_id UUID REFERENCES subjects(id) ON DELETE CASCADE,
                term       SMALLINT NOT NULL,
                year       SMALLINT NOT NULL,
                exam_date  DATE,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )"#,
        )
        .run(&mut *conn)
        .await?;

        // --- Marks ---
        sqlx::raw_sql(
            r#"CREATE TABLE IF NOT EXISTS marks (
                id         UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                exam_id    UUID NOT NULL REFERENCES exams(id) ON DELETE CASCADE,
                student_id UUID NOT NULL REFERENCES students(id) ON DELETE CASCADE,
                score      INTEGER NOT NULL,
                comment    TEXT,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                UNIQUE (exam_id, student_id)
            )"#,
        )
        .run(&mut *conn)
        .await?;

        // --- Invoices ---
        sqlx::raw_sql(
            r#"CREATE TABLE IF NOT EXISTS invoices (
                id          UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                student_id  UUID NOT NULL REFERENCES students(id) ON DELETE CASCADE,
                term        SMALLINT NOT NULL,
                year        SMALLINT NOT NULL,
                amount_due  DECIMAL(10,2) NOT NULL DEFAULT 0,
                amount_paid DECIMAL(10,2) NOT NULL DEFAULT 0,
                status      VARCHAR(16) NOT NULL DEFAULT 'unpaid',
                due_date    DATE,
                created_at  TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at  TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )"#,
        )
        .run(&mut *conn)
        .await?;

        // --- Uniform items ---
        sqlx::raw_sql(
            r#"CREATE TABLE IF NOT EXISTS uniform_items (
                id             UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                name           VARCHAR(128) NOT NULL,
                price          DECIMAL(10,2) NOT NULL,
                stock_quantity INTEGER NOT NULL DEFAULT 0,
                created_at     TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )"#,
        )
        .run(&mut *conn)
        .await?;

        // --- Invoice line items for uniforms ---
        sqlx::raw_sql(
            r#"CREATE TABLE IF NOT EXISTS invoice_uniform_items (
                id              UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                invoice_id      UUID NOT NULL REFERENCES invoices(id) ON DELETE CASCADE,
                uniform_item_id UUID NOT NULL REFERENCES uniform_items(id),
                quantity        INTEGER NOT NULL DEFAULT 1,
                unit_price      DECIMAL(10,2) NOT NULL
            )"#,
        )
        .run(&mut *conn)
        .await?;

        // --- Settings (singleton row, enforced by application logic) ---
        sqlx::raw_sql(
            r#"CREATE TABLE IF NOT EXISTS settings (
                id             UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                currency       VARCHAR(8) NOT NULL DEFAULT 'USD',
                invoice_prefix VARCHAR(16) NOT NULL DEFAULT 'INV',
                created_at     TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at     TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )"#,
        )
        .run(&mut *conn)
        .await?;

        // --- Attendance ---
        sqlx::raw_sql(
            r#"CREATE TABLE IF NOT EXISTS attendance (
                id         UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                student_id UUID NOT NULL REFERENCES students(id) ON DELETE CASCADE,
                class_id   UUID REFERENCES classes(id) ON DELETE SET NULL,
                date       DATE NOT NULL,
                status     VARCHAR(16) NOT NULL DEFAULT 'present',
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                UNIQUE (student_id, date)
            )"#,
        )
        .run(&mut *conn)
        .await?;

        // --- Messages ---
        sqlx::raw_sql(
            r#"CREATE TABLE IF NOT EXISTS messages (
                id           UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                sender_id    UUID NOT NULL REFERENCES users(id),
                recipient_id UUID REFERENCES users(id),
                subject      VARCHAR(255),
                body         TEXT NOT NULL,
                is_read      BOOLEAN NOT NULL DEFAULT FALSE,
                created_at   TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )"#,
        )
        .run(&mut *conn)
        .await?;

        // --- Report card remarks ---
        sqlx::raw_sql(
            r#"CREATE TABLE IF NOT EXISTS report_card_remarks (
                id         UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                student_id UUID NOT NULL REFERENCES students(id) ON DELETE CASCADE,
                class_id   UUID REFERENCES classes(id) ON DELETE SET NULL,
                teacher_id UUID REFERENCES teachers(id) ON DELETE SET NULL,
                term       SMALLINT NOT NULL,
                year       SMALLINT NOT NULL,
                remark     TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )"#,
        )
        .run(&mut *conn)
        .await?;

        // --- Record books: 10 numbered test score/topic/date triples ---
        let mut test_columns = String::new();
        for n in 1..=10 {
            test_columns.push_str(&format!(
                "test{n}_score DECIMAL(5,2),
                 test{n}_topic VARCHAR(255),
                 test{n}_date  DATE,
"
            ));
        }
        sqlx::raw_sql(&format!(
            r#"CREATE TABLE IF NOT EXISTS record_books (
                id         UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                student_id UUID NOT NULL REFERENCES students(id) ON DELETE CASCADE,
                teacher_id UUID NOT NULL REFERENCES teachers(id) ON DELETE CASCADE,
                class_id   UUID NOT NULL REFERENCES classes(id) ON DELETE CASCADE,
                term       SMALLINT NOT NULL,
                year       SMALLINT NOT NULL,
                {test_columns}
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                CONSTRAINT uq_record_books_entry
                    UNIQUE (student_id, teacher_id, class_id, term, year)
            )"#
        ))
        .run(&mut *conn)
        .await?;

        Ok(())
    }

    async fn down(&self, conn: &mut PgConnection) -> anyhow::Result<()> {
        // Reverse dependency order.
        for table in &[
            "record_books",
            "report_card_remarks",
            "messages",
            "attendance",
            "settings",
            "invoice_uniform_items",
            "uniform_items",
            "invoices",
            "marks",
            "exams",
            "subjects",
            "students",
            "parents",
            "teachers",
            "classes",
            "users",
        ] {
            sqlx::raw_sql(&format!("DROP TABLE IF EXISTS {table}"))
                .run(&mut *conn)
                .await?;
        }
        Ok(())
    }
}
