//! Timetable storage: scheduling parameters, named versions, and the slot
//! grid. The two composite uniques on slots are the scheduling-conflict
//! invariants — a teacher cannot teach two places at once within a version,
//! and a class cannot attend two lessons at once. A write violating either
//! fails atomically and leaves prior slots untouched.

use async_trait::async_trait;
use sqlx::PgConnection;

use super::helpers::RunExec;
use super::Migration;

pub struct CreateTimetableTables;

#[async_trait]
impl Migration for CreateTimetableTables {
    fn id(&self) -> i64 {
        20240601000001
    }

    fn name(&self) -> &'static str {
        "create_timetable_tables"
    }

    async fn up(&self, conn: &mut PgConnection) -> anyhow::Result<()> {
        // --- Tenant-wide scheduling parameters ---
        sqlx::raw_sql(
            r#"CREATE TABLE IF NOT EXISTS timetable_configs (
                id               UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                periods_per_day  SMALLINT NOT NULL CHECK (periods_per_day >= 1),
                day_start        TIME NOT NULL,
                day_end          TIME NOT NULL,
                break_periods    JSONB NOT NULL DEFAULT '[]'::jsonb,
                lessons_per_week JSONB NOT NULL DEFAULT '{}'::jsonb,
                active_days      JSONB NOT NULL DEFAULT '[1,2,3,4,5]'::jsonb,
                created_at       TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at       TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )"#,
        )
        .run(&mut *conn)
        .await?;

        // --- Named, independently activatable/publishable snapshots ---
        sqlx::raw_sql(
            r#"CREATE TABLE IF NOT EXISTS timetable_versions (
                id           UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                name         VARCHAR(128) NOT NULL,
                is_active    BOOLEAN NOT NULL DEFAULT FALSE,
                is_published BOOLEAN NOT NULL DEFAULT FALSE,
                created_at   TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at   TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )"#,
        )
        .run(&mut *conn)
        .await?;

        // --- One teacher+class+subject per day-of-week/period cell ---
        sqlx::raw_sql(
            r#"CREATE TABLE IF NOT EXISTS timetable_slots (
                id                 UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                version_id         UUID NOT NULL REFERENCES timetable_versions(id) ON DELETE CASCADE,
                class_id           UUID NOT NULL REFERENCES classes(id) ON DELETE CASCADE,
                subject_id         UUID NOT NULL REFERENCES subjects(id) ON DELETE CASCADE,
                teacher_id         UUID NOT NULL REFERENCES teachers(id) ON DELETE CASCADE,
                day_of_week        SMALLINT NOT NULL CHECK (day_of_week BETWEEN 1 AND 7),
                period_number      SMALLINT NOT NULL CHECK (period_number >= 1),
                is_manually_edited BOOLEAN NOT NULL DEFAULT FALSE,
                edited_by          UUID REFERENCES users(id) ON DELETE SET NULL,
                edited_at          TIMESTAMPTZ,
                created_at         TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                CONSTRAINT uq_slot_teacher_period
                    UNIQUE (version_id, teacher_id, day_of_week, period_number),
                CONSTRAINT uq_slot_class_period
                    UNIQUE (version_id, class_id, day_of_week, period_number)
            )"#,
        )
        .run(&mut *conn)
        .await?;

        sqlx::raw_sql(
            "CREATE INDEX IF NOT EXISTS idx_timetable_slots_version
             ON timetable_slots (version_id)",
        )
        .run(&mut *conn)
        .await?;
        Ok(())
    }

    async fn down(&self, conn: &mut PgConnection) -> anyhow::Result<()> {
        for table in &["timetable_slots", "timetable_versions", "timetable_configs"] {
            sqlx::raw_sql(&format!("DROP TABLE IF EXISTS {table}"))
                .run(&mut *conn)
                .await?;
        }
        Ok(())
    }
}
