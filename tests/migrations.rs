//! Migration ledger tests against a real PostgreSQL server.
//!
//! These are destructive (each test resets the `public` schema) and need a
//! disposable database:
//!
//!   DATABASE_URL=postgres://localhost/schoolhub_test \
//!     cargo test -- --ignored --test-threads=1

use schoolhub_api::db::migrations::helpers::{column_exists, is_unique_violation};
use schoolhub_api::db::migrations::m20240108_000001_initial_schema::InitialSchema;
use schoolhub_api::db::migrations::m20240122_000001_add_subject_category::AddSubjectCategory;
use schoolhub_api::db::migrations::m20240310_000001_require_record_book_subject::RequireRecordBookSubject;
use schoolhub_api::db::migrations::m20240318_000001_add_school_motto::AddSchoolMotto;
use schoolhub_api::db::migrations::runner;
use schoolhub_api::db::migrations::{registry, MigrateError, Migration};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

// Step ids, as named in the registry.
const ADD_SUBJECT_CATEGORY: i64 = 20240122000001;
const ROUND_TEST_SCORES: i64 = 20240203000001;
const ADD_MULTITENANCY: i64 = 20240214000001;
const ADD_MODULE_ACCESS: i64 = 20240302000001;
const REQUIRE_RECORD_BOOK_SUBJECT: i64 = 20240310000001;

async fn test_pool() -> PgPool {
    let url = std::env::var("DATABASE_URL")
        .expect("DATABASE_URL must point at a disposable test database");
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await
        .expect("connect to test database");
    sqlx::raw_sql("DROP SCHEMA public CASCADE; CREATE SCHEMA public")
        .execute(&pool)
        .await
        .expect("reset schema");
    pool
}

async fn count(pool: &PgPool, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(pool)
        .await
        .unwrap()
}

async fn insert_class(pool: &PgPool, name: &str) -> Uuid {
    sqlx::query_scalar("INSERT INTO classes (name) VALUES ($1) RETURNING id")
        .bind(name)
        .fetch_one(pool)
        .await
        .unwrap()
}

async fn insert_teacher(pool: &PgPool, last_name: &str) -> Uuid {
    sqlx::query_scalar(
        "INSERT INTO teachers (first_name, last_name) VALUES ('Test', $1) RETURNING id",
    )
    .bind(last_name)
    .fetch_one(pool)
    .await
    .unwrap()
}

#[tokio::test]
#[ignore = "requires a disposable PostgreSQL database"]
async fn full_ledger_applies_once_and_rerun_is_a_noop() {
    let pool = test_pool().await;

    let applied = runner::run_pending(&pool).await.unwrap();
    assert_eq!(applied, registry().len());
    assert_eq!(runner::run_pending(&pool).await.unwrap(), 0);

    let status = runner::status(&pool).await.unwrap();
    assert!(status.iter().all(|s| s.applied));
}

#[tokio::test]
#[ignore = "requires a disposable PostgreSQL database"]
async fn out_of_order_ledger_state_is_rejected() {
    let pool = test_pool().await;
    runner::run_pending(&pool).await.unwrap();

    // Forge a gap: an early step recorded as unapplied while later ones are.
    sqlx::query("DELETE FROM _schema_migrations WHERE id = $1")
        .bind(ADD_SUBJECT_CATEGORY)
        .execute(&pool)
        .await
        .unwrap();

    let err = runner::run_pending(&pool).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<MigrateError>(),
        Some(MigrateError::OutOfOrder { .. })
    ));
}

#[tokio::test]
#[ignore = "requires a disposable PostgreSQL database"]
async fn multitenancy_backfills_every_row_with_the_default_school() {
    let pool = test_pool().await;
    runner::run_until(&pool, ROUND_TEST_SCORES).await.unwrap();

    insert_class(&pool, "Form 1A").await;
    insert_teacher(&pool, "Moyo").await;
    sqlx::query(
        "INSERT INTO students (first_name, last_name, student_number)
         VALUES ('Tana', 'Dube', 'S-0001')",
    )
    .execute(&pool)
    .await
    .unwrap();
    sqlx::query(
        "INSERT INTO users (email, password_hash, full_name)
         VALUES ('head@school.test', 'x', 'Head Teacher')",
    )
    .execute(&pool)
    .await
    .unwrap();

    runner::run_until(&pool, ADD_MULTITENANCY).await.unwrap();

    let default_school: Uuid =
        sqlx::query_scalar("SELECT id FROM schools WHERE code = 'default'")
            .fetch_one(&pool)
            .await
            .unwrap();
    for table in &["users", "students", "teachers", "classes"] {
        let stray: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM {table} WHERE school_id IS NULL OR school_id <> $1"
        ))
        .bind(default_school)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(stray, 0, "{table} has rows outside the default school");
    }

    // Email uniqueness is now scoped per tenant: the same address is fine in
    // another school, a duplicate within the same school is not.
    let second_school: Uuid = sqlx::query_scalar(
        "INSERT INTO schools (name, code) VALUES ('Second School', 'second') RETURNING id",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    sqlx::query(
        "INSERT INTO users (email, password_hash, full_name, school_id)
         VALUES ('head@school.test', 'x', 'Other Head', $1)",
    )
    .bind(second_school)
    .execute(&pool)
    .await
    .unwrap();
    let err = sqlx::query(
        "INSERT INTO users (email, password_hash, full_name, school_id)
         VALUES ('head@school.test', 'x', 'Duplicate Head', $1)",
    )
    .bind(default_school)
    .execute(&pool)
    .await
    .unwrap_err();
    assert!(is_unique_violation(&err));
}

#[tokio::test]
#[ignore = "requires a disposable PostgreSQL database"]
async fn multitenancy_resumes_after_a_partial_prior_run() {
    let pool = test_pool().await;
    runner::run_until(&pool, ROUND_TEST_SCORES).await.unwrap();

    // Simulate a crashed earlier attempt that got as far as adding one
    // column: the step must skip it and finish the rest.
    sqlx::raw_sql("ALTER TABLE users ADD COLUMN school_id UUID")
        .execute(&pool)
        .await
        .unwrap();

    runner::run_until(&pool, ADD_MULTITENANCY).await.unwrap();

    let mut conn = pool.acquire().await.unwrap();
    assert!(column_exists(&mut conn, "users", "school_id").await.unwrap());
    assert!(column_exists(&mut conn, "settings", "school_id").await.unwrap());
}

#[tokio::test]
#[ignore = "requires a disposable PostgreSQL database"]
async fn test_scores_are_rounded_not_truncated() {
    let pool = test_pool().await;
    runner::run_until(&pool, ADD_SUBJECT_CATEGORY).await.unwrap();

    let class = insert_class(&pool, "Form 2B").await;
    let teacher = insert_teacher(&pool, "Ncube").await;
    let student: Uuid = sqlx::query_scalar(
        "INSERT INTO students (first_name, last_name, student_number)
         VALUES ('Rudo', 'Sibanda', 'S-0002') RETURNING id",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    sqlx::query(
        "INSERT INTO record_books (student_id, teacher_id, class_id, term, year,
                                   test1_score, test2_score)
         VALUES ($1, $2, $3, 1, 2024, 87.6, 12.4)",
    )
    .bind(student)
    .bind(teacher)
    .bind(class)
    .execute(&pool)
    .await
    .unwrap();

    runner::run_until(&pool, ROUND_TEST_SCORES).await.unwrap();

    let (one, two): (i32, i32) =
        sqlx::query_as("SELECT test1_score, test2_score FROM record_books LIMIT 1")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(one, 88);
    assert_eq!(two, 12);
}

#[tokio::test]
#[ignore = "requires a disposable PostgreSQL database"]
async fn record_book_rows_without_subject_are_deleted() {
    let pool = test_pool().await;
    runner::run_until(&pool, ADD_MODULE_ACCESS).await.unwrap();

    let school: Uuid = sqlx::query_scalar("SELECT id FROM schools WHERE code = 'default'")
        .fetch_one(&pool)
        .await
        .unwrap();
    let class: Uuid = sqlx::query_scalar(
        "INSERT INTO classes (name, school_id) VALUES ('Form 3C', $1) RETURNING id",
    )
    .bind(school)
    .fetch_one(&pool)
    .await
    .unwrap();
    let teacher: Uuid = sqlx::query_scalar(
        "INSERT INTO teachers (first_name, last_name, school_id)
         VALUES ('Test', 'Phiri', $1) RETURNING id",
    )
    .bind(school)
    .fetch_one(&pool)
    .await
    .unwrap();
    let subject: Uuid = sqlx::query_scalar(
        "INSERT INTO subjects (name, school_id) VALUES ('Mathematics', $1) RETURNING id",
    )
    .bind(school)
    .fetch_one(&pool)
    .await
    .unwrap();
    let mut students = Vec::new();
    for n in 0..2 {
        let id: Uuid = sqlx::query_scalar(
            "INSERT INTO students (first_name, last_name, student_number, school_id)
             VALUES ('Test', 'Student', $1, $2) RETURNING id",
        )
        .bind(format!("S-10{n}"))
        .bind(school)
        .fetch_one(&pool)
        .await
        .unwrap();
        students.push(id);
        sqlx::query(
            "INSERT INTO record_books (student_id, teacher_id, class_id, term, year)
             VALUES ($1, $2, $3, 1, 2024)",
        )
        .bind(id)
        .bind(teacher)
        .bind(class)
        .execute(&pool)
        .await
        .unwrap();
    }
    assert_eq!(count(&pool, "record_books").await, 2);

    runner::run_until(&pool, REQUIRE_RECORD_BOOK_SUBJECT)
        .await
        .unwrap();

    // Both pre-existing rows lacked a subject and are gone.
    assert_eq!(count(&pool, "record_books").await, 0);

    // New rows need a subject, and the uniqueness key now includes it.
    sqlx::query(
        "INSERT INTO record_books (student_id, teacher_id, class_id, subject_id, term, year)
         VALUES ($1, $2, $3, $4, 1, 2024)",
    )
    .bind(students[0])
    .bind(teacher)
    .bind(class)
    .bind(subject)
    .execute(&pool)
    .await
    .unwrap();
    let err = sqlx::query(
        "INSERT INTO record_books (student_id, teacher_id, class_id, subject_id, term, year)
         VALUES ($1, $2, $3, $4, 1, 2024)",
    )
    .bind(students[0])
    .bind(teacher)
    .bind(class)
    .bind(subject)
    .execute(&pool)
    .await
    .unwrap_err();
    assert!(is_unique_violation(&err));
}

#[tokio::test]
#[ignore = "requires a disposable PostgreSQL database"]
async fn junction_and_timetable_slot_uniqueness() {
    let pool = test_pool().await;
    runner::run_pending(&pool).await.unwrap();

    let class_a = insert_class(&pool, "Form 4A").await;
    let class_b = insert_class(&pool, "Form 4B").await;
    let teacher_a = insert_teacher(&pool, "Banda").await;
    let teacher_b = insert_teacher(&pool, "Chirwa").await;
    let subject: Uuid =
        sqlx::query_scalar("INSERT INTO subjects (name) VALUES ('Physics') RETURNING id")
            .fetch_one(&pool)
            .await
            .unwrap();

    // teacher_classes: the same pair at most once.
    sqlx::query("INSERT INTO teacher_classes (teacher_id, class_id) VALUES ($1, $2)")
        .bind(teacher_a)
        .bind(class_a)
        .execute(&pool)
        .await
        .unwrap();
    let err = sqlx::query("INSERT INTO teacher_classes (teacher_id, class_id) VALUES ($1, $2)")
        .bind(teacher_a)
        .bind(class_a)
        .execute(&pool)
        .await
        .unwrap_err();
    assert!(is_unique_violation(&err));

    let version: Uuid = sqlx::query_scalar(
        "INSERT INTO timetable_versions (name) VALUES ('Term 1 draft') RETURNING id",
    )
    .fetch_one(&pool)
    .await
    .unwrap();

    let insert_slot = |class: Uuid, teacher: Uuid, day: i16, period: i16| {
        let pool = pool.clone();
        async move {
            sqlx::query(
                "INSERT INTO timetable_slots
                   (version_id, class_id, subject_id, teacher_id, day_of_week, period_number)
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(version)
            .bind(class)
            .bind(subject)
            .bind(teacher)
            .bind(day)
            .bind(period)
            .execute(&pool)
            .await
        }
    };

    insert_slot(class_a, teacher_a, 1, 1).await.unwrap();

    // Same teacher, same cell, another class: teacher double-booked.
    let err = insert_slot(class_b, teacher_a, 1, 1).await.unwrap_err();
    assert!(is_unique_violation(&err));

    // Same class, same cell, different teacher: class double-booked.
    let err = insert_slot(class_a, teacher_b, 1, 1).await.unwrap_err();
    assert!(is_unique_violation(&err));

    // A different period is fine, and the failed writes left nothing behind.
    insert_slot(class_a, teacher_a, 1, 2).await.unwrap();
    assert_eq!(count(&pool, "timetable_slots").await, 2);
}

#[tokio::test]
#[ignore = "requires a disposable PostgreSQL database"]
async fn idempotent_steps_tolerate_a_rerun() {
    let pool = test_pool().await;
    runner::run_pending(&pool).await.unwrap();

    let mut conn = pool.acquire().await.unwrap();
    AddSubjectCategory.up(&mut conn).await.unwrap();
    AddSchoolMotto.up(&mut conn).await.unwrap();
    RequireRecordBookSubject.up(&mut conn).await.unwrap();

    // No duplicated objects either.
    let categories: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM information_schema.columns
         WHERE table_name = 'subjects' AND column_name = 'category'",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(categories, 1);
}

#[tokio::test]
#[ignore = "requires a disposable PostgreSQL database"]
async fn multitenancy_removal_is_terminal() {
    let pool = test_pool().await;
    runner::run_pending(&pool).await.unwrap();

    // After the full ledger the single-tenant profile table exists, but no
    // domain table carries school_id any more.
    let mut conn = pool.acquire().await.unwrap();
    for table in &["users", "students", "settings", "invoices"] {
        assert!(
            !column_exists(&mut conn, table, "school_id").await.unwrap(),
            "{table} still has school_id"
        );
    }
    drop(conn);

    // Walking the ledger backwards stops at the irreversible step.
    runner::revert_last(&pool).await.unwrap(); // create_timetable_tables
    runner::revert_last(&pool).await.unwrap(); // add_school_profile
    let err = runner::revert_last(&pool).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<MigrateError>(),
        Some(MigrateError::Irreversible { .. })
    ));
}

#[tokio::test]
#[ignore = "requires a disposable PostgreSQL database"]
async fn initial_schema_down_restores_an_empty_database() {
    let pool = test_pool().await;
    runner::run_until(&pool, InitialSchema.id()).await.unwrap();
    assert_eq!(runner::revert_last(&pool).await.unwrap().map(|(_, n)| n), Some("initial_schema"));

    let mut conn = pool.acquire().await.unwrap();
    assert!(!schoolhub_api::db::migrations::helpers::table_exists(&mut conn, "users")
        .await
        .unwrap());
}
