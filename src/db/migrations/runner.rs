use std::collections::BTreeSet;

use sqlx::PgPool;

use super::{registry, MigrateError, Migration};

/// Applied/pending state of one registry step, as shown by `migrate status`.
#[derive(Debug)]
pub struct StepStatus {
    pub id: i64,
    pub name: &'static str,
    pub applied: bool,
}

async fn ensure_ledger(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::raw_sql(
        "CREATE TABLE IF NOT EXISTS _schema_migrations (
            id         BIGINT PRIMARY KEY,
            name       TEXT NOT NULL,
            applied_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )",
    )
    .execute(pool)
    .await?;
    Ok(())
}

fn validate_registry(steps: &[Box<dyn Migration>]) -> anyhow::Result<()> {
    for pair in steps.windows(2) {
        if pair[1].id() <= pair[0].id() {
            anyhow::bail!(
                "migration registry is not strictly increasing: {} follows {}",
                pair[1].id(),
                pair[0].id()
            );
        }
    }
    Ok(())
}

async fn applied_ids(pool: &PgPool) -> anyhow::Result<BTreeSet<i64>> {
    let ids: Vec<i64> = sqlx::query_scalar("SELECT id FROM _schema_migrations ORDER BY id")
        .fetch_all(pool)
        .await?;
    Ok(ids.into_iter().collect())
}

pub async fn status(pool: &PgPool) -> anyhow::Result<Vec<StepStatus>> {
    ensure_ledger(pool).await?;
    let steps = registry();
    validate_registry(&steps)?;
    let applied = applied_ids(pool).await?;

    for id in &applied {
        if !steps.iter().any(|s| s.id() == *id) {
            return Err(MigrateError::UnknownApplied { id: *id }.into());
        }
    }

    Ok(steps
        .iter()
        .map(|s| StepStatus {
            id: s.id(),
            name: s.name(),
            applied: applied.contains(&s.id()),
        })
        .collect())
}

/// Apply every unapplied step, in ascending id order. Each step runs inside
/// its own transaction together with its ledger insert, so a step is applied
/// exactly when its ledger row exists. Returns the number of steps applied.
pub async fn run_pending(pool: &PgPool) -> anyhow::Result<usize> {
    run_until(pool, i64::MAX).await
}

/// Apply unapplied steps with id <= `last_id`. Applying step N requires all
/// steps < N applied; a ledger that records a later step as applied while an
/// earlier one is pending is corrupt and aborts before any work.
pub async fn run_until(pool: &PgPool, last_id: i64) -> anyhow::Result<usize> {
    ensure_ledger(pool).await?;
    let steps = registry();
    validate_registry(&steps)?;
    let applied = applied_ids(pool).await?;

    for id in &applied {
        if !steps.iter().any(|s| s.id() == *id) {
            return Err(MigrateError::UnknownApplied { id: *id }.into());
        }
    }
    let mut first_unapplied: Option<i64> = None;
    for step in &steps {
        match first_unapplied {
            None if !applied.contains(&step.id()) => first_unapplied = Some(step.id()),
            Some(unapplied) if applied.contains(&step.id()) => {
                return Err(MigrateError::OutOfOrder {
                    unapplied,
                    applied: step.id(),
                }
                .into());
            }
            _ => {}
        }
    }

    let mut count = 0;
    for step in &steps {
        if step.id() > last_id || applied.contains(&step.id()) {
            continue;
        }
        let mut tx = pool.begin().await?;
        step.up(&mut tx)
            .await
            .map_err(|e| e.context(format!("migration {} ({}) failed", step.id(), step.name())))?;
        sqlx::query("INSERT INTO _schema_migrations (id, name) VALUES ($1, $2)")
            .bind(step.id())
            .bind(step.name())
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        tracing::info!("Applied migration {} ({})", step.id(), step.name());
        count += 1;
    }
    Ok(count)
}

/// Revert the most recently applied step. Refuses an irreversible step with
/// a typed error before its `down` is ever invoked. Returns the reverted
/// step's id and name, or `None` when nothing is applied.
pub async fn revert_last(pool: &PgPool) -> anyhow::Result<Option<(i64, &'static str)>> {
    ensure_ledger(pool).await?;
    let steps = registry();
    validate_registry(&steps)?;
    let applied = applied_ids(pool).await?;

    let Some(last) = applied.iter().next_back().copied() else {
        return Ok(None);
    };
    let step = steps
        .iter()
        .find(|s| s.id() == last)
        .ok_or(MigrateError::UnknownApplied { id: last })?;

    if !step.reversible() {
        return Err(MigrateError::Irreversible {
            id: step.id(),
            name: step.name(),
        }
        .into());
    }

    let mut tx = pool.begin().await?;
    step.down(&mut tx)
        .await
        .map_err(|e| e.context(format!("revert of {} ({}) failed", step.id(), step.name())))?;
    sqlx::query("DELETE FROM _schema_migrations WHERE id = $1")
        .bind(step.id())
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    tracing::info!("Reverted migration {} ({})", step.id(), step.name());
    Ok(Some((step.id(), step.name())))
}
