use anyhow::Context;
use sqlx::SqlitePool;

use bookshelf_kernel::ModuleRegistry;

/// Bookkeeping table recording which module migrations already ran.
pub const MIGRATIONS_TABLE: &str = "_bookshelf_migrations";

/// Apply every migration contributed by `registry` that is not recorded yet.
///
/// Each migration runs in its own transaction together with its bookkeeping
/// row, so a failed migration leaves no partial trace. Returns the number of
/// migrations applied by this call.
pub async fn migrate(pool: &SqlitePool, registry: &ModuleRegistry) -> anyhow::Result<usize> {
    sqlx::query(&format!(
        "CREATE TABLE IF NOT EXISTS {MIGRATIONS_TABLE} (
            module     TEXT NOT NULL,
            id         TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            PRIMARY KEY (module, id)
        )"
    ))
    .execute(pool)
    .await
    .context("failed to create migrations table")?;

    let applied = applied_migrations(pool).await?;
    let mut count = 0;

    for (module, migration) in registry.collect_migrations() {
        if applied
            .iter()
            .any(|(m, id)| m == &module && id == migration.id)
        {
            continue;
        }

        tracing::info!(
            target: "bookshelf-db",
            module = %module,
            migration = migration.id,
            "applying migration"
        );

        let mut tx = pool.begin().await.context("failed to open transaction")?;
        sqlx::raw_sql(migration.up)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("migration '{}/{}' failed", module, migration.id))?;
        sqlx::query(&format!(
            "INSERT INTO {MIGRATIONS_TABLE} (module, id) VALUES (?, ?)"
        ))
        .bind(&module)
        .bind(migration.id)
        .execute(&mut *tx)
        .await
        .context("failed to record migration")?;
        tx.commit().await.context("failed to commit migration")?;

        count += 1;
    }

    Ok(count)
}

/// `(module, id)` pairs already applied, oldest first.
pub async fn applied_migrations(pool: &SqlitePool) -> anyhow::Result<Vec<(String, String)>> {
    let rows: Vec<(String, String)> = sqlx::query_as(&format!(
        "SELECT module, id FROM {MIGRATIONS_TABLE} ORDER BY rowid"
    ))
    .fetch_all(pool)
    .await
    .context("failed to read applied migrations")?;
    Ok(rows)
}
