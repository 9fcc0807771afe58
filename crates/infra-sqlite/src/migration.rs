// Schema Runner

use sqlx::Connection;
use tracing::info;

use dispatchq_core::error::Result;

use crate::connection::ResilientConnection;

const MIGRATIONS: &[(i64, &str)] = &[(1, include_str!("../migrations/001_initial_schema.sql"))];

/// Apply any schema versions the store has not seen yet. Idempotent; safe to
/// run at every process start.
pub async fn run_migrations(conn: &ResilientConnection) -> Result<()> {
    let current_version = current_version(conn).await?;
    info!(current_version, "checking schema");

    for (version, sql) in MIGRATIONS {
        if *version > current_version {
            info!(version, "applying schema migration");
            apply_migration(conn, *version, sql).await?;
        }
    }
    Ok(())
}

/// Remove the job table and its bookkeeping. Counterpart to
/// [`run_migrations`] for tests and local resets.
pub async fn drop_schema(conn: &ResilientConnection) -> Result<()> {
    conn.run(|c| {
        Box::pin(async move {
            sqlx::query("DROP TABLE IF EXISTS jobs").execute(&mut *c).await?;
            sqlx::query("DROP TABLE IF EXISTS schema_version")
                .execute(&mut *c)
                .await?;
            Ok(())
        })
    })
    .await
}

async fn current_version(conn: &ResilientConnection) -> Result<i64> {
    let table_exists: i64 = conn
        .run(|c| {
            Box::pin(async move {
                sqlx::query_scalar(
                    "SELECT COUNT(*) FROM sqlite_master \
                     WHERE type = 'table' AND name = 'schema_version'",
                )
                .fetch_one(&mut *c)
                .await
            })
        })
        .await?;

    if table_exists == 0 {
        return Ok(0);
    }

    let version: Option<i64> = conn
        .run(|c| {
            Box::pin(async move {
                sqlx::query_scalar("SELECT MAX(version) FROM schema_version")
                    .fetch_one(&mut *c)
                    .await
            })
        })
        .await?;
    Ok(version.unwrap_or(0))
}

/// Apply one migration file inside a transaction, statement by statement.
async fn apply_migration(conn: &ResilientConnection, version: i64, sql: &str) -> Result<()> {
    let statements: Vec<String> = sql
        .split(';')
        .map(|statement| {
            statement
                .lines()
                .filter(|line| !line.trim().starts_with("--"))
                .collect::<Vec<_>>()
                .join("\n")
                .trim()
                .to_string()
        })
        .filter(|statement| !statement.is_empty())
        .collect();

    conn.run(move |c| {
        Box::pin(async move {
            let mut tx = c.begin().await?;
            for statement in &statements {
                sqlx::query(statement).execute(&mut *tx).await?;
            }
            sqlx::query("INSERT INTO schema_version (version) VALUES (?1)")
                .bind(version)
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;
            Ok(())
        })
    })
    .await
}
