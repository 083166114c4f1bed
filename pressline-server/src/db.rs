use anyhow::Context;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

pub async fn connect(url: &str, max_connections: u32) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(url)
        .await
        .context("failed to connect to Postgres")?;

    // Health check
    sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(&pool)
        .await
        .context("Postgres health check failed")?;
    info!("connected to Postgres");

    Ok(pool)
}

/// Idempotent schema bootstrap, run once at startup.
pub async fn ensure_schema(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS job_scans (
            id BIGSERIAL PRIMARY KEY,
            item_id VARCHAR(64) NOT NULL UNIQUE,
            scan_count INT NOT NULL DEFAULT 0,
            status TEXT NOT NULL,
            last_scanned_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await
    .context("failed to create job_scans")?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS job_scan_events (
            id BIGSERIAL PRIMARY KEY,
            item_id VARCHAR(64) NOT NULL,
            scan_number INT NOT NULL,
            new_status TEXT NOT NULL,
            scanned_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await
    .context("failed to create job_scan_events")?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS job_scan_events_item_id_idx
        ON job_scan_events (item_id)
        "#,
    )
    .execute(pool)
    .await
    .context("failed to index job_scan_events")?;

    Ok(())
}
