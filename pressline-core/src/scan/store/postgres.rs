use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use pressline_model::{ItemId, ScanAdvance, ScanRecord, StageLabels};
use sqlx::PgPool;

use super::{ScanStateStore, StoreError};
use crate::scan::progression;

/// Postgres-backed scan store.
///
/// `advance` runs inside a transaction that takes a row lock on the item
/// (`SELECT .. FOR UPDATE`), so concurrent scans of the same barcode are
/// serialized by the database while different items proceed in parallel.
#[derive(Debug, Clone)]
pub struct PostgresScanStore {
    pool: PgPool,
    labels: Arc<StageLabels>,
}

impl PostgresScanStore {
    pub fn new(pool: PgPool, labels: Arc<StageLabels>) -> Self {
        Self { pool, labels }
    }
}

#[async_trait]
impl ScanStateStore for PostgresScanStore {
    async fn advance(&self, item_id: &ItemId) -> Result<ScanAdvance, StoreError> {
        let mut tx = self.pool.begin().await?;

        // Lazily create the record at count zero; a concurrent first scan
        // loses the insert race harmlessly.
        sqlx::query(
            r#"
            INSERT INTO job_scans (item_id, scan_count, status)
            VALUES ($1, 0, $2)
            ON CONFLICT (item_id) DO NOTHING
            "#,
        )
        .bind(item_id.as_str())
        .bind(&self.labels.pending)
        .execute(&mut *tx)
        .await?;

        let current: i32 = sqlx::query_scalar(
            r#"
            SELECT scan_count FROM job_scans
            WHERE item_id = $1
            FOR UPDATE
            "#,
        )
        .bind(item_id.as_str())
        .fetch_one(&mut *tx)
        .await?;

        let next = progression::advance(current);
        let status = self.labels.label_for(next.stage).to_string();
        let now = Utc::now();

        sqlx::query(
            r#"
            UPDATE job_scans
            SET scan_count = $2, status = $3, last_scanned_at = $4
            WHERE item_id = $1
            "#,
        )
        .bind(item_id.as_str())
        .bind(next.scan_count)
        .bind(&status)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        // Audit row is written even when the counter saturated.
        sqlx::query(
            r#"
            INSERT INTO job_scan_events (item_id, scan_number, new_status, scanned_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(item_id.as_str())
        .bind(next.scan_count)
        .bind(&status)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(ScanAdvance {
            scan_count: next.scan_count,
            status,
        })
    }

    async fn states(&self) -> Result<Vec<ScanRecord>, StoreError> {
        let records = sqlx::query_as::<_, ScanRecord>(
            r#"
            SELECT item_id, scan_count, status, last_scanned_at
            FROM job_scans
            ORDER BY item_id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }
}
