//! Durable scan state: the `ScanStateStore` port and its Postgres and
//! in-memory implementations.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use pressline_model::{ItemId, ScanAdvance, ScanRecord};
use thiserror::Error;

pub use memory::MemoryScanStore;
pub use postgres::PostgresScanStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Port over the per-item scan counter and its append-only event log.
///
/// Implementations must serialize `advance` per item id (two simultaneous
/// scans of the same barcode may never both observe the same current
/// count) while leaving advances of different items free to interleave.
#[async_trait]
pub trait ScanStateStore: Send + Sync {
    /// Advance the item one stage, creating the record on first scan.
    ///
    /// Saturates at the stage cap; an event row is appended
    /// unconditionally, saturated or not. On error nothing is persisted.
    async fn advance(&self, item_id: &ItemId) -> Result<ScanAdvance, StoreError>;

    /// Bulk read of all known records, for the dashboard's progress
    /// indicators.
    async fn states(&self) -> Result<Vec<ScanRecord>, StoreError>;
}
