use chrono::{DateTime, Utc};

use crate::ids::ItemId;

/// Highest scan count a job can reach; later scans saturate here.
pub const MAX_SCAN_COUNT: i32 = 3;

/// Production stage derived from a job's scan count.
///
/// The mapping is fixed; the human-visible wording for each stage comes
/// from [`StageLabels`] so deployments can rename stages without a schema
/// change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ScanStage {
    /// No scan recorded yet.
    Pending,
    /// First scan: the job arrived on the floor.
    CheckedIn,
    /// Second scan: the job is being worked.
    InProduction,
    /// Third scan: the job left the floor.
    Completed,
}

impl ScanStage {
    /// Map a stored scan count onto its stage. Counts above the cap clamp
    /// to [`ScanStage::Completed`]; negative counts are treated as zero.
    pub fn from_count(count: i32) -> Self {
        match count {
            i32::MIN..=0 => ScanStage::Pending,
            1 => ScanStage::CheckedIn,
            2 => ScanStage::InProduction,
            _ => ScanStage::Completed,
        }
    }
}

/// Configured wording for each stage.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StageLabels {
    pub pending: String,
    pub step1: String,
    pub step2: String,
    pub step3: String,
}

impl StageLabels {
    pub fn label_for(&self, stage: ScanStage) -> &str {
        match stage {
            ScanStage::Pending => &self.pending,
            ScanStage::CheckedIn => &self.step1,
            ScanStage::InProduction => &self.step2,
            ScanStage::Completed => &self.step3,
        }
    }
}

impl Default for StageLabels {
    fn default() -> Self {
        Self {
            pending: "Pending".to_string(),
            step1: "Checked In".to_string(),
            step2: "In Production".to_string(),
            step3: "Completed".to_string(),
        }
    }
}

/// Durable per-item scan state.
///
/// Created lazily on the first scan of an item and only ever mutated by
/// the progression engine; the count never decreases and never exceeds
/// [`MAX_SCAN_COUNT`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ScanRecord {
    pub item_id: ItemId,
    pub scan_count: i32,
    pub status: String,
    pub last_scanned_at: DateTime<Utc>,
}

/// Append-only audit row written for every advance, including saturated
/// ones. Never updated and never read back by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScanEvent {
    pub item_id: ItemId,
    pub scan_number: i32,
    pub new_status: String,
    pub scanned_at: DateTime<Utc>,
}

/// Result of a single advance, returned to the scan endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScanAdvance {
    pub scan_count: i32,
    pub status: String,
}
