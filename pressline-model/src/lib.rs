//! Core data model definitions shared across Pressline crates.
#![allow(missing_docs)]

pub mod board;
pub mod ids;
pub mod scan;

// Intentionally curated re-exports for downstream consumers.
pub use board::{BoardGroup, BoardItem, BoardSnapshot, ColumnValue, ItemsPage, SubitemRow};
pub use ids::ItemId;
pub use scan::{MAX_SCAN_COUNT, ScanAdvance, ScanEvent, ScanRecord, ScanStage, StageLabels};
