//! Pure progression logic for the three-stage scan counter.
//!
//! Kept free of storage concerns so both store implementations share the
//! exact same transition function.

use pressline_model::{MAX_SCAN_COUNT, ScanStage};

/// The computed target of one advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NextScan {
    pub scan_count: i32,
    pub stage: ScanStage,
}

/// Compute the transition for an item currently at `current`.
///
/// Saturating: a fourth or later scan keeps the counter at the cap but is
/// still a legitimate advance from the caller's perspective (the event is
/// logged either way). Counts below zero are treated as zero.
pub fn advance(current: i32) -> NextScan {
    let scan_count = current.clamp(0, MAX_SCAN_COUNT).saturating_add(1).min(MAX_SCAN_COUNT);
    NextScan {
        scan_count,
        stage: ScanStage::from_count(scan_count),
    }
}
