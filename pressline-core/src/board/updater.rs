use std::fmt;
use std::sync::Arc;

use pressline_model::{ItemId, ScanStage, StageLabels};
use serde_json::json;
use tracing::info;

use super::api::{BoardApi, BoardError};

/// Which board columns mirror the scan state. Either id may be left
/// unconfigured to skip that projection.
#[derive(Debug, Clone, Default)]
pub struct ColumnTargets {
    pub checked_in_column_id: Option<String>,
    pub status_column_id: Option<String>,
}

/// Projects a committed scan advance onto the external board.
///
/// The internal counter is authoritative; these pushes are best-effort
/// mirror writes. A failure here is surfaced to the caller of the scan
/// request but never rolls back the advance, since the physical scan
/// already happened. Each write is idempotent at the field level.
pub struct StageColumnUpdater {
    api: Arc<dyn BoardApi>,
    targets: ColumnTargets,
    labels: Arc<StageLabels>,
}

impl StageColumnUpdater {
    pub fn new(api: Arc<dyn BoardApi>, targets: ColumnTargets, labels: Arc<StageLabels>) -> Self {
        Self {
            api,
            targets,
            labels,
        }
    }

    /// Push the field updates implied by the item's new scan count.
    ///
    /// Count 1 flips the checked-in checkbox (one-shot; later advances
    /// leave it alone). Counts 2 and 3 set the status column to the
    /// configured stage label.
    pub async fn project(&self, item_id: &ItemId, scan_count: i32) -> Result<(), BoardError> {
        if scan_count == 1
            && let Some(column) = &self.targets.checked_in_column_id
        {
            self.api
                .change_column_value(item_id, column, &json!({ "checked": "true" }))
                .await?;
            info!(item = %item_id, column, "marked item checked in on the board");
        }

        if scan_count >= 2
            && let Some(column) = &self.targets.status_column_id
        {
            let label = self.labels.label_for(ScanStage::from_count(scan_count));
            self.api
                .change_column_value(item_id, column, &json!({ "label": label }))
                .await?;
            info!(item = %item_id, column, label, "updated board status column");
        }

        Ok(())
    }
}

impl fmt::Debug for StageColumnUpdater {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StageColumnUpdater")
            .field("targets", &self.targets)
            .finish_non_exhaustive()
    }
}
