use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use parking_lot::Mutex;
use pressline_model::{ItemId, ScanAdvance, ScanEvent, ScanRecord, StageLabels};

use super::{ScanStateStore, StoreError};
use crate::scan::progression;

/// In-memory scan store.
///
/// Backs the server when no database is configured (development mode) and
/// the endpoint tests. The read-modify-write happens under the dashmap
/// entry guard, which serializes advances of the same item the way the
/// Postgres row lock does.
#[derive(Debug, Default)]
pub struct MemoryScanStore {
    labels: Arc<StageLabels>,
    records: DashMap<ItemId, ScanRecord>,
    events: Mutex<Vec<ScanEvent>>,
}

impl MemoryScanStore {
    pub fn new(labels: Arc<StageLabels>) -> Self {
        Self {
            labels,
            records: DashMap::new(),
            events: Mutex::new(Vec::new()),
        }
    }

    /// Snapshot of the event log, oldest first.
    pub fn events(&self) -> Vec<ScanEvent> {
        self.events.lock().clone()
    }

    pub fn record(&self, item_id: &ItemId) -> Option<ScanRecord> {
        self.records.get(item_id).map(|r| r.clone())
    }
}

#[async_trait]
impl ScanStateStore for MemoryScanStore {
    async fn advance(&self, item_id: &ItemId) -> Result<ScanAdvance, StoreError> {
        let now = Utc::now();
        let mut entry = self
            .records
            .entry(item_id.clone())
            .or_insert_with(|| ScanRecord {
                item_id: item_id.clone(),
                scan_count: 0,
                status: self.labels.pending.clone(),
                last_scanned_at: now,
            });

        let next = progression::advance(entry.scan_count);
        let status = self.labels.label_for(next.stage).to_string();
        entry.scan_count = next.scan_count;
        entry.status = status.clone();
        entry.last_scanned_at = now;

        // Appended while the entry guard is held so the event order per
        // item matches the order counts were assigned.
        self.events.lock().push(ScanEvent {
            item_id: item_id.clone(),
            scan_number: next.scan_count,
            new_status: status.clone(),
            scanned_at: now,
        });

        Ok(ScanAdvance {
            scan_count: next.scan_count,
            status,
        })
    }

    async fn states(&self) -> Result<Vec<ScanRecord>, StoreError> {
        let mut records: Vec<ScanRecord> =
            self.records.iter().map(|r| r.value().clone()).collect();
        records.sort_by(|a, b| a.item_id.cmp(&b.item_id));
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> Arc<MemoryScanStore> {
        Arc::new(MemoryScanStore::new(Arc::new(StageLabels::default())))
    }

    #[tokio::test]
    async fn three_scans_walk_the_stages_and_log_each() {
        let store = store();
        let item = ItemId::from("501");

        let mut statuses = Vec::new();
        for _ in 0..3 {
            statuses.push(store.advance(&item).await.unwrap().status);
        }
        assert_eq!(statuses, vec!["Checked In", "In Production", "Completed"]);

        let events = store.events();
        assert_eq!(
            events.iter().map(|e| e.scan_number).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
    }

    #[tokio::test]
    async fn fourth_scan_saturates_but_still_logs() {
        let store = store();
        let item = ItemId::from("501");
        for _ in 0..3 {
            store.advance(&item).await.unwrap();
        }

        let fourth = store.advance(&item).await.unwrap();
        assert_eq!(fourth.scan_count, 3);
        assert_eq!(fourth.status, "Completed");

        let events = store.events();
        assert_eq!(events.len(), 4);
        assert_eq!(events[3].scan_number, 3);
    }

    #[tokio::test]
    async fn concurrent_advances_never_double_increment() {
        let store = store();
        let item = ItemId::from("501");

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = Arc::clone(&store);
            let item = item.clone();
            handles.push(tokio::spawn(async move {
                store.advance(&item).await.unwrap()
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let record = store.record(&item).unwrap();
        assert_eq!(record.scan_count, 3);
        assert_eq!(store.events().len(), 8);
    }

    #[tokio::test]
    async fn different_items_progress_independently() {
        let store = store();
        store.advance(&ItemId::from("501")).await.unwrap();
        store.advance(&ItemId::from("502")).await.unwrap();
        store.advance(&ItemId::from("502")).await.unwrap();

        let states = store.states().await.unwrap();
        assert_eq!(states.len(), 2);
        assert_eq!(states[0].item_id.as_str(), "501");
        assert_eq!(states[0].scan_count, 1);
        assert_eq!(states[1].item_id.as_str(), "502");
        assert_eq!(states[1].scan_count, 2);
    }
}
