use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use pressline_model::{BoardGroup, BoardItem, BoardSnapshot, ItemsPage};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::api::{BoardApi, BoardError, FetchedItem};

/// Bucket for items whose group the provider did not report.
const UNGROUPED: &str = "Ungrouped";

#[derive(Debug, Clone)]
pub struct BoardCacheConfig {
    pub ttl: Duration,
    pub page_limit: i64,
    /// Upper bound on pages per refresh, bounding cost even for very
    /// large boards.
    pub max_pages: u32,
}

impl Default for BoardCacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(300),
            page_limit: 50,
            max_pages: 2,
        }
    }
}

type SharedRefresh = Shared<BoxFuture<'static, Result<Arc<BoardSnapshot>, Arc<BoardError>>>>;

struct CachedSnapshot {
    data: Arc<BoardSnapshot>,
    expires_at: Instant,
}

#[derive(Default)]
struct CacheState {
    snapshot: Option<CachedSnapshot>,
    in_flight: Option<SharedRefresh>,
    /// Bumped each time a refresh starts, so an awaiter that slept
    /// through a whole refresh cycle cannot clear its successor.
    epoch: u64,
}

/// TTL cache over the paginated board fetch, with request coalescing.
///
/// At most one refresh runs per cache instance at any time: concurrent
/// callers that miss the TTL all await the same shared future instead of
/// multiplying load on the rate-limited provider. The in-flight slot is
/// cleared whether the refresh succeeds or fails, and a failed refresh
/// never overwrites a previously cached snapshot.
pub struct BoardSyncCache {
    api: Arc<dyn BoardApi>,
    config: BoardCacheConfig,
    state: Mutex<CacheState>,
}

impl BoardSyncCache {
    pub fn new(api: Arc<dyn BoardApi>, config: BoardCacheConfig) -> Self {
        Self {
            api,
            config,
            state: Mutex::new(CacheState::default()),
        }
    }

    /// Return the cached snapshot, refreshing it first when stale.
    ///
    /// Errors are `Arc`-wrapped because one failed refresh is observed by
    /// every caller that was coalesced onto it.
    pub async fn get(&self) -> Result<Arc<BoardSnapshot>, Arc<BoardError>> {
        let (refresh, epoch) = {
            let mut state = self.state.lock().await;
            if let Some(cached) = state.snapshot.as_ref()
                && cached.expires_at > Instant::now()
            {
                return Ok(Arc::clone(&cached.data));
            }
            match state.in_flight.as_ref() {
                Some(in_flight) => (in_flight.clone(), state.epoch),
                None => {
                    let api = Arc::clone(&self.api);
                    let config = self.config.clone();
                    let refresh: SharedRefresh = async move {
                        refresh_snapshot(api, config)
                            .await
                            .map(Arc::new)
                            .map_err(Arc::new)
                    }
                    .boxed()
                    .shared();
                    state.epoch += 1;
                    state.in_flight = Some(refresh.clone());
                    (refresh, state.epoch)
                }
            }
        };

        let result = refresh.await;

        // First awaiter back publishes and clears the slot; later awaiters
        // of the same refresh must not disturb a newer one.
        let mut state = self.state.lock().await;
        if state.epoch == epoch && state.in_flight.is_some() {
            state.in_flight = None;
            if let Ok(snapshot) = &result {
                state.snapshot = Some(CachedSnapshot {
                    data: Arc::clone(snapshot),
                    expires_at: Instant::now() + self.config.ttl,
                });
            }
        }

        result
    }

    #[cfg(test)]
    async fn force_expire(&self) {
        let mut state = self.state.lock().await;
        if let Some(cached) = state.snapshot.as_mut() {
            cached.expires_at = Instant::now();
        }
    }

    #[cfg(test)]
    async fn cached(&self) -> Option<Arc<BoardSnapshot>> {
        self.state
            .lock()
            .await
            .snapshot
            .as_ref()
            .map(|c| Arc::clone(&c.data))
    }
}

impl fmt::Debug for BoardSyncCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoardSyncCache")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// One full paginated fetch, normalized into a snapshot.
///
/// Complexity policy: a cost rejection mid-pagination ends the fetch and
/// the items gathered so far become the snapshot (staler-but-available).
/// A rejection on the first page has nothing to serve and is a failure,
/// so an empty snapshot never replaces real data.
async fn refresh_snapshot(
    api: Arc<dyn BoardApi>,
    config: BoardCacheConfig,
) -> Result<BoardSnapshot, BoardError> {
    let mut items: Vec<FetchedItem> = Vec::new();
    let mut cursor: Option<String> = None;

    for page in 0..config.max_pages {
        match api.items_page(config.page_limit, cursor.as_deref()).await {
            Ok(chunk) => {
                items.extend(chunk.items);
                cursor = chunk.cursor;
                if cursor.is_none() {
                    break;
                }
            }
            Err(BoardError::ComplexityBudget(reason)) if !items.is_empty() => {
                warn!(
                    page,
                    %reason,
                    fetched = items.len(),
                    "complexity budget exhausted mid-refresh; serving partial board"
                );
                cursor = None;
                break;
            }
            Err(err) => return Err(err),
        }
    }

    if cursor.is_some() {
        debug!(
            max_pages = config.max_pages,
            "page cap reached before the cursor ran out"
        );
    }

    Ok(group_items(items))
}

fn group_items(items: Vec<FetchedItem>) -> BoardSnapshot {
    let mut grouped: BTreeMap<String, Vec<BoardItem>> = BTreeMap::new();
    for fetched in items {
        let title = fetched
            .group_title
            .unwrap_or_else(|| UNGROUPED.to_string());
        grouped.entry(title).or_default().push(fetched.item);
    }

    BoardSnapshot {
        groups: grouped
            .into_iter()
            .map(|(title, items)| BoardGroup {
                title,
                items_page: ItemsPage { items },
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::super::api::ItemsPageChunk;
    use super::*;
    use pressline_model::ItemId;

    /// Scripted [`BoardApi`]: serves a queue of page results, optionally
    /// delaying each response so tests can overlap callers.
    struct ScriptedApi {
        pages: Mutex<VecDeque<Result<ItemsPageChunk, BoardError>>>,
        delay: Duration,
        calls: AtomicUsize,
    }

    impl ScriptedApi {
        fn new(pages: Vec<Result<ItemsPageChunk, BoardError>>) -> Arc<Self> {
            Arc::new(Self {
                pages: Mutex::new(pages.into()),
                delay: Duration::ZERO,
                calls: AtomicUsize::new(0),
            })
        }

        fn with_delay(pages: Vec<Result<ItemsPageChunk, BoardError>>, delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                pages: Mutex::new(pages.into()),
                delay,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl BoardApi for ScriptedApi {
        async fn items_page(
            &self,
            _limit: i64,
            _cursor: Option<&str>,
        ) -> Result<ItemsPageChunk, BoardError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.pages
                .lock()
                .await
                .pop_front()
                .unwrap_or_else(|| Ok(ItemsPageChunk::default()))
        }

        async fn change_column_value(
            &self,
            _item_id: &ItemId,
            _column_id: &str,
            _value: &serde_json::Value,
        ) -> Result<(), BoardError> {
            Ok(())
        }
    }

    fn fetched(id: &str, group: Option<&str>) -> FetchedItem {
        FetchedItem {
            group_title: group.map(str::to_string),
            item: BoardItem {
                id: id.to_string(),
                name: format!("Job {id}"),
                subitems: Vec::new(),
            },
        }
    }

    fn page(items: Vec<FetchedItem>, cursor: Option<&str>) -> Result<ItemsPageChunk, BoardError> {
        Ok(ItemsPageChunk {
            cursor: cursor.map(str::to_string),
            items,
        })
    }

    fn config(max_pages: u32) -> BoardCacheConfig {
        BoardCacheConfig {
            ttl: Duration::from_secs(60),
            page_limit: 50,
            max_pages,
        }
    }

    #[tokio::test]
    async fn concurrent_cold_reads_share_one_fetch() {
        let api = ScriptedApi::with_delay(
            vec![page(vec![fetched("1", Some("A"))], None)],
            Duration::from_millis(25),
        );
        let cache = BoardSyncCache::new(api.clone(), config(2));

        let (a, b) = tokio::join!(cache.get(), cache.get());
        assert_eq!(a.unwrap().item_count(), 1);
        assert_eq!(b.unwrap().item_count(), 1);
        assert_eq!(api.calls(), 1);
    }

    #[tokio::test]
    async fn fresh_snapshot_skips_the_network() {
        let api = ScriptedApi::new(vec![page(vec![fetched("1", Some("A"))], None)]);
        let cache = BoardSyncCache::new(api.clone(), config(2));

        cache.get().await.unwrap();
        cache.get().await.unwrap();
        assert_eq!(api.calls(), 1);
    }

    #[tokio::test]
    async fn expired_snapshot_refetches() {
        let api = ScriptedApi::new(vec![
            page(vec![fetched("1", Some("A"))], None),
            page(vec![fetched("2", Some("A"))], None),
        ]);
        let cache = BoardSyncCache::new(api.clone(), config(2));

        cache.get().await.unwrap();
        cache.force_expire().await;
        let snapshot = cache.get().await.unwrap();
        assert_eq!(api.calls(), 2);
        assert_eq!(snapshot.groups[0].items_page.items[0].id, "2");
    }

    #[tokio::test]
    async fn pagination_follows_cursor_until_exhausted() {
        let api = ScriptedApi::new(vec![
            page(vec![fetched("1", Some("A"))], Some("c1")),
            page(vec![fetched("2", Some("A"))], None),
        ]);
        let cache = BoardSyncCache::new(api.clone(), config(5));

        let snapshot = cache.get().await.unwrap();
        assert_eq!(snapshot.item_count(), 2);
        assert_eq!(api.calls(), 2);
    }

    #[tokio::test]
    async fn complexity_rejection_mid_run_yields_partial_snapshot() {
        let api = ScriptedApi::new(vec![
            page(vec![fetched("1", Some("A"))], Some("c1")),
            page(vec![fetched("2", Some("A"))], Some("c2")),
            Err(BoardError::ComplexityBudget("reset in 12s".into())),
            page(vec![fetched("never", Some("A"))], None),
        ]);
        let cache = BoardSyncCache::new(api.clone(), config(5));

        let snapshot = cache.get().await.unwrap();
        let ids: Vec<&str> = snapshot.groups[0]
            .items_page
            .items
            .iter()
            .map(|i| i.id.as_str())
            .collect();
        assert_eq!(ids, vec!["1", "2"]);
        assert_eq!(api.calls(), 3);
    }

    #[tokio::test]
    async fn first_page_complexity_rejection_is_a_failure() {
        let api = ScriptedApi::new(vec![Err(BoardError::ComplexityBudget("cold".into()))]);
        let cache = BoardSyncCache::new(api.clone(), config(5));

        let err = cache.get().await.unwrap_err();
        assert!(matches!(*err, BoardError::ComplexityBudget(_)));
        assert!(cache.cached().await.is_none());
    }

    #[tokio::test]
    async fn failed_refresh_keeps_the_previous_snapshot_and_unblocks() {
        let api = ScriptedApi::new(vec![
            page(vec![fetched("1", Some("A"))], None),
            Err(BoardError::Api("boom".into())),
            page(vec![fetched("2", Some("A"))], None),
        ]);
        let cache = BoardSyncCache::new(api.clone(), config(2));

        let first = cache.get().await.unwrap();
        cache.force_expire().await;

        let err = cache.get().await.unwrap_err();
        assert!(matches!(*err, BoardError::Api(_)));
        // Old data still cached, in-flight slot released for the retry.
        assert_eq!(cache.cached().await.as_deref(), Some(first.as_ref()));
        let third = cache.get().await.unwrap();
        assert_eq!(third.groups[0].items_page.items[0].id, "2");
        assert_eq!(api.calls(), 3);
    }

    #[tokio::test]
    async fn grouping_buckets_by_title_with_ungrouped_fallback() {
        let api = ScriptedApi::new(vec![page(
            vec![
                fetched("3", Some("Next Week")),
                fetched("1", Some("This Week")),
                fetched("2", None),
            ],
            None,
        )]);
        let cache = BoardSyncCache::new(api, config(2));

        let snapshot = cache.get().await.unwrap();
        let titles: Vec<&str> = snapshot.groups.iter().map(|g| g.title.as_str()).collect();
        assert_eq!(titles, vec!["Next Week", "This Week", "Ungrouped"]);
        assert_eq!(snapshot.groups[2].items_page.items[0].id, "2");
    }
}
