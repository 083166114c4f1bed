//! Shared fixtures for endpoint tests: an in-memory app state and a
//! scripted board API fake.

// Each test binary uses a different subset of these helpers.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use pressline_core::{
    BoardApi, BoardCacheConfig, BoardCredentials, BoardError, BoardSyncCache, ColumnTargets,
    FetchedItem, ItemsPageChunk, MemoryScanStore, ScanUrlSigner, StageColumnUpdater,
};
use pressline_model::{BoardItem, ItemId, StageLabels};
use pressline_server::{AppState, Config};

pub const TEST_SECRET: &str = "test-secret";

/// Scripted [`BoardApi`]: pops pre-seeded page results and records every
/// column mutation.
#[derive(Default)]
pub struct ScriptedBoardApi {
    pages: Mutex<VecDeque<Result<ItemsPageChunk, BoardError>>>,
    pub column_calls: Mutex<Vec<(String, String, Value)>>,
    pub fail_column_updates: bool,
    pub page_fetches: AtomicUsize,
}

impl ScriptedBoardApi {
    pub fn with_pages(pages: Vec<Result<ItemsPageChunk, BoardError>>) -> Self {
        Self {
            pages: Mutex::new(pages.into()),
            ..Default::default()
        }
    }

    pub fn failing_columns() -> Self {
        Self {
            fail_column_updates: true,
            ..Default::default()
        }
    }
}

#[async_trait]
impl BoardApi for ScriptedBoardApi {
    async fn items_page(
        &self,
        _limit: i64,
        _cursor: Option<&str>,
    ) -> Result<ItemsPageChunk, BoardError> {
        self.page_fetches.fetch_add(1, Ordering::SeqCst);
        self.pages
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Err(BoardError::Api("no more scripted pages".into())))
    }

    async fn change_column_value(
        &self,
        item_id: &ItemId,
        column_id: &str,
        value: &Value,
    ) -> Result<(), BoardError> {
        if self.fail_column_updates {
            return Err(BoardError::Api("mirror down".into()));
        }
        self.column_calls.lock().await.push((
            item_id.to_string(),
            column_id.to_string(),
            value.clone(),
        ));
        Ok(())
    }
}

pub fn board_item(id: &str, group: Option<&str>) -> FetchedItem {
    FetchedItem {
        group_title: group.map(str::to_string),
        item: BoardItem {
            id: id.to_string(),
            name: format!("Job {id}"),
            subitems: Vec::new(),
        },
    }
}

pub fn page(
    items: Vec<FetchedItem>,
    cursor: Option<&str>,
) -> Result<ItemsPageChunk, BoardError> {
    Ok(ItemsPageChunk {
        cursor: cursor.map(str::to_string),
        items,
    })
}

pub struct TestApp {
    pub state: AppState,
    pub store: Arc<MemoryScanStore>,
    pub board_api: Arc<ScriptedBoardApi>,
}

/// Build an app over the in-memory store and the given scripted board
/// API; `authenticated` controls whether a board token is installed.
pub fn test_app(board_api: ScriptedBoardApi, authenticated: bool) -> TestApp {
    let mut config = Config::default();
    config.server.public_base_url = Some("https://floor.test".to_string());
    let labels = Arc::new(StageLabels::default());
    let board_api = Arc::new(board_api);

    let store = Arc::new(MemoryScanStore::new(Arc::clone(&labels)));
    let signer = Arc::new(ScanUrlSigner::new(TEST_SECRET, None).unwrap());
    let credentials = Arc::new(BoardCredentials::new(
        authenticated.then(|| "test-token".to_string()),
    ));

    let api: Arc<dyn BoardApi> = board_api.clone();
    let board_cache = Arc::new(BoardSyncCache::new(
        Arc::clone(&api),
        BoardCacheConfig::default(),
    ));
    let column_updater = Arc::new(StageColumnUpdater::new(
        Arc::clone(&api),
        ColumnTargets {
            checked_in_column_id: Some("check_col".to_string()),
            status_column_id: Some("status_col".to_string()),
        },
        labels,
    ));

    let state = AppState {
        config: Arc::new(config),
        store: store.clone(),
        signer,
        board_cache,
        column_updater,
        credentials,
    };

    TestApp {
        state,
        store,
        board_api,
    }
}
