use std::fmt;
use std::sync::Arc;

use tracing::{info, warn};

use pressline_core::{
    BoardApi, BoardCacheConfig, BoardCredentials, BoardSyncCache, ColumnTargets, MemoryScanStore,
    MondayBoardApi, MondayBoardConfig, PostgresScanStore, ScanStateStore, ScanUrlSigner,
    StageColumnUpdater,
};

use crate::db;
use crate::infra::config::Config;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn ScanStateStore>,
    pub signer: Arc<ScanUrlSigner>,
    pub board_cache: Arc<BoardSyncCache>,
    pub column_updater: Arc<StageColumnUpdater>,
    pub credentials: Arc<BoardCredentials>,
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState").finish_non_exhaustive()
    }
}

impl AppState {
    /// Wire the full component graph from configuration: credential
    /// holder, signer, board provider, cache, updater, and whichever scan
    /// store the configuration selects.
    pub async fn from_config(config: Config) -> anyhow::Result<Self> {
        let config = Arc::new(config);
        let labels = Arc::new(config.scan.labels.clone());

        let signer = Arc::new(ScanUrlSigner::new(
            config.scan.secret.as_bytes(),
            config.scan.token_max_age,
        )?);

        let credentials = Arc::new(BoardCredentials::new(config.board.api_token.clone()));
        if !credentials.is_authenticated() {
            warn!("no board API token configured; board endpoints will return 401");
        }

        let board_api: Arc<dyn BoardApi> = Arc::new(MondayBoardApi::new(
            MondayBoardConfig {
                api_url: config.board.api_url.clone(),
                board_id: config.board.board_id.clone(),
                subitem_column_ids: config.board.subitem_column_ids.clone(),
                request_timeout: config.board.request_timeout,
            },
            Arc::clone(&credentials),
        ));

        let board_cache = Arc::new(BoardSyncCache::new(
            Arc::clone(&board_api),
            BoardCacheConfig {
                ttl: config.board.cache_ttl,
                page_limit: config.board.page_limit,
                max_pages: config.board.max_pages,
            },
        ));

        let column_updater = Arc::new(StageColumnUpdater::new(
            Arc::clone(&board_api),
            ColumnTargets {
                checked_in_column_id: config.board.checked_in_column_id.clone(),
                status_column_id: config.board.status_column_id.clone(),
            },
            Arc::clone(&labels),
        ));

        let store: Arc<dyn ScanStateStore> = match &config.database.url {
            Some(url) => {
                let pool = db::connect(url, config.database.max_connections).await?;
                db::ensure_schema(&pool).await?;
                info!("scan state persisted in Postgres");
                Arc::new(PostgresScanStore::new(pool, Arc::clone(&labels)))
            }
            None => {
                warn!("DATABASE_URL not set; scan state will not survive restarts");
                Arc::new(MemoryScanStore::new(Arc::clone(&labels)))
            }
        };

        Ok(Self {
            config,
            store,
            signer,
            board_cache,
            column_updater,
            credentials,
        })
    }
}
