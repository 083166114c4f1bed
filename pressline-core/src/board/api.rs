use async_trait::async_trait;
use pressline_model::{BoardItem, ItemId};

#[derive(Debug, thiserror::Error)]
pub enum BoardError {
    #[error("not authenticated with the board provider")]
    NotAuthenticated,

    #[error("board API error: {0}")]
    Api(String),

    /// The provider's cost-based rate limit, distinct from plain HTTP
    /// throttling; pagination reacts to this class specifically.
    #[error("complexity budget exhausted: {0}")]
    ComplexityBudget(String),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("parse error: {0}")]
    Parse(String),
}

/// One fetched item together with the title of its containing group;
/// grouping into the snapshot happens cache-side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedItem {
    pub group_title: Option<String>,
    pub item: BoardItem,
}

/// One page of the paginated board fetch. `cursor: None` means the last
/// page was reached.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemsPageChunk {
    pub cursor: Option<String>,
    pub items: Vec<FetchedItem>,
}

/// Port over the external board API.
///
/// Kept provider-neutral so the cache and the column updater can be
/// exercised against scripted fakes in tests.
#[async_trait]
pub trait BoardApi: Send + Sync {
    /// Fetch one page of board items (with nested sub-items), resuming
    /// from `cursor` when given.
    async fn items_page(
        &self,
        limit: i64,
        cursor: Option<&str>,
    ) -> Result<ItemsPageChunk, BoardError>;

    /// Set a single column value on an item. Field-level idempotent:
    /// repeating the same set has no additional effect on the board.
    async fn change_column_value(
        &self,
        item_id: &ItemId,
        column_id: &str,
        value: &serde_json::Value,
    ) -> Result<(), BoardError>;
}
