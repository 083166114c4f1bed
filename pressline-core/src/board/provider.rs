use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use pressline_model::{BoardItem, ColumnValue, ItemId, SubitemRow};
use reqwest::StatusCode;
use reqwest::header::AUTHORIZATION;
use serde_json::{Value, json};
use tracing::debug;

use super::api::{BoardApi, BoardError, FetchedItem, ItemsPageChunk};
use crate::credentials::BoardCredentials;

const ITEMS_PAGE_QUERY: &str = r#"
query ($boardId: [ID!], $limit: Int!, $cursor: String, $columnIds: [String!]) {
  boards(ids: $boardId) {
    items_page(limit: $limit, cursor: $cursor) {
      cursor
      items {
        id
        name
        group { title }
        subitems {
          id
          name
          column_values(ids: $columnIds) { id text }
        }
      }
    }
  }
}
"#;

const CHANGE_COLUMN_QUERY: &str = r#"
mutation ($board: ID!, $item: ID!, $col: String!, $val: JSON!) {
  change_column_value(board_id: $board, item_id: $item, column_id: $col, value: $val) { id }
}
"#;

/// Connection settings for the Monday GraphQL API.
#[derive(Debug, Clone)]
pub struct MondayBoardConfig {
    pub api_url: String,
    pub board_id: String,
    /// Sub-item columns whose text values the dashboard displays.
    pub subitem_column_ids: Vec<String>,
    pub request_timeout: Duration,
}

impl Default for MondayBoardConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.monday.com/v2".to_string(),
            board_id: String::new(),
            subitem_column_ids: Vec::new(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Monday.com implementation of [`BoardApi`].
///
/// Posts GraphQL documents with the injected credential holder's token;
/// every request carries the configured timeout. GraphQL-level errors are
/// classified at this edge, with the provider's cost-based rejections
/// mapped to [`BoardError::ComplexityBudget`].
pub struct MondayBoardApi {
    http: reqwest::Client,
    config: MondayBoardConfig,
    credentials: Arc<BoardCredentials>,
}

impl MondayBoardApi {
    pub fn new(config: MondayBoardConfig, credentials: Arc<BoardCredentials>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .expect("Failed to create HTTP client");
        Self {
            http,
            config,
            credentials,
        }
    }

    async fn gql(&self, query: &str, variables: Value) -> Result<Value, BoardError> {
        let token = self
            .credentials
            .token()
            .ok_or(BoardError::NotAuthenticated)?;

        let response = self
            .http
            .post(&self.config.api_url)
            .header(AUTHORIZATION, token)
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(BoardError::NotAuthenticated);
        }
        if !status.is_success() {
            return Err(BoardError::Api(format!("unexpected status {status}")));
        }

        let body: Value = response.json().await?;
        if let Some(errors) = body.get("errors").and_then(Value::as_array)
            && !errors.is_empty()
        {
            if let Some(err) = errors.iter().find(|e| is_complexity_error(e)) {
                return Err(BoardError::ComplexityBudget(error_message(err)));
            }
            return Err(BoardError::Api(
                errors.iter().map(error_message).collect::<Vec<_>>().join("; "),
            ));
        }

        Ok(body.get("data").cloned().unwrap_or(Value::Null))
    }
}

#[async_trait::async_trait]
impl BoardApi for MondayBoardApi {
    async fn items_page(
        &self,
        limit: i64,
        cursor: Option<&str>,
    ) -> Result<ItemsPageChunk, BoardError> {
        let variables = json!({
            "boardId": [self.config.board_id],
            "limit": limit,
            "cursor": cursor,
            "columnIds": self.config.subitem_column_ids,
        });
        let data = self.gql(ITEMS_PAGE_QUERY, variables).await?;
        Ok(parse_items_page(&data))
    }

    async fn change_column_value(
        &self,
        item_id: &ItemId,
        column_id: &str,
        value: &Value,
    ) -> Result<(), BoardError> {
        // The provider's JSON! scalar wants the value pre-serialized.
        let variables = json!({
            "board": self.config.board_id,
            "item": item_id.as_str(),
            "col": column_id,
            "val": value.to_string(),
        });
        self.gql(CHANGE_COLUMN_QUERY, variables).await?;
        Ok(())
    }
}

impl fmt::Debug for MondayBoardApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MondayBoardApi")
            .field("api_url", &self.config.api_url)
            .field("board_id", &self.config.board_id)
            .finish_non_exhaustive()
    }
}

fn error_message(err: &Value) -> String {
    err.get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| err.to_string())
}

fn is_complexity_error(err: &Value) -> bool {
    let code = err
        .get("extensions")
        .and_then(|e| e.get("code"))
        .or_else(|| err.get("error_code"))
        .and_then(Value::as_str)
        .unwrap_or_default();
    if matches!(code, "ComplexityException" | "COMPLEXITY_BUDGET_EXHAUSTED") {
        return true;
    }
    error_message(err).to_lowercase().contains("complexity budget")
}

/// Decode one page of the items query.
///
/// Deliberately partial-tolerant: the provider's responses are loosely
/// typed and nested fields come and go, so every lookup defaults instead
/// of failing the page.
fn parse_items_page(data: &Value) -> ItemsPageChunk {
    let page = data
        .get("boards")
        .and_then(Value::as_array)
        .and_then(|boards| boards.first())
        .and_then(|board| board.get("items_page"));
    let Some(page) = page else {
        debug!("board response carried no items_page; treating as final page");
        return ItemsPageChunk::default();
    };

    let cursor = page
        .get("cursor")
        .and_then(Value::as_str)
        .filter(|c| !c.is_empty())
        .map(str::to_string);
    let items = page
        .get("items")
        .and_then(Value::as_array)
        .map(|items| items.iter().map(parse_item).collect())
        .unwrap_or_default();

    ItemsPageChunk { cursor, items }
}

fn parse_item(raw: &Value) -> FetchedItem {
    let group_title = raw
        .get("group")
        .and_then(|g| g.get("title"))
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty())
        .map(str::to_string);
    let subitems = raw
        .get("subitems")
        .and_then(Value::as_array)
        .map(|subs| subs.iter().map(parse_subitem).collect())
        .unwrap_or_default();

    FetchedItem {
        group_title,
        item: BoardItem {
            id: text(raw, "id"),
            name: text(raw, "name"),
            subitems,
        },
    }
}

fn parse_subitem(raw: &Value) -> SubitemRow {
    let column_values = raw
        .get("column_values")
        .and_then(Value::as_array)
        .map(|cols| {
            cols.iter()
                .map(|col| ColumnValue {
                    id: text(col, "id"),
                    text: text(col, "text"),
                })
                .collect()
        })
        .unwrap_or_default();

    SubitemRow {
        id: text(raw, "id"),
        name: text(raw, "name"),
        column_values,
    }
}

fn text(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}
