use std::env;
use std::time::Duration;

use anyhow::Context;
use pressline_model::StageLabels;

/// Server configuration loaded from environment variables (and a `.env`
/// file when present). Variable names and defaults keep the contract the
/// dashboard has always shipped with.
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub board: BoardConfig,
    pub scan: ScanConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// External base URL for minted scan links. Falls back to the
    /// request's `Host` header when unset.
    pub public_base_url: Option<String>,
    pub cors_allowed_origins: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Unset runs the server on the in-memory store (development mode).
    pub url: Option<String>,
    pub max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct BoardConfig {
    pub api_url: String,
    pub api_token: Option<String>,
    pub board_id: String,
    pub status_column_id: Option<String>,
    pub checked_in_column_id: Option<String>,
    pub subitem_column_ids: Vec<String>,
    pub page_limit: i64,
    pub max_pages: u32,
    pub cache_ttl: Duration,
    pub request_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub secret: String,
    /// Freshness window for presented scan tokens; `None` disables the
    /// check while already-printed codes are still in circulation.
    pub token_max_age: Option<Duration>,
    pub labels: StageLabels,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
                public_base_url: None,
                cors_allowed_origins: vec!["*".to_string()],
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 5,
            },
            board: BoardConfig {
                api_url: "https://api.monday.com/v2".to_string(),
                api_token: None,
                board_id: String::new(),
                status_column_id: None,
                checked_in_column_id: None,
                subitem_column_ids: vec![
                    "dropdown_mkr73m5s".to_string(),
                    "text_mkr31cjs".to_string(),
                ],
                page_limit: 50,
                max_pages: 2,
                cache_ttl: Duration::from_millis(300_000),
                request_timeout: Duration::from_secs(30),
            },
            scan: ScanConfig {
                secret: "change-me".to_string(),
                token_max_age: Some(Duration::from_secs(30 * 24 * 3600)),
                labels: StageLabels::default(),
            },
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        let defaults = Config::default();

        Ok(Self {
            server: ServerConfig {
                host: string_var("SERVER_HOST", &defaults.server.host),
                port: parsed_var("PORT", defaults.server.port)?,
                public_base_url: opt_var("PUBLIC_BASE_URL"),
                cors_allowed_origins: list_var(
                    "CORS_ALLOWED_ORIGINS",
                    &defaults.server.cors_allowed_origins,
                ),
            },
            database: DatabaseConfig {
                url: opt_var("DATABASE_URL"),
                max_connections: parsed_var(
                    "DB_MAX_CONNECTIONS",
                    defaults.database.max_connections,
                )?,
            },
            board: BoardConfig {
                api_url: string_var("MONDAY_API_URL", &defaults.board.api_url),
                api_token: opt_var("MONDAY_API_TOKEN"),
                board_id: string_var("BOARD_ID", ""),
                status_column_id: opt_var("STATUS_COLUMN_ID"),
                checked_in_column_id: opt_var("CHECKED_IN_COLUMN_ID"),
                subitem_column_ids: list_var(
                    "SUBITEM_COLUMN_IDS",
                    &defaults.board.subitem_column_ids,
                ),
                page_limit: parsed_var("BOARD_PAGE_LIMIT", defaults.board.page_limit)?,
                max_pages: parsed_var("BOARD_MAX_PAGES", defaults.board.max_pages)?,
                cache_ttl: Duration::from_millis(parsed_var("BOARD_CACHE_MS", 300_000u64)?),
                request_timeout: duration_var(
                    "BOARD_REQUEST_TIMEOUT",
                    defaults.board.request_timeout,
                )?,
            },
            scan: ScanConfig {
                secret: string_var("SCAN_SECRET", &defaults.scan.secret),
                token_max_age: match opt_var("SCAN_TOKEN_MAX_AGE") {
                    Some(raw) => parse_token_max_age(&raw)?,
                    None => defaults.scan.token_max_age,
                },
                labels: StageLabels {
                    pending: string_var("PENDING_STATUS_LABEL", "Pending"),
                    step1: string_var("STEP1_STATUS_LABEL", "Checked In"),
                    step2: string_var("STEP2_STATUS_LABEL", "In Production"),
                    step3: string_var("STEP3_STATUS_LABEL", "Completed"),
                },
            },
        })
    }
}

fn string_var(key: &str, default: &str) -> String {
    env::var(key)
        .map(|v| v.trim().to_string())
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn opt_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn list_var(key: &str, default: &[String]) -> Vec<String> {
    match opt_var(key) {
        Some(raw) => raw
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        None => default.to_vec(),
    }
}

fn parsed_var<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match opt_var(key) {
        Some(raw) => raw.parse().with_context(|| format!("invalid {key}: {raw}")),
        None => Ok(default),
    }
}

fn duration_var(key: &str, default: Duration) -> anyhow::Result<Duration> {
    match opt_var(key) {
        Some(raw) => {
            humantime::parse_duration(&raw).with_context(|| format!("invalid {key}: {raw}"))
        }
        None => Ok(default),
    }
}

/// `0`, `off`, or `none` disable the freshness window (migration mode for
/// codes printed before signatures carried an expiry).
fn parse_token_max_age(raw: &str) -> anyhow::Result<Option<Duration>> {
    if matches!(raw.to_ascii_lowercase().as_str(), "0" | "off" | "none") {
        return Ok(None);
    }
    let age = humantime::parse_duration(raw)
        .with_context(|| format!("invalid SCAN_TOKEN_MAX_AGE: {raw}"))?;
    Ok(Some(age))
}
