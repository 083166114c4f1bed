//! Core library for the Pressline production dashboard.
//!
//! Implements the scan-progression and board-synchronization subsystem:
//!
//! - **Signed scan tokens**: HMAC-SHA-256 URLs bound to an item id and an
//!   issuance timestamp, carried through printed barcodes.
//! - **Scan progression**: a saturating three-stage counter per job item
//!   with an append-only event log, persisted in Postgres (or in memory
//!   for development and tests).
//! - **Board synchronization**: a paginated, complexity-limit-aware fetch
//!   of the external board, cached with request coalescing, plus the
//!   projection of scan state onto external board columns.

pub mod board;
pub mod credentials;
pub mod scan;

pub use board::{
    BoardApi, BoardError, BoardSyncCache, BoardCacheConfig, ColumnTargets, FetchedItem,
    ItemsPageChunk, MondayBoardApi, MondayBoardConfig, StageColumnUpdater,
};
pub use credentials::BoardCredentials;
pub use scan::{
    MemoryScanStore, PostgresScanStore, ScanStateStore, ScanUrlSigner, SignedScanToken,
    SignerError, StoreError, VerifyError,
};
