//! Core domain logic for the wikidesk store.
//! This crate is the single source of truth for business invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod search;
pub mod service;
pub mod store;

pub use config::{ConfigError, WikiConfig};
pub use db::{open_db, open_db_in_memory, DbError};
pub use logging::{default_log_level, init_logging, logging_status, LogLevel, LoggingError};
pub use model::backup::{BackupId, BackupSummary, SnapshotCounts};
pub use model::category::{Category, CategoryId, CategoryPatch, CategoryWithCount};
pub use model::ctf::{Ctf, CtfDifficulty, CtfId, CtfPatch, CtfStats, NewCtf};
pub use model::folder::{Folder, FolderDeleteMode, FolderId};
pub use model::media::{MediaFile, MediaId, MediaKind, MediaPatch, NewMedia};
pub use model::page::{NewPage, Page, PageId, PagePatch, PageStatus, PageVersion};
pub use model::settings::WikiSettings;
pub use model::ValidationError;
pub use repo::{FolderScope, RepoError, RepoResult};
pub use search::fts::{search_pages, SearchError, SearchHit, SearchQuery, SearchResult};
pub use store::{
    ChangeAction, ChangeEvent, EntityKind, StoreStats, SubscriptionId, Wiki, WikiError,
    WikiResult,
};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
