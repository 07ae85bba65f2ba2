//! Store facade: one shared object over the database and its subscribers.
//!
//! # Responsibility
//! - Own the SQLite connection, the subscriber list and the backup policy.
//! - Expose every page/folder/media/CTF/category/backup/settings operation.
//! - Notify subscribers synchronously after each successful mutation.
//!
//! # Invariants
//! - Exactly one `ChangeEvent` per successful mutation, none on failure.
//! - Subscribers run in subscription order before the mutating call returns.
//! - Restoring a backup emits a single `Store/Restored` event.

mod events;

pub use events::{ChangeAction, ChangeEvent, EntityKind, SubscriptionId};

use crate::config::WikiConfig;
use crate::db::{open_db, open_db_in_memory, DbError};
use crate::model::backup::{Backup, BackupId, BackupSummary, SnapshotCounts};
use crate::model::category::{Category, CategoryId, CategoryPatch, CategoryWithCount};
use crate::model::ctf::{Ctf, CtfId, CtfPatch, CtfStats, NewCtf};
use crate::model::folder::{Folder, FolderDeleteMode, FolderId};
use crate::model::media::{MediaFile, MediaId, MediaPatch, NewMedia};
use crate::model::page::{NewPage, Page, PageId, PagePatch, PageVersion};
use crate::model::settings::WikiSettings;
use crate::repo::backup_repo::{BackupRepository, SqliteBackupRepository};
use crate::repo::category_repo::SqliteCategoryRepository;
use crate::repo::ctf_repo::{CtfListQuery, SqliteCtfRepository};
use crate::repo::folder_repo::SqliteFolderRepository;
use crate::repo::media_repo::{MediaListQuery, SqliteMediaRepository};
use crate::repo::page_repo::{PageListQuery, SqlitePageRepository};
use crate::repo::settings_repo::SqliteSettingsRepository;
use crate::repo::RepoError;
use crate::search::fts::{search_pages, SearchError, SearchHit, SearchQuery};
use crate::service::backup_service::{BackupService, BackupServiceError, DEFAULT_MAX_BACKUPS};
use crate::service::category_service::{CategoryService, CategoryServiceError};
use crate::service::ctf_service::{CtfService, CtfServiceError};
use crate::service::folder_service::{FolderDeleteOutcome, FolderService, FolderServiceError};
use crate::service::media_service::{MediaService, MediaServiceError};
use crate::service::page_service::{PageService, PageServiceError, PagesListResult};
use crate::service::settings_service::{SettingsService, SettingsServiceError};
use events::Subscribers;
use log::{error, info};
use rusqlite::Connection;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::time::Instant;
use uuid::Uuid;

/// Error surfaced by the store facade.
#[derive(Debug)]
pub enum WikiError {
    Db(DbError),
    Repo(RepoError),
    Page(PageServiceError),
    Folder(FolderServiceError),
    Media(MediaServiceError),
    Ctf(CtfServiceError),
    Category(CategoryServiceError),
    Backup(BackupServiceError),
    Settings(SettingsServiceError),
    Search(SearchError),
}

impl Display for WikiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::Page(err) => write!(f, "{err}"),
            Self::Folder(err) => write!(f, "{err}"),
            Self::Media(err) => write!(f, "{err}"),
            Self::Ctf(err) => write!(f, "{err}"),
            Self::Category(err) => write!(f, "{err}"),
            Self::Backup(err) => write!(f, "{err}"),
            Self::Settings(err) => write!(f, "{err}"),
            Self::Search(err) => write!(f, "{err}"),
        }
    }
}

impl Error for WikiError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::Page(err) => Some(err),
            Self::Folder(err) => Some(err),
            Self::Media(err) => Some(err),
            Self::Ctf(err) => Some(err),
            Self::Category(err) => Some(err),
            Self::Backup(err) => Some(err),
            Self::Settings(err) => Some(err),
            Self::Search(err) => Some(err),
        }
    }
}

macro_rules! wiki_error_from {
    ($($source:ty => $variant:ident),+ $(,)?) => {
        $(
            impl From<$source> for WikiError {
                fn from(value: $source) -> Self {
                    Self::$variant(value)
                }
            }
        )+
    };
}

wiki_error_from!(
    DbError => Db,
    RepoError => Repo,
    PageServiceError => Page,
    FolderServiceError => Folder,
    MediaServiceError => Media,
    CtfServiceError => Ctf,
    CategoryServiceError => Category,
    BackupServiceError => Backup,
    SettingsServiceError => Settings,
    SearchError => Search,
);

pub type WikiResult<T> = Result<T, WikiError>;

/// Entity counts across the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub folders: u32,
    pub pages: u32,
    pub media: u32,
    pub ctfs: u32,
    pub categories: u32,
    pub backups: u32,
}

/// The shared wiki store.
pub struct Wiki {
    conn: Connection,
    subscribers: Subscribers,
    max_backups: u32,
}

impl Wiki {
    /// Opens (and migrates) a file-backed store.
    pub fn open(path: impl AsRef<Path>) -> WikiResult<Self> {
        Ok(Self::from_connection(open_db(path)?))
    }

    /// Opens an empty in-memory store.
    pub fn open_in_memory() -> WikiResult<Self> {
        Ok(Self::from_connection(open_db_in_memory()?))
    }

    /// Opens the store described by `config`.
    pub fn from_config(config: &WikiConfig) -> WikiResult<Self> {
        let wiki = match config.database.path.as_deref() {
            Some(path) => Self::open(path)?,
            None => Self::open_in_memory()?,
        };
        Ok(wiki.with_max_backups(config.backups.max_backups))
    }

    /// Sets how many stored backups are kept; `0` keeps every backup.
    pub fn with_max_backups(mut self, max_backups: u32) -> Self {
        self.max_backups = max_backups;
        self
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn,
            subscribers: Subscribers::default(),
            max_backups: DEFAULT_MAX_BACKUPS,
        }
    }

    /// Underlying connection for read-only integrations.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    // ---- subscriptions ----

    /// Registers a callback invoked after every successful mutation. The
    /// callback gets read access to the updated store.
    pub fn subscribe(
        &mut self,
        callback: impl FnMut(&Wiki, &ChangeEvent) + 'static,
    ) -> SubscriptionId {
        self.subscribers.add(Box::new(callback))
    }

    /// Removes a callback. Returns `false` for unknown ids.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscribers.remove(id)
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    fn emit(&mut self, entity: EntityKind, action: ChangeAction, id: Option<Uuid>) {
        let event = ChangeEvent { entity, action, id };
        log::debug!(
            "event=store_change module=store status=ok entity={} action={} subscribers={}",
            entity.as_str(),
            action.as_str(),
            self.subscribers.len()
        );
        // Callbacks borrow the whole store, so the list sits outside it meanwhile.
        let mut subscribers = std::mem::take(&mut self.subscribers);
        subscribers.notify(self, &event);
        self.subscribers = subscribers;
    }

    // ---- services ----

    fn pages(&self) -> WikiResult<PageService<SqlitePageRepository<'_>>> {
        Ok(PageService::new(SqlitePageRepository::try_new(&self.conn)?))
    }

    fn folders(&self) -> WikiResult<FolderService<SqliteFolderRepository<'_>>> {
        Ok(FolderService::new(SqliteFolderRepository::try_new(
            &self.conn,
        )?))
    }

    fn media(&self) -> WikiResult<MediaService<SqliteMediaRepository<'_>>> {
        Ok(MediaService::new(SqliteMediaRepository::try_new(&self.conn)?))
    }

    /// Media service bounded by the configured upload size.
    fn media_uploads(&self) -> WikiResult<MediaService<SqliteMediaRepository<'_>>> {
        let max_upload_bytes = self.get_settings()?.max_upload_bytes;
        Ok(self.media()?.with_max_upload_bytes(max_upload_bytes))
    }

    fn ctfs(&self) -> WikiResult<CtfService<SqliteCtfRepository<'_>>> {
        Ok(CtfService::new(SqliteCtfRepository::try_new(&self.conn)?))
    }

    fn categories(&self) -> WikiResult<CategoryService<SqliteCategoryRepository<'_>>> {
        Ok(CategoryService::new(SqliteCategoryRepository::try_new(
            &self.conn,
        )?))
    }

    fn backups(&self) -> WikiResult<BackupService<SqliteBackupRepository<'_>>> {
        Ok(
            BackupService::new(SqliteBackupRepository::try_new(&self.conn)?)
                .with_max_backups(self.max_backups),
        )
    }

    fn settings(&self) -> WikiResult<SettingsService<SqliteSettingsRepository<'_>>> {
        Ok(SettingsService::new(SqliteSettingsRepository::try_new(
            &self.conn,
        )?))
    }

    // ---- pages ----

    /// Creates a page. Unset status falls back to the configured default.
    pub fn create_page(&mut self, mut new: NewPage) -> WikiResult<Page> {
        if new.status.is_none() {
            new.status = Some(self.get_settings()?.default_page_status);
        }
        let page = self.pages()?.create_page(new)?;
        self.emit(EntityKind::Page, ChangeAction::Created, Some(page.id));
        Ok(page)
    }

    pub fn get_page(&self, id: PageId) -> WikiResult<Page> {
        Ok(self.pages()?.get_page(id)?)
    }

    pub fn get_page_by_slug(&self, slug: &str) -> WikiResult<Page> {
        Ok(self.pages()?.get_page_by_slug(slug)?)
    }

    /// Lists pages. Unset limit falls back to `items_per_page`.
    pub fn list_pages(&self, mut query: PageListQuery) -> WikiResult<PagesListResult> {
        if query.limit.is_none() {
            query.limit = Some(self.get_settings()?.items_per_page);
        }
        Ok(self.pages()?.list_pages(query)?)
    }

    pub fn update_page(&mut self, id: PageId, patch: PagePatch) -> WikiResult<Page> {
        let page = self.pages()?.update_page(id, patch)?;
        self.emit(EntityKind::Page, ChangeAction::Updated, Some(id));
        Ok(page)
    }

    pub fn publish_page(&mut self, id: PageId) -> WikiResult<Page> {
        let page = self.pages()?.publish_page(id)?;
        self.emit(EntityKind::Page, ChangeAction::Updated, Some(id));
        Ok(page)
    }

    pub fn unpublish_page(&mut self, id: PageId) -> WikiResult<Page> {
        let page = self.pages()?.unpublish_page(id)?;
        self.emit(EntityKind::Page, ChangeAction::Updated, Some(id));
        Ok(page)
    }

    pub fn archive_page(&mut self, id: PageId) -> WikiResult<Page> {
        let page = self.pages()?.archive_page(id)?;
        self.emit(EntityKind::Page, ChangeAction::Updated, Some(id));
        Ok(page)
    }

    pub fn move_page(&mut self, id: PageId, folder_id: Option<FolderId>) -> WikiResult<Page> {
        let page = self.pages()?.move_page(id, folder_id)?;
        self.emit(EntityKind::Page, ChangeAction::Updated, Some(id));
        Ok(page)
    }

    pub fn set_page_tags(&mut self, id: PageId, tags: Vec<String>) -> WikiResult<Page> {
        let page = self.pages()?.set_page_tags(id, tags)?;
        self.emit(EntityKind::Page, ChangeAction::Updated, Some(id));
        Ok(page)
    }

    pub fn set_page_categories(
        &mut self,
        id: PageId,
        category_ids: Vec<CategoryId>,
    ) -> WikiResult<Page> {
        let page = self.pages()?.set_page_categories(id, category_ids)?;
        self.emit(EntityKind::Page, ChangeAction::Updated, Some(id));
        Ok(page)
    }

    pub fn list_page_versions(&self, id: PageId) -> WikiResult<Vec<PageVersion>> {
        Ok(self.pages()?.list_page_versions(id)?)
    }

    pub fn restore_page_version(&mut self, id: PageId, version: i64) -> WikiResult<Page> {
        let page = self.pages()?.restore_page_version(id, version)?;
        self.emit(EntityKind::Page, ChangeAction::Updated, Some(id));
        Ok(page)
    }

    pub fn delete_page(&mut self, id: PageId) -> WikiResult<()> {
        self.pages()?.delete_page(id)?;
        self.emit(EntityKind::Page, ChangeAction::Deleted, Some(id));
        Ok(())
    }

    // ---- folders ----

    pub fn create_folder(
        &mut self,
        parent_id: Option<FolderId>,
        name: &str,
        description: Option<String>,
    ) -> WikiResult<Folder> {
        let folder = self.folders()?.create_folder(parent_id, name, description)?;
        self.emit(EntityKind::Folder, ChangeAction::Created, Some(folder.id));
        Ok(folder)
    }

    pub fn get_folder(&self, id: FolderId) -> WikiResult<Folder> {
        Ok(self.folders()?.get_folder(id)?)
    }

    pub fn folder_path(&self, id: FolderId) -> WikiResult<String> {
        Ok(self.folders()?.folder_path(id)?)
    }

    pub fn list_children(&self, parent_id: Option<FolderId>) -> WikiResult<Vec<Folder>> {
        Ok(self.folders()?.list_children(parent_id)?)
    }

    pub fn list_folders(&self) -> WikiResult<Vec<Folder>> {
        Ok(self.folders()?.list_folders()?)
    }

    pub fn rename_folder(&mut self, id: FolderId, name: &str) -> WikiResult<Folder> {
        let folder = self.folders()?.rename_folder(id, name)?;
        self.emit(EntityKind::Folder, ChangeAction::Updated, Some(id));
        Ok(folder)
    }

    pub fn update_folder_description(
        &mut self,
        id: FolderId,
        description: Option<String>,
    ) -> WikiResult<Folder> {
        let folder = self.folders()?.update_folder_description(id, description)?;
        self.emit(EntityKind::Folder, ChangeAction::Updated, Some(id));
        Ok(folder)
    }

    pub fn move_folder(
        &mut self,
        id: FolderId,
        new_parent_id: Option<FolderId>,
        target_order: Option<i64>,
    ) -> WikiResult<Folder> {
        let folder = self
            .folders()?
            .move_folder(id, new_parent_id, target_order)?;
        self.emit(EntityKind::Folder, ChangeAction::Updated, Some(id));
        Ok(folder)
    }

    pub fn delete_folder(
        &mut self,
        id: FolderId,
        mode: FolderDeleteMode,
    ) -> WikiResult<FolderDeleteOutcome> {
        let outcome = self.folders()?.delete_folder(id, mode)?;
        self.emit(EntityKind::Folder, ChangeAction::Deleted, Some(id));
        Ok(outcome)
    }

    // ---- media ----

    /// Registers a file. Declared sizes above `max_upload_bytes` are rejected.
    pub fn add_media(&mut self, new: NewMedia) -> WikiResult<MediaFile> {
        let media = self.media_uploads()?.add_media(new)?;
        self.emit(EntityKind::Media, ChangeAction::Created, Some(media.id));
        Ok(media)
    }

    pub fn add_youtube(
        &mut self,
        url: &str,
        name: Option<String>,
        folder_id: Option<FolderId>,
    ) -> WikiResult<MediaFile> {
        let media = self.media()?.add_youtube(url, name, folder_id)?;
        self.emit(EntityKind::Media, ChangeAction::Created, Some(media.id));
        Ok(media)
    }

    pub fn get_media(&self, id: MediaId) -> WikiResult<MediaFile> {
        Ok(self.media()?.get_media(id)?)
    }

    pub fn list_media(&self, query: &MediaListQuery) -> WikiResult<Vec<MediaFile>> {
        Ok(self.media()?.list_media(query)?)
    }

    pub fn update_media(&mut self, id: MediaId, patch: MediaPatch) -> WikiResult<MediaFile> {
        let media = self.media()?.update_media(id, patch)?;
        self.emit(EntityKind::Media, ChangeAction::Updated, Some(id));
        Ok(media)
    }

    pub fn move_media(&mut self, id: MediaId, folder_id: Option<FolderId>) -> WikiResult<MediaFile> {
        let media = self.media()?.move_media(id, folder_id)?;
        self.emit(EntityKind::Media, ChangeAction::Updated, Some(id));
        Ok(media)
    }

    pub fn delete_media(&mut self, id: MediaId) -> WikiResult<()> {
        self.media()?.delete_media(id)?;
        self.emit(EntityKind::Media, ChangeAction::Deleted, Some(id));
        Ok(())
    }

    // ---- ctf ----

    pub fn create_ctf(&mut self, new: NewCtf) -> WikiResult<Ctf> {
        let ctf = self.ctfs()?.create_ctf(new)?;
        self.emit(EntityKind::Ctf, ChangeAction::Created, Some(ctf.id));
        Ok(ctf)
    }

    pub fn get_ctf(&self, id: CtfId) -> WikiResult<Ctf> {
        Ok(self.ctfs()?.get_ctf(id)?)
    }

    pub fn list_ctfs(&self, query: CtfListQuery) -> WikiResult<Vec<Ctf>> {
        Ok(self.ctfs()?.list_ctfs(query)?)
    }

    pub fn update_ctf(&mut self, id: CtfId, patch: CtfPatch) -> WikiResult<Ctf> {
        let ctf = self.ctfs()?.update_ctf(id, patch)?;
        self.emit(EntityKind::Ctf, ChangeAction::Updated, Some(id));
        Ok(ctf)
    }

    pub fn set_ctf_tags(&mut self, id: CtfId, tags: Vec<String>) -> WikiResult<Ctf> {
        let ctf = self.ctfs()?.set_ctf_tags(id, tags)?;
        self.emit(EntityKind::Ctf, ChangeAction::Updated, Some(id));
        Ok(ctf)
    }

    pub fn mark_solved(&mut self, id: CtfId) -> WikiResult<Ctf> {
        let ctf = self.ctfs()?.mark_solved(id)?;
        self.emit(EntityKind::Ctf, ChangeAction::Updated, Some(id));
        Ok(ctf)
    }

    pub fn mark_unsolved(&mut self, id: CtfId) -> WikiResult<Ctf> {
        let ctf = self.ctfs()?.mark_unsolved(id)?;
        self.emit(EntityKind::Ctf, ChangeAction::Updated, Some(id));
        Ok(ctf)
    }

    pub fn delete_ctf(&mut self, id: CtfId) -> WikiResult<()> {
        self.ctfs()?.delete_ctf(id)?;
        self.emit(EntityKind::Ctf, ChangeAction::Deleted, Some(id));
        Ok(())
    }

    pub fn ctf_stats(&self) -> WikiResult<CtfStats> {
        Ok(self.ctfs()?.ctf_stats()?)
    }

    // ---- categories ----

    pub fn create_category(
        &mut self,
        name: &str,
        description: Option<String>,
        color: Option<String>,
    ) -> WikiResult<Category> {
        let category = self
            .categories()?
            .create_category(name, description, color)?;
        self.emit(EntityKind::Category, ChangeAction::Created, Some(category.id));
        Ok(category)
    }

    pub fn get_category(&self, id: CategoryId) -> WikiResult<Category> {
        Ok(self.categories()?.get_category(id)?)
    }

    pub fn list_categories(&self) -> WikiResult<Vec<CategoryWithCount>> {
        Ok(self.categories()?.list_categories()?)
    }

    pub fn update_category(
        &mut self,
        id: CategoryId,
        patch: CategoryPatch,
    ) -> WikiResult<Category> {
        let category = self.categories()?.update_category(id, patch)?;
        self.emit(EntityKind::Category, ChangeAction::Updated, Some(id));
        Ok(category)
    }

    pub fn delete_category(&mut self, id: CategoryId) -> WikiResult<()> {
        self.categories()?.delete_category(id)?;
        self.emit(EntityKind::Category, ChangeAction::Deleted, Some(id));
        Ok(())
    }

    // ---- backups ----

    pub fn create_backup(&mut self, name: &str) -> WikiResult<BackupSummary> {
        let started_at = Instant::now();
        let summary = match self.backups()?.create_backup(name) {
            Ok(summary) => summary,
            Err(err) => {
                error!("event=backup_create module=store status=error error={err}");
                return Err(err.into());
            }
        };
        info!(
            "event=backup_create module=store status=ok pages={} folders={} duration_ms={}",
            summary.counts.pages,
            summary.counts.folders,
            started_at.elapsed().as_millis()
        );
        self.emit(EntityKind::Backup, ChangeAction::Created, Some(summary.id));
        Ok(summary)
    }

    pub fn list_backups(&self) -> WikiResult<Vec<BackupSummary>> {
        Ok(self.backups()?.list_backups()?)
    }

    pub fn get_backup(&self, id: BackupId) -> WikiResult<Backup> {
        Ok(self.backups()?.get_backup(id)?)
    }

    pub fn delete_backup(&mut self, id: BackupId) -> WikiResult<()> {
        self.backups()?.delete_backup(id)?;
        self.emit(EntityKind::Backup, ChangeAction::Deleted, Some(id));
        Ok(())
    }

    /// Pretty JSON document of a stored backup.
    pub fn export_backup(&self, id: BackupId) -> WikiResult<String> {
        Ok(self.backups()?.export_backup(id)?)
    }

    /// Pretty JSON document of the live store; nothing is stored.
    pub fn export_current(&self, name: &str) -> WikiResult<String> {
        Ok(self.backups()?.export_current(name)?)
    }

    /// Stores a JSON document as a backup without touching live data.
    pub fn import_backup(&mut self, json: &str) -> WikiResult<BackupSummary> {
        let summary = match self.backups()?.import_backup(json) {
            Ok(summary) => summary,
            Err(err) => {
                error!("event=backup_import module=store status=error error={err}");
                return Err(err.into());
            }
        };
        info!("event=backup_import module=store status=ok pages={}", summary.counts.pages);
        self.emit(EntityKind::Backup, ChangeAction::Created, Some(summary.id));
        Ok(summary)
    }

    /// Replaces every live collection with a stored backup. All-or-nothing.
    pub fn restore_backup(&mut self, id: BackupId) -> WikiResult<SnapshotCounts> {
        let started_at = Instant::now();
        let counts = match self.backups()?.restore_backup(id) {
            Ok(counts) => counts,
            Err(err) => {
                error!("event=backup_restore module=store status=error error={err}");
                return Err(err.into());
            }
        };
        info!(
            "event=backup_restore module=store status=ok pages={} folders={} media={} ctfs={} categories={} duration_ms={}",
            counts.pages,
            counts.folders,
            counts.media,
            counts.ctfs,
            counts.categories,
            started_at.elapsed().as_millis()
        );
        self.emit(EntityKind::Store, ChangeAction::Restored, None);
        Ok(counts)
    }

    // ---- settings ----

    pub fn get_settings(&self) -> WikiResult<WikiSettings> {
        Ok(self.settings()?.get_settings()?)
    }

    pub fn update_settings(&mut self, settings: WikiSettings) -> WikiResult<WikiSettings> {
        let settings = self.settings()?.update_settings(settings)?;
        self.emit(EntityKind::Settings, ChangeAction::Updated, None);
        Ok(settings)
    }

    pub fn reset_settings(&mut self) -> WikiResult<WikiSettings> {
        let settings = self.settings()?.reset_settings()?;
        self.emit(EntityKind::Settings, ChangeAction::Updated, None);
        Ok(settings)
    }

    // ---- search & stats ----

    pub fn search_pages(&self, query: &SearchQuery) -> WikiResult<Vec<SearchHit>> {
        Ok(search_pages(&self.conn, query)?)
    }

    pub fn stats(&self) -> WikiResult<StoreStats> {
        Ok(StoreStats {
            folders: self.folders()?.count_folders()?,
            pages: self.pages()?.count_pages()?,
            media: self.media()?.count_media()?,
            ctfs: self.ctfs()?.count_ctfs()?,
            categories: self.categories()?.count_categories()?,
            backups: SqliteBackupRepository::try_new(&self.conn)?.count_backups()?,
        })
    }
}
