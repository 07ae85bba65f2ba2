//! Page use-case service.
//!
//! # Responsibility
//! - Provide page create/update/get/list/publish APIs.
//! - Derive HTML projections (`plain_text`, `excerpt`, `cover_image`) and
//!   unique slugs.
//! - Keep revision history for title/content edits.
//!
//! # Invariants
//! - Blank titles are rejected with `InvalidTitle` before any write.
//! - Referenced folders and categories must exist.
//! - Every title/content change appends the previous revision and bumps
//!   `version` by one.

use crate::model::category::CategoryId;
use crate::model::folder::FolderId;
use crate::model::page::{NewPage, Page, PageId, PagePatch, PageStatus, PageVersion};
use crate::model::ValidationError;
use crate::repo::page_repo::{normalize_page_limit, PageListQuery, PageRepository};
use crate::repo::{normalize_tag, RepoError};
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Excerpt length in characters.
pub const EXCERPT_CHARS: usize = 160;
const SLUG_MAX_CHARS: usize = 80;

static SCRIPT_STYLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<(script|style)\b[^>]*>.*?</(script|style)\s*>").expect("valid block regex")
});
static HTML_TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").expect("valid tag regex"));
static IMG_SRC_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<img\b[^>]*?\bsrc\s*=\s*["']([^"']+)["']"#).expect("valid img regex")
});
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));
static SLUG_SEPARATOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\p{L}\p{N}]+").expect("valid slug regex"));

/// Service error for page use-cases.
#[derive(Debug)]
pub enum PageServiceError {
    /// Title is blank after trim.
    InvalidTitle,
    /// Tag input contains blank values.
    InvalidTag(String),
    /// Target page does not exist.
    PageNotFound(PageId),
    /// Page slug does not exist.
    SlugNotFound(String),
    /// Referenced folder does not exist.
    FolderNotFound(FolderId),
    /// Referenced category does not exist.
    CategoryNotFound(CategoryId),
    /// Requested revision does not exist for the page.
    VersionNotFound { page_id: PageId, version: i64 },
    /// Record failed model validation.
    Validation(ValidationError),
    /// Persistence-layer failure.
    Repo(RepoError),
    /// Internal consistency mismatch between write and read-back.
    InconsistentState(&'static str),
}

impl Display for PageServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidTitle => write!(f, "page title must not be blank"),
            Self::InvalidTag(value) => write!(f, "invalid tag: `{value}`"),
            Self::PageNotFound(id) => write!(f, "page not found: {id}"),
            Self::SlugNotFound(slug) => write!(f, "page not found for slug `{slug}`"),
            Self::FolderNotFound(id) => write!(f, "folder not found: {id}"),
            Self::CategoryNotFound(id) => write!(f, "category not found: {id}"),
            Self::VersionNotFound { page_id, version } => {
                write!(f, "page {page_id} has no version {version}")
            }
            Self::Validation(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => write!(f, "inconsistent page state: {details}"),
        }
    }
}

impl Error for PageServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for PageServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound {
                entity: "page",
                id,
            } => Self::PageNotFound(id),
            RepoError::Validation(err) => Self::Validation(err),
            other => Self::Repo(other),
        }
    }
}

/// List result envelope used by service callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PagesListResult {
    /// Items sorted by `updated_at DESC, id ASC`.
    pub items: Vec<Page>,
    /// Effective normalized limit used by the query.
    pub applied_limit: u32,
}

/// Projections derived from an HTML page body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlProjection {
    pub plain_text: String,
    pub excerpt: Option<String>,
    pub cover_image: Option<String>,
}

/// Page service facade over repository implementations.
pub struct PageService<R: PageRepository> {
    repo: R,
}

impl<R: PageRepository> PageService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates one page. Status defaults to draft when `new.status` is unset.
    pub fn create_page(&self, new: NewPage) -> Result<Page, PageServiceError> {
        let title = normalize_title(&new.title)?;
        if let Some(folder_id) = new.folder_id {
            self.ensure_folder(folder_id)?;
        }
        let category_ids = self.checked_categories(new.category_ids)?;
        let tags = checked_tags(new.tags)?;

        let projection = derive_html_projection(&new.content);
        let slug = self.unique_slug(&title, None)?;
        let page = Page {
            id: PageId::new_v4(),
            title,
            slug,
            content: new.content,
            plain_text: projection.plain_text,
            excerpt: projection.excerpt,
            cover_image: projection.cover_image,
            folder_id: new.folder_id,
            status: new.status.unwrap_or_default(),
            author: normalize_optional(new.author),
            published_at: None,
            version: 1,
            tags,
            category_ids,
            created_at: 0,
            updated_at: 0,
        };

        Ok(self.repo.insert_page(&page)?)
    }

    /// Gets one page by stable id.
    pub fn get_page(&self, id: PageId) -> Result<Page, PageServiceError> {
        self.repo
            .get_page(id)?
            .ok_or(PageServiceError::PageNotFound(id))
    }

    /// Gets one page by slug.
    pub fn get_page_by_slug(&self, slug: &str) -> Result<Page, PageServiceError> {
        let slug = slug.trim();
        self.repo
            .get_page_by_slug(slug)?
            .ok_or_else(|| PageServiceError::SlugNotFound(slug.to_string()))
    }

    /// Lists pages with optional filters and pagination.
    pub fn list_pages(
        &self,
        mut query: PageListQuery,
    ) -> Result<PagesListResult, PageServiceError> {
        query.tag = query.tag.and_then(|value| normalize_tag(&value));
        let applied_limit = normalize_page_limit(query.limit);
        query.limit = Some(applied_limit);
        let items = self.repo.list_pages(&query)?;
        Ok(PagesListResult {
            items,
            applied_limit,
        })
    }

    /// Applies a partial update. Title/content changes are versioned; the
    /// slug follows the title.
    pub fn update_page(&self, id: PageId, patch: PagePatch) -> Result<Page, PageServiceError> {
        let current = self.get_page(id)?;
        let mut next = current.clone();

        if let Some(title) = patch.title {
            next.title = normalize_title(&title)?;
        }
        if let Some(content) = patch.content {
            next.content = content;
        }
        if let Some(author) = patch.author {
            next.author = normalize_optional(author);
        }

        let revision = self.apply_revision(&current, &mut next)?;
        self.repo.update_page(&next, revision.as_ref())?;
        self.read_back(id, "updated page not found in read-back")
    }

    /// Publishes a page. `published_at` is only set on the first publish.
    pub fn publish_page(&self, id: PageId) -> Result<Page, PageServiceError> {
        self.set_status(id, PageStatus::Published)
    }

    /// Returns a page to draft.
    pub fn unpublish_page(&self, id: PageId) -> Result<Page, PageServiceError> {
        self.set_status(id, PageStatus::Draft)
    }

    pub fn archive_page(&self, id: PageId) -> Result<Page, PageServiceError> {
        self.set_status(id, PageStatus::Archived)
    }

    /// Moves a page into a folder, or out of every folder with `None`.
    pub fn move_page(
        &self,
        id: PageId,
        folder_id: Option<FolderId>,
    ) -> Result<Page, PageServiceError> {
        let mut page = self.get_page(id)?;
        if let Some(folder_id) = folder_id {
            self.ensure_folder(folder_id)?;
        }
        page.folder_id = folder_id;
        self.repo.update_page(&page, None)?;
        self.read_back(id, "moved page not found in read-back")
    }

    /// Atomically replaces the full tag set for one page.
    pub fn set_page_tags(&self, id: PageId, tags: Vec<String>) -> Result<Page, PageServiceError> {
        let tags = checked_tags(tags)?;
        self.repo.set_page_tags(id, &tags)?;
        self.read_back(id, "page missing after tag replacement")
    }

    /// Atomically replaces the category links for one page.
    pub fn set_page_categories(
        &self,
        id: PageId,
        category_ids: Vec<CategoryId>,
    ) -> Result<Page, PageServiceError> {
        let category_ids = self.checked_categories(category_ids)?;
        self.repo.set_page_categories(id, &category_ids)?;
        self.read_back(id, "page missing after category replacement")
    }

    /// Lists stored revisions, newest first.
    pub fn list_page_versions(&self, id: PageId) -> Result<Vec<PageVersion>, PageServiceError> {
        self.get_page(id)?;
        Ok(self.repo.list_versions(id)?)
    }

    /// Restores title and content from a stored revision. The current state
    /// is versioned first, so restoring is itself undoable.
    pub fn restore_page_version(
        &self,
        id: PageId,
        version: i64,
    ) -> Result<Page, PageServiceError> {
        let revision = self
            .repo
            .get_version(id, version)?
            .ok_or(PageServiceError::VersionNotFound {
                page_id: id,
                version,
            })?;
        self.update_page(
            id,
            PagePatch {
                title: Some(revision.title),
                content: Some(revision.content),
                author: None,
            },
        )
    }

    /// Deletes a page with its tags, category links and revisions.
    pub fn delete_page(&self, id: PageId) -> Result<(), PageServiceError> {
        self.repo.delete_page(id)?;
        Ok(())
    }

    pub fn count_pages(&self) -> Result<u32, PageServiceError> {
        Ok(self.repo.count_pages()?)
    }

    fn set_status(&self, id: PageId, status: PageStatus) -> Result<Page, PageServiceError> {
        self.repo.set_page_status(id, status)?;
        self.read_back(id, "page missing after status change")
    }

    fn apply_revision(
        &self,
        current: &Page,
        next: &mut Page,
    ) -> Result<Option<PageVersion>, PageServiceError> {
        let title_changed = next.title != current.title;
        if title_changed {
            next.slug = self.unique_slug(&next.title, Some(current.id))?;
        }
        if !title_changed && next.content == current.content {
            return Ok(None);
        }

        let projection = derive_html_projection(&next.content);
        next.plain_text = projection.plain_text;
        next.excerpt = projection.excerpt;
        next.cover_image = projection.cover_image;
        next.version = current.version + 1;

        Ok(Some(PageVersion {
            page_id: current.id,
            version: current.version,
            title: current.title.clone(),
            content: current.content.clone(),
            created_at: current.updated_at,
        }))
    }

    fn unique_slug(&self, title: &str, exclude: Option<PageId>) -> Result<String, PageServiceError> {
        let base = slugify(title);
        let mut candidate = base.clone();
        let mut suffix = 2u32;
        while self.repo.slug_taken(&candidate, exclude)? {
            candidate = format!("{base}-{suffix}");
            suffix += 1;
        }
        Ok(candidate)
    }

    fn ensure_folder(&self, folder_id: FolderId) -> Result<(), PageServiceError> {
        if self.repo.folder_exists(folder_id)? {
            Ok(())
        } else {
            Err(PageServiceError::FolderNotFound(folder_id))
        }
    }

    fn checked_categories(
        &self,
        mut category_ids: Vec<CategoryId>,
    ) -> Result<Vec<CategoryId>, PageServiceError> {
        category_ids.sort();
        category_ids.dedup();
        if let Some(missing) = self.repo.missing_categories(&category_ids)?.first() {
            return Err(PageServiceError::CategoryNotFound(*missing));
        }
        Ok(category_ids)
    }

    fn read_back(&self, id: PageId, details: &'static str) -> Result<Page, PageServiceError> {
        self.repo
            .get_page(id)?
            .ok_or(PageServiceError::InconsistentState(details))
    }
}

/// Derives search/preview projections from an HTML body.
///
/// Rules:
/// - `cover_image`: `src` of the first `<img>` tag.
/// - `plain_text`: scripts/styles dropped, tags replaced by spaces, common
///   entities decoded, whitespace collapsed.
/// - `excerpt`: first 160 chars of `plain_text`, `None` when empty.
pub fn derive_html_projection(content: &str) -> HtmlProjection {
    let cover_image = IMG_SRC_RE
        .captures(content)
        .and_then(|caps| caps.get(1).map(|m| m.as_str().trim().to_string()))
        .filter(|value| !value.is_empty());

    let without_blocks = SCRIPT_STYLE_RE.replace_all(content, " ");
    let without_tags = HTML_TAG_RE.replace_all(&without_blocks, " ");
    let decoded = decode_entities(&without_tags);
    let normalized = WHITESPACE_RE.replace_all(&decoded, " ");
    let plain_text = normalized.trim().to_string();

    let excerpt = if plain_text.is_empty() {
        None
    } else {
        Some(
            plain_text
                .chars()
                .take(EXCERPT_CHARS)
                .collect::<String>()
                .trim_end()
                .to_string(),
        )
    };

    HtmlProjection {
        plain_text,
        excerpt,
        cover_image,
    }
}

/// Lowercase, separator-collapsed URL handle. Falls back to `page`.
pub fn slugify(title: &str) -> String {
    let lowered = title.trim().to_lowercase();
    let joined = SLUG_SEPARATOR_RE.replace_all(&lowered, "-");
    let slug: String = joined.trim_matches('-').chars().take(SLUG_MAX_CHARS).collect();
    let slug = slug.trim_end_matches('-');
    if slug.is_empty() {
        "page".to_string()
    } else {
        slug.to_string()
    }
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

fn normalize_title(value: &str) -> Result<String, PageServiceError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(PageServiceError::InvalidTitle);
    }
    Ok(trimmed.to_string())
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

fn checked_tags(tags: Vec<String>) -> Result<Vec<String>, PageServiceError> {
    if let Some(blank) = tags.iter().find(|tag| tag.trim().is_empty()) {
        return Err(PageServiceError::InvalidTag(blank.clone()));
    }
    Ok(tags)
}

#[cfg(test)]
mod tests {
    use super::{derive_html_projection, slugify, EXCERPT_CHARS};

    #[test]
    fn projection_takes_first_image_as_cover() {
        let projection = derive_html_projection(
            r#"<p>x</p><IMG alt="a" src="/one.png"><img src='/two.png'>"#,
        );
        assert_eq!(projection.cover_image.as_deref(), Some("/one.png"));
    }

    #[test]
    fn projection_strips_tags_scripts_and_entities() {
        let projection = derive_html_projection(
            "<h1>Title</h1><script>alert(1)</script><p>Fish &amp; chips&nbsp;<b>now</b></p>",
        );
        assert_eq!(projection.plain_text, "Title Fish & chips now");
        assert_eq!(projection.excerpt.as_deref(), Some("Title Fish & chips now"));
        assert_eq!(projection.cover_image, None);
    }

    #[test]
    fn excerpt_is_capped_and_empty_body_has_none() {
        let long = format!("<p>{}</p>", "word ".repeat(100));
        let projection = derive_html_projection(&long);
        let excerpt = projection.excerpt.expect("excerpt should exist");
        assert!(excerpt.chars().count() <= EXCERPT_CHARS);

        assert_eq!(derive_html_projection("<p> </p>").excerpt, None);
    }

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("  Hello, World!  "), "hello-world");
        assert_eq!(slugify("Größe & Maß"), "größe-maß");
        assert_eq!(slugify("***"), "page");
    }
}
