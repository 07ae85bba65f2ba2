//! CTF challenge tracking service.
//!
//! # Invariants
//! - Titles are non-blank and points strictly positive.
//! - A write-up link, when set, targets an existing page.

use crate::model::ctf::{validate_ctf_fields, Ctf, CtfId, CtfPatch, CtfStats, NewCtf};
use crate::model::page::PageId;
use crate::model::ValidationError;
use crate::repo::ctf_repo::{CtfListQuery, CtfRepository};
use crate::repo::{normalize_tag, RepoError};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Service error for challenge tracking.
#[derive(Debug)]
pub enum CtfServiceError {
    /// Title is blank after trim.
    InvalidTitle,
    /// Tag input contains blank values.
    InvalidTag(String),
    /// Target challenge does not exist.
    CtfNotFound(CtfId),
    /// Write-up page does not exist.
    WriteupPageNotFound(PageId),
    /// Record failed model validation.
    Validation(ValidationError),
    /// Persistence-layer failure.
    Repo(RepoError),
}

impl Display for CtfServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidTitle => write!(f, "ctf title must not be blank"),
            Self::InvalidTag(value) => write!(f, "invalid tag: `{value}`"),
            Self::CtfNotFound(id) => write!(f, "ctf not found: {id}"),
            Self::WriteupPageNotFound(id) => write!(f, "write-up page not found: {id}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for CtfServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for CtfServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound { entity: "ctf", id } => Self::CtfNotFound(id),
            RepoError::Validation(err) => Self::Validation(err),
            other => Self::Repo(other),
        }
    }
}

impl From<ValidationError> for CtfServiceError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

/// Challenge tracking service facade.
pub struct CtfService<R: CtfRepository> {
    repo: R,
}

impl<R: CtfRepository> CtfService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn create_ctf(&self, new: NewCtf) -> Result<Ctf, CtfServiceError> {
        let title = normalize_title(&new.title)?;
        validate_ctf_fields(&title, new.points)?;
        if let Some(page_id) = new.writeup_page_id {
            self.ensure_page(page_id)?;
        }
        let tags = checked_tags(new.tags)?;

        let ctf = Ctf {
            id: CtfId::new_v4(),
            title,
            description: new.description,
            category: normalize_optional(new.category),
            difficulty: new.difficulty,
            points: new.points,
            flag_format: normalize_optional(new.flag_format),
            platform: normalize_optional(new.platform),
            tags,
            solved: false,
            solved_at: None,
            writeup_page_id: new.writeup_page_id,
            created_at: 0,
            updated_at: 0,
        };
        Ok(self.repo.insert_ctf(&ctf)?)
    }

    pub fn get_ctf(&self, id: CtfId) -> Result<Ctf, CtfServiceError> {
        self.repo.get_ctf(id)?.ok_or(CtfServiceError::CtfNotFound(id))
    }

    /// Lists challenges, newest first.
    pub fn list_ctfs(&self, mut query: CtfListQuery) -> Result<Vec<Ctf>, CtfServiceError> {
        query.tag = query.tag.and_then(|value| normalize_tag(&value));
        query.category = normalize_optional(query.category);
        Ok(self.repo.list_ctfs(&query)?)
    }

    pub fn update_ctf(&self, id: CtfId, patch: CtfPatch) -> Result<Ctf, CtfServiceError> {
        let mut ctf = self.get_ctf(id)?;
        if let Some(title) = patch.title {
            ctf.title = normalize_title(&title)?;
        }
        if let Some(description) = patch.description {
            ctf.description = description;
        }
        if let Some(category) = patch.category {
            ctf.category = normalize_optional(category);
        }
        if let Some(difficulty) = patch.difficulty {
            ctf.difficulty = difficulty;
        }
        if let Some(points) = patch.points {
            ctf.points = points;
        }
        if let Some(flag_format) = patch.flag_format {
            ctf.flag_format = normalize_optional(flag_format);
        }
        if let Some(platform) = patch.platform {
            ctf.platform = normalize_optional(platform);
        }
        if let Some(writeup_page_id) = patch.writeup_page_id {
            if let Some(page_id) = writeup_page_id {
                self.ensure_page(page_id)?;
            }
            ctf.writeup_page_id = writeup_page_id;
        }

        validate_ctf_fields(&ctf.title, ctf.points)?;
        self.repo.update_ctf(&ctf)?;
        self.get_ctf(id)
    }

    /// Atomically replaces the tag set of one challenge.
    pub fn set_ctf_tags(&self, id: CtfId, tags: Vec<String>) -> Result<Ctf, CtfServiceError> {
        let tags = checked_tags(tags)?;
        self.repo.set_ctf_tags(id, &tags)?;
        self.get_ctf(id)
    }

    /// Marks a challenge solved. Re-marking keeps the original `solved_at`.
    pub fn mark_solved(&self, id: CtfId) -> Result<Ctf, CtfServiceError> {
        self.repo.set_solved(id, true)?;
        self.get_ctf(id)
    }

    pub fn mark_unsolved(&self, id: CtfId) -> Result<Ctf, CtfServiceError> {
        self.repo.set_solved(id, false)?;
        self.get_ctf(id)
    }

    pub fn delete_ctf(&self, id: CtfId) -> Result<(), CtfServiceError> {
        self.repo.delete_ctf(id)?;
        Ok(())
    }

    /// Dashboard numbers across every tracked challenge.
    pub fn ctf_stats(&self) -> Result<CtfStats, CtfServiceError> {
        let buckets = self.repo.difficulty_totals()?;
        let mut stats = CtfStats {
            total: 0,
            solved: 0,
            points_available: 0,
            points_earned: 0,
            by_difficulty: Vec::with_capacity(buckets.len()),
        };
        for bucket in buckets {
            stats.total += bucket.stats.total;
            stats.solved += bucket.stats.solved;
            stats.points_available += bucket.points_available;
            stats.points_earned += bucket.points_earned;
            stats.by_difficulty.push(bucket.stats);
        }
        Ok(stats)
    }

    pub fn count_ctfs(&self) -> Result<u32, CtfServiceError> {
        Ok(self.repo.count_ctfs()?)
    }

    fn ensure_page(&self, page_id: PageId) -> Result<(), CtfServiceError> {
        if self.repo.page_exists(page_id)? {
            Ok(())
        } else {
            Err(CtfServiceError::WriteupPageNotFound(page_id))
        }
    }
}

fn normalize_title(value: &str) -> Result<String, CtfServiceError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CtfServiceError::InvalidTitle);
    }
    Ok(trimmed.to_string())
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

fn checked_tags(tags: Vec<String>) -> Result<Vec<String>, CtfServiceError> {
    if let Some(blank) = tags.iter().find(|tag| tag.trim().is_empty()) {
        return Err(CtfServiceError::InvalidTag(blank.clone()));
    }
    Ok(tags)
}
