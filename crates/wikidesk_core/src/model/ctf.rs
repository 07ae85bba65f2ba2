//! Capture-the-flag challenge tracking model.
//!
//! # Invariants
//! - `points` is strictly positive.
//! - `solved_at` is `Some` exactly when `solved` is true.

use super::page::PageId;
use super::{require_text, ValidationError, MAX_TITLE_CHARS};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable CTF challenge identifier.
pub type CtfId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CtfDifficulty {
    Easy,
    Medium,
    Hard,
    Insane,
}

impl CtfDifficulty {
    pub const ALL: [CtfDifficulty; 4] = [Self::Easy, Self::Medium, Self::Hard, Self::Insane];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
            Self::Insane => "insane",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "easy" => Some(Self::Easy),
            "medium" => Some(Self::Medium),
            "hard" => Some(Self::Hard),
            "insane" => Some(Self::Insane),
            _ => None,
        }
    }
}

/// Tracked challenge record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ctf {
    pub id: CtfId,
    pub title: String,
    pub description: String,
    /// Free-form challenge area such as `web`, `crypto` or `pwn`.
    pub category: Option<String>,
    pub difficulty: CtfDifficulty,
    pub points: i64,
    /// Expected flag shape, e.g. `flag{...}`. The flag itself is never stored.
    pub flag_format: Option<String>,
    /// Event or platform hosting the challenge.
    pub platform: Option<String>,
    pub tags: Vec<String>,
    pub solved: bool,
    pub solved_at: Option<i64>,
    /// Page holding the write-up; cleared when that page is deleted.
    pub writeup_page_id: Option<PageId>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Ctf {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_ctf_fields(&self.title, self.points)
    }
}

pub(crate) fn validate_ctf_fields(title: &str, points: i64) -> Result<(), ValidationError> {
    require_text("title", title, MAX_TITLE_CHARS)?;
    if points <= 0 {
        return Err(ValidationError::NonPositivePoints(points));
    }
    Ok(())
}

/// Input for creating a challenge record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCtf {
    pub title: String,
    pub description: String,
    pub category: Option<String>,
    pub difficulty: CtfDifficulty,
    pub points: i64,
    pub flag_format: Option<String>,
    pub platform: Option<String>,
    pub tags: Vec<String>,
    pub writeup_page_id: Option<PageId>,
}

impl NewCtf {
    pub fn new(title: impl Into<String>, difficulty: CtfDifficulty, points: i64) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            category: None,
            difficulty,
            points,
            flag_format: None,
            platform: None,
            tags: Vec::new(),
            writeup_page_id: None,
        }
    }
}

/// Partial challenge update. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CtfPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<Option<String>>,
    pub difficulty: Option<CtfDifficulty>,
    pub points: Option<i64>,
    pub flag_format: Option<Option<String>>,
    pub platform: Option<Option<String>>,
    pub writeup_page_id: Option<Option<PageId>>,
}

/// Aggregate numbers for one difficulty bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DifficultyStats {
    pub difficulty: CtfDifficulty,
    pub total: u32,
    pub solved: u32,
}

/// Challenge tracking dashboard numbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CtfStats {
    pub total: u32,
    pub solved: u32,
    pub points_available: i64,
    pub points_earned: i64,
    /// Always one entry per difficulty, easiest first.
    pub by_difficulty: Vec<DifficultyStats>,
}
