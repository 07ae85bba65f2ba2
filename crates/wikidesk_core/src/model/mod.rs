//! Domain model for the wiki store.
//!
//! # Responsibility
//! - Define canonical records for pages, folders, media, CTFs, categories,
//!   backups and admin settings.
//! - Own record-level validation (`validate()`), shared by every write path.
//!
//! # Invariants
//! - Every record is identified by a stable v4 `Uuid`.
//! - Timestamps are Unix epoch milliseconds.

use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub mod backup;
pub mod category;
pub mod ctf;
pub mod folder;
pub mod media;
pub mod page;
pub mod settings;

/// Maximum characters for titles and names.
pub const MAX_TITLE_CHARS: usize = 200;

/// Record-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Required text field is empty after trim.
    BlankField(&'static str),
    /// Text field exceeds its character limit.
    TooLong {
        field: &'static str,
        max_chars: usize,
    },
    /// Name contains a reserved character (`/`).
    InvalidName(String),
    /// Color is not in `#rrggbb` form.
    InvalidColor(String),
    /// CTF points must be strictly positive.
    NonPositivePoints(i64),
    /// Numeric value outside its accepted range.
    OutOfRange {
        field: &'static str,
        min: i64,
        max: i64,
        actual: i64,
    },
    /// Media size cannot be negative.
    NegativeSize(i64),
    /// Folder points at a parent that is not part of the same set.
    MissingParent { folder_id: Uuid, parent_id: Uuid },
    /// Folder is its own ancestor.
    FolderCycle(Uuid),
    /// Two folders under one parent share a name (ASCII case-insensitive).
    DuplicateSiblingName(String),
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankField(field) => write!(f, "`{field}` must not be blank"),
            Self::TooLong { field, max_chars } => {
                write!(f, "`{field}` must be at most {max_chars} characters")
            }
            Self::InvalidName(value) => write!(f, "name `{value}` must not contain `/`"),
            Self::InvalidColor(value) => write!(f, "invalid color `{value}`; expected #rrggbb"),
            Self::NonPositivePoints(points) => {
                write!(f, "points must be greater than zero, got {points}")
            }
            Self::OutOfRange {
                field,
                min,
                max,
                actual,
            } => write!(f, "`{field}` must be within {min}..={max}, got {actual}"),
            Self::NegativeSize(size) => write!(f, "size must not be negative, got {size}"),
            Self::MissingParent {
                folder_id,
                parent_id,
            } => write!(f, "folder {folder_id} references missing parent {parent_id}"),
            Self::FolderCycle(id) => write!(f, "folder {id} is its own ancestor"),
            Self::DuplicateSiblingName(name) => {
                write!(f, "folder name `{name}` is used twice under one parent")
            }
        }
    }
}

impl Error for ValidationError {}

pub(crate) fn require_text(
    field: &'static str,
    value: &str,
    max_chars: usize,
) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::BlankField(field));
    }
    if value.chars().count() > max_chars {
        return Err(ValidationError::TooLong { field, max_chars });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{require_text, ValidationError};

    #[test]
    fn require_text_rejects_whitespace_only() {
        assert_eq!(
            require_text("title", "  \t", 10),
            Err(ValidationError::BlankField("title"))
        );
    }

    #[test]
    fn require_text_counts_chars_not_bytes() {
        assert!(require_text("name", "ééééé", 5).is_ok());
        assert!(matches!(
            require_text("name", "éééééé", 5),
            Err(ValidationError::TooLong { .. })
        ));
    }
}
