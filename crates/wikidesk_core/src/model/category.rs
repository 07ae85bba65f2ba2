//! Category model used to tag pages.

use super::{require_text, ValidationError, MAX_TITLE_CHARS};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable category identifier.
pub type CategoryId = Uuid;

static HEX_COLOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#[0-9a-fA-F]{6}$").expect("valid color regex"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    /// Unique case-insensitively.
    pub name: String,
    pub description: Option<String>,
    /// `#rrggbb`, stored lowercase.
    pub color: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Category {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("name", &self.name, MAX_TITLE_CHARS)?;
        if let Some(color) = self.color.as_deref() {
            validate_color(color)?;
        }
        Ok(())
    }
}

/// Category list row with the number of linked pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryWithCount {
    pub category: Category,
    pub page_count: u32,
}

/// Partial category update. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryPatch {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub color: Option<Option<String>>,
}

pub fn validate_color(value: &str) -> Result<(), ValidationError> {
    if HEX_COLOR_RE.is_match(value) {
        Ok(())
    } else {
        Err(ValidationError::InvalidColor(value.to_string()))
    }
}

/// Trims and lowercases a color; blank input means "no color".
pub fn normalize_color(value: Option<String>) -> Option<String> {
    value
        .map(|color| color.trim().to_ascii_lowercase())
        .filter(|color| !color.is_empty())
}

#[cfg(test)]
mod tests {
    use super::{normalize_color, validate_color};

    #[test]
    fn color_must_be_six_hex_digits() {
        assert!(validate_color("#a1B2c3").is_ok());
        assert!(validate_color("#abc").is_err());
        assert!(validate_color("red").is_err());
    }

    #[test]
    fn normalize_color_drops_blank_values() {
        assert_eq!(normalize_color(Some("  ".to_string())), None);
        assert_eq!(
            normalize_color(Some(" #FFAA00 ".to_string())).as_deref(),
            Some("#ffaa00")
        );
    }
}
