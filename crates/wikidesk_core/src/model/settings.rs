//! Admin settings model.
//!
//! Settings are persisted one key per field; fields missing from storage
//! fall back to `WikiSettings::default()`.

use super::page::PageStatus;
use super::{require_text, ValidationError, MAX_TITLE_CHARS};
use serde::{Deserialize, Serialize};

pub const ITEMS_PER_PAGE_MIN: u32 = 1;
pub const ITEMS_PER_PAGE_MAX: u32 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WikiSettings {
    pub site_name: String,
    pub site_description: String,
    /// Status given to pages created without an explicit one.
    pub default_page_status: PageStatus,
    pub items_per_page: u32,
    pub allow_public_read: bool,
    /// Upper bound for registered uploads; `0` disables the check.
    pub max_upload_bytes: u64,
}

impl Default for WikiSettings {
    fn default() -> Self {
        Self {
            site_name: "Enterprise Wiki".to_string(),
            site_description: String::new(),
            default_page_status: PageStatus::Draft,
            items_per_page: 20,
            allow_public_read: false,
            max_upload_bytes: 50 * 1024 * 1024,
        }
    }
}

impl WikiSettings {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("site_name", &self.site_name, MAX_TITLE_CHARS)?;
        if !(ITEMS_PER_PAGE_MIN..=ITEMS_PER_PAGE_MAX).contains(&self.items_per_page) {
            return Err(ValidationError::OutOfRange {
                field: "items_per_page",
                min: i64::from(ITEMS_PER_PAGE_MIN),
                max: i64::from(ITEMS_PER_PAGE_MAX),
                actual: i64::from(self.items_per_page),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::WikiSettings;

    #[test]
    fn defaults_are_valid() {
        WikiSettings::default()
            .validate()
            .expect("default settings should validate");
    }

    #[test]
    fn items_per_page_zero_is_rejected() {
        let settings = WikiSettings {
            items_per_page: 0,
            ..WikiSettings::default()
        };
        assert!(settings.validate().is_err());
    }
}
