//! Admin settings service.
//!
//! Stored keys overlay `WikiSettings::default()`; keys this build does not
//! know are ignored on read.

use crate::model::settings::WikiSettings;
use crate::model::ValidationError;
use crate::repo::settings_repo::SettingsRepository;
use crate::repo::RepoError;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug)]
pub enum SettingsServiceError {
    /// Settings failed validation.
    Validation(ValidationError),
    /// A stored value cannot be decoded into its field.
    CorruptValue { key: String, message: String },
    /// Persistence-layer failure.
    Repo(RepoError),
}

impl Display for SettingsServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::CorruptValue { key, message } => {
                write!(f, "stored setting `{key}` is invalid: {message}")
            }
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SettingsServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::CorruptValue { .. } => None,
        }
    }
}

impl From<RepoError> for SettingsServiceError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<ValidationError> for SettingsServiceError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

/// Settings service facade.
pub struct SettingsService<R: SettingsRepository> {
    repo: R,
}

impl<R: SettingsRepository> SettingsService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Returns defaults overlaid with every stored known key.
    pub fn get_settings(&self) -> Result<WikiSettings, SettingsServiceError> {
        let stored = self.repo.get_all()?;
        overlay_settings(&stored)
    }

    /// Validates and stores every field.
    pub fn update_settings(
        &self,
        settings: WikiSettings,
    ) -> Result<WikiSettings, SettingsServiceError> {
        settings.validate()?;
        let encoded = encode_settings(&settings)?;
        self.repo.put_many(&encoded)?;
        self.get_settings()
    }

    /// Drops every stored key so defaults apply again.
    pub fn reset_settings(&self) -> Result<WikiSettings, SettingsServiceError> {
        self.repo.clear()?;
        Ok(WikiSettings::default())
    }
}

/// Decodes stored `key -> JSON` rows on top of the defaults.
pub fn overlay_settings(
    stored: &BTreeMap<String, String>,
) -> Result<WikiSettings, SettingsServiceError> {
    let mut fields = default_fields()?;
    for (key, raw) in stored {
        if !fields.contains_key(key) {
            continue;
        }
        let value: Value =
            serde_json::from_str(raw).map_err(|err| SettingsServiceError::CorruptValue {
                key: key.clone(),
                message: err.to_string(),
            })?;
        fields.insert(key.clone(), value);
    }

    serde_json::from_value(Value::Object(fields)).map_err(|err| {
        SettingsServiceError::CorruptValue {
            key: "*".to_string(),
            message: err.to_string(),
        }
    })
}

fn encode_settings(
    settings: &WikiSettings,
) -> Result<BTreeMap<String, String>, SettingsServiceError> {
    let fields = match serde_json::to_value(settings) {
        Ok(Value::Object(fields)) => fields,
        Ok(_) | Err(_) => {
            return Err(SettingsServiceError::CorruptValue {
                key: "*".to_string(),
                message: "settings do not encode to an object".to_string(),
            })
        }
    };
    Ok(fields
        .into_iter()
        .map(|(key, value)| (key, value.to_string()))
        .collect())
}

fn default_fields() -> Result<Map<String, Value>, SettingsServiceError> {
    match serde_json::to_value(WikiSettings::default()) {
        Ok(Value::Object(fields)) => Ok(fields),
        Ok(_) | Err(_) => Err(SettingsServiceError::CorruptValue {
            key: "*".to_string(),
            message: "default settings do not encode to an object".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::overlay_settings;
    use crate::model::page::PageStatus;
    use std::collections::BTreeMap;

    #[test]
    fn overlay_keeps_defaults_for_missing_keys_and_ignores_unknown() {
        let mut stored = BTreeMap::new();
        stored.insert("site_name".to_string(), "\"Ops Wiki\"".to_string());
        stored.insert("default_page_status".to_string(), "\"published\"".to_string());
        stored.insert("legacy_theme".to_string(), "\"dark\"".to_string());

        let settings = overlay_settings(&stored).expect("overlay should decode");
        assert_eq!(settings.site_name, "Ops Wiki");
        assert_eq!(settings.default_page_status, PageStatus::Published);
        assert_eq!(settings.items_per_page, 20);
    }

    #[test]
    fn overlay_rejects_undecodable_values() {
        let mut stored = BTreeMap::new();
        stored.insert("items_per_page".to_string(), "not json".to_string());
        assert!(overlay_settings(&stored).is_err());
    }
}
