//! Category use-case service.

use crate::model::category::{
    normalize_color, validate_color, Category, CategoryId, CategoryPatch, CategoryWithCount,
};
use crate::model::ValidationError;
use crate::repo::category_repo::CategoryRepository;
use crate::repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Service error for category use-cases.
#[derive(Debug)]
pub enum CategoryServiceError {
    /// Name is blank after trim.
    InvalidName,
    /// Another category already uses this name (case-insensitive).
    DuplicateName(String),
    /// Target category does not exist.
    CategoryNotFound(CategoryId),
    /// Record failed model validation.
    Validation(ValidationError),
    /// Persistence-layer failure.
    Repo(RepoError),
}

impl Display for CategoryServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidName => write!(f, "category name must not be blank"),
            Self::DuplicateName(name) => write!(f, "category `{name}` already exists"),
            Self::CategoryNotFound(id) => write!(f, "category not found: {id}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for CategoryServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for CategoryServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound {
                entity: "category",
                id,
            } => Self::CategoryNotFound(id),
            RepoError::Validation(err) => Self::Validation(err),
            other => Self::Repo(other),
        }
    }
}

impl From<ValidationError> for CategoryServiceError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

/// Category service facade.
pub struct CategoryService<R: CategoryRepository> {
    repo: R,
}

impl<R: CategoryRepository> CategoryService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn create_category(
        &self,
        name: impl Into<String>,
        description: Option<String>,
        color: Option<String>,
    ) -> Result<Category, CategoryServiceError> {
        let name = normalize_name(name.into())?;
        self.ensure_unique_name(&name, None)?;
        let color = checked_color(color)?;

        let category = Category {
            id: CategoryId::new_v4(),
            name,
            description: normalize_optional(description),
            color,
            created_at: 0,
            updated_at: 0,
        };
        Ok(self.repo.insert_category(&category)?)
    }

    pub fn get_category(&self, id: CategoryId) -> Result<Category, CategoryServiceError> {
        self.repo
            .get_category(id)?
            .ok_or(CategoryServiceError::CategoryNotFound(id))
    }

    /// Lists categories by name with linked page counts.
    pub fn list_categories(&self) -> Result<Vec<CategoryWithCount>, CategoryServiceError> {
        Ok(self.repo.list_categories()?)
    }

    pub fn update_category(
        &self,
        id: CategoryId,
        patch: CategoryPatch,
    ) -> Result<Category, CategoryServiceError> {
        let mut category = self.get_category(id)?;
        if let Some(name) = patch.name {
            let name = normalize_name(name)?;
            self.ensure_unique_name(&name, Some(id))?;
            category.name = name;
        }
        if let Some(description) = patch.description {
            category.description = normalize_optional(description);
        }
        if let Some(color) = patch.color {
            category.color = checked_color(color)?;
        }
        self.repo.update_category(&category)?;
        self.get_category(id)
    }

    /// Deletes a category. Linked pages stay and lose the link.
    pub fn delete_category(&self, id: CategoryId) -> Result<(), CategoryServiceError> {
        self.repo.delete_category(id)?;
        Ok(())
    }

    pub fn count_categories(&self) -> Result<u32, CategoryServiceError> {
        Ok(self.repo.count_categories()?)
    }

    fn ensure_unique_name(
        &self,
        name: &str,
        exclude: Option<CategoryId>,
    ) -> Result<(), CategoryServiceError> {
        if self.repo.name_taken(name, exclude)? {
            return Err(CategoryServiceError::DuplicateName(name.to_string()));
        }
        Ok(())
    }
}

fn normalize_name(value: String) -> Result<String, CategoryServiceError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CategoryServiceError::InvalidName);
    }
    Ok(trimmed.to_string())
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

fn checked_color(value: Option<String>) -> Result<Option<String>, CategoryServiceError> {
    let color = normalize_color(value);
    if let Some(color) = color.as_deref() {
        validate_color(color)?;
    }
    Ok(color)
}
