//! Category service
//!
//! Category management used by the `manage` binary, and the published-only
//! lookup used by the category listing page.

use crate::db::repositories::CategoryRepository;
use crate::models::{Category, Published, MAX_TITLE_LEN};
use anyhow::Context;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

/// Upper bound for category slugs
pub const MAX_SLUG_LEN: usize = 64;

static SLUG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[-a-zA-Z0-9_]+$").expect("slug pattern is valid"));

/// Error types for category service operations
#[derive(Debug, thiserror::Error)]
pub enum CategoryServiceError {
    /// Category slug already exists
    #[error("Category slug already exists: {0}")]
    DuplicateSlug(String),

    /// Category not found
    #[error("Category not found: {0}")]
    NotFound(String),

    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Input for creating a category
#[derive(Debug, Clone)]
pub struct CreateCategoryInput {
    pub title: String,
    pub description: String,
    pub slug: String,
    pub is_published: bool,
}

impl CreateCategoryInput {
    pub fn new(slug: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            slug: slug.into(),
            is_published: true,
        }
    }
}

/// Category service for managing blog categories
pub struct CategoryService {
    repo: Arc<dyn CategoryRepository>,
}

impl CategoryService {
    pub fn new(repo: Arc<dyn CategoryRepository>) -> Self {
        Self { repo }
    }

    /// Create a new category.
    ///
    /// # Errors
    /// - `ValidationError` for an empty or overlong title, or a malformed slug
    /// - `DuplicateSlug` if the slug is taken
    pub async fn create(&self, input: CreateCategoryInput) -> Result<Category, CategoryServiceError> {
        let title = input.title.trim();
        if title.is_empty() {
            return Err(CategoryServiceError::ValidationError(
                "Category title cannot be empty".to_string(),
            ));
        }
        if title.chars().count() > MAX_TITLE_LEN {
            return Err(CategoryServiceError::ValidationError(format!(
                "Category title cannot exceed {} characters",
                MAX_TITLE_LEN
            )));
        }
        validate_slug(&input.slug)?;

        if self
            .repo
            .exists_by_slug(&input.slug)
            .await
            .context("Failed to check slug")?
        {
            return Err(CategoryServiceError::DuplicateSlug(input.slug));
        }

        let mut category = Category::new(title.to_string(), input.description, input.slug);
        category.is_published = input.is_published;

        let created = self
            .repo
            .create(&category)
            .await
            .context("Failed to create category")?;

        tracing::info!("Created category {} ({})", created.slug, created.id);
        Ok(created)
    }

    /// A category that may be shown publicly.
    ///
    /// Unknown and unpublished categories are both reported as `NotFound`.
    pub async fn get_published_by_slug(&self, slug: &str) -> Result<Category, CategoryServiceError> {
        self.repo
            .get_by_slug(slug)
            .await
            .context("Failed to get category by slug")?
            .filter(Published::is_published)
            .ok_or_else(|| CategoryServiceError::NotFound(slug.to_string()))
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<Category>, CategoryServiceError> {
        Ok(self
            .repo
            .get_by_id(id)
            .await
            .context("Failed to get category by ID")?)
    }

    pub async fn list(&self) -> Result<Vec<Category>, CategoryServiceError> {
        Ok(self.repo.list().await.context("Failed to list categories")?)
    }

    /// Publish or hide a category and, through it, all of its posts
    pub async fn set_published(
        &self,
        slug: &str,
        is_published: bool,
    ) -> Result<Category, CategoryServiceError> {
        let mut category = self.get_by_slug(slug).await?;
        self.repo
            .set_published(category.id, is_published)
            .await
            .context("Failed to update category")?;
        category.is_published = is_published;
        Ok(category)
    }

    /// Delete a category; its posts lose their category
    pub async fn delete(&self, slug: &str) -> Result<(), CategoryServiceError> {
        let category = self.get_by_slug(slug).await?;
        self.repo
            .delete(category.id)
            .await
            .context("Failed to delete category")?;
        tracing::info!("Deleted category {}", slug);
        Ok(())
    }

    /// Any category, published or not
    pub async fn get_by_slug(&self, slug: &str) -> Result<Category, CategoryServiceError> {
        self.repo
            .get_by_slug(slug)
            .await
            .context("Failed to get category by slug")?
            .ok_or_else(|| CategoryServiceError::NotFound(slug.to_string()))
    }
}

fn validate_slug(slug: &str) -> Result<(), CategoryServiceError> {
    if slug.len() > MAX_SLUG_LEN || !SLUG_RE.is_match(slug) {
        return Err(CategoryServiceError::ValidationError(format!(
            "Slug must be 1-{} characters of latin letters, digits, hyphen and underscore",
            MAX_SLUG_LEN
        )));
    }
    Ok(())
}
