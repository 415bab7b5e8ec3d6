//! Location service

use crate::db::repositories::LocationRepository;
use crate::models::{Location, MAX_TITLE_LEN};
use anyhow::Context;
use std::sync::Arc;

/// Error types for location service operations
#[derive(Debug, thiserror::Error)]
pub enum LocationServiceError {
    #[error("Location not found: {0}")]
    NotFound(i64),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Location service
pub struct LocationService {
    repo: Arc<dyn LocationRepository>,
}

impl LocationService {
    pub fn new(repo: Arc<dyn LocationRepository>) -> Self {
        Self { repo }
    }

    pub async fn create(&self, name: &str, is_published: bool) -> Result<Location, LocationServiceError> {
        let name = name.trim();
        if name.is_empty() || name.chars().count() > MAX_TITLE_LEN {
            return Err(LocationServiceError::ValidationError(format!(
                "Location name must be 1-{} characters",
                MAX_TITLE_LEN
            )));
        }

        let mut location = Location::new(name.to_string());
        location.is_published = is_published;

        let created = self
            .repo
            .create(&location)
            .await
            .context("Failed to create location")?;

        tracing::info!("Created location {} ({})", created.name, created.id);
        Ok(created)
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<Location>, LocationServiceError> {
        Ok(self
            .repo
            .get_by_id(id)
            .await
            .context("Failed to get location by ID")?)
    }

    pub async fn list(&self) -> Result<Vec<Location>, LocationServiceError> {
        Ok(self.repo.list().await.context("Failed to list locations")?)
    }

    /// Delete a location; its posts lose their location
    pub async fn delete(&self, id: i64) -> Result<(), LocationServiceError> {
        let deleted = self
            .repo
            .delete(id)
            .await
            .context("Failed to delete location")?;
        if !deleted {
            return Err(LocationServiceError::NotFound(id));
        }
        tracing::info!("Deleted location {}", id);
        Ok(())
    }
}
