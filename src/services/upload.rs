//! Post image storage
//!
//! Images are written to `<media root>/post_images/<uuid>.<ext>` and the
//! path relative to the media root is what gets stored on the post. The
//! media root is served read-only under `/media/`.

use std::path::{Component, Path, PathBuf};
use tokio::fs;
use uuid::Uuid;

use crate::config::{UploadConfig, POST_IMAGES_DIR};

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("Invalid file type: {0}")]
    InvalidType(String),

    #[error("File too large. Maximum size: {max} bytes ({} MB)", .max / 1024 / 1024)]
    TooLarge { max: u64 },

    #[error("Failed to store file: {0}")]
    Io(#[from] std::io::Error),
}

/// Stores and removes uploaded post images
#[derive(Debug, Clone)]
pub struct ImageStore {
    config: UploadConfig,
}

impl ImageStore {
    pub fn new(config: UploadConfig) -> Self {
        Self { config }
    }

    pub fn media_root(&self) -> &Path {
        &self.config.path
    }

    pub fn max_file_size(&self) -> u64 {
        self.config.max_file_size
    }

    /// Reject uploads with a disallowed type or above the size limit
    pub fn check(&self, content_type: &str, size: usize) -> Result<(), UploadError> {
        if !self.config.is_type_allowed(content_type) {
            return Err(UploadError::InvalidType(content_type.to_string()));
        }
        if size as u64 > self.config.max_file_size {
            return Err(UploadError::TooLarge {
                max: self.config.max_file_size,
            });
        }
        Ok(())
    }

    /// Validate and write an image. Returns its path relative to the media root.
    pub async fn save(&self, content_type: &str, data: &[u8]) -> Result<String, UploadError> {
        self.check(content_type, data.len())?;

        let dir = self.config.post_images_dir();
        if !dir.exists() {
            fs::create_dir_all(&dir).await?;
        }

        let filename = format!(
            "{}.{}",
            Uuid::new_v4(),
            self.config.get_extension(content_type)
        );
        fs::write(dir.join(&filename), data).await?;

        tracing::debug!("Stored image {} ({} bytes)", filename, data.len());
        Ok(format!("{}/{}", POST_IMAGES_DIR, filename))
    }

    /// Remove a stored image. Missing files and paths escaping the media
    /// root are ignored.
    pub async fn remove(&self, relative: &str) {
        let Some(path) = self.resolve(relative) else {
            tracing::warn!("Refusing to remove image outside media root: {}", relative);
            return;
        };
        if let Err(e) = fs::remove_file(&path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!("Failed to remove image {}: {}", path.display(), e);
            }
        }
    }

    fn resolve(&self, relative: &str) -> Option<PathBuf> {
        let relative = Path::new(relative);
        let safe = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        safe.then(|| self.config.path.join(relative))
    }
}
