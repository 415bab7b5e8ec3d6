//! Category model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::traits::{truncate_chars, Published};

/// Thematic grouping for posts, addressed publicly by its slug.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Category {
    pub id: i64,
    pub title: String,
    pub description: String,
    /// URL identifier; letters, digits, hyphen and underscore only
    pub slug: String,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
}

impl Category {
    /// Create a new published category. The ID is assigned by the database.
    pub fn new(title: String, description: String, slug: String) -> Self {
        Self {
            id: 0,
            title,
            description,
            slug,
            is_published: true,
            created_at: Utc::now(),
        }
    }

    pub fn hidden(mut self) -> Self {
        self.is_published = false;
        self
    }
}

impl Published for Category {
    fn is_published(&self) -> bool {
        self.is_published
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(truncate_chars(&self.title, super::DISPLAY_TITLE_LEN))
    }
}

/// Category columns carried along with an annotated post
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategorySummary {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub is_published: bool,
}

impl From<&Category> for CategorySummary {
    fn from(category: &Category) -> Self {
        Self {
            id: category.id,
            title: category.title.clone(),
            slug: category.slug.clone(),
            is_published: category.is_published,
        }
    }
}
