//! Location model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::traits::{truncate_chars, Published};

/// Place a post is about
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Location {
    pub id: i64,
    pub name: String,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
}

impl Location {
    pub fn new(name: String) -> Self {
        Self {
            id: 0,
            name,
            is_published: true,
            created_at: Utc::now(),
        }
    }

    pub fn hidden(mut self) -> Self {
        self.is_published = false;
        self
    }
}

impl Published for Location {
    fn is_published(&self) -> bool {
        self.is_published
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(truncate_chars(&self.name, super::DISPLAY_TITLE_LEN))
    }
}

/// Location columns carried along with an annotated post
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LocationSummary {
    pub id: i64,
    pub name: String,
    pub is_published: bool,
}
