//! Comment records

use crate::id;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A reader comment on a post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    /// Owning post
    pub post_id: String,
    /// Author display name
    pub author: String,
    pub content: String,
    /// Creation timestamp
    pub date: DateTime<Utc>,
}

impl Comment {
    /// Create a comment stamped with the current time
    pub fn new(
        id: impl Into<String>,
        post_id: impl Into<String>,
        author: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            post_id: post_id.into(),
            author: author.into(),
            content: content.into(),
            date: Utc::now(),
        }
    }

    /// Create a comment with a generated id
    pub fn compose(post_id: impl Into<String>, author: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(id::generate("comment"), post_id, author, content)
    }

    /// Override the creation timestamp
    pub fn with_date(mut self, date: DateTime<Utc>) -> Self {
        self.date = date;
        self
    }
}
