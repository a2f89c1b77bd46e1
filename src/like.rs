//! Like records
//!
//! A like is a single like event on a post. It carries no user identity;
//! which profile created which row is tracked by the session flags.

use crate::id;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Like {
    pub id: String,
    pub post_id: String,
    pub timestamp: DateTime<Utc>,
}

impl Like {
    /// A fresh like on `post_id` with a generated id and the current time
    pub fn new(post_id: impl Into<String>) -> Self {
        Self {
            id: id::generate("like"),
            post_id: post_id.into(),
            timestamp: Utc::now(),
        }
    }
}
