//! # Blogstore - local content store for a personal blog
//!
//! Blogstore keeps a blog's content in an embedded SQLite database:
//! - Posts with denormalized like and comment counters
//! - Comments and likes, kept consistent with those counters
//! - An ordered featured-post set for the homepage
//! - Per-profile session flags (liked posts, commenter name, admin login)
//!
//! [`ContentStore`] is the fallible data-access layer. [`Blog`] wraps it with
//! the session flags and degrades failures to empty results for UI callers.

pub mod id;
pub mod post;
pub mod comment;
pub mod like;
pub mod featured;
pub mod storage;
pub mod prefs;
pub mod blog;
pub mod seed;
pub mod config;
pub mod ui;

// Re-exports for convenient access
pub use post::{Author, Post};
pub use comment::Comment;
pub use like::Like;
pub use featured::FeaturedPostRef;
pub use storage::{ContentStore, ReconcileReport, StoreStats};
pub use prefs::{FilePreferences, MemoryPreferences, PreferenceStore, Session};
pub use blog::Blog;

/// Result type alias for Blogstore operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Blogstore operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Record already exists: {0}")]
    Conflict(String),

    #[error("Post not found: {0}")]
    PostNotFound(String),

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("Storage task failed: {0}")]
    Task(String),
}
