//! Storage Layer - SQLite-backed persistence
//!
//! System of record is SQLite with tables:
//! - posts(id, title, excerpt, content, category, author, date, likes, comments, cover_image)
//! - comments(id, post_id, author, content, date)
//! - likes(id, post_id, timestamp)
//! - featured_posts(id, post_id, position)
//!
//! Every public operation opens its own connection, runs one transaction and
//! closes the connection again.

pub mod schema;
pub mod sqlite;

pub use sqlite::{ContentStore, ReconcileReport, StoreStats};
