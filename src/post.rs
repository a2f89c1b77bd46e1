//! Post records
//!
//! A post is a published article. Besides its content it carries two
//! denormalized engagement counters, `likes` and `comments`, which the store
//! keeps in step with the Like and Comment collections.

use crate::{Error, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Author shown on a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    /// Display name
    pub name: String,
    /// Avatar image reference (URL or asset path)
    #[serde(default)]
    pub avatar: String,
}

impl Author {
    pub fn new(name: impl Into<String>, avatar: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            avatar: avatar.into(),
        }
    }
}

/// A blog post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    /// Opaque identifier, primary key
    pub id: String,
    pub title: String,
    /// Short teaser shown in listings
    #[serde(default)]
    pub excerpt: String,
    /// Rich-text (HTML) body
    #[serde(default)]
    pub content: String,
    /// Category label, used for related posts and filtering
    pub category: String,
    pub author: Author,
    /// Publication timestamp
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub date: DateTime<Utc>,
    /// Denormalized like count
    #[serde(default)]
    pub likes: u32,
    /// Denormalized comment count
    #[serde(default)]
    pub comments: u32,
    /// Optional cover image reference
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
}

impl Post {
    /// Create a post with empty body and zeroed counters
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        category: impl Into<String>,
        author: Author,
        date: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            excerpt: String::new(),
            content: String::new(),
            category: category.into(),
            author,
            date,
            likes: 0,
            comments: 0,
            cover_image: None,
        }
    }

    /// Set the excerpt
    pub fn with_excerpt(mut self, excerpt: impl Into<String>) -> Self {
        self.excerpt = excerpt.into();
        self
    }

    /// Set the HTML body
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    /// Set the cover image
    pub fn with_cover_image(mut self, cover_image: impl Into<String>) -> Self {
        self.cover_image = Some(cover_image.into());
        self
    }

    /// Case-insensitive match of `term` against title, excerpt, content and category.
    ///
    /// An empty term matches every post.
    pub fn matches(&self, term: &str) -> bool {
        let term = term.trim().to_lowercase();
        if term.is_empty() {
            return true;
        }
        [&self.title, &self.excerpt, &self.content, &self.category]
            .iter()
            .any(|field| field.to_lowercase().contains(&term))
    }
}

/// Parse a publication timestamp.
///
/// Accepts RFC 3339 (`2024-03-01T10:00:00Z`) and plain dates (`2024-03-01`,
/// read as midnight UTC).
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| Error::InvalidTimestamp(value.to_string()))
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> std::result::Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> Post {
        Post::new(
            "p1",
            "Rust ownership in practice",
            "tech",
            Author::new("Anna", "/avatars/anna.png"),
            Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap(),
        )
        .with_excerpt("Borrowing without tears")
        .with_content("<p>Lifetimes explained</p>")
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let rfc = parse_timestamp("2024-03-01T10:00:00+02:00").unwrap();
        assert_eq!(rfc, Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap());

        let day = parse_timestamp("2024-03-01").unwrap();
        assert_eq!(day, Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap());

        assert!(matches!(parse_timestamp("March 1st"), Err(Error::InvalidTimestamp(_))));
    }

    #[test]
    fn test_post_json_shape() {
        let json = r#"{
            "id": "p9",
            "title": "Hello",
            "category": "life",
            "author": { "name": "Anna", "avatar": "a.png" },
            "date": "2023-12-24",
            "coverImage": "cover.jpg"
        }"#;
        let post: Post = serde_json::from_str(json).unwrap();
        assert_eq!(post.id, "p9");
        assert_eq!(post.likes, 0);
        assert_eq!(post.comments, 0);
        assert_eq!(post.cover_image.as_deref(), Some("cover.jpg"));

        let out = serde_json::to_value(&post).unwrap();
        assert_eq!(out["coverImage"], "cover.jpg");
    }

    #[test]
    fn test_matches() {
        let post = sample();
        assert!(post.matches("OWNERSHIP"));
        assert!(post.matches("lifetimes"));
        assert!(post.matches("tech"));
        assert!(post.matches("  "));
        assert!(!post.matches("python"));
    }
}
