//! Seed data loading
//!
//! The embedding application supplies default posts as a JSON array of post
//! records (see [`Post`] for the field names).

use std::path::Path;

use crate::post::Post;
use crate::Result;

/// Parse a JSON array of posts
pub fn parse_seed(json: &str) -> Result<Vec<Post>> {
    Ok(serde_json::from_str(json)?)
}

/// Read a seed file
pub fn load_seed(path: &Path) -> Result<Vec<Post>> {
    let contents = std::fs::read_to_string(path)?;
    parse_seed(&contents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn test_parse_seed() {
        let posts = parse_seed(
            r#"[
                {"id": "p1", "title": "One", "category": "tech",
                 "author": {"name": "Anna", "avatar": ""}, "date": "2024-01-05"},
                {"id": "p2", "title": "Two", "category": "life",
                 "author": {"name": "Anna"}, "date": "2024-01-06T09:30:00Z", "likes": 4}
            ]"#,
        )
        .unwrap();
        assert_eq!(posts.len(), 2);
        assert_eq!(posts[1].likes, 4);
        assert!(posts[1].author.avatar.is_empty());
    }

    #[test]
    fn test_parse_seed_rejects_bad_dates() {
        let result = parse_seed(
            r#"[{"id": "p1", "title": "One", "category": "tech",
                 "author": {"name": "Anna"}, "date": "yesterday"}]"#,
        );
        assert!(matches!(result, Err(Error::Serialization(_))));
    }
}
