//! Featured-post references
//!
//! The featured set is an ordered list of post ids for the homepage. It is
//! always replaced as a whole; individual references are never patched.

use crate::id;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeaturedPostRef {
    pub id: String,
    /// Referenced post
    pub post_id: String,
    /// Display position, ascending
    pub order: u32,
}

impl FeaturedPostRef {
    /// Build the reference rows for an ordered list of post ids
    pub fn from_ids<S: AsRef<str>>(post_ids: &[S]) -> Vec<Self> {
        post_ids
            .iter()
            .enumerate()
            .map(|(index, post_id)| Self {
                id: id::featured(index),
                post_id: post_id.as_ref().to_string(),
                order: index as u32,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_ids_assigns_positions() {
        let refs = FeaturedPostRef::from_ids(&["b", "a", "c"]);
        assert_eq!(refs.len(), 3);
        assert_eq!(refs[0].post_id, "b");
        assert_eq!(refs[0].order, 0);
        assert_eq!(refs[2].id, "featured-2");
        assert_eq!(refs[2].order, 2);
    }
}
