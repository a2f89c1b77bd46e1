//! Blog facade - the store as UI code sees it
//!
//! Every operation except [`Blog::initialize`] logs failures and degrades to
//! an empty list, `false`, `0` or `None`. UI callers then show an empty state
//! or a generic notice instead of a raw error. The drawback is that "empty"
//! and "failed" look the same; callers that care go through
//! [`Blog::store`], which returns `Result`.

use tracing::{debug, error, warn};

use crate::comment::Comment;
use crate::post::Post;
use crate::prefs::{PreferenceStore, Session};
use crate::storage::ContentStore;
use crate::{Error, Result};

fn recover<T: Default>(op: &str, result: Result<T>) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            error!(op, error = %e, "blog operation failed");
            T::default()
        }
    }
}

/// Content store plus this profile's session flags.
pub struct Blog<P> {
    store: ContentStore,
    session: Session<P>,
}

impl<P: PreferenceStore> Blog<P> {
    pub fn new(store: ContentStore, prefs: P) -> Self {
        Self {
            store,
            session: Session::new(prefs),
        }
    }

    /// The fallible store underneath
    pub fn store(&self) -> &ContentStore {
        &self.store
    }

    pub fn session(&self) -> &Session<P> {
        &self.session
    }

    /// Provision and seed the store. Unlike every other operation, failure is returned.
    pub async fn initialize(&self, seed: &[Post]) -> Result<()> {
        self.store.initialize(seed).await
    }

    // ========== Posts ==========

    pub async fn list_posts(&self) -> Vec<Post> {
        recover("list_posts", self.store.list_posts().await)
    }

    pub async fn get_post(&self, id: &str) -> Option<Post> {
        recover("get_post", self.store.get_post(id).await)
    }

    pub async fn create_post(&self, post: &Post) -> bool {
        recover("create_post", self.store.create_post(post).await.map(|_| true))
    }

    pub async fn replace_post(&self, post: &Post) -> bool {
        recover("replace_post", self.store.replace_post(post).await.map(|_| true))
    }

    /// Delete a post with its comments, likes and featured entry, and forget
    /// this profile's like flag for it. Returns whether the post existed.
    pub async fn delete_post(&self, id: &str) -> bool {
        recover("delete_post", self.try_delete_post(id).await)
    }

    async fn try_delete_post(&self, id: &str) -> Result<bool> {
        let existed = self.store.delete_post(id).await?;
        self.session.clear_liked(id)?;
        Ok(existed)
    }

    // ========== Comments ==========

    pub async fn list_comments(&self, post_id: &str) -> Vec<Comment> {
        recover("list_comments", self.store.list_comments(post_id).await)
    }

    /// Add a comment and remember its author name for the next comment form
    pub async fn add_comment(&self, comment: &Comment) -> bool {
        recover("add_comment", self.try_add_comment(comment).await)
    }

    async fn try_add_comment(&self, comment: &Comment) -> Result<bool> {
        self.store.add_comment(comment).await?;
        self.session.remember_name(&comment.author)?;
        Ok(true)
    }

    pub async fn remove_comment(&self, id: &str, post_id: &str) -> bool {
        recover("remove_comment", self.store.remove_comment(id, post_id).await)
    }

    pub async fn update_comment(&self, comment: &Comment) -> bool {
        recover("update_comment", self.store.update_comment(comment).await)
    }

    // ========== Likes ==========

    pub async fn count_likes(&self, post_id: &str) -> usize {
        recover("count_likes", self.store.count_likes(post_id).await)
    }

    /// Session flag only; the like rows are not consulted
    pub fn has_liked(&self, post_id: &str) -> bool {
        recover("has_liked", self.session.has_liked(post_id))
    }

    /// Like a post. A profile holds at most one like per post, so liking
    /// again is a no-op that still reports success.
    pub async fn like(&self, post_id: &str) -> bool {
        recover("like", self.try_like(post_id).await)
    }

    async fn try_like(&self, post_id: &str) -> Result<bool> {
        if self.session.has_liked(post_id)? {
            if self.session.liked_like_id(post_id)?.is_none() {
                debug!(post = %post_id, "liked by a flag without a like id, nothing to record");
            } else {
                debug!(post = %post_id, "already liked");
            }
            return Ok(true);
        }
        if self.store.get_post(post_id).await?.is_none() {
            return Err(Error::PostNotFound(post_id.to_string()));
        }
        let like = self.store.add_like(post_id).await?;
        if let Err(e) = self.session.mark_liked(post_id, &like.id) {
            // The row and counter are committed but this profile cannot unlike them
            warn!(post = %post_id, like = %like.id, error = %e, "like recorded without session flag");
            return Err(e);
        }
        Ok(true)
    }

    /// Withdraw this profile's like. Only the row this profile created is
    /// removed; likes from elsewhere are left alone.
    pub async fn unlike(&self, post_id: &str) -> bool {
        recover("unlike", self.try_unlike(post_id).await)
    }

    async fn try_unlike(&self, post_id: &str) -> Result<bool> {
        if let Some(like_id) = self.session.liked_like_id(post_id)? {
            if !self.store.remove_like(&like_id, post_id).await? {
                debug!(post = %post_id, like = %like_id, "like row already gone");
            }
        }
        self.session.clear_liked(post_id)?;
        Ok(true)
    }

    // ========== Featured ==========

    pub async fn list_featured(&self) -> Vec<Post> {
        recover("list_featured", self.store.list_featured().await)
    }

    /// Replace the featured set. Size limits are the caller's policy.
    pub async fn replace_featured(&self, post_ids: &[String]) -> bool {
        recover("replace_featured", self.store.replace_featured(post_ids).await.map(|_| true))
    }

    // ========== Queries ==========

    pub async fn recent_posts(&self) -> Vec<Post> {
        recover("recent_posts", self.store.recent_posts().await)
    }

    pub async fn related_posts(&self, exclude_id: &str, category: &str) -> Vec<Post> {
        recover("related_posts", self.store.related_posts(exclude_id, category).await)
    }

    pub async fn search_posts(&self, term: &str, category: Option<&str>) -> Vec<Post> {
        recover("search_posts", self.store.search_posts(term, category).await)
    }

    pub async fn categories(&self) -> Vec<String> {
        recover("categories", self.store.categories().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::post::Author;
    use crate::prefs::MemoryPreferences;
    use chrono::{TimeZone, Utc};

    fn post(id: &str, category: &str, day: u32) -> Post {
        Post::new(
            id,
            format!("Title {}", id),
            category,
            Author::new("Anna", "anna.png"),
            Utc.with_ymd_and_hms(2024, 5, day, 9, 0, 0).unwrap(),
        )
    }

    async fn blog() -> Blog<MemoryPreferences> {
        let blog = Blog::new(ContentStore::open_in_memory().unwrap(), MemoryPreferences::new());
        blog.initialize(&[post("p1", "tech", 3), post("p2", "tech", 1), post("p3", "life", 2)])
            .await
            .unwrap();
        blog
    }

    #[tokio::test]
    async fn test_deleted_post_leaves_no_trace() {
        let blog = blog().await;
        assert!(blog.add_comment(&Comment::new("c1", "p1", "A", "hi")).await);
        assert!(blog.like("p1").await);
        assert!(blog.has_liked("p1"));

        assert!(blog.delete_post("p1").await);

        assert!(blog.list_comments("p1").await.is_empty());
        assert_eq!(blog.count_likes("p1").await, 0);
        assert!(!blog.has_liked("p1"));
        assert!(blog.list_featured().await.iter().all(|p| p.id != "p1"));
        assert!(!blog.delete_post("p1").await);
    }

    #[tokio::test]
    async fn test_comment_count_matches_rows() {
        let blog = blog().await;
        for i in 0..4 {
            assert!(blog.add_comment(&Comment::new(format!("c{}", i), "p2", "A", "text")).await);
        }
        assert!(blog.remove_comment("c1", "p2").await);
        assert!(blog.remove_comment("c3", "p2").await);
        assert!(!blog.remove_comment("c3", "p2").await);

        let rows = blog.list_comments("p2").await.len() as u32;
        assert_eq!(rows, 2);
        assert_eq!(blog.get_post("p2").await.unwrap().comments, rows);
    }

    #[tokio::test]
    async fn test_add_then_remove_comment_is_net_zero() {
        let blog = blog().await;
        let before = blog.get_post("p1").await.unwrap().comments;

        assert!(blog.add_comment(&Comment::new("c1", "p1", "A", "hi")).await);
        assert!(blog.remove_comment("c1", "p1").await);

        assert_eq!(blog.get_post("p1").await.unwrap().comments, before);
        assert!(blog.list_comments("p1").await.is_empty());
        assert_eq!(blog.session().remembered_name().unwrap().as_deref(), Some("A"));
    }

    #[tokio::test]
    async fn test_like_toggle_follows_last_call() {
        let blog = blog().await;

        assert!(blog.unlike("p3").await);
        assert!(!blog.has_liked("p3"));
        assert_eq!(blog.get_post("p3").await.unwrap().likes, 0);

        assert!(blog.like("p3").await);
        assert!(blog.like("p3").await);
        assert!(blog.has_liked("p3"));
        assert_eq!(blog.get_post("p3").await.unwrap().likes, 1);
        assert_eq!(blog.count_likes("p3").await, 1);

        assert!(blog.unlike("p3").await);
        assert!(blog.unlike("p3").await);
        assert!(!blog.has_liked("p3"));
        assert_eq!(blog.get_post("p3").await.unwrap().likes, 0);
        assert_eq!(blog.count_likes("p3").await, 0);
    }

    #[tokio::test]
    async fn test_unlike_keeps_foreign_likes() {
        let blog = blog().await;
        blog.store().add_like("p1").await.unwrap();

        assert!(blog.like("p1").await);
        assert!(blog.unlike("p1").await);

        assert_eq!(blog.count_likes("p1").await, 1);
        assert_eq!(blog.get_post("p1").await.unwrap().likes, 1);
    }

    #[tokio::test]
    async fn test_like_missing_post_fails() {
        let blog = blog().await;
        assert!(!blog.like("ghost").await);
        assert!(!blog.has_liked("ghost"));
        assert_eq!(blog.count_likes("ghost").await, 0);
    }

    /// Accepts every key except like flags
    struct NoLikeFlags(MemoryPreferences);

    impl PreferenceStore for NoLikeFlags {
        fn get(&self, key: &str) -> Result<Option<String>> {
            self.0.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<()> {
            if key.starts_with("user_liked_") {
                return Err(Error::Io(std::io::Error::other("preferences are read-only")));
            }
            self.0.set(key, value)
        }

        fn remove(&self, key: &str) -> Result<()> {
            self.0.remove(key)
        }

        fn clear(&self) -> Result<()> {
            self.0.clear()
        }
    }

    #[tokio::test]
    async fn test_like_with_unsaved_flag_reports_failure() {
        let blog = Blog::new(ContentStore::open_in_memory().unwrap(), NoLikeFlags(MemoryPreferences::new()));
        blog.initialize(&[post("p1", "tech", 3)]).await.unwrap();

        assert!(!blog.like("p1").await);
        assert!(!blog.has_liked("p1"));

        // The committed row stays visible to the store for repair
        let likes = blog.store().list_likes("p1").await.unwrap();
        assert_eq!(likes.len(), 1);
        assert_eq!(blog.get_post("p1").await.unwrap().likes, 1);
        assert!(blog.store().remove_like(&likes[0].id, "p1").await.unwrap());
        assert_eq!(blog.get_post("p1").await.unwrap().likes, 0);
    }

    #[tokio::test]
    async fn test_featured_order() {
        let blog = blog().await;

        assert!(blog.replace_featured(&["p3".into(), "p1".into(), "p2".into()]).await);
        let ids: Vec<_> = blog.list_featured().await.into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec!["p3", "p1", "p2"]);

        assert!(blog.replace_featured(&["p1".into(), "x".into(), "p2".into()]).await);
        let ids: Vec<_> = blog.list_featured().await.into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec!["p1", "p2"]);
    }

    #[tokio::test]
    async fn test_seed_scenario() {
        let blog = blog().await;
        blog.initialize(&[post("p1", "tech", 3), post("p2", "tech", 1), post("p3", "life", 2)])
            .await
            .unwrap();
        assert_eq!(blog.list_posts().await.len(), 3);

        let related: Vec<_> = blog.related_posts("p1", "tech").await.into_iter().map(|p| p.id).collect();
        assert_eq!(related, vec!["p2"]);

        let recent: Vec<_> = blog.recent_posts().await.into_iter().map(|p| p.id).collect();
        assert_eq!(recent, vec!["p1", "p3", "p2"]);
    }

    #[tokio::test]
    async fn test_create_conflict_degrades_to_false() {
        let blog = blog().await;
        assert!(!blog.create_post(&post("p1", "tech", 9)).await);
        assert!(blog.create_post(&post("p4", "news", 9)).await);
        assert!(blog.replace_post(&post("p4", "news", 10)).await);
        assert_eq!(blog.categories().await, vec!["tech", "life", "news"]);
    }

    #[tokio::test]
    async fn test_storage_failure_degrades() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store").join("blog.db");
        let blog = Blog::new(ContentStore::open(&path).unwrap(), MemoryPreferences::new());
        blog.initialize(&[post("p1", "tech", 3)]).await.unwrap();

        std::fs::remove_dir_all(dir.path().join("store")).unwrap();

        assert!(blog.list_posts().await.is_empty());
        assert!(blog.get_post("p1").await.is_none());
        assert!(!blog.add_comment(&Comment::new("c1", "p1", "A", "hi")).await);
        assert!(blog.store().list_posts().await.is_err());
        assert!(blog.initialize(&[post("p1", "tech", 3)]).await.is_err());
    }
}
