//! SQLite storage implementation

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use rusqlite::{params, Connection, ErrorCode, OpenFlags, OptionalExtension, TransactionBehavior};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::schema;
use crate::comment::Comment;
use crate::featured::FeaturedPostRef;
use crate::like::Like;
use crate::post::{Author, Post};
use crate::{Error, Result};

/// Number of seed posts that become the initial featured set
const SEED_FEATURED: usize = 3;

/// Maximum number of related posts returned
const RELATED_LIMIT: usize = 2;

const POST_COLUMNS: &str =
    "id, title, excerpt, content, category, author_name, author_avatar, date, likes, comments, cover_image";

const INSERT_POST: &str = r#"
INSERT INTO posts (id, title, excerpt, content, category, author_name, author_avatar, date, likes, comments, cover_image)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
"#;

/// Upsert tail for [`INSERT_POST`]; updating in place keeps the row's rowid.
///
/// `likes` and `comments` are left alone on conflict. They follow the like
/// and comment rows, not the edited record.
const UPSERT_POST: &str = r#"
ON CONFLICT(id) DO UPDATE SET
    title = excluded.title,
    excerpt = excluded.excerpt,
    content = excluded.content,
    category = excluded.category,
    author_name = excluded.author_name,
    author_avatar = excluded.author_avatar,
    date = excluded.date,
    cover_image = excluded.cover_image
"#;

static MEMORY_DB_SEQ: AtomicUsize = AtomicUsize::new(0);

#[derive(Debug)]
enum Location {
    File(PathBuf),
    /// Shared-cache in-memory database. The anchor connection keeps it alive
    /// between the short-lived per-operation connections, and its lock
    /// serializes transactions: shared-cache lock conflicts surface as
    /// `SQLITE_LOCKED`, which the busy handler never retries.
    Memory {
        uri: String,
        anchor: Mutex<Connection>,
    },
}

/// SQLite-backed store for posts, comments, likes and the featured set.
///
/// Cloning is cheap; clones share the same database.
#[derive(Debug, Clone)]
pub struct ContentStore {
    location: Arc<Location>,
}

impl ContentStore {
    /// Open a database file (creates it and its parent directory if missing)
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let location = Location::File(path.to_path_buf());
        provision(&connect(&location)?)?;
        Ok(Self { location: Arc::new(location) })
    }

    /// Open a private in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let seq = MEMORY_DB_SEQ.fetch_add(1, Ordering::Relaxed);
        let uri = format!(
            "file:blogstore-{}-{}?mode=memory&cache=shared",
            std::process::id(),
            seq
        );
        let anchor = Connection::open_with_flags(&uri, memory_flags())?;
        provision(&anchor)?;
        Ok(Self {
            location: Arc::new(Location::Memory { uri, anchor: Mutex::new(anchor) }),
        })
    }

    /// Path of the backing file, `None` for in-memory stores
    pub fn path(&self) -> Option<&Path> {
        match self.location.as_ref() {
            Location::File(path) => Some(path),
            Location::Memory { .. } => None,
        }
    }

    /// Run `f` inside a read transaction on a fresh connection
    async fn read<T, F>(&self, op: &'static str, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        self.transact(op, TransactionBehavior::Deferred, f).await
    }

    /// Run `f` inside a write transaction on a fresh connection.
    ///
    /// `BEGIN IMMEDIATE` takes the write lock up front, so two writers
    /// adjusting the same counter are serialized by SQLite (or by the anchor
    /// lock for in-memory stores).
    async fn write<T, F>(&self, op: &'static str, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        self.transact(op, TransactionBehavior::Immediate, f).await
    }

    async fn transact<T, F>(&self, op: &'static str, behavior: TransactionBehavior, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let location = Arc::clone(&self.location);
        tokio::task::spawn_blocking(move || -> Result<T> {
            debug!(op, "store operation");
            let _serial = match location.as_ref() {
                Location::Memory { anchor, .. } => Some(anchor.lock().unwrap_or_else(PoisonError::into_inner)),
                Location::File(_) => None,
            };
            let mut conn = connect(&location)?;
            let tx = conn.transaction_with_behavior(behavior)?;
            let out = f(&*tx)?;
            tx.commit()?;
            Ok(out)
        })
        .await
        .map_err(|e| Error::Task(e.to_string()))?
    }

    // ========== Initialization ==========

    /// Provision the schema and seed an empty store.
    ///
    /// Seeding happens only when the posts table is empty; the first three
    /// seed posts become the featured set. Running this again on a populated
    /// store changes nothing.
    pub async fn initialize(&self, seed: &[Post]) -> Result<()> {
        let seed = seed.to_vec();
        let seeded = self
            .write("initialize", move |conn| {
                provision(conn)?;
                if count_rows(conn, "posts")? > 0 {
                    return Ok(0);
                }
                for post in &seed {
                    insert_post(conn, post)?;
                }
                let featured: Vec<&str> = seed.iter().take(SEED_FEATURED).map(|p| p.id.as_str()).collect();
                write_featured(conn, &featured)?;
                Ok(seed.len())
            })
            .await?;

        if seeded > 0 {
            info!("Seeded store with {} default posts", seeded);
        } else {
            debug!("Store already populated, skipping seed");
        }
        Ok(())
    }

    // ========== Post Operations ==========

    /// All posts in store iteration (insertion) order
    pub async fn list_posts(&self) -> Result<Vec<Post>> {
        self.read("list_posts", |conn| select_posts(conn, "ORDER BY rowid", [])).await
    }

    /// Get a post by id
    pub async fn get_post(&self, id: &str) -> Result<Option<Post>> {
        let id = id.to_string();
        self.read("get_post", move |conn| fetch_post(conn, &id)).await
    }

    /// Insert a new post; fails with [`Error::Conflict`] if the id is taken
    pub async fn create_post(&self, post: &Post) -> Result<()> {
        let post = post.clone();
        self.write("create_post", move |conn| insert_post(conn, &post)).await
    }

    /// Insert or overwrite a post, keeping its position in iteration order
    pub async fn replace_post(&self, post: &Post) -> Result<()> {
        let post = post.clone();
        self.write("replace_post", move |conn| {
            execute_post(conn, &format!("{} {}", INSERT_POST, UPSERT_POST), &post)?;
            Ok(())
        })
        .await
    }

    /// Delete a post together with its comments, likes and featured entry.
    ///
    /// The cascade runs in the same transaction as the post delete, so either
    /// all of it is applied or none. Returns whether the post existed.
    pub async fn delete_post(&self, id: &str) -> Result<bool> {
        let id = id.to_string();
        self.write("delete_post", move |conn| {
            let removed = conn.execute("DELETE FROM posts WHERE id = ?1", [&id])?;
            let comments = conn.execute("DELETE FROM comments WHERE post_id = ?1", [&id])?;
            let likes = conn.execute("DELETE FROM likes WHERE post_id = ?1", [&id])?;
            let featured = conn.execute("DELETE FROM featured_posts WHERE post_id = ?1", [&id])?;
            if featured > 0 {
                renumber_featured(conn)?;
            }
            debug!(post = %id, comments, likes, featured, "cascade delete");
            Ok(removed > 0)
        })
        .await
    }

    // ========== Comment Operations ==========

    /// Comments on a post, newest first. Equal timestamps list the later insert first.
    pub async fn list_comments(&self, post_id: &str) -> Result<Vec<Comment>> {
        let post_id = post_id.to_string();
        self.read("list_comments", move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, post_id, author, content, date FROM comments WHERE post_id = ?1 ORDER BY rowid DESC",
            )?;
            let mut comments = stmt
                .query_map([&post_id], row_to_comment)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            comments.sort_by(|a, b| b.date.cmp(&a.date));
            Ok(comments)
        })
        .await
    }

    /// Insert a comment and bump the owning post's comment counter.
    ///
    /// If the post is gone the comment is still written and the counter
    /// update is skipped.
    pub async fn add_comment(&self, comment: &Comment) -> Result<()> {
        let comment = comment.clone();
        self.write("add_comment", move |conn| {
            conn.execute(
                "INSERT INTO comments (id, post_id, author, content, date) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![comment.id, comment.post_id, comment.author, comment.content, comment.date],
            )
            .map_err(|e| conflict_or_storage(e, &comment.id))?;

            let updated = conn.execute(
                "UPDATE posts SET comments = comments + 1 WHERE id = ?1",
                [&comment.post_id],
            )?;
            if updated == 0 {
                warn!(post = %comment.post_id, comment = %comment.id, "comment written for missing post");
            }
            Ok(())
        })
        .await
    }

    /// Delete a comment and decrement the post's counter, never below zero.
    ///
    /// The comment must belong to `post_id`. Returns whether a row was removed.
    pub async fn remove_comment(&self, id: &str, post_id: &str) -> Result<bool> {
        let (id, post_id) = (id.to_string(), post_id.to_string());
        self.write("remove_comment", move |conn| {
            let removed = conn.execute(
                "DELETE FROM comments WHERE id = ?1 AND post_id = ?2",
                params![id, post_id],
            )?;
            if removed > 0 {
                conn.execute(
                    "UPDATE posts SET comments = MAX(comments - 1, 0) WHERE id = ?1",
                    [&post_id],
                )?;
            }
            Ok(removed > 0)
        })
        .await
    }

    /// Edit an existing comment's author, text or date. Never inserts.
    pub async fn update_comment(&self, comment: &Comment) -> Result<bool> {
        let comment = comment.clone();
        self.write("update_comment", move |conn| {
            let changed = conn.execute(
                "UPDATE comments SET author = ?1, content = ?2, date = ?3 WHERE id = ?4 AND post_id = ?5",
                params![comment.author, comment.content, comment.date, comment.id, comment.post_id],
            )?;
            Ok(changed > 0)
        })
        .await
    }

    // ========== Like Operations ==========

    /// Number of like rows for a post
    pub async fn count_likes(&self, post_id: &str) -> Result<usize> {
        let post_id = post_id.to_string();
        self.read("count_likes", move |conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM likes WHERE post_id = ?1",
                [&post_id],
                |row| row.get(0),
            )?;
            Ok(count as usize)
        })
        .await
    }

    /// Like rows for a post in insertion order
    pub async fn list_likes(&self, post_id: &str) -> Result<Vec<Like>> {
        let post_id = post_id.to_string();
        self.read("list_likes", move |conn| {
            let mut stmt =
                conn.prepare("SELECT id, post_id, timestamp FROM likes WHERE post_id = ?1 ORDER BY rowid")?;
            let likes = stmt
                .query_map([&post_id], |row| {
                    Ok(Like {
                        id: row.get(0)?,
                        post_id: row.get(1)?,
                        timestamp: row.get(2)?,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(likes)
        })
        .await
    }

    /// Record a new like and bump the post's like counter
    pub async fn add_like(&self, post_id: &str) -> Result<Like> {
        let like = Like::new(post_id);
        self.write("add_like", move |conn| {
            conn.execute(
                "INSERT INTO likes (id, post_id, timestamp) VALUES (?1, ?2, ?3)",
                params![like.id, like.post_id, like.timestamp],
            )
            .map_err(|e| conflict_or_storage(e, &like.id))?;

            let updated = conn.execute("UPDATE posts SET likes = likes + 1 WHERE id = ?1", [&like.post_id])?;
            if updated == 0 {
                warn!(post = %like.post_id, "like written for missing post");
            }
            Ok(like)
        })
        .await
    }

    /// Remove one specific like and decrement the counter, never below zero
    pub async fn remove_like(&self, like_id: &str, post_id: &str) -> Result<bool> {
        let (like_id, post_id) = (like_id.to_string(), post_id.to_string());
        self.write("remove_like", move |conn| {
            let removed = conn.execute(
                "DELETE FROM likes WHERE id = ?1 AND post_id = ?2",
                params![like_id, post_id],
            )?;
            if removed > 0 {
                conn.execute("UPDATE posts SET likes = MAX(likes - 1, 0) WHERE id = ?1", [&post_id])?;
            }
            Ok(removed > 0)
        })
        .await
    }

    // ========== Featured Operations ==========

    /// Featured posts in display order; references to deleted posts are skipped
    pub async fn list_featured(&self) -> Result<Vec<Post>> {
        self.read("list_featured", |conn| {
            let mut posts = Vec::new();
            for featured in featured_refs(conn)? {
                match fetch_post(conn, &featured.post_id)? {
                    Some(post) => posts.push(post),
                    None => debug!(post = %featured.post_id, "skipping dangling featured reference"),
                }
            }
            Ok(posts)
        })
        .await
    }

    /// Raw featured references sorted by position
    pub async fn list_featured_refs(&self) -> Result<Vec<FeaturedPostRef>> {
        self.read("list_featured_refs", featured_refs).await
    }

    /// Replace the whole featured set. The order of `post_ids` is the display order.
    pub async fn replace_featured(&self, post_ids: &[String]) -> Result<()> {
        let post_ids = post_ids.to_vec();
        self.write("replace_featured", move |conn| {
            conn.execute("DELETE FROM featured_posts", [])?;
            write_featured(conn, &post_ids)
        })
        .await
    }

    // ========== Derived Queries ==========

    /// All posts, newest publication date first
    pub async fn recent_posts(&self) -> Result<Vec<Post>> {
        let mut posts = self.list_posts().await?;
        posts.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(posts)
    }

    /// Up to two other posts in `category`, in store iteration order
    pub async fn related_posts(&self, exclude_id: &str, category: &str) -> Result<Vec<Post>> {
        let (exclude_id, category) = (exclude_id.to_string(), category.to_string());
        self.read("related_posts", move |conn| {
            select_posts(
                conn,
                "WHERE category = ?1 AND id != ?2 ORDER BY rowid LIMIT ?3",
                params![category, exclude_id, RELATED_LIMIT as i64],
            )
        })
        .await
    }

    /// Posts matching a free-text term and an optional category, newest first
    pub async fn search_posts(&self, term: &str, category: Option<&str>) -> Result<Vec<Post>> {
        let mut posts: Vec<Post> = self
            .list_posts()
            .await?
            .into_iter()
            .filter(|p| category.map_or(true, |c| p.category == c))
            .filter(|p| p.matches(term))
            .collect();
        posts.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(posts)
    }

    /// Distinct categories in first-seen order
    pub async fn categories(&self) -> Result<Vec<String>> {
        self.read("categories", |conn| {
            let mut stmt = conn.prepare("SELECT category FROM posts GROUP BY category ORDER BY MIN(rowid)")?;
            let categories = stmt
                .query_map([], |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<String>>>()?;
            Ok(categories)
        })
        .await
    }

    // ========== Maintenance ==========

    /// Row counts per collection
    pub async fn stats(&self) -> Result<StoreStats> {
        self.read("stats", |conn| {
            Ok(StoreStats {
                posts: count_rows(conn, "posts")?,
                comments: count_rows(conn, "comments")?,
                likes: count_rows(conn, "likes")?,
                featured: count_rows(conn, "featured_posts")?,
            })
        })
        .await
    }

    /// Repair pass: drop rows pointing at missing posts and recompute the
    /// denormalized counters from the comment and like rows.
    pub async fn reconcile(&self) -> Result<ReconcileReport> {
        let report = self
            .write("reconcile", |conn| {
                let orphan_comments =
                    conn.execute("DELETE FROM comments WHERE post_id NOT IN (SELECT id FROM posts)", [])?;
                let orphan_likes =
                    conn.execute("DELETE FROM likes WHERE post_id NOT IN (SELECT id FROM posts)", [])?;
                let dangling_featured =
                    conn.execute("DELETE FROM featured_posts WHERE post_id NOT IN (SELECT id FROM posts)", [])?;
                if dangling_featured > 0 {
                    renumber_featured(conn)?;
                }
                let counters_fixed = conn.execute(
                    r#"
                    UPDATE posts SET
                        comments = (SELECT COUNT(*) FROM comments c WHERE c.post_id = posts.id),
                        likes = (SELECT COUNT(*) FROM likes l WHERE l.post_id = posts.id)
                    WHERE comments != (SELECT COUNT(*) FROM comments c WHERE c.post_id = posts.id)
                       OR likes != (SELECT COUNT(*) FROM likes l WHERE l.post_id = posts.id)
                    "#,
                    [],
                )?;
                Ok(ReconcileReport {
                    orphan_comments,
                    orphan_likes,
                    dangling_featured,
                    counters_fixed,
                })
            })
            .await?;

        if report.is_clean() {
            debug!("reconcile found nothing to repair");
        } else {
            info!(?report, "reconcile repaired store");
        }
        Ok(report)
    }
}

fn memory_flags() -> OpenFlags {
    OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_URI
        | OpenFlags::SQLITE_OPEN_NO_MUTEX
}

fn connect(location: &Location) -> Result<Connection> {
    let conn = match location {
        Location::File(path) => Connection::open(path)?,
        Location::Memory { uri, .. } => Connection::open_with_flags(uri, memory_flags())?,
    };
    Ok(conn)
}

/// Create tables and indexes if absent
fn provision(conn: &Connection) -> Result<()> {
    for stmt in schema::all_schema_statements() {
        conn.execute(stmt, [])?;
    }
    Ok(())
}

fn count_rows(conn: &Connection, table: &str) -> Result<usize> {
    let count: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))?;
    Ok(count as usize)
}

/// Map a uniqueness violation to [`Error::Conflict`]
fn conflict_or_storage(err: rusqlite::Error, id: &str) -> Error {
    match err.sqlite_error_code() {
        Some(ErrorCode::ConstraintViolation) => Error::Conflict(id.to_string()),
        _ => Error::Storage(err),
    }
}

fn execute_post(conn: &Connection, sql: &str, post: &Post) -> rusqlite::Result<usize> {
    conn.execute(
        sql,
        params![
            post.id,
            post.title,
            post.excerpt,
            post.content,
            post.category,
            post.author.name,
            post.author.avatar,
            post.date,
            post.likes,
            post.comments,
            post.cover_image,
        ],
    )
}

fn insert_post(conn: &Connection, post: &Post) -> Result<()> {
    execute_post(conn, INSERT_POST, post).map_err(|e| conflict_or_storage(e, &post.id))?;
    Ok(())
}

fn fetch_post(conn: &Connection, id: &str) -> Result<Option<Post>> {
    conn.query_row(
        &format!("SELECT {} FROM posts WHERE id = ?1", POST_COLUMNS),
        [id],
        row_to_post,
    )
    .optional()
    .map_err(Into::into)
}

fn select_posts<P: rusqlite::Params>(conn: &Connection, clause: &str, params: P) -> Result<Vec<Post>> {
    let mut stmt = conn.prepare(&format!("SELECT {} FROM posts {}", POST_COLUMNS, clause))?;
    let posts = stmt
        .query_map(params, row_to_post)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(posts)
}

fn featured_refs(conn: &Connection) -> Result<Vec<FeaturedPostRef>> {
    let mut stmt = conn.prepare("SELECT id, post_id, position FROM featured_posts ORDER BY position, rowid")?;
    let refs = stmt
        .query_map([], |row| {
            Ok(FeaturedPostRef {
                id: row.get(0)?,
                post_id: row.get(1)?,
                order: row.get(2)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(refs)
}

fn write_featured<S: AsRef<str>>(conn: &Connection, post_ids: &[S]) -> Result<()> {
    let mut stmt = conn.prepare("INSERT INTO featured_posts (id, post_id, position) VALUES (?1, ?2, ?3)")?;
    for featured in FeaturedPostRef::from_ids(post_ids) {
        stmt.execute(params![featured.id, featured.post_id, featured.order])?;
    }
    Ok(())
}

/// Rewrite the remaining featured references with contiguous positions
fn renumber_featured(conn: &Connection) -> Result<()> {
    let remaining: Vec<String> = featured_refs(conn)?.into_iter().map(|f| f.post_id).collect();
    conn.execute("DELETE FROM featured_posts", [])?;
    write_featured(conn, &remaining)
}

fn row_to_post(row: &rusqlite::Row) -> rusqlite::Result<Post> {
    Ok(Post {
        id: row.get(0)?,
        title: row.get(1)?,
        excerpt: row.get(2)?,
        content: row.get(3)?,
        category: row.get(4)?,
        author: Author {
            name: row.get(5)?,
            avatar: row.get(6)?,
        },
        date: row.get(7)?,
        likes: row.get(8)?,
        comments: row.get(9)?,
        cover_image: row.get(10)?,
    })
}

fn row_to_comment(row: &rusqlite::Row) -> rusqlite::Result<Comment> {
    Ok(Comment {
        id: row.get(0)?,
        post_id: row.get(1)?,
        author: row.get(2)?,
        content: row.get(3)?,
        date: row.get(4)?,
    })
}

/// Store statistics
#[derive(Debug, Clone, Serialize)]
pub struct StoreStats {
    pub posts: usize,
    pub comments: usize,
    pub likes: usize,
    pub featured: usize,
}

impl std::fmt::Display for StoreStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Store Statistics:")?;
        writeln!(f, "  Posts: {}", self.posts)?;
        writeln!(f, "  Comments: {}", self.comments)?;
        writeln!(f, "  Likes: {}", self.likes)?;
        writeln!(f, "  Featured: {}", self.featured)
    }
}

/// What a [`ContentStore::reconcile`] pass repaired
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub orphan_comments: usize,
    pub orphan_likes: usize,
    pub dangling_featured: usize,
    pub counters_fixed: usize,
}

impl ReconcileReport {
    pub fn is_clean(&self) -> bool {
        *self == Self::default()
    }
}

impl std::fmt::Display for ReconcileReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Reconcile Report:")?;
        writeln!(f, "  Orphan comments removed: {}", self.orphan_comments)?;
        writeln!(f, "  Orphan likes removed: {}", self.orphan_likes)?;
        writeln!(f, "  Dangling featured refs removed: {}", self.dangling_featured)?;
        writeln!(f, "  Post counters fixed: {}", self.counters_fixed)
    }
}
