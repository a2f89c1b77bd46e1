//! Database schema definitions
//!
//! No foreign keys: a comment may outlive its post (see `add_comment`), and
//! `reconcile` is what cleans up such rows.

/// SQL to create the posts table
pub const CREATE_POSTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS posts (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    excerpt TEXT NOT NULL DEFAULT '',
    content TEXT NOT NULL DEFAULT '',
    category TEXT NOT NULL,
    author_name TEXT NOT NULL,
    author_avatar TEXT NOT NULL DEFAULT '',
    date TEXT NOT NULL,
    likes INTEGER NOT NULL DEFAULT 0,
    comments INTEGER NOT NULL DEFAULT 0,
    cover_image TEXT
)
"#;

/// SQL to create the comments table
pub const CREATE_COMMENTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS comments (
    id TEXT PRIMARY KEY,
    post_id TEXT NOT NULL,
    author TEXT NOT NULL,
    content TEXT NOT NULL,
    date TEXT NOT NULL
)
"#;

/// SQL to create the likes table
pub const CREATE_LIKES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS likes (
    id TEXT PRIMARY KEY,
    post_id TEXT NOT NULL,
    timestamp TEXT NOT NULL
)
"#;

/// SQL to create the featured_posts table
pub const CREATE_FEATURED_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS featured_posts (
    id TEXT PRIMARY KEY,
    post_id TEXT NOT NULL,
    position INTEGER NOT NULL
)
"#;

/// SQL to create indexes
pub const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_posts_category ON posts(category)",
    "CREATE INDEX IF NOT EXISTS idx_posts_date ON posts(date)",
    "CREATE INDEX IF NOT EXISTS idx_comments_post ON comments(post_id)",
    "CREATE INDEX IF NOT EXISTS idx_likes_post ON likes(post_id)",
    "CREATE INDEX IF NOT EXISTS idx_featured_position ON featured_posts(position)",
];

/// All schema creation statements
pub fn all_schema_statements() -> Vec<&'static str> {
    let mut stmts = vec![
        CREATE_POSTS_TABLE,
        CREATE_COMMENTS_TABLE,
        CREATE_LIKES_TABLE,
        CREATE_FEATURED_TABLE,
    ];
    stmts.extend(CREATE_INDEXES.iter().copied());
    stmts
}
