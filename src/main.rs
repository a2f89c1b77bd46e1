//! Blogstore CLI - browse and administer the local blog store

use clap::{Parser, Subcommand};
use owo_colors::OwoColorize;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use blogstore::config::{self, BlogConfig};
use blogstore::ui::{self, Icons};
use blogstore::{Blog, Comment, ContentStore, FilePreferences, Post};

/// Name used when a commenter gives none and none is remembered
const ANONYMOUS: &str = "Anonymous";

#[derive(Parser)]
#[command(name = "blogstore")]
#[command(version)]
#[command(about = "Local content store for a personal blog")]
#[command(long_about = r#"
Blogstore keeps a blog's posts, comments, likes and featured posts in a local
SQLite database, with per-profile session flags for likes and admin login.

Example usage:
  blogstore init --seed posts.json
  blogstore posts --recent
  blogstore comment p1 "Great read!" --author Anna
  blogstore login admin password && blogstore featured p3 p1 p2
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print machine-readable JSON instead of tables
    #[arg(long, global = true)]
    json: bool,

    /// Path to the config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Path to the database file (overrides the config)
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database and seed it if empty
    Init {
        /// JSON array of default posts
        #[arg(short, long)]
        seed: Option<PathBuf>,

        /// Also write a blogstore.toml with the effective settings
        #[arg(long)]
        write_config: bool,

        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// List posts
    Posts {
        /// Newest first instead of store order
        #[arg(short, long)]
        recent: bool,
    },

    /// Show a post with its comments and related posts
    Show {
        id: String,
    },

    /// Create a post from a JSON file (admin)
    Create {
        file: PathBuf,
    },

    /// Insert or replace a post from a JSON file (admin)
    Update {
        file: PathBuf,
    },

    /// Delete a post and everything attached to it (admin)
    Delete {
        id: String,
    },

    /// List comments on a post, newest first
    Comments {
        post: String,
    },

    /// Comment on a post
    Comment {
        post: String,
        text: String,

        /// Display name (defaults to the remembered name)
        #[arg(short, long)]
        author: Option<String>,
    },

    /// Remove a comment (admin)
    Uncomment {
        id: String,
        post: String,
    },

    /// Like a post
    Like {
        post: String,
    },

    /// Withdraw your like from a post
    Unlike {
        post: String,
    },

    /// Show the featured posts, or replace them with the given ids (admin)
    Featured {
        ids: Vec<String>,
    },

    /// Posts related to a post by category
    Related {
        id: String,
    },

    /// Search titles, excerpts, bodies and categories
    Search {
        term: String,

        /// Only posts in this category
        #[arg(long)]
        category: Option<String>,
    },

    /// List categories
    Categories,

    /// Show statistics about the store
    Stats,

    /// Remove orphaned rows and recompute post counters (admin)
    Reconcile,

    /// Unlock admin commands
    Login {
        username: String,
        password: String,
    },

    /// Lock admin commands again
    Logout,

    /// Forget all session flags (likes, remembered name, login)
    Reset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Human,
    Json,
}

impl OutputMode {
    fn is_human(self) -> bool {
        self == OutputMode::Human
    }
}

fn emit_success<T: Serialize>(command: &str, data: &T) -> anyhow::Result<()> {
    let envelope = serde_json::json!({
        "ok": true,
        "command": command,
        "data": data,
    });
    println!("{}", serde_json::to_string_pretty(&envelope)?);
    Ok(())
}

fn require_admin(blog: &Blog<FilePreferences>) -> anyhow::Result<()> {
    if !blog.session().is_authenticated()? {
        anyhow::bail!("admin login required (run `blogstore login <username> <password>`)");
    }
    Ok(())
}

fn read_post(path: &Path) -> anyhow::Result<Post> {
    let contents = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

fn print_posts(output_mode: OutputMode, command: &str, posts: &[Post]) -> anyhow::Result<()> {
    if !output_mode.is_human() {
        return emit_success(command, &posts);
    }
    if posts.is_empty() {
        println!("{} No posts found.", Icons::EMPTY);
    } else {
        println!("{}", ui::posts_table(posts));
    }
    Ok(())
}

fn print_post(post: &Post, liked: bool) {
    ui::header(&post.title);
    ui::summary_row("Author:", &post.author.name);
    ui::summary_row("Published:", &post.date.format("%Y-%m-%d %H:%M").to_string());
    ui::summary_row("Category:", &post.category.style(ui::theme().category.clone()).to_string());
    let heart = if liked { Icons::HEART } else { "♡" };
    println!(
        "  {} {}   {} {}",
        heart,
        post.likes.style(ui::theme().likes.clone()),
        Icons::COMMENT,
        post.comments
    );
    if !post.excerpt.is_empty() {
        println!();
        println!("{}", ui::dim(&post.excerpt));
    }
    if !post.content.is_empty() {
        println!();
        println!("{}", post.content);
    }
}

fn print_comments(comments: &[Comment]) {
    if comments.is_empty() {
        println!("{} No comments yet.", Icons::EMPTY);
        return;
    }
    for comment in comments {
        println!(
            "{} {} {}",
            Icons::PERSON,
            comment.author.bold(),
            ui::muted(&comment.date.format("%Y-%m-%d %H:%M").to_string())
        );
        println!("   {}", comment.content);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let output_mode = if cli.json { OutputMode::Json } else { OutputMode::Human };
    let settings = config::load_config(cli.config.as_deref())?.unwrap_or_default();
    let database = cli.database.clone().unwrap_or_else(|| settings.database_path());
    config::ensure_db_dir(&database)?;

    let store = ContentStore::open(&database)?;
    let blog = Blog::new(store, FilePreferences::new(settings.preferences_path()));

    if let Err(e) = run(cli.command, &blog, &settings, &database, output_mode).await {
        if output_mode.is_human() {
            ui::error(&e.to_string());
            std::process::exit(1);
        }
        return Err(e);
    }
    Ok(())
}

async fn run(
    command: Commands,
    blog: &Blog<FilePreferences>,
    settings: &BlogConfig,
    database: &Path,
    output_mode: OutputMode,
) -> anyhow::Result<()> {
    match command {
        Commands::Init { seed, write_config, force } => {
            let seed_path = seed.or_else(|| settings.seed.as_ref().map(PathBuf::from));
            let posts = match &seed_path {
                Some(path) => blogstore::seed::load_seed(path)?,
                None => Vec::new(),
            };
            tracing::info!("Initializing {:?} with {} seed posts", database, posts.len());
            blog.initialize(&posts).await?;

            if write_config {
                let effective = BlogConfig {
                    database: Some(database.display().to_string()),
                    preferences: Some(settings.preferences_path().display().to_string()),
                    seed: seed_path.map(|p| p.display().to_string()),
                    ..settings.clone()
                };
                config::write_config(&config::default_config_path(), &effective, force)?;
            }

            let stats = blog.store().stats().await?;
            if output_mode.is_human() {
                ui::success("Store ready");
                ui::info("Database", &database.display().to_string());
                print!("{}", stats);
            } else {
                emit_success("init", &stats)?;
            }
        }

        Commands::Posts { recent } => {
            let posts = if recent {
                blog.recent_posts().await
            } else {
                blog.list_posts().await
            };
            print_posts(output_mode, "posts", &posts)?;
        }

        Commands::Show { id } => {
            let Some(post) = blog.get_post(&id).await else {
                anyhow::bail!("post {} not found", id);
            };
            let comments = blog.list_comments(&id).await;
            let related = blog.related_posts(&id, &post.category).await;
            let liked = blog.has_liked(&id);

            if output_mode.is_human() {
                print_post(&post, liked);
                ui::section("Comments");
                print_comments(&comments);
                if !related.is_empty() {
                    ui::section("Related");
                    for p in &related {
                        println!("  {} {}", p.id.style(ui::theme().dim.clone()), p.title);
                    }
                }
            } else {
                emit_success(
                    "show",
                    &serde_json::json!({
                        "post": post,
                        "liked": liked,
                        "comments": comments,
                        "related": related,
                    }),
                )?;
            }
        }

        Commands::Create { file } => {
            require_admin(blog)?;
            let post = read_post(&file)?;
            // Go through the store directly so a duplicate id is reported as such
            blog.store().create_post(&post).await?;
            if output_mode.is_human() {
                ui::success(&format!("Created post {}", post.id));
            } else {
                emit_success("create", &post)?;
            }
        }

        Commands::Update { file } => {
            require_admin(blog)?;
            let post = read_post(&file)?;
            if !blog.replace_post(&post).await {
                anyhow::bail!("failed to save post {}", post.id);
            }
            if output_mode.is_human() {
                ui::success(&format!("Saved post {}", post.id));
            } else {
                emit_success("update", &post)?;
            }
        }

        Commands::Delete { id } => {
            require_admin(blog)?;
            let existed = blog.delete_post(&id).await;
            if output_mode.is_human() {
                if existed {
                    println!("{} Deleted post {} with its comments, likes and featured entry", Icons::DEL, id);
                } else {
                    ui::warn(&format!("No post {} (attached rows were cleaned up anyway)", id));
                }
            } else {
                emit_success("delete", &serde_json::json!({ "id": id, "existed": existed }))?;
            }
        }

        Commands::Comments { post } => {
            let comments = blog.list_comments(&post).await;
            if output_mode.is_human() {
                print_comments(&comments);
            } else {
                emit_success("comments", &comments)?;
            }
        }

        Commands::Comment { post, text, author } => {
            if text.trim().is_empty() {
                anyhow::bail!("comment text is empty");
            }
            let author = match author {
                Some(name) => name,
                None => blog
                    .session()
                    .remembered_name()?
                    .unwrap_or_else(|| ANONYMOUS.to_string()),
            };
            let comment = Comment::compose(&post, author, text.trim());
            if !blog.add_comment(&comment).await {
                anyhow::bail!("failed to add comment to {}", post);
            }
            if output_mode.is_human() {
                ui::success(&format!("Comment {} added as {}", comment.id, comment.author));
            } else {
                emit_success("comment", &comment)?;
            }
        }

        Commands::Uncomment { id, post } => {
            require_admin(blog)?;
            let removed = blog.remove_comment(&id, &post).await;
            if output_mode.is_human() {
                if removed {
                    ui::success(&format!("Removed comment {}", id));
                } else {
                    ui::warn(&format!("No comment {} on post {}", id, post));
                }
            } else {
                emit_success("uncomment", &serde_json::json!({ "id": id, "removed": removed }))?;
            }
        }

        Commands::Like { post } => {
            if !blog.like(&post).await {
                anyhow::bail!("could not like {}", post);
            }
            report_likes(blog, output_mode, "like", &post).await?;
        }

        Commands::Unlike { post } => {
            if !blog.unlike(&post).await {
                anyhow::bail!("could not unlike {}", post);
            }
            report_likes(blog, output_mode, "unlike", &post).await?;
        }

        Commands::Featured { ids } => {
            if !ids.is_empty() {
                require_admin(blog)?;
                let limit = settings.featured.limit;
                if ids.len() > limit {
                    anyhow::bail!("at most {} featured posts allowed, got {}", limit, ids.len());
                }
                for id in &ids {
                    if blog.get_post(id).await.is_none() {
                        ui::warn(&format!("Post {} does not exist and will not be shown", id));
                    }
                }
                if !blog.replace_featured(&ids).await {
                    anyhow::bail!("failed to update featured posts");
                }
            }
            let featured = blog.list_featured().await;
            if output_mode.is_human() {
                if featured.is_empty() {
                    println!("{} No featured posts.", Icons::EMPTY);
                }
                for (position, post) in featured.iter().enumerate() {
                    println!(
                        "{} {} {} {}",
                        Icons::STAR,
                        format!("{}.", position + 1).style(ui::theme().featured.clone()),
                        post.title,
                        ui::muted(&format!("({})", post.id))
                    );
                }
            } else {
                emit_success("featured", &featured)?;
            }
        }

        Commands::Related { id } => {
            let Some(post) = blog.get_post(&id).await else {
                anyhow::bail!("post {} not found", id);
            };
            let related = blog.related_posts(&id, &post.category).await;
            print_posts(output_mode, "related", &related)?;
        }

        Commands::Search { term, category } => {
            if output_mode.is_human() {
                println!("{} Searching for '{}'...", Icons::SEARCH, term);
            }
            let posts = blog.search_posts(&term, category.as_deref()).await;
            print_posts(output_mode, "search", &posts)?;
        }

        Commands::Categories => {
            let categories = blog.categories().await;
            if output_mode.is_human() {
                for category in &categories {
                    println!("  {}", category);
                }
            } else {
                emit_success("categories", &categories)?;
            }
        }

        Commands::Stats => {
            let stats = blog.store().stats().await?;
            if output_mode.is_human() {
                println!("{} Blogstore Statistics ({:?})", Icons::STATS, database);
                let (posts, comments, likes, featured) = (
                    stats.posts.to_string(),
                    stats.comments.to_string(),
                    stats.likes.to_string(),
                    stats.featured.to_string(),
                );
                println!(
                    "{}",
                    ui::stats_table(&[
                        ("Posts", posts.as_str()),
                        ("Comments", comments.as_str()),
                        ("Likes", likes.as_str()),
                        ("Featured", featured.as_str()),
                    ])
                );
            } else {
                emit_success("stats", &stats)?;
            }
        }

        Commands::Reconcile => {
            require_admin(blog)?;
            let report = blog.store().reconcile().await?;
            if output_mode.is_human() {
                if report.is_clean() {
                    ui::success("Store is consistent, nothing to repair");
                } else {
                    println!("{} {}", Icons::WRENCH, report);
                }
            } else {
                emit_success("reconcile", &report)?;
            }
        }

        Commands::Login { username, password } => {
            if !blog.session().login(&username, &password, &settings.admin)? {
                anyhow::bail!("invalid username or password");
            }
            if output_mode.is_human() {
                println!("{} Logged in as {}", Icons::LOCK, username.bold());
            } else {
                emit_success("login", &serde_json::json!({ "user": username }))?;
            }
        }

        Commands::Logout => {
            blog.session().logout()?;
            if output_mode.is_human() {
                ui::success("Logged out");
            } else {
                emit_success("logout", &serde_json::Value::Null)?;
            }
        }

        Commands::Reset => {
            blog.session().reset()?;
            if output_mode.is_human() {
                ui::success("Session flags cleared");
            } else {
                emit_success("reset", &serde_json::Value::Null)?;
            }
        }
    }

    Ok(())
}

async fn report_likes(
    blog: &Blog<FilePreferences>,
    output_mode: OutputMode,
    command: &str,
    post_id: &str,
) -> anyhow::Result<()> {
    let likes = blog.get_post(post_id).await.map(|p| p.likes).unwrap_or_default();
    let liked = blog.has_liked(post_id);
    if output_mode.is_human() {
        let icon = if liked { Icons::HEART } else { "♡" };
        println!("{} {} now has {} likes", icon, post_id, likes.style(ui::theme().likes.clone()));
    } else {
        emit_success(command, &serde_json::json!({ "id": post_id, "liked": liked, "likes": likes }))?;
    }
    Ok(())
}
