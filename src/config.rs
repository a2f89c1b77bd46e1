use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Number of posts the homepage shows as featured
pub const DEFAULT_FEATURED_LIMIT: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct BlogConfig {
    pub database: Option<String>,
    pub preferences: Option<String>,
    pub seed: Option<String>,
    #[serde(default)]
    pub admin: AdminConfig,
    #[serde(default)]
    pub featured: FeaturedConfig,
}

/// Credentials for the admin gate. Not a security boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminConfig {
    pub username: String,
    pub password: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            username: "admin".to_string(),
            password: "password".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeaturedConfig {
    #[serde(default = "default_featured_limit")]
    pub limit: usize,
}

impl Default for FeaturedConfig {
    fn default() -> Self {
        Self { limit: DEFAULT_FEATURED_LIMIT }
    }
}

fn default_featured_limit() -> usize {
    DEFAULT_FEATURED_LIMIT
}

impl BlogConfig {
    pub fn database_path(&self) -> PathBuf {
        self.database
            .as_deref()
            .map(PathBuf::from)
            .unwrap_or_else(|| default_database_path_in(Path::new(".")))
    }

    pub fn preferences_path(&self) -> PathBuf {
        self.preferences
            .as_deref()
            .map(PathBuf::from)
            .unwrap_or_else(|| default_preferences_path_in(Path::new(".")))
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("blogstore.toml")
}

pub fn default_database_path_in(base: &Path) -> PathBuf {
    base.join(".blogstore").join("blog.db")
}

pub fn default_preferences_path_in(base: &Path) -> PathBuf {
    base.join(".blogstore").join("session.json")
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<BlogConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: BlogConfig = toml::from_str(&contents)?;
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &BlogConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}

pub fn ensure_db_dir(db_path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
