//! Session flags - flat key-value preferences outside the relational store
//!
//! Three kinds of flags live here:
//! - `user_liked_<postId>`: the like row this profile created for a post
//! - `commenter_name`: the last display name used to comment
//! - `is_logged_in`: whether the admin surface is unlocked
//!
//! None of them take part in referential integrity. [`Session`] gives them
//! typed accessors and a lifecycle (`logout`, `reset`).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::config::AdminConfig;
use crate::Result;

const LIKED_PREFIX: &str = "user_liked_";
const COMMENTER_NAME: &str = "commenter_name";
const LOGGED_IN: &str = "is_logged_in";

/// A flat string key-value store.
pub trait PreferenceStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
    /// Remove every key
    fn clear(&self) -> Result<()>;
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-memory preferences for tests and throwaway sessions.
#[derive(Debug, Default)]
pub struct MemoryPreferences {
    values: Mutex<BTreeMap<String, String>>,
}

impl MemoryPreferences {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryPreferences {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(lock(&self.values).get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        lock(&self.values).insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        lock(&self.values).remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        lock(&self.values).clear();
        Ok(())
    }
}

/// Preferences persisted as a JSON object file.
///
/// Every call reads the file, and every change rewrites it through a sibling
/// temp file renamed into place, so a reader never sees a half-written file.
/// Writers in one process are serialized. Writers in separate processes are
/// not locked against each other; the last rewrite wins. A missing file
/// reads as empty.
#[derive(Debug)]
pub struct FilePreferences {
    path: PathBuf,
    guard: Mutex<()>,
}

impl FilePreferences {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            guard: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let contents = std::fs::read_to_string(&self.path)?;
        if contents.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        Ok(serde_json::from_str(&contents)?)
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(format!(".{}.tmp", std::process::id()));
        self.path.with_file_name(name)
    }

    fn save(&self, values: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let staging = self.staging_path();
        std::fs::write(&staging, serde_json::to_string_pretty(values)?)?;
        if let Err(e) = std::fs::rename(&staging, &self.path) {
            let _ = std::fs::remove_file(&staging);
            return Err(e.into());
        }
        Ok(())
    }

    fn update(&self, f: impl FnOnce(&mut BTreeMap<String, String>)) -> Result<()> {
        let _guard = lock(&self.guard);
        let mut values = self.load()?;
        f(&mut values);
        self.save(&values)
    }
}

impl PreferenceStore for FilePreferences {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let _guard = lock(&self.guard);
        Ok(self.load()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.update(|values| {
            values.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.update(|values| {
            values.remove(key);
        })
    }

    fn clear(&self) -> Result<()> {
        self.update(BTreeMap::clear)
    }
}

/// Typed view over a [`PreferenceStore`].
#[derive(Debug)]
pub struct Session<P> {
    prefs: P,
}

impl<P: PreferenceStore> Session<P> {
    pub fn new(prefs: P) -> Self {
        Self { prefs }
    }

    pub fn preferences(&self) -> &P {
        &self.prefs
    }

    fn liked_key(post_id: &str) -> String {
        format!("{}{}", LIKED_PREFIX, post_id)
    }

    /// Whether this profile currently likes the post
    pub fn has_liked(&self, post_id: &str) -> Result<bool> {
        Ok(self
            .prefs
            .get(&Self::liked_key(post_id))?
            .is_some_and(|v| v != "false"))
    }

    /// Id of the like row this profile created for the post, if known
    pub fn liked_like_id(&self, post_id: &str) -> Result<Option<String>> {
        Ok(self
            .prefs
            .get(&Self::liked_key(post_id))?
            .filter(|v| v != "false" && v != "true"))
    }

    /// Remember that this profile liked the post through `like_id`
    pub fn mark_liked(&self, post_id: &str, like_id: &str) -> Result<()> {
        self.prefs.set(&Self::liked_key(post_id), like_id)
    }

    /// Drop the liked flag for a post
    pub fn clear_liked(&self, post_id: &str) -> Result<()> {
        self.prefs.remove(&Self::liked_key(post_id))
    }

    pub fn remembered_name(&self) -> Result<Option<String>> {
        Ok(self.prefs.get(COMMENTER_NAME)?.filter(|n| !n.trim().is_empty()))
    }

    pub fn remember_name(&self, name: &str) -> Result<()> {
        self.prefs.set(COMMENTER_NAME, name.trim())
    }

    pub fn is_authenticated(&self) -> Result<bool> {
        Ok(self.prefs.get(LOGGED_IN)?.as_deref() == Some("true"))
    }

    /// Compare against the configured admin credentials and set the flag on a match.
    ///
    /// This is a convenience gate for the admin commands, not access control.
    pub fn login(&self, username: &str, password: &str, admin: &AdminConfig) -> Result<bool> {
        if username == admin.username && password == admin.password {
            self.prefs.set(LOGGED_IN, "true")?;
            debug!(user = %username, "admin session opened");
            Ok(true)
        } else {
            Ok(false)
        }
    }

    pub fn logout(&self) -> Result<()> {
        self.prefs.remove(LOGGED_IN)
    }

    /// Forget every flag: likes, remembered name and login
    pub fn reset(&self) -> Result<()> {
        self.prefs.clear()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_preferences() {
        let prefs = MemoryPreferences::new();
        assert!(prefs.get("k").unwrap().is_none());
        prefs.set("k", "v").unwrap();
        assert_eq!(prefs.get("k").unwrap().as_deref(), Some("v"));
        prefs.remove("k").unwrap();
        assert!(prefs.get("k").unwrap().is_none());
    }

    #[test]
    fn test_file_preferences_persist() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profile").join("session.json");
        {
            let prefs = FilePreferences::new(&path);
            prefs.set(COMMENTER_NAME, "Anna").unwrap();
            prefs.set("user_liked_p1", "like-1").unwrap();
        }

        let reopened = FilePreferences::new(&path);
        assert_eq!(reopened.get(COMMENTER_NAME).unwrap().as_deref(), Some("Anna"));
        reopened.clear().unwrap();
        assert!(reopened.get("user_liked_p1").unwrap().is_none());
    }

    #[test]
    fn test_file_preferences_replace_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let prefs = FilePreferences::new(dir.path().join("session.json"));
        prefs.set(LOGGED_IN, "true").unwrap();
        prefs.set(COMMENTER_NAME, "Anna").unwrap();

        // Only the target file is left behind, and it is always valid JSON
        let entries: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("session.json")]);
        let raw = std::fs::read_to_string(prefs.path()).unwrap();
        let values: BTreeMap<String, String> = serde_json::from_str(&raw).unwrap();
        assert_eq!(values.len(), 2);
    }

    #[test]
    fn test_file_preferences_shared_across_threads() {
        let dir = tempfile::tempdir().unwrap();
        let prefs = std::sync::Arc::new(FilePreferences::new(dir.path().join("session.json")));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let prefs = std::sync::Arc::clone(&prefs);
                std::thread::spawn(move || prefs.set(&format!("user_liked_p{}", i), "like").unwrap())
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        for i in 0..8 {
            assert!(prefs.get(&format!("user_liked_p{}", i)).unwrap().is_some());
        }
    }

    #[test]
    fn test_session_like_flags() {
        let session = Session::new(MemoryPreferences::new());
        assert!(!session.has_liked("p1").unwrap());

        session.mark_liked("p1", "like-123").unwrap();
        assert!(session.has_liked("p1").unwrap());
        assert_eq!(session.liked_like_id("p1").unwrap().as_deref(), Some("like-123"));

        session.clear_liked("p1").unwrap();
        assert!(!session.has_liked("p1").unwrap());

        // Flags written as plain booleans carry no row id
        session.preferences().set("user_liked_p2", "true").unwrap();
        assert!(session.has_liked("p2").unwrap());
        assert!(session.liked_like_id("p2").unwrap().is_none());
        session.preferences().set("user_liked_p2", "false").unwrap();
        assert!(!session.has_liked("p2").unwrap());
    }

    #[test]
    fn test_session_login_lifecycle() {
        let session = Session::new(MemoryPreferences::new());
        let admin = AdminConfig::default();

        assert!(!session.login("admin", "wrong", &admin).unwrap());
        assert!(!session.is_authenticated().unwrap());

        assert!(session.login(&admin.username, &admin.password, &admin).unwrap());
        assert!(session.is_authenticated().unwrap());

        session.remember_name("  Boris ").unwrap();
        session.logout().unwrap();
        assert!(!session.is_authenticated().unwrap());
        assert_eq!(session.remembered_name().unwrap().as_deref(), Some("Boris"));

        session.reset().unwrap();
        assert!(session.remembered_name().unwrap().is_none());
    }
}
