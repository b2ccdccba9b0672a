//! Signed-in user context
//!
//! The authenticated user is persisted at `~/.herdbook/user.json` and loaded
//! once per command into a [`UserContext`] that is passed to whatever needs it.

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};

use crate::services::policy::{self, Resource};
use crate::services::Config;
use crate::types::{HerdbookError, Result, User};

/// On-disk record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredUser {
    pub user: User,
    pub signed_in_at: DateTime<Utc>,
}

/// Explicit per-command view of who is signed in
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserContext {
    user: Option<User>,
}

impl UserContext {
    pub fn anonymous() -> Self {
        Self { user: None }
    }

    pub fn signed_in(user: User) -> Self {
        Self { user: Some(user) }
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn can_edit(&self, resource: Resource) -> bool {
        policy::can_edit(self.user(), resource)
    }

    pub fn can_view(&self, resource: Resource) -> bool {
        policy::can_view(self.user(), resource)
    }

    pub fn require_edit(&self, resource: Resource) -> Result<()> {
        policy::require_edit(self.user(), resource)
    }

    pub fn require_view(&self, resource: Resource) -> Result<()> {
        policy::require_view(self.user(), resource)
    }
}

/// File-backed store for the signed-in user
pub struct UserStore {
    path: PathBuf,
}

impl UserStore {
    /// Store at the default location (`~/.herdbook/user.json`)
    pub fn new() -> Result<Self> {
        let dir = Config::home_dir()?;
        fs::create_dir_all(&dir)?;
        Ok(Self {
            path: dir.join("user.json"),
        })
    }

    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Read the stored user under a shared lock. A missing file is "nobody";
    /// a corrupt file is reported so the user can sign in again.
    pub fn load(&self) -> Result<Option<StoredUser>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let file = File::open(&self.path)?;
        file.lock_shared()
            .map_err(|e| HerdbookError::Context(format!("Failed to acquire read lock: {}", e)))?;

        let mut content = String::new();
        let read = std::io::BufReader::new(&file).read_to_string(&mut content);
        let _ = file.unlock();
        read?;

        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| HerdbookError::Context(format!("Corrupted user file: {}", e)))
    }

    /// Context for this invocation; unreadable state degrades to anonymous
    pub fn context(&self) -> UserContext {
        match self.load() {
            Ok(Some(stored)) => UserContext::signed_in(stored.user),
            Ok(None) => UserContext::anonymous(),
            Err(e) => {
                log::warn!("ignoring stored user: {}", e);
                UserContext::anonymous()
            }
        }
    }

    /// Save using atomic write (temp file + rename) with exclusive lock.
    pub fn save(&self, user: &User) -> Result<StoredUser> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let stored = StoredUser {
            user: user.clone(),
            signed_in_at: Utc::now(),
        };
        let content = serde_json::to_string_pretty(&stored)
            .map_err(|e| HerdbookError::Context(format!("Serialization failed: {}", e)))?;

        let temp_path = self.path.with_extension("json.tmp");
        {
            let mut file = File::create(&temp_path).map_err(|e| {
                HerdbookError::Context(format!("Failed to create temp file: {}", e))
            })?;
            file.write_all(content.as_bytes())
                .map_err(|e| HerdbookError::Context(format!("Failed to write temp file: {}", e)))?;
            file.sync_all()
                .map_err(|e| HerdbookError::Context(format!("Failed to sync temp file: {}", e)))?;
        }

        let target = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)?;
        target
            .lock_exclusive()
            .map_err(|e| HerdbookError::Context(format!("Failed to acquire write lock: {}", e)))?;

        let renamed = fs::rename(&temp_path, &self.path)
            .map_err(|e| HerdbookError::Context(format!("Failed to rename temp file: {}", e)));
        let _ = target.unlock();
        renamed?;

        Ok(stored)
    }

    /// Forget the signed-in user; returns whether anyone was signed in
    pub fn clear(&self) -> Result<bool> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
            return Ok(true);
        }
        Ok(false)
    }
}
