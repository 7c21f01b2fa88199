// Per-user error-topic ledger persisted as a single JSON document


use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, info, warn};

/// All profiles keyed by user id, in stored order
pub type ProfileMap = IndexMap<String, UserProfile>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub error_counts: IndexMap<String, u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<DateTime<Utc>>,
}

impl UserProfile {
    /// Topic with the highest count; the earliest stored topic wins ties
    #[inline]
    pub fn most_frequent_topic(&self) -> Option<(&str, u32)> {
        self.error_counts
            .iter()
            .fold(None, |best: Option<(&str, u32)>, (topic, &count)| match best {
                Some((_, best_count)) if best_count >= count => best,
                _ => Some((topic.as_str(), count)),
            })
    }

    #[inline]
    pub fn total_errors(&self) -> u64 {
        self.error_counts.values().map(|&c| u64::from(c)).sum()
    }
}

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("Invalid profile store path: {0}")]
    InvalidPath(PathBuf),
    #[error("Profile store {path} is corrupt: {source}")]
    CorruptStore {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Profile store IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to serialize profiles: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("Profile store lock was poisoned")]
    LockPoisoned,
    #[error("{0} cannot be empty")]
    EmptyKey(&'static str),
}

/// File-backed profile ledger.
///
/// Every mutation is a full load-modify-save performed while holding both an
/// in-process mutex and an exclusive lock on `<store>.lock`, so concurrent
/// increments from threads or processes are never lost. Saves replace the
/// file through an atomic rename; readers always see a complete document and
/// take no lock.
#[derive(Debug)]
pub struct ProfileStore {
    path: PathBuf,
    lock_path: PathBuf,
    guard: Mutex<()>,
}

impl ProfileStore {
    #[inline]
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ProfileError> {
        let path = path.as_ref().to_path_buf();

        if path.as_os_str().is_empty() || path.is_dir() {
            return Err(ProfileError::InvalidPath(path));
        }

        let mut lock_name = path
            .file_name()
            .ok_or_else(|| ProfileError::InvalidPath(path.clone()))?
            .to_os_string();
        lock_name.push(".lock");
        let lock_path = path.with_file_name(lock_name);

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| ProfileError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        debug!("Opened profile store at {}", path.display());
        Ok(Self {
            path,
            lock_path,
            guard: Mutex::new(()),
        })
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every profile; a missing or empty file is an empty ledger
    #[inline]
    pub fn load(&self) -> Result<ProfileMap, ProfileError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(ProfileMap::new()),
            Err(source) => {
                return Err(ProfileError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        if content.trim().is_empty() {
            return Ok(ProfileMap::new());
        }

        serde_json::from_str(&content).map_err(|source| {
            warn!("Profile store {} is corrupt: {}", self.path.display(), source);
            ProfileError::CorruptStore {
                path: self.path.clone(),
                source,
            }
        })
    }

    /// Replace the whole ledger
    #[inline]
    pub fn save(&self, profiles: &ProfileMap) -> Result<(), ProfileError> {
        let _guard = self.guard.lock().map_err(|_| ProfileError::LockPoisoned)?;
        let _file_lock = self.lock_exclusive()?;
        self.write_atomic(profiles)
    }

    #[inline]
    pub fn profile(&self, user_id: &str) -> Result<Option<UserProfile>, ProfileError> {
        Ok(self.load()?.shift_remove(user_id))
    }

    /// Record one more error of `topic` for `user_id` and return the new count
    #[inline]
    pub fn increment_topic(&self, user_id: &str, topic: &str) -> Result<u32, ProfileError> {
        if user_id.trim().is_empty() {
            return Err(ProfileError::EmptyKey("user id"));
        }
        if topic.trim().is_empty() {
            return Err(ProfileError::EmptyKey("topic"));
        }

        let _guard = self.guard.lock().map_err(|_| ProfileError::LockPoisoned)?;
        let _file_lock = self.lock_exclusive()?;

        let mut profiles = self.load()?;
        let profile = profiles.entry(user_id.to_string()).or_default();
        let count = profile.error_counts.entry(topic.to_string()).or_insert(0);
        *count = count.saturating_add(1);
        let new_count = *count;
        profile.last_seen = Some(Utc::now());

        self.write_atomic(&profiles)?;

        info!(
            "Recorded '{}' error for user {} (now {})",
            topic, user_id, new_count
        );
        Ok(new_count)
    }

    /// The user's most frequent error topic and its count
    #[inline]
    pub fn most_frequent_topic(&self, user_id: &str) -> Result<Option<(String, u32)>, ProfileError> {
        let profiles = self.load()?;
        Ok(profiles
            .get(user_id)
            .and_then(UserProfile::most_frequent_topic)
            .map(|(topic, count)| (topic.to_string(), count)))
    }

    fn lock_exclusive(&self) -> Result<File, ProfileError> {
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&self.lock_path)
            .map_err(|source| ProfileError::Io {
                path: self.lock_path.clone(),
                source,
            })?;

        file.lock().map_err(|source| ProfileError::Io {
            path: self.lock_path.clone(),
            source,
        })?;

        // Released when the handle is dropped
        Ok(file)
    }

    fn write_atomic(&self, profiles: &ProfileMap) -> Result<(), ProfileError> {
        let io_error = |source| ProfileError::Io {
            path: self.path.clone(),
            source,
        };

        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        let temp = NamedTempFile::new_in(dir).map_err(io_error)?;
        {
            let mut writer = BufWriter::new(temp.as_file());
            serde_json::to_writer_pretty(&mut writer, profiles)?;
            writer.flush().map_err(io_error)?;
        }
        temp.as_file().sync_all().map_err(io_error)?;
        temp.persist(&self.path).map_err(|e| io_error(e.error))?;

        debug!(
            "Saved {} profiles to {}",
            profiles.len(),
            self.path.display()
        );
        Ok(())
    }
}
