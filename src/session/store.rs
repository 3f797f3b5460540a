//! Session persistence as one pretty-printed JSON file per session.

use crate::provider::Message;
use crate::session::FileMeta;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionStoreError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Session file {path} is not valid JSON: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid session name {0:?}: use letters, digits, '-', '_', ' ' or '.'")]
    InvalidName(String),
}

/// What a session file holds. File contents are never stored, only meta.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionRecord {
    /// Stamped on every save, so effectively "last saved at".
    pub created_at: DateTime<Utc>,
    pub persistent_context: String,
    pub messages: Vec<Message>,
    pub nx_version: String,
    pub uploaded_files_meta: Vec<FileMeta>,
}

/// Strip every character outside `[A-Za-z0-9-_ .]`.
///
/// Distinct names can collapse to the same file name; the later save wins.
#[must_use]
pub fn sanitize_name(name: &str) -> String {
    name.chars()
        .filter(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | ' ' | '.'))
        .collect()
}

/// Directory of `<sanitized name>.json` session files.
#[derive(Debug, Clone)]
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    /// Open the store, creating the directory if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, SessionStoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| SessionStoreError::Io {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir })
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path a session name maps to.
    pub fn path_for(&self, name: &str) -> Result<PathBuf, SessionStoreError> {
        let safe = sanitize_name(name);
        if safe.trim().is_empty() {
            return Err(SessionStoreError::InvalidName(name.to_string()));
        }
        Ok(self.dir.join(format!("{safe}.json")))
    }

    /// Session names in lexicographic order. Empty if the directory is gone.
    pub fn list(&self) -> Result<Vec<String>, SessionStoreError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(SessionStoreError::Io {
                    path: self.dir.clone(),
                    source,
                });
            }
        };

        let mut names: Vec<String> = entries
            .filter_map(Result::ok)
            .filter_map(|entry| {
                let file_name = entry.file_name().into_string().ok()?;
                file_name.strip_suffix(".json").map(String::from)
            })
            .collect();
        names.sort();
        Ok(names)
    }

    /// Write `record` under `name`, overwriting any previous file.
    ///
    /// `created_at` is restamped with the current UTC time.
    pub fn save(&self, name: &str, record: &SessionRecord) -> Result<PathBuf, SessionStoreError> {
        let path = self.path_for(name)?;
        let record = SessionRecord {
            created_at: Utc::now(),
            ..record.clone()
        };
        let content = serde_json::to_string_pretty(&record)?;
        fs::write(&path, content).map_err(|source| SessionStoreError::Io {
            path: path.clone(),
            source,
        })?;

        tracing::info!(
            path = %path.display(),
            messages = record.messages.len(),
            files = record.uploaded_files_meta.len(),
            "session saved"
        );
        Ok(path)
    }

    /// An existing file whose stem is exactly `name`, as `list` reports it.
    fn listed_path(&self, name: &str) -> Result<Option<PathBuf>, SessionStoreError> {
        let listed = self.list()?.iter().any(|stem| stem == name);
        Ok(listed.then(|| self.dir.join(format!("{name}.json"))))
    }

    /// Read the session saved under `name`. `Ok(None)` if there is none.
    ///
    /// A name taken from `list` opens its file directly, so files written
    /// under a wider character set (e.g. `café.json`) still load.
    pub fn load(&self, name: &str) -> Result<Option<SessionRecord>, SessionStoreError> {
        let path = match self.listed_path(name)? {
            Some(path) => path,
            None => self.path_for(name)?,
        };
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(SessionStoreError::Io { path, source }),
        };

        let record = serde_json::from_str(&content)
            .map_err(|source| SessionStoreError::Parse { path, source })?;
        Ok(Some(record))
    }
}
