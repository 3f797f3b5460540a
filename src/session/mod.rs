//! Volatile application state and its persisted snapshot.

mod store;

pub use store::{SessionRecord, SessionStore, SessionStoreError, sanitize_name};

use crate::provider::Message;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// An uploaded file. Content lives only in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub name: String,
    pub content: String,
    pub chars: usize,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        let content = content.into();
        Self {
            name: name.into(),
            chars: content.chars().count(),
            content,
        }
    }

    /// Lowercased extension, if the name has one.
    #[must_use]
    pub fn extension(&self) -> Option<String> {
        file_extension(&self.name)
    }

    #[must_use]
    pub fn meta(&self) -> FileMeta {
        FileMeta {
            name: self.name.clone(),
            chars: self.chars,
        }
    }
}

/// Name and size of an upload, as captured at upload time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMeta {
    pub name: String,
    pub chars: usize,
}

/// Everything the UI mutates between requests.
#[derive(Debug, Clone)]
pub struct AppState {
    pub persistent_context: String,
    pub nx_version: String,
    pub uploaded_files: Vec<UploadedFile>,
    pub uploaded_files_meta: Vec<FileMeta>,
    pub messages: Vec<Message>,
    pub current_session_name: String,
}

impl AppState {
    pub fn new(nx_version: impl Into<String>, session_name: impl Into<String>) -> Self {
        Self {
            persistent_context: String::new(),
            nx_version: nx_version.into(),
            uploaded_files: Vec::new(),
            uploaded_files_meta: Vec::new(),
            messages: Vec::new(),
            current_session_name: session_name.into(),
        }
    }

    /// Replace the whole upload batch.
    ///
    /// A repeated name keeps its first position and takes the later content.
    pub fn replace_uploads(&mut self, files: impl IntoIterator<Item = UploadedFile>) {
        let mut batch: Vec<UploadedFile> = Vec::new();
        for file in files {
            match batch.iter_mut().find(|f| f.name == file.name) {
                Some(existing) => *existing = file,
                None => batch.push(file),
            }
        }
        self.uploaded_files_meta = batch.iter().map(UploadedFile::meta).collect();
        self.uploaded_files = batch;
    }

    #[must_use]
    pub fn file(&self, name: &str) -> Option<&UploadedFile> {
        self.uploaded_files.iter().find(|f| f.name == name)
    }

    /// Snapshot for the session store.
    #[must_use]
    pub fn to_record(&self) -> SessionRecord {
        SessionRecord {
            created_at: chrono::Utc::now(),
            persistent_context: self.persistent_context.clone(),
            messages: self.messages.clone(),
            nx_version: self.nx_version.clone(),
            uploaded_files_meta: self.uploaded_files_meta.clone(),
        }
    }

    /// Restore a saved session. Uploaded content is dropped; meta is kept
    /// as saved so the UI can ask for a re-upload.
    pub fn restore(&mut self, name: &str, record: SessionRecord, default_version: &str) {
        self.persistent_context = record.persistent_context;
        self.messages = record.messages;
        self.nx_version = if record.nx_version.trim().is_empty() {
            default_version.to_string()
        } else {
            record.nx_version
        };
        self.uploaded_files_meta = record.uploaded_files_meta;
        self.uploaded_files.clear();
        self.current_session_name = name.to_string();
    }
}

/// Lowercased extension of a file name.
#[must_use]
pub fn file_extension(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
}

/// Decode UTF-8, dropping invalid byte sequences instead of failing.
#[must_use]
pub fn decode_utf8_ignoring_invalid(mut bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    loop {
        match std::str::from_utf8(bytes) {
            Ok(valid) => {
                out.push_str(valid);
                return out;
            }
            Err(e) => {
                let (valid, rest) = bytes.split_at(e.valid_up_to());
                // valid_up_to marks a verified UTF-8 prefix
                out.push_str(std::str::from_utf8(valid).unwrap_or_default());
                match e.error_len() {
                    Some(len) => bytes = &rest[len..],
                    None => return out,
                }
            }
        }
    }
}
