//! Request and response bodies of the JSON API.

use crate::agent::ProcessMode;
use crate::error::Error;
use crate::provider::Message;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Other,
}

impl From<&tiny_http::Method> for Method {
    fn from(method: &tiny_http::Method) -> Self {
        match method {
            tiny_http::Method::Get => Self::Get,
            tiny_http::Method::Post => Self::Post,
            _ => Self::Other,
        }
    }
}

/// A request as the router sees it, detached from the socket.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: Vec<u8>,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            body: Vec::new(),
        }
    }

    pub fn post(path: impl Into<String>, body: &serde_json::Value) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            body: body.to_string().into_bytes(),
        }
    }

    /// Path without the query string.
    #[must_use]
    pub fn route(&self) -> &str {
        self.path.split('?').next().unwrap_or_default()
    }

    /// Parse the JSON body. An empty body parses as `{}`.
    pub fn json<T: for<'de> Deserialize<'de>>(&self) -> Result<T, Error> {
        let body: &[u8] = if self.body.iter().all(u8::is_ascii_whitespace) {
            b"{}"
        } else {
            &self.body
        };
        serde_json::from_slice(body).map_err(|e| Error::BadRequest(format!("Invalid JSON body: {e}")))
    }
}

/// `POST /api/settings`. Absent fields are left as they are.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SettingsUpdate {
    /// Empty string clears the credential.
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub nx_version: Option<String>,
    pub persistent_context: Option<String>,
    pub session_name: Option<String>,
    pub record_history: Option<bool>,
}

/// `POST /api/upload`.
#[derive(Debug, Deserialize)]
pub struct UploadBatch {
    pub files: Vec<UploadItem>,
}

#[derive(Debug, Deserialize)]
pub struct UploadItem {
    pub name: String,
    /// Raw file bytes, base64.
    pub data: String,
}

/// `POST /api/sessions/save` and `/api/sessions/load`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SessionName {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModeKind {
    #[default]
    Unified,
    Selected,
}

/// `POST /api/process`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ProcessBody {
    pub mode: ModeKind,
    pub file: Option<String>,
}

impl ProcessBody {
    pub fn into_mode(self) -> Result<ProcessMode, Error> {
        match (self.mode, self.file) {
            (ModeKind::Unified, _) => Ok(ProcessMode::Unified),
            (ModeKind::Selected, Some(file)) if !file.is_empty() => Ok(ProcessMode::Selected(file)),
            (ModeKind::Selected, _) => Err(Error::BadRequest(
                "Selected mode needs the name of an uploaded file".into(),
            )),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FileView<'a> {
    pub name: &'a str,
    pub chars: usize,
    /// False after a session load until the file is uploaded again.
    pub loaded: bool,
}

#[derive(Debug, Serialize)]
pub struct StateView<'a> {
    pub persistent_context: &'a str,
    pub nx_version: &'a str,
    pub session_name: &'a str,
    pub files: Vec<FileView<'a>>,
    pub messages: &'a [Message],
    pub model: &'a str,
    pub temperature: f32,
    pub max_tokens: u32,
    pub record_history: bool,
    pub has_api_key: bool,
    pub download_name: Option<&'a str>,
}

#[derive(Debug, Serialize)]
pub struct ProcessView {
    pub response: String,
    pub response_html: String,
    pub code: Option<String>,
    pub download_name: Option<String>,
    pub attempts: u32,
    pub notice: Option<&'static str>,
}
