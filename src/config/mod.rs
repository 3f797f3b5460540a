use crate::provider::{CompletionSettings, DEFAULT_BASE_URL, MODELS};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Target NX releases offered in the version selector.
pub const NX_VERSIONS: &[&str] = &[
    "NX 1847", "NX 1872", "NX 1899", "NX 1953", "NX 1980", "NX 1988", "NX 2007", "NX 2206",
    "NX 2212", "NX 2306", "NX 2312", "NX 2406",
];

pub const DEFAULT_NX_VERSION: &str = "NX 2212";

const NXOPEN_DOC_URL: &str =
    "https://docs.sw.siemens.com/en-US/doc/209349590/PL20221117716122093.nxopen_python_ref";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding `<session>.json` files.
    pub data_dir: PathBuf,
    /// Address the web UI listens on.
    pub bind: String,

    /// Bearer credential. Usually comes from `OPENAI_API_KEY`.
    pub api_key: Option<String>,
    pub base_url: String,

    pub default_model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub nx_version: String,
    pub session_name: String,

    /// Reference documentation named in the system prompt.
    pub doc_url: String,
    /// Lowercase extensions accepted by the uploader.
    pub allowed_extensions: Vec<String>,

    pub retry_attempts: u32,
    pub retry_delay_ms: u64,

    /// Append each successful exchange to the chat history.
    pub record_history: bool,

    /// Largest request body the server reads, in bytes.
    pub max_body_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            bind: "127.0.0.1:8501".to_string(),
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            default_model: MODELS[0].to_string(),
            temperature: 0.2,
            max_tokens: 1600,
            nx_version: DEFAULT_NX_VERSION.to_string(),
            session_name: "session-nx".to_string(),
            doc_url: NXOPEN_DOC_URL.to_string(),
            allowed_extensions: vec!["cs".into(), "py".into(), "txt".into()],
            retry_attempts: 3,
            retry_delay_ms: 1200,
            record_history: false,
            max_body_bytes: 16 * 1024 * 1024,
        }
    }
}

impl Config {
    /// Default config file location.
    #[must_use]
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join("nxgenie").join("config.toml"))
            .unwrap_or_else(|| PathBuf::from(".nxgenie/config.toml"))
    }

    /// Load the TOML file (if present), then `.env`, then environment overrides.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let config_path = path.map_or_else(Self::default_path, Path::to_path_buf);

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            Self::from_toml(&content)?
        } else if path.is_some() {
            anyhow::bail!("Config file not found: {}", config_path.display());
        } else {
            Config::default()
        };

        // A missing .env is normal
        let _ = dotenvy::dotenv();
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Override fields from environment lookups. Empty values are ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = var("OPENAI_API_KEY") {
            self.api_key = Some(key);
        }
        if let Some(url) = var("OPENAI_BASE_URL") {
            self.base_url = url;
        }
        if let Some(dir) = var("NXGENIE_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(bind) = var("NXGENIE_BIND") {
            self.bind = bind;
        }
    }

    /// Initial sampling settings for the sidebar controls.
    #[must_use]
    pub fn completion_settings(&self) -> CompletionSettings {
        CompletionSettings {
            model: self.default_model.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }

    #[must_use]
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Whether an upload with this name passes the extension allow-list.
    #[must_use]
    pub fn accepts_upload(&self, name: &str) -> bool {
        crate::session::file_extension(name)
            .is_some_and(|ext| self.allowed_extensions.iter().any(|a| a.eq_ignore_ascii_case(&ext)))
    }

    /// Check values that would otherwise fail later at request time.
    pub fn validate(&self) -> Result<(), String> {
        self.completion_settings().validate()?;
        if !NX_VERSIONS.contains(&self.nx_version.as_str()) {
            return Err(format!(
                "Unknown nx_version '{}'. Choose one of: {}",
                self.nx_version,
                NX_VERSIONS.join(", ")
            ));
        }
        if self.retry_attempts == 0 {
            return Err("retry_attempts must be at least 1".into());
        }
        if self.allowed_extensions.is_empty() {
            return Err("allowed_extensions must not be empty".into());
        }
        Ok(())
    }
}
