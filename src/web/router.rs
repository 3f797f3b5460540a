//! Request routing and handlers. Owns the application state.

use super::api::{
    ApiRequest, FileView, Method, ProcessBody, ProcessView, SessionName, SettingsUpdate,
    StateView, UploadBatch,
};
use super::markdown;
use super::page::Page;
use crate::agent::{self, PromptBuilder, RetryPolicy, TurnContext};
use crate::config::{Config, NX_VERSIONS};
use crate::error::{Error, Result};
use crate::provider::{CompletionSettings, LlmApi, Message, OpenAICompatClient};
use crate::session::{
    AppState, SessionStore, SessionStoreError, UploadedFile, decode_utf8_ignoring_invalid,
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};

const EXTRACTION_MISS: &str = "No code block formatted with ``` was found. Copy the code manually.";
const RELOAD_NOTICE: &str = "Files must be re-uploaded if required.";

/// A rendered response, detached from the socket.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub content_type: &'static str,
    pub body: Vec<u8>,
    /// File name for `Content-Disposition: attachment`.
    pub attachment: Option<String>,
}

impl ApiResponse {
    pub fn json<T: Serialize>(status: u16, value: &T) -> Self {
        let body = serde_json::to_vec(value).unwrap_or_else(|e| {
            error!("Failed to serialize response: {e}");
            br#"{"error":"internal serialization error"}"#.to_vec()
        });
        Self {
            status,
            content_type: "application/json",
            body,
            attachment: None,
        }
    }

    pub fn html(body: String) -> Self {
        Self {
            status: 200,
            content_type: "text/html; charset=utf-8",
            body: body.into_bytes(),
            attachment: None,
        }
    }

    pub fn error(status: u16, message: &str) -> Self {
        Self::json(status, &serde_json::json!({ "error": message }))
    }

    fn from_error(err: &Error) -> Self {
        let status = match err {
            Error::Config(_) | Error::Upload(_) | Error::BadRequest(_) => 400,
            Error::Persistence(SessionStoreError::InvalidName(_)) => 400,
            Error::NotFound(_) => 404,
            Error::Persistence(_) => 500,
            Error::Call { .. } => 502,
        };
        Self::error(status, &err.to_string())
    }

    /// Body as UTF-8, for tests and logs.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Values of the sidebar controls that are not part of a session.
#[derive(Debug, Clone)]
struct Controls {
    api_key: Option<String>,
    settings: CompletionSettings,
    record_history: bool,
}

#[derive(Debug, Clone)]
struct Download {
    name: String,
    content: String,
}

pub struct App {
    config: Config,
    store: SessionStore,
    page: Page,
    prompts: PromptBuilder,
    policy: RetryPolicy,
    state: AppState,
    controls: Controls,
    download: Option<Download>,
    llm_override: Option<Arc<dyn LlmApi>>,
}

impl App {
    pub fn new(config: Config, store: SessionStore) -> Self {
        let state = AppState::new(&config.nx_version, &config.session_name);
        let controls = Controls {
            api_key: config.api_key.clone(),
            settings: config.completion_settings(),
            record_history: config.record_history,
        };
        let policy = RetryPolicy {
            max_attempts: config.retry_attempts,
            delay: config.retry_delay(),
        };

        Self {
            prompts: PromptBuilder::new(&config.doc_url),
            page: Page::new(),
            policy,
            state,
            controls,
            download: None,
            llm_override: None,
            store,
            config,
        }
    }

    /// Use `llm` for every turn instead of building a client from the key.
    #[must_use]
    pub fn with_llm(mut self, llm: Arc<dyn LlmApi>) -> Self {
        self.llm_override = Some(llm);
        self
    }

    #[must_use]
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Route one request. Every failure becomes a JSON error body.
    pub async fn handle(&mut self, req: ApiRequest) -> ApiResponse {
        let route = req.route().to_string();
        let result = match (req.method, route.as_str()) {
            (Method::Get, "/") => Ok(ApiResponse::html(self.page.render(&self.config))),
            (Method::Get, "/api/state") => Ok(self.state_response()),
            (Method::Post, "/api/settings") => req.json().and_then(|u| self.update_settings(u)),
            (Method::Post, "/api/upload") => req.json().and_then(|b| self.upload(b)),
            (Method::Post, "/api/history/clear") => {
                self.state.messages.clear();
                Ok(self.state_response())
            }
            (Method::Get, "/api/sessions") => self.list_sessions(),
            (Method::Post, "/api/sessions/save") => req.json().and_then(|b| self.save_session(b)),
            (Method::Post, "/api/sessions/load") => req.json().and_then(|b| self.load_session(b)),
            (Method::Post, "/api/process") => match req.json() {
                Ok(body) => self.process(body).await,
                Err(e) => Err(e),
            },
            (Method::Get, "/api/download") => self.download(),
            _ => Err(Error::NotFound(format!("No route for {route}"))),
        };

        result.unwrap_or_else(|e| {
            match &e {
                Error::Call { .. } | Error::Persistence(_) => error!(route = %route, "{e}"),
                _ => warn!(route = %route, "{e}"),
            }
            ApiResponse::from_error(&e)
        })
    }

    fn state_view(&self) -> StateView<'_> {
        let files = if self.state.uploaded_files.is_empty() {
            self.state
                .uploaded_files_meta
                .iter()
                .map(|m| FileView {
                    name: &m.name,
                    chars: m.chars,
                    loaded: false,
                })
                .collect()
        } else {
            self.state
                .uploaded_files
                .iter()
                .map(|f| FileView {
                    name: &f.name,
                    chars: f.chars,
                    loaded: true,
                })
                .collect()
        };

        StateView {
            persistent_context: &self.state.persistent_context,
            nx_version: &self.state.nx_version,
            session_name: &self.state.current_session_name,
            files,
            messages: &self.state.messages,
            model: &self.controls.settings.model,
            temperature: self.controls.settings.temperature,
            max_tokens: self.controls.settings.max_tokens,
            record_history: self.controls.record_history,
            has_api_key: self
                .controls
                .api_key
                .as_deref()
                .is_some_and(|k| !k.trim().is_empty()),
            download_name: self.download.as_ref().map(|d| d.name.as_str()),
        }
    }

    fn state_response(&self) -> ApiResponse {
        ApiResponse::json(200, &self.state_view())
    }

    /// Validate every field first; commit nothing if any is invalid.
    fn update_settings(&mut self, update: SettingsUpdate) -> Result<ApiResponse> {
        let mut settings = self.controls.settings.clone();
        if let Some(model) = update.model {
            settings.model = model;
        }
        if let Some(temperature) = update.temperature {
            settings.temperature = temperature;
        }
        if let Some(max_tokens) = update.max_tokens {
            settings.max_tokens = max_tokens;
        }
        settings.validate().map_err(Error::Config)?;

        if let Some(version) = &update.nx_version
            && !NX_VERSIONS.contains(&version.as_str())
            && version != &self.state.nx_version
        {
            return Err(Error::Config(format!("Unknown NX version '{version}'")));
        }

        self.controls.settings = settings;
        if let Some(key) = update.api_key {
            let key = key.trim().to_string();
            self.controls.api_key = (!key.is_empty()).then_some(key);
        }
        if let Some(version) = update.nx_version {
            self.state.nx_version = version;
        }
        if let Some(context) = update.persistent_context {
            self.state.persistent_context = context;
        }
        if let Some(name) = update.session_name {
            self.state.current_session_name = name;
        }
        if let Some(record) = update.record_history {
            self.controls.record_history = record;
        }

        Ok(self.state_response())
    }

    /// Decode and check the whole batch before replacing the uploads.
    fn upload(&mut self, batch: UploadBatch) -> Result<ApiResponse> {
        if batch.files.is_empty() {
            return Err(Error::Upload("No files in upload".into()));
        }

        let mut files = Vec::with_capacity(batch.files.len());
        for item in batch.files {
            let name = item
                .name
                .rsplit(['/', '\\'])
                .next()
                .unwrap_or_default()
                .to_string();
            if !self.config.accepts_upload(&name) {
                return Err(Error::Upload(format!(
                    "'{name}' is not an accepted file type (allowed: {})",
                    self.config.allowed_extensions.join(", ")
                )));
            }
            let bytes = BASE64
                .decode(item.data.as_bytes())
                .map_err(|e| Error::Upload(format!("'{name}' is not valid base64: {e}")))?;
            files.push(UploadedFile::new(name, decode_utf8_ignoring_invalid(&bytes)));
        }

        info!(
            files = files.len(),
            chars = files.iter().map(|f| f.chars).sum::<usize>(),
            "Upload batch loaded"
        );
        self.state.replace_uploads(files);
        self.download = None;
        Ok(self.state_response())
    }

    fn list_sessions(&self) -> Result<ApiResponse> {
        let sessions = self.store.list()?;
        Ok(ApiResponse::json(
            200,
            &serde_json::json!({ "sessions": sessions }),
        ))
    }

    /// The current name changes only once the file is written.
    fn save_session(&mut self, body: SessionName) -> Result<ApiResponse> {
        let name = body
            .name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| self.state.current_session_name.clone());
        let path = self.store.save(&name, &self.state.to_record())?;
        self.state.current_session_name.clone_from(&name);

        Ok(ApiResponse::json(
            200,
            &serde_json::json!({ "name": name, "path": path.display().to_string() }),
        ))
    }

    /// Any failure leaves the current state as it was.
    fn load_session(&mut self, body: SessionName) -> Result<ApiResponse> {
        let name = body
            .name
            .filter(|n| !n.trim().is_empty())
            .ok_or_else(|| Error::BadRequest("Choose a session to load".into()))?;

        let record = self
            .store
            .load(&name)?
            .ok_or_else(|| Error::NotFound(format!("Session '{name}' could not be found")))?;

        self.state.restore(&name, record, &self.config.nx_version);
        self.download = None;
        info!(session = %name, "Session loaded");

        Ok(ApiResponse::json(
            200,
            &serde_json::json!({ "state": self.state_view(), "notice": RELOAD_NOTICE }),
        ))
    }

    fn llm(&self) -> Result<Arc<dyn LlmApi>> {
        if let Some(llm) = &self.llm_override {
            return Ok(Arc::clone(llm));
        }

        let key = self
            .controls
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                Error::Config(
                    "API key missing. Enter it in the sidebar or set OPENAI_API_KEY in your .env file."
                        .into(),
                )
            })?;
        let client = OpenAICompatClient::with_base_url(key, &self.config.base_url)
            .map_err(|e| Error::Config(e.to_string()))?;
        Ok(Arc::new(client))
    }

    async fn process(&mut self, body: ProcessBody) -> Result<ApiResponse> {
        let mode = body.into_mode()?;
        let llm = self.llm()?;

        let ctx = TurnContext {
            llm: llm.as_ref(),
            prompts: &self.prompts,
            policy: &self.policy,
            settings: &self.controls.settings,
        };
        let outcome = agent::process(&ctx, &self.state, &mode).await?;

        if self.controls.record_history {
            self.state.messages.push(Message::user(outcome.code_message));
            self.state
                .messages
                .push(Message::assistant(outcome.response.clone()));
        }

        self.download = outcome.code.clone().map(|content| Download {
            name: outcome.download_name.clone(),
            content,
        });

        let view = ProcessView {
            response_html: markdown::render(&outcome.response),
            notice: outcome.code.is_none().then_some(EXTRACTION_MISS),
            download_name: outcome.code.is_some().then_some(outcome.download_name),
            response: outcome.response,
            code: outcome.code,
            attempts: outcome.attempts,
        };
        Ok(ApiResponse::json(200, &view))
    }

    fn download(&self) -> Result<ApiResponse> {
        let download = self
            .download
            .as_ref()
            .ok_or_else(|| Error::NotFound("No proposed code to download yet".into()))?;

        Ok(ApiResponse {
            status: 200,
            content_type: "text/plain; charset=utf-8",
            body: download.content.clone().into_bytes(),
            attachment: Some(download.name.clone()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{self, ChatRequest};
    use async_trait::async_trait;
    use serde_json::{Value, json};
    use std::sync::Mutex;
    use std::time::Duration;
    use tempfile::TempDir;

    /// Answers every call with `reply` and keeps the requests.
    struct FakeLlm {
        reply: std::result::Result<String, String>,
        requests: Mutex<Vec<ChatRequest>>,
    }

    impl FakeLlm {
        fn replying(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(reply.to_string()),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn failing(message: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Err(message.to_string()),
                requests: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl LlmApi for FakeLlm {
        fn id(&self) -> &str {
            "fake"
        }

        async fn complete(&self, request: &ChatRequest) -> std::result::Result<String, provider::Error> {
            self.requests.lock().unwrap().push(request.clone());
            self.reply.clone().map_err(provider::Error::Api)
        }
    }

    fn app(dir: &TempDir) -> App {
        let config = Config {
            data_dir: dir.path().join("data"),
            retry_delay_ms: 0,
            ..Config::default()
        };
        let store = SessionStore::open(&config.data_dir).unwrap();
        App::new(config, store)
    }

    fn b64(text: &str) -> String {
        BASE64.encode(text.as_bytes())
    }

    fn body(response: &ApiResponse) -> Value {
        serde_json::from_slice(&response.body).unwrap()
    }

    async fn upload_two(app: &mut App) -> ApiResponse {
        app.handle(ApiRequest::post(
            "/api/upload",
            &json!({"files": [
                {"name": "A.py", "data": b64("print('A')")},
                {"name": "B.py", "data": b64("x = 1\ny = 2\nprint(1)")},
            ]}),
        ))
        .await
    }

    #[tokio::test]
    async fn test_unified_scenario_end_to_end() {
        let dir = TempDir::new().unwrap();
        let llm = FakeLlm::replying("Summary\n\n```python\n\nprint('A and B')\n\n```\n\nNotes");
        let mut app = app(&dir).with_llm(llm.clone());

        let uploaded = upload_two(&mut app).await;
        assert_eq!(uploaded.status, 200);
        let state = body(&uploaded);
        assert_eq!(state["files"][0]["chars"], 10);
        assert_eq!(state["files"][1]["chars"], 20);

        let res = app
            .handle(ApiRequest::post("/api/process", &json!({"mode": "unified"})))
            .await;
        assert_eq!(res.status, 200, "{}", res.text());
        let result = body(&res);
        assert_eq!(result["code"], "print('A and B')");
        assert_eq!(result["download_name"], "improved_code.py");
        assert!(result["notice"].is_null());
        assert!(result["response_html"].as_str().unwrap().contains("<code"));

        let requests = llm.requests.lock().unwrap();
        let payload = &requests[0].messages[1].content;
        let a = payload.find("FILE: A.py").unwrap();
        let b = payload.find("FILE: B.py").unwrap();
        assert!(a < b);
        assert!(payload.contains("print('A')"));
        assert!(payload.contains("x = 1\ny = 2\nprint(1)"));
        drop(requests);

        let download = app.handle(ApiRequest::get("/api/download")).await;
        assert_eq!(download.status, 200);
        assert_eq!(download.text(), "print('A and B')");
        assert_eq!(download.attachment.as_deref(), Some("improved_code.py"));
    }

    #[tokio::test]
    async fn test_selected_mode_sends_one_file() {
        let dir = TempDir::new().unwrap();
        let llm = FakeLlm::replying("```python\npass\n```");
        let mut app = app(&dir).with_llm(llm.clone());
        upload_two(&mut app).await;

        let res = app
            .handle(ApiRequest::post(
                "/api/process",
                &json!({"mode": "selected", "file": "B.py"}),
            ))
            .await;
        assert_eq!(res.status, 200);

        let requests = llm.requests.lock().unwrap();
        let payload = &requests[0].messages[1].content;
        assert!(payload.starts_with("Received code (file: B.py)"));
        assert!(!payload.contains("print('A')"));
    }

    #[tokio::test]
    async fn test_missing_key_is_config_error() {
        let dir = TempDir::new().unwrap();
        let mut app = app(&dir);
        app.controls.api_key = None;
        upload_two(&mut app).await;

        let res = app
            .handle(ApiRequest::post("/api/process", &json!({"mode": "unified"})))
            .await;
        assert_eq!(res.status, 400);
        assert!(body(&res)["error"].as_str().unwrap().contains("API key missing"));
    }

    #[tokio::test]
    async fn test_call_failure_surfaced_and_nothing_committed() {
        let dir = TempDir::new().unwrap();
        let llm = FakeLlm::failing("HTTP 503 Service Unavailable: overloaded");
        let mut app = app(&dir).with_llm(llm.clone());
        app.controls.record_history = true;
        upload_two(&mut app).await;

        let res = app
            .handle(ApiRequest::post("/api/process", &json!({})))
            .await;
        assert_eq!(res.status, 502);
        let message = body(&res)["error"].as_str().unwrap().to_string();
        assert!(message.contains("3 attempt(s)"));
        assert!(message.contains("overloaded"));
        assert_eq!(llm.requests.lock().unwrap().len(), 3);
        assert!(app.state().messages.is_empty());

        let download = app.handle(ApiRequest::get("/api/download")).await;
        assert_eq!(download.status, 404);
    }

    #[tokio::test]
    async fn test_extraction_miss_is_notice() {
        let dir = TempDir::new().unwrap();
        let mut app = app(&dir).with_llm(FakeLlm::replying("Nothing to change."));
        upload_two(&mut app).await;

        let res = app
            .handle(ApiRequest::post("/api/process", &json!({"mode": "unified"})))
            .await;
        assert_eq!(res.status, 200);
        let result = body(&res);
        assert!(result["code"].is_null());
        assert_eq!(result["notice"], EXTRACTION_MISS);
        assert_eq!(result["response"], "Nothing to change.");
    }

    #[tokio::test]
    async fn test_history_recording_and_replay() {
        let dir = TempDir::new().unwrap();
        let llm = FakeLlm::replying("```python\nok\n```");
        let mut app = app(&dir).with_llm(llm.clone());
        upload_two(&mut app).await;
        app.handle(ApiRequest::post("/api/settings", &json!({"record_history": true})))
            .await;

        app.handle(ApiRequest::post("/api/process", &json!({}))).await;
        assert_eq!(app.state().messages.len(), 2);
        app.handle(ApiRequest::post("/api/process", &json!({}))).await;
        assert_eq!(app.state().messages.len(), 4);

        let requests = llm.requests.lock().unwrap();
        assert_eq!(requests[0].messages.len(), 3);
        assert_eq!(requests[1].messages.len(), 5);
        drop(requests);

        let cleared = app.handle(ApiRequest::post("/api/history/clear", &json!({}))).await;
        assert_eq!(body(&cleared)["messages"], json!([]));
    }

    #[tokio::test]
    async fn test_history_not_recorded_by_default() {
        let dir = TempDir::new().unwrap();
        let mut app = app(&dir).with_llm(FakeLlm::replying("```python\nok\n```"));
        upload_two(&mut app).await;
        app.handle(ApiRequest::post("/api/process", &json!({}))).await;
        assert!(app.state().messages.is_empty());
    }

    #[tokio::test]
    async fn test_upload_rejects_disallowed_extension_atomically() {
        let dir = TempDir::new().unwrap();
        let mut app = app(&dir);
        upload_two(&mut app).await;

        let res = app
            .handle(ApiRequest::post(
                "/api/upload",
                &json!({"files": [
                    {"name": "ok.py", "data": b64("1")},
                    {"name": "lib.dll", "data": b64("MZ")},
                ]}),
            ))
            .await;
        assert_eq!(res.status, 400);
        assert_eq!(app.state().uploaded_files.len(), 2);
        assert_eq!(app.state().uploaded_files[0].name, "A.py");
    }

    #[tokio::test]
    async fn test_upload_decodes_lossy() {
        let dir = TempDir::new().unwrap();
        let mut app = app(&dir);
        let data = BASE64.encode(b"print(\xff'hi')");
        let res = app
            .handle(ApiRequest::post(
                "/api/upload",
                &json!({"files": [{"name": "C:\\journals\\J.py", "data": data}]}),
            ))
            .await;
        assert_eq!(res.status, 200);
        let file = &app.state().uploaded_files[0];
        assert_eq!(file.name, "J.py");
        assert_eq!(file.content, "print('hi')");
    }

    #[tokio::test]
    async fn test_settings_validation() {
        let dir = TempDir::new().unwrap();
        let mut app = app(&dir);

        let ok = app
            .handle(ApiRequest::post(
                "/api/settings",
                &json!({"model": "gpt-4o", "temperature": 0.7, "nx_version": "NX 2406",
                        "persistent_context": "keep names in English", "api_key": "sk-x"}),
            ))
            .await;
        assert_eq!(ok.status, 200);
        let state = body(&ok);
        assert_eq!(state["model"], "gpt-4o");
        assert_eq!(state["nx_version"], "NX 2406");
        assert_eq!(state["has_api_key"], true);
        assert!(!ok.text().contains("sk-x"));

        let bad = app
            .handle(ApiRequest::post(
                "/api/settings",
                &json!({"model": "gpt-4", "persistent_context": "changed"}),
            ))
            .await;
        assert_eq!(bad.status, 400);
        assert_eq!(app.state().persistent_context, "keep names in English");

        let bad_version = app
            .handle(ApiRequest::post("/api/settings", &json!({"nx_version": "NX 9999"})))
            .await;
        assert_eq!(bad_version.status, 400);

        let cleared = app
            .handle(ApiRequest::post("/api/settings", &json!({"api_key": ""})))
            .await;
        assert_eq!(body(&cleared)["has_api_key"], false);
    }

    #[tokio::test]
    async fn test_session_save_list_load() {
        let dir = TempDir::new().unwrap();
        let mut app = app(&dir);
        upload_two(&mut app).await;
        app.handle(ApiRequest::post(
            "/api/settings",
            &json!({"persistent_context": "ctx", "nx_version": "NX 1980"}),
        ))
        .await;

        let saved = app
            .handle(ApiRequest::post("/api/sessions/save", &json!({"name": "wing/v2"})))
            .await;
        assert_eq!(saved.status, 200);
        assert_eq!(app.state().current_session_name, "wing/v2");

        let listed = app.handle(ApiRequest::get("/api/sessions")).await;
        assert_eq!(body(&listed)["sessions"], json!(["wingv2"]));

        app.handle(ApiRequest::post(
            "/api/settings",
            &json!({"persistent_context": "other", "nx_version": "NX 2212"}),
        ))
        .await;

        let loaded = app
            .handle(ApiRequest::post("/api/sessions/load", &json!({"name": "wingv2"})))
            .await;
        assert_eq!(loaded.status, 200);
        let res = body(&loaded);
        assert_eq!(res["notice"], RELOAD_NOTICE);
        assert_eq!(res["state"]["persistent_context"], "ctx");
        assert_eq!(res["state"]["nx_version"], "NX 1980");
        assert_eq!(res["state"]["session_name"], "wingv2");
        assert_eq!(res["state"]["files"][1]["chars"], 20);
        assert_eq!(res["state"]["files"][1]["loaded"], false);
        assert!(app.state().uploaded_files.is_empty());

        let process = app
            .handle(ApiRequest::post("/api/process", &json!({"mode": "unified"})))
            .await;
        assert_eq!(process.status, 400);
    }

    #[tokio::test]
    async fn test_load_missing_and_corrupt_leave_state() {
        let dir = TempDir::new().unwrap();
        let mut app = app(&dir);
        app.handle(ApiRequest::post("/api/settings", &json!({"persistent_context": "keep"})))
            .await;

        let missing = app
            .handle(ApiRequest::post("/api/sessions/load", &json!({"name": "does-not-exist"})))
            .await;
        assert_eq!(missing.status, 404);

        std::fs::write(dir.path().join("data").join("broken.json"), "{").unwrap();
        let corrupt = app
            .handle(ApiRequest::post("/api/sessions/load", &json!({"name": "broken"})))
            .await;
        assert_eq!(corrupt.status, 500);
        assert_eq!(app.state().persistent_context, "keep");
    }

    #[tokio::test]
    async fn test_failed_save_keeps_session_name() {
        let dir = TempDir::new().unwrap();
        let mut app = app(&dir);

        let invalid = app
            .handle(ApiRequest::post("/api/sessions/save", &json!({"name": "///"})))
            .await;
        assert_eq!(invalid.status, 400);
        assert_eq!(app.state().current_session_name, "session-nx");

        std::fs::remove_dir_all(dir.path().join("data")).unwrap();
        let unwritable = app
            .handle(ApiRequest::post("/api/sessions/save", &json!({"name": "wing"})))
            .await;
        assert_eq!(unwritable.status, 500);
        assert_eq!(app.state().current_session_name, "session-nx");
    }

    #[tokio::test]
    async fn test_download_cleared_when_inputs_replaced() {
        let dir = TempDir::new().unwrap();
        let mut app = app(&dir).with_llm(FakeLlm::replying("```python\nok\n```"));
        upload_two(&mut app).await;
        app.handle(ApiRequest::post("/api/sessions/save", &json!({"name": "wing"})))
            .await;

        app.handle(ApiRequest::post("/api/process", &json!({}))).await;
        assert_eq!(app.handle(ApiRequest::get("/api/download")).await.status, 200);
        upload_two(&mut app).await;
        assert_eq!(app.handle(ApiRequest::get("/api/download")).await.status, 404);

        app.handle(ApiRequest::post("/api/process", &json!({}))).await;
        assert_eq!(app.handle(ApiRequest::get("/api/download")).await.status, 200);
        let loaded = app
            .handle(ApiRequest::post("/api/sessions/load", &json!({"name": "wing"})))
            .await;
        assert_eq!(loaded.status, 200);
        assert!(body(&loaded)["state"]["download_name"].is_null());
        assert_eq!(app.handle(ApiRequest::get("/api/download")).await.status, 404);
    }

    #[tokio::test]
    async fn test_page_and_unknown_route() {
        let dir = TempDir::new().unwrap();
        let mut app = app(&dir);

        let page = app.handle(ApiRequest::get("/")).await;
        assert_eq!(page.status, 200);
        assert!(page.content_type.starts_with("text/html"));
        assert!(page.text().contains("NXGENIE"));

        let missing = app.handle(ApiRequest::get("/nope")).await;
        assert_eq!(missing.status, 404);

        let wrong_method = app.handle(ApiRequest::get("/api/process")).await;
        assert_eq!(wrong_method.status, 404);
    }

    #[test]
    fn test_retry_policy_from_config() {
        let dir = TempDir::new().unwrap();
        let app = app(&dir);
        assert_eq!(app.policy.max_attempts, 3);
        assert_eq!(app.policy.delay, Duration::ZERO);
    }
}
