//! One processing turn: payload, messages, call, extraction.

use super::context::PromptBuilder;
use super::extract::extract_code;
use super::retry::{RetryPolicy, complete_with_retry};
use crate::error::{Error, Result};
use crate::provider::{ChatRequest, CompletionSettings, LlmApi, Message, Role};
use crate::session::{AppState, UploadedFile};
use tracing::{debug, info};

/// Trailing user instruction appended after the code payload.
pub const FINAL_INSTRUCTION: &str = "Process the file(s) respecting the persistent context and \
the indicated NX version. Return the final code in a single block.";

const GENERIC_DOWNLOAD_NAME: &str = "improved_code.txt";

/// Which uploads go into the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessMode {
    /// Every uploaded file, in upload order.
    Unified,
    /// One uploaded file, by name.
    Selected(String),
}

/// Everything a turn needs besides the application state.
pub struct TurnContext<'a> {
    pub llm: &'a dyn LlmApi,
    pub prompts: &'a PromptBuilder,
    pub policy: &'a RetryPolicy,
    pub settings: &'a CompletionSettings,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOutcome {
    /// Raw model response.
    pub response: String,
    /// First fenced block of the response, trimmed.
    pub code: Option<String>,
    pub download_name: String,
    pub attempts: u32,
    /// The code payload message that was sent, for history recording.
    pub code_message: String,
}

fn files_for<'a>(files: &'a [UploadedFile], mode: &ProcessMode) -> Result<Vec<&'a UploadedFile>> {
    if files.is_empty() {
        return Err(Error::Upload(
            "No file content loaded. Upload one or more files to enable processing.".into(),
        ));
    }
    match mode {
        ProcessMode::Unified => Ok(files.iter().collect()),
        ProcessMode::Selected(name) => files
            .iter()
            .find(|f| &f.name == name)
            .map(|f| vec![f])
            .ok_or_else(|| Error::BadRequest(format!("'{name}' is not among the uploaded files"))),
    }
}

/// The user message carrying the code.
pub fn code_message(files: &[UploadedFile], mode: &ProcessMode) -> Result<String> {
    let selected = files_for(files, mode)?;
    match mode {
        ProcessMode::Selected(name) => Ok(format!(
            "Received code (file: {name}):\n```auto\n{}\n```",
            selected[0].content
        )),
        ProcessMode::Unified => {
            let unified = selected
                .iter()
                .map(|f| format!("// ==== FILE: {} ====\n{}", f.name, f.content))
                .collect::<Vec<_>>()
                .join("\n\n");
            Ok(format!(
                "Received code (multiple files unified):\n```auto\n{unified}\n```"
            ))
        }
    }
}

/// Fresh system prompt, replayed user/assistant history, code, final instruction.
#[must_use]
pub fn assemble_messages(
    system_prompt: String,
    history: &[Message],
    code_message: String,
) -> Vec<Message> {
    let mut messages = Vec::with_capacity(history.len() + 3);
    messages.push(Message::system(system_prompt));
    messages.extend(
        history
            .iter()
            .filter(|m| matches!(m.role, Role::User | Role::Assistant))
            .cloned(),
    );
    messages.push(Message::user(code_message));
    messages.push(Message::user(FINAL_INSTRUCTION));
    messages
}

/// `improved_code.<ext>` from the processed file(s), or a generic name.
///
/// In unified mode the extension is used only when every file shares it.
#[must_use]
pub fn download_name(files: &[UploadedFile], mode: &ProcessMode) -> String {
    let Ok(selected) = files_for(files, mode) else {
        return GENERIC_DOWNLOAD_NAME.to_string();
    };

    let first = selected.first().and_then(|f| f.extension());
    let shared = selected.iter().all(|f| f.extension() == first);
    match first {
        Some(ext) if shared => format!("improved_code.{ext}"),
        _ => GENERIC_DOWNLOAD_NAME.to_string(),
    }
}

/// Run one turn against `state`. State is read, never modified.
pub async fn process(
    ctx: &TurnContext<'_>,
    state: &AppState,
    mode: &ProcessMode,
) -> Result<TurnOutcome> {
    ctx.settings.validate().map_err(Error::Config)?;

    let code_message = code_message(&state.uploaded_files, mode)?;
    let system_prompt = ctx
        .prompts
        .build(&state.persistent_context, &state.nx_version);
    let messages = assemble_messages(system_prompt, &state.messages, code_message.clone());

    debug!(
        mode = ?mode,
        files = state.uploaded_files.len(),
        messages = messages.len(),
        payload_chars = code_message.chars().count(),
        "Assembled turn"
    );

    let request = ChatRequest::new(messages, ctx.settings);
    let completion = complete_with_retry(ctx.llm, &request, ctx.policy).await?;

    let code = extract_code(&completion.text);
    info!(
        attempts = completion.attempts,
        response_chars = completion.text.chars().count(),
        code_found = code.is_some(),
        "Turn complete"
    );

    Ok(TurnOutcome {
        response: completion.text,
        code,
        download_name: download_name(&state.uploaded_files, mode),
        attempts: completion.attempts,
        code_message,
    })
}
