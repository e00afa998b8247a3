//! `task-autocomplete`: finish the task the user is typing.

use crate::error::{AssistantError, Result};
use crate::models::chat::ChatMessage;
use crate::models::gateway::CompletionRequest;
use crate::provider::ChatBackend;
use crate::validation::MAX_TASK_INPUT_CHARS;

/// Shorter inputs are answered with an empty completion
pub const MIN_INPUT_CHARS: usize = 3;
pub const MAX_COMPLETION_TOKENS: u32 = 30;

pub const SYSTEM_PROMPT: &str = "You are a productivity assistant. Complete the user's task concisely and naturally.
Rules:
- Complete ONLY what the user started typing
- Be brief (at most 10 additional words)
- Return ONLY the completion text, without repeating what was already typed
- Be specific and practical
- If the task is already complete, return nothing
- Do not add final punctuation";

pub fn needs_completion(input: &str) -> bool {
    input.chars().count() >= MIN_INPUT_CHARS
}

pub fn build_request(model: &str, temperature: f32, input: &str) -> CompletionRequest {
    CompletionRequest::new(
        model,
        vec![
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(format!("Complete this task: \"{}\"", input)),
        ],
    )
    .with_temperature(temperature)
    .with_max_tokens(MAX_COMPLETION_TOKENS)
}

/// Suggested continuation of `input`, trimmed; empty for short input
pub async fn autocomplete(
    backend: &dyn ChatBackend,
    input: &str,
    temperature: f32,
) -> Result<String> {
    if !needs_completion(input) {
        return Ok(String::new());
    }

    if input.chars().count() > MAX_TASK_INPUT_CHARS {
        return Err(AssistantError::InvalidRequest(format!(
            "Task input too long (max {} characters)",
            MAX_TASK_INPUT_CHARS
        )));
    }

    let request = build_request(backend.model(), temperature, input);
    let completion = backend.complete(request).await?;

    Ok(completion.trim().to_string())
}
