//! `ai-assistant`: stream a chat reply from the gateway.

use crate::error::Result;
use crate::models::chat::ChatMessage;
use crate::models::gateway::CompletionRequest;
use crate::provider::{ByteStream, ChatBackend};
use crate::validation::validate_chat_messages;

pub const SYSTEM_PROMPT: &str = "You are the Always Focused assistant, helping students organise \
school work, projects and personal life. Answer quickly and concisely, with practical steps. \
When asked about planning, suggest short focus sessions with breaks.";

/// Gateway request for a conversation, system prompt first
pub fn build_request(model: &str, messages: &[ChatMessage]) -> CompletionRequest {
    let mut all = Vec::with_capacity(messages.len() + 1);
    all.push(ChatMessage::system(SYSTEM_PROMPT));
    all.extend_from_slice(messages);

    CompletionRequest::new(model, all).streaming()
}

/// Validate the conversation and open the gateway's SSE stream
pub async fn open_stream(backend: &dyn ChatBackend, messages: &[ChatMessage]) -> Result<ByteStream> {
    validate_chat_messages(messages)?;

    let request = build_request(backend.model(), messages);
    backend.stream(request).await
}
