use crate::error::{AssistantError, Result};
use crate::models::chat::{ChatMessage, Role};

pub const MAX_CHAT_MESSAGES: usize = 100;
pub const MAX_MESSAGE_CHARS: usize = 8_000;
pub const MAX_TASK_INPUT_CHARS: usize = 1_000;

/// Validate the conversation sent to the `ai-assistant` function
pub fn validate_chat_messages(messages: &[ChatMessage]) -> Result<()> {
    if messages.is_empty() {
        return Err(AssistantError::InvalidRequest(
            "No messages provided".into(),
        ));
    }

    if messages.len() > MAX_CHAT_MESSAGES {
        return Err(AssistantError::InvalidRequest(format!(
            "Too many messages: {} (max {})",
            messages.len(),
            MAX_CHAT_MESSAGES
        )));
    }

    for (i, msg) in messages.iter().enumerate() {
        // The system prompt is owned by the service
        if msg.role == Role::System {
            return Err(AssistantError::InvalidRequest(format!(
                "Message {} has role system, only user and assistant are accepted",
                i
            )));
        }

        if msg.content.trim().is_empty() {
            return Err(AssistantError::InvalidRequest(format!(
                "Message {} has empty content",
                i
            )));
        }

        let chars = msg.content.chars().count();
        if chars > MAX_MESSAGE_CHARS {
            return Err(AssistantError::InvalidRequest(format!(
                "Message {} too long: {} characters (max {})",
                i, chars, MAX_MESSAGE_CHARS
            )));
        }
    }

    if let Some(last) = messages.last()
        && last.role != Role::User
    {
        return Err(AssistantError::InvalidRequest(
            "Last message must be from user".into(),
        ));
    }

    Ok(())
}

/// Validate the free-text task typed into the quick-add box
pub fn validate_task_input(input: &str) -> Result<()> {
    if input.trim().is_empty() {
        return Err(AssistantError::InvalidRequest(
            "Task input cannot be empty".into(),
        ));
    }

    let chars = input.chars().count();
    if chars > MAX_TASK_INPUT_CHARS {
        return Err(AssistantError::InvalidRequest(format!(
            "Task input too long: {} characters (max {})",
            chars, MAX_TASK_INPUT_CHARS
        )));
    }

    Ok(())
}
