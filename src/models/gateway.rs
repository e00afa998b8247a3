//! OpenAI-compatible chat completion wire types spoken by the LLM gateway.

use serde::{Deserialize, Serialize};

use super::chat::ChatMessage;

/// Chat completion request
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CompletionRequest {
    pub model: String,

    pub messages: Vec<ChatMessage>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Ask the gateway for an SSE body instead of a single JSON document
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub stream: bool,
}

impl CompletionRequest {
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature: None,
            max_tokens: None,
            stream: false,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn streaming(mut self) -> Self {
        self.stream = true;
        self
    }
}

/// Non-streaming chat completion response
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CompletionResponse {
    #[serde(default)]
    pub choices: Vec<CompletionChoice>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CompletionChoice {
    #[serde(default)]
    pub message: Option<CompletionMessage>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CompletionMessage {
    #[serde(default)]
    pub content: Option<String>,
}

impl CompletionResponse {
    /// `choices[0].message.content`, if any
    pub fn content(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.message.as_ref())
            .and_then(|m| m.content.as_deref())
    }
}

/// One `data:` payload of a streaming completion:
/// `{"choices":[{"delta":{"content":"..."}}]}`
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StreamChunk {
    #[serde(default)]
    pub choices: Option<Vec<StreamChoice>>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StreamChoice {
    #[serde(default)]
    pub delta: Option<StreamDelta>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StreamDelta {
    #[serde(default)]
    pub content: Option<String>,
}

impl StreamChunk {
    /// `choices[0].delta.content` when present and non-empty
    pub fn into_content(self) -> Option<String> {
        self.choices
            .and_then(|choices| choices.into_iter().next())
            .and_then(|c| c.delta)
            .and_then(|d| d.content)
            .filter(|text| !text.is_empty())
    }
}
