use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Body of the `ai-assistant` function
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
}

/// Body of the task functions (`ai-task-suggestions`, `task-autocomplete`)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TaskInput {
    #[serde(default)]
    pub input: String,
}

/// Response of `task-autocomplete`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Completion {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub completion: String,
}

impl Completion {
    pub fn text(completion: impl Into<String>) -> Self {
        Self {
            error: None,
            completion: completion.into(),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn failed(code: &str) -> Self {
        Self {
            error: Some(code.to_string()),
            completion: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_wire_format() {
        let msg = ChatMessage::assistant("hi");
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(json, r#"{"role":"assistant","content":"hi"}"#);

        let parsed: ChatMessage =
            serde_json::from_str(r#"{"role":"user","content":"plan my week"}"#).unwrap();
        assert_eq!(parsed, ChatMessage::user("plan my week"));
    }

    #[test]
    fn test_unknown_role_rejected() {
        let parsed = serde_json::from_str::<ChatMessage>(r#"{"role":"tool","content":"x"}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_completion_omits_absent_error() {
        let json = serde_json::to_value(Completion::text("read chapter 3")).unwrap();
        assert_eq!(json, serde_json::json!({"completion": "read chapter 3"}));

        let json = serde_json::to_value(Completion::failed("rate_limit")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"error": "rate_limit", "completion": ""})
        );
    }
}
