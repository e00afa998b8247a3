//! `ai-task-suggestions`: categorise a captured task and break it down.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::chat::ChatMessage;
use crate::models::gateway::CompletionRequest;
use crate::provider::ChatBackend;
use crate::validation::validate_task_input;

pub const MAX_SUBTASKS: usize = 3;

pub const SYSTEM_PROMPT: &str = r#"You are a productivity assistant for teenagers balancing school, projects and personal life.

For the task the user gives you, suggest:
1. A category (escola, projeto, pessoal or urgente)
2. A priority (baixa, media, alta)
3. An estimated time in minutes
4. Up to 3 relevant subtasks

Categories:
- studying, exams, subjects, chapters, exercises -> escola
- bugs, code, apps, screens, features, implementing -> projeto
- calls, family, friends, home -> pessoal
- urgent, today, now, important -> urgente

Priorities:
- words like urgent, exam, today -> alta
- words like start, review, read -> media
- generic tasks -> baixa

Time:
- studying: 30-60 min
- exercises: 20-40 min
- reading: 15-30 min
- code/implementation: 45-120 min
- quick tasks: 5-15 min

Answer ONLY with valid JSON in this format:
{
  "category": "escola" | "projeto" | "pessoal" | "urgente",
  "priority": "baixa" | "media" | "alta",
  "estimatedTime": number,
  "subtasks": ["subtask 1", "subtask 2", "subtask 3"]
}"#;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub enum Category {
    #[serde(rename = "escola")]
    School,
    #[serde(rename = "projeto")]
    Project,
    #[default]
    #[serde(rename = "pessoal")]
    Personal,
    #[serde(rename = "urgente")]
    Urgent,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub enum Priority {
    #[serde(rename = "baixa")]
    Low,
    #[default]
    #[serde(rename = "media")]
    Medium,
    #[serde(rename = "alta")]
    High,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSuggestion {
    pub category: Category,
    pub priority: Priority,
    /// Minutes
    pub estimated_time: u32,
    #[serde(default)]
    pub subtasks: Vec<String>,
}

impl Default for TaskSuggestion {
    fn default() -> Self {
        Self {
            category: Category::Personal,
            priority: Priority::Medium,
            estimated_time: 30,
            subtasks: Vec::new(),
        }
    }
}

/// Span from the first `{` to the last `}`, or the whole text when there is none.
///
/// Strips markdown fences and chatter the model puts around its JSON.
pub fn extract_json_object(text: &str) -> &str {
    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if end > start => &text[start..=end],
        _ => text,
    }
}

/// Parse the model's reply as a suggestion
pub fn try_parse_suggestion(reply: &str) -> serde_json::Result<TaskSuggestion> {
    let mut suggestion: TaskSuggestion = serde_json::from_str(extract_json_object(reply))?;
    suggestion.subtasks.retain(|s| !s.trim().is_empty());
    suggestion.subtasks.truncate(MAX_SUBTASKS);
    Ok(suggestion)
}

/// Suggestion plus whether it came from the defaults
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestionOutcome {
    pub suggestion: TaskSuggestion,
    pub used_fallback: bool,
}

/// Parse the model's reply, falling back to the default suggestion
pub fn parse_suggestion(reply: &str) -> SuggestionOutcome {
    match try_parse_suggestion(reply) {
        Ok(suggestion) => SuggestionOutcome {
            suggestion,
            used_fallback: false,
        },
        Err(e) => {
            tracing::warn!(error = %e, reply = %reply, "Unparseable suggestion, using defaults");
            SuggestionOutcome {
                suggestion: TaskSuggestion::default(),
                used_fallback: true,
            }
        }
    }
}

pub fn build_request(model: &str, temperature: f32, input: &str) -> CompletionRequest {
    CompletionRequest::new(
        model,
        vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(input)],
    )
    .with_temperature(temperature)
}

/// Ask the backend for a suggestion for `input`
pub async fn suggest(
    backend: &dyn ChatBackend,
    input: &str,
    temperature: f32,
) -> Result<SuggestionOutcome> {
    validate_task_input(input)?;

    let request = build_request(backend.model(), temperature, input);
    let reply = backend.complete(request).await?;
    tracing::debug!(reply = %reply, "Suggestion reply");

    Ok(parse_suggestion(&reply))
}
