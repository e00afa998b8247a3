pub mod chat;
pub mod gateway;

pub use chat::{ChatMessage, ChatRequest, Completion, Role, TaskInput};
pub use gateway::{CompletionRequest, CompletionResponse, StreamChunk};
