pub mod assistant;
pub mod gateway;

pub use assistant::{AssistantClient, ChatOutcome, ChatResponse, ChatSession, Notice};
pub use gateway::GatewayClient;
