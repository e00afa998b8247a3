use reqwest::{Client, Response, StatusCode, header};
use std::time::Duration;
use tracing::{error, info, warn};

use crate::config::GatewayConfig;
use crate::error::{AssistantError, Result};
use crate::models::gateway::{CompletionRequest, CompletionResponse};
use crate::provider::{BackendFuture, ByteStream, ChatBackend};

/// Client for the OpenAI-compatible LLM gateway
pub struct GatewayClient {
    client: Client,
    config: GatewayConfig,
}

impl GatewayClient {
    pub fn new(config: GatewayConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.timeout_secs);
        // Idle limit per read; a streamed reply may run longer than this overall
        let client = Client::builder()
            .connect_timeout(timeout)
            .read_timeout(timeout)
            .build()
            .map_err(|e| {
                AssistantError::InternalError(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Single-shot completion; an absent message content yields an empty string
    pub async fn complete(&self, request: CompletionRequest) -> Result<String> {
        let response = self.send(&request).await?;
        let body = response.bytes().await?;
        let parsed: CompletionResponse = serde_json::from_slice(&body)?;

        Ok(parsed.content().unwrap_or_default().to_string())
    }

    /// Streaming completion; the SSE body is handed back untouched
    pub async fn stream(&self, request: CompletionRequest) -> Result<ByteStream> {
        let request = request.streaming();
        let response = self.send(&request).await?;

        Ok(Box::pin(response.bytes_stream()))
    }

    async fn send(&self, request: &CompletionRequest) -> Result<Response> {
        let body = serde_json::to_vec(request)?;

        info!(
            model = %request.model,
            messages = request.messages.len(),
            stream = request.stream,
            "Gateway: sending {} bytes",
            body.len()
        );

        let response = self
            .client
            .post(&self.config.endpoint)
            .header(header::CONTENT_TYPE, "application/json")
            .bearer_auth(&self.config.api_key)
            .body(body)
            .send()
            .await?;

        let status = response.status();
        info!("Gateway responded with status: {}", status);

        match status {
            StatusCode::TOO_MANY_REQUESTS => {
                warn!("Gateway rate limit reached");
                Err(AssistantError::RateLimited)
            }
            StatusCode::PAYMENT_REQUIRED => {
                warn!("Gateway credits exhausted");
                Err(AssistantError::CreditsExhausted)
            }
            s if !s.is_success() => {
                let body = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown error".to_string());
                error!(status = %s, body = %body, "Gateway error");
                Err(AssistantError::Upstream {
                    status: s.as_u16(),
                    body,
                })
            }
            _ => Ok(response),
        }
    }
}

impl ChatBackend for GatewayClient {
    fn complete(&self, request: CompletionRequest) -> BackendFuture<'_, String> {
        Box::pin(GatewayClient::complete(self, request))
    }

    fn stream(&self, request: CompletionRequest) -> BackendFuture<'_, ByteStream> {
        Box::pin(GatewayClient::stream(self, request))
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    fn name(&self) -> &str {
        "gateway"
    }
}
