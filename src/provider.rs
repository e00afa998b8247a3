use bytes::Bytes;
use futures::Stream;
use std::future::Future;
use std::pin::Pin;

use crate::error::Result;
use crate::models::gateway::CompletionRequest;

/// Raw response body of a streaming completion
pub type ByteStream = Pin<Box<dyn Stream<Item = reqwest::Result<Bytes>> + Send>>;

/// Future returned by [`ChatBackend`] calls
pub type BackendFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// An LLM backend that can answer chat completions
pub trait ChatBackend: Send + Sync {
    /// Single-shot completion, returning `choices[0].message.content`
    fn complete(&self, request: CompletionRequest) -> BackendFuture<'_, String>;

    /// Streaming completion, returning the SSE body untouched
    fn stream(&self, request: CompletionRequest) -> BackendFuture<'_, ByteStream>;

    /// Model used when a function builds its request
    fn model(&self) -> &str;

    /// Backend name for logging
    fn name(&self) -> &str;
}
