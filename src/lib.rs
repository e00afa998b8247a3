//! # Focus Assistant
//!
//! The AI layer of the Always Focused productivity app.
//!
//! ## Overview
//!
//! The app reaches an OpenAI-compatible LLM gateway through three small
//! serverless functions, and renders the chat assistant's reply as it
//! streams in. This crate provides both sides:
//!
//! - **Stream decoding**: server-sent-event chat streams turned into
//!   ordered text deltas, tolerant of arbitrary chunk boundaries
//! - **Assistant client**: chat requests with rate-limit and credit
//!   handling and optimistic message rollback
//! - **Functions service**: `ai-assistant`, `ai-task-suggestions` and
//!   `task-autocomplete` served over HTTP
//!
//! ## Quick Start
//!
//! ```rust
//! use focus_assistant::streaming::{ChatStreamDecoder, DecoderState};
//!
//! let mut decoder = ChatStreamDecoder::new();
//! let mut deltas = decoder.feed(b"data: {\"choices\":[{\"delta\":{\"content\":\"Hel");
//! deltas.extend(decoder.feed(b"lo\"}}]}\ndata: [DONE]\n"));
//!
//! assert_eq!(deltas, vec!["Hello"]);
//! assert_eq!(decoder.state(), DecoderState::Done);
//! ```
//!
//! ## Modules
//!
//! - [`config`] - Configuration loading and validation
//! - [`error`] - Error types and handling
//! - [`models`] - Chat and gateway wire types
//! - [`streaming`] - SSE delta decoder and its async stream adapter
//! - [`client`] - Assistant and gateway HTTP clients
//! - [`functions`] - The three AI functions
//! - [`handler`] - axum routes for the functions service

pub mod client;
pub mod config;
pub mod error;
pub mod functions;
pub mod handler;
pub mod metrics;
pub mod models;
pub mod provider;
pub mod streaming;
pub mod validation;

pub use config::AppConfig;
pub use error::{AssistantError, Result};
