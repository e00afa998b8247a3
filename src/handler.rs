use axum::{
    Json, Router,
    body::Body,
    extract::{Request, State, rejection::JsonRejection},
    http::{HeaderValue, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tracing::{Instrument, error, info, info_span, warn};
use uuid::Uuid;

use crate::error::AssistantError;
use crate::functions::{autocomplete, chat, suggestions};
use crate::metrics::{Function, FunctionMetrics};
use crate::models::chat::{ChatRequest, Completion, TaskInput};
use crate::provider::ChatBackend;

pub const ALLOW_ORIGIN: &str = "*";
pub const ALLOW_HEADERS: &str = "authorization, x-client-info, apikey, content-type";

pub struct AppState {
    pub backend: Arc<dyn ChatBackend>,
    pub temperature: f32,
    pub metrics: FunctionMetrics,
}

impl AppState {
    pub fn new(backend: Arc<dyn ChatBackend>, temperature: f32) -> Self {
        Self {
            backend,
            temperature,
            metrics: FunctionMetrics::new(),
        }
    }

    fn record_error(&self, e: &AssistantError) {
        match e {
            AssistantError::RateLimited => self.metrics.record_rate_limited(),
            AssistantError::CreditsExhausted => self.metrics.record_credits_exhausted(),
            _ => self.metrics.record_failure(),
        }
    }
}

/// Routes of the functions service
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/functions/v1/ai-assistant",
            post(handle_assistant).options(preflight),
        )
        .route(
            "/functions/v1/ai-task-suggestions",
            post(handle_suggestions).options(preflight),
        )
        .route(
            "/functions/v1/task-autocomplete",
            post(handle_autocomplete).options(preflight),
        )
        .route("/health", get(handle_health))
        .layer(middleware::from_fn(cors_headers))
        .with_state(state)
}

async fn cors_headers(req: Request, next: Next) -> Response {
    let mut response = next.run(req).await;
    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static(ALLOW_ORIGIN),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOW_HEADERS),
    );
    response
}

async fn preflight() -> StatusCode {
    StatusCode::OK
}

pub async fn handle_assistant(
    State(state): State<Arc<AppState>>,
    body: std::result::Result<Json<ChatRequest>, JsonRejection>,
) -> Response {
    let span = info_span!("ai-assistant", request_id = %Uuid::new_v4());
    state.metrics.record_request(Function::Assistant);

    async move {
        let req = match read_body(body) {
            Ok(req) => req,
            Err(e) => {
                state.record_error(&e);
                return assistant_error(e);
            }
        };
        info!(messages = req.messages.len(), "Chat request");
        let started = Instant::now();

        match chat::open_stream(&*state.backend, &req.messages).await {
            Ok(stream) => {
                state.metrics.record_success(started.elapsed());
                (
                    [
                        (header::CONTENT_TYPE, "text/event-stream"),
                        (header::CACHE_CONTROL, "no-cache"),
                    ],
                    Body::from_stream(stream),
                )
                    .into_response()
            }
            Err(e) => {
                error!("Chat request failed: {}", e);
                state.record_error(&e);
                assistant_error(e)
            }
        }
    }
    .instrument(span)
    .await
}

pub async fn handle_suggestions(
    State(state): State<Arc<AppState>>,
    body: std::result::Result<Json<TaskInput>, JsonRejection>,
) -> Response {
    let span = info_span!("ai-task-suggestions", request_id = %Uuid::new_v4());
    state.metrics.record_request(Function::Suggestions);

    async move {
        let req = match read_body(body) {
            Ok(req) => req,
            Err(e) => {
                state.record_error(&e);
                return suggestion_error(e);
            }
        };
        info!(input_len = req.input.len(), "Suggestion request");
        let started = Instant::now();

        match suggestions::suggest(&*state.backend, &req.input, state.temperature).await {
            Ok(outcome) => {
                state.metrics.record_success(started.elapsed());
                if outcome.used_fallback {
                    state.metrics.record_fallback_suggestion();
                }
                Json(outcome.suggestion).into_response()
            }
            Err(e) => {
                error!("Suggestion request failed: {}", e);
                state.record_error(&e);
                suggestion_error(e)
            }
        }
    }
    .instrument(span)
    .await
}

pub async fn handle_autocomplete(
    State(state): State<Arc<AppState>>,
    body: std::result::Result<Json<TaskInput>, JsonRejection>,
) -> Response {
    let span = info_span!("task-autocomplete", request_id = %Uuid::new_v4());
    state.metrics.record_request(Function::Autocomplete);

    async move {
        let req = match read_body(body) {
            Ok(req) => req,
            Err(e) => {
                state.record_error(&e);
                return autocomplete_error(e);
            }
        };
        let started = Instant::now();

        match autocomplete::autocomplete(&*state.backend, &req.input, state.temperature).await {
            Ok(completion) => {
                state.metrics.record_success(started.elapsed());
                Json(Completion::text(completion)).into_response()
            }
            Err(e) => {
                error!("Autocomplete failed: {}", e);
                state.record_error(&e);
                autocomplete_error(e)
            }
        }
    }
    .instrument(span)
    .await
}

/// Unwrap a JSON body, turning axum's plain-text rejection into our error
fn read_body<T>(body: std::result::Result<Json<T>, JsonRejection>) -> Result<T, AssistantError> {
    match body {
        Ok(Json(req)) => Ok(req),
        Err(rejection) => {
            warn!(status = %rejection.status(), "Rejected request body: {}", rejection.body_text());
            Err(AssistantError::InvalidRequest(rejection.body_text()))
        }
    }
}

fn assistant_error(e: AssistantError) -> Response {
    let (status, code) = match &e {
        AssistantError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, e.to_string()),
        AssistantError::RateLimited => (StatusCode::TOO_MANY_REQUESTS, "rate_limit".to_string()),
        AssistantError::CreditsExhausted => {
            (StatusCode::PAYMENT_REQUIRED, "insufficient_credits".to_string())
        }
        _ => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    };
    (status, Json(json!({ "error": code }))).into_response()
}

fn suggestion_error(e: AssistantError) -> Response {
    let status = match e {
        AssistantError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(json!({ "error": e.to_string() }))).into_response()
}

/// Every autocomplete answer carries `completion`, failures included
fn autocomplete_error(e: AssistantError) -> Response {
    let (status, body) = match e {
        AssistantError::RateLimited => {
            (StatusCode::TOO_MANY_REQUESTS, Completion::failed("rate_limit"))
        }
        AssistantError::CreditsExhausted => (
            StatusCode::PAYMENT_REQUIRED,
            Completion::failed("insufficient_credits"),
        ),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, Completion::empty()),
    };
    (status, Json(body)).into_response()
}

pub async fn handle_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "backend": state.backend.name(),
        "model": state.backend.model(),
        "metrics": state.metrics.snapshot(),
    }))
}
