use axum::{
    routing::{get, post},
    Router,
    extract::{Json, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{CorsLayer, Any};
use tower_http::trace::TraceLayer;
use std::any::Any as PanicPayload;
use std::time::Instant;

use crate::error::{Result, AppError};
use crate::api::models::{HealthResponse, MessageResponse, SummaryRequest, SummaryResponse};
use crate::api::response;
use crate::scraper::parse_absolute_url;
use crate::AppState;

pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/summarize", post(summarize_handler))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(app_state)
}

async fn root_handler() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: "Website Summarizer API is running",
    })
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse { status: "healthy" })
}

async fn summarize_handler(
    State(state): State<AppState>,
    payload: std::result::Result<Json<SummaryRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SummaryResponse>)> {
    let Json(req) = payload.map_err(|rejection| {
        tracing::info!(reason = %rejection.body_text(), "Rejected malformed request body");
        AppError::InvalidUrl(rejection.body_text())
    })?;

    tracing::info!(url = %req.url, "Processing summarization request");
    let start_time = Instant::now();

    let result = tokio::time::timeout(
        state.config.request_timeout,
        process_summary_request(&state, &req),
    )
    .await;

    let elapsed = start_time.elapsed();
    match result {
        Ok(Ok(summary)) => {
            tracing::info!(url = %summary.url, ?elapsed, "Successfully summarized content");
            Ok(response::success(summary))
        }
        Ok(Err(err)) => {
            if err.is_client_error() {
                tracing::warn!(url = %req.url, error = %err, ?elapsed, "Rejected summarization request");
            } else {
                tracing::error!(url = %req.url, error = %err, ?elapsed, "Summarization request failed");
            }
            Err(err)
        }
        Err(_) => {
            tracing::error!(url = %req.url, ?elapsed, "Request timed out");
            Err(AppError::Timeout)
        }
    }
}

/// Validate, fetch, summarize. Each stage ends the request on failure.
async fn process_summary_request(state: &AppState, req: &SummaryRequest) -> Result<SummaryResponse> {
    let url = parse_absolute_url(&req.url)?;

    let document = state
        .fetcher
        .fetch(url.as_str())
        .await
        .map_err(as_fetch_failure)?;
    tracing::debug!(
        chars = document.plain_text.chars().count(),
        truncated = document.truncated,
        "Extracted document"
    );

    let summary = state
        .summarizer
        .summarize(&document.plain_text)
        .await
        .map_err(as_summarize_failure)?;

    Ok(SummaryResponse {
        summary,
        url: document.source_url,
        success: true,
    })
}

/// Anything that goes wrong while fetching is reported as a client error.
fn as_fetch_failure(err: AppError) -> AppError {
    if err.is_client_error() {
        err
    } else {
        AppError::FetchFailed(err.to_string())
    }
}

/// Anything that goes wrong while summarizing is reported as a server error.
fn as_summarize_failure(err: AppError) -> AppError {
    if err.is_client_error() {
        AppError::Internal(err.to_string())
    } else {
        err
    }
}

fn handle_panic(err: Box<dyn PanicPayload + Send + 'static>) -> Response {
    let message = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    tracing::error!(panic = %message, "Handler panicked");

    AppError::Internal(message).into_response()
}
