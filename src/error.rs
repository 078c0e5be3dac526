use axum::{
    response::{IntoResponse, Response},
    http::StatusCode,
};

use crate::api::response;

const UNREACHABLE_HINT: &str =
    "The website might be empty, require JavaScript, or be inaccessible.";
const SUMMARY_FAILED: &str =
    "Failed to generate summary due to an internal error. Please try again later.";
const UNEXPECTED: &str =
    "An unexpected error occurred while processing your request. Please try again later.";

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Failed to fetch page: {0}")]
    FetchFailed(String),

    #[error("No usable content: {0}")]
    NoContent(String),

    #[error("Summarization model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Failed to generate any summary from the content")]
    NoSummaryGenerated,

    #[error("Model inference failed: {0}")]
    InferenceFailed(String),

    #[error("Request processing timed out")]
    Timeout,

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidUrl(_) | AppError::FetchFailed(_) | AppError::NoContent(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            AppError::ModelUnavailable(_)
            | AppError::NoSummaryGenerated
            | AppError::InferenceFailed(_)
            | AppError::Internal(_)
            | AppError::ConfigError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message shown to API callers. Client-side failures explain what went
    /// wrong; server-side failures stay generic.
    pub fn detail(&self) -> String {
        match self {
            AppError::InvalidUrl(msg) => format!(
                "Invalid URL: {msg}. Please provide an absolute http(s) URL such as https://example.com/article."
            ),
            AppError::FetchFailed(msg) => format!(
                "Failed to fetch or parse the website content. Please check if the URL is valid and accessible. {UNREACHABLE_HINT} ({msg})"
            ),
            AppError::NoContent(_) => format!(
                "Unable to extract meaningful content from the provided URL. {UNREACHABLE_HINT}"
            ),
            AppError::ModelUnavailable(_)
            | AppError::NoSummaryGenerated
            | AppError::InferenceFailed(_) => SUMMARY_FAILED.to_string(),
            AppError::Timeout => {
                "Request processing timed out. Please try again later.".to_string()
            }
            AppError::Internal(_) | AppError::ConfigError(_) => UNEXPECTED.to_string(),
        }
    }

    pub fn is_client_error(&self) -> bool {
        self.status().is_client_error()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        response::error(self.status(), self.detail()).into_response()
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AppError::FetchFailed(format!("request timed out: {err}"))
        } else if err.is_connect() {
            AppError::FetchFailed(format!("connection failed: {err}"))
        } else if let Some(status) = err.status() {
            AppError::FetchFailed(format!("HTTP {status}"))
        } else {
            AppError::FetchFailed(err.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_map_to_400() {
        for err in [
            AppError::InvalidUrl("missing host".into()),
            AppError::FetchFailed("dns".into()),
            AppError::NoContent("12 characters".into()),
        ] {
            assert_eq!(err.status(), StatusCode::BAD_REQUEST);
            assert!(err.is_client_error());
        }
    }

    #[test]
    fn server_errors_map_to_500() {
        for err in [
            AppError::ModelUnavailable("token".into()),
            AppError::NoSummaryGenerated,
            AppError::InferenceFailed("503".into()),
            AppError::Internal("boom".into()),
        ] {
            assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        }
        assert_eq!(AppError::Timeout.status(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[test]
    fn server_details_do_not_leak_internals() {
        let err = AppError::ModelUnavailable("secret token hf_abc rejected".into());
        assert!(!err.detail().contains("hf_abc"));

        let err = AppError::Internal("stack trace at src/main.rs".into());
        assert!(!err.detail().contains("src/main.rs"));
    }

    #[test]
    fn client_details_explain_the_problem() {
        let err = AppError::NoContent("too short".into());
        assert!(err.detail().contains("require JavaScript"));

        let err = AppError::InvalidUrl("relative URL without a base".into());
        assert!(err.detail().contains("relative URL without a base"));
    }
}
