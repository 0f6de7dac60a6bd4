//! Error types for the SEO auditor.
//!
//! This module provides structured error handling with:
//! - `AppError`: Domain-specific errors for audit operations
//! - `Result<T>`: Type alias for Results using AppError
//! - A `ResponseError` impl mapping errors onto HTTP statuses
//!
//! Only `InputError` and `ConfigError` ever reach an HTTP client as a
//! non-200 status. Fetch, parse and LLM failures are folded into a
//! zero-score `AuditResult` by the orchestrator.

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

/// Maximum length of the raw-output snippet carried by a `ParseFailure`.
pub const SNIPPET_LIMIT: usize = 200;

// ============================================================================
// DOMAIN ERROR TYPE
// ============================================================================

/// Domain-specific errors for audit operations.
#[derive(Debug, Error)]
pub enum AppError {
    /// Missing or malformed request field
    #[error("Invalid input: {0}")]
    InputError(String),

    /// Page fetch failed (network, timeout or non-2xx status)
    #[error("Failed to fetch {url}: {message}")]
    FetchFailure { url: String, message: String },

    /// LLM output could not be recovered as JSON
    #[error("Failed to parse model output: {message} (raw: {snippet})")]
    ParseFailure { message: String, snippet: String },

    /// Required upstream configuration is missing
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Persistence write or read failed
    #[error("Persistence error: {0}")]
    PersistenceFailure(String),

    /// External service error (Gemini, etc.)
    #[error("Service error ({service}): {message}")]
    ServiceError {
        service: &'static str,
        message: String,
    },

    /// Generic error with context
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Create an input error
    pub fn input(msg: impl Into<String>) -> Self {
        Self::InputError(msg.into())
    }

    /// Create a fetch failure for `url`
    pub fn fetch(url: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::FetchFailure {
            url: url.into(),
            message: msg.into(),
        }
    }

    /// Create a parse failure carrying a bounded snippet of the raw text
    pub fn parse(msg: impl Into<String>, raw: &str) -> Self {
        Self::ParseFailure {
            message: msg.into(),
            snippet: raw.chars().take(SNIPPET_LIMIT).collect(),
        }
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Create a persistence error
    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::PersistenceFailure(msg.into())
    }

    /// Create a service error
    pub fn service(service: &'static str, msg: impl Into<String>) -> Self {
        Self::ServiceError {
            service,
            message: msg.into(),
        }
    }
}

/// Result type alias using AppError.
pub type Result<T> = std::result::Result<T, AppError>;

// ============================================================================
// HTTP MAPPING
// ============================================================================

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InputError(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({ "error": self.to_string() }))
    }
}
