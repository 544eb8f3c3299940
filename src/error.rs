//! Error types shared across the chat service.

use std::path::PathBuf;

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// A single rejected input field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Malformed caller input. Carries every offending field, not just the first.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {}", fields_list(.errors))]
pub struct ValidationError {
    pub errors: Vec<FieldError>,
}

fn fields_list(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| e.field)
        .collect::<Vec<_>>()
        .join(", ")
}

impl ValidationError {
    pub fn has_field(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }

    /// Turns a JSON body the extractor could not parse into a field error.
    /// Type errors on a known top-level field are reported against that
    /// field, everything else (bad syntax, wrong content type) against `body`.
    pub fn from_json_rejection(rejection: &JsonRejection, fields: &[&'static str]) -> Self {
        let detail = rejection.body_text();
        let field = match rejection {
            JsonRejection::JsonDataError(_) => rejected_field(&detail, fields),
            _ => "body",
        };
        Self {
            errors: vec![FieldError::new(field, detail)],
        }
    }
}

// axum renders data errors as "<prefix>: <path>: <serde message>".
fn rejected_field(detail: &str, fields: &[&'static str]) -> &'static str {
    let path = detail
        .split_once("target type: ")
        .map_or(detail, |(_, rest)| rest)
        .split(':')
        .next()
        .unwrap_or_default();
    let top = path.split(&['.', '['][..]).next().unwrap_or_default().trim();
    fields
        .iter()
        .copied()
        .find(|f| *f == top)
        .unwrap_or("body")
}

/// Failure talking to the completion provider.
#[derive(Debug, Error)]
pub enum RemoteCompletionError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("provider returned {status}{}: {message}", code_suffix(.code.as_deref()))]
    Provider {
        status: u16,
        code: Option<String>,
        message: String,
    },

    #[error("malformed completion response: {0}")]
    Malformed(String),
}

fn code_suffix(code: Option<&str>) -> String {
    code.map(|c| format!(" ({c})")).unwrap_or_default()
}

impl RemoteCompletionError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            Self::Provider { status, .. } => Some(*status),
            Self::Malformed(_) => None,
        }
    }

    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Provider { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    pub fn is_auth_failure(&self) -> bool {
        matches!(self.status(), Some(401 | 403))
    }

    pub fn is_rate_limited(&self) -> bool {
        self.status() == Some(429)
    }
}

/// Saving the configuration file failed.
#[derive(Debug, Error)]
#[error("failed to persist configuration to {}: {source}", .path.display())]
pub struct PersistenceError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

/// Errors returned by HTTP handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{context}: {source}")]
    Validation {
        context: &'static str,
        source: ValidationError,
    },
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn invalid_request(source: ValidationError) -> Self {
        Self::Validation {
            context: "Invalid request",
            source,
        }
    }

    pub fn invalid_configuration(source: ValidationError) -> Self {
        Self::Validation {
            context: "Invalid configuration",
            source,
        }
    }
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation(v) => Self::invalid_configuration(v),
            ConfigError::Persistence(p) => {
                Self::Internal(format!("Failed to update Azure OpenAI configuration: {p}"))
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Validation { context, source } => (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({
                    "message": context,
                    "errors": source.errors,
                })),
            )
                .into_response(),
            ApiError::Internal(message) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "message": message })),
            )
                .into_response(),
        }
    }
}
