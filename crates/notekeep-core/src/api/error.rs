use std::collections::BTreeMap;

use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Unauthorized - session token missing, invalid, or expired")]
    Unauthorized,

    #[error("{message}")]
    Rejected {
        message: String,
        /// Field-level validation messages, keyed by field name
        fields: BTreeMap<String, String>,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Server error: {0}")]
    Server(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Maximum length for error response bodies carried in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Fallback when a failure body carries no usable message
pub(crate) const GENERIC_FAILURE_MESSAGE: &str = "Request failed";

/// The backend's error body. The top-level message field is spelled
/// `message` by the auth endpoints and `msg` by the notes endpoints, and
/// express-validator failures add an `errors` array; all of that is
/// normalized here so callers see one shape.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default, alias = "msg")]
    message: Option<String>,
    #[serde(default)]
    errors: Vec<FieldErrorEntry>,
}

#[derive(Debug, Deserialize)]
struct FieldErrorEntry {
    #[serde(default, alias = "param")]
    path: Option<String>,
    #[serde(default, alias = "message")]
    msg: Option<String>,
}

impl ApiError {
    /// Truncate a response body to avoid carrying excessive data around
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            format!(
                "{}... (truncated, {} total bytes)",
                &body[..MAX_ERROR_BODY_LENGTH],
                body.len()
            )
        }
    }

    /// Map a non-2xx response to the error taxonomy, normalizing the
    /// backend's structured body where one is present.
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let parsed: Option<ErrorBody> = serde_json::from_str(body).ok();
        let message = parsed
            .as_ref()
            .and_then(|b| b.message.clone())
            .unwrap_or_else(|| {
                let trimmed = body.trim();
                if trimmed.is_empty() {
                    GENERIC_FAILURE_MESSAGE.to_string()
                } else {
                    Self::truncate_body(trimmed)
                }
            });

        match status.as_u16() {
            401 => ApiError::Unauthorized,
            404 => ApiError::NotFound(message),
            500..=599 => ApiError::Server(message),
            400..=499 => {
                let fields: BTreeMap<String, String> = parsed
                    .map(|b| {
                        b.errors
                            .into_iter()
                            .filter_map(|e| Some((e.path?, e.msg?)))
                            .collect()
                    })
                    .unwrap_or_default();
                ApiError::Rejected { message, fields }
            }
            _ => ApiError::InvalidResponse(format!("Status {}: {}", status, message)),
        }
    }

    /// Field-level validation messages, when this error carries any
    pub fn fields(&self) -> Option<&BTreeMap<String, String>> {
        match self {
            ApiError::Rejected { fields, .. } if !fields.is_empty() => Some(fields),
            _ => None,
        }
    }
}
