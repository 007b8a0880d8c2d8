use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    /// 401. Carries the server's message ("Invalid email or password", "Token expired").
    #[error("{0}")]
    Unauthorized(String),

    /// Any other 4xx: validation failures, duplicate accounts, missing resources.
    #[error("{message}")]
    Rejected { status: u16, message: String },

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Network error - check your connection and try again")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Token cannot be used as a header value")]
    InvalidToken,
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// FastAPI error body: `detail` is a string for HTTPException, a list for
/// request validation failures.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: Detail,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Detail {
    Message(String),
    Validation(Vec<ValidationItem>),
}

#[derive(Debug, Deserialize)]
struct ValidationItem {
    msg: String,
}

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    /// Pull the human readable message out of an error body, if there is one.
    pub fn detail_message(body: &str) -> Option<String> {
        let parsed: ErrorBody = serde_json::from_str(body).ok()?;
        let message = match parsed.detail {
            Detail::Message(msg) => msg,
            Detail::Validation(items) => items
                .into_iter()
                .map(|item| item.msg)
                .collect::<Vec<_>>()
                .join("; "),
        };
        let message = message.trim().to_string();
        (!message.is_empty()).then_some(message)
    }

    /// Map a non-success status to an error. `fallback` is used when the body
    /// carries no message of its own.
    pub fn from_status(status: reqwest::StatusCode, body: &str, fallback: &str) -> Self {
        let message = || Self::detail_message(body).unwrap_or_else(|| fallback.to_string());
        match status.as_u16() {
            401 => ApiError::Unauthorized(message()),
            429 => ApiError::RateLimited,
            code @ 400..=499 => ApiError::Rejected {
                status: code,
                message: message(),
            },
            500..=599 => ApiError::ServerError(Self::truncate_body(body)),
            _ => ApiError::InvalidResponse(format!(
                "Status {}: {}",
                status,
                Self::truncate_body(body)
            )),
        }
    }

    /// True when the backend refused the bearer token or the credentials
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, ApiError::Unauthorized(_))
    }

    /// True for transport failures, as opposed to answers from the server
    pub fn is_network(&self) -> bool {
        matches!(self, ApiError::Network(_))
    }
}
