use thiserror::Error;

use crate::api::ApiError;
use crate::storage::StorageError;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Input rejected before anything was sent
    #[error("{0}")]
    Validation(String),

    /// An operation that needs a logged-in user was called without one
    #[error("No active session")]
    NotAuthenticated,
}

impl SessionError {
    /// Text suitable for an alert shown to the member
    pub fn user_message(&self) -> String {
        match self {
            SessionError::Api(ApiError::Network(_)) => {
                "Unable to connect to server. Check your internet connection.".to_string()
            }
            SessionError::Api(ApiError::ServerError(_)) => {
                "Something went wrong on our end. Please try again.".to_string()
            }
            SessionError::Storage(_) => "Could not save your session on this device.".to_string(),
            SessionError::NotAuthenticated => "Please log in first.".to_string(),
            other => other.to_string(),
        }
    }

    pub fn is_auth_failure(&self) -> bool {
        matches!(self, SessionError::Api(e) if e.is_auth_failure())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_messages_pass_through() {
        let err = SessionError::from(ApiError::Unauthorized("Invalid credentials".to_string()));
        assert_eq!(err.to_string(), "Invalid credentials");
        assert_eq!(err.user_message(), "Invalid credentials");
        assert!(err.is_auth_failure());
    }

    #[test]
    fn test_generic_messages() {
        assert_eq!(SessionError::NotAuthenticated.user_message(), "Please log in first.");
        let err = SessionError::from(ApiError::ServerError("trace".to_string()));
        assert!(!err.user_message().contains("trace"));
        assert!(!err.is_auth_failure());
    }
}
