//! Error types for the Jobs API client

use jobdeck_core::dto::job::ApiErrorBody;
use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur when talking to the remote Jobs API
///
/// Errors are `Clone` so the monitor can attach them to cached snapshots and
/// pending actions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// Job or run no longer exists
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Token rejected or lacking permission
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Connection-level failure
    #[error("Network error: {0}")]
    Network(String),

    /// The call did not complete within its deadline
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// The request was rejected as malformed
    #[error("Invalid request: {0}")]
    Validation(String),

    /// The run already finished and can no longer be canceled
    #[error("Run is already terminal: {0}")]
    AlreadyTerminal(String),

    /// API returned an unexpected error status code
    #[error("API error (status {status}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Error message from the API
        message: String,
    },

    /// Failed to parse response
    #[error("Failed to parse response: {0}")]
    Parse(String),
}

impl ClientError {
    /// Maps a non-success response to the error taxonomy
    pub fn from_status(status: u16, body: &str) -> Self {
        let parsed: ApiErrorBody = serde_json::from_str(body).unwrap_or_default();
        let message = parsed
            .message
            .clone()
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| body.trim().to_string());

        match (status, parsed.error_code.as_deref()) {
            (401 | 403, _) => Self::Auth(message),
            (404, _) | (_, Some("RESOURCE_DOES_NOT_EXIST")) => Self::NotFound(message),
            (_, Some("INVALID_STATE")) => Self::AlreadyTerminal(message),
            (400, _) => Self::Validation(message),
            (408 | 504, _) => Self::Timeout(message),
            _ => Self::Api { status, message },
        }
    }

    /// Check if this error is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Check if a later attempt might succeed without user intervention
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout(_) => true,
            Self::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_decode() {
            Self::Parse(err.to_string())
        } else if err.is_builder() {
            Self::Validation(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            ClientError::from_status(401, ""),
            ClientError::Auth(_)
        ));
        assert!(matches!(
            ClientError::from_status(403, "forbidden"),
            ClientError::Auth(_)
        ));
        assert!(ClientError::from_status(404, "").is_not_found());
        assert!(matches!(
            ClientError::from_status(500, "boom"),
            ClientError::Api { status: 500, .. }
        ));
    }

    #[test]
    fn test_error_code_mapping() {
        let body = r#"{"error_code": "RESOURCE_DOES_NOT_EXIST", "message": "Job 9 does not exist."}"#;
        assert_eq!(
            ClientError::from_status(400, body),
            ClientError::NotFound("Job 9 does not exist.".to_string())
        );

        let body = r#"{"error_code": "INVALID_STATE", "message": "Run 4 is already terminated"}"#;
        assert!(matches!(
            ClientError::from_status(400, body),
            ClientError::AlreadyTerminal(_)
        ));

        let body = r#"{"error_code": "INVALID_PARAMETER_VALUE", "message": "bad job"}"#;
        assert_eq!(
            ClientError::from_status(400, body),
            ClientError::Validation("bad job".to_string())
        );
    }

    #[test]
    fn test_plain_text_body_is_kept() {
        assert_eq!(
            ClientError::from_status(502, "  bad gateway \n"),
            ClientError::Api {
                status: 502,
                message: "bad gateway".to_string()
            }
        );
    }

    #[test]
    fn test_transient_errors() {
        assert!(ClientError::Network("reset".into()).is_transient());
        assert!(ClientError::Timeout("30s".into()).is_transient());
        assert!(!ClientError::Auth("no".into()).is_transient());
        assert!(!ClientError::from_status(404, "").is_transient());
    }
}
