//! Error types for the partnerlink core library.
//!
//! One unified error type covers validation, transport, and panel lifecycle
//! failures so the presentation shell only has to match on a single enum.
//!
//! # Error Codes Reference
//!
//! | Code Range | Category | Description |
//! |------------|----------|-------------|
//! | E1001-E1099 | Validation | Input rejected before any network call |
//! | E2001-E2099 | API | Remote partnership service request errors |
//! | E3001-E3099 | Panel | Panel lifecycle and write-path errors |
//! | E9001-E9099 | General | Internal and serialization errors |

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

/// The main error type for the partnerlink core library.
#[derive(Debug, Error)]
pub enum PanelError {
    // ========================================================================
    // Validation Errors (E1001-E1099)
    // ========================================================================
    /// Message text was empty or whitespace-only; no request was made.
    #[error("[E1001] Message text is empty")]
    EmptyMessage,

    /// Proposed meeting time is not in the future; no request was made.
    #[error("[E1002] Meeting time {0} is not in the future")]
    MeetingInPast(DateTime<Utc>),

    // ========================================================================
    // API Errors (E2001-E2099)
    // ========================================================================
    /// API request failed
    #[error("[E2001] API request failed: {0}")]
    ApiRequestFailed(String),

    /// API response parse error
    #[error("[E2002] Failed to parse API response: {0}")]
    ApiParseError(String),

    /// API service unavailable
    #[error("[E2003] API service unavailable: {0}")]
    ApiServiceUnavailable(String),

    /// API authentication failed
    #[error("[E2004] API authentication failed: {0}")]
    ApiAuthenticationFailed(String),

    /// Request timed out
    #[error("[E2005] Request timed out after {0} seconds")]
    RequestTimeout(u64),

    /// The remote rejected a meeting transition that already happened
    /// elsewhere. Reconciled by refreshing, never surfaced to the user.
    #[error("[E2006] Meeting state conflict: {0}")]
    MeetingConflict(String),

    // ========================================================================
    // Panel Errors (E3001-E3099)
    // ========================================================================
    /// Panel is already open
    #[error("[E3001] Panel is already open")]
    PanelAlreadyOpen,

    /// Operation attempted on a closed panel
    #[error("[E3002] Panel is closed")]
    PanelClosed,

    /// A message send was rejected remotely. Carries the original text so
    /// the caller can offer a retry without the user retyping it.
    #[error("[E3003] Failed to send message: {reason}")]
    SendFailed { text: String, reason: String },

    /// Meeting not found in the local list
    #[error("[E3004] Meeting not found: {0}")]
    MeetingNotFound(Uuid),

    // ========================================================================
    // General Errors (E9001-E9099)
    // ========================================================================
    /// Internal error (catch-all for unexpected conditions)
    #[error("[E9001] Internal error: {0}")]
    Internal(String),

    /// Serialization/deserialization error
    #[error("[E9002] Serialization error: {0}")]
    Serialization(String),
}

/// Result type alias for panel operations.
pub type PanelResult<T> = Result<T, PanelError>;

// ============================================================================
// From trait implementations for seamless error propagation
// ============================================================================

impl From<reqwest::Error> for PanelError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            PanelError::RequestTimeout(30)
        } else if err.is_connect() {
            PanelError::ApiServiceUnavailable(err.to_string())
        } else if err.is_decode() {
            PanelError::ApiParseError(err.to_string())
        } else if err.is_status() {
            match err.status().map(|s| s.as_u16()) {
                Some(401) | Some(403) => PanelError::ApiAuthenticationFailed(err.to_string()),
                Some(409) => PanelError::MeetingConflict(err.to_string()),
                Some(s) if s >= 500 => PanelError::ApiServiceUnavailable(err.to_string()),
                _ => PanelError::ApiRequestFailed(err.to_string()),
            }
        } else {
            PanelError::ApiRequestFailed(err.to_string())
        }
    }
}

impl From<serde_json::Error> for PanelError {
    fn from(err: serde_json::Error) -> Self {
        PanelError::Serialization(err.to_string())
    }
}

// ============================================================================
// Error categorization helpers
// ============================================================================

impl PanelError {
    /// Returns true if this error was raised locally, before any network call.
    pub fn is_validation(&self) -> bool {
        matches!(self, PanelError::EmptyMessage | PanelError::MeetingInPast(_))
    }

    /// Returns true if this error is related to the remote API.
    pub fn is_api_error(&self) -> bool {
        matches!(
            self,
            PanelError::ApiRequestFailed(_)
                | PanelError::ApiParseError(_)
                | PanelError::ApiServiceUnavailable(_)
                | PanelError::ApiAuthenticationFailed(_)
                | PanelError::RequestTimeout(_)
                | PanelError::MeetingConflict(_)
        )
    }

    /// Returns true if this error is transient and the next poll tick may
    /// succeed. Transient refresh failures are degraded silently: the stale
    /// list stays on screen and the failure is recorded per collection.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PanelError::ApiRequestFailed(_)
                | PanelError::ApiServiceUnavailable(_)
                | PanelError::RequestTimeout(_)
        )
    }

    /// Returns an error code suitable for logging or external reporting.
    pub fn error_code(&self) -> &'static str {
        match self {
            PanelError::EmptyMessage => "E1001",
            PanelError::MeetingInPast(_) => "E1002",
            PanelError::ApiRequestFailed(_) => "E2001",
            PanelError::ApiParseError(_) => "E2002",
            PanelError::ApiServiceUnavailable(_) => "E2003",
            PanelError::ApiAuthenticationFailed(_) => "E2004",
            PanelError::RequestTimeout(_) => "E2005",
            PanelError::MeetingConflict(_) => "E2006",
            PanelError::PanelAlreadyOpen => "E3001",
            PanelError::PanelClosed => "E3002",
            PanelError::SendFailed { .. } => "E3003",
            PanelError::MeetingNotFound(_) => "E3004",
            PanelError::Internal(_) => "E9001",
            PanelError::Serialization(_) => "E9002",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_includes_code() {
        let err = PanelError::EmptyMessage;
        assert!(err.to_string().contains("E1001"));

        let err = PanelError::SendFailed {
            text: "hello".to_string(),
            reason: "500".to_string(),
        };
        assert!(err.to_string().contains("E3003"));
        assert!(err.to_string().contains("500"));
    }

    #[test]
    fn test_send_failed_preserves_text() {
        let err = PanelError::SendFailed {
            text: "budget proposal draft".to_string(),
            reason: "server error".to_string(),
        };
        match err {
            PanelError::SendFailed { text, .. } => assert_eq!(text, "budget proposal draft"),
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn test_is_validation() {
        assert!(PanelError::EmptyMessage.is_validation());
        assert!(PanelError::MeetingInPast(Utc::now()).is_validation());
        assert!(!PanelError::ApiRequestFailed("x".to_string()).is_validation());
    }

    #[test]
    fn test_is_transient() {
        assert!(PanelError::ApiRequestFailed("x".to_string()).is_transient());
        assert!(PanelError::ApiServiceUnavailable("503".to_string()).is_transient());
        assert!(PanelError::RequestTimeout(30).is_transient());

        assert!(!PanelError::EmptyMessage.is_transient());
        assert!(!PanelError::ApiAuthenticationFailed("401".to_string()).is_transient());
        assert!(!PanelError::PanelClosed.is_transient());
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(PanelError::EmptyMessage.error_code(), "E1001");
        assert_eq!(
            PanelError::ApiRequestFailed("x".to_string()).error_code(),
            "E2001"
        );
        assert_eq!(PanelError::PanelAlreadyOpen.error_code(), "E3001");
        assert_eq!(
            PanelError::MeetingNotFound(Uuid::new_v4()).error_code(),
            "E3004"
        );
        assert_eq!(PanelError::Internal("x".to_string()).error_code(), "E9001");
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_result: Result<serde_json::Value, _> = serde_json::from_str("not json");
        let err: PanelError = json_result.unwrap_err().into();
        assert!(matches!(err, PanelError::Serialization(_)));
    }
}
