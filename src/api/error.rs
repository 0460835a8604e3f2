use crate::utils::store::StoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Everything that can go wrong talking to the ScoreSight backend
#[derive(Debug, Error)]
pub enum ApiError {
    /// Bad input caught before any request went out
    #[error("{0}")]
    Validation(String),

    /// HTTP 401
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Any other non-2xx status
    #[error("backend returned {status}: {message}")]
    Status { status: u16, message: String },

    /// A 2xx body that carried an explicit `error` field
    #[error("backend reported an error: {0}")]
    Backend(String),

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("malformed response: {0}")]
    Decode(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Unauthorized(_) => Some(401),
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Transport and server-side failures are replaced by synthesized data;
    /// validation and auth failures are shown to the user as-is.
    pub fn fallback_reason(&self) -> Option<FallbackReason> {
        match self {
            ApiError::Transport(e) => Some(FallbackReason::Unreachable(e.to_string())),
            ApiError::Status { status, .. } => Some(FallbackReason::Status(*status)),
            ApiError::Decode(msg) => Some(FallbackReason::Malformed(msg.clone())),
            _ => None,
        }
    }

    /// Text suitable for showing inline next to a form
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Validation(msg) => msg.clone(),
            ApiError::Unauthorized(msg) => msg.clone(),
            ApiError::Status { status, message } => {
                format!("Request failed ({}): {}", status, message)
            }
            ApiError::Backend(msg) => msg.clone(),
            ApiError::Transport(_) => {
                "Network error. Check your connection and try again!".to_string()
            }
            ApiError::Decode(_) => "The server sent a response we could not read.".to_string(),
            ApiError::Store(e) => format!("Could not access local storage: {}", e),
        }
    }
}

/// Why a value was synthesized instead of fetched
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum FallbackReason {
    Unreachable(String),
    Status(u16),
    Malformed(String),
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackReason::Unreachable(_) => write!(f, "backend unreachable"),
            FallbackReason::Status(status) => write!(f, "backend returned {}", status),
            FallbackReason::Malformed(_) => write!(f, "backend sent an unreadable response"),
        }
    }
}

/// Where a rendered value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    Live,
    Fallback,
}

impl Provenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provenance::Live => "live",
            Provenance::Fallback => "fallback",
        }
    }
}

/// Result of a backend call, tagged with its provenance.
///
/// `Fallback` carries a synthesized value plus the reason the real one could
/// not be obtained. `Failed` carries no value at all; the caller shows the
/// error.
#[derive(Debug)]
pub enum Outcome<T> {
    Live(T),
    Fallback { value: T, reason: FallbackReason },
    Failed(ApiError),
}

impl<T> Outcome<T> {
    /// Turn a fetch result into an outcome, synthesizing a substitute for
    /// errors that are eligible for fallback.
    pub fn or_fallback<F>(result: Result<T, ApiError>, synthesize: F) -> Self
    where
        F: FnOnce() -> T,
    {
        match result {
            Ok(value) => Outcome::Live(value),
            Err(err) => match err.fallback_reason() {
                Some(reason) => {
                    tracing::warn!("Falling back to synthesized data: {}", err);
                    Outcome::Fallback {
                        value: synthesize(),
                        reason,
                    }
                }
                None => Outcome::Failed(err),
            },
        }
    }

    pub fn provenance(&self) -> Option<Provenance> {
        match self {
            Outcome::Live(_) => Some(Provenance::Live),
            Outcome::Fallback { .. } => Some(Provenance::Fallback),
            Outcome::Failed(_) => None,
        }
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Outcome::Live(value) | Outcome::Fallback { value, .. } => Some(value),
            Outcome::Failed(_) => None,
        }
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            Outcome::Live(value) | Outcome::Fallback { value, .. } => Some(value),
            Outcome::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&ApiError> {
        match self {
            Outcome::Failed(err) => Some(err),
            _ => None,
        }
    }

    pub fn is_live(&self) -> bool {
        matches!(self, Outcome::Live(_))
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Outcome::Fallback { .. })
    }

    pub fn map<U, F>(self, f: F) -> Outcome<U>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            Outcome::Live(value) => Outcome::Live(f(value)),
            Outcome::Fallback { value, reason } => Outcome::Fallback {
                value: f(value),
                reason,
            },
            Outcome::Failed(err) => Outcome::Failed(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_errors_fall_back() {
        let outcome: Outcome<u32> = Outcome::or_fallback(
            Err(ApiError::Status {
                status: 503,
                message: "Service Unavailable".to_string(),
            }),
            || 7,
        );
        assert_eq!(outcome.provenance(), Some(Provenance::Fallback));
        assert_eq!(outcome.value(), Some(&7));
        match outcome {
            Outcome::Fallback { reason, .. } => assert_eq!(reason, FallbackReason::Status(503)),
            other => panic!("expected fallback, got {:?}", other),
        }
    }

    #[test]
    fn test_unauthorized_does_not_fall_back() {
        let outcome: Outcome<u32> = Outcome::or_fallback(
            Err(ApiError::Unauthorized("Please login first".to_string())),
            || 7,
        );
        assert!(outcome.value().is_none());
        assert_eq!(outcome.error().and_then(ApiError::status), Some(401));
    }

    #[test]
    fn test_validation_does_not_fall_back() {
        let mut synthesized = false;
        let outcome: Outcome<u32> = Outcome::or_fallback(
            Err(ApiError::Validation("Please select both teams".to_string())),
            || {
                synthesized = true;
                7
            },
        );
        assert!(!synthesized);
        assert_eq!(
            outcome.error().map(ApiError::user_message),
            Some("Please select both teams".to_string())
        );
    }

    #[test]
    fn test_map_keeps_provenance() {
        let outcome = Outcome::Fallback {
            value: 2,
            reason: FallbackReason::Malformed("missing field".to_string()),
        }
        .map(|v| v * 10);
        assert!(outcome.is_fallback());
        assert_eq!(outcome.into_value(), Some(20));
    }
}
