//! # GNAP Errors
//!
//! Error classes surfaced by the grant-and-token engine. Each carries a
//! stable wire tag; `Display` renders the JSON body the HTTP boundary
//! returns, and [`Error::status`] gives the HTTP mapping.

use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

/// GNAP error codes.
#[derive(Error, Debug, Deserialize)]
pub enum Error {
    /// The request is malformed or missing a required field.
    #[error(r#"{{"error": "invalid_request", "error_description": "{0}"}}"#)]
    InvalidRequest(String),

    /// Signature verification of the caller's key proof failed.
    #[error(r#"{{"error": "invalid_proof", "error_description": "{0}"}}"#)]
    InvalidProof(String),

    /// The presented key is not in the registry.
    #[error(r#"{{"error": "unknown_key", "error_description": "{0}"}}"#)]
    UnknownKey(String),

    /// The `Authorization` header is absent or not a GNAP bearer.
    #[error(r#"{{"error": "missing_continuation_token", "error_description": "{0}"}}"#)]
    MissingContinuationToken(String),

    /// The presented continuation token does not match the grant's.
    #[error(r#"{{"error": "invalid_continuation_token", "error_description": "{0}"}}"#)]
    InvalidContinuationToken(String),

    /// No grant exists with the given id.
    #[error(r#"{{"error": "grant_not_found", "error_description": "{0}"}}"#)]
    GrantNotFound(String),

    /// The requested transition is illegal for the grant's status.
    #[error(r#"{{"error": "grant_not_pending", "error_description": "{0}"}}"#)]
    GrantNotPending(String),

    /// Approval was attempted before user-code verification.
    #[error(r#"{{"error": "code_not_verified", "error_description": "{0}"}}"#)]
    CodeNotVerified(String),

    /// The grant's lifetime has lapsed.
    #[error(r#"{{"error": "grant_expired", "error_description": "{0}"}}"#)]
    GrantExpired(String),

    /// The consent surface recorded a denial.
    #[error(r#"{{"error": "grant_denied_by_user", "error_description": "{0}"}}"#)]
    GrantDenied(String),

    /// The client polled the continuation endpoint too quickly.
    #[error(r#"{{"error": "too_fast", "error_description": "{0}"}}"#)]
    TooFast(String),

    /// A referenced record does not exist.
    #[error(r#"{{"error": "not_found", "error_description": "{0}"}}"#)]
    NotFound(String),

    /// An I/O failure or internal invariant violation.
    #[error(r#"{{"error": "internal", "error_description": "{0}"}}"#)]
    ServerError(String),
}

impl Error {
    /// The HTTP status the error maps to.
    #[must_use]
    pub const fn status(&self) -> u16 {
        match self {
            Self::InvalidRequest(_)
            | Self::GrantNotPending(_)
            | Self::CodeNotVerified(_)
            | Self::GrantExpired(_)
            | Self::TooFast(_) => 400,
            Self::InvalidProof(_)
            | Self::UnknownKey(_)
            | Self::MissingContinuationToken(_)
            | Self::InvalidContinuationToken(_) => 401,
            Self::GrantDenied(_) => 403,
            Self::GrantNotFound(_) | Self::NotFound(_) => 404,
            Self::ServerError(_) => 500,
        }
    }

    /// Transform the error to a GNAP-compatible JSON value.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::from_str(&self.to_string()).unwrap_or_default()
    }
}

/// Error response shape returned to callers.
#[derive(Deserialize, Serialize)]
pub struct ErrorResponse {
    /// Error code.
    pub error: String,

    /// Error description.
    pub error_description: String,
}

impl Serialize for Error {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::Error as SerdeError;

        let Ok(error) = serde_json::from_str::<ErrorResponse>(&self.to_string()) else {
            return Err(SerdeError::custom("issue serializing error"));
        };
        error.serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::*;

    // Test that error details are returned as json.
    #[test]
    fn err_json() {
        let err = Error::InvalidRequest("bad request".into());
        let ser: Value = serde_json::from_str(&err.to_string()).unwrap();
        assert_eq!(ser, json!({"error":"invalid_request", "error_description": "bad request"}));
    }

    #[test]
    fn err_serialize() {
        let err = Error::GrantDenied("grant denied by user".into());
        let ser = serde_json::to_value(&err).unwrap();
        assert_eq!(
            ser,
            json!({"error":"grant_denied_by_user", "error_description": "grant denied by user"})
        );
    }

    #[test]
    fn status_mapping() {
        assert_eq!(Error::InvalidRequest(String::new()).status(), 400);
        assert_eq!(Error::InvalidProof(String::new()).status(), 401);
        assert_eq!(Error::InvalidContinuationToken(String::new()).status(), 401);
        assert_eq!(Error::GrantDenied(String::new()).status(), 403);
        assert_eq!(Error::GrantNotFound(String::new()).status(), 404);
        assert_eq!(Error::TooFast(String::new()).status(), 400);
        assert_eq!(Error::ServerError(String::new()).status(), 500);
    }
}
