//! API error taxonomy and problem documents.
//!
//! Every failed request renders an RFC 7807-style problem document. The
//! serializer for the problem document itself can in principle fail, so a
//! pre-rendered generic body is kept as the last-resort response.

use std::sync::LazyLock;

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

use silt_core::error::SiltError;

/// Media type for problem documents.
pub const PROBLEM_MIMETYPE: &str = "application/problem+json; charset=utf-8";

/// Type URI namespace for problem documents.
const PROBLEM_TYPE_PREFIX: &str = "urn:silt:problem:";

/// Request-level error with a best-effort HTTP status mapping.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("{0} not found")] NotFound(String),
    #[error("bad request: {0}")] BadRequest(String),
    #[error("not supported: {0}")] Unsupported(String),
    #[error("too many requests")] RateLimited,
    #[error("{0}")] Internal(String),
}

impl ApiError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            // Unsupported indicates server misconfiguration, not client error.
            ApiError::Unsupported(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short token identifying the error class in the problem type URI.
    fn token(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "not-found",
            ApiError::BadRequest(_) => "bad-request",
            ApiError::Unsupported(_) => "not-supported",
            ApiError::RateLimited => "rate-limited",
            ApiError::Internal(_) => "internal",
        }
    }

    /// The problem document for this error.
    pub fn to_problem(&self) -> Problem {
        Problem {
            r#type: format!("{PROBLEM_TYPE_PREFIX}{}", self.token()),
            title: self.to_string(),
            status: self.status().as_u16(),
        }
    }
}

impl From<SiltError> for ApiError {
    fn from(e: SiltError) -> Self {
        match e {
            SiltError::NotFound(what) => ApiError::NotFound(what),
            SiltError::Address(err) => ApiError::BadRequest(err.to_string()),
            SiltError::Currency(err) => ApiError::BadRequest(err.to_string()),
            SiltError::Offset(err) => ApiError::BadRequest(err.to_string()),
            SiltError::Unsupported(what) => ApiError::Unsupported(what),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

/// RFC 7807-style problem document.
#[derive(Serialize, Clone, Debug)]
pub struct Problem {
    /// Problem type URI.
    pub r#type: String,
    /// Human-readable message.
    pub title: String,
    /// HTTP status code.
    pub status: u16,
}

/// Pre-rendered body used when even the problem document fails to serialize.
static UNKNOWN_PROBLEM_JSON: LazyLock<Vec<u8>> = LazyLock::new(|| {
    format!(
        r#"{{"type":"{PROBLEM_TYPE_PREFIX}unknown","title":"unknown problem occurred","status":500}}"#
    )
    .into_bytes()
});

/// Render a problem document response with the given status.
pub fn problem_response(problem: &Problem, status: StatusCode) -> Response {
    let body = serde_json::to_vec(problem).unwrap_or_else(|e| {
        tracing::error!(error = %e, "failed to serialize problem document");
        UNKNOWN_PROBLEM_JSON.clone()
    });
    (
        status,
        [
            (header::CONTENT_TYPE, PROBLEM_MIMETYPE),
            (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
        ],
        body,
    )
        .into_response()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if matches!(self, ApiError::Internal(_)) {
            tracing::error!(error = %self, "request failed");
        }
        problem_response(&self.to_problem(), self.status())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use silt_core::error::{AddressError, OffsetError};

    #[test]
    fn status_mapping() {
        assert_eq!(ApiError::NotFound("account".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::BadRequest("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::Unsupported("document".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(ApiError::RateLimited.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            ApiError::Internal("boom".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn silt_error_mapping() {
        assert_eq!(
            ApiError::from(SiltError::NotFound("account".into())),
            ApiError::NotFound("account".into())
        );
        assert!(matches!(
            ApiError::from(SiltError::Address(AddressError::Empty)),
            ApiError::BadRequest(_)
        ));
        assert!(matches!(
            ApiError::from(SiltError::Offset(OffsetError::MissingSeparator("x".into()))),
            ApiError::BadRequest(_)
        ));
        assert!(matches!(
            ApiError::from(SiltError::Storage("disk".into())),
            ApiError::Internal(_)
        ));
        assert!(matches!(
            ApiError::from(SiltError::Readonly),
            ApiError::Internal(_)
        ));
    }

    #[test]
    fn problem_document_shape() {
        let p = ApiError::NotFound("account, alice".into()).to_problem();
        assert_eq!(p.r#type, "urn:silt:problem:not-found");
        assert_eq!(p.status, 404);
        assert!(p.title.contains("alice"));

        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["type"], "urn:silt:problem:not-found");
        assert_eq!(json["status"], 404);
    }

    #[test]
    fn unknown_problem_is_valid_json() {
        let v: serde_json::Value = serde_json::from_slice(&UNKNOWN_PROBLEM_JSON).unwrap();
        assert_eq!(v["status"], 500);
    }
}
