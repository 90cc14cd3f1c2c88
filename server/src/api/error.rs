//! HTTP error responses.

use axum::Json;
use axum::http::header::WWW_AUTHENTICATE;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::storage::DatabaseError;
use crate::types::TimestampOutOfRange;

/// Error returned by handlers and the authentication gate.
#[derive(Debug)]
pub enum ApiError {
    /// The request lacks valid credentials.
    ///
    /// `description` is `None` when no credentials were presented at all.
    Unauthorized { description: Option<String> },
    /// No route matches the request.
    NotFound,
    /// The server failed while handling an otherwise valid request.
    Internal(String),
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unauthorized { description: None } => write!(f, "unauthorized"),
            Self::Unauthorized {
                description: Some(description),
            } => write!(f, "unauthorized: {description}"),
            Self::NotFound => write!(f, "not found"),
            Self::Internal(message) => write!(f, "internal error: {message}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<DatabaseError> for ApiError {
    fn from(e: DatabaseError) -> Self {
        Self::Internal(e.to_string())
    }
}

impl From<TimestampOutOfRange> for ApiError {
    fn from(e: TimestampOutOfRange) -> Self {
        Self::Internal(e.to_string())
    }
}

/// JSON body for 404 and 500 responses.
#[derive(Debug, Serialize)]
struct ErrorBody {
    status: u16,
    error: &'static str,
}

impl ErrorBody {
    fn response(status: StatusCode) -> Response {
        let body = Self {
            status: status.as_u16(),
            error: status.canonical_reason().unwrap_or("Error"),
        };
        (status, Json(body)).into_response()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::Unauthorized { description } => {
                let challenge = bearer_challenge(description.as_deref());
                let mut response = StatusCode::UNAUTHORIZED.into_response();
                response.headers_mut().insert(WWW_AUTHENTICATE, challenge);
                response
            }
            Self::NotFound => ErrorBody::response(StatusCode::NOT_FOUND),
            Self::Internal(message) => {
                tracing::error!("request failed: {message}");
                ErrorBody::response(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }
}

/// Build an RFC 6750 `WWW-Authenticate` challenge.
fn bearer_challenge(description: Option<&str>) -> HeaderValue {
    let Some(description) = description else {
        return HeaderValue::from_static("Bearer");
    };
    let description: String = description
        .chars()
        .map(|c| if c == '"' || c == '\\' || !c.is_ascii() { '\'' } else { c })
        .collect();
    HeaderValue::from_str(&format!(
        "Bearer error=\"invalid_token\", error_description=\"{description}\""
    ))
    .unwrap_or_else(|_| HeaderValue::from_static("Bearer error=\"invalid_token\""))
}
