//! Authentication gate for the reserved API prefix.
//!
//! Every request whose path starts with [`PROTECTED_PREFIX`] must carry an
//! `Authorization: Bearer <jwt>` header that verifies against the issuer's key
//! set. The only exemption under the prefix is the health endpoint. Paths
//! outside the prefix are admitted without any identity check.
//!
//! # Invariants
//! - Rejected requests never reach a handler.
//! - No session state: each request is verified on its own.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::api::ApiError;
use crate::auth::jwks::{JwksClient, JwksError};
use crate::auth::jwt::{self, Claims, JwtError};

/// Path prefix reserved for the authenticated API.
pub const PROTECTED_PREFIX: &str = "/api/v1/";

/// Paths under [`PROTECTED_PREFIX`] that are served without a token.
pub const PUBLIC_PATHS: &[&str] = &["/api/v1/health"];

/// Whether a request to `path` has to present a bearer token.
#[must_use]
pub fn requires_authentication(path: &str) -> bool {
    path.starts_with(PROTECTED_PREFIX) && !PUBLIC_PATHS.contains(&path)
}

/// Why a request was not admitted.
#[derive(Debug)]
pub enum AuthError {
    /// No `Authorization` header was sent.
    MissingToken,
    /// The `Authorization` header is not a well-formed bearer credential.
    MalformedHeader,
    /// The token failed verification.
    InvalidToken(JwtError),
    /// The key set could not be fetched.
    KeySetUnavailable(JwksError),
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingToken => write!(f, "bearer token required"),
            Self::MalformedHeader => write!(f, "malformed bearer token"),
            Self::InvalidToken(e) => write!(f, "{e}"),
            Self::KeySetUnavailable(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for AuthError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidToken(e) => Some(e),
            Self::KeySetUnavailable(e) => Some(e),
            Self::MissingToken | Self::MalformedHeader => None,
        }
    }
}

impl From<JwtError> for AuthError {
    fn from(e: JwtError) -> Self {
        Self::InvalidToken(e)
    }
}

impl From<JwksError> for AuthError {
    fn from(e: JwksError) -> Self {
        Self::KeySetUnavailable(e)
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::MissingToken => Self::Unauthorized { description: None },
            // Key set failures are not the caller's fault, but they still get
            // the same challenge; the detail stays in the server log.
            AuthError::KeySetUnavailable(_) => Self::Unauthorized {
                description: Some("unable to verify token".to_string()),
            },
            AuthError::MalformedHeader | AuthError::InvalidToken(_) => Self::Unauthorized {
                description: Some(e.to_string()),
            },
        }
    }
}

/// Verifies bearer tokens for the gate.
#[derive(Clone)]
pub struct Authenticator {
    keys: Arc<JwksClient>,
    issuer: Arc<str>,
}

impl Authenticator {
    #[must_use]
    pub fn new(keys: Arc<JwksClient>, issuer: &str) -> Self {
        Self {
            keys,
            issuer: Arc::from(issuer),
        }
    }

    /// Verify `token` and return its claims.
    ///
    /// A token naming a key id that the cached set lacks triggers one forced
    /// refresh of the key set, to pick up rotated keys.
    pub async fn authenticate(&self, token: &str) -> Result<Claims, AuthError> {
        jwt::inspect_header(token)?;
        let key_set = self.keys.key_set().await?;

        match jwt::verify_token(token, &key_set, &self.issuer) {
            Err(JwtError::UnknownKey(Some(kid))) => {
                tracing::debug!(%kid, "unknown key id, refreshing key set");
                match self.keys.refresh_for_unknown_key().await? {
                    Some(refreshed) => Ok(jwt::verify_token(token, &refreshed, &self.issuer)?),
                    None => Err(JwtError::UnknownKey(Some(kid)).into()),
                }
            }
            result => Ok(result?),
        }
    }
}

/// Extract the token from an `Authorization` header value.
///
/// The scheme is matched case-insensitively and the token must be a non-empty
/// run of base64url/JWT characters.
pub fn bearer_token(header_value: &str) -> Result<&str, AuthError> {
    let (scheme, token) = header_value
        .split_once(' ')
        .ok_or(AuthError::MalformedHeader)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::MalformedHeader);
    }
    let well_formed = !token.is_empty()
        && token
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b"-._~+/=".contains(&b));
    if !well_formed {
        return Err(AuthError::MalformedHeader);
    }
    Ok(token)
}

/// Middleware guarding the reserved prefix.
///
/// On success the verified [`Claims`] are stored in the request extensions.
pub async fn require_bearer_token(
    State(authenticator): State<Authenticator>,
    mut request: Request,
    next: Next,
) -> Response {
    if !requires_authentication(request.uri().path()) {
        return next.run(request).await;
    }

    let outcome = admit(&authenticator, request.headers()).await;
    match outcome {
        Ok(claims) => {
            request.extensions_mut().insert(claims);
            next.run(request).await
        }
        Err(e) => {
            match &e {
                AuthError::KeySetUnavailable(inner) => {
                    tracing::warn!("rejecting request, key set unavailable: {inner}");
                }
                other => {
                    tracing::debug!(path = %request.uri().path(), "rejecting request: {other}");
                }
            }
            ApiError::from(e).into_response()
        }
    }
}

async fn admit(authenticator: &Authenticator, headers: &HeaderMap) -> Result<Claims, AuthError> {
    let header = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingToken)?;
    let header = header.to_str().map_err(|_| AuthError::MalformedHeader)?;
    let token = bearer_token(header)?;
    authenticator.authenticate(token).await
}
