//! JWT verification module.
//!
//! Verifies bearer tokens against a JSON Web Key Set published by the identity
//! provider.
//!
//! # Pre-conditions
//! - The key set contains the public keys the issuer signs with.
//! - The token is a compact-serialized JWS.
//!
//! # Post-conditions
//! - On success, returns the verified claims.
//! - On failure, returns a descriptive error indicating what went wrong.
//!
//! # Invariants
//! - Only asymmetric algorithms are accepted; a token can never be verified
//!   with a public key used as an HMAC secret.
//! - Verification is stateless and does not modify any external state.

use jsonwebtoken::jwk::{Jwk, JwkSet, PublicKeyUse};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header};
use serde::{Deserialize, Serialize};

/// Allowed clock skew when checking `exp` and `nbf`, in seconds.
pub const CLOCK_SKEW_SECS: u64 = 60;

/// Claims extracted from a verified JWT.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (the authenticated user), if the issuer sets one.
    #[serde(default)]
    pub sub: Option<String>,
    /// Issuer; always equal to the configured issuer after verification.
    pub iss: String,
    /// Expiry as seconds since Unix epoch.
    pub exp: u64,
}

/// Error returned when JWT verification fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JwtError {
    /// The JWT signature is invalid.
    InvalidSignature,
    /// The JWT has expired.
    TokenExpired,
    /// The JWT's `nbf` is in the future.
    TokenNotYetValid,
    /// The `iss` claim does not match the configured issuer.
    InvalidIssuer,
    /// The JWT is malformed or cannot be parsed.
    MalformedToken,
    /// A required claim is missing.
    MissingClaim(String),
    /// The header names an algorithm this server does not accept.
    UnsupportedAlgorithm(Algorithm),
    /// No key in the key set matches the token.
    UnknownKey(Option<String>),
    /// A key in the key set could not be turned into a decoding key.
    InvalidKey(String),
}

impl std::fmt::Display for JwtError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidSignature => write!(f, "invalid JWT signature"),
            Self::TokenExpired => write!(f, "JWT has expired"),
            Self::TokenNotYetValid => write!(f, "JWT is not valid yet"),
            Self::InvalidIssuer => write!(f, "JWT issuer is not trusted"),
            Self::MalformedToken => write!(f, "malformed JWT"),
            Self::MissingClaim(claim) => write!(f, "missing '{claim}' claim in JWT"),
            Self::UnsupportedAlgorithm(alg) => write!(f, "unsupported JWT algorithm {alg:?}"),
            Self::UnknownKey(Some(kid)) => write!(f, "no signing key with id '{kid}'"),
            Self::UnknownKey(None) => write!(f, "no signing key available"),
            Self::InvalidKey(reason) => write!(f, "invalid key: {reason}"),
        }
    }
}

impl std::error::Error for JwtError {}

/// The parts of a token header needed to choose a verification key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenHeader {
    pub algorithm: Algorithm,
    pub key_id: Option<String>,
}

/// Decode the token header without verifying anything else.
///
/// # Errors
/// Returns `JwtError::MalformedToken` if the header cannot be decoded and
/// `JwtError::UnsupportedAlgorithm` for symmetric algorithms.
pub fn inspect_header(token: &str) -> Result<TokenHeader, JwtError> {
    let header = decode_header(token).map_err(map_jwt_error)?;
    if !is_asymmetric(header.alg) {
        return Err(JwtError::UnsupportedAlgorithm(header.alg));
    }
    Ok(TokenHeader {
        algorithm: header.alg,
        key_id: header.kid,
    })
}

/// Verifies a JWT against `key_set` and returns its claims.
///
/// When the token names a key id only that key is tried; otherwise every
/// signing key in the set is tried in order.
///
/// # Arguments
/// * `token` - The JWT string to verify.
/// * `key_set` - The issuer's published keys.
/// * `issuer` - The value the `iss` claim must equal.
///
/// # Errors
/// Returns `JwtError` if verification fails for any reason.
pub fn verify_token(token: &str, key_set: &JwkSet, issuer: &str) -> Result<Claims, JwtError> {
    let header = inspect_header(token)?;

    let candidates: Vec<&Jwk> = match &header.key_id {
        Some(kid) => key_set.find(kid).into_iter().collect(),
        None => key_set.keys.iter().collect(),
    };
    let candidates: Vec<&Jwk> = candidates
        .into_iter()
        .filter(|jwk| !matches!(jwk.common.public_key_use, Some(PublicKeyUse::Encryption)))
        .collect();

    let validation = validation_for(header.algorithm, issuer);
    let mut last_error = JwtError::UnknownKey(header.key_id.clone());
    for jwk in candidates {
        let key = match DecodingKey::from_jwk(jwk) {
            Ok(key) => key,
            Err(e) if header.key_id.is_none() => {
                last_error = JwtError::InvalidKey(e.to_string());
                continue;
            }
            Err(e) => return Err(JwtError::InvalidKey(e.to_string())),
        };
        match decode::<Claims>(token, &key, &validation) {
            Ok(data) => return Ok(data.claims),
            // Another key without a kid may still match.
            Err(e) if header.key_id.is_none() => last_error = map_jwt_error(e),
            Err(e) => return Err(map_jwt_error(e)),
        }
    }

    Err(last_error)
}

fn validation_for(algorithm: Algorithm, issuer: &str) -> Validation {
    let mut validation = Validation::new(algorithm);
    validation.set_issuer(&[issuer]);
    validation.set_required_spec_claims(&["exp", "iss"]);
    validation.validate_nbf = true;
    validation.validate_aud = false;
    validation.leeway = CLOCK_SKEW_SECS;
    validation
}

const fn is_asymmetric(algorithm: Algorithm) -> bool {
    matches!(
        algorithm,
        Algorithm::RS256
            | Algorithm::RS384
            | Algorithm::RS512
            | Algorithm::PS256
            | Algorithm::PS384
            | Algorithm::PS512
            | Algorithm::ES256
            | Algorithm::ES384
            | Algorithm::EdDSA
    )
}

/// Maps jsonwebtoken errors to our `JwtError` type.
fn map_jwt_error(error: jsonwebtoken::errors::Error) -> JwtError {
    use jsonwebtoken::errors::ErrorKind;

    match error.kind() {
        ErrorKind::InvalidSignature => JwtError::InvalidSignature,
        ErrorKind::ExpiredSignature => JwtError::TokenExpired,
        ErrorKind::ImmatureSignature => JwtError::TokenNotYetValid,
        ErrorKind::InvalidIssuer => JwtError::InvalidIssuer,
        ErrorKind::MissingRequiredClaim(claim) => JwtError::MissingClaim(claim.clone()),
        _ => JwtError::MalformedToken,
    }
}
