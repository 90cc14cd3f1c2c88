//! Authentication module.
//!
//! Bearer-token authentication against an external identity provider.
//!
//! # Components
//!
//! - `jwks` - key set client that fetches and caches the issuer's public keys
//! - `jwt` - token verification against a key set
//! - `gate` - middleware that guards the reserved API prefix
//!
//! # Invariants
//! - Verification is stateless; no session is created or consulted.
//! - Any failure to verify, including an unreachable key set, rejects the request.

pub mod gate;
pub mod jwks;
pub mod jwt;

pub use gate::{AuthError, Authenticator, require_bearer_token};
pub use jwks::{HttpKeySetSource, JwksClient, JwksError, KeySetSource, RefreshPolicy};
pub use jwt::{Claims, JwtError};
