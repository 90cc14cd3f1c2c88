//! HTTP surface.
//!
//! The route table is explicit: every `(method, path)` pair maps to one
//! handler. The authentication gate wraps the whole router and decides per
//! path whether a token is needed, so unknown paths under the reserved prefix
//! are guarded too.
//!
//! | Method | Path                      | Auth |
//! |--------|---------------------------|------|
//! | GET    | `/api/v1/health`          | no   |
//! | POST   | `/api/v1/testcases/`      | yes  |
//! | GET    | `/api/v1/testcases/`      | yes  |
//! | GET    | `/api/v1/testcases/{id}`  | yes  |
//! | DELETE | `/api/v1/testcases/{id}`  | yes  |
//!
//! Request bodies are not size-limited; scripts of any length are stored.

mod error;
mod health;
mod test_cases;

use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::{DefaultBodyLimit, Request};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::get;

pub use error::ApiError;

use crate::auth::{Authenticator, require_bearer_token};
use crate::storage::TestCaseStore;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    /// The test case store.
    pub store: Arc<TestCaseStore>,
    /// Bearer token verifier used by the gate.
    pub authenticator: Authenticator,
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let gate = middleware::from_fn_with_state(state.authenticator.clone(), require_bearer_token);

    Router::new()
        .route("/api/v1/health", get(health::report))
        .route(
            "/api/v1/testcases/",
            get(test_cases::list).post(test_cases::create),
        )
        .route(
            "/api/v1/testcases/{id}",
            get(test_cases::get_by_id).delete(test_cases::delete_by_id),
        )
        .fallback(not_found)
        .layer(DefaultBodyLimit::disable())
        .layer(gate)
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}

async fn not_found() -> ApiError {
    ApiError::NotFound
}

/// Emit one event per request with its outcome and latency.
async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(request).await;

    tracing::debug!(
        %method,
        %path,
        status = response.status().as_u16(),
        elapsed_ms = started.elapsed().as_millis(),
        "handled request"
    );
    response
}
