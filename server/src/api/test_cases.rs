//! `/api/v1/testcases` handlers.
//!
//! Storage calls run on the blocking thread pool; each request holds the
//! connection only for the single statement it needs.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::api::{ApiError, AppState};
use crate::storage::{DatabaseError, NewTestCase, TestCaseStore};
use crate::types::{CreateTestCaseRequest, TestCaseBody};

/// `POST /api/v1/testcases/`
pub async fn create(
    State(state): State<AppState>,
    Json(request): Json<CreateTestCaseRequest>,
) -> Result<Json<TestCaseBody>, ApiError> {
    let new = NewTestCase::from(request);
    let created = with_store(&state, move |store| store.create(new)).await?;
    Ok(Json(TestCaseBody::try_from(created)?))
}

/// `GET /api/v1/testcases/`
pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<TestCaseBody>>, ApiError> {
    let records = with_store(&state, TestCaseStore::list_all).await?;
    let bodies = records
        .into_iter()
        .map(TestCaseBody::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(bodies))
}

/// `GET /api/v1/testcases/{id}`
///
/// A missing id is not an error: the response is `200 OK` with an empty body.
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    match with_store(&state, move |store| store.get_by_id(id)).await? {
        Some(record) => Ok(Json(TestCaseBody::try_from(record)?).into_response()),
        None => Ok(StatusCode::OK.into_response()),
    }
}

/// `DELETE /api/v1/testcases/{id}`
///
/// Idempotent: deleting a missing id still answers `200 OK`.
pub async fn delete_by_id(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    with_store(&state, move |store| store.delete_by_id(id)).await?;
    Ok(StatusCode::OK)
}

/// Run `operation` against the store on the blocking thread pool.
async fn with_store<T, F>(state: &AppState, operation: F) -> Result<T, ApiError>
where
    F: FnOnce(&TestCaseStore) -> Result<T, DatabaseError> + Send + 'static,
    T: Send + 'static,
{
    let store = Arc::clone(&state.store);
    tokio::task::spawn_blocking(move || operation(store.as_ref()))
        .await
        .map_err(|e| ApiError::Internal(format!("storage task failed: {e}")))?
        .map_err(ApiError::from)
}
