//! `GET /api/v1/health`.

use axum::Json;

use crate::types::HealthReport;

/// Report liveness. Always succeeds while the process is serving requests.
pub async fn report() -> Json<HealthReport> {
    Json(HealthReport::placeholder())
}
