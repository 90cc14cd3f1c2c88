//! Liveness payload.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Status string reported for a healthy process or dependency.
pub const STATUS_UP: &str = "UP";

/// Response body for `GET /api/v1/health`.
///
/// ```json
/// { "status": "UP", "services": { "database": "UP" } }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    /// Overall process status.
    pub status: String,
    /// Dependency name to status.
    pub services: BTreeMap<String, String>,
}

impl HealthReport {
    /// The report served while the process is running.
    ///
    /// The database entry is a fixed placeholder; no connectivity check runs.
    #[must_use]
    pub fn placeholder() -> Self {
        let services = BTreeMap::from([("database".to_string(), STATUS_UP.to_string())]);
        Self {
            status: STATUS_UP.to_string(),
            services,
        }
    }
}
