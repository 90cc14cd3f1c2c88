//! Test case request and response bodies.
//!
//! JSON field names follow the public API: `id`, `name`, `gherkinScript`,
//! `createdAt`. Absent strings are serialized as `null`; `createdAt` is an
//! RFC 3339 timestamp in UTC.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::storage::{NewTestCase, TestCase};

/// Body of `POST /api/v1/testcases/`.
///
/// Any `id` or `createdAt` sent by the client is ignored: both are assigned by
/// the server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTestCaseRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub gherkin_script: Option<String>,
}

impl From<CreateTestCaseRequest> for NewTestCase {
    fn from(request: CreateTestCaseRequest) -> Self {
        Self {
            name: request.name,
            script: request.gherkin_script,
        }
    }
}

/// A stored test case as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCaseBody {
    pub id: i64,
    pub name: Option<String>,
    pub gherkin_script: Option<String>,
    pub created_at: String,
}

impl TryFrom<TestCase> for TestCaseBody {
    type Error = TimestampOutOfRange;

    fn try_from(record: TestCase) -> Result<Self, Self::Error> {
        Ok(Self {
            id: record.id,
            name: record.name,
            gherkin_script: record.script,
            created_at: format_created_at(record.created_at_ms)?,
        })
    }
}

/// A stored creation time that cannot be rendered as RFC 3339.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimestampOutOfRange(pub i64);

impl std::fmt::Display for TimestampOutOfRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "timestamp {}ms is out of range", self.0)
    }
}

impl std::error::Error for TimestampOutOfRange {}

/// Render milliseconds since Unix epoch as an RFC 3339 UTC timestamp.
pub fn format_created_at(created_at_ms: i64) -> Result<String, TimestampOutOfRange> {
    let nanos = i128::from(created_at_ms) * 1_000_000;
    OffsetDateTime::from_unix_timestamp_nanos(nanos)
        .ok()
        .and_then(|instant| instant.format(&Rfc3339).ok())
        .ok_or(TimestampOutOfRange(created_at_ms))
}
