//! Wire formats for the HTTP API.
//!
//! Request and response bodies are explicit structs with fixed JSON field
//! names. Conversions to and from storage records live next to each type.

pub mod health;
pub mod test_case;

pub use health::HealthReport;
pub use test_case::{CreateTestCaseRequest, TestCaseBody, TimestampOutOfRange};
