// Life of a request:
// 1. Request comes in
// 2. The gate checks the path; under /api/v1/ (health excepted) it verifies
//    the bearer token against the issuer's key set
// 3. The route table dispatches to a handler
// 4. The handler converts the JSON body into a storage request, runs it on
//    the blocking pool, and converts the record back into a JSON body
//
// System components:
//  - SQLite-backed test case store
//  - Key set client + token verifier
//  - axum router with the gate and request logging

pub mod api;
pub mod auth;
pub mod config;
pub mod storage;
pub mod types;
