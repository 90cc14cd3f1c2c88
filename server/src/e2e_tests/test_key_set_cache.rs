//! Test that the key set is fetched once and then served from cache.

use reqwest::StatusCode;

use crate::e2e_tests::helpers::*;

#[tokio::test]
async fn test_key_set_fetched_lazily_and_cached() {
    let server = TestServer::start().await;
    let jwks = server.jwks.as_ref().expect("stub issuer");
    assert_eq!(jwks.fetch_count(), 0);

    for _ in 0..3 {
        let response = server
            .get("/api/v1/testcases/", Some(&TestServer::token()))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    assert_eq!(jwks.fetch_count(), 1);
}

#[tokio::test]
async fn test_public_paths_do_not_fetch_key_set() {
    let server = TestServer::start().await;
    let jwks = server.jwks.as_ref().expect("stub issuer");

    server.get("/api/v1/health", None).await;
    server.get("/api/v1/testcases/", None).await;

    assert_eq!(jwks.fetch_count(), 0);
}
