//! Test that the reserved prefix rejects requests without a valid token.

use reqwest::StatusCode;
use serde_json::json;

use crate::e2e_tests::helpers::*;
use crate::testing::{TestKey, claims_expiring_in, sign_hs256, sign_token};

const PROTECTED: [&str; 2] = ["/api/v1/testcases/", "/api/v1/testcases/1"];

#[tokio::test]
async fn test_missing_header_rejected() {
    let server = TestServer::start().await;

    for path in PROTECTED {
        let response = server.get(path, None).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{path}");
        assert_eq!(challenge(&response).as_deref(), Some("Bearer"));
    }
}

#[tokio::test]
async fn test_missing_header_never_reaches_store() {
    let server = TestServer::start().await;

    let response = server
        .post_json(
            "/api/v1/testcases/",
            &json!({ "name": "sneaky", "gherkinScript": "" }),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let delete = server.delete("/api/v1/testcases/1", None).await;
    assert_eq!(delete.status(), StatusCode::UNAUTHORIZED);

    let list = server
        .get("/api/v1/testcases/", Some(&TestServer::token()))
        .await;
    let cases: Vec<serde_json::Value> = list.json().await.expect("parse list");
    assert!(cases.is_empty());
}

#[tokio::test]
async fn test_wrongly_signed_token_rejected() {
    let server = TestServer::start().await;
    let token = sign_token(TestKey::ForeignWithPrimaryKid, &claims_expiring_in(3_600));

    let response = server.get("/api/v1/testcases/", Some(&token)).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let challenge = challenge(&response).expect("challenge header");
    assert!(challenge.starts_with("Bearer error=\"invalid_token\""));
}

#[tokio::test]
async fn test_unknown_key_rejected() {
    let server = TestServer::start().await;
    let token = sign_token(TestKey::Foreign, &claims_expiring_in(3_600));

    let response = server.get("/api/v1/testcases/", Some(&token)).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_expired_token_rejected() {
    let server = TestServer::start().await;
    let token = sign_token(TestKey::Primary, &claims_expiring_in(-3_600));

    let response = server.get("/api/v1/testcases/", Some(&token)).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        challenge(&response).as_deref(),
        Some("Bearer error=\"invalid_token\", error_description=\"JWT has expired\"")
    );
}

#[tokio::test]
async fn test_wrong_issuer_rejected() {
    let server = TestServer::start().await;
    let mut claims = claims_expiring_in(3_600);
    claims["iss"] = json!("https://evil.example.com");
    let token = sign_token(TestKey::Primary, &claims);

    let response = server.get("/api/v1/testcases/", Some(&token)).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_hmac_token_rejected() {
    let server = TestServer::start().await;
    let token = sign_hs256(b"guessable", &claims_expiring_in(3_600));

    let response = server.get("/api/v1/testcases/", Some(&token)).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_malformed_tokens_rejected() {
    let server = TestServer::start().await;

    for token in ["garbage", "a.b.c", "eyJhbGciOiJSUzI1NiJ9.e30.sig"] {
        let response = server.get("/api/v1/testcases/", Some(token)).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{token}");
    }
}

#[tokio::test]
async fn test_non_bearer_scheme_rejected() {
    let server = TestServer::start().await;

    let response = server
        .client()
        .get(server.url("/api/v1/testcases/"))
        .basic_auth("user", Some("pass"))
        .send()
        .await
        .expect("send request");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_unreachable_key_set_fails_closed() {
    let server = TestServer::start_with(&unreachable_jwks_uri(), None).await;

    let response = server
        .get("/api/v1/testcases/", Some(&TestServer::token()))
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_valid_token_admitted() {
    let server = TestServer::start().await;

    let response = server
        .get("/api/v1/testcases/", Some(&TestServer::token()))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_unknown_path_under_prefix_is_guarded() {
    let server = TestServer::start().await;

    let anonymous = server.get("/api/v1/nothing-here", None).await;
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

    let authenticated = server
        .get("/api/v1/nothing-here", Some(&TestServer::token()))
        .await;
    assert_eq!(authenticated.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_paths_outside_prefix_skip_the_gate() {
    let server = TestServer::start().await;

    let response = server.get("/index.html", None).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(challenge(&response), None);
}
