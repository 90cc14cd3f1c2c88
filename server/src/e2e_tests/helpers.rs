//! Common helpers for end-to-end tests.

#![allow(clippy::expect_used)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::routing::get;
use serde_json::{Value, json};
use tokio::task::JoinHandle;

use crate::api::{self, AppState};
use crate::auth::{Authenticator, HttpKeySetSource, JwksClient, RefreshPolicy};
use crate::testing::{
    TEST_ISSUER, TestKey, claims_expiring_in, new_test_store, primary_key_set_json, sign_token,
};
use crate::types::TestCaseBody;

const JWKS_PATH: &str = "/.well-known/jwks.json";

async fn spawn_router(app: Router) -> (SocketAddr, JoinHandle<()>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    let task = tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    (addr, task)
}

/// A stub identity provider that serves a fixed key set and counts fetches.
pub struct JwksStub {
    uri: String,
    fetches: Arc<AtomicUsize>,
    task: JoinHandle<()>,
}

impl JwksStub {
    /// Serve `key_set` as the JWKS document.
    pub async fn start(key_set: Value) -> Self {
        let fetches = Arc::new(AtomicUsize::new(0));
        let app = Router::new()
            .route(JWKS_PATH, get(serve_key_set))
            .with_state((Arc::new(key_set), Arc::clone(&fetches)));
        let (addr, task) = spawn_router(app).await;
        Self {
            uri: format!("http://{addr}{JWKS_PATH}"),
            fetches,
            task,
        }
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Number of times the key set has been requested.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl Drop for JwksStub {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn serve_key_set(
    State((key_set, fetches)): State<(Arc<Value>, Arc<AtomicUsize>)>,
) -> Json<Value> {
    fetches.fetch_add(1, Ordering::SeqCst);
    Json(key_set.as_ref().clone())
}

/// An HTTP client that talks to loopback directly, whatever the proxy
/// environment says.
fn local_client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .timeout(Duration::from_secs(5))
        .build()
        .expect("build http client")
}

/// A URI on which nothing is listening.
pub fn unreachable_jwks_uri() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);
    format!("http://{addr}{JWKS_PATH}")
}

/// The application under test, served over HTTP with a fresh in-memory store.
pub struct TestServer {
    base_url: String,
    client: reqwest::Client,
    /// The stub issuer, if this server has a reachable one.
    pub jwks: Option<JwksStub>,
    task: JoinHandle<()>,
}

impl TestServer {
    /// Start the server next to a stub issuer publishing the primary key.
    pub async fn start() -> Self {
        let jwks = JwksStub::start(primary_key_set_json()).await;
        let uri = jwks.uri().to_string();
        Self::start_with(&uri, Some(jwks)).await
    }

    /// Start the server with its key set at `jwks_uri`.
    pub async fn start_with(jwks_uri: &str, jwks: Option<JwksStub>) -> Self {
        let source = HttpKeySetSource::with_client(local_client(), jwks_uri);
        let keys = JwksClient::new(
            Arc::new(source),
            RefreshPolicy {
                ttl: Duration::from_secs(300),
                refresh_cooldown: Duration::from_secs(30),
            },
        );
        let state = AppState {
            store: Arc::new(new_test_store()),
            authenticator: Authenticator::new(Arc::new(keys), TEST_ISSUER),
        };
        let (addr, task) = spawn_router(api::router(state)).await;

        Self {
            base_url: format!("http://{addr}"),
            client: local_client(),
            jwks,
            task,
        }
    }

    /// The HTTP client the helpers use.
    pub const fn client(&self) -> &reqwest::Client {
        &self.client
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// A valid token for the stub issuer.
    pub fn token() -> String {
        sign_token(TestKey::Primary, &claims_expiring_in(3_600))
    }

    fn request(
        &self,
        method: reqwest::Method,
        path: &str,
        token: Option<&str>,
    ) -> reqwest::RequestBuilder {
        let builder = self.client.request(method, self.url(path));
        match token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> reqwest::Response {
        self.request(reqwest::Method::GET, path, token)
            .send()
            .await
            .expect("send GET")
    }

    pub async fn post_json(&self, path: &str, body: &Value, token: Option<&str>) -> reqwest::Response {
        self.request(reqwest::Method::POST, path, token)
            .json(body)
            .send()
            .await
            .expect("send POST")
    }

    pub async fn delete(&self, path: &str, token: Option<&str>) -> reqwest::Response {
        self.request(reqwest::Method::DELETE, path, token)
            .send()
            .await
            .expect("send DELETE")
    }

    /// Create a test case with a valid token and return the stored body.
    pub async fn create_test_case(&self, name: &str, script: &str) -> TestCaseBody {
        let response = self
            .post_json(
                "/api/v1/testcases/",
                &json!({ "name": name, "gherkinScript": script }),
                Some(&Self::token()),
            )
            .await;
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        response.json().await.expect("parse created test case")
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Read the `WWW-Authenticate` header of a response.
pub fn challenge(response: &reqwest::Response) -> Option<String> {
    response
        .headers()
        .get(reqwest::header::WWW_AUTHENTICATE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}
