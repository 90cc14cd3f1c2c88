//! JSON Web Key Set client.
//!
//! Fetches the identity provider's signing keys and caches them.
//!
//! # Refresh policy
//! - A fetched key set is trusted for `ttl`; the first lookup after that
//!   refetches it.
//! - A token naming an unknown key id may force one early refresh, but at most
//!   once per `refresh_cooldown`, so bogus key ids cannot hammer the issuer.
//! - If a fetch fails and the cache has expired, the lookup fails. Callers must
//!   treat that as a rejection.
//!
//! # Thread Safety
//! The cache sits behind an async mutex that is held across the fetch, so
//! concurrent requests that find the cache stale wait for a single fetch
//! instead of each issuing their own.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use jsonwebtoken::jwk::JwkSet;
use tokio::sync::Mutex;

/// Error returned when the key set cannot be obtained.
#[derive(Debug)]
pub enum JwksError {
    /// The HTTP request failed or returned a non-success status.
    Http(reqwest::Error),
    /// The key set could not be obtained for another reason.
    Unavailable(String),
}

impl std::fmt::Display for JwksError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Http(e) => write!(f, "key set request failed: {e}"),
            Self::Unavailable(reason) => write!(f, "key set unavailable: {reason}"),
        }
    }
}

impl std::error::Error for JwksError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Http(e) => Some(e),
            Self::Unavailable(_) => None,
        }
    }
}

impl From<reqwest::Error> for JwksError {
    fn from(e: reqwest::Error) -> Self {
        Self::Http(e)
    }
}

/// Where key sets come from.
#[async_trait]
pub trait KeySetSource: Send + Sync {
    /// Fetch the current key set.
    async fn fetch(&self) -> Result<JwkSet, JwksError>;
}

/// Fetches the key set over HTTP(S).
pub struct HttpKeySetSource {
    client: reqwest::Client,
    uri: String,
}

impl HttpKeySetSource {
    /// Create a source for `uri` whose requests give up after `timeout`.
    pub fn new(uri: impl Into<String>, timeout: Duration) -> Result<Self, JwksError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, uri))
    }

    /// Create a source for `uri` that sends its requests through `client`.
    #[must_use]
    pub fn with_client(client: reqwest::Client, uri: impl Into<String>) -> Self {
        Self {
            client,
            uri: uri.into(),
        }
    }
}

#[async_trait]
impl KeySetSource for HttpKeySetSource {
    async fn fetch(&self) -> Result<JwkSet, JwksError> {
        let key_set = self
            .client
            .get(&self.uri)
            .send()
            .await?
            .error_for_status()?
            .json::<JwkSet>()
            .await?;
        tracing::debug!(uri = %self.uri, keys = key_set.keys.len(), "fetched key set");
        Ok(key_set)
    }
}

/// How long cached keys are trusted and how often they may be force-refreshed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshPolicy {
    pub ttl: Duration,
    pub refresh_cooldown: Duration,
}

struct CachedKeySet {
    keys: Arc<JwkSet>,
    fetched_at: Instant,
}

/// Caching key set client.
pub struct JwksClient {
    source: Arc<dyn KeySetSource>,
    policy: RefreshPolicy,
    cache: Mutex<Option<CachedKeySet>>,
}

impl JwksClient {
    /// Create a client with an empty cache. Nothing is fetched until the first
    /// lookup.
    #[must_use]
    pub fn new(source: Arc<dyn KeySetSource>, policy: RefreshPolicy) -> Self {
        Self {
            source,
            policy,
            cache: Mutex::new(None),
        }
    }

    /// The current key set, fetched if the cache is empty or expired.
    pub async fn key_set(&self) -> Result<Arc<JwkSet>, JwksError> {
        let mut cache = self.cache.lock().await;
        if let Some(cached) = cache.as_ref()
            && cached.fetched_at.elapsed() < self.policy.ttl
        {
            return Ok(Arc::clone(&cached.keys));
        }
        self.refill(&mut cache).await
    }

    /// Refetch the key set ahead of its expiry because a token named a key id
    /// the cache doesn't know.
    ///
    /// Returns `Ok(None)` when the previous fetch is more recent than the
    /// cooldown; the caller should then treat the key id as unknown.
    pub async fn refresh_for_unknown_key(&self) -> Result<Option<Arc<JwkSet>>, JwksError> {
        let mut cache = self.cache.lock().await;
        if let Some(cached) = cache.as_ref()
            && cached.fetched_at.elapsed() < self.policy.refresh_cooldown
        {
            return Ok(None);
        }
        self.refill(&mut cache).await.map(Some)
    }

    async fn refill(&self, cache: &mut Option<CachedKeySet>) -> Result<Arc<JwkSet>, JwksError> {
        let keys = Arc::new(self.source.fetch().await?);
        *cache = Some(CachedKeySet {
            keys: Arc::clone(&keys),
            fetched_at: Instant::now(),
        });
        Ok(keys)
    }
}
