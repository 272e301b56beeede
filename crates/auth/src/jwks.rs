//! Signing-key set retrieval and caching.
//!
//! `JwksCache` is process-scoped state: built once at startup, shared by every
//! request, refreshed when its TTL lapses or an unknown key id shows up. It is
//! never invalidated early. Refreshes are throttled so a flood of tokens with
//! bogus key ids cannot turn into a flood of requests to the identity provider.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use jsonwebtoken::jwk::{Jwk, JwkSet};
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};

/// Default key-set lifetime before a refresh is attempted.
pub const DEFAULT_KEY_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Default cap on key-set fetches per rolling minute.
pub const DEFAULT_FETCHES_PER_MINUTE: usize = 10;

/// Upper bound on a single key-set fetch. Refreshes are serialized, so a hung
/// fetch would otherwise stall every caller queued behind it.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

const RATE_WINDOW: Duration = Duration::from_secs(60);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KeySetError {
    #[error("failed to fetch signing keys: {0}")]
    Fetch(String),

    #[error("no signing key found for kid '{0}'")]
    KeyNotFound(String),

    #[error("signing key refresh rate limit exceeded")]
    RateLimited,
}

/// Where signing keys come from.
#[async_trait]
pub trait KeySource: Send + Sync {
    async fn fetch(&self) -> Result<JwkSet, KeySetError>;
}

/// Fetches a JWKS document over HTTPS.
#[derive(Debug, Clone)]
pub struct HttpKeySource {
    client: reqwest::Client,
    uri: String,
}

impl HttpKeySource {
    pub fn new(uri: impl Into<String>) -> Result<Self, KeySetError> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(DEFAULT_FETCH_TIMEOUT)
            .build()
            .map_err(|e| KeySetError::Fetch(format!("failed to build http client: {e}")))?;
        Ok(Self {
            client,
            uri: uri.into(),
        })
    }
}

#[async_trait]
impl KeySource for HttpKeySource {
    async fn fetch(&self) -> Result<JwkSet, KeySetError> {
        tracing::debug!(uri = %self.uri, "fetching signing keys");
        let res = self
            .client
            .get(&self.uri)
            .send()
            .await
            .map_err(|e| KeySetError::Fetch(e.to_string()))?
            .error_for_status()
            .map_err(|e| KeySetError::Fetch(e.to_string()))?;

        res.json::<JwkSet>()
            .await
            .map_err(|e| KeySetError::Fetch(format!("invalid key set document: {e}")))
    }
}

/// Fixed key set (tests, offline deployments).
#[derive(Debug, Clone)]
pub struct StaticKeySource {
    keys: JwkSet,
}

impl StaticKeySource {
    pub fn new(keys: JwkSet) -> Self {
        Self { keys }
    }

    pub fn from_json(json: &str) -> Result<Self, KeySetError> {
        let keys: JwkSet =
            serde_json::from_str(json).map_err(|e| KeySetError::Fetch(e.to_string()))?;
        Ok(Self::new(keys))
    }
}

#[async_trait]
impl KeySource for StaticKeySource {
    async fn fetch(&self) -> Result<JwkSet, KeySetError> {
        Ok(self.keys.clone())
    }
}

#[derive(Default)]
struct Cached {
    keys: Option<JwkSet>,
    fetched_at: Option<Instant>,
}

impl Cached {
    fn is_fresh(&self, ttl: Duration) -> bool {
        self.fetched_at.is_some_and(|t| t.elapsed() < ttl)
    }

    fn find(&self, kid: &str) -> Option<Jwk> {
        self.keys.as_ref()?.find(kid).cloned()
    }
}

/// TTL cache over a `KeySource` with a rolling-window refresh limit.
pub struct JwksCache {
    source: Arc<dyn KeySource>,
    ttl: Duration,
    max_fetches_per_minute: usize,
    fetch_timeout: Duration,
    cached: RwLock<Cached>,
    // Serializes refreshes and records when each fetch happened.
    fetch_log: Mutex<VecDeque<Instant>>,
}

impl JwksCache {
    pub fn new(source: Arc<dyn KeySource>) -> Self {
        Self::with_policy(source, DEFAULT_KEY_TTL, DEFAULT_FETCHES_PER_MINUTE)
    }

    pub fn with_policy(source: Arc<dyn KeySource>, ttl: Duration, max_fetches_per_minute: usize) -> Self {
        Self {
            source,
            ttl,
            max_fetches_per_minute,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            cached: RwLock::new(Cached::default()),
            fetch_log: Mutex::new(VecDeque::new()),
        }
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Resolve the signing key for `kid`, refreshing the set if needed.
    pub async fn get_key(&self, kid: &str) -> Result<Jwk, KeySetError> {
        {
            let cached = self.cached.read().await;
            if cached.is_fresh(self.ttl) {
                if let Some(key) = cached.find(kid) {
                    return Ok(key);
                }
            }
        }

        let mut log = self.fetch_log.lock().await;

        // Another task may have refreshed while we waited for the lock.
        {
            let cached = self.cached.read().await;
            if cached.is_fresh(self.ttl) {
                if let Some(key) = cached.find(kid) {
                    return Ok(key);
                }
            }
        }

        let now = Instant::now();
        while log.front().is_some_and(|t| now.duration_since(*t) >= RATE_WINDOW) {
            log.pop_front();
        }

        if log.len() >= self.max_fetches_per_minute {
            tracing::warn!(kid, "signing key refresh throttled");
            return self.stale_or(kid, KeySetError::RateLimited).await;
        }

        log.push_back(now);
        let fetched = tokio::time::timeout(self.fetch_timeout, self.source.fetch())
            .await
            .unwrap_or_else(|_| {
                Err(KeySetError::Fetch(format!(
                    "key set fetch timed out after {:?}",
                    self.fetch_timeout
                )))
            });
        match fetched {
            Ok(keys) => {
                let key = keys.find(kid).cloned();
                let mut cached = self.cached.write().await;
                cached.keys = Some(keys);
                cached.fetched_at = Some(Instant::now());
                key.ok_or_else(|| KeySetError::KeyNotFound(kid.to_string()))
            }
            Err(e) => {
                tracing::warn!(kid, error = %e, "signing key refresh failed");
                self.stale_or(kid, e).await
            }
        }
    }

    /// Number of fetches recorded in the current rate window.
    pub async fn recent_fetches(&self) -> usize {
        self.fetch_log.lock().await.len()
    }

    async fn stale_or(&self, kid: &str, err: KeySetError) -> Result<Jwk, KeySetError> {
        self.cached.read().await.find(kid).ok_or(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    const JWKS: &str = include_str!("../tests/fixtures/signing_key.jwks.json");

    struct CountingSource {
        inner: StaticKeySource,
        calls: AtomicUsize,
        fail_after: Option<usize>,
    }

    impl CountingSource {
        fn new() -> Self {
            Self {
                inner: StaticKeySource::from_json(JWKS).unwrap(),
                calls: AtomicUsize::new(0),
                fail_after: None,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl KeySource for CountingSource {
        async fn fetch(&self) -> Result<JwkSet, KeySetError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_after.is_some_and(|limit| n >= limit) {
                return Err(KeySetError::Fetch("connection refused".to_string()));
            }
            self.inner.fetch().await
        }
    }

    #[tokio::test]
    async fn fresh_cache_serves_known_kid_without_refetch() {
        let source = Arc::new(CountingSource::new());
        let cache = JwksCache::new(source.clone());

        for _ in 0..5 {
            cache.get_key("test-key-1").await.unwrap();
        }
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn unknown_kid_refresh_is_rate_limited() {
        let source = Arc::new(CountingSource::new());
        let cache = JwksCache::new(source.clone());

        let mut errors = Vec::new();
        for _ in 0..15 {
            errors.push(cache.get_key("rotated-away").await.unwrap_err());
        }

        assert_eq!(source.calls(), DEFAULT_FETCHES_PER_MINUTE);
        assert_eq!(cache.recent_fetches().await, DEFAULT_FETCHES_PER_MINUTE);
        assert_eq!(errors[0], KeySetError::KeyNotFound("rotated-away".to_string()));
        assert_eq!(errors[14], KeySetError::RateLimited);
    }

    #[tokio::test]
    async fn throttled_lookup_still_serves_cached_keys() {
        let source = Arc::new(CountingSource::new());
        let cache = JwksCache::with_policy(source.clone(), Duration::ZERO, 1);

        cache.get_key("test-key-1").await.unwrap();
        // TTL zero makes the set stale immediately; the limit blocks a refetch.
        cache.get_key("test-key-1").await.unwrap();
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn expired_ttl_triggers_refetch() {
        let source = Arc::new(CountingSource::new());
        let cache = JwksCache::with_policy(source.clone(), Duration::ZERO, 10);

        cache.get_key("test-key-1").await.unwrap();
        cache.get_key("test-key-1").await.unwrap();
        assert_eq!(source.calls(), 2);
    }

    struct HangingSource;

    #[async_trait]
    impl KeySource for HangingSource {
        async fn fetch(&self) -> Result<JwkSet, KeySetError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(JwkSet { keys: Vec::new() })
        }
    }

    #[tokio::test]
    async fn hung_fetch_times_out_and_releases_waiters() {
        let cache = Arc::new(
            JwksCache::new(Arc::new(HangingSource)).with_fetch_timeout(Duration::from_millis(50)),
        );

        let first = tokio::spawn({
            let cache = cache.clone();
            async move { cache.get_key("k").await }
        });
        let second = tokio::time::timeout(Duration::from_secs(5), cache.get_key("k"))
            .await
            .expect("second caller stayed blocked behind the hung fetch");

        assert!(matches!(second, Err(KeySetError::Fetch(_))));
        let first = tokio::time::timeout(Duration::from_secs(5), first)
            .await
            .expect("first caller never returned")
            .unwrap();
        assert!(matches!(first, Err(KeySetError::Fetch(_))));
    }

    #[test]
    fn http_source_builds_with_bounded_client() {
        assert!(HttpKeySource::new("https://login.example.test/keys").is_ok());
    }

    #[tokio::test]
    async fn failed_refresh_falls_back_to_stale_keys() {
        let source = Arc::new(CountingSource {
            fail_after: Some(1),
            ..CountingSource::new()
        });
        let cache = JwksCache::with_policy(source.clone(), Duration::ZERO, 10);

        cache.get_key("test-key-1").await.unwrap();
        cache.get_key("test-key-1").await.unwrap();
        assert_eq!(source.calls(), 2);

        let err = cache.get_key("unknown").await.unwrap_err();
        assert!(matches!(err, KeySetError::Fetch(_)));
    }
}
