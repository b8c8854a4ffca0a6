//! Signing key cache with single-flight fetching
//!
//! Public keys are looked up by key-id. A live entry is returned without
//! network access; a miss fetches the key-distribution endpoint. Concurrent
//! misses for the same key-id share one fetch and observe one outcome.
//!
//! Entries expire passively after the TTL and the cache never holds more than
//! the configured number of keys. An entry is only inserted once its fetch
//! has completed, so eviction can never remove a key a waiter still needs.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::DecodingKey;
use moka::future::Cache;
use serde::Deserialize;
use tracing::instrument;

use crate::config::AuthConfig;
use crate::error::KeyFetchError;
use crate::metrics;

/// Configuration for the signing key cache.
#[derive(Debug, Clone)]
pub struct KeyCacheConfig {
    /// Key-distribution endpoint
    pub public_keys_url: String,
    /// How long a fetched key is served from cache.
    /// Default: 10 minutes
    pub ttl: Duration,
    /// Maximum number of cached keys.
    /// Default: 5
    pub max_entries: u64,
    /// Timeout for a single fetch.
    /// Default: 10 seconds
    pub request_timeout: Duration,
}

impl KeyCacheConfig {
    /// Create a config for an endpoint with default bounds.
    #[must_use]
    pub fn new(public_keys_url: impl Into<String>) -> Self {
        Self {
            public_keys_url: public_keys_url.into(),
            ttl: Duration::from_secs(10 * 60),
            max_entries: 5,
            request_timeout: Duration::from_secs(10),
        }
    }

    /// Set the entry TTL.
    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Set the maximum number of entries.
    #[must_use]
    pub fn with_max_entries(mut self, max_entries: u64) -> Self {
        self.max_entries = max_entries;
        self
    }

    /// Set the fetch timeout.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

impl From<&AuthConfig> for KeyCacheConfig {
    fn from(config: &AuthConfig) -> Self {
        Self::new(config.public_keys_url.clone())
            .with_ttl(config.key_cache_ttl)
            .with_max_entries(config.key_cache_capacity)
            .with_request_timeout(config.request_timeout)
    }
}

/// A public signing key and when it was fetched
#[derive(Clone)]
pub struct SigningKey {
    kid: String,
    key: DecodingKey,
    fetched_at: DateTime<Utc>,
}

impl SigningKey {
    pub fn new(kid: impl Into<String>, key: DecodingKey) -> Self {
        Self {
            kid: kid.into(),
            key,
            fetched_at: Utc::now(),
        }
    }

    pub fn kid(&self) -> &str {
        &self.kid
    }

    /// Key material for signature verification
    pub fn decoding_key(&self) -> &DecodingKey {
        &self.key
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKey")
            .field("kid", &self.kid)
            .field("fetched_at", &self.fetched_at)
            .finish_non_exhaustive()
    }
}

/// Key-distribution response: key-id to public key, as a JWK set or a flat
/// map of PEM-encoded keys.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PublicKeySet {
    Jwks(JwkSet),
    Pem(HashMap<String, String>),
}

impl PublicKeySet {
    fn key_ids(&self) -> Vec<String> {
        match self {
            Self::Jwks(set) => set
                .keys
                .iter()
                .filter_map(|jwk| jwk.common.key_id.clone())
                .collect(),
            Self::Pem(map) => map.keys().cloned().collect(),
        }
    }

    fn decoding_key(&self, kid: &str) -> Result<DecodingKey, KeyFetchError> {
        let invalid = |reason: String| KeyFetchError::InvalidKey {
            kid: kid.to_string(),
            reason,
        };

        match self {
            Self::Jwks(set) => {
                let jwk = set
                    .find(kid)
                    .ok_or_else(|| KeyFetchError::KeyNotFound(kid.to_string()))?;
                DecodingKey::from_jwk(jwk).map_err(|e| invalid(e.to_string()))
            }
            Self::Pem(map) => {
                let pem = map
                    .get(kid)
                    .ok_or_else(|| KeyFetchError::KeyNotFound(kid.to_string()))?;
                DecodingKey::from_rsa_pem(pem.as_bytes()).map_err(|e| invalid(e.to_string()))
            }
        }
    }
}

/// Process-wide cache of public signing keys.
///
/// Cheap to clone; clones share the same entries and in-flight fetches.
#[derive(Clone)]
pub struct SigningKeyCache {
    config: KeyCacheConfig,
    http_client: reqwest::Client,
    keys: Cache<String, Arc<SigningKey>>,
}

impl SigningKeyCache {
    /// Create a new cache with its own HTTP client
    pub fn new(config: KeyCacheConfig) -> Self {
        let http_client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(config.request_timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(2)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self::with_client(config, http_client)
    }

    /// Create a cache with a custom HTTP client
    ///
    /// Use this to share a client or set proxy and TLS options.
    pub fn with_client(config: KeyCacheConfig, http_client: reqwest::Client) -> Self {
        let keys = Cache::builder()
            .time_to_live(config.ttl)
            .max_capacity(config.max_entries)
            .build();

        Self {
            config,
            http_client,
            keys,
        }
    }

    /// Get the public key for a key-id.
    ///
    /// Served from cache while the entry is live. Otherwise joins the pending
    /// fetch for this key-id, or starts one.
    #[instrument(skip(self), level = "debug")]
    pub async fn get_key(&self, kid: &str) -> Result<Arc<SigningKey>, KeyFetchError> {
        if let Some(key) = self.keys.get(kid).await {
            tracing::trace!("signing key cache hit");
            metrics::record_key_cache_hit();
            return Ok(key);
        }

        metrics::record_key_cache_miss();

        // One init future runs per key-id; every other caller waits on it.
        // Errors are handed to all waiters and are not cached.
        self.keys
            .try_get_with(kid.to_string(), self.fetch_key(kid))
            .await
            .map_err(|e| (*e).clone())
    }

    /// Fetch the endpoint and extract one key
    async fn fetch_key(&self, kid: &str) -> Result<Arc<SigningKey>, KeyFetchError> {
        let result = self.fetch_public_keys().await.and_then(|set| {
            set.decoding_key(kid).map_err(|e| {
                if matches!(e, KeyFetchError::KeyNotFound(_)) {
                    tracing::debug!(
                        "Key {} not in key-distribution response (known: {:?})",
                        kid,
                        set.key_ids()
                    );
                }
                e
            })
        });

        match result {
            Ok(key) => {
                metrics::record_key_fetch("ok");
                tracing::debug!("Fetched signing key {}", kid);
                Ok(Arc::new(SigningKey::new(kid, key)))
            }
            Err(e) => {
                metrics::record_key_fetch("error");
                Err(e)
            }
        }
    }

    async fn fetch_public_keys(&self) -> Result<PublicKeySet, KeyFetchError> {
        let url = &self.config.public_keys_url;
        tracing::debug!("Fetching public keys from {}", url);

        let response = self.http_client.get(url).send().await.map_err(|e| {
            tracing::error!("Failed to fetch public keys: {}", e);
            KeyFetchError::Network(e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!("Public key fetch returned status: {}", status);
            return Err(KeyFetchError::HttpStatus(status.as_u16()));
        }

        let body = response.text().await.map_err(|e| {
            tracing::error!("Failed to read public keys response: {}", e);
            KeyFetchError::Network(e.to_string())
        })?;

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!("Failed to parse public keys: {}", e);
            KeyFetchError::Parse(e.to_string())
        })
    }

    /// Whether a live entry exists for a key-id (no fetch)
    pub fn contains(&self, kid: &str) -> bool {
        self.keys.contains_key(kid)
    }

    /// Drop one key, forcing a fetch on next lookup
    pub async fn invalidate(&self, kid: &str) {
        self.keys.invalidate(kid).await;
    }

    /// Drop every key (e.g. after a known rotation)
    pub fn invalidate_all(&self) {
        self.keys.invalidate_all();
    }

    /// Approximate number of cached keys
    pub fn entry_count(&self) -> u64 {
        self.keys.entry_count()
    }

    /// Apply pending evictions and expirations now
    pub async fn run_pending_tasks(&self) {
        self.keys.run_pending_tasks().await;
    }

    pub fn config(&self) -> &KeyCacheConfig {
        &self.config
    }
}

impl std::fmt::Debug for SigningKeyCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKeyCache")
            .field("config", &self.config)
            .field("entries", &self.keys.entry_count())
            .finish_non_exhaustive()
    }
}
