//! JWKS client for fetching and caching the identity provider's signing keys.
//!
//! Keys are fetched from the tenant's `discovery/v2.0/keys` endpoint and held
//! as an immutable snapshot behind a read-write lock. A lookup miss triggers
//! at most one refetch at a time (single-flight), and refetches on miss are
//! rate-limited by a minimum refresh interval so unknown key IDs cannot be
//! used to hammer the identity provider.
//!
//! # Security
//!
//! - Snapshots are replaced whole; readers never observe a partial key set
//! - A failed fetch leaves the previous snapshot in place
//! - HTTPS should be used in production (enforced by deployment config)

use crate::config::{DEFAULT_JWKS_CACHE_TTL_SECONDS, DEFAULT_JWKS_MIN_REFRESH_SECONDS};
use crate::errors::AuthError;
use crate::observability::metrics::record_jwks_refresh;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::instrument;

/// Timeout for one JWKS fetch.
const JWKS_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// JSON Web Key from the JWKS endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Jwk {
    /// Key type ("RSA" for Entra ID signing keys).
    pub kty: String,

    /// Key ID - used to select the correct key for verification.
    #[serde(default)]
    pub kid: String,

    /// RSA modulus (base64url encoded).
    #[serde(default)]
    pub n: Option<String>,

    /// RSA public exponent (base64url encoded).
    #[serde(default)]
    pub e: Option<String>,

    /// Algorithm, when the key set pins one.
    #[serde(default)]
    pub alg: Option<String>,

    /// Key use (should be "sig" for signing).
    #[serde(default, rename = "use")]
    pub key_use: Option<String>,
}

/// JWKS document.
#[derive(Debug, Clone, Deserialize)]
pub struct JwksResponse {
    /// List of JSON Web Keys.
    pub keys: Vec<Jwk>,
}

/// Why a signing key could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JwksError {
    #[error("JWKS endpoint unreachable")]
    Unreachable,

    #[error("JWKS endpoint returned status {0}")]
    UnexpectedStatus(u16),

    #[error("JWKS document is malformed")]
    MalformedDocument,

    #[error("Key ID not present in JWKS")]
    UnknownKeyId,
}

impl JwksError {
    fn as_str(&self) -> &'static str {
        match self {
            JwksError::Unreachable => "unreachable",
            JwksError::UnexpectedStatus(_) => "unexpected_status",
            JwksError::MalformedDocument => "malformed_document",
            JwksError::UnknownKeyId => "unknown_key_id",
        }
    }
}

impl From<JwksError> for AuthError {
    fn from(_: JwksError) -> Self {
        AuthError::KeyLookupFailure
    }
}

/// Cached JWKS snapshot.
struct CachedJwks {
    /// Map of key ID to JWK.
    keys: HashMap<String, Jwk>,

    /// When this snapshot was fetched.
    fetched_at: Instant,

    /// When this snapshot stops being fresh.
    expires_at: Instant,
}

impl CachedJwks {
    fn fresh_key(&self, kid: &str, now: Instant) -> Option<&Jwk> {
        if self.expires_at > now {
            self.keys.get(kid)
        } else {
            None
        }
    }
}

/// JWKS client for fetching and caching public keys.
///
/// Safe to share across requests behind an `Arc`.
pub struct JwksClient {
    /// URL to the JWKS endpoint.
    jwks_url: String,

    /// HTTP client for fetching JWKS.
    http_client: reqwest::Client,

    /// Current key set snapshot.
    cache: Arc<RwLock<Option<CachedJwks>>>,

    /// Held for the duration of a fetch so concurrent misses share one request.
    refresh_lock: Mutex<()>,

    /// How long a snapshot stays fresh.
    cache_ttl: Duration,

    /// Minimum age of a fresh snapshot before a miss may refetch it.
    min_refresh_interval: Duration,
}

impl JwksClient {
    /// Create a new JWKS client with default cache settings.
    pub fn new(jwks_url: String) -> Self {
        Self::with_settings(
            jwks_url,
            Duration::from_secs(DEFAULT_JWKS_CACHE_TTL_SECONDS),
            Duration::from_secs(DEFAULT_JWKS_MIN_REFRESH_SECONDS),
        )
    }

    /// Create a new JWKS client with custom cache settings.
    ///
    /// # Arguments
    ///
    /// * `jwks_url` - URL of the JWKS endpoint
    /// * `cache_ttl` - How long to cache JWKS before refreshing
    /// * `min_refresh_interval` - Floor between refetches caused by unknown key IDs
    pub fn with_settings(
        jwks_url: String,
        cache_ttl: Duration,
        min_refresh_interval: Duration,
    ) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(JWKS_FETCH_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(target: "gateway.auth.jwks", error = %e, "Failed to build HTTP client with custom config, using defaults");
                reqwest::Client::new()
            });

        Self {
            jwks_url,
            http_client,
            cache: Arc::new(RwLock::new(None)),
            refresh_lock: Mutex::new(()),
            cache_ttl,
            min_refresh_interval,
        }
    }

    /// Get a JWK by key ID.
    ///
    /// Serves from a fresh snapshot when it holds `kid`; otherwise refetches
    /// the key set (at most one fetch in flight) and looks again.
    ///
    /// # Errors
    ///
    /// - `Unreachable`, `UnexpectedStatus`, `MalformedDocument` when a needed fetch fails
    /// - `UnknownKeyId` when the key set does not contain `kid`
    #[instrument(skip(self), fields(kid = %kid))]
    pub async fn get_key(&self, kid: &str) -> Result<Jwk, JwksError> {
        // Fast path: read lock only
        {
            let cache = self.cache.read().await;
            if let Some(key) = cache
                .as_ref()
                .and_then(|cached| cached.fresh_key(kid, Instant::now()))
            {
                tracing::debug!(target: "gateway.auth.jwks", "JWKS cache hit");
                return Ok(key.clone());
            }
        }

        let _refresh_guard = self.refresh_lock.lock().await;

        // Another request may have refreshed while we waited for the lock
        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref() {
                let now = Instant::now();
                if let Some(key) = cached.fresh_key(kid, now) {
                    tracing::debug!(target: "gateway.auth.jwks", "JWKS cache hit after refresh wait");
                    return Ok(key.clone());
                }
                if cached.expires_at > now
                    && now.duration_since(cached.fetched_at) < self.min_refresh_interval
                {
                    tracing::debug!(
                        target: "gateway.auth.jwks",
                        "Key not found in recently fetched JWKS, skipping refetch"
                    );
                    return Err(JwksError::UnknownKeyId);
                }
            }
        }

        self.refresh_cache().await?;

        let cache = self.cache.read().await;
        if let Some(key) = cache.as_ref().and_then(|cached| cached.keys.get(kid)) {
            return Ok(key.clone());
        }

        tracing::warn!(target: "gateway.auth.jwks", "Key not found in JWKS after refresh");
        Err(JwksError::UnknownKeyId)
    }

    /// Fetch the key set and replace the snapshot.
    ///
    /// Callers must hold `refresh_lock`.
    async fn refresh_cache(&self) -> Result<(), JwksError> {
        let result = self.fetch_jwks().await;
        record_jwks_refresh(match &result {
            Ok(_) => "success",
            Err(e) => e.as_str(),
        });
        let jwks = result?;

        // Keys without a usable kid cannot be selected and are dropped
        let keys: HashMap<String, Jwk> = jwks
            .keys
            .into_iter()
            .filter(|key| !key.kid.is_empty())
            .map(|key| (key.kid.clone(), key))
            .collect();

        tracing::info!(
            target: "gateway.auth.jwks",
            key_count = keys.len(),
            "JWKS cache refreshed"
        );

        let now = Instant::now();
        let mut cache = self.cache.write().await;
        *cache = Some(CachedJwks {
            keys,
            fetched_at: now,
            expires_at: now + self.cache_ttl,
        });

        Ok(())
    }

    async fn fetch_jwks(&self) -> Result<JwksResponse, JwksError> {
        tracing::debug!(target: "gateway.auth.jwks", url = %self.jwks_url, "Fetching JWKS");

        let response = self
            .http_client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(target: "gateway.auth.jwks", error = %e, "Failed to fetch JWKS");
                JwksError::Unreachable
            })?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!(
                target: "gateway.auth.jwks",
                status = %status,
                "JWKS endpoint returned error"
            );
            return Err(JwksError::UnexpectedStatus(status.as_u16()));
        }

        response.json::<JwksResponse>().await.map_err(|e| {
            tracing::error!(target: "gateway.auth.jwks", error = %e, "Failed to parse JWKS response");
            JwksError::MalformedDocument
        })
    }

    /// Refetch the key set regardless of freshness.
    ///
    /// Used by the readiness check.
    #[instrument(skip_all)]
    pub async fn force_refresh(&self) -> Result<(), JwksError> {
        let _refresh_guard = self.refresh_lock.lock().await;
        self.refresh_cache().await
    }

    /// Number of keys in the current snapshot, fresh or not.
    pub async fn cached_key_count(&self) -> usize {
        self.cache
            .read()
            .await
            .as_ref()
            .map_or(0, |cached| cached.keys.len())
    }
}
