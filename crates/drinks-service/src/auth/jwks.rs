//! JWKS client for fetching and caching the identity provider's public keys.
//!
//! Keys come from the provider's `/.well-known/jwks.json` endpoint and are
//! cached for a configurable TTL. The cache is owned by the client instance
//! and shared by handing an `Arc<JwksClient>` to the verifier.
//!
//! # Concurrency
//!
//! - Readers take a shared lock and clone the key they need.
//! - A refresh fetches without holding the lock and replaces the whole entry
//!   on success, so readers see either the old or the new set, never a mix.
//! - A failed refresh leaves the previous entry in place.

use crate::errors::AuthError;
use crate::observability::metrics::record_jwks_refresh;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::instrument;

/// JSON Web Key from the JWKS endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwk {
    /// Key type ("RSA" for usable keys).
    pub kty: String,

    /// Key ID - used to select the correct key for verification.
    pub kid: String,

    /// Key use ("sig" for signing keys).
    #[serde(default, rename = "use", skip_serializing_if = "Option::is_none")]
    pub key_use: Option<String>,

    /// RSA modulus (base64url).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,

    /// RSA public exponent (base64url).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub e: Option<String>,

    /// Algorithm the key is intended for, if published.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,
}

/// JWKS response body.
///
/// Entries are kept as raw JSON so that one key this service cannot use
/// (no `kid`, an encryption key) does not invalidate the whole set.
#[derive(Debug, Clone, Deserialize)]
pub struct JwksResponse {
    /// Keys in the order the provider published them.
    pub keys: Vec<serde_json::Value>,
}

impl JwksResponse {
    /// Entries that parse as a [`Jwk`], in published order.
    pub fn into_jwks(self) -> Vec<Jwk> {
        self.keys
            .into_iter()
            .filter_map(|entry| match serde_json::from_value::<Jwk>(entry) {
                Ok(jwk) => Some(jwk),
                Err(e) => {
                    tracing::debug!(target: "drinks.auth.jwks", error = %e, "Skipping JWKS entry without a usable kid");
                    None
                }
            })
            .collect()
    }
}

/// Cached key set with expiry time.
struct CachedJwks {
    keys: HashMap<String, Jwk>,
    expires_at: Instant,
}

/// JWKS client for fetching and caching public keys.
pub struct JwksClient {
    /// URL to the JWKS endpoint.
    jwks_url: String,

    /// HTTP client with a bounded request timeout.
    http_client: reqwest::Client,

    /// Cached key set.
    cache: RwLock<Option<CachedJwks>>,

    /// Cache TTL duration. Zero disables caching.
    cache_ttl: Duration,
}

impl JwksClient {
    /// Create a new JWKS client.
    ///
    /// # Arguments
    ///
    /// * `jwks_url` - URL of the provider's JWKS endpoint
    /// * `fetch_timeout` - Upper bound on a single fetch, connect included
    /// * `cache_ttl` - How long a fetched key set is served without refetching
    pub fn new(jwks_url: String, fetch_timeout: Duration, cache_ttl: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(fetch_timeout)
            .connect_timeout(fetch_timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(target: "drinks.auth.jwks", error = %e, "Failed to build HTTP client with custom config, using defaults");
                reqwest::Client::new()
            });

        Self {
            jwks_url,
            http_client,
            cache: RwLock::new(None),
            cache_ttl,
        }
    }

    /// URL this client fetches from.
    pub fn jwks_url(&self) -> &str {
        &self.jwks_url
    }

    /// Get a JWK by key ID.
    ///
    /// Serves from cache while fresh. A fresh cache that does not contain
    /// `kid` is treated as stale (the provider may have rotated keys) and is
    /// refreshed once before giving up.
    ///
    /// # Errors
    ///
    /// - `KeySetUnavailable` if a required fetch fails.
    /// - `UnknownKey` if no key with this ID is published.
    #[instrument(skip(self), fields(kid = %kid))]
    pub async fn get_key(&self, kid: &str) -> Result<Jwk, AuthError> {
        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.expires_at > Instant::now() {
                    if let Some(key) = cached.keys.get(kid) {
                        tracing::debug!(target: "drinks.auth.jwks", "JWKS cache hit");
                        return Ok(key.clone());
                    }
                    tracing::debug!(target: "drinks.auth.jwks", "Key not in cached JWKS, refreshing");
                }
            }
        }

        self.refresh().await?;

        let cache = self.cache.read().await;
        if let Some(key) = cache.as_ref().and_then(|cached| cached.keys.get(kid)) {
            return Ok(key.clone());
        }

        tracing::warn!(target: "drinks.auth.jwks", "Key not found in JWKS after refresh");
        Err(AuthError::UnknownKey)
    }

    /// Fetch the key set from the provider without touching the cache.
    ///
    /// # Errors
    ///
    /// Returns `KeySetUnavailable` on transport failure, timeout, non-2xx
    /// status, or a body that is not a JWKS document.
    #[instrument(skip(self))]
    pub async fn fetch_keys(&self) -> Result<Vec<Jwk>, AuthError> {
        tracing::debug!(target: "drinks.auth.jwks", url = %self.jwks_url, "Fetching JWKS");

        let response = self
            .http_client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(target: "drinks.auth.jwks", error = %e, timeout = e.is_timeout(), "Failed to fetch JWKS");
                AuthError::KeySetUnavailable
            })?;

        if !response.status().is_success() {
            tracing::error!(
                target: "drinks.auth.jwks",
                status = %response.status(),
                "JWKS endpoint returned error"
            );
            return Err(AuthError::KeySetUnavailable);
        }

        let jwks: JwksResponse = response.json().await.map_err(|e| {
            tracing::error!(target: "drinks.auth.jwks", error = %e, "Failed to parse JWKS response");
            AuthError::KeySetUnavailable
        })?;

        Ok(jwks.into_jwks())
    }

    /// Fetch the key set and replace the cache with it.
    ///
    /// On failure the previous cache entry, if any, is left untouched.
    pub async fn refresh(&self) -> Result<(), AuthError> {
        let start = Instant::now();
        match self.fetch_keys().await {
            Ok(keys) => {
                record_jwks_refresh("success", start.elapsed());
                self.replace_keys(keys).await;
                Ok(())
            }
            Err(e) => {
                record_jwks_refresh("error", start.elapsed());
                Err(e)
            }
        }
    }

    /// Install `keys` as the current key set.
    ///
    /// Later entries win when two keys share an ID.
    pub async fn replace_keys(&self, keys: Vec<Jwk>) {
        let keys: HashMap<String, Jwk> = keys
            .into_iter()
            .map(|key| (key.kid.clone(), key))
            .collect();

        tracing::info!(
            target: "drinks.auth.jwks",
            key_count = keys.len(),
            "JWKS cache refreshed"
        );

        let mut cache = self.cache.write().await;
        *cache = Some(CachedJwks {
            keys,
            expires_at: Instant::now() + self.cache_ttl,
        });
    }

    /// Drop the cached key set. The next lookup fetches.
    pub async fn invalidate(&self) {
        let mut cache = self.cache.write().await;
        *cache = None;
    }
}
