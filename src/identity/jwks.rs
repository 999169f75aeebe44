//! Signing key set retrieval and caching
//!
//! Keys are fetched from a JWKS document and cached for a fixed TTL. Only
//! RSA signing keys are kept; `oct` and other key types are ignored. A key
//! id that is not in the cache triggers at most one forced refresh before
//! the lookup gives up.

use crate::error::{Result, SeoAssistantError};
use jsonwebtoken::DecodingKey;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

#[derive(Debug, Deserialize)]
struct JwksDocument {
    #[serde(default)]
    keys: Vec<Jwk>,
}

#[derive(Debug, Deserialize)]
struct Jwk {
    kty: String,
    #[serde(default)]
    kid: Option<String>,
    #[serde(default, rename = "use")]
    key_use: Option<String>,
    #[serde(default)]
    n: Option<String>,
    #[serde(default)]
    e: Option<String>,
}

type KeyMap = HashMap<String, DecodingKey>;

/// A key returned by [`KeySetCache::key`]
#[derive(Clone)]
pub struct ResolvedKey {
    /// RSA public key for signature checks
    pub key: DecodingKey,
    /// Whether this lookup already forced a refresh
    pub refreshed: bool,
}

/// TTL cache over a remote JWKS document
pub struct KeySetCache {
    client: Client,
    url: String,
    ttl: Duration,
    keys: RwLock<Option<(KeyMap, Instant)>>,
    fetches: AtomicUsize,
}

impl KeySetCache {
    /// Create a cache for the key set at `url`
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(url: impl Into<String>, ttl: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| {
                SeoAssistantError::Config(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            url: url.into(),
            ttl,
            keys: RwLock::new(None),
            fetches: AtomicUsize::new(0),
        })
    }

    /// Number of key set downloads performed so far
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Look up a key by id
    ///
    /// A stale cache is refreshed first. If the id is still missing and no
    /// refresh happened during this call, one forced refresh is attempted.
    ///
    /// # Errors
    ///
    /// Returns `SeoAssistantError::UnknownKey` if the id is absent after
    /// refreshing, or `SeoAssistantError::Unauthorized` if the key set cannot
    /// be downloaded
    pub async fn key(&self, kid: &str) -> Result<ResolvedKey> {
        let mut refreshed = false;

        let cached = {
            let guard = self.keys.read().await;
            match guard.as_ref() {
                Some((keys, fetched_at)) if fetched_at.elapsed() < self.ttl => {
                    Some(keys.get(kid).cloned())
                }
                _ => None,
            }
        };

        let found = match cached {
            Some(found) => found,
            None => {
                tracing::debug!("Key set cache stale or empty, refreshing");
                refreshed = true;
                self.refresh().await?.get(kid).cloned()
            }
        };

        if let Some(key) = found {
            return Ok(ResolvedKey { key, refreshed });
        }

        if !refreshed {
            tracing::debug!(kid = %kid, "Key id not cached, forcing key set refresh");
            if let Some(key) = self.refresh().await?.get(kid).cloned() {
                return Ok(ResolvedKey {
                    key,
                    refreshed: true,
                });
            }
        }

        tracing::warn!(kid = %kid, "Unknown key id after key set refresh");
        Err(SeoAssistantError::UnknownKey(format!("Unknown key id: {}", kid)).into())
    }

    /// Download the key set and replace the cache
    ///
    /// # Errors
    ///
    /// Returns `SeoAssistantError::Unauthorized` if the document cannot be
    /// fetched or parsed
    pub async fn refresh(&self) -> Result<KeyMap> {
        self.fetches.fetch_add(1, Ordering::SeqCst);

        let response = self.client.get(&self.url).send().await.map_err(|e| {
            tracing::error!("Key set request failed: {}", e);
            SeoAssistantError::Unauthorized(format!("Unable to fetch signing keys: {}", e))
        })?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!("Key set endpoint returned {}", status);
            return Err(SeoAssistantError::Unauthorized(format!(
                "Unable to fetch signing keys: HTTP {}",
                status
            ))
            .into());
        }

        let document: JwksDocument = response.json().await.map_err(|e| {
            SeoAssistantError::Unauthorized(format!("Invalid key set document: {}", e))
        })?;

        let keys = decode_keys(document);
        tracing::info!(count = keys.len(), "Refreshed signing key set");

        let mut guard = self.keys.write().await;
        *guard = Some((keys.clone(), Instant::now()));
        Ok(keys)
    }
}

fn decode_keys(document: JwksDocument) -> KeyMap {
    let mut keys = HashMap::new();
    for jwk in document.keys {
        if jwk.kty != "RSA" {
            tracing::debug!(kty = %jwk.kty, "Skipping unsupported key type");
            continue;
        }
        if jwk.key_use.as_deref().is_some_and(|u| u != "sig") {
            tracing::debug!("Skipping key not meant for signatures");
            continue;
        }
        let (Some(kid), Some(n), Some(e)) = (jwk.kid, jwk.n, jwk.e) else {
            tracing::debug!("Skipping key without kid or material");
            continue;
        };
        match DecodingKey::from_rsa_components(&n, &e) {
            Ok(key) => {
                keys.insert(kid, key);
            }
            Err(e) => tracing::warn!(kid = %kid, "Skipping unusable RSA key: {}", e),
        }
    }
    keys
}
