//! JWKS (JSON Web Key Set) caching

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use jsonwebtoken::{Algorithm, DecodingKey};
use serde::Deserialize;
use tracing::debug;

use crate::error::{BrokerError, Result};

/// JWKS document
#[derive(Debug, Clone, Deserialize)]
pub struct Jwks {
    pub keys: Vec<JwkKey>,
}

/// Individual JWK key
#[derive(Debug, Clone, Deserialize)]
pub struct JwkKey {
    pub kty: String,
    pub kid: Option<String>,
    pub alg: Option<String>,
    #[serde(rename = "use")]
    pub key_use: Option<String>,
    pub n: Option<String>,
    pub e: Option<String>,
    pub x: Option<String>,
    pub y: Option<String>,
    pub crv: Option<String>,
}

impl JwkKey {
    fn to_decoding_key(&self) -> Option<DecodingKey> {
        match self.kty.as_str() {
            "RSA" => {
                let (n, e) = (self.n.as_ref()?, self.e.as_ref()?);
                DecodingKey::from_rsa_components(n, e).ok()
            }
            "EC" => {
                self.family()?;
                let (x, y) = (self.x.as_ref()?, self.y.as_ref()?);
                DecodingKey::from_ec_components(x, y).ok()
            }
            _ => None,
        }
    }

    /// Algorithms the key material can verify; an EC curve pins exactly one
    fn family(&self) -> Option<KeyFamily> {
        match (self.kty.as_str(), self.crv.as_deref()) {
            ("RSA", _) => Some(KeyFamily::Rsa),
            ("EC", Some("P-256")) => Some(KeyFamily::Ec(Algorithm::ES256)),
            ("EC", Some("P-384")) => Some(KeyFamily::Ec(Algorithm::ES384)),
            _ => None,
        }
    }

    fn is_signing_key(&self) -> bool {
        self.key_use.as_deref().map_or(true, |u| u == "sig")
    }

    fn to_cached_key(&self) -> Option<CachedKey> {
        if !self.is_signing_key() {
            return None;
        }
        // A key pinned to an algorithm we cannot name is never usable
        let alg = match self.alg.as_deref() {
            Some(name) => Some(name.parse::<Algorithm>().ok()?),
            None => None,
        };
        Some(CachedKey {
            kid: self.kid.clone(),
            alg,
            family: self.family()?,
            key: self.to_decoding_key()?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyFamily {
    Rsa,
    Ec(Algorithm),
}

struct CachedKey {
    kid: Option<String>,
    alg: Option<Algorithm>,
    family: KeyFamily,
    key: DecodingKey,
}

impl CachedKey {
    fn accepts(&self, alg: Algorithm) -> bool {
        if self.alg.is_some_and(|key_alg| key_alg != alg) {
            return false;
        }
        match self.family {
            KeyFamily::Rsa => matches!(
                alg,
                Algorithm::RS256
                    | Algorithm::RS384
                    | Algorithm::RS512
                    | Algorithm::PS256
                    | Algorithm::PS384
                    | Algorithm::PS512
            ),
            KeyFamily::Ec(curve_alg) => alg == curve_alg,
        }
    }
}

struct CachedKeySet {
    keys: Vec<CachedKey>,
    fetched_at: Instant,
}

impl CachedKeySet {
    fn find(&self, kid: Option<&str>, alg: Algorithm) -> Option<DecodingKey> {
        self.keys
            .iter()
            .filter(|k| kid.map_or(true, |kid| k.kid.as_deref() == Some(kid)))
            .find(|k| k.accepts(alg))
            .map(|k| k.key.clone())
    }
}

/// Signing keys per JWKS URI
///
/// A key set is reused until `refresh_interval` has elapsed. An unknown `kid`
/// forces a refetch to pick up rotated keys, at most once per
/// `min_refresh_interval`.
pub struct JwksCache {
    http_client: reqwest::Client,
    entries: DashMap<String, Arc<CachedKeySet>>,
    refresh_interval: Duration,
    min_refresh_interval: Duration,
}

impl JwksCache {
    pub fn new(
        http_client: reqwest::Client,
        refresh_interval: Duration,
        min_refresh_interval: Duration,
    ) -> Self {
        Self {
            http_client,
            entries: DashMap::new(),
            refresh_interval,
            min_refresh_interval,
        }
    }

    /// Decoding key for `kid` published at `jwks_uri`
    ///
    /// Only keys whose type, curve and declared `alg` fit `alg` are
    /// considered. With no `kid` the first such key is used.
    pub async fn get_key(
        &self,
        jwks_uri: &str,
        kid: Option<&str>,
        alg: Algorithm,
    ) -> Result<DecodingKey> {
        let cached = self.entries.get(jwks_uri).map(|e| Arc::clone(e.value()));

        let key_set = match cached {
            Some(set) if set.fetched_at.elapsed() < self.refresh_interval => set,
            _ => self.fetch(jwks_uri).await?,
        };

        if let Some(key) = key_set.find(kid, alg) {
            return Ok(key);
        }

        if key_set.fetched_at.elapsed() >= self.min_refresh_interval {
            debug!(jwks_uri, kid, "Unknown key id, refreshing JWKS");
            let key_set = self.fetch(jwks_uri).await?;
            if let Some(key) = key_set.find(kid, alg) {
                return Ok(key);
            }
        }

        Err(BrokerError::invalid_signature(match kid {
            Some(kid) => format!("no key with kid {} in JWKS", kid),
            None => format!("no {:?} signing key in JWKS", alg),
        }))
    }

    /// Refetch the key set published at `jwks_uri`
    pub async fn refresh(&self, jwks_uri: &str) -> Result<()> {
        self.fetch(jwks_uri).await.map(|_| ())
    }

    async fn fetch(&self, jwks_uri: &str) -> Result<Arc<CachedKeySet>> {
        debug!(jwks_uri, "Fetching JWKS");

        let response = self.http_client.get(jwks_uri).send().await?;
        if !response.status().is_success() {
            return Err(BrokerError::unavailable(format!(
                "JWKS request returned {}",
                response.status()
            )));
        }

        let jwks: Jwks = response
            .json()
            .await
            .map_err(|e| BrokerError::unavailable(format!("Failed to parse JWKS: {}", e)))?;

        let keys: Vec<_> = jwks.keys.iter().filter_map(JwkKey::to_cached_key).collect();

        debug!(jwks_uri, keys = keys.len(), "JWKS cache refreshed");

        let key_set = Arc::new(CachedKeySet {
            keys,
            fetched_at: Instant::now(),
        });
        self.entries.insert(jwks_uri.to_string(), Arc::clone(&key_set));
        Ok(key_set)
    }

    /// Number of cached key sets
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
