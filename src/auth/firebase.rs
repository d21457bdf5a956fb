//! Firebase ID token verification
//!
//! Tokens are RS256 JWTs signed by Google. The signing keys are published
//! as a JWK set and rotated regularly; [`GoogleKeySource`] fetches the set
//! and keeps it for [`KEY_CACHE_TTL`].
//!
//! Checks applied on top of the signature:
//! - `aud` equals the project id
//! - `iss` equals `https://securetoken.google.com/<project id>`
//! - `exp` is in the future
//! - `sub` is non-empty; it becomes the actor uid

use async_trait::async_trait;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::{Actor, AuthError, TokenValidator};

pub const GOOGLE_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";

pub const KEY_CACHE_TTL: Duration = Duration::from_secs(3600);

/// Lookup of token signing keys by key id
#[async_trait]
pub trait KeySource: Send + Sync {
    async fn decoding_key(&self, kid: &str) -> Result<(DecodingKey, Algorithm), AuthError>;
}

struct CachedKeySet {
    keys: JwkSet,
    fetched_at: Instant,
}

/// Google's published JWK set for Firebase ID tokens
pub struct GoogleKeySource {
    client: reqwest::Client,
    url: String,
    ttl: Duration,
    cache: RwLock<Option<CachedKeySet>>,
}

impl GoogleKeySource {
    pub fn new() -> Result<Self, AuthError> {
        Self::with_url(GOOGLE_JWKS_URL)
    }

    pub fn with_url(url: impl Into<String>) -> Result<Self, AuthError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| AuthError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: url.into(),
            ttl: KEY_CACHE_TTL,
            cache: RwLock::new(None),
        })
    }

    async fn fetch_key_set(&self) -> Result<JwkSet, AuthError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| AuthError::KeyUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AuthError::KeyUnavailable(format!(
                "key endpoint returned {}",
                response.status()
            )));
        }

        response
            .json::<JwkSet>()
            .await
            .map_err(|e| AuthError::KeyUnavailable(format!("malformed key set: {}", e)))
    }
}

#[async_trait]
impl KeySource for GoogleKeySource {
    async fn decoding_key(&self, kid: &str) -> Result<(DecodingKey, Algorithm), AuthError> {
        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.fetched_at.elapsed() < self.ttl {
                    return key_from_set(&cached.keys, kid);
                }
            }
        }

        let mut cache = self.cache.write().await;
        // Another task may have refreshed while we waited for the write lock
        if let Some(cached) = cache.as_ref() {
            if cached.fetched_at.elapsed() < self.ttl {
                return key_from_set(&cached.keys, kid);
            }
        }

        let keys = self.fetch_key_set().await?;
        debug!(count = keys.keys.len(), "Fetched Firebase signing keys");
        let result = key_from_set(&keys, kid);
        *cache = Some(CachedKeySet {
            keys,
            fetched_at: Instant::now(),
        });
        result
    }
}

fn key_from_set(keys: &JwkSet, kid: &str) -> Result<(DecodingKey, Algorithm), AuthError> {
    let jwk = keys
        .find(kid)
        .ok_or_else(|| AuthError::InvalidToken(format!("unknown key id {}", kid)))?;
    let key = DecodingKey::from_jwk(jwk)
        .map_err(|e| AuthError::KeyUnavailable(format!("unusable key {}: {}", kid, e)))?;
    Ok((key, Algorithm::RS256))
}

#[derive(Debug, Deserialize)]
struct FirebaseClaims {
    #[serde(default)]
    sub: String,
}

pub struct FirebaseTokenValidator {
    project_id: String,
    issuer: String,
    keys: Arc<dyn KeySource>,
}

impl FirebaseTokenValidator {
    pub fn new(project_id: &str, keys: Arc<dyn KeySource>) -> Self {
        Self {
            project_id: project_id.to_string(),
            issuer: format!("https://securetoken.google.com/{}", project_id),
            keys,
        }
    }
}

#[async_trait]
impl TokenValidator for FirebaseTokenValidator {
    async fn validate(&self, token: &str) -> Result<Actor, AuthError> {
        let header =
            decode_header(token).map_err(|e| AuthError::InvalidToken(e.to_string()))?;
        let kid = header
            .kid
            .ok_or_else(|| AuthError::InvalidToken("token header has no kid".into()))?;

        let (key, algorithm) = self.keys.decoding_key(&kid).await?;

        let mut validation = Validation::new(algorithm);
        validation.set_audience(&[&self.project_id]);
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["exp", "aud", "iss", "sub"]);

        let data = decode::<FirebaseClaims>(token, &key, &validation).map_err(|e| {
            warn!(error = %e, "Firebase token rejected");
            AuthError::InvalidToken(e.to_string())
        })?;

        let uid = data.claims.sub.trim();
        if uid.is_empty() {
            return Err(AuthError::InvalidToken("token has empty uid".into()));
        }
        Ok(Actor::new(uid))
    }
}
