//! Bearer-token authentication
//!
//! The router extracts the bearer credential and hands it to a
//! [`TokenValidator`] selected once at startup. Two strategies exist:
//!
//! - [`StaticTokenValidator`]: one shared token for local development
//! - [`FirebaseTokenValidator`]: Firebase ID tokens verified against
//!   Google's published signing keys

pub mod firebase;
pub mod static_token;

pub use firebase::{FirebaseTokenValidator, GoogleKeySource, KeySource};
pub use static_token::StaticTokenValidator;

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

use crate::config::{Args, AuthBackend};

/// Identity a request is attributed to, used as rate-limit key and log field
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Actor(String);

impl Actor {
    pub fn new(uid: impl Into<String>) -> Self {
        Self(uid.into())
    }

    /// Actor for the unauthenticated endpoint, keyed by peer address
    pub fn public(peer_ip: impl fmt::Display) -> Self {
        Self(format!("public:{}", peer_ip))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("missing bearer token")]
    MissingToken,

    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("signing key unavailable: {0}")]
    KeyUnavailable(String),

    #[error("auth configuration error: {0}")]
    Config(String),
}

/// Token verification strategy
#[async_trait]
pub trait TokenValidator: Send + Sync {
    /// Resolve a bearer token to the calling actor
    async fn validate(&self, token: &str) -> Result<Actor, AuthError>;
}

/// Extract the token from an `Authorization: Bearer <token>` header
pub fn extract_bearer_token(auth_header: Option<&str>) -> Option<&str> {
    let token = auth_header?.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

/// Build the validator selected by configuration
pub fn build_token_validator(args: &Args) -> Result<Arc<dyn TokenValidator>, AuthError> {
    match args.auth_backend {
        AuthBackend::Static => Ok(Arc::new(StaticTokenValidator::new(
            &args.static_bearer_token,
            &args.static_operator_uid,
        )?)),
        AuthBackend::Firebase => {
            let project_id = args
                .firebase_project_id
                .as_deref()
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .ok_or_else(|| {
                    AuthError::Config("FIREBASE_PROJECT_ID is required for firebase auth".into())
                })?;
            let keys = GoogleKeySource::new()?;
            Ok(Arc::new(FirebaseTokenValidator::new(
                project_id,
                Arc::new(keys),
            )))
        }
    }
}
