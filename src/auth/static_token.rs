//! Shared-secret bearer token for local development
//!
//! Every caller presenting the configured token is attributed to the
//! same operator uid.

use async_trait::async_trait;

use super::{Actor, AuthError, TokenValidator};

pub const DEFAULT_OPERATOR_UID: &str = "local-operator";

#[derive(Clone)]
pub struct StaticTokenValidator {
    expected_token: String,
    operator_uid: String,
}

impl std::fmt::Debug for StaticTokenValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticTokenValidator")
            .field("operator_uid", &self.operator_uid)
            .finish_non_exhaustive()
    }
}

impl StaticTokenValidator {
    /// Create a validator. The token must be non-empty; an empty uid
    /// falls back to [`DEFAULT_OPERATOR_UID`].
    pub fn new(expected_token: &str, operator_uid: &str) -> Result<Self, AuthError> {
        let expected_token = expected_token.trim();
        if expected_token.is_empty() {
            return Err(AuthError::Config("static bearer token is empty".into()));
        }

        let operator_uid = match operator_uid.trim() {
            "" => DEFAULT_OPERATOR_UID,
            uid => uid,
        };

        Ok(Self {
            expected_token: expected_token.to_string(),
            operator_uid: operator_uid.to_string(),
        })
    }
}

#[async_trait]
impl TokenValidator for StaticTokenValidator {
    async fn validate(&self, token: &str) -> Result<Actor, AuthError> {
        if constant_time_compare(token, &self.expected_token) {
            Ok(Actor::new(self.operator_uid.clone()))
        } else {
            Err(AuthError::InvalidToken("token mismatch".into()))
        }
    }
}

/// Constant-time string comparison to prevent timing attacks
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}
