//! Token verification seam.
//!
//! Authentication and session issuance live outside this service; all core
//! operations only need an authenticated user id. [`TokenVerifier`] is the
//! narrow interface to that collaborator, and [`StaticTokenVerifier`] is the
//! shipped implementation: opaque bearer tokens mapped to user ids from
//! configuration. A missing or unknown token yields `Unauthorized` before any
//! store access.

use std::collections::HashMap;

use crate::config::AuthConfig;
use crate::error::ServiceError;

/// Resolves an opaque bearer token to a user id.
pub trait TokenVerifier: Send + Sync {
    fn verify(&self, token: &str) -> Result<String, ServiceError>;
}

/// Verifier backed by the static token table in config.
pub struct StaticTokenVerifier {
    tokens: HashMap<String, String>,
}

impl StaticTokenVerifier {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            tokens: config.tokens.clone(),
        }
    }
}

impl TokenVerifier for StaticTokenVerifier {
    fn verify(&self, token: &str) -> Result<String, ServiceError> {
        self.tokens
            .get(token)
            .cloned()
            .ok_or(ServiceError::Unauthorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verifier() -> StaticTokenVerifier {
        let mut tokens = HashMap::new();
        tokens.insert("tok-alice".to_string(), "alice".to_string());
        StaticTokenVerifier {
            tokens,
        }
    }

    #[test]
    fn known_token_resolves() {
        let user = verifier().verify("tok-alice").unwrap();
        assert_eq!(user, "alice");
    }

    #[test]
    fn unknown_token_is_unauthorized() {
        let err = verifier().verify("tok-mallory").unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized));
    }
}
