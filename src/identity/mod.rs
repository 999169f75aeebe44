//! Bearer token verification
//!
//! The rest of the crate only sees [`Claims`]; how a credential is checked
//! is hidden behind [`IdentityVerifier`].

pub mod jwks;
pub mod jwt;

pub use jwks::KeySetCache;
pub use jwt::JwtVerifier;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Verified identity of a caller
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// External subject (`sub`)
    pub subject_id: Option<String>,
    /// Email address
    pub email: Option<String>,
    /// Display name (`name`, falling back to `nickname`)
    pub display_name: Option<String>,
}

/// Checks a bearer credential and yields its claims
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// Verify `token` and return its claims
    ///
    /// # Errors
    ///
    /// Returns `SeoAssistantError::Unauthorized` for missing, malformed,
    /// expired or badly signed tokens and for issuer or audience mismatches,
    /// or `SeoAssistantError::UnknownKey` when the signing key cannot be found
    async fn verify(&self, token: &str) -> Result<Claims>;
}
