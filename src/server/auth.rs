//! Bearer token extraction
//!
//! [`AuthUser`] verifies the `Authorization: Bearer` credential and resolves
//! the caller to a stored user before any handler body runs.

use super::responses::ApiError;
use super::AppState;
use crate::error::SeoAssistantError;
use crate::storage::StoredUser;
use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use std::sync::Arc;

/// The authenticated caller
#[derive(Debug, Clone)]
pub struct AuthUser(pub StoredUser);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| SeoAssistantError::Unauthorized("Missing bearer token".to_string()))?;

        let token = bearer_token(header)
            .ok_or_else(|| SeoAssistantError::Unauthorized("Missing bearer token".to_string()))?;

        let claims = state.verifier.verify(token).await?;
        let user = state.service.storage().ensure_user(&claims)?;

        Ok(Self(user))
    }
}

fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(bearer_token("bearer  abc "), Some("abc"));
        assert_eq!(bearer_token("Basic abc"), None);
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("Bearer"), None);
    }
}
