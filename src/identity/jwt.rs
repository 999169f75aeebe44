//! RS256 bearer token verification
//!
//! Tokens are checked for signature, `exp`/`nbf` (with leeway), issuer and
//! audience. Keys come from a [`KeySetCache`] keyed by the header `kid`.

use super::{Claims, IdentityVerifier, KeySetCache};
use crate::config::AuthConfig;
use crate::error::{Result, SeoAssistantError};
use async_trait::async_trait;
use jsonwebtoken::errors::{Error as JwtError, ErrorKind as JwtErrorKind};
use jsonwebtoken::{decode, decode_header, Algorithm, Validation};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct Payload {
    #[serde(default)]
    sub: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    nickname: Option<String>,
}

/// Verifies bearer tokens against a remote key set
pub struct JwtVerifier {
    keys: KeySetCache,
    validation: Validation,
}

impl JwtVerifier {
    /// Create a verifier from auth configuration
    ///
    /// # Errors
    ///
    /// Returns error if the key set client cannot be built
    pub fn from_config(config: &AuthConfig) -> Result<Self> {
        let keys = KeySetCache::new(
            config.resolved_jwks_url(),
            Duration::from_secs(config.key_cache_ttl_seconds),
        )?;
        Ok(Self::new(
            keys,
            config.normalized_issuer(),
            config.audience.clone(),
            config.leeway_seconds,
        ))
    }

    /// Create a verifier over an existing key cache
    ///
    /// The issuer matches with or without a trailing slash.
    pub fn new(
        keys: KeySetCache,
        issuer: impl Into<String>,
        audience: impl Into<String>,
        leeway_seconds: u64,
    ) -> Self {
        Self {
            keys,
            validation: validation(&issuer.into(), &audience.into(), leeway_seconds),
        }
    }

    /// The underlying key cache
    pub fn key_cache(&self) -> &KeySetCache {
        &self.keys
    }
}

#[async_trait]
impl IdentityVerifier for JwtVerifier {
    async fn verify(&self, token: &str) -> Result<Claims> {
        let header = decode_header(token).map_err(|e| rejection(&e))?;
        if header.alg != Algorithm::RS256 {
            return Err(SeoAssistantError::Unauthorized(format!(
                "Unsupported token algorithm: {:?}",
                header.alg
            ))
            .into());
        }
        let kid = header
            .kid
            .ok_or_else(|| SeoAssistantError::Unauthorized("Token header has no kid".into()))?;

        let resolved = self.keys.key(&kid).await?;
        let payload = match decode::<Payload>(token, &resolved.key, &self.validation) {
            Ok(data) => data.claims,
            Err(e) if matches!(e.kind(), JwtErrorKind::InvalidSignature) && !resolved.refreshed => {
                // The key may have been rotated under the same kid
                tracing::debug!(kid = %kid, "Signature mismatch, re-fetching key set");
                let rotated = self.keys.refresh().await?;
                let key = rotated.get(&kid).ok_or_else(|| {
                    SeoAssistantError::UnknownKey(format!("Unknown key id: {}", kid))
                })?;
                decode::<Payload>(token, key, &self.validation)
                    .map_err(|e| rejection(&e))?
                    .claims
            }
            Err(e) => return Err(rejection(&e).into()),
        };

        Ok(Claims {
            subject_id: payload.sub,
            email: payload.email,
            display_name: payload.name.or(payload.nickname),
        })
    }
}

fn validation(issuer: &str, audience: &str, leeway_seconds: u64) -> Validation {
    let trimmed = issuer.trim_end_matches('/');
    let mut validation = Validation::new(Algorithm::RS256);
    validation.leeway = leeway_seconds;
    validation.validate_nbf = true;
    validation.set_issuer(&[trimmed.to_string(), format!("{}/", trimmed)]);
    validation.set_audience(&[audience]);
    validation.set_required_spec_claims(&["exp", "iss", "aud"]);
    validation
}

fn rejection(err: &JwtError) -> SeoAssistantError {
    let message = match err.kind() {
        JwtErrorKind::ExpiredSignature => "Token expired".to_string(),
        JwtErrorKind::ImmatureSignature => "Token not yet valid".to_string(),
        JwtErrorKind::InvalidIssuer => "Invalid issuer".to_string(),
        JwtErrorKind::InvalidAudience => "Invalid audience".to_string(),
        JwtErrorKind::InvalidSignature => "Invalid token signature".to_string(),
        JwtErrorKind::InvalidAlgorithm => "Unsupported token algorithm".to_string(),
        JwtErrorKind::MissingRequiredClaim(claim) => format!("Token has no {} claim", claim),
        _ => format!("Malformed token: {}", err),
    };
    SeoAssistantError::Unauthorized(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, DecodingKey, EncodingKey, Header};
    use serde_json::{json, Value};

    const PRIVATE_KEY: &[u8] = include_bytes!("../../tests/fixtures/rsa_k1.pem");
    const PUBLIC_KEYS: &str = include_str!("../../tests/fixtures/rsa_public.json");

    fn verifier() -> JwtVerifier {
        let keys = KeySetCache::new("http://127.0.0.1:9/jwks.json", Duration::from_secs(600))
            .unwrap();
        JwtVerifier::new(keys, "https://issuer.example.com", "seo-api", 30)
    }

    fn sign(claims: &Value) -> String {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some("k1".to_string());
        encode(&header, claims, &EncodingKey::from_rsa_pem(PRIVATE_KEY).unwrap()).unwrap()
    }

    fn public_key() -> DecodingKey {
        let all: Value = serde_json::from_str(PUBLIC_KEYS).unwrap();
        DecodingKey::from_rsa_components(
            all["k1"]["n"].as_str().unwrap(),
            all["k1"]["e"].as_str().unwrap(),
        )
        .unwrap()
    }

    fn check(v: &JwtVerifier, claims: Value) -> std::result::Result<(), SeoAssistantError> {
        decode::<Payload>(&sign(&claims), &public_key(), &v.validation)
            .map(|_| ())
            .map_err(|e| rejection(&e))
    }

    fn now() -> i64 {
        chrono::Utc::now().timestamp()
    }

    fn claims(iss: &str, aud: &str, exp_offset: i64) -> Value {
        json!({"iss": iss, "aud": aud, "exp": now() + exp_offset})
    }

    const ISSUER: &str = "https://issuer.example.com/";

    #[test]
    fn test_issuer_accepted_with_or_without_slash() {
        let v = verifier();
        for iss in ["https://issuer.example.com", ISSUER] {
            assert!(check(&v, claims(iss, "seo-api", 300)).is_ok(), "issuer {} rejected", iss);
        }
    }

    #[test]
    fn test_expiry_honours_leeway() {
        let v = verifier();
        assert!(check(&v, claims(ISSUER, "seo-api", -10)).is_ok());

        let err = check(&v, claims(ISSUER, "seo-api", -120)).unwrap_err();
        assert!(err.to_string().contains("expired"));
    }

    #[test]
    fn test_not_before_is_checked() {
        let v = verifier();
        let mut early = claims(ISSUER, "seo-api", 600);
        early["nbf"] = json!(now() + 300);
        let err = check(&v, early).unwrap_err();
        assert!(err.to_string().contains("not yet valid"));
    }

    #[test]
    fn test_audience_array_accepted() {
        let v = verifier();
        let mut payload = claims(ISSUER, "seo-api", 300);
        payload["aud"] = json!(["other", "seo-api"]);
        assert!(check(&v, payload).is_ok());
    }

    #[test]
    fn test_wrong_issuer_and_audience_rejected() {
        let v = verifier();
        let err = check(&v, claims("https://evil.example.com/", "seo-api", 300)).unwrap_err();
        assert!(err.to_string().contains("issuer"));

        let err = check(&v, claims(ISSUER, "other", 300)).unwrap_err();
        assert!(err.to_string().contains("audience"));
    }

    #[test]
    fn test_missing_expiry_rejected() {
        let v = verifier();
        let err = check(&v, json!({"iss": ISSUER, "aud": "seo-api"})).unwrap_err();
        assert!(err.to_string().contains("exp"));
    }

    #[tokio::test]
    async fn test_malformed_token_rejected_without_network() {
        let v = verifier();
        let err = v.verify("not-a-token").await.unwrap_err();
        assert_eq!(
            crate::error::error_kind(&err),
            crate::error::ErrorKind::Unauthorized
        );
        assert_eq!(v.key_cache().fetch_count(), 0);
    }

    #[tokio::test]
    async fn test_symmetric_algorithm_rejected_before_key_lookup() {
        let mut header = Header::new(Algorithm::HS256);
        header.kid = Some("k1".to_string());
        let token = encode(
            &header,
            &json!({"sub": "u", "exp": now() + 300}),
            &EncodingKey::from_secret(b"published-secret"),
        )
        .unwrap();

        let v = verifier();
        let err = v.verify(&token).await.unwrap_err();
        assert!(err.to_string().contains("Unsupported"));
        assert_eq!(v.key_cache().fetch_count(), 0);
    }

    #[tokio::test]
    async fn test_unsigned_token_rejected() {
        // {"alg":"none"}.{}
        let err = verifier().verify("eyJhbGciOiJub25lIn0.e30.").await.unwrap_err();
        assert_eq!(
            crate::error::error_kind(&err),
            crate::error::ErrorKind::Unauthorized
        );
    }
}
