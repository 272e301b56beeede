//! Bearer token validation.
//!
//! Tokens are RS256 access tokens issued by a Microsoft identity platform
//! (v2.0) tenant. Signing keys come from the tenant's JWKS endpoint through
//! [`JwksCache`].

use std::sync::Arc;

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header};
use thiserror::Error;

use crate::{AuthenticatedUser, IdentityClaims, JwksCache};

/// Default identity-provider authority.
pub const DEFAULT_AUTHORITY: &str = "https://login.microsoftonline.com";

/// Why a request could not be authenticated. Every variant maps to HTTP 401.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("No authorization token provided")]
    MissingToken,

    #[error("token has expired")]
    Expired,

    #[error("malformed token")]
    Malformed,

    #[error("token is not yet valid")]
    NotYetValid,

    #[error("invalid or expired token")]
    Invalid,
}

/// Verification settings for a tenant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatorConfig {
    /// Expected `iss` claim.
    pub issuer: String,
    /// API client id. `None` disables the audience check.
    pub client_id: Option<String>,
    /// Clock skew tolerance in seconds.
    pub leeway_secs: u64,
}

impl ValidatorConfig {
    pub fn for_tenant(authority: &str, tenant_id: &str, client_id: Option<String>) -> Self {
        Self {
            issuer: format!("{}/{}/v2.0", authority.trim_end_matches('/'), tenant_id),
            client_id: client_id.filter(|c| !c.trim().is_empty()),
            leeway_secs: 60,
        }
    }

    /// The tenant's v2.0 key-set endpoint.
    pub fn jwks_uri(authority: &str, tenant_id: &str) -> String {
        format!(
            "{}/{}/discovery/v2.0/keys",
            authority.trim_end_matches('/'),
            tenant_id
        )
    }

    fn audiences(&self) -> Option<[String; 2]> {
        self.client_id
            .as_ref()
            .map(|id| [id.clone(), format!("api://{id}")])
    }
}

enum Mode {
    Bypass,
    Verify {
        config: ValidatorConfig,
        keys: Arc<JwksCache>,
    },
}

/// Validates `Authorization` header values into an [`AuthenticatedUser`].
pub struct TokenValidator {
    mode: Mode,
}

impl TokenValidator {
    pub fn new(config: ValidatorConfig, keys: Arc<JwksCache>) -> Self {
        if config.client_id.is_none() {
            tracing::warn!(
                issuer = %config.issuer,
                "no client id configured; token audience will NOT be checked"
            );
        }
        Self {
            mode: Mode::Verify { config, keys },
        }
    }

    /// Development bypass: every request is the fixed mock identity.
    pub fn dev_bypass() -> Self {
        tracing::warn!("AUTH DEV BYPASS ENABLED: all requests authenticate as the mock developer identity");
        Self { mode: Mode::Bypass }
    }

    pub fn is_bypass(&self) -> bool {
        matches!(self.mode, Mode::Bypass)
    }

    /// Validate a raw `Authorization` header value.
    pub async fn validate(&self, header: Option<&str>) -> Result<AuthenticatedUser, AuthError> {
        let (config, keys) = match &self.mode {
            Mode::Bypass => return Ok(AuthenticatedUser::dev_mock()),
            Mode::Verify { config, keys } => (config, keys),
        };

        let token = header.and_then(extract_bearer).ok_or(AuthError::MissingToken)?;
        verify(token, config, keys).await
    }
}

async fn verify(
    token: &str,
    config: &ValidatorConfig,
    keys: &JwksCache,
) -> Result<AuthenticatedUser, AuthError> {
    let header = decode_header(token).map_err(classify)?;
    let kid = header.kid.ok_or_else(|| {
        tracing::debug!("token header has no kid");
        AuthError::Invalid
    })?;

    let jwk = keys.get_key(&kid).await.map_err(|e| {
        tracing::debug!(kid, error = %e, "signing key unavailable");
        AuthError::Invalid
    })?;
    let key = DecodingKey::from_jwk(&jwk).map_err(|e| {
        tracing::warn!(kid, error = %e, "unusable signing key in key set");
        AuthError::Invalid
    })?;

    let mut validation = Validation::new(Algorithm::RS256);
    validation.leeway = config.leeway_secs;
    validation.validate_nbf = true;
    validation.set_issuer(&[config.issuer.as_str()]);
    validation.set_required_spec_claims(&["exp", "iss"]);
    match config.audiences() {
        Some(auds) => validation.set_audience(&auds),
        None => validation.validate_aud = false,
    }

    let data = decode::<IdentityClaims>(token, &key, &validation).map_err(classify)?;

    AuthenticatedUser::from_claims(&data.claims).ok_or_else(|| {
        tracing::debug!("token carries neither oid nor sub");
        AuthError::Invalid
    })
}

fn classify(err: jsonwebtoken::errors::Error) -> AuthError {
    let mapped = match err.kind() {
        ErrorKind::ExpiredSignature => AuthError::Expired,
        ErrorKind::ImmatureSignature => AuthError::NotYetValid,
        ErrorKind::InvalidToken | ErrorKind::Base64(_) | ErrorKind::Json(_) | ErrorKind::Utf8(_) => {
            AuthError::Malformed
        }
        _ => AuthError::Invalid,
    };
    tracing::debug!(error = %err, outcome = %mapped, "token rejected");
    mapped
}

/// Extract the token from a `Bearer <token>` header value.
pub fn extract_bearer(header: &str) -> Option<&str> {
    let (scheme, rest) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = rest.trim();
    if token.is_empty() { None } else { Some(token) }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::Utc;
    use jsonwebtoken::{EncodingKey, Header, encode};
    use proptest::prelude::*;
    use serde_json::{Value, json};

    use crate::StaticKeySource;

    const JWKS: &str = include_str!("../tests/fixtures/signing_key.jwks.json");
    const SIGNING_KEY: &[u8] = include_bytes!("../tests/fixtures/signing_key.pem");
    const FOREIGN_KEY: &[u8] = include_bytes!("../tests/fixtures/foreign_key.pem");

    const TENANT: &str = "tid1";
    const CLIENT: &str = "brigade-api";

    fn validator(client_id: Option<&str>) -> TokenValidator {
        let source = Arc::new(StaticKeySource::from_json(JWKS).unwrap());
        let config = ValidatorConfig::for_tenant(DEFAULT_AUTHORITY, TENANT, client_id.map(String::from));
        TokenValidator::new(config, Arc::new(JwksCache::new(source)))
    }

    fn claims() -> Value {
        let now = Utc::now().timestamp();
        json!({
            "iss": format!("{DEFAULT_AUTHORITY}/{TENANT}/v2.0"),
            "aud": CLIENT,
            "sub": "pairwise",
            "oid": "abc",
            "tid": TENANT,
            "preferred_username": "ana@brigade.org",
            "given_name": "Ana",
            "family_name": "Rojas",
            "iat": now,
            "exp": now + 600,
        })
    }

    fn sign_with(key: &[u8], kid: Option<&str>, claims: &Value) -> String {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = kid.map(String::from);
        encode(&header, claims, &EncodingKey::from_rsa_pem(key).unwrap()).unwrap()
    }

    fn sign(claims: &Value) -> String {
        sign_with(SIGNING_KEY, Some("test-key-1"), claims)
    }

    fn bearer(token: &str) -> String {
        format!("Bearer {token}")
    }

    #[tokio::test]
    async fn valid_token_yields_composite_identity() {
        let user = validator(Some(CLIENT))
            .validate(Some(&bearer(&sign(&claims()))))
            .await
            .unwrap();
        assert_eq!(user.user_id.as_str(), "abc.tid1");
        assert_eq!(user.email.as_deref(), Some("ana@brigade.org"));
        assert_eq!(user.name.as_deref(), Some("Ana Rojas"));
    }

    #[tokio::test]
    async fn missing_or_malformed_header_is_no_token() {
        let v = validator(Some(CLIENT));
        for header in [None, Some(""), Some("Bearer"), Some("Bearer   "), Some("Basic abc"), Some("token")] {
            let err = v.validate(header).await.unwrap_err();
            assert_eq!(err, AuthError::MissingToken, "header {header:?}");
            assert_eq!(err.to_string(), "No authorization token provided");
        }
    }

    #[tokio::test]
    async fn expired_token_is_reported_as_expired() {
        let mut c = claims();
        let past = Utc::now().timestamp() - 3600;
        c["iat"] = json!(past - 600);
        c["exp"] = json!(past);
        let err = validator(Some(CLIENT)).validate(Some(&bearer(&sign(&c)))).await.unwrap_err();
        assert_eq!(err, AuthError::Expired);
        assert_eq!(err.to_string(), "token has expired");
    }

    #[tokio::test]
    async fn future_nbf_is_not_yet_valid() {
        let mut c = claims();
        c["nbf"] = json!(Utc::now().timestamp() + 3600);
        c["exp"] = json!(Utc::now().timestamp() + 7200);
        let err = validator(Some(CLIENT)).validate(Some(&bearer(&sign(&c)))).await.unwrap_err();
        assert_eq!(err, AuthError::NotYetValid);
    }

    #[tokio::test]
    async fn garbage_token_is_malformed() {
        let err = validator(Some(CLIENT))
            .validate(Some("Bearer not.a.jwt"))
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::Malformed);
        assert_ne!(err.to_string(), AuthError::Expired.to_string());
    }

    #[tokio::test]
    async fn signature_from_foreign_key_is_rejected() {
        let token = sign_with(FOREIGN_KEY, Some("test-key-1"), &claims());
        let err = validator(Some(CLIENT)).validate(Some(&bearer(&token))).await.unwrap_err();
        assert_eq!(err, AuthError::Invalid);
    }

    #[tokio::test]
    async fn unknown_kid_is_rejected() {
        let token = sign_with(SIGNING_KEY, Some("other-kid"), &claims());
        let err = validator(Some(CLIENT)).validate(Some(&bearer(&token))).await.unwrap_err();
        assert_eq!(err, AuthError::Invalid);

        let token = sign_with(SIGNING_KEY, None, &claims());
        let err = validator(Some(CLIENT)).validate(Some(&bearer(&token))).await.unwrap_err();
        assert_eq!(err, AuthError::Invalid);
    }

    #[tokio::test]
    async fn wrong_issuer_is_rejected() {
        let mut c = claims();
        c["iss"] = json!("https://login.microsoftonline.com/other-tenant/v2.0");
        let err = validator(Some(CLIENT)).validate(Some(&bearer(&sign(&c)))).await.unwrap_err();
        assert_eq!(err, AuthError::Invalid);
    }

    #[tokio::test]
    async fn audience_accepts_bare_and_api_uri_forms() {
        let v = validator(Some(CLIENT));

        let mut c = claims();
        c["aud"] = json!(format!("api://{CLIENT}"));
        assert!(v.validate(Some(&bearer(&sign(&c)))).await.is_ok());

        c["aud"] = json!("someone-else");
        assert_eq!(
            v.validate(Some(&bearer(&sign(&c)))).await.unwrap_err(),
            AuthError::Invalid
        );
    }

    #[tokio::test]
    async fn missing_client_id_skips_audience_check_only() {
        let v = validator(None);

        let mut c = claims();
        c["aud"] = json!("someone-else");
        assert!(v.validate(Some(&bearer(&sign(&c)))).await.is_ok());

        // Signature is still enforced.
        let token = sign_with(FOREIGN_KEY, Some("test-key-1"), &c);
        assert!(v.validate(Some(&bearer(&token))).await.is_err());
    }

    #[tokio::test]
    async fn bypass_returns_mock_identity_for_any_header() {
        let v = TokenValidator::dev_bypass();
        assert!(v.is_bypass());
        for header in [None, Some(""), Some("Bearer garbage"), Some("Basic xyz")] {
            assert_eq!(v.validate(header).await.unwrap(), AuthenticatedUser::dev_mock());
        }
    }

    #[test]
    fn issuer_and_jwks_uri_follow_tenant() {
        let cfg = ValidatorConfig::for_tenant("https://login.microsoftonline.com/", "t-1", Some(" ".into()));
        assert_eq!(cfg.issuer, "https://login.microsoftonline.com/t-1/v2.0");
        assert_eq!(cfg.client_id, None);
        assert_eq!(
            ValidatorConfig::jwks_uri(DEFAULT_AUTHORITY, "t-1"),
            "https://login.microsoftonline.com/t-1/discovery/v2.0/keys"
        );
    }

    #[test]
    fn extract_bearer_accepts_case_insensitive_scheme() {
        assert_eq!(extract_bearer("Bearer abc"), Some("abc"));
        assert_eq!(extract_bearer("bearer  abc "), Some("abc"));
        assert_eq!(extract_bearer("Bearerabc"), None);
    }

    proptest! {
        #[test]
        fn headers_without_bearer_scheme_yield_no_token(s in "[^ ]{0,40}( [^ ]{0,40})?") {
            prop_assume!(!s.trim().to_ascii_lowercase().starts_with("bearer "));
            prop_assert_eq!(extract_bearer(&s), None);
        }
    }
}
