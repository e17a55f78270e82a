/// Request identity resolution
///
/// An [`IdentityProvider`] turns request headers into the ID of the calling
/// user. Providers are composed into an [`IdentityChain`] at startup:
/// production runs only [`JwtIdentity`]; development builds may append a
/// [`StaticIdentity`] so unauthenticated requests act as a seeded user.
/// Request handling itself never looks at the environment.
///
/// # Example
///
/// ```
/// use axum::http::HeaderMap;
/// use ecocommute_shared::auth::identity::{IdentityChain, JwtIdentity, StaticIdentity};
/// use uuid::Uuid;
///
/// let dev_user = Uuid::new_v4();
/// let chain = IdentityChain::new()
///     .with(JwtIdentity::new("an-hs256-secret-of-at-least-32-bytes"))
///     .with(StaticIdentity::new(dev_user));
///
/// let identity = chain.resolve(&HeaderMap::new()).unwrap();
/// assert_eq!(identity.user_id, dev_user);
/// ```

use axum::http::{header, HeaderMap};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use super::jwt::{validate_access_token, JwtError};

/// How the caller was identified
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentitySource {
    /// Bearer access token
    Token,

    /// Fixed development/test identity
    Static,
}

/// The calling user, added to request extensions after resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: Uuid,
    pub source: IdentitySource,
}

/// Authentication error type
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No provider recognised the request
    #[error("Missing credentials")]
    MissingCredentials,

    /// Authorization header present but malformed
    #[error("Invalid authorization header: {0}")]
    InvalidFormat(String),

    #[error(transparent)]
    InvalidToken(#[from] JwtError),
}

/// Source of caller identities
pub trait IdentityProvider: Send + Sync {
    /// `Ok(None)` when the request carries nothing this provider understands
    fn identify(&self, headers: &HeaderMap) -> Result<Option<Identity>, AuthError>;

    fn name(&self) -> &'static str;
}

/// Bearer JWT access tokens
pub struct JwtIdentity {
    secret: String,
}

impl JwtIdentity {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }
}

/// Extracts the token from `Authorization: Bearer <token>`
pub fn bearer_token(headers: &HeaderMap) -> Result<Option<&str>, AuthError> {
    let Some(value) = headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };

    let value = value
        .to_str()
        .map_err(|_| AuthError::InvalidFormat("header is not valid ASCII".to_string()))?;

    match value.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(Some(token.trim())),
        _ => Err(AuthError::InvalidFormat(
            "expected 'Bearer <token>'".to_string(),
        )),
    }
}

impl IdentityProvider for JwtIdentity {
    fn identify(&self, headers: &HeaderMap) -> Result<Option<Identity>, AuthError> {
        let Some(token) = bearer_token(headers)? else {
            return Ok(None);
        };

        let claims = validate_access_token(token, &self.secret)?;
        Ok(Some(Identity {
            user_id: claims.sub,
            source: IdentitySource::Token,
        }))
    }

    fn name(&self) -> &'static str {
        "jwt"
    }
}

/// Always resolves to the same user
pub struct StaticIdentity {
    user_id: Uuid,
}

impl StaticIdentity {
    pub fn new(user_id: Uuid) -> Self {
        Self { user_id }
    }
}

impl IdentityProvider for StaticIdentity {
    fn identify(&self, _headers: &HeaderMap) -> Result<Option<Identity>, AuthError> {
        Ok(Some(Identity {
            user_id: self.user_id,
            source: IdentitySource::Static,
        }))
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

/// Providers tried in order; the first to recognise the request wins
///
/// A provider that recognises credentials but rejects them stops the chain,
/// so a bad token is never silently replaced by a fallback identity.
#[derive(Clone, Default)]
pub struct IdentityChain {
    providers: Vec<Arc<dyn IdentityProvider>>,
}

impl IdentityChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, provider: impl IdentityProvider + 'static) -> Self {
        self.providers.push(Arc::new(provider));
        self
    }

    /// Provider names in evaluation order
    pub fn names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    pub fn resolve(&self, headers: &HeaderMap) -> Result<Identity, AuthError> {
        for provider in &self.providers {
            if let Some(identity) = provider.identify(headers)? {
                return Ok(identity);
            }
        }

        Err(AuthError::MissingCredentials)
    }
}

impl std::fmt::Debug for IdentityChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityChain")
            .field("providers", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::{create_token, Claims, TokenType};
    use axum::http::HeaderValue;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    fn bearer(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );
        headers
    }

    #[test]
    fn test_jwt_identity() {
        let user_id = Uuid::new_v4();
        let token = create_token(&Claims::new(user_id, None, TokenType::Access), SECRET).unwrap();
        let chain = IdentityChain::new().with(JwtIdentity::new(SECRET));

        let identity = chain.resolve(&bearer(&token)).unwrap();
        assert_eq!(identity.user_id, user_id);
        assert_eq!(identity.source, IdentitySource::Token);
    }

    #[test]
    fn test_missing_credentials_without_fallback() {
        let chain = IdentityChain::new().with(JwtIdentity::new(SECRET));
        assert!(matches!(
            chain.resolve(&HeaderMap::new()),
            Err(AuthError::MissingCredentials)
        ));
    }

    #[test]
    fn test_bad_token_is_not_replaced_by_fallback() {
        let chain = IdentityChain::new()
            .with(JwtIdentity::new(SECRET))
            .with(StaticIdentity::new(Uuid::new_v4()));

        assert!(matches!(
            chain.resolve(&bearer("garbage")),
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[test]
    fn test_refresh_token_rejected() {
        let token =
            create_token(&Claims::new(Uuid::new_v4(), None, TokenType::Refresh), SECRET).unwrap();
        let chain = IdentityChain::new().with(JwtIdentity::new(SECRET));

        assert!(chain.resolve(&bearer(&token)).is_err());
    }

    #[test]
    fn test_malformed_header() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));

        assert!(matches!(
            bearer_token(&headers),
            Err(AuthError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_static_fallback() {
        let dev_user = Uuid::new_v4();
        let chain = IdentityChain::new()
            .with(JwtIdentity::new(SECRET))
            .with(StaticIdentity::new(dev_user));

        let identity = chain.resolve(&HeaderMap::new()).unwrap();
        assert_eq!(identity.user_id, dev_user);
        assert_eq!(identity.source, IdentitySource::Static);
        assert_eq!(chain.names(), vec!["jwt", "static"]);
    }
}
