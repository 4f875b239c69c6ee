//! Best-effort session resolution
//!
//! Callers of the stats endpoints may or may not be signed in. Resolution
//! only ever narrows the response to an organization's limits; it never
//! rejects a request.

use async_trait::async_trait;
use axum::http::{header, HeaderMap};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Cookie carrying the session token for browser clients
pub const SESSION_COOKIE: &str = "supercheck_session";

/// Claims carried by Supercheck session tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject (user ID)
    pub sub: String,
    /// Active organization, if one is selected
    #[serde(default)]
    pub org_id: Option<Uuid>,
    /// Expiration
    pub exp: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Session has expired")]
    Expired,
    #[error("Invalid session token")]
    Invalid,
    #[error("Session validation failed: {0}")]
    Validation(String),
}

/// Resolves the caller's organization from request headers
#[async_trait]
pub trait SessionResolver: Send + Sync {
    /// `Ok(None)` means an anonymous caller
    async fn resolve_org(&self, headers: &HeaderMap) -> Result<Option<Uuid>, SessionError>;
}

/// HS256 session-token resolver
#[derive(Clone)]
pub struct JwtSessionResolver {
    decoding_key: Option<DecodingKey>,
}

impl JwtSessionResolver {
    /// Without a secret every caller resolves as anonymous
    pub fn new(secret: Option<&str>) -> Self {
        Self {
            decoding_key: secret
                .filter(|s| !s.is_empty())
                .map(|s| DecodingKey::from_secret(s.as_bytes())),
        }
    }

    fn validate(&self, key: &DecodingKey, token: &str) -> Result<SessionClaims, SessionError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 60; // 60 second clock skew tolerance

        decode::<SessionClaims>(token, key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => SessionError::Expired,
                jsonwebtoken::errors::ErrorKind::InvalidToken => SessionError::Invalid,
                jsonwebtoken::errors::ErrorKind::InvalidAlgorithm => SessionError::Invalid,
                jsonwebtoken::errors::ErrorKind::InvalidSignature => SessionError::Invalid,
                _ => SessionError::Validation(e.to_string()),
            })
    }
}

#[async_trait]
impl SessionResolver for JwtSessionResolver {
    async fn resolve_org(&self, headers: &HeaderMap) -> Result<Option<Uuid>, SessionError> {
        let Some(key) = &self.decoding_key else {
            return Ok(None);
        };
        let Some(token) = extract_token(headers) else {
            return Ok(None);
        };

        let claims = self.validate(key, &token)?;
        Ok(claims.org_id)
    }
}

/// Resolve the caller's org, treating every failure as anonymous
pub async fn resolve_org_best_effort(
    resolver: &dyn SessionResolver,
    headers: &HeaderMap,
) -> Option<Uuid> {
    match resolver.resolve_org(headers).await {
        Ok(org_id) => org_id,
        Err(e) => {
            // Ignored: stats fall back to default limits
            tracing::debug!(error = %e, "Session resolution failed, using default limits");
            None
        }
    }
}

/// Bearer token from `Authorization`, else the session cookie
fn extract_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use time::{Duration, OffsetDateTime};

    const SECRET: &str = "test-session-secret-at-least-32-chars!";

    fn token(org_id: Option<Uuid>, expires_in: Duration, secret: &str) -> String {
        let claims = SessionClaims {
            sub: "user-1".to_string(),
            org_id,
            exp: (OffsetDateTime::now_utc() + expires_in).unix_timestamp(),
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn bearer(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            format!("Bearer {}", token).parse().unwrap(),
        );
        headers
    }

    #[tokio::test]
    async fn test_resolves_org_from_bearer() {
        let resolver = JwtSessionResolver::new(Some(SECRET));
        let org_id = Uuid::new_v4();

        let headers = bearer(&token(Some(org_id), Duration::hours(1), SECRET));
        assert_eq!(resolver.resolve_org(&headers).await.unwrap(), Some(org_id));
    }

    #[tokio::test]
    async fn test_resolves_org_from_cookie() {
        let resolver = JwtSessionResolver::new(Some(SECRET));
        let org_id = Uuid::new_v4();
        let session = token(Some(org_id), Duration::hours(1), SECRET);

        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            format!("theme=dark; {}={}", SESSION_COOKIE, session)
                .parse()
                .unwrap(),
        );
        assert_eq!(resolver.resolve_org(&headers).await.unwrap(), Some(org_id));
    }

    #[tokio::test]
    async fn test_anonymous_without_token_or_secret() {
        let resolver = JwtSessionResolver::new(Some(SECRET));
        assert_eq!(resolver.resolve_org(&HeaderMap::new()).await.unwrap(), None);

        let unconfigured = JwtSessionResolver::new(None);
        let headers = bearer(&token(Some(Uuid::new_v4()), Duration::hours(1), SECRET));
        assert_eq!(unconfigured.resolve_org(&headers).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_bad_tokens_error_but_best_effort_is_anonymous() {
        let resolver = JwtSessionResolver::new(Some(SECRET));

        let expired = bearer(&token(Some(Uuid::new_v4()), Duration::hours(-2), SECRET));
        assert!(matches!(
            resolver.resolve_org(&expired).await,
            Err(SessionError::Expired)
        ));
        assert_eq!(resolve_org_best_effort(&resolver, &expired).await, None);

        let forged = bearer(&token(
            Some(Uuid::new_v4()),
            Duration::hours(1),
            "another-secret-that-is-also-32-chars-long",
        ));
        assert!(resolver.resolve_org(&forged).await.is_err());
        assert_eq!(resolve_org_best_effort(&resolver, &forged).await, None);

        let garbage = bearer("not-a-jwt");
        assert_eq!(resolve_org_best_effort(&resolver, &garbage).await, None);
    }
}
