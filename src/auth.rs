// src/auth.rs
//! Bearer tokens: HS256 JWT minting/verification, the `require_token`
//! middleware guarding `/data/*`, and the optional user table for `/token`.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use jsonwebtoken::{errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use metrics::counter;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// JWT payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    /// Expiry, unix seconds.
    pub exp: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Not authenticated")]
    Missing,

    #[error("Unsupported authorization scheme")]
    NotBearer,

    #[error("Token has expired")]
    Expired,

    #[error("Could not validate credentials")]
    Invalid(#[source] jsonwebtoken::errors::Error),
}

impl AuthError {
    fn kind(&self) -> &'static str {
        match self {
            AuthError::Missing => "missing",
            AuthError::NotBearer => "scheme",
            AuthError::Expired => "expired",
            AuthError::Invalid(_) => "invalid",
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({ "detail": self.to_string() }));
        let mut resp = (StatusCode::UNAUTHORIZED, body).into_response();
        resp.headers_mut()
            .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        resp
    }
}

/// Signs and verifies access tokens with one symmetric secret.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    default_ttl: chrono::Duration,
}

impl TokenIssuer {
    pub fn new(secret: &[u8], default_ttl: chrono::Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            default_ttl,
        }
    }

    pub fn default_ttl(&self) -> chrono::Duration {
        self.default_ttl
    }

    /// Mint a token for `subject` expiring after `ttl` (or the default TTL).
    pub fn issue(
        &self,
        subject: &str,
        ttl: Option<chrono::Duration>,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let exp = chrono::Utc::now() + ttl.unwrap_or(self.default_ttl);
        self.sign(&Claims {
            sub: subject.to_string(),
            exp: exp.timestamp(),
        })
    }

    pub fn sign(&self, claims: &Claims) -> Result<String, jsonwebtoken::errors::Error> {
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
    }

    /// Check signature and expiry (no leeway) and return the claims.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::Invalid(e),
            })
    }
}

/// Pull the token out of `Authorization: Bearer <token>`.
pub fn bearer_token(value: Option<&HeaderValue>) -> Result<&str, AuthError> {
    let raw = value
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(AuthError::Missing)?;

    let (scheme, token) = raw.split_once(' ').ok_or(AuthError::NotBearer)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::NotBearer);
    }
    let token = token.trim();
    if token.is_empty() {
        return Err(AuthError::Missing);
    }
    Ok(token)
}

/// Middleware: reject the request with 401 unless it carries a valid bearer
/// token. Verified claims are stored in the request extensions.
pub async fn require_token(
    State(issuer): State<Arc<TokenIssuer>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let path = request.uri().path().to_string();

    let claims = bearer_token(request.headers().get(header::AUTHORIZATION))
        .and_then(|token| issuer.verify(token))
        .inspect_err(|e| {
            tracing::warn!(%path, reason = e.kind(), "bearer token rejected");
            counter!("auth_rejections_total", "reason" => e.kind()).increment(1);
        })?;

    tracing::debug!(%path, sub = %claims.sub, "bearer token accepted");
    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}

/// Verified caller, available to handlers behind `require_token`.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Claims>()
            .cloned()
            .map(AuthUser)
            .ok_or(AuthError::Missing)
    }
}

/// Username → SHA-256(password). An empty table accepts any username.
#[derive(Debug, Clone, Default)]
pub struct UserTable {
    digests: HashMap<String, [u8; 32]>,
}

impl UserTable {
    pub fn from_pairs<I, U, P>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (U, P)>,
        U: Into<String>,
        P: AsRef<str>,
    {
        let digests = pairs
            .into_iter()
            .map(|(u, p)| (u.into(), digest(p.as_ref())))
            .collect();
        Self { digests }
    }

    /// True when no users are configured (open issuance).
    pub fn is_open(&self) -> bool {
        self.digests.is_empty()
    }

    pub fn check(&self, username: &str, password: &str) -> bool {
        if self.is_open() {
            return true;
        }
        self.digests
            .get(username)
            .is_some_and(|d| *d == digest(password))
    }
}

fn digest(s: &str) -> [u8; 32] {
    Sha256::digest(s.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(b"unit-test-secret", chrono::Duration::minutes(15))
    }

    #[test]
    fn issued_token_carries_subject_and_default_expiry() {
        let iss = issuer();
        let before = chrono::Utc::now().timestamp();
        let token = iss.issue("alice", None).unwrap();
        let claims = iss.verify(&token).unwrap();

        assert_eq!(claims.sub, "alice");
        let expected = before + 15 * 60;
        assert!((claims.exp - expected).abs() <= 2, "exp={} expected≈{}", claims.exp, expected);
    }

    #[test]
    fn explicit_ttl_overrides_default() {
        let iss = issuer();
        let before = chrono::Utc::now().timestamp();
        let token = iss.issue("bob", Some(chrono::Duration::hours(2))).unwrap();
        let claims = iss.verify(&token).unwrap();
        assert!((claims.exp - (before + 7_200)).abs() <= 2);
    }

    #[test]
    fn expired_token_is_rejected() {
        let iss = issuer();
        let token = iss
            .sign(&Claims {
                sub: "carol".into(),
                exp: chrono::Utc::now().timestamp() - 120,
            })
            .unwrap();
        assert!(matches!(iss.verify(&token), Err(AuthError::Expired)));
    }

    #[test]
    fn foreign_signature_is_rejected() {
        let other = TokenIssuer::new(b"someone-else", chrono::Duration::minutes(15));
        let token = other.issue("mallory", None).unwrap();
        assert!(matches!(issuer().verify(&token), Err(AuthError::Invalid(_))));
        assert!(matches!(issuer().verify("not.a.jwt"), Err(AuthError::Invalid(_))));
    }

    #[test]
    fn bearer_header_parsing() {
        let ok = HeaderValue::from_static("Bearer abc.def.ghi");
        assert_eq!(bearer_token(Some(&ok)).unwrap(), "abc.def.ghi");

        let lower = HeaderValue::from_static("bearer   xyz ");
        assert_eq!(bearer_token(Some(&lower)).unwrap(), "xyz");

        assert!(matches!(bearer_token(None), Err(AuthError::Missing)));
        let basic = HeaderValue::from_static("Basic dXNlcjpwdw==");
        assert!(matches!(bearer_token(Some(&basic)), Err(AuthError::NotBearer)));
        let bare = HeaderValue::from_static("Bearer");
        assert!(matches!(bearer_token(Some(&bare)), Err(AuthError::NotBearer)));
    }

    #[test]
    fn user_table_checks_passwords_when_configured() {
        let open = UserTable::default();
        assert!(open.is_open());
        assert!(open.check("anyone", ""));

        let table = UserTable::from_pairs([("alice", "pw1")]);
        assert!(table.check("alice", "pw1"));
        assert!(!table.check("alice", "pw2"));
        assert!(!table.check("bob", "pw1"));
    }
}
