//! Bearer-token authorizer.
//!
//! Routes bound to an identity-pool authorizer require an `Authorization`
//! header holding a token the pool vouches for.  The header value may carry
//! a `Bearer ` prefix.  Verification is behind [`TokenVerifier`] so the
//! filter does not care whether tokens are pre-shared or signed JWTs.

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use subtle::ConstantTimeEq;
use streamgate_kernel::route::Authorization;
use streamgate_kernel::{
    AuthorizerConfig, FilterAction, FilterOrder, GatewayContext, GatewayError, GatewayFilter,
};
use tracing::{debug, warn};

const UNAUTHORIZED: &str = "Unauthorized";

/// Decides whether a bearer token is acceptable and who it belongs to.
pub trait TokenVerifier: Send + Sync {
    /// Returns the principal on success.
    fn verify(&self, token: &str) -> Option<String>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Verifiers
// ─────────────────────────────────────────────────────────────────────────────

/// Accepts a fixed set of opaque tokens.
///
/// The principal is the token's position in the configured list, so the
/// access log never carries token material.
pub struct StaticTokenVerifier {
    tokens: Vec<String>,
}

impl StaticTokenVerifier {
    pub fn new(tokens: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            tokens: tokens.into_iter().map(Into::into).collect(),
        }
    }
}

impl TokenVerifier for StaticTokenVerifier {
    fn verify(&self, token: &str) -> Option<String> {
        self.tokens
            .iter()
            .position(|t| bool::from(t.as_bytes().ct_eq(token.as_bytes())))
            .map(|index| format!("static-token-{index}"))
    }
}

#[derive(Debug, Deserialize)]
struct PoolClaims {
    sub: String,
}

/// HS256 JWTs issued by the identity pool.
pub struct JwtVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    /// When `issuer` is set, the `iss` claim must equal it.  `exp` is always
    /// checked.
    pub fn new(secret: &str, issuer: Option<&str>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        if let Some(iss) = issuer {
            validation.set_issuer(&[iss]);
        }
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }
}

impl TokenVerifier for JwtVerifier {
    fn verify(&self, token: &str) -> Option<String> {
        match jsonwebtoken::decode::<PoolClaims>(token, &self.key, &self.validation) {
            Ok(data) => Some(data.claims.sub),
            Err(e) => {
                debug!(error = %e, "jwt rejected");
                None
            }
        }
    }
}

/// First verifier that accepts wins.
pub struct ChainVerifier {
    verifiers: Vec<Box<dyn TokenVerifier>>,
}

impl ChainVerifier {
    pub fn new(verifiers: Vec<Box<dyn TokenVerifier>>) -> Self {
        Self { verifiers }
    }
}

impl TokenVerifier for ChainVerifier {
    fn verify(&self, token: &str) -> Option<String> {
        self.verifiers.iter().find_map(|v| v.verify(token))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Filter
// ─────────────────────────────────────────────────────────────────────────────

pub struct AuthorizerFilter {
    authorizer_id: String,
    verifier: Box<dyn TokenVerifier>,
}

impl AuthorizerFilter {
    pub fn new(authorizer_id: impl Into<String>, verifier: Box<dyn TokenVerifier>) -> Self {
        Self {
            authorizer_id: authorizer_id.into(),
            verifier,
        }
    }

    /// Static tokens and, when a secret is configured, pool-issued JWTs.
    pub fn from_config(config: &AuthorizerConfig) -> Self {
        let mut verifiers: Vec<Box<dyn TokenVerifier>> = Vec::new();
        if !config.tokens.is_empty() {
            verifiers.push(Box::new(StaticTokenVerifier::new(config.tokens.clone())));
        }
        if let Some(secret) = &config.jwt_secret {
            verifiers.push(Box::new(JwtVerifier::new(secret, config.identity_pool.as_deref())));
        }
        Self::new(config.id.clone(), Box::new(ChainVerifier::new(verifiers)))
    }
}

/// Strip an optional, case-insensitive `Bearer ` prefix.
pub fn bearer_token(raw: &str) -> &str {
    let raw = raw.trim();
    match raw.get(..7) {
        Some(prefix) if prefix.eq_ignore_ascii_case("bearer ") => raw[7..].trim_start(),
        _ => raw,
    }
}

#[async_trait]
impl GatewayFilter for AuthorizerFilter {
    fn name(&self) -> &str {
        "bearer-authorizer"
    }

    fn order(&self) -> FilterOrder {
        FilterOrder::AUTH
    }

    async fn on_request(&self, ctx: &mut GatewayContext) -> Result<FilterAction, GatewayError> {
        let guarded = match ctx.route_match.as_ref().map(|m| &m.route.authorization) {
            Some(Authorization::Bearer { authorizer_id }) => authorizer_id == &self.authorizer_id,
            Some(Authorization::Open) => false,
            None => true,
        };
        if !guarded {
            return Ok(FilterAction::Continue);
        }

        let Some(raw) = ctx.request.header("authorization") else {
            warn!(request_id = %ctx.request.id, "rejected request: missing bearer token");
            return Ok(FilterAction::Reject(401, UNAUTHORIZED.to_string()));
        };

        let token = bearer_token(raw);
        match (!token.is_empty()).then(|| self.verifier.verify(token)).flatten() {
            Some(principal) => {
                ctx.auth_principal = Some(principal);
                Ok(FilterAction::Continue)
            }
            None => {
                warn!(request_id = %ctx.request.id, authorizer = %self.authorizer_id, "rejected request: invalid bearer token");
                Ok(FilterAction::Reject(401, UNAUTHORIZED.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header};
    use serde::Serialize;
    use streamgate_kernel::{HttpMethod, InboundRequest};

    #[derive(Serialize)]
    struct Claims<'a> {
        sub: &'a str,
        iss: &'a str,
        exp: u64,
    }

    fn far_future() -> u64 {
        4_000_000_000
    }

    fn sign(secret: &str, iss: &str, exp: u64) -> String {
        jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &Claims { sub: "user-42", iss, exp },
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn ctx(auth: Option<&str>) -> GatewayContext {
        let mut req = InboundRequest::new("req-1", HttpMethod::Get, "/streams");
        if let Some(v) = auth {
            req = req.with_header("Authorization", v);
        }
        GatewayContext::new(req)
    }

    fn static_filter() -> AuthorizerFilter {
        AuthorizerFilter::from_config(&AuthorizerConfig {
            id: "pool-auth".into(),
            identity_pool: None,
            jwt_secret: None,
            tokens: vec!["tok-123456789".into()],
        })
    }

    #[test]
    fn bearer_prefix_is_optional() {
        assert_eq!(bearer_token("Bearer abc"), "abc");
        assert_eq!(bearer_token("bearer abc"), "abc");
        assert_eq!(bearer_token("abc"), "abc");
    }

    #[tokio::test]
    async fn missing_header_is_unauthorized() {
        let mut c = ctx(None);
        assert!(matches!(
            static_filter().on_request(&mut c).await.unwrap(),
            FilterAction::Reject(401, _)
        ));
    }

    #[tokio::test]
    async fn known_static_token_passes_and_sets_principal() {
        let mut c = ctx(Some("Bearer tok-123456789"));
        assert_eq!(static_filter().on_request(&mut c).await.unwrap(), FilterAction::Continue);
        assert_eq!(c.auth_principal.as_deref(), Some("static-token-0"));
    }

    #[tokio::test]
    async fn unknown_token_is_unauthorized() {
        let mut c = ctx(Some("Bearer nope"));
        assert!(matches!(
            static_filter().on_request(&mut c).await.unwrap(),
            FilterAction::Reject(401, _)
        ));
    }

    #[test]
    fn static_principal_carries_no_token_material() {
        let verifier = StaticTokenVerifier::new(["first-secret", "second-secret"]);
        let principal = verifier.verify("second-secret").unwrap();
        assert_eq!(principal, "static-token-1");
        assert!(!principal.contains("second"));
        assert!(verifier.verify("second-secre").is_none());
    }

    #[test]
    fn jwt_from_pool_is_accepted() {
        let verifier = JwtVerifier::new("s3cret", Some("eu-west-1_pool"));
        let token = sign("s3cret", "eu-west-1_pool", far_future());
        assert_eq!(verifier.verify(&token).as_deref(), Some("user-42"));
    }

    #[test]
    fn jwt_from_other_issuer_or_key_is_rejected() {
        let verifier = JwtVerifier::new("s3cret", Some("eu-west-1_pool"));
        assert!(verifier.verify(&sign("s3cret", "someone-else", far_future())).is_none());
        assert!(verifier.verify(&sign("other-key", "eu-west-1_pool", far_future())).is_none());
    }

    #[test]
    fn expired_jwt_is_rejected() {
        let verifier = JwtVerifier::new("s3cret", None);
        assert!(verifier.verify(&sign("s3cret", "pool", 1_000)).is_none());
    }
}
