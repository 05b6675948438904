//! API-key filter.
//!
//! Routes marked `api_key_required` only accept requests whose `x-api-key`
//! header names a configured key.  Anything else is answered with `403`.

use async_trait::async_trait;
use std::collections::HashSet;
use streamgate_kernel::{FilterAction, FilterOrder, GatewayContext, GatewayError, GatewayFilter};
use tracing::warn;

pub const API_KEY_HEADER: &str = "x-api-key";

pub struct ApiKeyFilter {
    valid_keys: HashSet<String>,
}

impl ApiKeyFilter {
    pub fn new(valid_keys: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            valid_keys: valid_keys.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl GatewayFilter for ApiKeyFilter {
    fn name(&self) -> &str {
        "api-key"
    }

    fn order(&self) -> FilterOrder {
        FilterOrder::API_KEY
    }

    async fn on_request(&self, ctx: &mut GatewayContext) -> Result<FilterAction, GatewayError> {
        let required = ctx
            .route_match
            .as_ref()
            .map(|m| m.route.api_key_required)
            .unwrap_or(true);
        if !required {
            return Ok(FilterAction::Continue);
        }

        match ctx.request.header(API_KEY_HEADER) {
            Some(key) if self.valid_keys.contains(key) => Ok(FilterAction::Continue),
            Some(_) => {
                warn!(request_id = %ctx.request.id, "rejected request: invalid API key");
                Ok(FilterAction::Reject(403, "Forbidden".to_string()))
            }
            None => {
                warn!(request_id = %ctx.request.id, "rejected request: missing API key");
                Ok(FilterAction::Reject(403, "Forbidden".to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use streamgate_kernel::{HttpMethod, InboundRequest};

    fn ctx(key: Option<&str>) -> GatewayContext {
        let mut req = InboundRequest::new("req-1", HttpMethod::Get, "/streams");
        if let Some(k) = key {
            req = req.with_header("X-Api-Key", k);
        }
        GatewayContext::new(req)
    }

    #[tokio::test]
    async fn valid_key_passes() {
        let filter = ApiKeyFilter::new(["sk-abc"]);
        let mut c = ctx(Some("sk-abc"));
        assert_eq!(filter.on_request(&mut c).await.unwrap(), FilterAction::Continue);
    }

    #[tokio::test]
    async fn missing_key_is_forbidden() {
        let filter = ApiKeyFilter::new(["sk-abc"]);
        let mut c = ctx(None);
        assert!(matches!(
            filter.on_request(&mut c).await.unwrap(),
            FilterAction::Reject(403, _)
        ));
    }

    #[tokio::test]
    async fn unknown_key_is_forbidden() {
        let filter = ApiKeyFilter::new(["good-key"]);
        let mut c = ctx(Some("bad-key"));
        assert!(matches!(
            filter.on_request(&mut c).await.unwrap(),
            FilterAction::Reject(403, _)
        ));
    }
}
