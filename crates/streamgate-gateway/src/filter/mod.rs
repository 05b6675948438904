//! Filter module.

mod api_key;
mod authorizer;
mod logger;

pub use api_key::ApiKeyFilter;
pub use authorizer::{
    AuthorizerFilter, ChainVerifier, JwtVerifier, StaticTokenVerifier, TokenVerifier, bearer_token,
};
pub use logger::LoggingFilter;

use std::sync::Arc;
use streamgate_kernel::{
    AuthorizationMode, FilterAction, GatewayContext, GatewayError, GatewayFilter, ProxyReply,
    ResolvedConfig,
};

/// Ordered list of boxed filters executed as a pipeline.
///
/// Filters are sorted by [`FilterOrder`](streamgate_kernel::FilterOrder) in
/// ascending order (lowest value runs first on request path).
pub struct FilterPipeline {
    filters: Vec<Arc<dyn GatewayFilter>>,
}

impl FilterPipeline {
    pub fn new(mut filters: Vec<Arc<dyn GatewayFilter>>) -> Self {
        filters.sort_by_key(|f| f.order());
        Self { filters }
    }

    /// The filters a resolved configuration calls for.
    ///
    /// Access logging is always present; the authorizer only in
    /// `COGNITO_USER_POOLS` mode, the key check only when keys are required.
    pub fn for_config(config: &ResolvedConfig) -> Self {
        let mut filters: Vec<Arc<dyn GatewayFilter>> = vec![Arc::new(LoggingFilter::new())];

        if config.mode == AuthorizationMode::CognitoUserPools {
            if let Some(authorizer) = &config.authorizer {
                filters.push(Arc::new(AuthorizerFilter::from_config(authorizer)));
            }
        }
        if config.route_settings.api_key_required {
            filters.push(Arc::new(ApiKeyFilter::new(config.api_keys.clone())));
        }

        Self::new(filters)
    }

    pub fn names(&self) -> Vec<&str> {
        self.filters.iter().map(|f| f.name()).collect()
    }

    /// Run `on_request` hooks in ascending order, stopping at the first
    /// non-`Continue` action.
    pub async fn run_request(&self, ctx: &mut GatewayContext) -> Result<FilterAction, GatewayError> {
        for filter in &self.filters {
            match filter.on_request(ctx).await? {
                FilterAction::Continue => {}
                other => return Ok(other),
            }
        }
        Ok(FilterAction::Continue)
    }

    /// Run `on_response` hooks in descending order.
    pub async fn run_response(&self, ctx: &GatewayContext, reply: &mut ProxyReply) -> Result<(), GatewayError> {
        for filter in self.filters.iter().rev() {
            filter.on_response(ctx, reply).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use streamgate_kernel::{AuthorizerConfig, ProxyConfig};

    #[test]
    fn open_config_only_logs() {
        let resolved = ProxyConfig::new("p").resolve().unwrap();
        assert_eq!(FilterPipeline::for_config(&resolved).names(), vec!["access-log"]);
    }

    #[test]
    fn filters_are_sorted_by_order() {
        let resolved = ProxyConfig::new("p")
            .with_api_keys(vec!["k1".into()])
            .with_authorizer(AuthorizerConfig {
                id: "pool-auth".into(),
                identity_pool: None,
                jwt_secret: None,
                tokens: vec!["t1".into()],
            })
            .resolve()
            .unwrap();
        assert_eq!(
            FilterPipeline::for_config(&resolved).names(),
            vec!["access-log", "bearer-authorizer", "api-key"]
        );
    }
}
