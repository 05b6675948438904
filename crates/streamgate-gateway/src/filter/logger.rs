//! Structured access-log filter.
//!
//! Emits one `tracing` event on the way in and one on the way out,
//! recording request id, method, path, route, principal, status and latency.

use async_trait::async_trait;
use streamgate_kernel::{FilterAction, FilterOrder, GatewayContext, GatewayError, GatewayFilter, ProxyReply};
use tracing::{info, warn};

const START_ATTR: &str = "log.request_start_ms";

#[derive(Default)]
pub struct LoggingFilter;

impl LoggingFilter {
    pub fn new() -> Self {
        Self
    }
}

fn route_id(ctx: &GatewayContext) -> &str {
    ctx.route_match.as_ref().map(|m| m.route.id()).unwrap_or("-")
}

#[async_trait]
impl GatewayFilter for LoggingFilter {
    fn name(&self) -> &str {
        "access-log"
    }

    fn order(&self) -> FilterOrder {
        FilterOrder::LOGGING
    }

    async fn on_request(&self, ctx: &mut GatewayContext) -> Result<FilterAction, GatewayError> {
        info!(
            request_id = %ctx.request.id,
            method     = ctx.request.method.as_str(),
            path       = %ctx.request.path,
            route      = route_id(ctx),
            "→ inbound request"
        );
        ctx.set_attr(START_ATTR, &now_ms());
        Ok(FilterAction::Continue)
    }

    async fn on_response(&self, ctx: &GatewayContext, reply: &mut ProxyReply) -> Result<(), GatewayError> {
        let start_ms: u64 = ctx.get_attr(START_ATTR).unwrap_or(0);
        let elapsed = now_ms().saturating_sub(start_ms);

        if reply.status >= 500 {
            warn!(
                request_id = %ctx.request.id,
                route      = route_id(ctx),
                principal  = ?ctx.auth_principal,
                status     = reply.status,
                latency_ms = elapsed,
                "← backend failure"
            );
        } else {
            info!(
                request_id = %ctx.request.id,
                route      = route_id(ctx),
                principal  = ?ctx.auth_principal,
                status     = reply.status,
                latency_ms = elapsed,
                "← outbound response"
            );
        }
        Ok(())
    }
}

fn now_ms() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    u64::try_from(
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis(),
    )
    .unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use streamgate_kernel::{HttpMethod, InboundRequest};

    #[tokio::test]
    async fn request_hook_records_start_time() {
        let filter = LoggingFilter::new();
        let mut ctx = GatewayContext::new(InboundRequest::new("r1", HttpMethod::Get, "/streams"));
        assert_eq!(filter.on_request(&mut ctx).await.unwrap(), FilterAction::Continue);
        assert!(ctx.get_attr::<u64>(START_ATTR).is_some());
    }
}
