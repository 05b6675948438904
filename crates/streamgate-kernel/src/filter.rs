//! Gateway filter trait and ordering.
//!
//! Filters run after routing and before validation, sorted by
//! [`FilterOrder`] ascending on the request path and descending on the
//! response path.
//!
//! ```text
//! Request  ──► Logging ──► Auth ──► ApiKey ──► (validate, transform, backend)
//! Response ◄── Logging ◄── Auth ◄── ApiKey ◄──
//! ```

use crate::error::GatewayError;
use crate::response::ProxyReply;
use crate::types::GatewayContext;
use async_trait::async_trait;

/// Numeric ordering slot for a filter in the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FilterOrder(pub u32);

impl FilterOrder {
    /// Access logging wraps everything else.
    pub const LOGGING: FilterOrder = FilterOrder(0);
    /// Bearer-token authorizer.
    pub const AUTH: FilterOrder = FilterOrder(100);
    /// API-key check, after the authorizer.
    pub const API_KEY: FilterOrder = FilterOrder(200);
}

/// Instruction returned by [`GatewayFilter::on_request`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum FilterAction {
    /// Pass the request to the next filter.
    Continue,
    /// Short-circuit with the given HTTP status and message.
    Reject(u16, String),
}

/// Kernel contract for a single filter in the gateway pipeline.
#[async_trait]
pub trait GatewayFilter: Send + Sync {
    /// Stable identifier used in logs.
    fn name(&self) -> &str;

    fn order(&self) -> FilterOrder;

    /// Called with the routed request before validation.
    async fn on_request(&self, ctx: &mut GatewayContext) -> Result<FilterAction, GatewayError>;

    /// Called with the reply before it is returned to the caller.
    async fn on_response(&self, _ctx: &GatewayContext, _reply: &mut ProxyReply) -> Result<(), GatewayError> {
        Ok(())
    }
}
