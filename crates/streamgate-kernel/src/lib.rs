//! `streamgate-kernel` — the pure mapping layer of the streamgate proxy.
//!
//! Nothing in this crate performs I/O.  It defines how a declarative
//! configuration becomes an execution-role policy and an immutable route
//! table, and how a routed HTTP request becomes a stream-backend call.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │              streamgate-kernel  (this crate)                │
//! │  ProxyConfig ──resolve()──► ResolvedConfig                  │
//! │      PermissionSet ──► PolicyDocument / ExecutionRole       │
//! │      RouteTable::build(flags) ──► RouteMatch                │
//! │  RequestTransformer ──► BackendCall   shape_response()      │
//! │  GatewayFilter trait    GatewayContext   GatewayError       │
//! └──────────────────────────┬──────────────────────────────────┘
//!                            │  depends on
//! ┌──────────────────────────▼──────────────────────────────────┐
//! │              streamgate-gateway  (runtime crate)            │
//! │  ActivationGate   GatewayServer (axum)   KinesisBackend     │
//! │  AuthorizerFilter / ApiKeyFilter / LoggingFilter            │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick start
//!
//! ```rust
//! use streamgate_kernel::config::ProxyConfig;
//! use streamgate_kernel::permission::PermissionFlags;
//! use streamgate_kernel::operation::Operation;
//!
//! let config = ProxyConfig::new("orders-proxy").with_permissions(
//!     PermissionFlags::default().with(Operation::PutRecord, true),
//! );
//!
//! let resolved = config.resolve().expect("config is valid");
//! let table = resolved.route_table().expect("templates are unique");
//! assert_eq!(table.routes().len(), 1);
//! ```

pub mod config;
pub mod error;
pub mod filter;
pub mod operation;
pub mod permission;
pub mod request;
pub mod response;
pub mod route;
pub mod template;
pub mod types;

// ── Flat re-exports ────────────────────────────────────────────────────────

pub use config::{AuthorizationMode, AuthorizerConfig, ProxyConfig, ResolvedConfig};
pub use error::GatewayError;
pub use filter::{FilterAction, FilterOrder, GatewayFilter};
pub use operation::Operation;
pub use permission::{
    AttachedPolicy, Effect, ExecutionRole, PermissionFlags, PermissionSet, PolicyDocument,
    PolicyStatement, ResourceScope,
};
pub use request::{RequestParams, RequestTransformer, ValidationError};
pub use response::{shape_response, BackendResponse, ProxyReply};
pub use route::{Authorization, Route, RouteLookupError, RouteMatch, RouteSettings, RouteTable};
pub use template::RequestTemplate;
pub use types::{BackendCall, GatewayContext, HttpMethod, InboundRequest};
