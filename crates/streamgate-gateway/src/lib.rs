//! `streamgate-gateway` — the streamgate proxy runtime.
//!
//! Concrete implementations of the kernel contracts in `streamgate-kernel`:
//!
//! | Kernel contract | Implementation |
//! |----------------|----------------|
//! | [`GatewayFilter`](streamgate_kernel::GatewayFilter) | [`filter::LoggingFilter`], [`filter::AuthorizerFilter`], [`filter::ApiKeyFilter`] |
//! | [`BackendCall`](streamgate_kernel::BackendCall) executor | [`backend::KinesisBackend`] |
//!
//! [`activation::ActivationGate`] holds the staged and live revisions, and
//! [`server::GatewayServer`] serves them over axum.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use streamgate_gateway::backend::KinesisBackend;
//! use streamgate_gateway::server::GatewayServer;
//! use streamgate_gateway::settings::ServerSettings;
//! use streamgate_kernel::{Operation, PermissionFlags, ProxyConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let backend = KinesisBackend::new("http://localhost:4566", Default::default())?;
//!     let server = GatewayServer::new(ServerSettings::default(), Arc::new(backend));
//!
//!     let gate = server.gate();
//!     gate.apply(&ProxyConfig::new("orders-proxy").with_permissions(
//!         PermissionFlags::default().with(Operation::PutRecord, true),
//!     ))
//!     .await?;
//!     gate.deploy(Some("first release".into())).await?;
//!
//!     server.start().await?;
//!     Ok(())
//! }
//! ```

pub mod activation;
pub mod backend;
pub mod cli;
pub mod error;
pub mod filter;
pub mod handlers;
pub mod server;
pub mod settings;

pub use streamgate_kernel as kernel;
