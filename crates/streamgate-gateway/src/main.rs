//! streamgate - entry point.
//!
//! ```text
//! streamgate serve  -c streamgate.toml [--deploy]
//! streamgate policy -c streamgate.toml
//! streamgate routes -c streamgate.toml
//! ```
//!
//! `serve` stages the configured gateway but only deploys it with
//! `--deploy`; otherwise deployment happens through
//! `POST /admin/deployments`.

use anyhow::Context;
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use streamgate_gateway::backend::KinesisBackend;
use streamgate_gateway::cli::{Cli, Commands};
use streamgate_gateway::server::GatewayServer;
use streamgate_gateway::settings::ServiceConfig;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn init_tracing(json: bool, verbose: bool) -> anyhow::Result<()> {
    let directive = if verbose { "streamgate=debug" } else { "streamgate=info" };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(directive))
        .context("invalid log filter")?;

    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
    Ok(())
}

fn load(path: &Path) -> anyhow::Result<ServiceConfig> {
    let path = path.to_str().context("config path is not valid UTF-8")?;
    ServiceConfig::load(path).with_context(|| format!("loading {path}"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json, cli.verbose)?;

    match cli.command {
        Commands::Serve { config, deploy } => {
            let service = load(&config)?;
            let backend = KinesisBackend::new(service.backend.endpoint_url(), service.backend.headers.clone())?;
            let server = GatewayServer::new(service.server.clone(), Arc::new(backend));

            let gate = server.gate();
            let revision = gate.apply(&service.gateway).await?;
            let outputs = gate.outputs().await;
            info!(
                revision,
                rest_api_id = %outputs.rest_api_id,
                root_resource_id = %outputs.root_resource_id,
                "configuration applied"
            );
            if deploy {
                gate.deploy(Some("deployed at startup".to_string())).await?;
            } else {
                info!("not deployed; POST /admin/deployments to go live");
            }

            server.start().await?;
        }
        Commands::Policy { config } => {
            let resolved = load(&config)?.gateway.resolve()?;
            let role = &resolved.execution_role;
            println!("role: {}", role.name);
            println!("policy: {}", role.policy_name);
            println!("trust policy:\n{}", serde_json::to_string_pretty(&role.assume_role_policy())?);
            println!("permission policy:\n{}", role.policy.document_json());
        }
        Commands::Routes { config } => {
            let resolved = load(&config)?.gateway.resolve()?;
            for route in resolved.route_table()?.routes() {
                println!(
                    "{:<7} {:<32} {:<22} timeout={}ms",
                    route.template.method.as_str(),
                    route.template.path_pattern,
                    route.operation().target(),
                    route.timeout_ms,
                );
            }
        }
    }
    Ok(())
}
