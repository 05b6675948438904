//! CLI command definitions using clap

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// streamgate - HTTP proxy in front of a Kinesis-style stream service
#[derive(Parser)]
#[command(name = "streamgate")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true, env = "STREAMGATE_LOG_JSON")]
    pub log_json: bool,

    /// Enable debug output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Apply the configuration and serve the proxy and admin listeners
    Serve {
        /// Service configuration file (TOML, YAML, JSON, ...)
        #[arg(short, long, env = "STREAMGATE_CONFIG", default_value = "streamgate.toml")]
        config: PathBuf,

        /// Deploy the applied configuration immediately
        #[arg(long)]
        deploy: bool,
    },

    /// Print the execution role, trust policy and permission policy
    Policy {
        #[arg(short, long, env = "STREAMGATE_CONFIG", default_value = "streamgate.toml")]
        config: PathBuf,
    },

    /// Print the routes the configuration would activate
    Routes {
        #[arg(short, long, env = "STREAMGATE_CONFIG", default_value = "streamgate.toml")]
        config: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serve_parses_deploy_flag() {
        let cli = Cli::parse_from(["streamgate", "serve", "-c", "gw.yaml", "--deploy"]);
        match cli.command {
            Commands::Serve { config, deploy } => {
                assert_eq!(config, PathBuf::from("gw.yaml"));
                assert!(deploy);
            }
            _ => panic!("expected serve"),
        }
    }

    #[test]
    fn deploy_is_off_by_default() {
        let cli = Cli::parse_from(["streamgate", "serve", "-c", "gw.toml"]);
        assert!(matches!(cli.command, Commands::Serve { deploy: false, .. }));
    }
}
