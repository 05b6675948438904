//! Service settings: where to listen, where the backend lives, and the
//! gateway configuration to apply at startup.
//!
//! ```toml
//! [server]
//! listen = "0.0.0.0:8080"
//! admin_listen = "127.0.0.1:8081"
//! admin_token = "${STREAMGATE_ADMIN_TOKEN}"
//!
//! [backend]
//! region = "eu-west-1"
//!
//! [gateway]
//! name = "orders-proxy"
//! stream_arns = ["arn:aws:kinesis:eu-west-1:123456789012:stream/orders"]
//!
//! [gateway.permissions]
//! put_record = true
//!
//! # Keys are lowercased in tables; entry lists keep their case.
//! [[gateway.tags]]
//! key = "CostCenter"
//! value = "Eng"
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use streamgate_kernel::ProxyConfig;
use streamgate_kernel::config::{ConfigResult, load_config};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub listen: String,
    pub admin_listen: String,
    /// Bearer token required on the admin surface; open when unset.
    pub admin_token: Option<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:8080".to_string(),
            admin_listen: "127.0.0.1:8081".to_string(),
            admin_token: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendSettings {
    /// Overrides the regional endpoint, e.g. for a local emulator.
    pub endpoint: Option<String>,
    pub region: String,
    /// Extra headers sent with every backend call.
    #[serde(with = "streamgate_kernel::config::entries")]
    pub headers: BTreeMap<String, String>,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            endpoint: None,
            region: "us-east-1".to_string(),
            headers: BTreeMap::new(),
        }
    }
}

impl BackendSettings {
    pub fn endpoint_url(&self) -> String {
        self.endpoint
            .clone()
            .unwrap_or_else(|| format!("https://kinesis.{}.amazonaws.com", self.region))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub server: ServerSettings,
    pub backend: BackendSettings,
    pub gateway: ProxyConfig,
}

impl ServiceConfig {
    /// Load from a TOML/YAML/JSON/... file with `STREAMGATE__*` overrides.
    pub fn load(path: &str) -> ConfigResult<Self> {
        load_config(path)
    }
}
