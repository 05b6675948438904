//! Activation gate.
//!
//! Applying a configuration only *stages* a compiled revision.  Live traffic
//! keeps using the previously deployed revision until [`ActivationGate::deploy`]
//! is called explicitly; nothing in this crate deploys on its own.
//!
//! ```text
//! apply(cfg) ──► staged: Revision n      live: Revision m (or none)
//! deploy(..) ──► staged: Revision n      live: Revision n   + Deployment record
//! ```

use crate::error::{ProxyError, ProxyResult};
use crate::filter::FilterPipeline;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use streamgate_kernel::{ProxyConfig, ResolvedConfig, RouteTable};
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

/// A validated configuration compiled into its route table and filter chain.
pub struct Revision {
    pub number: u64,
    pub config: ResolvedConfig,
    pub table: RouteTable,
    pub pipeline: FilterPipeline,
}

/// Record of one explicit promotion to live.
#[derive(Debug, Clone, Serialize)]
pub struct Deployment {
    pub id: String,
    pub revision: u64,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Identifiers of the provisioned gateway, plus the names of what it runs as.
#[derive(Debug, Clone, Serialize)]
pub struct GatewayOutputs {
    pub rest_api_id: String,
    pub root_resource_id: String,
    pub execution_role_name: Option<String>,
    pub policy_name: Option<String>,
    pub tags: BTreeMap<String, String>,
}

#[derive(Default)]
struct GateState {
    staged: Option<Arc<Revision>>,
    live: Option<Arc<Revision>>,
    deployments: Vec<Deployment>,
    next_revision: u64,
}

pub struct ActivationGate {
    rest_api_id: String,
    root_resource_id: String,
    state: RwLock<GateState>,
}

impl Default for ActivationGate {
    fn default() -> Self {
        Self::new()
    }
}

fn short_id() -> String {
    Uuid::new_v4().simple().to_string()[..10].to_string()
}

impl ActivationGate {
    /// Provision a gateway with fresh identifiers and no live revision.
    pub fn new() -> Self {
        Self {
            rest_api_id: short_id(),
            root_resource_id: short_id(),
            state: RwLock::new(GateState {
                next_revision: 1,
                ..GateState::default()
            }),
        }
    }

    /// Validate and stage `config`.  Live traffic is untouched.
    pub async fn apply(&self, config: &ProxyConfig) -> ProxyResult<u64> {
        let resolved = config.resolve()?;
        let table = resolved.route_table()?;
        let pipeline = FilterPipeline::for_config(&resolved);

        let mut state = self.state.write().await;
        let number = state.next_revision;
        state.next_revision += 1;

        info!(
            gateway = %resolved.name,
            revision = number,
            routes = table.routes().len(),
            "configuration staged"
        );
        state.staged = Some(Arc::new(Revision {
            number,
            config: resolved,
            table,
            pipeline,
        }));
        Ok(number)
    }

    /// Promote the staged revision to live.
    pub async fn deploy(&self, description: Option<String>) -> ProxyResult<Deployment> {
        let mut state = self.state.write().await;
        let staged = state.staged.clone().ok_or(ProxyError::NothingStaged)?;

        let deployment = Deployment {
            id: short_id(),
            revision: staged.number,
            description,
            created_at: Utc::now(),
        };
        state.live = Some(staged);
        state.deployments.push(deployment.clone());

        info!(
            deployment = %deployment.id,
            revision = deployment.revision,
            "revision deployed"
        );
        Ok(deployment)
    }

    /// The revision serving traffic, if any has been deployed.
    pub async fn live(&self) -> Option<Arc<Revision>> {
        self.state.read().await.live.clone()
    }

    pub async fn staged(&self) -> Option<Arc<Revision>> {
        self.state.read().await.staged.clone()
    }

    pub async fn deployments(&self) -> Vec<Deployment> {
        self.state.read().await.deployments.clone()
    }

    /// Outputs reflect the most recently applied configuration.
    pub async fn outputs(&self) -> GatewayOutputs {
        let state = self.state.read().await;
        let current = state.staged.as_ref().or(state.live.as_ref());
        GatewayOutputs {
            rest_api_id: self.rest_api_id.clone(),
            root_resource_id: self.root_resource_id.clone(),
            execution_role_name: current.map(|r| r.config.execution_role.name.clone()),
            policy_name: current.map(|r| r.config.execution_role.policy_name.clone()),
            tags: current.map(|r| r.config.tags.clone()).unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use streamgate_kernel::{HttpMethod, Operation, PermissionFlags};

    fn config(op: Operation) -> ProxyConfig {
        ProxyConfig::new("orders").with_permissions(PermissionFlags::default().with(op, true))
    }

    #[tokio::test]
    async fn nothing_is_live_before_first_deploy() {
        let gate = ActivationGate::new();
        gate.apply(&config(Operation::ListStreams)).await.unwrap();
        assert!(gate.live().await.is_none());
        assert!(gate.staged().await.is_some());
    }

    #[tokio::test]
    async fn deploy_without_staged_revision_fails() {
        let gate = ActivationGate::new();
        assert!(matches!(gate.deploy(None).await, Err(ProxyError::NothingStaged)));
    }

    #[tokio::test]
    async fn apply_after_deploy_does_not_change_live_routes() {
        let gate = ActivationGate::new();
        gate.apply(&config(Operation::ListStreams)).await.unwrap();
        let first = gate.deploy(Some("initial".into())).await.unwrap();
        assert_eq!(first.revision, 1);

        gate.apply(&config(Operation::ListShards)).await.unwrap();
        let live = gate.live().await.unwrap();
        assert_eq!(live.number, 1);
        assert!(live.table.resolve(HttpMethod::Get, "/streams").is_ok());
        assert!(live.table.resolve(HttpMethod::Get, "/shards").is_err());

        let second = gate.deploy(None).await.unwrap();
        assert_eq!(second.revision, 2);
        assert!(gate.live().await.unwrap().table.resolve(HttpMethod::Get, "/shards").is_ok());
        assert_eq!(gate.deployments().await.len(), 2);
    }

    #[tokio::test]
    async fn invalid_config_is_rejected_at_apply() {
        let gate = ActivationGate::new();
        let err = gate.apply(&ProxyConfig::new("x").with_timeout_ms(10)).await.unwrap_err();
        assert!(matches!(err, ProxyError::Config(_)));
        assert!(gate.staged().await.is_none());
    }

    #[tokio::test]
    async fn outputs_are_stable_and_name_the_role() {
        let gate = ActivationGate::new();
        let before = gate.outputs().await;
        assert_eq!(before.rest_api_id.len(), 10);
        assert!(before.execution_role_name.is_none());

        gate.apply(&config(Operation::PutRecord)).await.unwrap();
        let after = gate.outputs().await;
        assert_eq!(after.rest_api_id, before.rest_api_id);
        assert_eq!(after.root_resource_id, before.root_resource_id);
        assert_eq!(after.execution_role_name.as_deref(), Some("orders-execution-role"));
        assert_eq!(after.policy_name.as_deref(), Some("orders-execution-role-policy"));
    }
}
