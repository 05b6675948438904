//! Gateway configuration and its one-time resolution.
//!
//! [`ProxyConfig`] is the operator-facing surface, deserialised from a config
//! file or an admin request.  [`ProxyConfig::resolve`] runs the
//! apply-time checks and picks override-or-default for the policy
//! document, the policy name and the PutRecord request template.  The
//! resulting [`ResolvedConfig`] is immutable and is never re-evaluated per
//! request.

pub mod entries;
mod loader;

pub use loader::{detect_format, from_str, load_config, substitute_env_vars, ConfigError, ConfigResult, FileFormat};

use crate::error::GatewayError;
use crate::permission::{AttachedPolicy, ExecutionRole, PermissionFlags, PermissionSet};
use crate::request::RequestTransformer;
use crate::route::{Authorization, RouteSettings, RouteTable};
use crate::template::RequestTemplate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::warn;

/// Lower bound of the integration timeout, in milliseconds.
pub const MIN_TIMEOUT_MS: u64 = 50;
/// Upper bound (and default) of the integration timeout, in milliseconds.
pub const MAX_TIMEOUT_MS: u64 = 29_000;

// ─────────────────────────────────────────────────────────────────────────────
// Authorization mode
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthorizationMode {
    #[default]
    None,
    CognitoUserPools,
}

impl AuthorizationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthorizationMode::None => "NONE",
            AuthorizationMode::CognitoUserPools => "COGNITO_USER_POOLS",
        }
    }
}

impl FromStr for AuthorizationMode {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "NONE" => Ok(AuthorizationMode::None),
            "COGNITO_USER_POOLS" => Ok(AuthorizationMode::CognitoUserPools),
            other => Err(GatewayError::InvalidAuthorizationMode(other.to_string())),
        }
    }
}

impl fmt::Display for AuthorizationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Raw configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Authorizer bound to an external identity pool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthorizerConfig {
    /// Authorizer identity attached to every route.
    pub id: String,
    /// Issuer expected in bearer JWTs (the identity pool URL).
    pub identity_pool: Option<String>,
    /// HS256 secret for verifying bearer JWTs.
    pub jwt_secret: Option<String>,
    /// Opaque tokens accepted as-is.
    pub tokens: Vec<String>,
}

/// Operator-facing gateway configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    pub name: String,
    pub description: Option<String>,
    pub permissions: PermissionFlags,
    /// Stream identifiers the generated `Allow` statements are narrowed to.
    pub stream_arns: Vec<String>,
    /// `NONE` or `COGNITO_USER_POOLS`.
    pub authorization: String,
    pub authorizer: Option<AuthorizerConfig>,
    pub api_key_required: bool,
    pub api_keys: Vec<String>,
    pub execution_role_name: Option<String>,
    /// Replaces the generated policy document verbatim.
    pub custom_policy: Option<String>,
    pub custom_policy_name: Option<String>,
    /// Replaces the built-in PutRecord mapping.
    pub put_record_template: Option<String>,
    pub timeout_ms: u64,
    /// Case-preserving; see [`entries`].
    #[serde(with = "entries")]
    pub tags: BTreeMap<String, String>,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            name: "streamgate".to_string(),
            description: None,
            permissions: PermissionFlags::default(),
            stream_arns: Vec::new(),
            authorization: AuthorizationMode::None.as_str().to_string(),
            authorizer: None,
            api_key_required: false,
            api_keys: Vec::new(),
            execution_role_name: None,
            custom_policy: None,
            custom_policy_name: None,
            put_record_template: None,
            timeout_ms: MAX_TIMEOUT_MS,
            tags: BTreeMap::new(),
        }
    }
}

impl ProxyConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Builder: set the permission flags.
    pub fn with_permissions(mut self, permissions: PermissionFlags) -> Self {
        self.permissions = permissions;
        self
    }

    /// Builder: set the stream resource list.
    pub fn with_stream_arns(mut self, arns: Vec<String>) -> Self {
        self.stream_arns = arns;
        self
    }

    /// Builder: set the integration timeout.
    pub fn with_timeout_ms(mut self, ms: u64) -> Self {
        self.timeout_ms = ms;
        self
    }

    /// Builder: require a bearer token checked by `authorizer`.
    pub fn with_authorizer(mut self, authorizer: AuthorizerConfig) -> Self {
        self.authorization = AuthorizationMode::CognitoUserPools.as_str().to_string();
        self.authorizer = Some(authorizer);
        self
    }

    /// Builder: require one of `keys` in `x-api-key`.
    pub fn with_api_keys(mut self, keys: Vec<String>) -> Self {
        self.api_key_required = true;
        self.api_keys = keys;
        self
    }

    /// Builder: attach a custom policy document.
    pub fn with_custom_policy(mut self, document: impl Into<String>) -> Self {
        self.custom_policy = Some(document.into());
        self
    }

    /// Builder: override the PutRecord mapping.
    pub fn with_put_record_template(mut self, template: impl Into<String>) -> Self {
        self.put_record_template = Some(template.into());
        self
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Resolution
    // ─────────────────────────────────────────────────────────────────────────

    /// Run the apply-time checks and resolve overrides.
    ///
    /// Checks performed (in order):
    /// 1. Gateway name is non-empty.
    /// 2. Timeout is within `MIN_TIMEOUT_MS..=MAX_TIMEOUT_MS`.
    /// 3. Authorization mode is recognised; bearer mode has an authorizer
    ///    with an id and at least one way to verify tokens.
    /// 4. API-key requirement has at least one key.
    /// 5. Role name, if given, is non-blank.
    /// 6. Custom policy, if given, is a JSON object.
    /// 7. PutRecord template, if given, parses.
    pub fn resolve(&self) -> Result<ResolvedConfig, GatewayError> {
        if self.name.trim().is_empty() {
            return Err(GatewayError::EmptyGatewayName);
        }

        if !(MIN_TIMEOUT_MS..=MAX_TIMEOUT_MS).contains(&self.timeout_ms) {
            return Err(GatewayError::InvalidTimeout {
                got: self.timeout_ms,
                min: MIN_TIMEOUT_MS,
                max: MAX_TIMEOUT_MS,
            });
        }

        let mode: AuthorizationMode = self.authorization.parse()?;
        let (authorization, authorizer) = match mode {
            AuthorizationMode::None => (Authorization::Open, None),
            AuthorizationMode::CognitoUserPools => {
                let authorizer = self
                    .authorizer
                    .clone()
                    .ok_or_else(|| GatewayError::InvalidAuthConfig("authorizer".to_string()))?;
                if authorizer.id.trim().is_empty() {
                    return Err(GatewayError::InvalidAuthConfig("authorizer.id".to_string()));
                }
                if authorizer.tokens.is_empty() && authorizer.jwt_secret.is_none() {
                    return Err(GatewayError::InvalidAuthConfig(
                        "authorizer.tokens or authorizer.jwt_secret".to_string(),
                    ));
                }
                (
                    Authorization::Bearer {
                        authorizer_id: authorizer.id.clone(),
                    },
                    Some(authorizer),
                )
            }
        };

        if self.api_key_required && self.api_keys.iter().all(|k| k.trim().is_empty()) {
            return Err(GatewayError::NoApiKeys);
        }

        let role_name = match &self.execution_role_name {
            Some(name) if name.trim().is_empty() => return Err(GatewayError::EmptyRoleName),
            Some(name) => name.clone(),
            None => format!("{}-execution-role", self.name),
        };
        let policy_name = self
            .custom_policy_name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| format!("{role_name}-policy"));

        let permission_set = PermissionSet::new(self.permissions, &self.stream_arns);
        let policy = match &self.custom_policy {
            Some(raw) => {
                let parsed: serde_json::Value = serde_json::from_str(raw)
                    .map_err(|e| GatewayError::InvalidCustomPolicy(e.to_string()))?;
                if !parsed.is_object() {
                    return Err(GatewayError::InvalidCustomPolicy(
                        "policy must be a JSON object".to_string(),
                    ));
                }
                warn!(
                    gateway = %self.name,
                    enabled = ?self.permissions.enabled_operations(),
                    "custom policy attached; route activation still follows permission flags"
                );
                AttachedPolicy::Custom(raw.clone())
            }
            None => AttachedPolicy::Generated(permission_set.policy_document()),
        };

        let template = self
            .put_record_template
            .as_deref()
            .map(RequestTemplate::parse)
            .transpose()?;

        Ok(ResolvedConfig {
            name: self.name.clone(),
            description: self.description.clone(),
            mode,
            permission_set,
            execution_role: ExecutionRole {
                name: role_name,
                policy_name,
                policy,
            },
            route_settings: RouteSettings {
                authorization,
                api_key_required: self.api_key_required,
                timeout_ms: self.timeout_ms,
            },
            authorizer,
            api_keys: self
                .api_keys
                .iter()
                .filter(|k| !k.trim().is_empty())
                .cloned()
                .collect(),
            transformer: RequestTransformer::new(template),
            tags: self.tags.clone(),
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Resolved configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Configuration after validation and override resolution.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub name: String,
    pub description: Option<String>,
    pub mode: AuthorizationMode,
    pub permission_set: PermissionSet,
    pub execution_role: ExecutionRole,
    pub route_settings: RouteSettings,
    pub authorizer: Option<AuthorizerConfig>,
    pub api_keys: Vec<String>,
    pub transformer: RequestTransformer,
    pub tags: BTreeMap<String, String>,
}

impl ResolvedConfig {
    /// Build the route table this configuration activates.
    pub fn route_table(&self) -> Result<RouteTable, GatewayError> {
        RouteTable::build(self.permission_set.flags(), &self.route_settings)
    }
}
