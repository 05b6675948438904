//! Route templates and the immutable route table built from them.
//!
//! The HTTP surface is fixed: one [`RouteTemplate`] per [`Operation`].  A
//! [`RouteTable`] is built once per configuration revision by keeping the
//! templates whose permission flag is on.  A disabled operation has *no*
//! route, so requests to it resolve to [`RouteLookupError::NotFound`] rather
//! than to a route that always denies.
//!
//! Path patterns use the `{param}` template syntax:
//! ```text
//! /streams                    — exact path
//! /streams/{name}             — captures `name`
//! /streams/{name}/records     — captures `name`
//! ```

use crate::error::GatewayError;
use crate::operation::Operation;
use crate::permission::PermissionFlags;
use crate::types::HttpMethod;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

// ─────────────────────────────────────────────────────────────────────────────
// Parameter contract
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamLocation {
    Path,
    Query,
    Header,
    /// Top-level field of the JSON request body.
    Body,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParamSpec {
    pub name: &'static str,
    pub location: ParamLocation,
    pub required: bool,
}

impl ParamSpec {
    const fn required(name: &'static str, location: ParamLocation) -> Self {
        Self {
            name,
            location,
            required: true,
        }
    }

    const fn optional(name: &'static str, location: ParamLocation) -> Self {
        Self {
            name,
            location,
            required: false,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Templates
// ─────────────────────────────────────────────────────────────────────────────

/// Static binding of an HTTP method + path to one backend operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteTemplate {
    pub id: &'static str,
    pub method: HttpMethod,
    pub path_pattern: &'static str,
    pub operation: Operation,
    pub params: Vec<ParamSpec>,
}

/// The fixed set of route templates, one per operation.
pub fn route_templates() -> Vec<RouteTemplate> {
    use ParamLocation::{Body, Header, Path, Query};

    vec![
        RouteTemplate {
            id: "get-records",
            method: HttpMethod::Get,
            path_pattern: "/records",
            operation: Operation::GetRecords,
            params: vec![
                ParamSpec::required("ShardIterator", Header),
                ParamSpec::optional("Limit", Header),
            ],
        },
        RouteTemplate {
            id: "list-shards",
            method: HttpMethod::Get,
            path_pattern: "/shards",
            operation: Operation::ListShards,
            params: vec![
                ParamSpec::optional("StreamName", Query),
                ParamSpec::optional("NextToken", Query),
                ParamSpec::optional("MaxResults", Query),
            ],
        },
        RouteTemplate {
            id: "list-streams",
            method: HttpMethod::Get,
            path_pattern: "/streams",
            operation: Operation::ListStreams,
            params: vec![],
        },
        RouteTemplate {
            id: "describe-stream",
            method: HttpMethod::Get,
            path_pattern: "/streams/{name}",
            operation: Operation::DescribeStream,
            params: vec![ParamSpec::required("name", Path)],
        },
        RouteTemplate {
            id: "put-record",
            method: HttpMethod::Put,
            path_pattern: "/streams/{name}/record",
            operation: Operation::PutRecord,
            params: vec![
                ParamSpec::required("name", Path),
                ParamSpec::required("Data", Body),
                ParamSpec::required("PartitionKey", Body),
            ],
        },
        RouteTemplate {
            id: "put-records",
            method: HttpMethod::Put,
            path_pattern: "/streams/{name}/records",
            operation: Operation::PutRecords,
            params: vec![
                ParamSpec::required("name", Path),
                ParamSpec::required("Records", Body),
            ],
        },
        RouteTemplate {
            id: "get-shard-iterator",
            method: HttpMethod::Get,
            path_pattern: "/streams/{name}/sharditerator",
            operation: Operation::GetShardIterator,
            params: vec![
                ParamSpec::required("name", Path),
                ParamSpec::required("ShardId", Query),
                ParamSpec::optional("ShardIteratorType", Query),
                ParamSpec::optional("StartingSequenceNumber", Query),
                ParamSpec::optional("Timestamp", Query),
            ],
        },
    ]
}

// ─────────────────────────────────────────────────────────────────────────────
// Routes
// ─────────────────────────────────────────────────────────────────────────────

/// How callers of a route must authenticate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Authorization {
    Open,
    /// Bearer token checked by the named authorizer.
    Bearer { authorizer_id: String },
}

/// Settings every active route inherits from the resolved configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteSettings {
    pub authorization: Authorization,
    pub api_key_required: bool,
    pub timeout_ms: u64,
}

/// An active route: a template plus the settings it was activated with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Route {
    #[serde(flatten)]
    pub template: RouteTemplate,
    pub authorization: Authorization,
    pub api_key_required: bool,
    pub timeout_ms: u64,
}

impl Route {
    pub fn id(&self) -> &'static str {
        self.template.id
    }

    pub fn operation(&self) -> Operation {
        self.template.operation
    }
}

/// The result of a successful route lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch {
    pub route: Route,
    /// Path parameters extracted from the URL template.
    pub path_params: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteLookupError {
    NotFound,
    /// The path exists but is not bound for this method.
    MethodNotAllowed(Vec<HttpMethod>),
}

/// Immutable set of active routes for one configuration revision.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    /// An empty table; every lookup is `NotFound`.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Keep each template iff its operation's flag is on.
    pub fn build(flags: &PermissionFlags, settings: &RouteSettings) -> Result<Self, GatewayError> {
        let mut seen: HashSet<(HttpMethod, &'static str)> = HashSet::new();
        let mut routes = Vec::new();

        for template in route_templates() {
            if !template.path_pattern.starts_with('/') {
                return Err(GatewayError::InvalidPathPattern(
                    template.id.to_string(),
                    "path pattern must start with '/'".to_string(),
                ));
            }
            if !seen.insert((template.method, template.path_pattern)) {
                return Err(GatewayError::DuplicateRoute(template.id.to_string()));
            }
            if !flags.is_enabled(template.operation) {
                continue;
            }
            routes.push(Route {
                template,
                authorization: settings.authorization.clone(),
                api_key_required: settings.api_key_required,
                timeout_ms: settings.timeout_ms,
            });
        }

        Ok(Self { routes })
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn get(&self, op: Operation) -> Option<&Route> {
        self.routes.iter().find(|r| r.operation() == op)
    }

    /// Methods bound to `path`, in table order.  Empty when the path is
    /// unknown.
    pub fn methods_for(&self, path: &str) -> Vec<HttpMethod> {
        self.routes
            .iter()
            .filter(|r| match_path(r.template.path_pattern, path).is_some())
            .map(|r| r.template.method)
            .collect()
    }

    /// Resolve a request `(method, path)` to its route.
    pub fn resolve(&self, method: HttpMethod, path: &str) -> Result<RouteMatch, RouteLookupError> {
        let mut allowed = Vec::new();
        for route in &self.routes {
            let Some(path_params) = match_path(route.template.path_pattern, path) else {
                continue;
            };
            if route.template.method == method {
                return Ok(RouteMatch {
                    route: route.clone(),
                    path_params,
                });
            }
            allowed.push(route.template.method);
        }

        if allowed.is_empty() {
            Err(RouteLookupError::NotFound)
        } else {
            Err(RouteLookupError::MethodNotAllowed(allowed))
        }
    }
}

/// Match a concrete path against a template such as `/streams/{name}`.
///
/// Captured segments must be non-empty.
fn match_path(template: &str, path: &str) -> Option<HashMap<String, String>> {
    let t_parts: Vec<&str> = template.trim_matches('/').split('/').collect();
    let p_parts: Vec<&str> = path.trim_matches('/').split('/').collect();

    if t_parts.len() != p_parts.len() {
        return None;
    }

    let mut params = HashMap::new();
    for (t, p) in t_parts.iter().zip(p_parts.iter()) {
        if let Some(name) = t.strip_prefix('{').and_then(|t| t.strip_suffix('}')) {
            if p.is_empty() {
                return None;
            }
            params.insert(name.to_string(), p.to_string());
        } else if t != p {
            return None;
        }
    }
    Some(params)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn open_settings() -> RouteSettings {
        RouteSettings {
            authorization: Authorization::Open,
            api_key_required: false,
            timeout_ms: 29_000,
        }
    }

    fn full_table() -> RouteTable {
        RouteTable::build(&PermissionFlags::all(), &open_settings()).unwrap()
    }

    #[test]
    fn methods_for_lists_bound_methods_only() {
        let table = full_table();
        assert_eq!(table.methods_for("/streams/orders/record"), vec![HttpMethod::Put]);
        assert_eq!(table.methods_for("/streams"), vec![HttpMethod::Get]);
        assert!(table.methods_for("/nowhere").is_empty());
    }

    #[test]
    fn templates_bind_unique_method_and_path() {
        let templates = route_templates();
        assert_eq!(templates.len(), Operation::ALL.len());
        let bindings: HashSet<_> = templates.iter().map(|t| (t.method, t.path_pattern)).collect();
        assert_eq!(bindings.len(), templates.len());
        let ops: HashSet<_> = templates.iter().map(|t| t.operation).collect();
        assert_eq!(ops.len(), Operation::ALL.len());
    }

    #[test]
    fn disabled_operations_produce_no_route() {
        let flags = PermissionFlags::default().with(Operation::ListStreams, true);
        let table = RouteTable::build(&flags, &open_settings()).unwrap();
        assert_eq!(table.routes().len(), 1);
        assert!(table.get(Operation::PutRecord).is_none());
        assert_eq!(
            table.resolve(HttpMethod::Put, "/streams/orders/record"),
            Err(RouteLookupError::NotFound)
        );
        assert!(table.resolve(HttpMethod::Get, "/streams").is_ok());
    }

    #[test]
    fn no_flags_means_empty_table() {
        let table = RouteTable::build(&PermissionFlags::default(), &open_settings()).unwrap();
        assert!(table.is_empty());
        assert_eq!(
            table.resolve(HttpMethod::Get, "/streams"),
            Err(RouteLookupError::NotFound)
        );
    }

    #[test]
    fn param_path_extracts_stream_name() {
        let m = full_table()
            .resolve(HttpMethod::Put, "/streams/orders/records")
            .unwrap();
        assert_eq!(m.route.operation(), Operation::PutRecords);
        assert_eq!(m.path_params.get("name").unwrap(), "orders");
    }

    #[test]
    fn exact_paths_do_not_capture() {
        let m = full_table().resolve(HttpMethod::Get, "/streams").unwrap();
        assert_eq!(m.route.operation(), Operation::ListStreams);
        assert!(m.path_params.is_empty());
    }

    #[test]
    fn wrong_method_on_known_path_is_method_not_allowed() {
        assert_eq!(
            full_table().resolve(HttpMethod::Get, "/streams/orders/record"),
            Err(RouteLookupError::MethodNotAllowed(vec![HttpMethod::Put]))
        );
    }

    #[test]
    fn empty_capture_segment_does_not_match() {
        assert_eq!(
            full_table().resolve(HttpMethod::Put, "/streams//record"),
            Err(RouteLookupError::NotFound)
        );
    }

    #[test]
    fn routes_inherit_settings() {
        let settings = RouteSettings {
            authorization: Authorization::Bearer {
                authorizer_id: "pool-authorizer".to_string(),
            },
            api_key_required: true,
            timeout_ms: 5_000,
        };
        let table = RouteTable::build(&PermissionFlags::all(), &settings).unwrap();
        for route in table.routes() {
            assert_eq!(route.authorization, settings.authorization);
            assert!(route.api_key_required);
            assert_eq!(route.timeout_ms, 5_000);
        }
    }
}
