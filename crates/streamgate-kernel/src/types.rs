//! Core data types shared by the router, the filters and the transformers.
//!
//! These carry no runtime dependencies beyond `serde` and `std`.

use crate::operation::Operation;
use crate::route::RouteMatch;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ─────────────────────────────────────────────────────────────────────────────
// HTTP primitives
// ─────────────────────────────────────────────────────────────────────────────

/// HTTP method, covering the verbs the route templates and the admin surface
/// use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl HttpMethod {
    /// Case-insensitive parse from a string slice.
    pub fn from_str_ci(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "GET" => Some(HttpMethod::Get),
            "POST" => Some(HttpMethod::Post),
            "PUT" => Some(HttpMethod::Put),
            "PATCH" => Some(HttpMethod::Patch),
            "DELETE" => Some(HttpMethod::Delete),
            "HEAD" => Some(HttpMethod::Head),
            "OPTIONS" => Some(HttpMethod::Options),
            _ => None,
        }
    }

    /// Return the standard uppercase string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Inbound request / backend call
// ─────────────────────────────────────────────────────────────────────────────

/// An inbound request flowing through the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundRequest {
    /// Correlates this request across logs.
    pub id: String,
    pub method: HttpMethod,
    /// Path without the query string, e.g. `/streams/orders/record`.
    pub path: String,
    /// Decoded query parameters.
    pub query: HashMap<String, String>,
    /// Header names are lowercased.
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl InboundRequest {
    pub fn new(id: impl Into<String>, method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            method,
            path: path.into(),
            query: HashMap::new(),
            headers: HashMap::new(),
            body: Vec::new(),
        }
    }

    /// Builder helper: attach a header.
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into().to_lowercase(), value.into());
        self
    }

    /// Builder helper: attach a query parameter.
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    /// Builder helper: set the body.
    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(String::as_str)
    }
}

/// A fully built backend invocation: the operation plus its JSON argument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendCall {
    pub operation: Operation,
    pub payload: serde_json::Value,
}

// ─────────────────────────────────────────────────────────────────────────────
// Request context
// ─────────────────────────────────────────────────────────────────────────────

/// Mutable context that flows through the filter chain for a single request.
///
/// Filters read from and write to this context, so the principal resolved by
/// the authorizer is visible to the access logger.
#[derive(Debug, Clone)]
pub struct GatewayContext {
    pub request: InboundRequest,
    /// Populated after routing; `None` if routing has not yet occurred.
    pub route_match: Option<RouteMatch>,
    /// Identity principal resolved by the authorizer; `None` if open.
    pub auth_principal: Option<String>,
    /// Free-form attributes written and read by filters.
    pub attributes: HashMap<String, serde_json::Value>,
}

impl GatewayContext {
    pub fn new(request: InboundRequest) -> Self {
        Self {
            request,
            route_match: None,
            auth_principal: None,
            attributes: HashMap::new(),
        }
    }

    /// Builder helper: attach the resolved route.
    pub fn with_route(mut self, route_match: RouteMatch) -> Self {
        self.route_match = Some(route_match);
        self
    }

    /// Read a typed attribute, returning `None` if absent or if
    /// deserialization fails.
    pub fn get_attr<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.attributes
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Write a serializable attribute.
    pub fn set_attr<T: serde::Serialize>(&mut self, key: impl Into<String>, val: &T) {
        if let Ok(v) = serde_json::to_value(val) {
            self.attributes.insert(key.into(), v);
        }
    }
}
