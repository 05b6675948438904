//! Request validation and the per-route request transformer.
//!
//! [`RequestTransformer::transform`] runs in two steps:
//!
//! 1. **Validate** the inbound request against the route's parameter
//!    contract, producing [`RequestParams`].  A required parameter that is
//!    absent fails with [`ValidationError::MissingParameter`].
//! 2. **Build** the backend argument object with explicit presence checks.
//!    Optional parameters that are absent are omitted, never sent as empty
//!    strings or `null`.
//!
//! "Present" means the string form is non-empty: `?NextToken=` counts as
//! absent.

use crate::operation::Operation;
use crate::route::{ParamLocation, Route, RouteMatch};
use crate::template::RequestTemplate;
use crate::types::{BackendCall, InboundRequest};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{Map, Number, Value};
use std::collections::HashMap;
use thiserror::Error;

/// Default iterator type when the caller does not pick one.
pub const DEFAULT_SHARD_ITERATOR_TYPE: &str = "TRIM_HORIZON";

/// Request-time validation failure; always answered with `400`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("missing required {location} parameter '{name}'")]
    MissingParameter { name: String, location: String },

    #[error("parameter '{name}' must be numeric, got '{value}'")]
    NotNumeric { name: String, value: String },

    #[error("request body is not valid JSON: {0}")]
    InvalidBody(String),

    #[error("record {index} is missing '{field}'")]
    InvalidRecord { index: usize, field: String },
}

// ─────────────────────────────────────────────────────────────────────────────
// Validated parameters
// ─────────────────────────────────────────────────────────────────────────────

/// Inputs of one request after validation.  Only non-empty values survive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestParams {
    path: HashMap<String, String>,
    query: HashMap<String, String>,
    headers: HashMap<String, String>,
    body: Option<Value>,
}

impl RequestParams {
    pub fn new(
        path: HashMap<String, String>,
        query: HashMap<String, String>,
        headers: HashMap<String, String>,
        body: Option<Value>,
    ) -> Self {
        let keep = |m: HashMap<String, String>| {
            m.into_iter()
                .filter(|(_, v)| !v.is_empty())
                .collect::<HashMap<_, _>>()
        };
        Self {
            path: keep(path),
            query: keep(query),
            headers: keep(
                headers
                    .into_iter()
                    .map(|(k, v)| (k.to_lowercase(), v))
                    .collect(),
            ),
            body,
        }
    }

    pub fn path(&self, name: &str) -> Option<&str> {
        self.path.get(name).map(String::as_str)
    }

    pub fn query(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(String::as_str)
    }

    /// Top-level body field; `null` and `""` count as absent.
    pub fn body_field(&self, name: &str) -> Option<&Value> {
        self.body
            .as_ref()
            .and_then(|b| b.get(name))
            .filter(|v| is_present(v))
    }

    fn get(&self, name: &str, location: ParamLocation) -> Option<Value> {
        let text = |s: &str| Value::String(s.to_string());
        match location {
            ParamLocation::Path => self.path(name).map(text),
            ParamLocation::Query => self.query(name).map(text),
            ParamLocation::Header => self.header(name).map(text),
            ParamLocation::Body => self.body_field(name).cloned(),
        }
    }
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

fn location_name(location: ParamLocation) -> &'static str {
    match location {
        ParamLocation::Path => "path",
        ParamLocation::Query => "query",
        ParamLocation::Header => "header",
        ParamLocation::Body => "body",
    }
}

/// Check the route's parameter contract against the request.
pub fn validate(route_match: &RouteMatch, request: &InboundRequest) -> Result<RequestParams, ValidationError> {
    let route = &route_match.route;
    let wants_body = route
        .template
        .params
        .iter()
        .any(|p| p.location == ParamLocation::Body);

    let body = if wants_body && !request.body.is_empty() {
        Some(
            serde_json::from_slice::<Value>(&request.body)
                .map_err(|e| ValidationError::InvalidBody(e.to_string()))?,
        )
    } else {
        None
    };

    let params = RequestParams::new(
        route_match.path_params.clone(),
        request.query.clone(),
        request.headers.clone(),
        body,
    );

    for spec in route.template.params.iter().filter(|p| p.required) {
        if params.get(spec.name, spec.location).is_none() {
            return Err(ValidationError::MissingParameter {
                name: spec.name.to_string(),
                location: location_name(spec.location).to_string(),
            });
        }
    }

    Ok(params)
}

// ─────────────────────────────────────────────────────────────────────────────
// Builders
// ─────────────────────────────────────────────────────────────────────────────

/// Base64 form of a `Data` value.  Strings encode their UTF-8 bytes; any
/// other JSON value encodes its compact serialization.
pub fn encode_data(value: &Value) -> String {
    match value {
        Value::String(s) => STANDARD.encode(s.as_bytes()),
        other => STANDARD.encode(other.to_string().as_bytes()),
    }
}

fn parse_number(name: &str, raw: &str) -> Result<Number, ValidationError> {
    let not_numeric = || ValidationError::NotNumeric {
        name: name.to_string(),
        value: raw.to_string(),
    };
    let trimmed = raw.trim();
    if let Ok(n) = trimmed.parse::<i64>() {
        return Ok(Number::from(n));
    }
    if let Ok(n) = trimmed.parse::<u64>() {
        return Ok(Number::from(n));
    }
    trimmed
        .parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .ok_or_else(not_numeric)
}

fn put_str(map: &mut Map<String, Value>, key: &str, value: Option<&str>) {
    if let Some(v) = value {
        map.insert(key.to_string(), Value::String(v.to_string()));
    }
}

fn put_number(map: &mut Map<String, Value>, key: &str, value: Option<&str>) -> Result<(), ValidationError> {
    if let Some(raw) = value {
        map.insert(key.to_string(), Value::Number(parse_number(key, raw)?));
    }
    Ok(())
}

fn get_records(params: &RequestParams) -> Result<Value, ValidationError> {
    let mut m = Map::new();
    put_str(&mut m, "ShardIterator", params.header("ShardIterator"));
    put_number(&mut m, "Limit", params.header("Limit"))?;
    Ok(Value::Object(m))
}

fn list_shards(params: &RequestParams) -> Result<Value, ValidationError> {
    let mut m = Map::new();
    // NextToken already encodes the stream; the backend rejects both together.
    if let Some(token) = params.query("NextToken") {
        put_str(&mut m, "NextToken", Some(token));
    } else {
        put_str(&mut m, "StreamName", params.query("StreamName"));
    }
    put_number(&mut m, "MaxResults", params.query("MaxResults"))?;
    Ok(Value::Object(m))
}

fn describe_stream(params: &RequestParams) -> Value {
    let mut m = Map::new();
    put_str(&mut m, "StreamName", params.path("name"));
    Value::Object(m)
}

fn put_record(params: &RequestParams) -> Value {
    let mut m = Map::new();
    put_str(&mut m, "StreamName", params.path("name"));
    if let Some(data) = params.body_field("Data") {
        m.insert("Data".to_string(), Value::String(encode_data(data)));
    }
    if let Some(key) = params.body_field("PartitionKey") {
        m.insert("PartitionKey".to_string(), key.clone());
    }
    Value::Object(m)
}

fn put_records(params: &RequestParams) -> Result<Value, ValidationError> {
    let records = match params.body_field("Records") {
        Some(Value::Array(items)) => items.as_slice(),
        Some(_) => {
            return Err(ValidationError::InvalidBody(
                "'Records' must be an array".to_string(),
            ))
        }
        None => &[][..],
    };

    let mapped = records
        .iter()
        .enumerate()
        .map(|(index, record)| {
            let field = |name: &str| {
                record
                    .get(name)
                    .filter(|v| is_present(v))
                    .ok_or_else(|| ValidationError::InvalidRecord {
                        index,
                        field: name.to_string(),
                    })
            };
            let data = field("Data")?;
            let key = field("PartitionKey")?;
            let mut entry = Map::new();
            entry.insert("Data".to_string(), Value::String(encode_data(data)));
            entry.insert("PartitionKey".to_string(), key.clone());
            Ok(Value::Object(entry))
        })
        .collect::<Result<Vec<_>, ValidationError>>()?;

    let mut m = Map::new();
    put_str(&mut m, "StreamName", params.path("name"));
    m.insert("Records".to_string(), Value::Array(mapped));
    Ok(Value::Object(m))
}

fn get_shard_iterator(params: &RequestParams) -> Result<Value, ValidationError> {
    let mut m = Map::new();
    put_str(&mut m, "StreamName", params.path("name"));
    put_str(&mut m, "ShardId", params.query("ShardId"));
    m.insert(
        "ShardIteratorType".to_string(),
        Value::String(
            params
                .query("ShardIteratorType")
                .unwrap_or(DEFAULT_SHARD_ITERATOR_TYPE)
                .to_string(),
        ),
    );
    put_str(
        &mut m,
        "StartingSequenceNumber",
        params.query("StartingSequenceNumber"),
    );
    put_number(&mut m, "Timestamp", params.query("Timestamp"))?;
    Ok(Value::Object(m))
}

/// Builds backend calls for every route, honouring the PutRecord override.
#[derive(Debug, Clone, Default)]
pub struct RequestTransformer {
    put_record_template: Option<RequestTemplate>,
}

impl RequestTransformer {
    pub fn new(put_record_template: Option<RequestTemplate>) -> Self {
        Self {
            put_record_template,
        }
    }

    pub fn has_put_record_override(&self) -> bool {
        self.put_record_template.is_some()
    }

    /// Build the backend argument object from validated parameters.
    pub fn build(&self, route: &Route, params: &RequestParams) -> Result<BackendCall, ValidationError> {
        let operation = route.operation();
        let payload = match operation {
            Operation::GetRecords => get_records(params)?,
            Operation::ListShards => list_shards(params)?,
            Operation::ListStreams => Value::Object(Map::new()),
            Operation::DescribeStream => describe_stream(params),
            Operation::PutRecord => match &self.put_record_template {
                Some(template) => template.render(params),
                None => put_record(params),
            },
            Operation::PutRecords => put_records(params)?,
            Operation::GetShardIterator => get_shard_iterator(params)?,
        };
        Ok(BackendCall { operation, payload })
    }

    /// Validate then build.
    pub fn transform(&self, route_match: &RouteMatch, request: &InboundRequest) -> Result<BackendCall, ValidationError> {
        let params = validate(route_match, request)?;
        self.build(&route_match.route, &params)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permission::PermissionFlags;
    use crate::route::{Authorization, RouteSettings, RouteTable};
    use crate::types::HttpMethod;
    use serde_json::json;

    fn table() -> RouteTable {
        RouteTable::build(
            &PermissionFlags::all(),
            &RouteSettings {
                authorization: Authorization::Open,
                api_key_required: false,
                timeout_ms: 29_000,
            },
        )
        .unwrap()
    }

    fn call(req: InboundRequest) -> Result<BackendCall, ValidationError> {
        call_with(&RequestTransformer::default(), req)
    }

    fn call_with(t: &RequestTransformer, req: InboundRequest) -> Result<BackendCall, ValidationError> {
        let m = table().resolve(req.method, &req.path).unwrap();
        t.transform(&m, &req)
    }

    fn get(path: &str) -> InboundRequest {
        InboundRequest::new("req-1", HttpMethod::Get, path)
    }

    fn put(path: &str, body: Value) -> InboundRequest {
        InboundRequest::new("req-1", HttpMethod::Put, path).with_body(body.to_string().into_bytes())
    }

    // ── GetRecords ───────────────────────────────────────────────────────────

    #[test]
    fn get_records_maps_headers() {
        let c = call(
            get("/records")
                .with_header("ShardIterator", "AAAA")
                .with_header("Limit", "25"),
        )
        .unwrap();
        assert_eq!(c.operation, Operation::GetRecords);
        assert_eq!(c.payload, json!({ "ShardIterator": "AAAA", "Limit": 25 }));
    }

    #[test]
    fn get_records_without_iterator_is_rejected() {
        let err = call(get("/records").with_header("Limit", "5")).unwrap_err();
        assert_eq!(
            err,
            ValidationError::MissingParameter {
                name: "ShardIterator".to_string(),
                location: "header".to_string(),
            }
        );
    }

    #[test]
    fn empty_required_header_counts_as_missing() {
        assert!(matches!(
            call(get("/records").with_header("ShardIterator", "")),
            Err(ValidationError::MissingParameter { .. })
        ));
    }

    #[test]
    fn non_numeric_limit_is_rejected() {
        let err = call(
            get("/records")
                .with_header("ShardIterator", "AAAA")
                .with_header("Limit", "ten"),
        )
        .unwrap_err();
        assert!(matches!(err, ValidationError::NotNumeric { ref name, .. } if name == "Limit"));
    }

    // ── ListShards ───────────────────────────────────────────────────────────

    #[test]
    fn list_shards_next_token_takes_precedence() {
        let c = call(
            get("/shards")
                .with_query("StreamName", "orders")
                .with_query("NextToken", "tok-1")
                .with_query("MaxResults", "100"),
        )
        .unwrap();
        assert_eq!(c.payload, json!({ "NextToken": "tok-1", "MaxResults": 100 }));
    }

    #[test]
    fn list_shards_uses_stream_name_without_token() {
        let c = call(
            get("/shards")
                .with_query("StreamName", "orders")
                .with_query("NextToken", ""),
        )
        .unwrap();
        assert_eq!(c.payload, json!({ "StreamName": "orders" }));
    }

    // ── ListStreams / DescribeStream ─────────────────────────────────────────

    #[test]
    fn list_streams_sends_empty_object() {
        assert_eq!(call(get("/streams")).unwrap().payload, json!({}));
    }

    #[test]
    fn describe_stream_takes_name_from_path() {
        let c = call(get("/streams/orders")).unwrap();
        assert_eq!(c.operation, Operation::DescribeStream);
        assert_eq!(c.payload, json!({ "StreamName": "orders" }));
    }

    // ── PutRecord ────────────────────────────────────────────────────────────

    #[test]
    fn put_record_base64_encodes_data() {
        let c = call(put(
            "/streams/orders/record",
            json!({ "Data": "hello", "PartitionKey": "k1" }),
        ))
        .unwrap();
        assert_eq!(
            c.payload,
            json!({ "StreamName": "orders", "Data": "aGVsbG8=", "PartitionKey": "k1" })
        );
    }

    #[test]
    fn put_record_encodes_structured_data_as_json_text() {
        let c = call(put(
            "/streams/orders/record",
            json!({ "Data": { "id": 1 }, "PartitionKey": "k1" }),
        ))
        .unwrap();
        assert_eq!(c.payload["Data"], json!(STANDARD.encode(r#"{"id":1}"#)));
    }

    #[test]
    fn put_record_requires_partition_key() {
        let err = call(put("/streams/orders/record", json!({ "Data": "hello" }))).unwrap_err();
        assert!(matches!(err, ValidationError::MissingParameter { ref name, .. } if name == "PartitionKey"));
    }

    #[test]
    fn put_record_with_malformed_body_is_rejected() {
        let req = InboundRequest::new("r", HttpMethod::Put, "/streams/orders/record")
            .with_body(b"{not json".to_vec());
        assert!(matches!(call(req), Err(ValidationError::InvalidBody(_))));
    }

    #[test]
    fn put_record_template_override_replaces_mapping() {
        let template = RequestTemplate::parse(
            r#"{ "StreamName": "${path.name}", "Data": "${base64(body.Data)}", "PartitionKey": "${header.X-Tenant}" }"#,
        )
        .unwrap();
        let t = RequestTransformer::new(Some(template));
        let c = call_with(
            &t,
            put(
                "/streams/orders/record",
                json!({ "Data": "hello", "PartitionKey": "ignored" }),
            )
            .with_header("X-Tenant", "acme"),
        )
        .unwrap();
        assert_eq!(
            c.payload,
            json!({ "StreamName": "orders", "Data": "aGVsbG8=", "PartitionKey": "acme" })
        );
    }

    // ── PutRecords ───────────────────────────────────────────────────────────

    #[test]
    fn put_records_preserves_order() {
        let c = call(put(
            "/streams/orders/records",
            json!({ "Records": [
                { "Data": "a", "PartitionKey": "p1" },
                { "Data": "b", "PartitionKey": "p2" },
            ]}),
        ))
        .unwrap();
        assert_eq!(
            c.payload,
            json!({ "StreamName": "orders", "Records": [
                { "Data": "YQ==", "PartitionKey": "p1" },
                { "Data": "Yg==", "PartitionKey": "p2" },
            ]})
        );
    }

    #[test]
    fn put_records_empty_list_stays_empty() {
        let c = call(put("/streams/orders/records", json!({ "Records": [] }))).unwrap();
        assert_eq!(c.payload, json!({ "StreamName": "orders", "Records": [] }));
    }

    #[test]
    fn put_records_without_records_is_rejected() {
        assert!(matches!(
            call(put("/streams/orders/records", json!({}))),
            Err(ValidationError::MissingParameter { .. })
        ));
    }

    #[test]
    fn put_records_reports_incomplete_entry() {
        let err = call(put(
            "/streams/orders/records",
            json!({ "Records": [{ "Data": "a", "PartitionKey": "p" }, { "Data": "b" }] }),
        ))
        .unwrap_err();
        assert_eq!(
            err,
            ValidationError::InvalidRecord {
                index: 1,
                field: "PartitionKey".to_string(),
            }
        );
    }

    // ── GetShardIterator ─────────────────────────────────────────────────────

    #[test]
    fn shard_iterator_type_defaults_to_trim_horizon() {
        let c = call(get("/streams/orders/sharditerator").with_query("ShardId", "shardId-0")).unwrap();
        assert_eq!(
            c.payload,
            json!({
                "StreamName": "orders",
                "ShardId": "shardId-0",
                "ShardIteratorType": "TRIM_HORIZON",
            })
        );
    }

    #[test]
    fn shard_iterator_type_can_be_overridden() {
        let c = call(
            get("/streams/orders/sharditerator")
                .with_query("ShardId", "shardId-0")
                .with_query("ShardIteratorType", "LATEST"),
        )
        .unwrap();
        assert_eq!(c.payload["ShardIteratorType"], "LATEST");
    }

    #[test]
    fn shard_iterator_optional_fields_are_typed() {
        let c = call(
            get("/streams/orders/sharditerator")
                .with_query("ShardId", "shardId-0")
                .with_query("ShardIteratorType", "AT_TIMESTAMP")
                .with_query("Timestamp", "1700000000.5")
                .with_query("StartingSequenceNumber", "4959"),
        )
        .unwrap();
        assert_eq!(c.payload["Timestamp"], json!(1_700_000_000.5));
        assert_eq!(c.payload["StartingSequenceNumber"], json!("4959"));
    }

    #[test]
    fn shard_iterator_requires_shard_id() {
        assert!(matches!(
            call(get("/streams/orders/sharditerator")),
            Err(ValidationError::MissingParameter { ref name, .. }) if name == "ShardId"
        ));
    }
}
