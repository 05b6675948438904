//! Operator-supplied request templates.
//!
//! A template is a JSON document whose string leaves may reference request
//! inputs with `${...}` placeholders:
//!
//! | Placeholder | Value |
//! |-------------|-------|
//! | `${path.name}` | captured path segment |
//! | `${query.Key}` | query parameter |
//! | `${header.Key}` | request header (case-insensitive) |
//! | `${body.Field}` | top-level field of the JSON body |
//! | `${base64(body.Field)}` | same, base64-encoded |
//!
//! A leaf that is exactly one placeholder is replaced by the referenced JSON
//! value (so numbers stay numbers).  Placeholders embedded in a longer string
//! are interpolated as text.  Missing inputs render as the empty string.

use crate::error::GatewayError;
use crate::request::{encode_data, RequestParams};
use regex::{Captures, Regex};
use serde_json::Value;
use std::sync::OnceLock;

fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\$\{\s*(?:(base64)\(\s*)?(path|query|header|body)\.([A-Za-z0-9_.\-]+)\s*(\))?\s*\}")
            .expect("placeholder regex is valid")
    })
}

fn any_placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$\{[^}]*\}").expect("placeholder regex is valid"))
}

/// A parsed request template.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestTemplate {
    source: String,
    root: Value,
}

impl RequestTemplate {
    /// Parse and check a template.  Every `${...}` must be a recognised
    /// placeholder and `base64(` must be closed.
    pub fn parse(source: &str) -> Result<Self, GatewayError> {
        let root: Value = serde_json::from_str(source)
            .map_err(|e| GatewayError::InvalidRequestTemplate(e.to_string()))?;
        if !root.is_object() {
            return Err(GatewayError::InvalidRequestTemplate(
                "template must be a JSON object".to_string(),
            ));
        }
        check_placeholders(&root)?;
        Ok(Self {
            source: source.to_string(),
            root,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Render the template against validated request parameters.
    pub fn render(&self, params: &RequestParams) -> Value {
        render_value(&self.root, params)
    }
}

fn check_placeholders(value: &Value) -> Result<(), GatewayError> {
    match value {
        Value::String(s) => {
            for m in any_placeholder_re().find_iter(s) {
                let Some(caps) = placeholder_re().captures(m.as_str()) else {
                    return Err(GatewayError::InvalidRequestTemplate(format!(
                        "unknown placeholder '{}'",
                        m.as_str()
                    )));
                };
                if caps.get(0).map(|c| c.as_str()) != Some(m.as_str())
                    || caps.get(1).is_some() != caps.get(4).is_some()
                {
                    return Err(GatewayError::InvalidRequestTemplate(format!(
                        "malformed placeholder '{}'",
                        m.as_str()
                    )));
                }
            }
            Ok(())
        }
        Value::Array(items) => items.iter().try_for_each(check_placeholders),
        Value::Object(map) => map.values().try_for_each(check_placeholders),
        _ => Ok(()),
    }
}

fn render_value(value: &Value, params: &RequestParams) -> Value {
    match value {
        Value::String(s) => render_string(s, params),
        Value::Array(items) => Value::Array(items.iter().map(|v| render_value(v, params)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), render_value(v, params)))
                .collect(),
        ),
        other => other.clone(),
    }
}

fn render_string(s: &str, params: &RequestParams) -> Value {
    let re = placeholder_re();

    if let Some(caps) = re.captures(s) {
        if caps.get(0).map(|m| m.as_str()) == Some(s) {
            return lookup(&caps, params);
        }
    }

    let rendered = re.replace_all(s, |caps: &Captures| match lookup(caps, params) {
        Value::String(text) => text,
        Value::Null => String::new(),
        other => other.to_string(),
    });
    Value::String(rendered.into_owned())
}

fn lookup(caps: &Captures, params: &RequestParams) -> Value {
    let encode = caps.get(1).is_some();
    let name = &caps[3];
    let found = match &caps[2] {
        "path" => params.path(name).map(|s| Value::String(s.to_string())),
        "query" => params.query(name).map(|s| Value::String(s.to_string())),
        "header" => params.header(name).map(|s| Value::String(s.to_string())),
        _ => params.body_field(name).cloned(),
    };

    match (found, encode) {
        (Some(v), true) => Value::String(encode_data(&v)),
        (Some(v), false) => v,
        (None, _) => Value::String(String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    fn params() -> RequestParams {
        let mut path = HashMap::new();
        path.insert("name".to_string(), "orders".to_string());
        let mut headers = HashMap::new();
        headers.insert("x-trace".to_string(), "t-1".to_string());
        RequestParams::new(
            path,
            HashMap::new(),
            headers,
            Some(json!({ "Data": "hello", "PartitionKey": "k1", "Seq": 7 })),
        )
    }

    #[test]
    fn whole_leaf_placeholder_keeps_json_type() {
        let t = RequestTemplate::parse(r#"{ "Seq": "${body.Seq}" }"#).unwrap();
        assert_eq!(t.render(&params()), json!({ "Seq": 7 }));
    }

    #[test]
    fn base64_placeholder_encodes_body_field() {
        let t = RequestTemplate::parse(
            r#"{ "StreamName": "${path.name}", "Data": "${base64(body.Data)}", "PartitionKey": "${body.PartitionKey}" }"#,
        )
        .unwrap();
        assert_eq!(
            t.render(&params()),
            json!({ "StreamName": "orders", "Data": "aGVsbG8=", "PartitionKey": "k1" })
        );
    }

    #[test]
    fn embedded_placeholders_interpolate_as_text() {
        let t = RequestTemplate::parse(r#"{ "PartitionKey": "${path.name}-${header.X-Trace}" }"#)
            .unwrap();
        assert_eq!(t.render(&params()), json!({ "PartitionKey": "orders-t-1" }));
    }

    #[test]
    fn missing_input_renders_empty_string() {
        let t = RequestTemplate::parse(r#"{ "Hint": "${query.ExplicitHashKey}" }"#).unwrap();
        assert_eq!(t.render(&params()), json!({ "Hint": "" }));
    }

    #[test]
    fn unknown_placeholder_is_rejected() {
        let err = RequestTemplate::parse(r#"{ "Data": "${stage.variables}" }"#).unwrap_err();
        assert!(matches!(err, GatewayError::InvalidRequestTemplate(_)));
    }

    #[test]
    fn unclosed_base64_is_rejected() {
        assert!(RequestTemplate::parse(r#"{ "Data": "${base64(body.Data}" }"#).is_err());
    }

    #[test]
    fn non_object_template_is_rejected() {
        assert!(RequestTemplate::parse("[1, 2]").is_err());
        assert!(RequestTemplate::parse("not json").is_err());
    }
}
