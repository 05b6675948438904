//! Backend response → HTTP reply.
//!
//! The mapping is a pass-through: no field remapping and no error-body
//! reshaping.  Every reply is labelled `application/json`.

use serde::{Deserialize, Serialize};

pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Raw reply from the stream backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl BackendResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// What the gateway sends back to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyReply {
    pub status: u16,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

/// Shape a backend response for the caller.
///
/// Success collapses to `200`; backend errors keep their status and body.
pub fn shape_response(resp: BackendResponse) -> ProxyReply {
    let status = if resp.is_success() { 200 } else { resp.status };
    let body = if resp.body.is_empty() {
        b"{}".to_vec()
    } else {
        resp.body
    };
    ProxyReply {
        status,
        content_type: JSON_CONTENT_TYPE,
        body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_passes_body_through() {
        let body = br#"{"SequenceNumber":"4959","ShardId":"shardId-000000000000"}"#.to_vec();
        let reply = shape_response(BackendResponse::new(200, body.clone()));
        assert_eq!(reply.status, 200);
        assert_eq!(reply.content_type, "application/json");
        assert_eq!(reply.body, body);
    }

    #[test]
    fn backend_errors_keep_status_and_body() {
        let body = br#"{"__type":"ResourceNotFoundException","message":"Stream orders not found"}"#.to_vec();
        let reply = shape_response(BackendResponse::new(400, body.clone()));
        assert_eq!(reply.status, 400);
        assert_eq!(reply.body, body);
    }

    #[test]
    fn empty_body_becomes_empty_object() {
        assert_eq!(shape_response(BackendResponse::new(204, Vec::new())).body, b"{}");
    }
}
