//! Kinesis JSON-protocol backend.
//!
//! Every operation is a `POST /` with the operation named in
//! `X-Amz-Target` and the argument object as an
//! `application/x-amz-json-1.1` body.  Request signing is left to the
//! environment (a signing sidecar, or static headers injected through
//! configuration).

use super::{BackendError, StreamBackend};
use async_trait::async_trait;
use reqwest::Client;
use std::collections::BTreeMap;
use std::time::Duration;
use streamgate_kernel::config::MAX_TIMEOUT_MS;
use streamgate_kernel::{BackendCall, BackendResponse};
use tracing::{debug, instrument};

pub const KINESIS_CONTENT_TYPE: &str = "application/x-amz-json-1.1";

/// Forwards backend calls to a Kinesis-compatible endpoint.
pub struct KinesisBackend {
    endpoint: String,
    extra_headers: BTreeMap<String, String>,
    client: Client,
}

impl KinesisBackend {
    /// - `endpoint`: base URL, e.g. `https://kinesis.eu-west-1.amazonaws.com`.
    /// - `extra_headers`: sent with every call, after the protocol headers.
    pub fn new(
        endpoint: impl Into<String>,
        extra_headers: BTreeMap<String, String>,
    ) -> Result<Self, BackendError> {
        // The per-route timeout is enforced by the gateway; this is only a
        // ceiling for connections the gateway has already given up on.
        let client = Client::builder()
            .timeout(Duration::from_millis(MAX_TIMEOUT_MS + 1_000))
            .build()
            .map_err(|e| BackendError::Client(e.to_string()))?;

        Ok(Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            extra_headers,
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn transport(&self, e: reqwest::Error) -> BackendError {
        BackendError::Transport {
            backend: self.endpoint.clone(),
            message: e.to_string(),
        }
    }
}

#[async_trait]
impl StreamBackend for KinesisBackend {
    fn name(&self) -> &str {
        "kinesis"
    }

    #[instrument(skip(self, call), fields(operation = %call.operation, endpoint = %self.endpoint))]
    async fn invoke(&self, call: &BackendCall) -> Result<BackendResponse, BackendError> {
        let url = format!("{}/", self.endpoint);
        debug!(url = %url, "forwarding to kinesis endpoint");

        let body = serde_json::to_vec(&call.payload)
            .map_err(|e| BackendError::Client(e.to_string()))?;

        let mut builder = self
            .client
            .post(&url)
            .header("x-amz-target", call.operation.target())
            .header("content-type", KINESIS_CONTENT_TYPE);
        for (key, value) in &self.extra_headers {
            builder = builder.header(key.as_str(), value.as_str());
        }

        let resp = builder
            .body(body)
            .send()
            .await
            .map_err(|e| self.transport(e))?;
        let status = resp.status().as_u16();
        let bytes = resp.bytes().await.map_err(|e| self.transport(e))?;

        debug!(status, bytes = bytes.len(), "kinesis endpoint replied");
        Ok(BackendResponse::new(status, bytes.to_vec()))
    }
}
