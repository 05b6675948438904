//! Stream backend abstraction.
//!
//! The gateway never interprets backend semantics: it hands a
//! [`BackendCall`] to a [`StreamBackend`] and passes whatever comes back to
//! the response transformer.

mod kinesis;

pub use kinesis::KinesisBackend;

use async_trait::async_trait;
use streamgate_kernel::{BackendCall, BackendResponse};
use thiserror::Error;

/// Failure to obtain any response from the backend.
///
/// Backend-level errors (4xx/5xx with a JSON body) are *responses*, not
/// errors, and are passed through unchanged.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend '{backend}' request failed: {message}")]
    Transport { backend: String, message: String },

    #[error("backend client could not be built: {0}")]
    Client(String),
}

/// Executes backend operations.
#[async_trait]
pub trait StreamBackend: Send + Sync {
    /// Identifier used in logs.
    fn name(&self) -> &str;

    async fn invoke(&self, call: &BackendCall) -> Result<BackendResponse, BackendError>;
}
