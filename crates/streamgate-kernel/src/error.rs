//! Gateway error types for `streamgate-kernel`.
//!
//! [`GatewayError`] covers failures detected at *apply time*, before a
//! route table revision is ever staged.  Request-time failures live in
//! [`ValidationError`](crate::request::ValidationError) and in the runtime
//! crate.

use thiserror::Error;

/// Configuration error type for the gateway kernel contract.
#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum GatewayError {
    // ── Identity ────────────────────────────────────────────────────────────
    /// The gateway `name` field is empty or whitespace-only.
    #[error("gateway name cannot be empty")]
    EmptyGatewayName,

    /// The execution role name is whitespace-only.
    #[error("execution role name cannot be empty")]
    EmptyRoleName,

    // ── Timeouts ─────────────────────────────────────────────────────────────
    /// Integration timeout outside the accepted window.
    #[error("integration timeout must be between {min} and {max} ms, got {got}")]
    InvalidTimeout { got: u64, min: u64, max: u64 },

    // ── Auth ─────────────────────────────────────────────────────────────────
    /// The authorization mode string is not recognized.
    #[error("unknown authorization mode '{0}' (expected NONE or COGNITO_USER_POOLS)")]
    InvalidAuthorizationMode(String),

    /// An authentication configuration block is missing a required field.
    #[error("authentication config is missing required field: {0}")]
    InvalidAuthConfig(String),

    /// Routes require an API key but no keys are configured.
    #[error("api key is required but no api keys are configured")]
    NoApiKeys,

    // ── Overrides ────────────────────────────────────────────────────────────
    /// The custom execution-role policy is not a JSON object.
    #[error("custom policy is not a valid JSON policy document: {0}")]
    InvalidCustomPolicy(String),

    /// The PutRecord request template override could not be parsed.
    #[error("request template is invalid: {0}")]
    InvalidRequestTemplate(String),

    // ── Routes ───────────────────────────────────────────────────────────────
    /// Two templates bind the same (method, path) pair.
    #[error("route '{0}' duplicates an existing method and path binding")]
    DuplicateRoute(String),

    /// A route path pattern is syntactically invalid.
    #[error("route '{0}' has an invalid path pattern: {1}")]
    InvalidPathPattern(String, String),
}
