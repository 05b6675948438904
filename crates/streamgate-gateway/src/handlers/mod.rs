//! HTTP handlers outside the proxy path.

pub mod admin;
pub mod health;
