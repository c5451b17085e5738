/*
 * Responsibility
 * - Errors raised while harvesting role rules from service descriptions
 * - All of them are per-source or per-rule: none is fatal to the process,
 *   and none ever reaches a request handler
 */
use std::time::Duration;

use thiserror::Error;

use super::matcher::MatcherError;

/// Retrieving a service description failed (network, timeout, non-2xx).
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("unexpected status {0}")]
    Status(u16),
    #[error("failed to read body: {0}")]
    Body(String),
    #[error("document exceeds {0} bytes")]
    TooLarge(usize),
    #[error("fetch task aborted")]
    Aborted,
}

/// The document could not be read as a service description.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unexpected document shape: {0}")]
    Shape(String),
}

/// One operation's path template could not be turned into a matcher.
#[derive(Debug, Clone, Error)]
#[error("{method} {template}: {source}")]
pub struct RuleCompileError {
    pub method: String,
    pub template: String,
    #[source]
    pub source: MatcherError,
}
