//! Error types for urp-api
//!
//! The dispatcher does no local recovery: every variant propagates to the
//! hosting adapter, which reports it in its own protocol.

use std::time::Duration;
use thiserror::Error;
use urp_common::db::DbError;

/// Dispatch pipeline failure
#[derive(Error, Debug)]
pub enum DispatchError {
    /// No route registered for the resource path
    #[error("Unrecognised request {0}")]
    UnknownRoute(String),

    /// Connection acquisition exceeded its budget
    #[error("Timed out connecting to the database after {0:?}")]
    ConnectionTimeout(Duration),

    /// Database unreachable
    #[error("Database connection failed: {0}")]
    Connection(#[source] DbError),

    /// Database rejected the statement
    #[error("Database query failed: {0}")]
    Query(#[source] DbError),

    /// Requested content type has no encoder
    #[error("Unhandled content type {0}")]
    UnsupportedContentType(String),

    /// Encoder failed to produce a body
    #[error("Failed to encode response body: {0}")]
    Encode(String),
}

/// Convenience Result type using DispatchError
pub type Result<T> = std::result::Result<T, DispatchError>;

/// Route table loading errors
#[derive(Error, Debug)]
pub enum RouteTableError {
    #[error("Failed to read route file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse route file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Duplicate route {0}")]
    Duplicate(String),

    #[error("Route {0} has an empty query template")]
    EmptyQuery(String),
}
