//! Database collaborator
//!
//! The router only needs three operations from the database: open a
//! connection, run one SQL statement, close the connection. [`Connector`] and
//! [`Connection`] describe exactly that, with PostgreSQL (production) and
//! SQLite (local development and tests) implementations.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use crate::config::DatabaseSettings;

mod postgres;
mod sqlite;
mod value;

pub use postgres::PgConnector;
pub use sqlite::SqliteConnector;
pub use value::{Row, SqlValue};

/// Database collaborator errors
#[derive(Error, Debug)]
pub enum DbError {
    /// Connection could not be established
    #[error("Failed to connect to {target}: {source}")]
    Connect {
        target: String,
        #[source]
        source: sqlx::Error,
    },

    /// Database rejected the statement (or a row could not be decoded)
    #[error("Query failed: {0}")]
    Query(#[source] sqlx::Error),

    /// Connection did not shut down cleanly
    #[error("Failed to close connection: {0}")]
    Close(#[source] sqlx::Error),

    /// Connection options could not be built
    #[error("Invalid database configuration: {0}")]
    Config(String),
}

/// Opens short-lived connections
#[async_trait]
pub trait Connector: Send + Sync {
    /// Human-readable connection target (host or file), never credentials
    fn target(&self) -> String;

    /// Open a new connection
    async fn connect(&self) -> Result<Box<dyn Connection>, DbError>;
}

/// A single open database connection
#[async_trait]
pub trait Connection: Send {
    /// Run one SQL statement and collect every result row
    async fn query(&mut self, sql: &str) -> Result<Vec<Row>, DbError>;

    /// Close the connection, consuming it
    async fn close(self: Box<Self>) -> Result<(), DbError>;
}

/// Build the connector described by the `[database]` settings
///
/// - `url` starting with `sqlite:` selects SQLite (opened read-only)
/// - any other `url` is parsed as a PostgreSQL URL
/// - no `url` reads the libpq environment (`PGHOST`, `PGUSER`, ...), with
///   `host` overriding `PGHOST`
pub fn connector_from_settings(settings: &DatabaseSettings) -> Result<Arc<dyn Connector>, DbError> {
    match settings.url.as_deref() {
        Some(url) if url.starts_with("sqlite:") => Ok(Arc::new(SqliteConnector::from_url(url)?)),
        Some(url) => Ok(Arc::new(PgConnector::from_url(url)?)),
        None => Ok(Arc::new(PgConnector::from_env(settings.host.as_deref()))),
    }
}
