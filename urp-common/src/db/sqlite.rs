//! SQLite connector for local development and tests
//!
//! Connections are opened read-only: the router never writes.

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqliteRow};
use sqlx::{Column, Connection as _, Executor, Row as _, TypeInfo, ValueRef};
use std::str::FromStr;

use super::{Connection, Connector, DbError, Row, SqlValue};

/// Opens one read-only `SqliteConnection` per call
#[derive(Debug, Clone)]
pub struct SqliteConnector {
    url: String,
    options: SqliteConnectOptions,
}

impl SqliteConnector {
    /// Connector for a `sqlite:` URL
    pub fn from_url(url: &str) -> Result<Self, DbError> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| DbError::Config(format!("Invalid SQLite URL: {}", e)))?
            .read_only(true);
        Ok(Self {
            url: url.to_string(),
            options,
        })
    }
}

#[async_trait]
impl Connector for SqliteConnector {
    fn target(&self) -> String {
        self.url.clone()
    }

    async fn connect(&self) -> Result<Box<dyn Connection>, DbError> {
        let conn = SqliteConnection::connect_with(&self.options)
            .await
            .map_err(|source| DbError::Connect {
                target: self.target(),
                source,
            })?;
        Ok(Box::new(SqliteSession { conn }))
    }
}

struct SqliteSession {
    conn: SqliteConnection,
}

#[async_trait]
impl Connection for SqliteSession {
    async fn query(&mut self, sql: &str) -> Result<Vec<Row>, DbError> {
        let rows = Executor::fetch_all(&mut self.conn, sql)
            .await
            .map_err(DbError::Query)?;

        rows.iter()
            .map(decode_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(DbError::Query)
    }

    async fn close(self: Box<Self>) -> Result<(), DbError> {
        self.conn.close().await.map_err(DbError::Close)
    }
}

/// SQLite is dynamically typed, so decode by each value's storage class
///
/// A NULL value reports its column's declared type, so nullness is checked
/// before the storage class.
fn decode_row(row: &SqliteRow) -> Result<Row, sqlx::Error> {
    let mut out = Row::with_capacity(row.len());
    for (i, column) in row.columns().iter().enumerate() {
        let raw = row.try_get_raw(i)?;
        if raw.is_null() {
            out.insert(column.name().to_string(), SqlValue::Null);
            continue;
        }
        let storage = raw.type_info().name().to_string();
        let value = match storage.as_str() {
            "INTEGER" => SqlValue::Int(row.try_get_unchecked::<i64, _>(i)?),
            "REAL" => SqlValue::Float(row.try_get_unchecked::<f64, _>(i)?),
            "BLOB" => {
                let bytes = row.try_get_unchecked::<Vec<u8>, _>(i)?;
                SqlValue::Text(bytes.iter().map(|b| format!("{:02x}", b)).collect())
            }
            _ => SqlValue::Text(row.try_get_unchecked::<String, _>(i)?),
        };
        out.insert(column.name().to_string(), value);
    }
    Ok(out)
}
