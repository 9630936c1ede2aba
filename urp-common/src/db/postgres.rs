//! PostgreSQL connector
//!
//! Unparameterized statements go through the simple query protocol, so the server
//! returns every column in text form; the typed decoders below parse that text
//! into native values. Integers of every width stay integers.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sqlx::postgres::{PgConnectOptions, PgConnection, PgRow};
use sqlx::{Column, Connection as _, Executor, Row as _, TypeInfo, ValueRef};
use std::str::FromStr;
use tracing::debug;
use uuid::Uuid;

use super::{Connection, Connector, DbError, Row, SqlValue};

/// Opens one `PgConnection` per call
#[derive(Debug, Clone)]
pub struct PgConnector {
    options: PgConnectOptions,
}

impl PgConnector {
    /// Connector for a `postgres://` URL
    pub fn from_url(url: &str) -> Result<Self, DbError> {
        let options = PgConnectOptions::from_str(url)
            .map_err(|e| DbError::Config(format!("Invalid PostgreSQL URL: {}", e)))?;
        Ok(Self { options })
    }

    /// Connector configured from the libpq environment variables
    pub fn from_env(host: Option<&str>) -> Self {
        let mut options = PgConnectOptions::new();
        if let Some(host) = host {
            options = options.host(host);
        }
        Self { options }
    }
}

#[async_trait]
impl Connector for PgConnector {
    fn target(&self) -> String {
        format!("{}:{}", self.options.get_host(), self.options.get_port())
    }

    async fn connect(&self) -> Result<Box<dyn Connection>, DbError> {
        let conn = PgConnection::connect_with(&self.options)
            .await
            .map_err(|source| DbError::Connect {
                target: self.target(),
                source,
            })?;
        Ok(Box::new(PgSession { conn }))
    }
}

struct PgSession {
    conn: PgConnection,
}

#[async_trait]
impl Connection for PgSession {
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

fn decode_row(row: &PgRow) -> Result<Row, sqlx::Error> {
    let mut out = Row::with_capacity(row.len());
    for (i, column) in row.columns().iter().enumerate() {
        let value = if row.try_get_raw(i)?.is_null() {
            SqlValue::Null
        } else {
            decode_value(row, i, column.type_info().name())?
        };
        out.insert(column.name().to_string(), value);
    }
    Ok(out)
}

fn decode_value(row: &PgRow, i: usize, type_name: &str) -> Result<SqlValue, sqlx::Error> {
    let value = match type_name {
        "BOOL" => SqlValue::Bool(row.try_get(i)?),
        "INT2" => SqlValue::Int(row.try_get::<i16, _>(i)?.into()),
        "INT4" => SqlValue::Int(row.try_get::<i32, _>(i)?.into()),
        "INT8" => SqlValue::Int(row.try_get::<i64, _>(i)?),
        "FLOAT4" => SqlValue::Float(parse_float4(&row.try_get_unchecked::<String, _>(i)?)?),
        "FLOAT8" => SqlValue::Float(row.try_get::<f64, _>(i)?),
        "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" => SqlValue::Text(row.try_get(i)?),
        "UUID" => SqlValue::Text(row.try_get::<Uuid, _>(i)?.to_string()),
        "DATE" => SqlValue::Date(row.try_get::<NaiveDate, _>(i)?),
        "TIME" => SqlValue::Time(row.try_get::<NaiveTime, _>(i)?),
        "TIMESTAMP" => SqlValue::Timestamp(row.try_get::<NaiveDateTime, _>(i)?),
        "TIMESTAMPTZ" => SqlValue::TimestampTz(row.try_get::<DateTime<Utc>, _>(i)?),
        "JSON" | "JSONB" => SqlValue::Json(row.try_get::<serde_json::Value, _>(i)?),
        other => {
            // NUMERIC, INET, arrays...: keep the server's text rendering
            debug!("Decoding {} column {} as text", other, i);
            SqlValue::Text(row.try_get_unchecked::<String, _>(i)?)
        }
    };
    Ok(value)
}

/// `real` text parsed straight into f64, so `12.3` stays `12.3`
fn parse_float4(text: &str) -> Result<f64, sqlx::Error> {
    text.parse::<f64>()
        .map_err(|e| sqlx::Error::Decode(Box::new(e)))
}
