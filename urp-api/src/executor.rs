//! Query execution
//!
//! One call opens one connection, runs one statement and closes the
//! connection again, whether or not the statement succeeded. Connection
//! acquisition is bounded by a timeout; nothing is retried.

use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use urp_common::db::{Connector, Row};

use crate::error::{DispatchError, Result};

/// Runs SQL against short-lived connections
#[derive(Clone)]
pub struct QueryExecutor {
    connector: Arc<dyn Connector>,
    connect_timeout: Duration,
}

impl QueryExecutor {
    pub fn new(connector: Arc<dyn Connector>, connect_timeout: Duration) -> Self {
        Self {
            connector,
            connect_timeout,
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Execute one statement and return every row
    pub async fn execute(&self, sql: &str) -> Result<Vec<Row>> {
        info!("Connecting to {}...", self.connector.target());
        let mut conn = tokio::time::timeout(self.connect_timeout, self.connector.connect())
            .await
            .map_err(|_| DispatchError::ConnectionTimeout(self.connect_timeout))?
            .map_err(DispatchError::Connection)?;
        info!("Connected.");

        info!("Starting query [{}]...", sql);
        let result = conn.query(sql).await;

        if let Err(e) = conn.close().await {
            warn!("Connection did not close cleanly: {}", e);
        }

        let rows = result.map_err(DispatchError::Query)?;
        info!("Query completed [{} rows].", rows.len());
        Ok(rows)
    }
}

impl std::fmt::Debug for QueryExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryExecutor")
            .field("target", &self.connector.target())
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted in-memory database collaborator

    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use urp_common::db::{Connection, Connector, DbError, Row};

    /// What the scripted connection answers
    #[derive(Clone)]
    pub enum Script {
        Rows(Vec<Row>),
        QueryFails,
        CloseFails(Vec<Row>),
        ConnectFails,
        ConnectHangs,
    }

    /// Records every statement and counts opens/closes
    #[derive(Clone)]
    pub struct ScriptedConnector {
        script: Script,
        pub statements: Arc<Mutex<Vec<String>>>,
        pub opened: Arc<AtomicUsize>,
        pub closed: Arc<AtomicUsize>,
    }

    impl ScriptedConnector {
        pub fn new(script: Script) -> Self {
            Self {
                script,
                statements: Arc::new(Mutex::new(Vec::new())),
                opened: Arc::new(AtomicUsize::new(0)),
                closed: Arc::new(AtomicUsize::new(0)),
            }
        }

        pub fn statements(&self) -> Vec<String> {
            self.statements.lock().unwrap().clone()
        }

        pub fn opened(&self) -> usize {
            self.opened.load(Ordering::SeqCst)
        }

        pub fn closed(&self) -> usize {
            self.closed.load(Ordering::SeqCst)
        }
    }

    fn failure() -> sqlx::Error {
        sqlx::Error::Protocol("scripted failure".to_string())
    }

    #[async_trait]
    impl Connector for ScriptedConnector {
        fn target(&self) -> String {
            "scripted".to_string()
        }

        async fn connect(&self) -> Result<Box<dyn Connection>, DbError> {
            match self.script {
                Script::ConnectFails => Err(DbError::Connect {
                    target: self.target(),
                    source: failure(),
                }),
                Script::ConnectHangs => {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    Err(DbError::Config("unreachable".to_string()))
                }
                _ => {
                    self.opened.fetch_add(1, Ordering::SeqCst);
                    Ok(Box::new(ScriptedConnection {
                        connector: self.clone(),
                    }))
                }
            }
        }
    }

    struct ScriptedConnection {
        connector: ScriptedConnector,
    }

    #[async_trait]
    impl Connection for ScriptedConnection {
        async fn query(&mut self, sql: &str) -> Result<Vec<Row>, DbError> {
            self.connector.statements.lock().unwrap().push(sql.to_string());
            match &self.connector.script {
                Script::Rows(rows) | Script::CloseFails(rows) => Ok(rows.clone()),
                _ => Err(DbError::Query(failure())),
            }
        }

        async fn close(self: Box<Self>) -> Result<(), DbError> {
            self.connector.closed.fetch_add(1, Ordering::SeqCst);
            match self.connector.script {
                Script::CloseFails(_) => Err(DbError::Close(failure())),
                _ => Ok(()),
            }
        }
    }
}
