//! Request dispatch
//!
//! Received → route resolved → (parameters substituted → query executed) →
//! encoded → envelope. Every failure propagates to the caller unchanged; the
//! dispatcher never builds an error envelope.

use std::sync::Arc;
use tracing::{debug, info};

use crate::envelope::{RequestContext, ResponseEnvelope};
use crate::error::{DispatchError, Result};
use crate::executor::QueryExecutor;
use crate::negotiation::{self, JSON_MIME};
use crate::routes::{Handler, RouteTable};
use crate::substitution::substitute;

/// Request header naming the wanted encoding for multi-row routes
pub const ACCEPT_HEADER: &str = "Accept";

/// Resolves routes and runs their handlers
#[derive(Debug, Clone)]
pub struct Dispatcher {
    routes: Arc<RouteTable>,
    executor: QueryExecutor,
}

impl Dispatcher {
    pub fn new(routes: Arc<RouteTable>, executor: QueryExecutor) -> Self {
        Self { routes, executor }
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Run one request through the pipeline
    pub async fn dispatch(&self, request: &RequestContext) -> Result<ResponseEnvelope> {
        let route = self
            .routes
            .lookup(&request.resource_path)
            .ok_or_else(|| DispatchError::UnknownRoute(request.resource_path.clone()))?;

        info!("Command {} ({:?})", route.path, route.handler.kind());

        let envelope = match &route.handler {
            Handler::Echo { text } => {
                let body =
                    serde_json::to_string(text).map_err(|e| DispatchError::Encode(e.to_string()))?;
                ResponseEnvelope::ok(body, None)
            }
            Handler::MultiRow { query } => {
                // Header name lookup is case-sensitive
                let content_type = request.header(ACCEPT_HEADER).unwrap_or(JSON_MIME);
                let rows = self.run_query(query, request).await?;
                let encoded = negotiation::encode(content_type, &rows)?;
                ResponseEnvelope::ok(encoded.body, Some(encoded.mime_type))
            }
            Handler::SingleRow { query } => {
                let rows = self.run_query(query, request).await?;
                ResponseEnvelope::ok(negotiation::encode_single(&rows)?, None)
            }
        };

        info!("Completed.");
        Ok(envelope)
    }

    async fn run_query(
        &self,
        template: &str,
        request: &RequestContext,
    ) -> Result<Vec<urp_common::db::Row>> {
        let sql = substitute(template, &request.path_parameters);
        debug!("Substituted {} path parameters", request.path_parameters.len());
        self.executor.execute(&sql).await
    }
}
