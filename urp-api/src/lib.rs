//! urp-api library - Urban Rat Project reporting API
//!
//! Translates a fixed set of resource paths into SQL queries and returns the
//! rows as JSON or CSV inside an API Gateway style response envelope.

use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod dispatcher;
pub mod envelope;
pub mod error;
pub mod executor;
pub mod negotiation;
pub mod routes;
pub mod substitution;

pub use dispatcher::Dispatcher;
pub use envelope::{GatewayEvent, RequestContext, ResponseEnvelope};
pub use error::DispatchError;
pub use executor::QueryExecutor;
pub use routes::{Handler, HandlerKind, Route, RouteTable};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
}

impl AppState {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
        }
    }
}

/// Build application router
///
/// One GET route per route table entry, plus `/health` unless the table
/// already claims that path.
pub fn build_router(state: AppState) -> Router {
    let routes = state.dispatcher.routes();
    let mut router = api::gateway_routes(routes);
    if routes.lookup("/health").is_none() {
        router = router.merge(api::health_routes());
    }

    router.layer(TraceLayer::new_for_http()).with_state(state)
}
