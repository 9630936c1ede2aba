//! HTTP API for urp-api

pub mod gateway;
pub mod health;

pub use gateway::{gateway_failure, gateway_routes};
pub use health::health_routes;
