//! # URP Common Library
//!
//! Shared code for the Urban Rat Project services:
//! - Database collaborator (connectors, connections, row values)
//! - Configuration loading
//! - Common error types

pub mod config;
pub mod db;
pub mod error;

pub use error::{Error, Result};
