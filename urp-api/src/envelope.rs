//! Request and response shapes exchanged with the invoking runtime
//!
//! The envelope mirrors the API Gateway Lambda proxy response:
//! `{"statusCode", "headers", "body", "isBase64Encoded"}`.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Header every response carries
pub const CORS_HEADER: (&str, &str) = ("Access-Control-Allow-Origin", "*");

/// Per-request input to the dispatcher
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    /// Route pattern as matched by the gateway (`/project/{projectId}`)
    pub resource_path: String,
    /// Concrete values for the pattern's placeholders, in insertion order
    pub path_parameters: IndexMap<String, String>,
    /// Request headers, names exactly as received
    pub headers: IndexMap<String, String>,
}

impl RequestContext {
    pub fn new(resource_path: impl Into<String>) -> Self {
        Self {
            resource_path: resource_path.into(),
            ..Default::default()
        }
    }

    pub fn with_path_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.path_parameters.insert(name.into(), value.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Case-sensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }
}

/// Proxy-integration event fields the router reads
///
/// `pathParameters` and `headers` arrive as `null` when empty.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayEvent {
    pub resource: String,
    #[serde(default)]
    pub path_parameters: Option<IndexMap<String, String>>,
    #[serde(default)]
    pub headers: Option<IndexMap<String, String>>,
}

impl From<GatewayEvent> for RequestContext {
    fn from(event: GatewayEvent) -> Self {
        Self {
            resource_path: event.resource,
            path_parameters: event.path_parameters.unwrap_or_default(),
            headers: event.headers.unwrap_or_default(),
        }
    }
}

/// Response handed back to the invoking runtime
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEnvelope {
    pub status_code: u16,
    pub headers: IndexMap<String, String>,
    pub body: String,
    pub is_base64_encoded: bool,
}

impl ResponseEnvelope {
    /// 200 response; the CORS header is always added
    pub fn ok(body: String, content_type: Option<&str>) -> Self {
        let mut headers = IndexMap::new();
        if let Some(content_type) = content_type {
            headers.insert("Content-Type".to_string(), content_type.to_string());
        }
        headers.insert(CORS_HEADER.0.to_string(), CORS_HEADER.1.to_string());

        Self {
            status_code: 200,
            headers,
            body,
            is_base64_encoded: false,
        }
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.get("Content-Type").map(String::as_str)
    }
}
