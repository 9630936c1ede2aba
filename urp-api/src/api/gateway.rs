//! HTTP hosting for the dispatcher
//!
//! Plays the part of the API gateway: every route table entry is mounted as a
//! GET route, requests are turned into [`RequestContext`]s carrying the route
//! pattern as the resource path, and envelopes are written back as HTTP
//! responses. A dispatch failure is reported the way the gateway reports a
//! failed invocation: 502 with a generic message.

use axum::{
    extract::{Path, State},
    http::{header::CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use indexmap::IndexMap;
use serde_json::json;
use tracing::{error, warn};

use crate::envelope::{RequestContext, ResponseEnvelope};
use crate::negotiation::JSON_MIME;
use crate::routes::RouteTable;
use crate::AppState;

/// Mount one GET route per route table entry
pub fn gateway_routes(routes: &RouteTable) -> Router<AppState> {
    routes.iter().fold(Router::new(), |router, route| {
        let resource = route.path.clone();
        router.route(
            &axum_path(&route.path),
            get(
                move |State(state): State<AppState>,
                      params: Option<Path<Vec<(String, String)>>>,
                      headers: HeaderMap| {
                    let params = params.map(|Path(params)| params).unwrap_or_default();
                    invoke(state, resource.clone(), params, headers)
                },
            ),
        )
    })
}

async fn invoke(
    state: AppState,
    resource: String,
    params: Vec<(String, String)>,
    headers: HeaderMap,
) -> Response {
    let request = RequestContext {
        resource_path: resource,
        path_parameters: params.into_iter().collect(),
        headers: canonical_headers(&headers),
    };

    match state.dispatcher.dispatch(&request).await {
        Ok(envelope) => envelope.into_response(),
        Err(e) => {
            error!("Request {} failed: {}", request.resource_path, e);
            gateway_failure()
        }
    }
}

/// Response for a failed invocation
pub fn gateway_failure() -> Response {
    (
        StatusCode::BAD_GATEWAY,
        Json(json!({ "message": "Internal server error" })),
    )
        .into_response()
}

/// `/project/{projectId}` → `/project/:projectId`
pub fn axum_path(pattern: &str) -> String {
    pattern
        .split('/')
        .map(|segment| {
            match segment.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
                Some(name) => format!(":{}", name),
                None => segment.to_string(),
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// `x-forwarded-for` → `X-Forwarded-For`
pub fn canonical_header_name(name: &str) -> String {
    name.split('-')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => {
                    first.to_ascii_uppercase().to_string() + &chars.as_str().to_ascii_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}

/// Header map with canonical names; non-UTF-8 values are dropped
fn canonical_headers(headers: &HeaderMap) -> IndexMap<String, String> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            let value = value.to_str().ok()?;
            Some((canonical_header_name(name.as_str()), value.to_string()))
        })
        .collect()
}

impl IntoResponse for ResponseEnvelope {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let mut response = (status, self.body).into_response();

        let headers = response.headers_mut();
        // Transport default when the envelope names no content type
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_MIME));
        for (name, value) in &self.headers {
            match (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                (Ok(name), Ok(value)) => {
                    headers.insert(name, value);
                }
                _ => warn!("Dropping invalid response header {}", name),
            }
        }

        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[test]
    fn test_axum_path() {
        assert_eq!(axum_path("/"), "/");
        assert_eq!(axum_path("/projects"), "/projects");
        assert_eq!(axum_path("/project/{projectId}"), "/project/:projectId");
        assert_eq!(
            axum_path("/project/{projectId}/reports/{year}/{month}"),
            "/project/:projectId/reports/:year/:month"
        );
    }

    #[test]
    fn test_canonical_header_name() {
        assert_eq!(canonical_header_name("accept"), "Accept");
        assert_eq!(canonical_header_name("content-type"), "Content-Type");
        assert_eq!(canonical_header_name("X-FORWARDED-FOR"), "X-Forwarded-For");
    }

    #[test]
    fn test_canonical_headers_from_map() {
        let mut headers = HeaderMap::new();
        headers.insert("accept", HeaderValue::from_static("text/csv"));
        let map = canonical_headers(&headers);
        assert_eq!(map.get("Accept").map(String::as_str), Some("text/csv"));
    }

    #[tokio::test]
    async fn test_envelope_into_response() {
        let envelope = ResponseEnvelope::ok("id\n1".to_string(), Some("text/csv"));
        let response = envelope.into_response();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], "text/csv");
        assert_eq!(response.headers()["access-control-allow-origin"], "*");
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"id\n1");
    }

    #[tokio::test]
    async fn test_envelope_without_content_type_defaults_to_json() {
        let response = ResponseEnvelope::ok("null".to_string(), None).into_response();
        assert_eq!(response.headers()[CONTENT_TYPE], JSON_MIME);
    }
}
