//! Request logging middleware.
//!
//! One line per request, keyed by the route template so `/spaces/<uuid>`
//! calls group together, with the space/circle/player id pulled out of the
//! path as its own field.

use axum::{
    body::Body,
    extract::MatchedPath,
    http::Request,
    middleware::Next,
    response::Response,
};
use std::time::Instant;
use tracing::{info, warn};

/// Which game entity a path segment names, from the route template
fn entity_of(param: &str) -> Option<&'static str> {
    match param {
        ":suuid" => Some("space"),
        ":cuuid" => Some("circle"),
        ":puuid" => Some("player"),
        _ => None,
    }
}

/// First (entity, id) named by the path, e.g. ("space", "9f1c...") for
/// `/spaces/9f1c.../payouts` matched against `/spaces/:suuid/payouts`.
pub fn path_entity(template: &str, path: &str) -> Option<(&'static str, String)> {
    template
        .split('/')
        .zip(path.split('/'))
        .find_map(|(param, value)| entity_of(param).map(|entity| (entity, value.to_string())))
}

/// INFO for handled requests, WARN for 5xx. `/health` is not logged.
pub async fn request_logging(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|matched| matched.as_str().to_string());

    if path == "/health" {
        return next.run(request).await;
    }

    let (entity, id) = route
        .as_deref()
        .and_then(|template| path_entity(template, &path))
        .unwrap_or(("none", String::new()));
    let route = route.unwrap_or_else(|| "unmatched".to_string());

    let start = Instant::now();
    let response = next.run(request).await;
    let latency_ms = start.elapsed().as_millis() as u64;
    let status = response.status().as_u16();

    if status >= 500 {
        warn!(%method, %route, entity, id = %id, status, latency_ms, "Request failed (5xx)");
    } else {
        info!(%method, %route, entity, id = %id, status, latency_ms, "Request handled");
    }

    response
}
