use axum::body::{Body, to_bytes};
use axum::extract::Request;
use axum::http::{HeaderMap, HeaderName, StatusCode};
use axum::response::{IntoResponse, Response};
use url::Url;

use crate::error::DispatchError;

/// Request body size the proxy will buffer before giving up and returning a
/// 413. Workers are simple tenant processes, not file-upload services, so
/// this is generous without being unbounded.
const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Headers that must not be copied verbatim onto the outgoing request:
/// `Host` is tenant-specific and must be re-derived for the worker's own
/// loopback address, and the hop-by-hop headers are connection-scoped, per
/// RFC 7230 §6.1.
const HOP_BY_HOP: &[&str] = &[
    "host",
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailers",
    "transfer-encoding",
    "upgrade",
];

/// Forward `req` to `target_url`, preserving method, path, query, headers,
/// and body, and stream the worker's response straight back to the client
/// without buffering it in full.
///
/// Buffers the request body (bounded by [`MAX_BODY_BYTES`]) since most
/// tenant payloads are small form/API bodies and `reqwest` needs an owned
/// body to retry-safely hand to the worker; the response body is streamed.
pub async fn forward(http: &reqwest::Client, target_url: &Url, req: Request) -> Response {
    let (parts, body) = req.into_parts();

    let body_bytes = match to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(_) => return StatusCode::PAYLOAD_TOO_LARGE.into_response(),
    };

    let mut upstream_url = target_url.clone();
    upstream_url.set_path(parts.uri.path());
    upstream_url.set_query(parts.uri.query());

    let method = reqwest::Method::from_bytes(parts.method.as_str().as_bytes())
        .unwrap_or(reqwest::Method::GET);

    let mut upstream_headers = reqwest::header::HeaderMap::new();
    for (name, value) in parts.headers.iter() {
        if HOP_BY_HOP.contains(&name.as_str()) {
            continue;
        }
        upstream_headers.insert(name.clone(), value.clone());
    }

    let sent = http
        .request(method, upstream_url)
        .headers(upstream_headers)
        .body(body_bytes)
        .send()
        .await;

    match sent {
        Ok(resp) => translate_response(resp),
        Err(err) => DispatchError::Proxy(err).into_response(),
    }
}

fn translate_response(resp: reqwest::Response) -> Response {
    let status = StatusCode::from_u16(resp.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);

    let mut headers = HeaderMap::new();
    for (name, value) in resp.headers().iter() {
        if HOP_BY_HOP.contains(&name.as_str()) {
            continue;
        }
        if let Ok(name) = HeaderName::from_bytes(name.as_str().as_bytes()) {
            headers.insert(name, value.clone());
        }
    }

    let body = Body::from_stream(resp.bytes_stream());

    let mut response = Response::new(body);
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}
