use axum::body::{to_bytes, Body};
use axum::extract::{Request, State};
use axum::http::{Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::idempotency::CachedResponse;
use crate::state::ServiceState;

const MAX_BUFFERED_BODY: usize = 16 * 1024 * 1024;

/// Makes a POST idempotent when the client supplies a request-id header:
/// the first request runs the handler and caches `(status, body)`
/// verbatim; every repeat with the same id replays that response without
/// touching the handler, so it can't re-fire a webhook or mutate state
/// twice. GET/HEAD and POSTs without a request id pass straight through.
pub async fn idempotency_layer(State(state): State<ServiceState>, request: Request, next: Next) -> Response {
    if request.method() != Method::POST {
        return next.run(request).await;
    }

    let Some(request_id) = state.request_id(request.headers()) else {
        return next.run(request).await;
    };

    if let Some(cached) = state.idempotency.get(&request_id) {
        return replay(cached);
    }

    let response = next.run(request).await;
    let status = response.status().as_u16();
    let content_type = response
        .headers()
        .get(axum::http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let (parts, body) = response.into_parts();
    let bytes = match to_bytes(body, MAX_BUFFERED_BODY).await {
        Ok(bytes) => bytes,
        Err(_) => return (StatusCode::INTERNAL_SERVER_ERROR, "failed to buffer response body").into_response(),
    };

    state.idempotency.insert(
        request_id,
        CachedResponse {
            status,
            body: bytes.to_vec(),
            content_type,
        },
    );

    Response::from_parts(parts, Body::from(bytes))
}

fn replay(cached: CachedResponse) -> Response {
    let status = StatusCode::from_u16(cached.status).unwrap_or(StatusCode::OK);
    let mut response = (status, cached.body).into_response();
    if let Some(content_type) = cached.content_type {
        if let Ok(value) = content_type.parse() {
            response.headers_mut().insert(axum::http::header::CONTENT_TYPE, value);
        }
    }
    response
}
