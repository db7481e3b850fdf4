//! Adapter from a `Mux` to an `axum` service.
//!
//! # Responsibilities
//! - Buffer the request body, bounded by the configured limit
//! - Give every request a `Context` whose token fires when the client goes
//!   away or the server gives up draining
//! - Run the synchronous chain on the blocking pool
//!
//! # Design Decisions
//! - A single fallback route; all routing happens inside the `Mux`
//! - Handler panics are resumed on the connection task unchanged

use axum::body::Body;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tokio_util::sync::CancellationToken;

use crate::http::{Context, Request, ResponseWriter};
use crate::mux::Mux;

#[derive(Clone)]
struct Bridge {
    mux: Mux,
    max_body_bytes: usize,
    cancel: CancellationToken,
}

/// Build an `axum::Router` that sends every request through `mux`.
/// Contexts derive their tokens from `cancel`.
pub fn router(mux: Mux, max_body_bytes: usize, cancel: CancellationToken) -> axum::Router {
    axum::Router::new().fallback(dispatch).with_state(Bridge {
        mux,
        max_body_bytes,
        cancel,
    })
}

async fn dispatch(State(bridge): State<Bridge>, request: axum::http::Request<Body>) -> Response {
    let (parts, body) = request.into_parts();
    let body = match axum::body::to_bytes(body, bridge.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::debug!(error = %e, limit = bridge.max_body_bytes, "Rejected request body");
            return (StatusCode::PAYLOAD_TOO_LARGE, "request body too large\n").into_response();
        }
    };
    let request = Request::from_parts(parts, body);

    let token = bridge.cancel.child_token();
    // Fires if this future is dropped before the handler finishes.
    let _guard = token.clone().drop_guard();
    let cx = Context::new(token);

    let mux = bridge.mux;
    let served = tokio::task::spawn_blocking(move || {
        let mut w = ResponseWriter::new();
        mux.serve(&cx, &mut w, &request);
        w
    })
    .await;

    match served {
        Ok(w) => w.into_response(),
        Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
        Err(e) => {
            tracing::warn!(error = %e, "Handler task cancelled");
            StatusCode::SERVICE_UNAVAILABLE.into_response()
        }
    }
}
