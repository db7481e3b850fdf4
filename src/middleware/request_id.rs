//! Request ID middleware.
//!
//! Reuses an inbound `X-Request-Id` header or generates a UUID v4. The ID is
//! attached to the context and echoed on the response.

use axum::http::{HeaderName, HeaderValue};
use uuid::Uuid;

use crate::http::Context;
use crate::middleware::Middleware;

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// The ID of the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

impl RequestId {
    pub fn get(cx: &Context) -> Option<&str> {
        cx.value::<RequestId>().map(|id| id.0.as_str())
    }
}

pub fn request_id() -> Middleware {
    Middleware::with_next(|cx, w, req, next| {
        let id = req
            .headers()
            .get(&X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(str::to_owned)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        if let Ok(value) = HeaderValue::from_str(&id) {
            w.headers_mut().insert(X_REQUEST_ID, value);
        }
        next.serve(&cx.with_value(RequestId(id)), w, req);
    })
}
