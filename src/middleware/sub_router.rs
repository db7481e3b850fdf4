//! Mounting a nested mux under a wildcard route.

use axum::http::Uri;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

use crate::http::Request;
use crate::middleware::Middleware;

/// Bytes re-escaped when the decoded remainder goes back into a URI.
/// `%` is included so the inner router decodes to the same text.
const PATH: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Rewrites the request path to the `*` binding of the matched route, so
/// the inner handler routes on the remainder. The query string is kept.
/// Requests without a wildcard binding pass through untouched.
pub fn sub_router() -> Middleware {
    Middleware::with_next(|cx, w, req, next| {
        let Some(rest) = cx.params().and_then(|p| p.wildcard()) else {
            next.serve(cx, w, req);
            return;
        };

        match strip(req, rest) {
            Some(inner) => next.serve(cx, w, &inner),
            None => next.serve(cx, w, req),
        }
    })
}

fn strip(req: &Request, rest: &str) -> Option<Request> {
    let path = utf8_percent_encode(if rest.is_empty() { "/" } else { rest }, PATH).to_string();
    let uri: Uri = match req.uri().query() {
        Some(query) => format!("{path}?{query}").parse().ok()?,
        None => path.parse().ok()?,
    };

    let mut builder = axum::http::Request::builder()
        .method(req.method().clone())
        .version(req.version())
        .uri(uri);
    if let Some(headers) = builder.headers_mut() {
        headers.extend(req.headers().clone());
    }
    builder.body(req.body().clone()).ok()
}
