//! Dispatch while routes and middleware change underneath.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use axum::body::Bytes;
use axum::http::{Method, StatusCode};
use pathmux::middleware::pool::POOL_CAPACITY;
use pathmux::{handler_fn, Context, Middleware, Mux, Request, ResponseWriter};

const ROUTES: usize = 200;
const READERS: usize = 8;

fn request(method: Method, path: &str) -> Request {
    axum::http::Request::builder()
        .method(method)
        .uri(path)
        .body(Bytes::new())
        .unwrap()
}

fn dispatch(mux: &Mux, method: Method, path: &str) -> ResponseWriter {
    let mut w = ResponseWriter::new();
    mux.serve(&Context::background(), &mut w, &request(method, path));
    w
}

fn tag_layer() -> Middleware {
    Middleware::with_next(|cx, w, req, next| {
        w.headers_mut().insert("x-layer", "1".parse().unwrap());
        next.serve(cx, w, req);
    })
}

#[test]
fn test_readers_see_consistent_snapshots_during_registration() {
    let mux = Mux::new();
    mux.get(
        "/fixed",
        handler_fn(|_: &Context, w: &mut ResponseWriter, _: &Request| {
            w.write_body("fixed");
        }),
    )
    .unwrap();

    let done = Arc::new(AtomicBool::new(false));
    let served = Arc::new(AtomicUsize::new(0));

    let readers: Vec<_> = (0..READERS)
        .map(|n| {
            let mux = mux.clone();
            let done = done.clone();
            let served = served.clone();
            thread::spawn(move || {
                let mut k = n;
                while !done.load(Ordering::Acquire) {
                    let w = dispatch(&mux, Method::GET, "/fixed");
                    assert_eq!(w.status(), StatusCode::OK);
                    assert_eq!(w.body(), b"fixed");

                    // Either the route exists yet or it does not; never a
                    // foreign body.
                    let id = k % ROUTES;
                    let w = dispatch(&mux, Method::GET, &format!("/r/{id}"));
                    match w.status() {
                        StatusCode::OK => assert_eq!(w.body(), format!("r{id}").as_bytes()),
                        StatusCode::NOT_FOUND => {}
                        other => panic!("unexpected status {other} for /r/{id}"),
                    }

                    // Registered for GET only, so POST is 405 once present.
                    let w = dispatch(&mux, Method::POST, &format!("/r/{id}"));
                    assert!(matches!(
                        w.status(),
                        StatusCode::METHOD_NOT_ALLOWED | StatusCode::NOT_FOUND
                    ));

                    k += READERS;
                    served.fetch_add(1, Ordering::Relaxed);
                }
            })
        })
        .collect();

    let writer = {
        let mux = mux.clone();
        thread::spawn(move || {
            let layer = tag_layer();
            for id in 0..ROUTES {
                mux.get(
                    &format!("/r/{id}"),
                    handler_fn(move |_: &Context, w: &mut ResponseWriter, _: &Request| {
                        w.write_body(format!("r{id}"));
                    }),
                )
                .unwrap();
                if id % 10 == 0 {
                    mux.use_layer(layer.clone());
                } else if id % 10 == 5 {
                    mux.abandon(&layer).unwrap();
                }
            }
        })
    };

    writer.join().unwrap();
    done.store(true, Ordering::Release);
    for reader in readers {
        reader.join().unwrap();
    }

    assert!(served.load(Ordering::Relaxed) > 0);
    assert!(mux.stack().idle() <= POOL_CAPACITY);
    assert_eq!(mux.router().routes().len(), ROUTES + 1);
    for id in 0..ROUTES {
        let w = dispatch(&mux, Method::GET, &format!("/r/{id}"));
        assert_eq!(w.body(), format!("r{id}").as_bytes(), "route {id}");
    }
}

#[test]
fn test_old_automaton_keeps_serving_its_snapshot() {
    let mux = Mux::new();
    mux.get(
        "/a",
        handler_fn(|_: &Context, w: &mut ResponseWriter, _: &Request| w.write_body("a")),
    )
    .unwrap();
    let old = mux.router().machine();

    mux.get(
        "/b",
        handler_fn(|_: &Context, w: &mut ResponseWriter, _: &Request| w.write_body("b")),
    )
    .unwrap();

    assert!(matches!(
        old.route(pathmux::MethodSet::GET, "/b"),
        pathmux::routing::Resolution::Unmatched { .. }
    ));
    assert!(matches!(
        old.route(pathmux::MethodSet::GET, "/a"),
        pathmux::routing::Resolution::Matched { .. }
    ));
    assert_eq!(dispatch(&mux, Method::GET, "/b").body(), b"b");
}
