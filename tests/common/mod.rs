//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use pathmux::{HttpServer, Mux, ServerConfig, Shutdown};

pub struct TestServer {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub handle: JoinHandle<Result<(), std::io::Error>>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

/// Serve `mux` on an ephemeral local port.
#[allow(dead_code)]
pub async fn spawn(mux: Mux) -> TestServer {
    spawn_with(mux, ServerConfig::default()).await
}

pub async fn spawn_with(mux: Mux, mut config: ServerConfig) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    config.listener.bind_address = addr.to_string();

    let shutdown = Shutdown::new();
    let server = HttpServer::new(mux, config);
    let rx = shutdown.subscribe();
    let handle = tokio::spawn(server.run(listener, rx));

    // Give the accept loop a moment to start.
    tokio::time::sleep(Duration::from_millis(20)).await;
    TestServer { addr, shutdown, handle }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .build()
        .unwrap()
}
