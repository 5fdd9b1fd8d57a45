//! Local HTTP image server fixture.
//!
//! Serves preloaded byte blobs at `/img/{name}` and counts requests per
//! image, so tests can assert how often the cache actually went to the
//! network. No external network is involved.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use bytes::Bytes;

/// In-memory image server with per-image request counting.
#[derive(Clone, Default)]
pub struct ImageFixture {
    state: Arc<FixtureState>,
}

#[derive(Default)]
struct FixtureState {
    images: Mutex<HashMap<String, Bytes>>,
    request_counts: Mutex<HashMap<String, usize>>,
}

impl ImageFixture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `bytes` to be served at `/img/{name}`.
    pub fn insert(&self, name: impl Into<String>, bytes: impl Into<Bytes>) {
        self.state
            .images
            .lock()
            .unwrap()
            .insert(name.into(), bytes.into());
    }

    /// Number of requests observed for `/img/{name}` (404s included).
    pub fn request_count(&self, name: &str) -> usize {
        self.state
            .request_counts
            .lock()
            .unwrap()
            .get(name)
            .copied()
            .unwrap_or(0)
    }

    /// Start the fixture server and return the base URL (ending with `/`).
    ///
    /// Startup follows the usual local-fixture pattern: bind a
    /// `std::net::TcpListener` on an ephemeral port, mark it non-blocking,
    /// hand it to `tokio::net::TcpListener::from_std`, and spawn
    /// `axum::serve` in the background.
    pub async fn start(&self) -> String {
        let app = Router::new()
            .route("/img/{name}", get(serve_image))
            .with_state(self.state.clone());

        let listener = std::net::TcpListener::bind("127.0.0.1:0")
            .expect("failed to bind local fixture server");
        listener
            .set_nonblocking(true)
            .expect("failed to set nonblocking on fixture listener");
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let listener = tokio::net::TcpListener::from_std(listener)
                .expect("failed to convert fixture listener to tokio listener");
            axum::serve(listener, app).await.unwrap();
        });

        format!("http://{addr}/")
    }
}

async fn serve_image(
    State(state): State<Arc<FixtureState>>,
    Path(name): Path<String>,
) -> impl IntoResponse {
    *state
        .request_counts
        .lock()
        .unwrap()
        .entry(name.clone())
        .or_insert(0) += 1;

    match state.images.lock().unwrap().get(&name) {
        Some(bytes) => (StatusCode::OK, bytes.clone()).into_response(),
        None => (StatusCode::NOT_FOUND, "no such image").into_response(),
    }
}
