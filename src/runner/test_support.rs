//! Local stub endpoints for runner tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::{http::StatusCode, routing::post, Json, Router};
use serde_json::Value;

pub const STUB_PATH: &str = "/api/rsvp";

/// Serve `app` on an ephemeral port and return the endpoint URL
pub async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}{}", addr, STUB_PATH)
}

/// Stub whose reply depends on the 1-based arrival count of each request
pub fn counting_stub<F>(respond: F) -> Router
where
    F: Fn(usize) -> (StatusCode, Value) + Clone + Send + Sync + 'static,
{
    let hits = Arc::new(AtomicUsize::new(0));
    Router::new().route(
        STUB_PATH,
        post(move || {
            let hits = Arc::clone(&hits);
            let respond = respond.clone();
            async move {
                let n = hits.fetch_add(1, Ordering::SeqCst) + 1;
                let (status, body) = respond(n);
                (status, Json(body))
            }
        }),
    )
}

/// Endpoint on a port nothing listens on
pub async fn refused_endpoint() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}{}", addr, STUB_PATH)
}
