//! Local HTTP doubles for client tests

use axum::{
    http::{header, HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use serde_json::Value;
use std::sync::{Arc, Mutex};

/// Authorization header and JSON body of every request a double received
pub type Seen = Arc<Mutex<Vec<(String, Value)>>>;

/// Serve `app` on an ephemeral local port and return its base URL
pub async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

/// Answer POST `path` with `reply`, remembering each request
pub fn recording(path: &str, reply: Value) -> (Router, Seen) {
    let seen: Seen = Arc::default();
    let log = seen.clone();

    let app = Router::new().route(
        path,
        post(move |headers: HeaderMap, Json(body): Json<Value>| {
            let log = log.clone();
            let reply = reply.clone();
            async move {
                let auth = headers
                    .get(header::AUTHORIZATION)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                log.lock().unwrap().push((auth, body));
                Json(reply)
            }
        }),
    );

    (app, seen)
}

/// Answer POST `path` with a fixed error status
pub fn failing(path: &str, status: StatusCode, body: &'static str) -> Router {
    Router::new().route(path, post(move || async move { (status, body) }))
}

/// A base URL nothing listens on
pub async fn closed_port() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}
