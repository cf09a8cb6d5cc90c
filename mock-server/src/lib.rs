use std::{collections::BTreeMap, sync::Arc, time::Duration};

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, HeaderMap, Method, StatusCode, Uri},
    routing::{any, get},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};

/// One request the server has seen.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Hit {
    pub method: String,
    pub path: String,
}

/// What `/echo` reports back about the request it received.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Echo {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub headers: BTreeMap<String, Vec<String>>,
    pub body: String,
}

impl Echo {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .and_then(|values| values.first())
            .map(String::as_str)
    }
}

pub type Hits = Arc<RwLock<Vec<Hit>>>;

pub fn app() -> Router {
    let hits: Hits = Arc::new(RwLock::new(Vec::new()));
    Router::new()
        .route("/text", get(text))
        .route("/echo", any(echo))
        .route("/status/{code}", get(status))
        .route("/delay/{ms}", get(delay))
        .route("/redirect", get(redirect))
        .route("/hits", get(list_hits))
        .with_state(hits)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    tracing::info!(addr = ?listener.local_addr().ok(), "mock server listening");
    axum::serve(listener, app()).await
}

async fn record(hits: &Hits, method: &Method, path: &str) {
    tracing::debug!(%method, path, "hit");
    hits.write().await.push(Hit {
        method: method.to_string(),
        path: path.to_string(),
    });
}

async fn text(State(hits): State<Hits>, method: Method) -> impl axum::response::IntoResponse {
    record(&hits, &method, "/text").await;
    (StatusCode::OK, [(header::CONTENT_TYPE, "text/plain")], "ok")
}

async fn echo(
    State(hits): State<Hits>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Json<Echo> {
    record(&hits, &method, uri.path()).await;
    let mut seen: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, value) in &headers {
        seen.entry(name.as_str().to_string())
            .or_default()
            .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
    }
    Json(Echo {
        method: method.to_string(),
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        headers: seen,
        body: String::from_utf8_lossy(&body).into_owned(),
    })
}

async fn status(
    State(hits): State<Hits>,
    method: Method,
    Path(code): Path<u16>,
) -> Result<(StatusCode, String), StatusCode> {
    record(&hits, &method, &format!("/status/{code}")).await;
    let status = StatusCode::from_u16(code).map_err(|_| StatusCode::BAD_REQUEST)?;
    Ok((status, format!("status {code}")))
}

async fn delay(State(hits): State<Hits>, method: Method, Path(ms): Path<u64>) -> &'static str {
    record(&hits, &method, &format!("/delay/{ms}")).await;
    tokio::time::sleep(Duration::from_millis(ms)).await;
    "ok"
}

async fn redirect(State(hits): State<Hits>, method: Method) -> impl axum::response::IntoResponse {
    record(&hits, &method, "/redirect").await;
    (StatusCode::FOUND, [(header::LOCATION, "/text")], "moved")
}

async fn list_hits(State(hits): State<Hits>) -> Json<Vec<Hit>> {
    Json(hits.read().await.clone())
}
