//! Ephemeral HTTP server and fixtures shared by the integration tests.

#![allow(dead_code)]

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use axum::body::Bytes;
use axum::http::header::{CONTENT_TYPE, COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use httpcheck::Server;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Greeting {
    pub msg: String,
    pub time: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
}

/// Serves a router on a random loopback port from a background runtime,
/// so blocking clients can talk to it from the test thread.
pub struct TestServer {
    base_url: String,
    shutdown: Option<oneshot::Sender<()>>,
}

impl TestServer {
    pub fn start(app: Router) -> Result<TestServer> {
        init_tracing();

        let listener =
            std::net::TcpListener::bind("127.0.0.1:0").context("bind test listener")?;
        listener
            .set_nonblocking(true)
            .context("set listener non-blocking")?;
        let base_url = format!("http://{}", listener.local_addr()?);
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("build test server runtime")?;
        let (shutdown, stopped) = oneshot::channel::<()>();

        std::thread::spawn(move || {
            runtime.block_on(async move {
                let listener = match tokio::net::TcpListener::from_std(listener) {
                    Ok(listener) => listener,
                    Err(err) => {
                        tracing::error!(%err, "test server could not adopt listener");
                        return;
                    }
                };
                let serve = axum::serve(listener, app).with_graceful_shutdown(async {
                    let _ = stopped.await;
                });
                if let Err(err) = serve.await {
                    tracing::error!(%err, "test server stopped");
                }
            })
        });

        Ok(TestServer {
            base_url,
            shutdown: Some(shutdown),
        })
    }
}

impl Server for TestServer {
    fn url(&self) -> String {
        self.base_url.clone()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}

/// Answers every request with a body cut short of its `Content-Length`,
/// then closes the connection.
pub struct TruncatedServer {
    base_url: String,
}

impl TruncatedServer {
    pub fn start(partial: &'static str) -> Result<TruncatedServer> {
        init_tracing();

        let listener =
            std::net::TcpListener::bind("127.0.0.1:0").context("bind truncated listener")?;
        let base_url = format!("http://{}", listener.local_addr()?);
        std::thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else { continue };
                if let Err(err) = answer_truncated(&mut stream, partial) {
                    tracing::error!(%err, "truncated server could not answer");
                }
            }
        });
        Ok(TruncatedServer { base_url })
    }
}

fn answer_truncated(stream: &mut std::net::TcpStream, partial: &str) -> std::io::Result<()> {
    use std::io::{BufRead, BufReader, Write};

    let mut reader = BufReader::new(stream.try_clone()?);
    let mut line = String::new();
    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 || line == "\r\n" {
            break;
        }
    }
    write!(
        stream,
        "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: {}\r\n\r\n{}",
        partial.len() + 95,
        partial
    )?;
    stream.flush()
}

impl Server for TruncatedServer {
    fn url(&self) -> String {
        self.base_url.clone()
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_test_writer()
        .try_init();
}

pub fn app() -> Router {
    Router::new()
        .route("/", get(index))
        .route("/greet", any(greet))
        .route("/headers", any(echo_headers))
        .route("/echo", any(echo_body))
        .route("/items", get(|| async { Json(vec![3, 1, 2]) }))
        .route("/user", get(user))
        .route("/broken", get(broken))
        .route("/login", any(login))
        .route("/whoami", get(whoami))
}

async fn index() -> impl IntoResponse {
    ([(CONTENT_TYPE, "text/plain")], "hello world")
}

async fn greet(method: Method, body: String) -> Response {
    if method != Method::POST {
        return StatusCode::METHOD_NOT_ALLOWED.into_response();
    }
    let name = url::form_urlencoded::parse(body.as_bytes())
        .find(|(key, _)| key == "name")
        .map(|(_, value)| value.into_owned())
        .unwrap_or_default();
    if name.is_empty() {
        return StatusCode::BAD_REQUEST.into_response();
    }
    Json(Greeting {
        msg: format!("hello {}", name),
        time: Utc::now(),
    })
    .into_response()
}

async fn echo_headers(headers: HeaderMap) -> Json<BTreeMap<String, Vec<String>>> {
    let mut echoed: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, value) in &headers {
        echoed
            .entry(name.as_str().to_string())
            .or_default()
            .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
    }
    Json(echoed)
}

async fn echo_body(headers: HeaderMap, body: Bytes) -> Response {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("application/octet-stream")
        .to_string();
    ([(CONTENT_TYPE, content_type)], body).into_response()
}

async fn user() -> Json<User> {
    Json(User {
        id: format!("u-{}", Utc::now().timestamp_millis()),
        name: "greg".to_string(),
    })
}

async fn broken() -> impl IntoResponse {
    ([(CONTENT_TYPE, "application/json")], "{not json")
}

async fn login() -> impl IntoResponse {
    ([(SET_COOKIE, "session=greg; Path=/")], "welcome")
}

async fn whoami(headers: HeaderMap) -> Response {
    let session = headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().strip_prefix("session="))
        .next()
        .map(str::to_string);
    match session {
        Some(name) => name.into_response(),
        None => StatusCode::UNAUTHORIZED.into_response(),
    }
}
