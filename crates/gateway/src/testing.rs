//! Loopback HTTP backend for tests of this crate and of its users.

use std::sync::{Arc, Mutex};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// One canned answer of the stub backend.
#[derive(Debug, Clone)]
pub struct Route {
    pub path: &'static str,
    pub status: &'static str,
    pub body: String,
}

impl Route {
    pub fn ok(path: &'static str, body: serde_json::Value) -> Self {
        Self {
            path,
            status: "200 OK",
            body: body.to_string(),
        }
    }

    pub fn status(path: &'static str, status: &'static str) -> Self {
        Self {
            path,
            status,
            body: r#"{"detail":"stub"}"#.to_string(),
        }
    }

    /// A body sent verbatim, for answers that are not valid JSON values.
    pub fn raw(path: &'static str, status: &'static str, body: &str) -> Self {
        Self {
            path,
            status,
            body: body.to_string(),
        }
    }
}

/// Loopback HTTP backend. Routes match on the path, query ignored; anything
/// else gets a 404. Every request is recorded as received.
pub struct StubBackend {
    pub base_url: String,
    requests: Arc<Mutex<Vec<String>>>,
}

impl StubBackend {
    pub async fn start(routes: Vec<Route>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let requests = Arc::new(Mutex::new(Vec::new()));
        let requests_in = requests.clone();

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let routes = routes.clone();
                let requests = requests_in.clone();
                tokio::spawn(async move {
                    let request = read_request(&mut socket).await;
                    let path = path_of(&request).to_string();
                    requests.lock().unwrap().push(request);

                    let (status, body) = routes
                        .iter()
                        .find(|r| r.path == path)
                        .map(|r| (r.status, r.body.clone()))
                        .unwrap_or(("404 Not Found", r#"{"error":"Endpoint not found"}"#.to_string()));
                    let response = format!(
                        "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        status,
                        body.len(),
                        body
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        Self { base_url, requests }
    }

    /// Requests received for `path`.
    pub fn hits(&self, path: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| path_of(r) == path)
            .count()
    }

    /// Every request received so far, head and body.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

fn path_of(request: &str) -> &str {
    request
        .split_whitespace()
        .nth(1)
        .unwrap_or("")
        .split('?')
        .next()
        .unwrap_or("")
}

async fn read_request(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        let n = socket.read(&mut chunk).await.unwrap_or(0);
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        let text = String::from_utf8_lossy(&buf).to_string();
        if let Some(end) = text.find("\r\n\r\n") {
            let length = text
                .lines()
                .find_map(|l| {
                    l.to_ascii_lowercase()
                        .strip_prefix("content-length:")
                        .and_then(|v| v.trim().parse::<usize>().ok())
                })
                .unwrap_or(0);
            if buf.len() >= end + 4 + length {
                return text;
            }
        }
    }
    String::from_utf8_lossy(&buf).to_string()
}
