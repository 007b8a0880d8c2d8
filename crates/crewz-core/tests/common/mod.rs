// Not every test binary uses every helper
#![allow(dead_code)]

use std::sync::Arc;

use crewz_core::storage::{KeyValueStore, StorageError};
use crewz_core::{ApiClient, SessionStore};
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use wiremock::matchers::{body_json, method, path};
use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};

pub const TOKEN_KEY: &str = "auth_token";
pub const USER_KEY: &str = "user_data";

pub fn user_json(id: &str, username: &str) -> Value {
    json!({
        "id": id,
        "username": username,
        "email": format!("{username}@crewz.test"),
        "full_name": "Ada Boost",
        "bio": "old",
        "profile_image": "",
        "followers_count": 3,
        "following_count": 5,
        "posts_count": 8,
        "vehicles_count": 2,
        "created_at": "2024-05-01T12:30:00.123456"
    })
}

pub fn store_for(server: &MockServer, storage: Arc<dyn KeyValueStore>) -> SessionStore {
    store_at(&server.uri(), storage)
}

pub fn store_at(base_url: &str, storage: Arc<dyn KeyValueStore>) -> SessionStore {
    let api = ApiClient::new(base_url).expect("client should build");
    SessionStore::new(api, storage)
}

/// Accept `email`/`password` and answer with `token` and `user`
pub async fn mount_login(server: &MockServer, email: &str, password: &str, token: &str, user: Value) {
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .and(body_json(json!({"email": email, "password": password})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": token,
            "token_type": "bearer",
            "user": user
        })))
        .mount(server)
        .await;
}

/// Matches requests sent without an `Authorization` header
pub struct NoAuthHeader;

impl Match for NoAuthHeader {
    fn matches(&self, request: &Request) -> bool {
        !request.headers.contains_key("authorization")
    }
}

/// Reads succeed with nothing stored; every write fails.
pub struct ReadOnlyStore;

impl KeyValueStore for ReadOnlyStore {
    fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
        Ok(None)
    }

    fn set_many(&self, _entries: &[(&str, &str)]) -> Result<(), StorageError> {
        Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only").into())
    }

    fn multi_remove(&self, _keys: &[&str]) -> Result<(), StorageError> {
        Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only").into())
    }
}

/// Backend that answers only when the test says so, for checking what the
/// session looks like while a request is in flight.
pub struct HeldServer {
    listener: TcpListener,
}

impl HeldServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        Self { listener }
    }

    pub fn uri(&self) -> String {
        format!("http://{}", self.listener.local_addr().unwrap())
    }

    /// Wait until a whole request has arrived
    pub async fn next_request(&self) -> HeldRequest {
        let (mut stream, _) = self.listener.accept().await.unwrap();
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];

        let head_end = loop {
            let n = stream.read(&mut chunk).await.unwrap();
            assert!(n > 0, "connection closed mid-request");
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
        };
        let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
        let content_length = head
            .lines()
            .filter_map(|line| line.split_once(':'))
            .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
            .and_then(|(_, value)| value.trim().parse::<usize>().ok())
            .unwrap_or(0);
        while buf.len() < head_end + content_length {
            let n = stream.read(&mut chunk).await.unwrap();
            assert!(n > 0, "connection closed mid-body");
            buf.extend_from_slice(&chunk[..n]);
        }

        HeldRequest {
            request_line: head.lines().next().unwrap_or_default().to_string(),
            stream,
        }
    }
}

pub struct HeldRequest {
    pub request_line: String,
    stream: TcpStream,
}

impl HeldRequest {
    /// Answer `200 OK` with a JSON body
    pub async fn respond(mut self, body: Value) {
        let body = body.to_string();
        let response = format!(
            "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
            body.len(),
            body
        );
        self.stream.write_all(response.as_bytes()).await.unwrap();
        let _ = self.stream.shutdown().await;
    }
}
