//! API client for communicating with the CrewzNation REST API.
//!
//! Every authenticated call asks an `AuthProvider` for its headers at send
//! time, so a token swapped by login/logout is picked up by the very next
//! request.

use std::time::Duration;

use reqwest::{header, Client, Method, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

use crate::models::{AuthResponse, LoginRequest, ProfileUpdate, RegisterRequest, User};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds.
/// 30s allows for slow mobile networks while still failing eventually.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

const LOGIN_PATH: &str = "/api/auth/login";
const REGISTER_PATH: &str = "/api/auth/register";
const CURRENT_USER_PATH: &str = "/api/auth/me";
const PROFILE_PATH: &str = "/api/users/profile";

const GENERIC_FAILURE: &str = "Request failed";

/// Source of the `Authorization` header for outgoing requests.
pub trait AuthProvider: Send + Sync {
    fn auth_header(&self) -> Result<header::HeaderMap, ApiError>;
}

/// Sends requests without credentials.
pub struct Anonymous;

impl AuthProvider for Anonymous {
    fn auth_header(&self) -> Result<header::HeaderMap, ApiError> {
        Ok(header::HeaderMap::new())
    }
}

/// `Authorization: Bearer <token>` when a token is present, empty otherwise.
pub fn bearer_header(token: Option<&str>) -> Result<header::HeaderMap, ApiError> {
    let mut headers = header::HeaderMap::new();
    if let Some(token) = token {
        let mut value = header::HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|_| ApiError::InvalidToken)?;
        value.set_sensitive(true);
        headers.insert(header::AUTHORIZATION, value);
    }
    Ok(headers)
}

/// API client for the CrewzNation backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// Create a client with the default timeout
    pub fn new(base_url: impl Into<String>) -> Result<Self, ApiError> {
        Self::with_timeout(base_url, Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS))
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(timeout).build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Check if response is successful, returning an error with the server's
    /// message if not.
    async fn check_response(
        response: reqwest::Response,
        fallback: &str,
    ) -> Result<reqwest::Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body, fallback))
        }
    }

    async fn parse_json<T: DeserializeOwned>(
        response: reqwest::Response,
        url: &str,
    ) -> Result<T, ApiError> {
        let status = response.status();
        let text = response.text().await?;
        if status == StatusCode::NO_CONTENT || text.trim().is_empty() {
            // Lets callers ask for `()` or `Option<T>` on empty bodies
            return serde_json::from_str("null")
                .map_err(|e| ApiError::InvalidResponse(format!("{}: empty body ({})", url, e)));
        }
        serde_json::from_str(&text)
            .map_err(|e| ApiError::InvalidResponse(format!("{}: {}", url, e)))
    }

    async fn send<T, B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        auth: &dyn AuthProvider,
        fallback: &str,
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = self.url(path);
        debug!(%method, url = %url, "Sending request");

        let mut request = self
            .client
            .request(method, &url)
            .headers(auth.auth_header()?);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let response = Self::check_response(response, fallback).await?;
        Self::parse_json(response, &url).await
    }

    // ===== Auth =====

    pub async fn login(&self, credentials: &LoginRequest) -> Result<AuthResponse, ApiError> {
        self.send(Method::POST, LOGIN_PATH, Some(credentials), &Anonymous, "Login failed")
            .await
    }

    pub async fn register(&self, registration: &RegisterRequest) -> Result<AuthResponse, ApiError> {
        self.send(
            Method::POST,
            REGISTER_PATH,
            Some(registration),
            &Anonymous,
            "Registration failed",
        )
        .await
    }

    /// Fetch the member a token belongs to. Used to verify a stored token.
    pub async fn current_user(&self, token: &str) -> Result<User, ApiError> {
        let url = self.url(CURRENT_USER_PATH);
        let response = self
            .client
            .get(&url)
            .headers(bearer_header(Some(token))?)
            .send()
            .await?;

        let response = Self::check_response(response, "Session expired").await?;
        Self::parse_json(response, &url).await
    }

    /// Push profile changes. The backend reads these as query parameters.
    pub async fn update_profile(
        &self,
        auth: &dyn AuthProvider,
        update: &ProfileUpdate,
    ) -> Result<(), ApiError> {
        let url = self.url(PROFILE_PATH);
        let response = self
            .client
            .put(&url)
            .headers(auth.auth_header()?)
            .query(update)
            .send()
            .await?;

        Self::check_response(response, "Profile update failed").await?;
        Ok(())
    }

    // ===== Generic authenticated requests =====

    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        auth: &dyn AuthProvider,
    ) -> Result<T, ApiError> {
        self.send::<T, ()>(Method::GET, path, None, auth, GENERIC_FAILURE)
            .await
    }

    pub async fn post<T, B>(&self, path: &str, body: &B, auth: &dyn AuthProvider) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send(Method::POST, path, Some(body), auth, GENERIC_FAILURE)
            .await
    }

    pub async fn put<T, B>(&self, path: &str, body: &B, auth: &dyn AuthProvider) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send(Method::PUT, path, Some(body), auth, GENERIC_FAILURE)
            .await
    }

    pub async fn delete<T: DeserializeOwned>(
        &self,
        path: &str,
        auth: &dyn AuthProvider,
    ) -> Result<T, ApiError> {
        self.send::<T, ()>(Method::DELETE, path, None, auth, GENERIC_FAILURE)
            .await
    }
}
