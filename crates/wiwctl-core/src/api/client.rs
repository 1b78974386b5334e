//! API client for the When I Work REST API.
//!
//! This module provides the `ApiClient` struct, which issues the raw HTTP
//! calls (login, identity probe, shift queries and shift actions) and
//! attaches the session token to each request. Deciding *when* to log in
//! is the job of `auth::SessionManager`.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::{header, Client};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::Value;
use tracing::debug;

use crate::auth::LoginSecret;
use crate::models::{ShiftId, ShiftsResponse};

use super::{ApiError, ApiResult};

// ============================================================================
// Constants
// ============================================================================

/// Credential login endpoint
const LOGIN_URL: &str = "https://api.login.wheniwork.com/login";

/// "Who am I" endpoint used to validate and refresh a stored token
const ME_URL: &str = "https://login.api.wheniwork.com/people/me";

/// Base URL for schedule data
const API_BASE_URL: &str = "https://api.wheniwork.com/2";

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Number of days ahead covered by shift queries.
pub const SHIFT_WINDOW_DAYS: i64 = 365;

/// Timestamp layout the shifts endpoint accepts: UTC with milliseconds.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Where the client sends each kind of request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub login_url: String,
    pub me_url: String,
    pub api_base_url: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            login_url: LOGIN_URL.to_string(),
            me_url: ME_URL.to_string(),
            api_base_url: API_BASE_URL.to_string(),
        }
    }
}

impl Endpoints {
    /// Serve every endpoint from one origin, laid out like the real service.
    /// Used for local mocks and proxies.
    pub fn from_origin(origin: &str) -> Self {
        let origin = origin.trim_end_matches('/');
        Self {
            login_url: format!("{}/login", origin),
            me_url: format!("{}/people/me", origin),
            api_base_url: format!("{}/2", origin),
        }
    }
}

/// Token-bearing body returned by the login and probe endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthReply {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    user_id: Option<Value>,
    #[serde(default)]
    person: Option<PersonRef>,
}

#[derive(Debug, Clone, Deserialize)]
struct PersonRef {
    #[serde(default)]
    id: Option<Value>,
}

impl AuthReply {
    /// Account identity reported by the service, if any.
    pub fn identity(&self) -> Option<String> {
        let raw = self
            .user_id
            .as_ref()
            .or_else(|| self.person.as_ref().and_then(|p| p.id.as_ref()))?;
        match raw {
            Value::Number(n) => Some(n.to_string()),
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            _ => None,
        }
    }
}

/// Parameters for a shifts collection query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShiftQuery {
    pub start: String,
    pub end: String,
    pub user_id: Option<String>,
    pub location_id: Option<String>,
    /// Ask for open shifts and swaps, untrimmed.
    pub include_open: bool,
}

impl ShiftQuery {
    /// Query covering [`SHIFT_WINDOW_DAYS`] from `now`.
    pub fn upcoming(now: DateTime<Utc>) -> Self {
        let (start, end) = shift_window(now);
        Self {
            start,
            end,
            ..Self::default()
        }
    }

    fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(ref user_id) = self.user_id {
            params.push(("user_id", user_id.clone()));
        }
        if let Some(ref location_id) = self.location_id {
            params.push(("location_id", location_id.clone()));
        }
        params.push(("start", self.start.clone()));
        params.push(("end", self.end.clone()));
        if self.include_open {
            params.push(("include_allopen", "true".to_string()));
            params.push(("include_swaps", "true".to_string()));
            params.push(("trim_openshifts", "false".to_string()));
        }
        params
    }
}

/// Start and end timestamps of the query window beginning at `now`.
pub fn shift_window(now: DateTime<Utc>) -> (String, String) {
    let end = now + chrono::Duration::days(SHIFT_WINDOW_DAYS);
    (
        now.format(TIMESTAMP_FORMAT).to_string(),
        end.format(TIMESTAMP_FORMAT).to_string(),
    )
}

/// API client for When I Work.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    endpoints: Endpoints,
    token: Option<String>,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(endpoints: Endpoints) -> ApiResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            endpoints,
            token: None,
        })
    }

    /// Set the token attached to authenticated requests
    pub fn set_token(&mut self, token: String) {
        self.token = Some(token);
    }

    pub fn clear_token(&mut self) {
        self.token = None;
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    fn auth_headers(&self) -> ApiResult<header::HeaderMap> {
        let mut headers = header::HeaderMap::new();
        if let Some(ref token) = self.token {
            // The service expects the bare token, no scheme prefix
            let mut value = header::HeaderValue::from_str(token).map_err(|_| {
                ApiError::InvalidResponse("token contains characters not allowed in a header".into())
            })?;
            value.set_sensitive(true);
            headers.insert(header::AUTHORIZATION, value);
        }
        Ok(headers)
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> ApiResult<reqwest::Response> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    async fn read_json<T: DeserializeOwned>(url: &str, response: reqwest::Response) -> ApiResult<T> {
        let response = Self::check_response(response).await?;
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|source| ApiError::Decode {
            url: url.to_string(),
            source,
        })
    }

    // ===== Authentication =====

    /// Exchange an email and password for a fresh token
    pub async fn login(&self, secret: &LoginSecret) -> ApiResult<AuthReply> {
        let url = &self.endpoints.login_url;
        debug!(url = %url, "Sending credential login");

        let body = serde_json::json!({
            "email": secret.email(),
            "password": secret.password(),
        });

        let response = self.client.post(url).json(&body).send().await?;
        Self::read_json(url, response).await
    }

    /// Ask the service who the current token belongs to.
    /// A success answer carries a refreshed token.
    pub async fn probe(&self) -> ApiResult<AuthReply> {
        let url = &self.endpoints.me_url;
        debug!(url = %url, "Probing stored token");

        let response = self
            .client
            .get(url)
            .headers(self.auth_headers()?)
            .send()
            .await?;
        Self::read_json(url, response).await
    }

    // ===== Schedule Data =====

    /// Fetch shifts matching the query
    pub async fn fetch_shifts(&self, query: &ShiftQuery) -> ApiResult<ShiftsResponse> {
        let url = format!("{}/shifts", self.endpoints.api_base_url);
        debug!(start = %query.start, end = %query.end, include_open = query.include_open, "Fetching shifts");

        let response = self
            .client
            .get(&url)
            .headers(self.auth_headers()?)
            .query(&query.params())
            .send()
            .await?;
        Self::read_json(&url, response).await
    }

    /// Fetch the current user's requests as returned by the service
    pub async fn fetch_requests(&self) -> ApiResult<Value> {
        let url = format!("{}/requests", self.endpoints.api_base_url);
        debug!("Fetching requests");

        let response = self
            .client
            .get(&url)
            .headers(self.auth_headers()?)
            .send()
            .await?;
        Self::read_json(&url, response).await
    }

    // ===== Shift Actions =====
    //
    // Content-Type is set on the request itself, so the client's shared
    // headers are the same before and after the call.

    /// Unassign the current user from the given shifts
    pub async fn unassign_shifts(&self, shift_ids: &[ShiftId]) -> ApiResult<Value> {
        let url = format!("{}/shifts/unassign", self.endpoints.api_base_url);
        debug!(?shift_ids, "Unassigning shifts");

        let mut headers = self.auth_headers()?;
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );
        let body = serde_json::json!({ "shift_ids": shift_ids });

        let response = self
            .client
            .post(&url)
            .headers(headers)
            .body(body.to_string())
            .send()
            .await?;
        Self::read_json(&url, response).await
    }

    /// Claim an open shift for the current user
    pub async fn take_shift(&self, shift_id: ShiftId) -> ApiResult<Value> {
        let url = format!("{}/shifts/{}/take", self.endpoints.api_base_url, shift_id);
        debug!(shift_id, "Taking shift");

        let mut headers = self.auth_headers()?;
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        let response = self.client.post(&url).headers(headers).send().await?;
        Self::read_json(&url, response).await
    }
}
