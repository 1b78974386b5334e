//! In-process stand-in for the When I Work service.
//!
//! Serves the endpoints laid out by `Endpoints::from_origin` and records
//! every request it sees.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::{extract::State, Json, Router};
use serde_json::{json, Value};
use tempfile::TempDir;

use wiwctl_core::{Endpoints, LoginSecret, SessionConfig, TokenStore};

#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub path: String,
    pub query: String,
    pub headers: HeaderMap,
    pub body: String,
}

impl Recorded {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

struct Replies {
    login: (StatusCode, Value),
    probe: (StatusCode, Value),
    shifts: (StatusCode, Value),
    requests: (StatusCode, Value),
    unassign: (StatusCode, Value),
    take: (StatusCode, Value),
}

impl Default for Replies {
    fn default() -> Self {
        let ok = |body: Value| (StatusCode::OK, body);
        Self {
            login: ok(json!({"token": "LOGIN-TOKEN", "user_id": 46724863})),
            probe: (StatusCode::UNAUTHORIZED, json!({"error": "Invalid token"})),
            shifts: ok(json!({"shifts": []})),
            requests: ok(json!({"requests": []})),
            unassign: ok(json!({"shifts": []})),
            take: ok(json!({"shift": {"is_open": true}})),
        }
    }
}

#[derive(Default)]
struct Inner {
    calls: Vec<Recorded>,
    replies: Replies,
}

#[derive(Clone, Default)]
pub struct MockService {
    inner: Arc<Mutex<Inner>>,
}

impl MockService {
    pub fn on_login(&self, status: StatusCode, body: Value) -> &Self {
        self.inner.lock().unwrap().replies.login = (status, body);
        self
    }

    pub fn on_probe(&self, status: StatusCode, body: Value) -> &Self {
        self.inner.lock().unwrap().replies.probe = (status, body);
        self
    }

    pub fn on_shifts(&self, body: Value) -> &Self {
        self.inner.lock().unwrap().replies.shifts = (StatusCode::OK, body);
        self
    }

    pub fn on_requests(&self, body: Value) -> &Self {
        self.inner.lock().unwrap().replies.requests = (StatusCode::OK, body);
        self
    }

    pub fn on_unassign(&self, status: StatusCode, body: Value) -> &Self {
        self.inner.lock().unwrap().replies.unassign = (status, body);
        self
    }

    pub fn on_take(&self, status: StatusCode, body: Value) -> &Self {
        self.inner.lock().unwrap().replies.take = (status, body);
        self
    }

    pub fn calls(&self) -> Vec<Recorded> {
        self.inner.lock().unwrap().calls.clone()
    }

    pub fn calls_to(&self, path: &str) -> Vec<Recorded> {
        self.calls().into_iter().filter(|c| c.path == path).collect()
    }

    pub fn last_call(&self) -> Recorded {
        self.calls().pop().expect("no request was recorded")
    }

    /// Bind to an ephemeral port and serve in the background.
    pub async fn start(&self) -> Endpoints {
        let app = Router::new().fallback(handle).with_state(self.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Endpoints::from_origin(&format!("http://{}", addr))
    }
}

async fn handle(
    State(mock): State<MockService>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> (StatusCode, Json<Value>) {
    let path = uri.path().to_string();
    let mut inner = mock.inner.lock().unwrap();
    inner.calls.push(Recorded {
        method: method.clone(),
        path: path.clone(),
        query: uri.query().unwrap_or_default().to_string(),
        headers,
        body,
    });

    let replies = &inner.replies;
    let (status, body) = match (method.as_str(), path.as_str()) {
        ("POST", "/login") => replies.login.clone(),
        ("GET", "/people/me") => replies.probe.clone(),
        ("GET", "/2/shifts") => replies.shifts.clone(),
        ("GET", "/2/requests") => replies.requests.clone(),
        ("POST", "/2/shifts/unassign") => replies.unassign.clone(),
        ("POST", p) if p.starts_with("/2/shifts/") && p.ends_with("/take") => replies.take.clone(),
        _ => (StatusCode::NOT_FOUND, json!({"error": "no such route"})),
    };
    (status, Json(body))
}

/// Everything a session test needs: a running mock, its endpoints and a
/// token store in a scratch directory.
pub struct Harness {
    pub mock: MockService,
    pub config: SessionConfig,
    pub store: TokenStore,
    _dir: TempDir,
}

impl Harness {
    pub async fn start() -> Self {
        let mock = MockService::default();
        let endpoints = mock.start().await;
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("wiwctl"));
        Self {
            mock,
            config: SessionConfig {
                endpoints,
                ..SessionConfig::default()
            },
            store,
            _dir: dir,
        }
    }

    pub fn secret() -> LoginSecret {
        LoginSecret::new("scheduler@example.com", "correct horse")
    }
}
