//! Client library for the When I Work scheduling API.
//!
//! Keeps one authenticated session per process: a token cached on disk is
//! reused while the service still accepts it, otherwise the client logs in
//! with email and password. On top of that session it can list the user's
//! shifts, open shifts and requests, and take or release shifts.

pub mod api;
pub mod auth;
pub mod config;
pub mod models;

pub use api::{ApiClient, ApiError, ApiResult, Endpoints};
pub use auth::{AuthState, EnvSecretSource, LoginSecret, SecretSource, SessionManager, TokenStore};
pub use config::{Config, SessionConfig};
pub use models::{Shift, ShiftAction, ShiftId, ShiftsResponse};
