//! Authentication module for managing the When I Work session.
//!
//! This module provides:
//! - `SessionManager`: decides between reusing the stored token and a full
//!   credential login, and exposes the shift operations
//! - `TokenStore`: single-file persistence for the session token
//! - `LoginSecret` / `SecretSource`: where the email and password come from
//!
//! Tokens are not expired locally; a rejected probe is what reveals expiry.

pub mod secret;
pub mod session;
pub mod store;

pub use secret::{EnvSecretSource, LoginSecret, SecretSource, EMAIL_VAR, PASSWORD_VAR};
pub use session::{AuthState, SessionManager};
pub use store::TokenStore;
