//! REST API client module for When I Work.
//!
//! This module provides the `ApiClient` for talking to the (undocumented)
//! When I Work API: credential login, token probing, shift queries and
//! shift actions.
//!
//! The API authenticates with an opaque token sent in the `Authorization`
//! header. Tokens come from the login endpoint and are refreshed by the
//! `/people/me` endpoint.

pub mod client;
pub mod error;

pub use client::{shift_window, ApiClient, AuthReply, Endpoints, ShiftQuery, SHIFT_WINDOW_DAYS};
pub use error::{ApiError, ApiResult};
