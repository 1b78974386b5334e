use chrono::Utc;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::api::{ApiClient, ApiError, ApiResult, ShiftQuery};
use crate::config::SessionConfig;
use crate::models::{ShiftAction, ShiftId, ShiftsResponse};

use super::{LoginSecret, SecretSource, TokenStore, EMAIL_VAR, PASSWORD_VAR};

/// Where a `SessionManager` is in its authentication lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Unauthenticated,
    /// The stored token was accepted and refreshed.
    TokenReused,
    /// A new token was obtained with email and password.
    CredentialAuthenticated,
    Failed,
}

impl AuthState {
    pub fn is_authenticated(self) -> bool {
        matches!(self, AuthState::TokenReused | AuthState::CredentialAuthenticated)
    }
}

/// Owns the authenticated client and the token lifecycle.
///
/// The token attached to the client is always the one last written to the
/// token store: a new token is persisted first and only then attached.
/// Authentication takes `&mut self`, so the token cannot change under a
/// concurrent caller; the shift operations only need `&self`.
pub struct SessionManager {
    api: ApiClient,
    store: TokenStore,
    secret: LoginSecret,
    config: SessionConfig,
    /// Identity reported by the service at login or probe
    identity: Option<String>,
    state: AuthState,
}

impl SessionManager {
    /// Build an unauthenticated manager. Fails before any network call
    /// when `secrets` has no login secret to offer.
    pub fn new(
        config: SessionConfig,
        store: TokenStore,
        secrets: &dyn SecretSource,
    ) -> ApiResult<Self> {
        let secret = secrets.login_secret().ok_or_else(|| {
            ApiError::Config(format!(
                "no login secret available; pass one explicitly or set {} and {}",
                EMAIL_VAR, PASSWORD_VAR
            ))
        })?;
        let api = ApiClient::new(config.endpoints.clone())?;

        Ok(Self {
            api,
            store,
            secret,
            config,
            identity: None,
            state: AuthState::Unauthenticated,
        })
    }

    /// Build a manager and authenticate it.
    pub async fn connect(
        config: SessionConfig,
        store: TokenStore,
        secrets: &dyn SecretSource,
    ) -> ApiResult<Self> {
        let mut session = Self::new(config, store, secrets)?;
        session.authenticate().await?;
        Ok(session)
    }

    pub fn state(&self) -> AuthState {
        self.state
    }

    /// Token currently attached to outgoing requests
    pub fn token(&self) -> Option<&str> {
        self.api.token()
    }

    /// User id used for "my shifts": configured value first, then the
    /// identity the service reported.
    pub fn user_id(&self) -> Option<&str> {
        self.config
            .user_id
            .as_deref()
            .or(self.identity.as_deref())
    }

    /// Try the stored token, then fall back to credential login.
    /// No retries beyond that single fallback.
    pub async fn authenticate(&mut self) -> ApiResult<AuthState> {
        self.state = AuthState::Unauthenticated;
        self.api.clear_token();

        let result = self.run_authentication().await;
        self.state = match &result {
            Ok(state) => *state,
            Err(_) => AuthState::Failed,
        };
        result
    }

    async fn run_authentication(&mut self) -> ApiResult<AuthState> {
        if self.reuse_stored_token().await? {
            info!("Logged in with stored session token");
            return Ok(AuthState::TokenReused);
        }

        self.credential_login().await?;
        info!("Logged in with credentials");
        Ok(AuthState::CredentialAuthenticated)
    }

    /// Probe the stored token. `Ok(false)` means there is no usable token
    /// and credential login should follow.
    async fn reuse_stored_token(&mut self) -> ApiResult<bool> {
        let Some(token) = self.store.read()? else {
            debug!("No stored session token");
            return Ok(false);
        };

        self.api.set_token(token);
        let reply = match self.api.probe().await {
            Ok(reply) => reply,
            Err(ApiError::Network(e)) => {
                self.api.clear_token();
                return Err(ApiError::Network(e));
            }
            Err(e) => {
                warn!(error = %e, "Stored session token rejected");
                self.api.clear_token();
                return Ok(false);
            }
        };

        match reply.token.clone().filter(|t| !t.is_empty()) {
            Some(fresh) => {
                self.adopt(fresh, reply.identity())?;
                debug!("Refreshed session token");
                Ok(true)
            }
            None => {
                warn!("Identity probe answered without a token");
                self.api.clear_token();
                Ok(false)
            }
        }
    }

    async fn credential_login(&mut self) -> ApiResult<()> {
        debug!(email = %self.secret.email(), "Logging in with credentials");
        let reply = match self.api.login(&self.secret).await {
            Ok(reply) => reply,
            Err(e @ ApiError::Network(_)) => return Err(e),
            Err(e) => return Err(ApiError::AuthenticationFailed(e.to_string())),
        };

        let token = reply.token.clone().filter(|t| !t.is_empty()).ok_or_else(|| {
            ApiError::AuthenticationFailed("login response did not include a token".into())
        })?;
        self.adopt(token, reply.identity())
    }

    /// Persist a new token, then attach it.
    fn adopt(&mut self, token: String, identity: Option<String>) -> ApiResult<()> {
        if let Err(e) = self.store.write(&token) {
            self.api.clear_token();
            return Err(e);
        }
        self.api.set_token(token);
        if identity.is_some() {
            self.identity = identity;
        }
        Ok(())
    }

    /// Forget the session locally and remove the stored token.
    pub fn logout(&mut self) -> ApiResult<()> {
        self.api.clear_token();
        self.identity = None;
        self.state = AuthState::Unauthenticated;
        self.store.clear()
    }

    fn ensure_authenticated(&self) -> ApiResult<()> {
        if self.state.is_authenticated() && self.api.token().is_some() {
            Ok(())
        } else {
            Err(ApiError::NotAuthenticated)
        }
    }

    fn upcoming_query(&self) -> ShiftQuery {
        ShiftQuery {
            location_id: self.config.location_id.clone(),
            ..ShiftQuery::upcoming(Utc::now())
        }
    }

    // ===== Shift Queries =====

    /// Shifts assigned to the current user over the next year
    pub async fn list_assigned_shifts(&self) -> ApiResult<ShiftsResponse> {
        self.ensure_authenticated()?;
        let user_id = self.user_id().ok_or_else(|| {
            ApiError::Config("user id unknown; set user_id in the config file".into())
        })?;

        let query = ShiftQuery {
            user_id: Some(user_id.to_string()),
            ..self.upcoming_query()
        };
        self.api.fetch_shifts(&query).await
    }

    /// Unassigned shifts over the next year
    pub async fn list_open_shifts(&self) -> ApiResult<ShiftsResponse> {
        self.ensure_authenticated()?;

        let query = ShiftQuery {
            include_open: true,
            ..self.upcoming_query()
        };
        let all = self.api.fetch_shifts(&query).await?;
        let open = all.unassigned_only();
        debug!(total = all.shifts.len(), open = open.shifts.len(), "Filtered open shifts");
        Ok(open)
    }

    /// Pending requests for the current user, as the service returned them
    pub async fn list_requests(&self) -> ApiResult<Value> {
        self.ensure_authenticated()?;
        self.api.fetch_requests().await
    }

    // ===== Shift Actions =====

    /// Give up one shift (`shift_id`) or several (`shift_ids`); exactly one
    /// of the two must be given.
    pub async fn release_shift(
        &self,
        shift_id: Option<ShiftId>,
        shift_ids: Option<Vec<ShiftId>>,
    ) -> ApiResult<ShiftAction> {
        let ids = match (shift_id, shift_ids) {
            (Some(id), None) => vec![id],
            (None, Some(ids)) if !ids.is_empty() => ids,
            (None, Some(_)) => {
                return Err(ApiError::Usage("shift_ids must not be empty".into()));
            }
            _ => {
                return Err(ApiError::Usage(
                    "provide either shift_id or shift_ids, but not both".into(),
                ));
            }
        };
        self.ensure_authenticated()?;

        let outcome = ShiftAction::from_unassign_response(self.api.unassign_shifts(&ids).await?);
        if outcome.is_applied() {
            info!(?ids, "Released shifts");
        } else {
            warn!(?ids, "Service did not confirm shift release");
        }
        Ok(outcome)
    }

    /// Claim an open shift
    pub async fn take_shift(&self, shift_id: Option<ShiftId>) -> ApiResult<ShiftAction> {
        let shift_id = shift_id.ok_or_else(|| ApiError::Usage("shift_id is required".into()))?;
        self.ensure_authenticated()?;

        let outcome = ShiftAction::from_take_response(self.api.take_shift(shift_id).await?);
        if outcome.is_applied() {
            info!(shift_id, "Took shift");
        } else {
            warn!(shift_id, "Service did not confirm taking shift");
        }
        Ok(outcome)
    }
}
