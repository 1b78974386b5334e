use std::fmt;

/// Default environment variable holding the account email
pub const EMAIL_VAR: &str = "WIW_EMAIL";

/// Default environment variable holding the account password
pub const PASSWORD_VAR: &str = "WIW_PASSWORD";

/// Email and password used to obtain a fresh token.
/// Held in memory only; never written to disk.
#[derive(Clone, PartialEq, Eq)]
pub struct LoginSecret {
    email: String,
    password: String,
}

impl LoginSecret {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for LoginSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginSecret")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Somewhere a login secret can come from.
pub trait SecretSource: Send + Sync {
    /// The secret, or `None` when this source has nothing to offer.
    fn login_secret(&self) -> Option<LoginSecret>;
}

/// An explicit secret is its own source.
impl SecretSource for LoginSecret {
    fn login_secret(&self) -> Option<LoginSecret> {
        Some(self.clone())
    }
}

/// Reads the secret from a pair of environment variables.
/// Both must be set and non-empty.
#[derive(Debug, Clone)]
pub struct EnvSecretSource {
    email_var: String,
    password_var: String,
}

impl Default for EnvSecretSource {
    fn default() -> Self {
        Self::with_vars(EMAIL_VAR, PASSWORD_VAR)
    }
}

impl EnvSecretSource {
    pub fn with_vars(email_var: impl Into<String>, password_var: impl Into<String>) -> Self {
        Self {
            email_var: email_var.into(),
            password_var: password_var.into(),
        }
    }

    pub fn describe(&self) -> String {
        format!("{} and {}", self.email_var, self.password_var)
    }

    fn var(name: &str) -> Option<String> {
        std::env::var(name).ok().filter(|v| !v.trim().is_empty())
    }
}

impl SecretSource for EnvSecretSource {
    fn login_secret(&self) -> Option<LoginSecret> {
        let email = Self::var(&self.email_var)?;
        let password = Self::var(&self.password_var)?;
        Some(LoginSecret::new(email.trim(), password))
    }
}
