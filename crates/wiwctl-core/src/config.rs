//! Application configuration management.
//!
//! This module handles loading and saving the application configuration,
//! which includes the user id used for "my shifts", an optional location
//! restriction and the last used email address.
//!
//! Configuration is stored at `~/.config/wiwctl/config.json`. The session
//! token lives separately in the data directory (`~/.local/share/wiwctl`).

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::api::Endpoints;

/// Application name used for config/data directory paths
const APP_NAME: &str = "wiwctl";

/// Config file name
const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Config {
    pub user_id: Option<String>,
    pub location_id: Option<String>,
    pub email: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            Ok(serde_json::from_str(&contents)?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Directory holding the session token
    pub fn data_dir(&self) -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME))
    }

    /// Per-session settings derived from this config, against the production service.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            endpoints: Endpoints::default(),
            user_id: self.user_id.clone(),
            location_id: self.location_id.clone(),
        }
    }
}

/// Settings one `SessionManager` runs with.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionConfig {
    pub endpoints: Endpoints,
    /// Identity for "my shifts"; overrides whatever the service reports.
    pub user_id: Option<String>,
    /// Restrict shift queries to one location.
    pub location_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_parses_partial_file() {
        let config: Config = serde_json::from_str(r#"{"user_id": "46724863"}"#).unwrap();
        assert_eq!(config.user_id.as_deref(), Some("46724863"));
        assert_eq!(config.location_id, None);
    }

    #[test]
    fn test_session_config_uses_production_endpoints() {
        let config = Config {
            user_id: Some("1".into()),
            location_id: Some("2".into()),
            email: None,
        };
        let session = config.session_config();
        assert_eq!(session.endpoints, Endpoints::default());
        assert_eq!(session.user_id.as_deref(), Some("1"));
        assert_eq!(session.location_id.as_deref(), Some("2"));
    }
}
