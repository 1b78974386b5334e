use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::api::{ApiError, ApiResult};

/// Token file name in the data directory
const TOKEN_FILE: &str = "session_token";

/// Scratch file the token is written to before being moved into place
const TOKEN_TMP_FILE: &str = "session_token.tmp";

/// Single-slot persistence for the session token.
///
/// The token is stored verbatim; nothing here looks inside it.
#[derive(Debug, Clone)]
pub struct TokenStore {
    data_dir: PathBuf,
}

impl TokenStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.data_dir.join(TOKEN_FILE)
    }

    /// Read the stored token. A missing or empty file is `Ok(None)`.
    pub fn read(&self) -> ApiResult<Option<String>> {
        let path = self.path();
        match fs::read_to_string(&path) {
            Ok(contents) => {
                let token = contents.trim();
                if token.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(token.to_string()))
                }
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ApiError::storage(path, e)),
        }
    }

    /// Replace the stored token.
    pub fn write(&self, token: &str) -> ApiResult<()> {
        fs::create_dir_all(&self.data_dir).map_err(|e| ApiError::storage(&self.data_dir, e))?;

        let tmp = self.data_dir.join(TOKEN_TMP_FILE);
        Self::write_private(&tmp, token).map_err(|e| ApiError::storage(&tmp, e))?;

        let path = self.path();
        fs::rename(&tmp, &path).map_err(|e| ApiError::storage(&path, e))?;
        debug!(path = %path.display(), "Session token saved");
        Ok(())
    }

    /// Remove the stored token, if any
    pub fn clear(&self) -> ApiResult<()> {
        let path = self.path();
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ApiError::storage(path, e)),
        }
    }

    fn write_private(path: &Path, token: &str) -> std::io::Result<()> {
        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(path)?;
        file.write_all(token.as_bytes())?;
        file.sync_all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_read_missing_is_none() {
        let dir = tempdir().unwrap();
        let store = TokenStore::new(dir.path());
        assert_eq!(store.read().unwrap(), None);
    }

    #[test]
    fn test_write_overwrites() {
        let dir = tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("nested"));

        store.write("first-token").unwrap();
        store.write("T2").unwrap();

        assert_eq!(store.read().unwrap().as_deref(), Some("T2"));
        assert_eq!(fs::read_to_string(store.path()).unwrap(), "T2");
        assert!(!dir.path().join("nested").join(TOKEN_TMP_FILE).exists());
    }

    #[test]
    fn test_blank_file_reads_as_none() {
        let dir = tempdir().unwrap();
        let store = TokenStore::new(dir.path());
        fs::write(store.path(), "\n  \n").unwrap();
        assert_eq!(store.read().unwrap(), None);

        fs::write(store.path(), "abc\n").unwrap();
        assert_eq!(store.read().unwrap().as_deref(), Some("abc"));
    }

    #[test]
    fn test_clear() {
        let dir = tempdir().unwrap();
        let store = TokenStore::new(dir.path());
        store.clear().unwrap();

        store.write("T1").unwrap();
        store.clear().unwrap();
        assert_eq!(store.read().unwrap(), None);
    }

    #[test]
    fn test_unreadable_path_is_storage_error() {
        let dir = tempdir().unwrap();
        let store = TokenStore::new(dir.path());
        // A directory where the token file should be
        fs::create_dir(store.path()).unwrap();

        assert!(matches!(store.read(), Err(ApiError::Storage { .. })));
        assert!(matches!(store.write("T1"), Err(ApiError::Storage { .. })));
    }
}
