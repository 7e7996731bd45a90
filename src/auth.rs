use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

use crate::error::TrackerError;

/// The resolved identity every query and mutation is scoped to. Only the
/// session store hands these out on the normal path; record owners are never
/// read from command arguments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OwnerId(String);

impl OwnerId {
    pub fn new(id: impl Into<String>) -> Self {
        OwnerId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Local stand-in for an identity provider: `login` records the active user
/// in a config-dir file, `current` resolves it and fails closed when absent.
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn open() -> Result<Self> {
        let path = Self::default_path()?;
        Ok(Self { path })
    }

    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    fn default_path() -> Result<PathBuf> {
        if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "jobtrack") {
            Ok(proj_dirs.config_dir().join("session"))
        } else {
            Ok(PathBuf::from(".jobtrack-session"))
        }
    }

    pub fn login(&self, user: &str) -> Result<()> {
        let user = user.trim();
        if user.is_empty() {
            anyhow::bail!("user name must not be empty");
        }
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, user)
            .with_context(|| format!("failed to write session file {}", self.path.display()))?;
        Ok(())
    }

    pub fn logout(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path).with_context(|| {
                format!("failed to remove session file {}", self.path.display())
            })?;
        }
        Ok(())
    }

    /// Resolves the active owner. Any failure to read a non-empty session is
    /// treated as "not signed in" so operations refuse to run.
    pub fn current(&self) -> std::result::Result<OwnerId, TrackerError> {
        let raw = fs::read_to_string(&self.path).map_err(|_| TrackerError::Unauthorized)?;
        let user = raw.trim();
        if user.is_empty() {
            return Err(TrackerError::Unauthorized);
        }
        Ok(OwnerId::new(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_session_path(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("jobtrack-session-test-{tag}-{}", std::process::id()))
    }

    #[test]
    fn login_then_current_resolves_owner() {
        let store = SessionStore::with_path(temp_session_path("login"));
        store.login("casey").unwrap();
        assert_eq!(store.current().unwrap(), OwnerId::new("casey"));
        store.logout().unwrap();
    }

    #[test]
    fn missing_session_fails_closed() {
        let store = SessionStore::with_path(temp_session_path("missing"));
        store.logout().unwrap();
        assert!(matches!(store.current(), Err(TrackerError::Unauthorized)));
    }

    #[test]
    fn blank_login_is_rejected() {
        let store = SessionStore::with_path(temp_session_path("blank"));
        assert!(store.login("   ").is_err());
    }
}
