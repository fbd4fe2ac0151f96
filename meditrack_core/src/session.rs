//! Client session: the bearer token and the signed-in user.
//!
//! A [`SessionContext`] is created empty when the client starts, filled
//! by a successful login and cleared on logout. It is passed explicitly
//! to every API call. [`SessionStore`] keeps it between CLI runs in a
//! small JSON file, written atomically under a file lock.

use crate::{Capability, Error, Result, RoleSet, UserDto};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct SessionContext {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    user: Option<UserDto>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn login(&mut self, token: impl Into<String>, user: Option<UserDto>) {
        self.token = Some(token.into());
        self.user = user;
    }

    pub fn logout(&mut self) {
        self.token = None;
        self.user = None;
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn user(&self) -> Option<&UserDto> {
        self.user.as_ref()
    }

    /// Token or `NotAuthenticated`
    pub fn require_token(&self) -> Result<&str> {
        self.token().ok_or(Error::NotAuthenticated)
    }

    /// Value for the `Authorization` header
    pub fn bearer(&self) -> Option<String> {
        self.token().map(|token| format!("Bearer {}", token))
    }

    /// Roles of the signed-in user; empty when the user is unknown
    pub fn roles(&self) -> RoleSet {
        self.user.as_ref().map(UserDto::roles).unwrap_or_default()
    }

    pub fn can(&self, capability: Capability) -> bool {
        self.roles().can(capability)
    }
}

/// File-backed storage for a [`SessionContext`]
#[derive(Clone, Debug)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored session with a shared lock
    ///
    /// A missing file yields an empty session. An unreadable or corrupted
    /// file is logged and also yields an empty session, so the user can
    /// simply log in again.
    pub fn load(&self) -> Result<SessionContext> {
        let path = &self.path;
        if !path.exists() {
            tracing::debug!("No session file at {:?}", path);
            return Ok(SessionContext::new());
        }

        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) => {
                tracing::warn!("Unable to open session file {:?}: {}. Starting signed out.", path, e);
                return Ok(SessionContext::new());
            }
        };

        if let Err(e) = file.lock_shared() {
            tracing::warn!("Unable to lock session file {:?}: {}. Starting signed out.", path, e);
            return Ok(SessionContext::new());
        }

        let mut contents = String::new();
        let mut reader = std::io::BufReader::new(&file);
        if let Err(e) = reader.read_to_string(&mut contents) {
            let _ = file.unlock();
            tracing::warn!("Failed to read session file {:?}: {}. Starting signed out.", path, e);
            return Ok(SessionContext::new());
        }

        file.unlock()?;

        match serde_json::from_str::<SessionContext>(&contents) {
            Ok(session) => {
                tracing::debug!("Loaded session from {:?}", path);
                Ok(session)
            }
            Err(e) => {
                tracing::warn!("Failed to parse session file {:?}: {}. Starting signed out.", path, e);
                Ok(SessionContext::new())
            }
        }
    }

    /// Save the session atomically (temp file, sync, rename)
    pub fn save(&self, session: &SessionContext) -> Result<()> {
        let parent = self
            .path
            .parent()
            .ok_or_else(|| Error::Other(format!("Session path {:?} has no parent", self.path)))?;
        std::fs::create_dir_all(parent)?;

        let temp = NamedTempFile::new_in(parent)?;
        temp.as_file().lock_exclusive()?;

        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            let contents = serde_json::to_string(session)?;
            writer.write_all(contents.as_bytes())?;
            writer.flush()?;
        }

        temp.as_file().sync_all()?;
        temp.as_file().unlock()?;

        temp.persist(&self.path).map_err(|e| Error::Io(e.error))?;

        tracing::debug!("Saved session to {:?}", self.path);
        Ok(())
    }

    /// Remove the stored session. Succeeds when nothing is stored.
    pub fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::debug!("Removed session file {:?}", self.path);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
