use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::auth::token;
use crate::models::User;

/// Session file name in the state directory
const SESSION_FILE: &str = "session.json";

/// In-memory session state: the authenticated user, the bearer token, and
/// the token's expiry as decoded from its `exp` claim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionData {
    pub user: User,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// The persisted form of a session. Only the token and the user are written
/// to disk; expiry is re-derived from the token on every restore rather
/// than trusted from the file.
#[derive(Debug, Serialize, Deserialize)]
struct SessionFile {
    token: String,
    user: User,
}

impl SessionData {
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// Minutes remaining until expiry (for display)
    pub fn minutes_until_expiry(&self) -> i64 {
        (self.expires_at - Utc::now()).num_minutes().max(0)
    }
}

/// Owner of the session state. All mutations synchronize to the persisted
/// file; `restore` and `login` are the only transitions from
/// "unauthenticated" to "authenticated".
pub struct Session {
    state_dir: PathBuf,
    data: Option<SessionData>,
}

impl Session {
    pub fn new(state_dir: PathBuf) -> Self {
        Self {
            state_dir,
            data: None,
        }
    }

    /// Load a persisted session from disk.
    ///
    /// Returns `true` only when the file exists, parses, and carries a
    /// token that is still valid. Every other outcome - missing file,
    /// unreadable file, malformed JSON, undecodable or expired token -
    /// leaves the session unauthenticated and removes the persisted state.
    pub fn restore(&mut self) -> bool {
        let path = self.session_path();
        if !path.exists() {
            return false;
        }

        let parsed: Option<SessionFile> = std::fs::read_to_string(&path)
            .ok()
            .and_then(|contents| serde_json::from_str(&contents).ok());

        let Some(file) = parsed else {
            debug!("Discarding malformed session file");
            self.remove_session_file();
            return false;
        };

        match token::expires_at(&file.token) {
            Some(expires_at) if expires_at > Utc::now() => {
                self.data = Some(SessionData {
                    user: file.user,
                    token: file.token,
                    expires_at,
                });
                debug!("Restored session from disk");
                true
            }
            _ => {
                debug!("Discarding expired or undecodable session token");
                self.remove_session_file();
                false
            }
        }
    }

    /// Establish a new session from a login or registration response and
    /// persist it. Rejects tokens whose expiry claim is missing or already
    /// past, so a live session always has a future expiry.
    pub fn login(&mut self, user: User, token: String) -> Result<()> {
        let expires_at = token::expires_at(&token)
            .ok_or_else(|| anyhow::anyhow!("Token has no decodable expiry claim"))?;
        if expires_at <= Utc::now() {
            anyhow::bail!("Token is already expired");
        }

        self.data = Some(SessionData {
            user,
            token,
            expires_at,
        });
        self.save()
    }

    /// Clear in-memory and persisted state. Idempotent.
    pub fn logout(&mut self) -> Result<()> {
        self.data = None;
        let path = self.session_path();
        if path.exists() {
            std::fs::remove_file(&path).context("Failed to remove session file")?;
        }
        Ok(())
    }

    /// Read accessor for the current session.
    pub fn current(&self) -> Option<&SessionData> {
        self.data.as_ref()
    }

    /// The bearer token, if the session exists and has not expired.
    /// Expiry is re-checked on every read so an expired token is never
    /// attached to a request.
    pub fn token(&self) -> Option<&str> {
        self.data
            .as_ref()
            .filter(|d| !d.is_expired())
            .map(|d| d.token.as_str())
    }

    /// Whether a live (non-expired) session exists.
    pub fn is_authenticated(&self) -> bool {
        self.data.as_ref().map(|d| !d.is_expired()).unwrap_or(false)
    }

    /// Replace the user half of the session after a profile update and
    /// re-persist. No-op when unauthenticated.
    pub fn update_user(&mut self, user: User) -> Result<()> {
        if let Some(ref mut data) = self.data {
            data.user = user;
            self.save()?;
        }
        Ok(())
    }

    fn save(&self) -> Result<()> {
        if let Some(ref data) = self.data {
            let path = self.session_path();
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).context("Failed to create state directory")?;
            }
            let file = SessionFile {
                token: data.token.clone(),
                user: data.user.clone(),
            };
            let contents = serde_json::to_string_pretty(&file)?;
            std::fs::write(&path, contents).context("Failed to write session file")?;
        }
        Ok(())
    }

    fn remove_session_file(&self) {
        let path = self.session_path();
        if path.exists() {
            if let Err(e) = std::fs::remove_file(&path) {
                warn!(error = %e, "Failed to remove stale session file");
            }
        }
    }

    fn session_path(&self) -> PathBuf {
        self.state_dir.join(SESSION_FILE)
    }
}
