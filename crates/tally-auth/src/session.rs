use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tally_types::models::UserId;
use tally_types::store::UserStore;
use tracing::{debug, info};

use crate::clock::Clock;
use crate::credentials::CredentialStore;
use crate::error::AuthError;
use crate::token;

pub fn default_session_timeout() -> Duration {
    Duration::hours(24)
}

/// A freshly issued session.
#[derive(Clone, PartialEq, Eq)]
pub struct IssuedSession {
    pub user_id: UserId,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl fmt::Debug for IssuedSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuedSession")
            .field("user_id", &self.user_id)
            .field("token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Outcome of resolving a bearer token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenState {
    Live(UserId),
    /// Recognized but past its expiry. The session has been cleared.
    Expired,
    Invalid,
}

/// Read-only view of a session, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    Active {
        expires_at: DateTime<Utc>,
        remaining: Duration,
    },
    /// Issued before expiries were recorded.
    NonExpiring,
    Expired {
        expired_at: DateTime<Utc>,
    },
}

impl SessionStatus {
    pub fn is_valid(&self) -> bool {
        !matches!(self, SessionStatus::Expired { .. })
    }

    pub fn label(&self) -> &'static str {
        if self.is_valid() { "valid" } else { "expired" }
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        match self {
            SessionStatus::Active { expires_at, .. } => Some(*expires_at),
            SessionStatus::NonExpiring => None,
            SessionStatus::Expired { expired_at } => Some(*expired_at),
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionStatus::Active { remaining, .. } => {
                let hours = remaining.num_seconds() as f64 / 3600.0;
                write!(f, "valid, {:.1} hours remaining", hours)
            }
            SessionStatus::NonExpiring => f.write_str("valid, no expiry recorded"),
            SessionStatus::Expired { expired_at } => {
                write!(f, "expired at {}, log in again", expired_at.to_rfc3339())
            }
        }
    }
}

/// Issues, resolves and revokes session tokens.
///
/// Nothing is cached in-process: every call reads the user store, so sessions
/// outlive restarts. A user holds at most one session; logging in again
/// replaces it.
pub struct SessionManager {
    users: Arc<dyn UserStore>,
    credentials: Arc<CredentialStore>,
    clock: Arc<dyn Clock>,
    timeout: Duration,
}

impl SessionManager {
    pub fn new(
        users: Arc<dyn UserStore>,
        credentials: Arc<CredentialStore>,
        clock: Arc<dyn Clock>,
        timeout: Duration,
    ) -> Self {
        Self { users, credentials, clock, timeout }
    }

    pub fn login(&self, identifier: &str, password: &str) -> Result<IssuedSession, AuthError> {
        let user_id = self.credentials.verify_credentials(identifier, password)?;

        let token = token::generate_token()?;
        let now = self.clock.now();
        let expires_at = now
            .checked_add_signed(self.timeout)
            .ok_or_else(|| AuthError::Internal("session expiry out of range".into()))?;

        if !self.users.start_session(user_id, &token, expires_at, now)? {
            return Err(AuthError::AuthFailure);
        }

        info!(%user_id, %expires_at, "Session started");
        Ok(IssuedSession { user_id, token, expires_at })
    }

    /// Resolve a token to its owner.
    ///
    /// This is not a pure read: an expired session is cleared here, and this
    /// is the only place expired sessions are ever removed. The clear is
    /// conditional on the user still holding this token, so a newer login
    /// racing with the purge survives it.
    pub fn validate(&self, token: &str) -> anyhow::Result<TokenState> {
        if token.is_empty() {
            return Ok(TokenState::Invalid);
        }

        let Some(record) = self.users.find_session(token)? else {
            debug!("Token not held by any user");
            return Ok(TokenState::Invalid);
        };

        match record.expires_at {
            None => {
                debug!(user_id = %record.user_id, "Session has no expiry, treating as live");
                Ok(TokenState::Live(record.user_id))
            }
            Some(expires_at) if self.clock.now() > expires_at => {
                let cleared = self.users.clear_session(record.user_id, token)?;
                info!(user_id = %record.user_id, %expires_at, cleared, "Expired session purged");
                Ok(TokenState::Expired)
            }
            Some(_) => Ok(TokenState::Live(record.user_id)),
        }
    }

    pub fn logout(&self, token: &str) -> Result<(), AuthError> {
        if token.is_empty() || !self.users.clear_session_by_token(token)? {
            return Err(AuthError::InvalidToken);
        }

        info!("Session ended by logout");
        Ok(())
    }

    /// Like `validate` but never writes: expired sessions are reported, not
    /// purged.
    pub fn check_status(&self, token: &str) -> Result<SessionStatus, AuthError> {
        if token.is_empty() {
            return Err(AuthError::InvalidToken);
        }

        let record = self.users.find_session(token)?.ok_or(AuthError::InvalidToken)?;

        let status = match record.expires_at {
            None => SessionStatus::NonExpiring,
            Some(expires_at) => {
                let now = self.clock.now();
                if now > expires_at {
                    SessionStatus::Expired { expired_at: expires_at }
                } else {
                    SessionStatus::Active { expires_at, remaining: expires_at - now }
                }
            }
        };

        Ok(status)
    }
}
