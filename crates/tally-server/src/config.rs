use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use chrono::Duration;
use tally_auth::PasswordScheme;
use tally_auth::session::default_session_timeout;

/// Server configuration, read from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub host: String,
    pub port: u16,
    /// Hard lifetime of a session from login.
    pub session_timeout: Duration,
    /// Format for verifiers of newly registered accounts.
    pub password_scheme: PasswordScheme,
}

/// Upper bound on the session lifetime.
const MAX_SESSION_TIMEOUT_DAYS: i64 = 365;

impl Config {
    pub fn from_env() -> Result<Self> {
        let session_timeout = match env::var("TALLY_SESSION_TIMEOUT_SECS") {
            Ok(raw) => parse_session_timeout(&raw).context("Invalid TALLY_SESSION_TIMEOUT_SECS")?,
            Err(_) => default_session_timeout(),
        };

        let password_scheme = env::var("TALLY_PASSWORD_SCHEME")
            .unwrap_or_else(|_| "legacy-sha256".into())
            .parse::<PasswordScheme>()
            .map_err(|e| anyhow!(e))
            .context("Invalid TALLY_PASSWORD_SCHEME")?;

        Ok(Self {
            db_path: env::var("TALLY_DB_PATH").unwrap_or_else(|_| "tally.db".into()).into(),
            host: env::var("TALLY_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env::var("TALLY_PORT")
                .unwrap_or_else(|_| "3000".into())
                .parse()
                .context("Invalid TALLY_PORT")?,
            session_timeout,
            password_scheme,
        })
    }
}

fn parse_session_timeout(raw: &str) -> Result<Duration> {
    let secs: i64 = raw.trim().parse()?;
    if secs <= 0 {
        anyhow::bail!("must be positive, got {}", secs);
    }
    Duration::try_seconds(secs)
        .filter(|d| *d <= Duration::days(MAX_SESSION_TIMEOUT_DAYS))
        .ok_or_else(|| anyhow!("must be at most {} days, got {} seconds", MAX_SESSION_TIMEOUT_DAYS, secs))
}
