use std::sync::Arc;

use tally_types::models::{IdentityField, NewUser, UserId};
use tally_types::store::UserStore;
use tracing::{info, warn};

use crate::clock::Clock;
use crate::error::AuthError;
use crate::password::{self, PasswordScheme};

/// Owns user identities and password verifiers.
pub struct CredentialStore {
    users: Arc<dyn UserStore>,
    clock: Arc<dyn Clock>,
    scheme: PasswordScheme,
}

impl CredentialStore {
    pub fn new(users: Arc<dyn UserStore>, clock: Arc<dyn Clock>, scheme: PasswordScheme) -> Self {
        Self { users, clock, scheme }
    }

    /// Create a user. Username collisions are reported before email
    /// collisions; a race lost at insert time is reported the same way.
    ///
    /// Login accepts either column, so a new username may not equal any
    /// existing email and a new email may not equal any existing username.
    pub fn register(&self, username: &str, email: &str, password: &str) -> Result<UserId, AuthError> {
        let username = username.trim();
        let email = email.trim();

        if username.is_empty() {
            return Err(AuthError::Validation("username must not be empty".into()));
        }
        if email.is_empty() {
            return Err(AuthError::Validation("email must not be empty".into()));
        }
        if password.is_empty() {
            return Err(AuthError::Validation("password must not be empty".into()));
        }

        if self.users.identifier_taken(username)? {
            return Err(AuthError::DuplicateIdentity(IdentityField::Username));
        }
        if self.users.identifier_taken(email)? {
            return Err(AuthError::DuplicateIdentity(IdentityField::Email));
        }

        let user = NewUser {
            username: username.to_string(),
            email: email.to_string(),
            password_verifier: self.scheme.derive(password)?,
            created_at: self.clock.now(),
        };

        let user_id = self.users.insert_user(&user)?;

        info!(%user_id, username, "User registered");
        Ok(user_id)
    }

    /// Resolve `identifier` (username or email) and check the password.
    pub fn verify_credentials(&self, identifier: &str, password: &str) -> Result<UserId, AuthError> {
        let Some(user) = self.users.find_by_identifier(identifier.trim())? else {
            warn!("Credential check failed: unknown identity");
            return Err(AuthError::AuthFailure);
        };

        if !password::verify(password, &user.password_verifier)? {
            warn!(user_id = %user.id, "Credential check failed: wrong password");
            return Err(AuthError::AuthFailure);
        }

        Ok(user.id)
    }
}
