use std::str::FromStr;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use tracing::warn;

use crate::error::AuthError;

/// How new password verifiers are derived.
///
/// `LegacySha256` is an unsalted SHA-256 hex digest. It is kept as the default
/// so verifiers written by earlier deployments keep matching; switching the
/// default changes the stored format for every new account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PasswordScheme {
    #[default]
    LegacySha256,
    Argon2id,
}

impl PasswordScheme {
    pub fn derive(self, password: &str) -> Result<String, AuthError> {
        match self {
            PasswordScheme::LegacySha256 => Ok(hex::encode(Sha256::digest(password.as_bytes()))),
            PasswordScheme::Argon2id => {
                let salt = SaltString::generate(&mut OsRng);
                let hash = Argon2::default()
                    .hash_password(password.as_bytes(), &salt)
                    .map_err(|e| AuthError::Internal(format!("Argon2 hash error: {}", e)))?;
                Ok(hash.to_string())
            }
        }
    }
}

impl FromStr for PasswordScheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "legacy-sha256" | "sha256" => Ok(PasswordScheme::LegacySha256),
            "argon2id" | "argon2" => Ok(PasswordScheme::Argon2id),
            other => Err(format!("unknown password scheme '{}'", other)),
        }
    }
}

/// Check `password` against a stored verifier of either format.
pub fn verify(password: &str, verifier: &str) -> Result<bool, AuthError> {
    if verifier.starts_with("$argon2") {
        let parsed = PasswordHash::new(verifier)
            .map_err(|e| AuthError::Internal(format!("Hash parse error: {}", e)))?;
        return Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok());
    }

    let Ok(stored) = hex::decode(verifier) else {
        warn!("Stored password verifier is neither Argon2 nor hex");
        return Ok(false);
    };
    let computed = Sha256::digest(password.as_bytes());
    Ok(computed.as_slice().ct_eq(&stored).into())
}
