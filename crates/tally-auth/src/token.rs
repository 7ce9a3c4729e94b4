use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{TryRngCore, rngs::OsRng};

use crate::error::AuthError;

/// Entropy per session token.
pub const TOKEN_BYTES: usize = 32;

/// Generate an opaque session token from the OS RNG, base64url-encoded.
pub fn generate_token() -> Result<String, AuthError> {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| AuthError::Internal(format!("Failed to generate token: {}", e)))?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}
