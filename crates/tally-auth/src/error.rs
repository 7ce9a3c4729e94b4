use std::fmt;

use tally_types::models::IdentityField;
use tally_types::store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0} is already registered")]
    DuplicateIdentity(IdentityField),

    /// Unknown identity and wrong password are deliberately the same error.
    #[error("invalid credentials")]
    AuthFailure,

    #[error("session token not recognized")]
    InvalidToken,

    #[error("invalid input: {0}")]
    Validation(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("storage failure: {0}")]
    Store(#[from] anyhow::Error),
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(field) => AuthError::DuplicateIdentity(field),
            StoreError::Backend(e) => AuthError::Store(e),
        }
    }
}

/// Why a token did not resolve to a live session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    Invalid,
    Expired,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::Invalid => f.write_str("invalid session"),
            Rejection::Expired => f.write_str("session expired"),
        }
    }
}

#[derive(Debug, Error)]
pub enum AccessError {
    #[error("not authenticated: {0}")]
    Unauthenticated(Rejection),

    #[error("expense not found")]
    NotFound,

    #[error("invalid input: {0}")]
    Validation(String),

    #[error("storage failure: {0}")]
    Store(#[from] anyhow::Error),
}
