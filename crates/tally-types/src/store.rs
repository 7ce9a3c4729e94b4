//! Repository interfaces.
//!
//! The auth layer only ever talks to storage through these traits, so the
//! SQLite implementation in `tally-db` can be swapped or faked in tests.

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Expense, IdentityField, NewExpense, NewUser, SessionRecord, User, UserId};

#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique identity column rejected the write.
    #[error("{0} already exists")]
    Conflict(IdentityField),
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

pub trait UserStore: Send + Sync {
    /// Insert a user with null session fields and return its new id.
    /// Unique-constraint violations surface as `StoreError::Conflict`.
    fn insert_user(&self, user: &NewUser) -> std::result::Result<UserId, StoreError>;

    /// True when any user holds `value` as a username or as an email.
    /// Both columns are checked because either one is accepted at login.
    fn identifier_taken(&self, value: &str) -> Result<bool>;

    /// Look up a user whose username or email equals `identifier`.
    /// When several users match, the oldest account wins.
    fn find_by_identifier(&self, identifier: &str) -> Result<Option<User>>;

    /// Replace the user's session and stamp `last_login`.
    /// Returns false when no such user exists.
    fn start_session(
        &self,
        user_id: UserId,
        token: &str,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<bool>;

    fn find_session(&self, token: &str) -> Result<Option<SessionRecord>>;

    /// Clear the session only if `user_id` still holds `token`.
    /// Returns whether a row changed.
    fn clear_session(&self, user_id: UserId, token: &str) -> Result<bool>;

    /// Clear whichever user holds `token`. Returns whether a row changed.
    fn clear_session_by_token(&self, token: &str) -> Result<bool>;
}

/// Expense persistence. Every method takes the owner explicitly; there is no
/// unscoped access path.
pub trait ExpenseStore: Send + Sync {
    fn insert_expense(&self, owner: UserId, expense: &NewExpense) -> Result<Expense>;

    /// All of the owner's expenses in insertion order.
    fn list_expenses(&self, owner: UserId) -> Result<Vec<Expense>>;

    /// Case-insensitive substring match on description or category.
    fn search_expenses(&self, owner: UserId, term: &str) -> Result<Vec<Expense>>;

    /// Expenses dated within `[start, end]`, ordered by date then insertion.
    fn expenses_between(
        &self,
        owner: UserId,
        start: NaiveDate,
        end: NaiveDate,
        category: Option<&str>,
    ) -> Result<Vec<Expense>>;

    fn get_expense(&self, owner: UserId, id: Uuid) -> Result<Option<Expense>>;

    fn delete_by_description(&self, owner: UserId, description: &str) -> Result<usize>;

    fn update_amount_by_description(
        &self,
        owner: UserId,
        description: &str,
        amount: f64,
    ) -> Result<usize>;
}
