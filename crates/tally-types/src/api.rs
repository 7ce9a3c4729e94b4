use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::models::UserId;

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user_id: UserId,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    /// Username or email.
    #[serde(alias = "username", alias = "email")]
    pub identifier: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user_id: UserId,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct SessionStatusResponse {
    /// `valid` or `expired`.
    pub status: &'static str,
    pub message: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub remaining_seconds: Option<i64>,
}

// -- Expenses --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddExpenseRequest {
    pub description: String,
    pub amount: f64,
    pub category: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModifyExpenseRequest {
    pub description: String,
    pub amount: f64,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RangeQuery {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub category: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteQuery {
    pub description: String,
}

#[derive(Debug, Serialize)]
pub struct AffectedResponse {
    pub affected: usize,
}
