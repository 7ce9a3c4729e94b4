//! Database row types. These map directly to SQLite rows and are converted
//! into the `tally-types` models at the edge of this crate.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use tally_types::models::{Expense, User, UserId};

pub const USER_COLUMNS: &str = "id, username, email, password_verifier, session_token, \
     session_expires_at, created_at, last_login";

pub const EXPENSE_COLUMNS: &str = "id, owner_id, description, amount, category, date, created_at";

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password_verifier: String,
    pub session_token: Option<String>,
    pub session_expires_at: Option<String>,
    pub created_at: String,
    pub last_login: Option<String>,
}

impl UserRow {
    pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            username: row.get(1)?,
            email: row.get(2)?,
            password_verifier: row.get(3)?,
            session_token: row.get(4)?,
            session_expires_at: row.get(5)?,
            created_at: row.get(6)?,
            last_login: row.get(7)?,
        })
    }
}

impl TryFrom<UserRow> for User {
    type Error = anyhow::Error;

    fn try_from(row: UserRow) -> Result<Self> {
        Ok(User {
            id: parse_user_id(&row.id)?,
            username: row.username,
            email: row.email,
            password_verifier: row.password_verifier,
            session_token: row.session_token,
            session_expires_at: row.session_expires_at.as_deref().map(parse_timestamp).transpose()?,
            created_at: parse_timestamp(&row.created_at)?,
            last_login: row.last_login.as_deref().map(parse_timestamp).transpose()?,
        })
    }
}

pub struct ExpenseRow {
    pub id: String,
    pub owner_id: String,
    pub description: String,
    pub amount: f64,
    pub category: String,
    pub date: String,
    pub created_at: String,
}

impl ExpenseRow {
    pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            owner_id: row.get(1)?,
            description: row.get(2)?,
            amount: row.get(3)?,
            category: row.get(4)?,
            date: row.get(5)?,
            created_at: row.get(6)?,
        })
    }
}

impl TryFrom<ExpenseRow> for Expense {
    type Error = anyhow::Error;

    fn try_from(row: ExpenseRow) -> Result<Self> {
        Ok(Expense {
            id: row.id.parse().with_context(|| format!("corrupt expense id '{}'", row.id))?,
            owner_id: parse_user_id(&row.owner_id)?,
            date: parse_date(&row.date)?,
            created_at: parse_timestamp(&row.created_at)?,
            description: row.description,
            amount: row.amount,
            category: row.category,
        })
    }
}

pub fn parse_user_id(raw: &str) -> Result<UserId> {
    let id = raw.parse().with_context(|| format!("corrupt user id '{}'", raw))?;
    Ok(UserId(id))
}

/// Fixed-width RFC 3339 so stored timestamps also sort lexically. Full
/// nanosecond precision: an expiry read back must equal the one issued.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            // Column defaults use SQLite's "YYYY-MM-DD HH:MM:SS" with no zone.
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .with_context(|| format!("corrupt timestamp '{}'", raw))
}

pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").with_context(|| format!("corrupt date '{}'", raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn timestamps_parse_both_formats() {
        let ts = Utc.with_ymd_and_hms(2026, 3, 1, 12, 30, 0).unwrap();
        assert_eq!(parse_timestamp(&format_timestamp(ts)).unwrap(), ts);
        assert_eq!(parse_timestamp("2026-03-01 12:30:00").unwrap(), ts);
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn sub_microsecond_timestamps_survive_storage() {
        let ts = Utc.with_ymd_and_hms(2026, 5, 4, 9, 0, 0).unwrap()
            + chrono::Duration::nanoseconds(999);
        assert_eq!(format_timestamp(ts), "2026-05-04T09:00:00.000000999Z");
        assert_eq!(parse_timestamp(&format_timestamp(ts)).unwrap(), ts);
    }

    #[test]
    fn formatted_timestamps_sort_lexically() {
        let a = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        let b = a + chrono::Duration::milliseconds(1500);
        assert!(format_timestamp(a) < format_timestamp(b));
        assert_eq!(format_timestamp(a).len(), format_timestamp(b).len());
    }
}
