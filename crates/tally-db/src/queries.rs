use crate::Database;
use crate::models::{
    EXPENSE_COLUMNS, ExpenseRow, USER_COLUMNS, UserRow, format_date, format_timestamp,
    parse_timestamp, parse_user_id,
};
use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{Connection, ErrorCode};
use tally_types::models::{
    Expense, IdentityField, NewExpense, NewUser, SessionRecord, User, UserId,
};
use tally_types::store::{ExpenseStore, StoreError, UserStore};
use uuid::Uuid;

// -- Users --

impl UserStore for Database {
    fn insert_user(&self, user: &NewUser) -> std::result::Result<UserId, StoreError> {
        let id = Uuid::new_v4();
        let inserted = self.with_conn_mut(|conn| {
            Ok(conn.execute(
                "INSERT INTO users (id, username, email, password_verifier, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                (
                    id.to_string(),
                    &user.username,
                    &user.email,
                    &user.password_verifier,
                    format_timestamp(user.created_at),
                ),
            ))
        })?;

        match inserted {
            Ok(_) => Ok(UserId(id)),
            Err(e) => match conflict_field(&e) {
                Some(field) => Err(StoreError::Conflict(field)),
                None => Err(StoreError::Backend(e.into())),
            },
        }
    }

    fn identifier_taken(&self, value: &str) -> Result<bool> {
        self.with_conn(|conn| {
            exists(conn, "SELECT 1 FROM users WHERE username = ?1 OR email = ?1", value)
        })
    }

    fn find_by_identifier(&self, identifier: &str) -> Result<Option<User>> {
        let row = self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {USER_COLUMNS} FROM users
                 WHERE username = ?1 OR email = ?1
                 ORDER BY rowid
                 LIMIT 1"
            ))?;
            stmt.query_row([identifier], UserRow::from_row).optional()
        })?;

        row.map(User::try_from).transpose()
    }

    fn start_session(
        &self,
        user_id: UserId,
        token: &str,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE users
                 SET session_token = ?1, session_expires_at = ?2, last_login = ?3
                 WHERE id = ?4",
                (
                    token,
                    format_timestamp(expires_at),
                    format_timestamp(now),
                    user_id.to_string(),
                ),
            )?;
            Ok(changed > 0)
        })
    }

    fn find_session(&self, token: &str) -> Result<Option<SessionRecord>> {
        let row: Option<(String, Option<String>)> = self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, session_expires_at FROM users WHERE session_token = ?1",
                [token],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
        })?;

        row.map(|(id, expires_at)| -> Result<SessionRecord> {
            Ok(SessionRecord {
                user_id: parse_user_id(&id)?,
                expires_at: expires_at.as_deref().map(parse_timestamp).transpose()?,
            })
        })
        .transpose()
    }

    fn clear_session(&self, user_id: UserId, token: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE users SET session_token = NULL, session_expires_at = NULL
                 WHERE id = ?1 AND session_token = ?2",
                (user_id.to_string(), token),
            )?;
            Ok(changed > 0)
        })
    }

    fn clear_session_by_token(&self, token: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE users SET session_token = NULL, session_expires_at = NULL
                 WHERE session_token = ?1",
                [token],
            )?;
            Ok(changed > 0)
        })
    }
}

// -- Expenses --

impl ExpenseStore for Database {
    fn insert_expense(&self, owner: UserId, expense: &NewExpense) -> Result<Expense> {
        let id = Uuid::new_v4();
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO expenses (id, owner_id, description, amount, category, date, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    id.to_string(),
                    owner.to_string(),
                    expense.description,
                    expense.amount,
                    expense.category,
                    format_date(expense.date),
                    format_timestamp(expense.created_at),
                ],
            )?;
            Ok(())
        })?;

        Ok(Expense {
            id,
            owner_id: owner,
            description: expense.description.clone(),
            amount: expense.amount,
            category: expense.category.clone(),
            date: expense.date,
            created_at: expense.created_at,
        })
    }

    fn list_expenses(&self, owner: UserId) -> Result<Vec<Expense>> {
        self.with_conn(|conn| {
            query_expenses(
                conn,
                &format!("SELECT {EXPENSE_COLUMNS} FROM expenses WHERE owner_id = ?1 ORDER BY rowid"),
                rusqlite::params![owner.to_string()],
            )
        })
    }

    fn search_expenses(&self, owner: UserId, term: &str) -> Result<Vec<Expense>> {
        // instr() rather than LIKE so '%' and '_' in the term match literally
        self.with_conn(|conn| {
            query_expenses(
                conn,
                &format!(
                    "SELECT {EXPENSE_COLUMNS} FROM expenses
                     WHERE owner_id = ?1
                       AND (instr(lower(description), lower(?2)) > 0
                            OR instr(lower(category), lower(?2)) > 0)
                     ORDER BY rowid"
                ),
                rusqlite::params![owner.to_string(), term],
            )
        })
    }

    fn expenses_between(
        &self,
        owner: UserId,
        start: NaiveDate,
        end: NaiveDate,
        category: Option<&str>,
    ) -> Result<Vec<Expense>> {
        self.with_conn(|conn| {
            query_expenses(
                conn,
                &format!(
                    "SELECT {EXPENSE_COLUMNS} FROM expenses
                     WHERE owner_id = ?1
                       AND date >= ?2 AND date <= ?3
                       AND (?4 IS NULL OR category = ?4)
                     ORDER BY date, rowid"
                ),
                rusqlite::params![owner.to_string(), format_date(start), format_date(end), category],
            )
        })
    }

    fn get_expense(&self, owner: UserId, id: Uuid) -> Result<Option<Expense>> {
        let row = self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {EXPENSE_COLUMNS} FROM expenses WHERE id = ?1 AND owner_id = ?2"
            ))?;
            stmt.query_row((id.to_string(), owner.to_string()), ExpenseRow::from_row)
                .optional()
        })?;

        row.map(Expense::try_from).transpose()
    }

    fn delete_by_description(&self, owner: UserId, description: &str) -> Result<usize> {
        self.with_conn_mut(|conn| {
            Ok(conn.execute(
                "DELETE FROM expenses WHERE owner_id = ?1 AND description = ?2",
                (owner.to_string(), description),
            )?)
        })
    }

    fn update_amount_by_description(
        &self,
        owner: UserId,
        description: &str,
        amount: f64,
    ) -> Result<usize> {
        self.with_conn_mut(|conn| {
            Ok(conn.execute(
                "UPDATE expenses SET amount = ?1 WHERE owner_id = ?2 AND description = ?3",
                rusqlite::params![amount, owner.to_string(), description],
            )?)
        })
    }
}

fn query_expenses(
    conn: &Connection,
    sql: &str,
    params: &[&dyn rusqlite::types::ToSql],
) -> Result<Vec<Expense>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, ExpenseRow::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    rows.into_iter().map(Expense::try_from).collect()
}

fn exists(conn: &Connection, sql: &str, value: &str) -> Result<bool> {
    let found = conn.query_row(sql, [value], |_| Ok(())).optional()?;
    Ok(found.is_some())
}

/// Map a UNIQUE violation on `users` to the identity column it names.
fn conflict_field(err: &rusqlite::Error) -> Option<IdentityField> {
    match err {
        rusqlite::Error::SqliteFailure(e, Some(msg)) if e.code == ErrorCode::ConstraintViolation => {
            if msg.contains("users.username") {
                Some(IdentityField::Username)
            } else if msg.contains("users.email") {
                Some(IdentityField::Email)
            } else {
                None
            }
        }
        _ => None,
    }
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
