use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use tally_types::models::{CategoryGroup, Expense, ExpenseSummary, NewExpense, UserId};
use tally_types::store::ExpenseStore;
use tracing::{info, warn};
use uuid::Uuid;

use crate::clock::Clock;
use crate::error::{AccessError, Rejection};
use crate::session::{SessionManager, TokenState};

/// The single gate in front of expense storage.
///
/// Every operation takes the caller's token, resolves it to an owner, and
/// hands that owner to the store. Callers never supply an owner themselves,
/// and nothing runs when the token does not resolve.
pub struct AccessMediator {
    sessions: Arc<SessionManager>,
    expenses: Arc<dyn ExpenseStore>,
    clock: Arc<dyn Clock>,
}

impl AccessMediator {
    pub fn new(
        sessions: Arc<SessionManager>,
        expenses: Arc<dyn ExpenseStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { sessions, expenses, clock }
    }

    fn authorize(&self, token: &str) -> Result<UserId, AccessError> {
        match self.sessions.validate(token)? {
            TokenState::Live(owner) => Ok(owner),
            TokenState::Expired => {
                warn!("Rejected call with expired session");
                Err(AccessError::Unauthenticated(Rejection::Expired))
            }
            TokenState::Invalid => {
                warn!("Rejected call with unrecognized token");
                Err(AccessError::Unauthenticated(Rejection::Invalid))
            }
        }
    }

    pub fn add_expense(
        &self,
        token: &str,
        description: &str,
        amount: f64,
        category: &str,
    ) -> Result<Expense, AccessError> {
        let owner = self.authorize(token)?;
        require_text("description", description)?;
        require_amount(amount)?;

        let now = self.clock.now();
        let expense = self.expenses.insert_expense(
            owner,
            &NewExpense {
                description: description.to_string(),
                amount,
                category: category.trim().to_string(),
                date: now.date_naive(),
                created_at: now,
            },
        )?;

        info!(%owner, expense_id = %expense.id, "Expense added");
        Ok(expense)
    }

    pub fn list_expenses(&self, token: &str) -> Result<Vec<Expense>, AccessError> {
        let owner = self.authorize(token)?;
        Ok(self.expenses.list_expenses(owner)?)
    }

    pub fn search_expenses(&self, token: &str, term: &str) -> Result<Vec<Expense>, AccessError> {
        let owner = self.authorize(token)?;
        require_text("search term", term)?;
        Ok(self.expenses.search_expenses(owner, term.trim())?)
    }

    /// Expenses dated within `[start, end]`, optionally limited to one exact
    /// category.
    pub fn expenses_between(
        &self,
        token: &str,
        start: NaiveDate,
        end: NaiveDate,
        category: Option<&str>,
    ) -> Result<Vec<Expense>, AccessError> {
        let owner = self.authorize(token)?;
        require_range(start, end)?;
        Ok(self.expenses.expenses_between(owner, start, end, non_blank(category))?)
    }

    pub fn summarize_between(
        &self,
        token: &str,
        start: NaiveDate,
        end: NaiveDate,
        category: Option<&str>,
    ) -> Result<ExpenseSummary, AccessError> {
        let owner = self.authorize(token)?;
        require_range(start, end)?;
        let expenses = self.expenses.expenses_between(owner, start, end, non_blank(category))?;

        let expense_count = expenses.len();
        let mut grand_total = 0.0;
        let mut groups: BTreeMap<String, CategoryGroup> = BTreeMap::new();
        for expense in expenses {
            grand_total += expense.amount;
            let group = groups
                .entry(expense.category.clone())
                .or_insert_with(|| CategoryGroup {
                    category: expense.category.clone(),
                    total: 0.0,
                    expenses: Vec::new(),
                });
            group.total += expense.amount;
            group.expenses.push(expense);
        }

        Ok(ExpenseSummary {
            start,
            end,
            groups: groups.into_values().collect(),
            grand_total,
            expense_count,
        })
    }

    /// A single expense. Another owner's expense is indistinguishable from a
    /// missing one.
    pub fn expense_details(&self, token: &str, id: Uuid) -> Result<Expense, AccessError> {
        let owner = self.authorize(token)?;
        self.expenses.get_expense(owner, id)?.ok_or(AccessError::NotFound)
    }

    /// Delete every one of the caller's expenses with exactly this
    /// description. Returns how many were removed.
    pub fn delete_expenses(&self, token: &str, description: &str) -> Result<usize, AccessError> {
        let owner = self.authorize(token)?;
        require_text("description", description)?;

        let deleted = self.expenses.delete_by_description(owner, description)?;
        if deleted == 0 {
            return Err(AccessError::NotFound);
        }

        info!(%owner, deleted, "Expenses deleted");
        Ok(deleted)
    }

    /// Set the amount on every one of the caller's expenses with exactly this
    /// description. Returns how many were changed.
    pub fn modify_expense_amount(
        &self,
        token: &str,
        description: &str,
        amount: f64,
    ) -> Result<usize, AccessError> {
        let owner = self.authorize(token)?;
        require_text("description", description)?;
        require_amount(amount)?;

        let updated = self.expenses.update_amount_by_description(owner, description, amount)?;
        if updated == 0 {
            return Err(AccessError::NotFound);
        }

        info!(%owner, updated, "Expense amounts modified");
        Ok(updated)
    }
}

fn require_text(field: &str, value: &str) -> Result<(), AccessError> {
    if value.trim().is_empty() {
        return Err(AccessError::Validation(format!("{} must not be empty", field)));
    }
    Ok(())
}

fn require_amount(amount: f64) -> Result<(), AccessError> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(AccessError::Validation(format!(
            "amount must be a non-negative number, got {}",
            amount
        )));
    }
    Ok(())
}

fn require_range(start: NaiveDate, end: NaiveDate) -> Result<(), AccessError> {
    if start > end {
        return Err(AccessError::Validation(format!(
            "start date {} is after end date {}",
            start, end
        )));
    }
    Ok(())
}

fn non_blank(category: Option<&str>) -> Option<&str> {
    category.map(str::trim).filter(|c| !c.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{Fixture, fixture};
    use chrono::Duration;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 5, d).unwrap()
    }

    /// alice and bob, both logged in, each with a coffee and one other expense.
    fn two_users() -> (Fixture, String, String) {
        let f = fixture();
        f.credentials.register("alice", "a@x.com", "pw1").unwrap();
        f.credentials.register("bob", "b@x.com", "pw2").unwrap();
        let a = f.sessions.login("alice", "pw1").unwrap().token;
        let b = f.sessions.login("bob", "pw2").unwrap().token;

        f.mediator.add_expense(&a, "coffee", 4.50, "Food").unwrap();
        f.mediator.add_expense(&b, "coffee", 3.00, "Food").unwrap();
        f.mediator.add_expense(&a, "rent", 900.0, "Housing").unwrap();
        f.mediator.add_expense(&b, "bus", 2.20, "Transport").unwrap();
        (f, a, b)
    }

    #[test]
    fn new_expense_is_stamped_with_owner_and_day() {
        let f = fixture();
        let id = f.credentials.register("alice", "a@x.com", "pw1").unwrap();
        let token = f.sessions.login("alice", "pw1").unwrap().token;

        let expense = f.mediator.add_expense(&token, "coffee", 4.50, " Food ").unwrap();
        assert_eq!(expense.owner_id, id);
        assert_eq!(expense.date, day(4));
        assert_eq!(expense.category, "Food");
    }

    #[test]
    fn other_users_expenses_are_never_listed() {
        let (f, a, b) = two_users();

        let bobs = f.mediator.list_expenses(&b).unwrap();
        let names: Vec<_> = bobs.iter().map(|e| e.description.as_str()).collect();
        assert_eq!(names, vec!["coffee", "bus"]);
        assert!(bobs.iter().all(|e| e.amount != 4.50));

        let alices = f.mediator.list_expenses(&a).unwrap();
        assert_eq!(alices.len(), 2);
        assert!(alices.iter().all(|e| e.description != "bus"));
    }

    #[test]
    fn search_range_and_summary_are_scoped() {
        let (f, a, b) = two_users();

        assert_eq!(f.mediator.search_expenses(&a, "food").unwrap().len(), 1);
        assert!(f.mediator.search_expenses(&a, "bus").unwrap().is_empty());

        let range = f.mediator.expenses_between(&b, day(1), day(31), None).unwrap();
        assert_eq!(range.len(), 2);

        let summary = f.mediator.summarize_between(&a, day(1), day(31), None).unwrap();
        let cats: Vec<_> = summary.groups.iter().map(|g| g.category.as_str()).collect();
        assert_eq!(cats, vec!["Food", "Housing"]);
        assert_eq!(summary.grand_total, 904.5);
        assert_eq!(summary.expense_count, 2);

        let food = f.mediator.summarize_between(&b, day(1), day(31), Some("Food")).unwrap();
        assert_eq!(food.groups.len(), 1);
        assert_eq!(food.groups[0].total, 3.0);
    }

    #[test]
    fn details_delete_and_modify_cannot_reach_other_owner() {
        let (f, a, b) = two_users();
        let bobs_coffee = f.mediator.list_expenses(&b).unwrap()[0].clone();

        assert!(matches!(
            f.mediator.expense_details(&a, bobs_coffee.id),
            Err(AccessError::NotFound)
        ));
        assert_eq!(f.mediator.expense_details(&b, bobs_coffee.id).unwrap(), bobs_coffee);

        assert!(matches!(f.mediator.delete_expenses(&a, "bus"), Err(AccessError::NotFound)));
        assert!(matches!(
            f.mediator.modify_expense_amount(&a, "bus", 0.0),
            Err(AccessError::NotFound)
        ));

        assert_eq!(f.mediator.modify_expense_amount(&a, "coffee", 5.0).unwrap(), 1);
        assert_eq!(f.mediator.delete_expenses(&a, "coffee").unwrap(), 1);

        let bobs = f.mediator.list_expenses(&b).unwrap();
        assert_eq!(bobs.len(), 2);
        assert_eq!(bobs[0], bobs_coffee);
    }

    #[test]
    fn invalid_token_runs_nothing() {
        let (f, a, _) = two_users();
        let before = f.mediator.list_expenses(&a).unwrap().len();

        let err = f.mediator.add_expense("forged", "x", 1.0, "Food").unwrap_err();
        assert!(matches!(err, AccessError::Unauthenticated(Rejection::Invalid)));
        assert!(matches!(
            f.mediator.delete_expenses("forged", "coffee"),
            Err(AccessError::Unauthenticated(Rejection::Invalid))
        ));
        assert_eq!(f.mediator.list_expenses(&a).unwrap().len(), before);
    }

    #[test]
    fn expired_token_is_reported_then_forgotten() {
        let (f, a, _) = two_users();
        f.clock.advance(Duration::hours(24) + Duration::seconds(1));

        assert!(matches!(
            f.mediator.list_expenses(&a),
            Err(AccessError::Unauthenticated(Rejection::Expired))
        ));
        assert!(matches!(
            f.mediator.list_expenses(&a),
            Err(AccessError::Unauthenticated(Rejection::Invalid))
        ));
    }

    #[test]
    fn logged_out_token_is_rejected() {
        let (f, a, _) = two_users();
        f.sessions.logout(&a).unwrap();
        assert!(matches!(
            f.mediator.search_expenses(&a, "coffee"),
            Err(AccessError::Unauthenticated(Rejection::Invalid))
        ));
    }

    #[test]
    fn authentication_is_checked_before_input() {
        let f = fixture();
        let err = f.mediator.add_expense("forged", "", -1.0, "Food").unwrap_err();
        assert!(matches!(err, AccessError::Unauthenticated(_)));
    }

    #[test]
    fn bad_input_is_rejected() {
        let (f, a, _) = two_users();
        assert!(matches!(f.mediator.add_expense(&a, "tea", -1.0, "Food"), Err(AccessError::Validation(_))));
        assert!(matches!(f.mediator.add_expense(&a, "tea", f64::NAN, "Food"), Err(AccessError::Validation(_))));
        assert!(matches!(f.mediator.add_expense(&a, "  ", 1.0, "Food"), Err(AccessError::Validation(_))));
        assert!(matches!(f.mediator.search_expenses(&a, ""), Err(AccessError::Validation(_))));
        assert!(matches!(
            f.mediator.expenses_between(&a, day(9), day(1), None),
            Err(AccessError::Validation(_))
        ));
        assert!(matches!(
            f.mediator.modify_expense_amount(&a, "coffee", f64::INFINITY),
            Err(AccessError::Validation(_))
        ));
    }
}
