use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use uuid::Uuid;

use tally_types::api::{
    AddExpenseRequest, AffectedResponse, DeleteQuery, ModifyExpenseRequest, RangeQuery,
    SearchQuery,
};

use crate::auth::{AppState, blocking};
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::middleware::BearerToken;

// Every handler passes the raw token through; the mediator resolves the owner.

pub async fn add_expense(
    State(state): State<AppState>,
    Extension(BearerToken(token)): Extension<BearerToken>,
    ApiJson(req): ApiJson<AddExpenseRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let expense = blocking(move || {
        Ok(state.mediator.add_expense(&token, &req.description, req.amount, &req.category)?)
    })
    .await?;

    Ok((StatusCode::CREATED, Json(expense)))
}

/// `?q=` switches from listing to searching.
pub async fn list_expenses(
    State(state): State<AppState>,
    Extension(BearerToken(token)): Extension<BearerToken>,
    ApiQuery(query): ApiQuery<SearchQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let expenses = blocking(move || {
        let found = match query.q {
            Some(term) => state.mediator.search_expenses(&token, &term)?,
            None => state.mediator.list_expenses(&token)?,
        };
        Ok(found)
    })
    .await?;

    Ok(Json(expenses))
}

pub async fn expenses_between(
    State(state): State<AppState>,
    Extension(BearerToken(token)): Extension<BearerToken>,
    ApiQuery(query): ApiQuery<RangeQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let expenses = blocking(move || {
        Ok(state.mediator.expenses_between(
            &token,
            query.start,
            query.end,
            query.category.as_deref(),
        )?)
    })
    .await?;

    Ok(Json(expenses))
}

pub async fn summarize(
    State(state): State<AppState>,
    Extension(BearerToken(token)): Extension<BearerToken>,
    ApiQuery(query): ApiQuery<RangeQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let summary = blocking(move || {
        Ok(state.mediator.summarize_between(
            &token,
            query.start,
            query.end,
            query.category.as_deref(),
        )?)
    })
    .await?;

    Ok(Json(summary))
}

pub async fn expense_details(
    State(state): State<AppState>,
    Extension(BearerToken(token)): Extension<BearerToken>,
    ApiPath(expense_id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let expense =
        blocking(move || Ok(state.mediator.expense_details(&token, expense_id)?)).await?;

    Ok(Json(expense))
}

pub async fn delete_expenses(
    State(state): State<AppState>,
    Extension(BearerToken(token)): Extension<BearerToken>,
    ApiQuery(query): ApiQuery<DeleteQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let affected =
        blocking(move || Ok(state.mediator.delete_expenses(&token, &query.description)?)).await?;

    Ok(Json(AffectedResponse { affected }))
}

pub async fn modify_expense(
    State(state): State<AppState>,
    Extension(BearerToken(token)): Extension<BearerToken>,
    ApiJson(req): ApiJson<ModifyExpenseRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let affected = blocking(move || {
        Ok(state.mediator.modify_expense_amount(&token, &req.description, req.amount)?)
    })
    .await?;

    Ok(Json(AffectedResponse { affected }))
}
