pub mod auth;
pub mod error;
pub mod expenses;
pub mod extract;
pub mod middleware;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};

pub use auth::{AppState, AppStateInner};

/// All routes. Everything except register and login requires a bearer token.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/auth/logout", post(auth::logout))
        .route("/auth/session", get(auth::session_status))
        .route(
            "/expenses",
            post(expenses::add_expense)
                .get(expenses::list_expenses)
                .delete(expenses::delete_expenses)
                .patch(expenses::modify_expense),
        )
        .route("/expenses/range", get(expenses::expenses_between))
        .route("/expenses/summary", get(expenses::summarize))
        .route("/expenses/{expense_id}", get(expenses::expense_details))
        .layer(axum_middleware::from_fn(middleware::require_bearer))
        .with_state(state);

    Router::new().merge(public_routes).merge(protected_routes)
}
