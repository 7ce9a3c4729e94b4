/// Shared types for the Tally workspace.
///
/// `models` holds the domain records, `api` the HTTP request/response bodies,
/// and `store` the repository traits that the persistence layer implements
/// and the auth layer consumes.
pub mod api;
pub mod models;
pub mod store;
