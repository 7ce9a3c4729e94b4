use axum::{
    extract::Request,
    http::header,
    middleware::Next,
    response::Response,
};

use crate::error::ApiError;

/// The raw bearer token of the current request. Resolving it is left to the
/// auth layer.
#[derive(Clone)]
pub struct BearerToken(pub String);

/// Extract the token from the Authorization header.
pub async fn require_bearer(mut req: Request, next: Next) -> Result<Response, ApiError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(ApiError::MissingToken)?
        .to_string();

    req.extensions_mut().insert(BearerToken(token));
    Ok(next.run(req).await)
}
