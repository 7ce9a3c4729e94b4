use axum::extract::{FromRequest, FromRequestParts, Json, Path, Query};

use crate::error::ApiError;

// axum's own extractors answer malformed input with a plain-text body. These
// wrappers route the rejection through `ApiError` so every failure is JSON.

#[derive(FromRequest)]
#[from_request(via(Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);
