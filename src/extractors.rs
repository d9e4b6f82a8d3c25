use axum::extract::{FromRequest, FromRequestParts};

use crate::error::ApiError;

/// `Json` whose rejection renders as an [`ApiError`] body.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct AppJson<T>(pub T);

/// `Path` whose rejection renders as an [`ApiError`] body.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct AppPath<T>(pub T);
