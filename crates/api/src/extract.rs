//! Request extractors whose rejections use the [`AppError`] JSON envelope.

use axum::extract::FromRequest;

use crate::error::AppError;

/// `axum::Json` with malformed or incomplete bodies rejected as
/// `400 BAD_REQUEST` `{error, code}` instead of axum's plain-text response.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);
