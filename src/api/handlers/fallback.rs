use axum::http::{Method, Uri};

use crate::error::AppError;

/// Upstream of last resort: nothing claimed the request.
pub async fn no_route(method: Method, uri: Uri) -> AppError {
    AppError::no_route(method, uri.path())
}
