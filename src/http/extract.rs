//! Handler access to the request's logger.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::logging::Logger;

/// Rejection used when `RequestLoggerLayer` is not installed on the route.
#[derive(Debug, Clone, Copy, thiserror::Error)]
#[error("request logger middleware is not installed")]
pub struct MissingLogger;

impl IntoResponse for MissingLogger {
    fn into_response(self) -> Response {
        (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()).into_response()
    }
}

impl<S> FromRequestParts<S> for Logger
where
    S: Send + Sync,
{
    type Rejection = MissingLogger;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<Logger>().cloned().ok_or(MissingLogger)
    }
}
