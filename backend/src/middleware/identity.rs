use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::request::Parts,
    response::{IntoResponse, Response},
};
use uuid::Uuid;

use crate::error::AppError;

/// Set by the upstream authentication layer
pub const USER_ID_HEADER: &str = "x-user-id";

/// Caller identity, when one was forwarded. Requests without the header are
/// anonymous; a header that is not a UUID is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestUser(pub Option<Uuid>);

#[async_trait]
impl<S> FromRequestParts<S> for RequestUser
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(header) = parts.headers.get(USER_ID_HEADER) else {
            return Ok(RequestUser(None));
        };

        header
            .to_str()
            .ok()
            .and_then(|value| Uuid::parse_str(value.trim()).ok())
            .map(|id| RequestUser(Some(id)))
            .ok_or_else(|| AppError::Unauthorized("Invalid user id header".to_string()).into_response())
    }
}
