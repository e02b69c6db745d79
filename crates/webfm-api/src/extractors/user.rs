//! `ActingUser` extractor: the name recorded as `deletedBy` in the trash.

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

/// Header carrying the acting user's name.
pub const USER_HEADER: &str = "x-user";

/// Name recorded for requests without a user header.
pub const ANONYMOUS: &str = "anonymous";

/// The caller as named by the `X-User` header.
///
/// There is no authentication; the value is only recorded, never checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActingUser(pub String);

impl ActingUser {
    /// The recorded name.
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl<S> FromRequestParts<S> for ActingUser
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let name = parts
            .headers
            .get(USER_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .unwrap_or(ANONYMOUS);

        Ok(Self(name.to_string()))
    }
}
