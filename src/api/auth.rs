//! Caller identity.
//!
//! Authentication happens upstream: the proxy in front of this service sets
//! `X-User-Id` (and `X-User-Email` on first sign-in) for every request.

use crate::api::AppState;
use crate::domain::{User, UserId};
use crate::error::AppError;
use crate::services::ServiceError;
use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use tracing::info;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_EMAIL_HEADER: &str = "x-user-email";
pub const USER_PROVIDER_PROXY: &str = "proxy";

/// The authenticated user, loaded from the store.
///
/// A user unknown to the store is created on the spot when the proxy also
/// supplied an email address.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

fn header<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        let user_id = header(parts, USER_ID_HEADER)
            .map(UserId::new)
            .ok_or_else(|| AppError::Unauthorized("missing user identity".into()))?;

        match state.services.users.find_by_id(&user_id).await {
            Ok(user) => Ok(CurrentUser(user)),
            Err(ServiceError::UserNotFound(_)) => {
                let email = header(parts, USER_EMAIL_HEADER)
                    .ok_or_else(|| AppError::Unauthorized("unknown user".into()))?;
                let user = state
                    .services
                    .users
                    .create(&User::new(user_id, email, USER_PROVIDER_PROXY))
                    .await?;
                info!(user_id = %user.id, "User registered on first sign-in");
                Ok(CurrentUser(user))
            }
            Err(e) => Err(e.into()),
        }
    }
}
