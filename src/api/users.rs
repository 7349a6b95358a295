use crate::api::auth::CurrentUser;
use crate::api::dto::UserDto;
use crate::api::AppState;
use crate::error::AppError;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

pub async fn get_user(CurrentUser(user): CurrentUser) -> Json<UserDto> {
    Json(UserDto::from(&user))
}

/// Create a demo account with a seeded portfolio. The returned id is used as
/// the caller identity for the rest of the session.
pub async fn create_demo_user(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<UserDto>), AppError> {
    let demo = state.demo.create().await?;
    Ok((StatusCode::CREATED, Json(UserDto::from(&demo))))
}
