use crate::api::auth::CurrentUser;
use crate::api::AppState;
use crate::domain::{Currency, Settings};
use crate::error::AppError;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsDto {
    pub currency: Currency,
}

pub async fn get_settings(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<SettingsDto>, AppError> {
    let settings = state.services.settings.find_by_user_id(&user.id).await?;
    Ok(Json(SettingsDto {
        currency: settings.currency,
    }))
}

pub async fn put_settings(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<SettingsDto>,
) -> Result<Json<SettingsDto>, AppError> {
    let saved = state
        .services
        .settings
        .update(&Settings::new(user.id, body.currency))
        .await?;
    Ok(Json(SettingsDto {
        currency: saved.currency,
    }))
}
