use crate::api::auth::CurrentUser;
use crate::api::dto::InvestmentDto;
use crate::api::AppState;
use crate::domain::{
    parse_date, CreateInvestmentCommand, InitialInvestmentUpdate, Investment, InvestmentId,
    InvestmentType, User,
};
use crate::error::AppError;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use std::str::FromStr;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitialUpdateRequest {
    pub date: Option<String>,
    pub deposit: Option<i64>,
    pub value: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInvestmentRequest {
    #[serde(rename = "type")]
    pub investment_type: InvestmentType,
    pub name: String,
    pub initial_update: Option<InitialUpdateRequest>,
}

pub(crate) fn parse_investment_id(raw: &str) -> Result<InvestmentId, AppError> {
    InvestmentId::from_str(raw).map_err(|_| AppError::BadRequest("Invalid investment id".into()))
}

/// Load an investment and check that it belongs to `user`.
pub(crate) async fn owned_investment(
    state: &AppState,
    user: &User,
    id: InvestmentId,
) -> Result<Investment, AppError> {
    let investment = state.services.investments.find_by_id(id).await?;
    if investment.user_id != user.id {
        return Err(AppError::Forbidden(
            "investment belongs to another user".into(),
        ));
    }
    Ok(investment)
}

pub async fn list_investments(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<InvestmentDto>>, AppError> {
    let investments = state.services.investments.find_by_user_id(&user.id).await?;
    Ok(Json(investments.iter().map(InvestmentDto::from).collect()))
}

pub async fn create_investment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<CreateInvestmentRequest>,
) -> Result<(StatusCode, Json<InvestmentDto>), AppError> {
    let name = body.name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("name must not be empty".into()));
    }

    let initial_update = match body.initial_update {
        Some(seed) => {
            let date = match seed.date.as_deref() {
                Some(raw) => Some(
                    parse_date(raw)
                        .map_err(|_| AppError::BadRequest("date must be YYYY-MM-DD".into()))?,
                ),
                None => None,
            };
            Some(InitialInvestmentUpdate {
                date,
                deposit: seed.deposit,
                value: seed.value,
            })
        }
        None => None,
    };

    let investment = state
        .services
        .investments
        .create(CreateInvestmentCommand::new(
            body.investment_type,
            name,
            user,
            initial_update,
        ))
        .await?;

    Ok((StatusCode::CREATED, Json(InvestmentDto::from(&investment))))
}

pub async fn get_investment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<InvestmentDto>, AppError> {
    let id = parse_investment_id(&id)?;
    let investment = owned_investment(&state, &user, id).await?;
    Ok(Json(InvestmentDto::from(&investment)))
}

pub async fn delete_investment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id = parse_investment_id(&id)?;
    owned_investment(&state, &user, id).await?;
    state.services.investments.delete_by_id(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
