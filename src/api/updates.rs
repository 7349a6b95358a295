use crate::api::auth::CurrentUser;
use crate::api::dto::InvestmentUpdateDto;
use crate::api::investments::{owned_investment, parse_investment_id};
use crate::api::AppState;
use crate::domain::{
    parse_date, CreateInvestmentUpdateCommand, FindInvestmentUpdateQuery, InvestmentId, UpdateId,
};
use crate::error::AppError;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::str::FromStr;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInvestmentUpdateRequest {
    pub date: String,
    pub deposit: Option<i64>,
    pub withdrawal: Option<i64>,
    pub value: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindUpdatesQuery {
    /// Comma-separated investment ids; all of the caller's when absent.
    pub investment_id: Option<String>,
    pub date_from: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResponse {
    pub imported: usize,
}

pub async fn create_update(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    Json(body): Json<CreateInvestmentUpdateRequest>,
) -> Result<(StatusCode, Json<InvestmentUpdateDto>), AppError> {
    let id = parse_investment_id(&id)?;
    owned_investment(&state, &user, id).await?;

    let date = parse_date(&body.date)
        .map_err(|_| AppError::BadRequest("date must be YYYY-MM-DD".into()))?;
    let update = state
        .services
        .updates
        .create(&CreateInvestmentUpdateCommand::new(
            id,
            date,
            body.deposit,
            body.withdrawal,
            body.value,
        ))
        .await?;

    Ok((StatusCode::CREATED, Json(InvestmentUpdateDto::from(&update))))
}

/// Ledger query over the caller's investments.
///
/// Requested ids the caller does not own are dropped rather than rejected.
pub async fn find_updates(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(params): Query<FindUpdatesQuery>,
) -> Result<Json<Vec<InvestmentUpdateDto>>, AppError> {
    let date_from = match params.date_from.as_deref() {
        Some(raw) => Some(
            parse_date(raw).map_err(|_| AppError::BadRequest("dateFrom must be YYYY-MM-DD".into()))?,
        ),
        None => None,
    };

    let owned: Vec<InvestmentId> = state
        .services
        .investments
        .find_records_by_user_id(&user.id)
        .await?
        .into_iter()
        .map(|r| r.id)
        .collect();

    let investment_ids = match params.investment_id.as_deref() {
        Some(raw) => {
            let mut requested = HashSet::new();
            for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
                requested.insert(parse_investment_id(part)?);
            }
            owned
                .into_iter()
                .filter(|id| requested.contains(id))
                .collect()
        }
        None => owned,
    };

    let updates = state
        .services
        .updates
        .find(&FindInvestmentUpdateQuery::new(investment_ids, date_from))
        .await?;

    Ok(Json(updates.iter().map(InvestmentUpdateDto::from).collect()))
}

pub async fn delete_update(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id = UpdateId::from_str(&id)
        .map_err(|_| AppError::BadRequest("Invalid investment update id".into()))?;
    let update = state.services.updates.find_by_id(id).await?;
    owned_investment(&state, &user, update.investment_id).await?;

    state.services.updates.delete_by_id(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Import updates from a CSV request body.
pub async fn import_updates(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<ImportResponse>, AppError> {
    let id = parse_investment_id(&id)?;
    owned_investment(&state, &user, id).await?;

    let imported = state.csv.import(id, &body).await?;
    Ok(Json(ImportResponse { imported }))
}

/// Export the investment's updates as a CSV attachment.
pub async fn export_updates(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let id = parse_investment_id(&id)?;
    let investment = owned_investment(&state, &user, id).await?;

    let export = state.csv.export(&investment).await?;
    let disposition = format!("attachment; filename=\"{}\"", export.filename);

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        export.body,
    )
        .into_response())
}
