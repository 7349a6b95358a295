pub mod auth;
pub mod billing;
pub mod dto;
pub mod health;
pub mod investments;
pub mod settings;
pub mod updates;
pub mod users;

use crate::config::Config;
use crate::services::{DemoUserFactory, InvestmentUpdateCsv, Services};
use axum::{
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

#[derive(Debug, Clone)]
pub struct AppState {
    pub services: Services,
    pub csv: Arc<InvestmentUpdateCsv>,
    pub demo: Arc<DemoUserFactory>,
    pub config: Config,
}

impl AppState {
    pub fn new(services: Services, config: Config) -> Self {
        let csv = Arc::new(InvestmentUpdateCsv::new(services.updates.clone()));
        let demo = Arc::new(DemoUserFactory::new(
            services.users.clone(),
            services.investments.clone(),
        ));
        Self {
            services,
            csv,
            demo,
            config,
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/v1/user", get(users::get_user))
        .route("/v1/demo", post(users::create_demo_user))
        .route(
            "/v1/settings",
            get(settings::get_settings).put(settings::put_settings),
        )
        .route(
            "/v1/investments",
            get(investments::list_investments).post(investments::create_investment),
        )
        .route(
            "/v1/investments/:id",
            get(investments::get_investment).delete(investments::delete_investment),
        )
        .route("/v1/investments/:id/updates", post(updates::create_update))
        .route(
            "/v1/investments/:id/updates/import",
            post(updates::import_updates),
        )
        .route(
            "/v1/investments/:id/updates/export",
            get(updates::export_updates),
        )
        .route("/v1/investment-updates", get(updates::find_updates))
        .route("/v1/investment-updates/:id", delete(updates::delete_update))
        .route("/v1/billing/webhook", post(billing::webhook))
        .layer(cors)
        .with_state(state)
}
