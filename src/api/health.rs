use actix_web::{web, HttpResponse, Responder};
use serde::{Deserialize, Serialize};

use crate::state::AppState;

#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    /// MongoDB answered `ping`
    pub database: bool,
    pub timestamp: i64,
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is up; `database` tells whether MongoDB answers", body = HealthResponse)
    )
)]
pub async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let database = state.users.ping().await;
    if !database {
        log::warn!("⚠️  Health check: database unreachable");
    }

    HttpResponse::Ok().json(HealthResponse {
        status: if database { "healthy" } else { "degraded" }.to_string(),
        service: "contacts-service".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database,
        timestamp: chrono::Utc::now().timestamp(),
    })
}
