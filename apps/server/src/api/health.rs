//! Liveness and readiness probes.

use actix_web::{HttpResponse, get, web};
use chrono::Utc;
use serde::Serialize;
use tracing::warn;
use utoipa::ToSchema;

use crate::error::ErrorResponse;
use crate::services::BuildResults;

/// Process liveness.
#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
    /// RFC 3339 time of the check
    checked_at: String,
}

/// Artifact store reachability.
#[derive(Serialize, ToSchema)]
pub struct ReadyResponse {
    status: &'static str,
    /// Directory listed to check the store
    listed: String,
    cache_enabled: bool,
}

/// Answers as long as the process serves requests. Touches no storage.
#[utoipa::path(
    get,
    path = "/api/v1/health",
    tag = "Health",
    responses(
        (status = 200, description = "Process is up", body = HealthResponse)
    )
)]
#[get("/health")]
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        checked_at: Utc::now().to_rfc3339(),
    })
}

/// Lists the PR prefix; any storage failure or timeout reports 503.
#[utoipa::path(
    get,
    path = "/api/v1/ready",
    tag = "Health",
    responses(
        (status = 200, description = "Artifact store answered", body = ReadyResponse),
        (status = 503, description = "Artifact store unreachable", body = ErrorResponse)
    )
)]
#[get("/ready")]
pub async fn ready(results: web::Data<BuildResults>) -> HttpResponse {
    let listed = results.pr_settings().pull_prefix.clone();
    match results.store().list(&listed).await {
        Ok(_) => HttpResponse::Ok().json(ReadyResponse {
            status: "ready",
            listed,
            cache_enabled: results.cache_enabled(),
        }),
        Err(e) => {
            warn!(prefix = %listed, error = %e, "Artifact store not reachable");
            HttpResponse::ServiceUnavailable().json(ErrorResponse {
                error: "NOT_READY".to_string(),
                message: e.to_string(),
            })
        }
    }
}

pub fn configure_health_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(health).service(ready);
}
