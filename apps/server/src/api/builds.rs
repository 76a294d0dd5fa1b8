//! Build, build list and job list handlers.
//!
//! Storage paths are passed as trailing path segments, e.g.
//! `GET /api/v1/build/ci-logs/logs/e2e-gce/1234` resolves build `1234` of job
//! `e2e-gce` under `/ci-logs/logs`.

use actix_web::{HttpResponse, get, web};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::error::{AppError, AppResult};
use crate::models::BuildRecord;
use crate::services::BuildResults;
use crate::services::storage::ListEntry;

/// Query parameters of the build endpoint.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BuildQuery {
    /// Present (with any value) to always include the build log.
    pub log: Option<String>,
}

/// Query parameters of the build list endpoint.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BuildListQuery {
    /// Only return builds older than this id.
    pub before: Option<String>,
}

/// Recent builds of a job.
#[derive(Debug, Serialize, ToSchema)]
pub struct BuildListResponse {
    pub job_dir: String,
    pub builds: Vec<BuildRecord>,
    /// Cursor for the next page (`before` value)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_before: Option<String>,
}

/// Jobs under a directory.
#[derive(Debug, Serialize, ToSchema)]
pub struct JobListResponse {
    pub jobs_dir: String,
    pub jobs: Vec<ListEntry>,
}

/// Split a request tail into storage path segments.
pub(crate) fn path_segments(tail: &str) -> AppResult<Vec<&str>> {
    let segments: Vec<&str> = tail.split('/').filter(|s| !s.is_empty()).collect();
    if segments.iter().any(|s| *s == "." || *s == "..") {
        return Err(AppError::InvalidInput(format!(
            "Path '{}' contains relative segments",
            tail
        )));
    }
    if segments.is_empty() {
        return Err(AppError::InvalidInput("Path must not be empty".to_string()));
    }
    Ok(segments)
}

/// Resolve one build with its test results.
///
/// The build log digest is included when requested with `?log`, while the
/// build is running, or when it failed with at most one failed test.
#[utoipa::path(
    get,
    path = "/api/v1/build/{path}",
    tag = "Builds",
    params(
        ("path" = String, Path, description = "Storage prefix, job and build id, e.g. `ci-logs/logs/e2e-gce/1234`"),
        BuildQuery
    ),
    responses(
        (status = 200, description = "Resolved build", body = crate::models::BuildView),
        (status = 400, description = "Invalid path", body = crate::error::ErrorResponse),
        (status = 404, description = "Build not found", body = crate::error::ErrorResponse),
        (status = 502, description = "Storage failure or malformed marker", body = crate::error::ErrorResponse),
    )
)]
#[get("/build/{path:.*}")]
pub async fn get_build(
    results: web::Data<BuildResults>,
    path: web::Path<String>,
    query: web::Query<BuildQuery>,
) -> AppResult<HttpResponse> {
    let tail = path.into_inner();
    let segments = path_segments(&tail)?;
    let [prefix @ .., job, build] = segments.as_slice() else {
        return Err(AppError::InvalidInput(
            "Expected <prefix>/<job>/<build>".to_string(),
        ));
    };
    if prefix.is_empty() {
        return Err(AppError::InvalidInput(
            "Expected <prefix>/<job>/<build>".to_string(),
        ));
    }

    let view = results
        .build_view(&prefix.join("/"), job, build, query.log.is_some())
        .await?;
    Ok(HttpResponse::Ok().json(view))
}

/// List recent builds of a job, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/builds/{path}",
    tag = "Builds",
    params(
        ("path" = String, Path, description = "Job directory, e.g. `ci-logs/logs/e2e-gce`"),
        BuildListQuery
    ),
    responses(
        (status = 200, description = "Builds of the job", body = BuildListResponse),
        (status = 400, description = "Invalid path", body = crate::error::ErrorResponse),
        (status = 502, description = "Storage failure", body = crate::error::ErrorResponse),
    )
)]
#[get("/builds/{path:.*}")]
pub async fn list_builds(
    results: web::Data<BuildResults>,
    path: web::Path<String>,
    query: web::Query<BuildListQuery>,
) -> AppResult<HttpResponse> {
    let tail = path.into_inner();
    let job_dir = format!("/{}", path_segments(&tail)?.join("/"));
    let before = query.before.as_deref().filter(|b| !b.is_empty());

    let builds = results.build_list(&job_dir, before).await?;
    let next_before = builds.last().map(|b| b.id.clone());

    Ok(HttpResponse::Ok().json(BuildListResponse {
        job_dir,
        builds,
        next_before,
    }))
}

/// List job directories under a path.
#[utoipa::path(
    get,
    path = "/api/v1/jobs/{path}",
    tag = "Builds",
    params(
        ("path" = String, Path, description = "Directory holding job directories, e.g. `ci-logs/logs`")
    ),
    responses(
        (status = 200, description = "Jobs sorted by path", body = JobListResponse),
        (status = 400, description = "Invalid path", body = crate::error::ErrorResponse),
        (status = 502, description = "Storage failure", body = crate::error::ErrorResponse),
    )
)]
#[get("/jobs/{path:.*}")]
pub async fn list_jobs(
    results: web::Data<BuildResults>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let tail = path.into_inner();
    let jobs_dir = format!("/{}", path_segments(&tail)?.join("/"));
    let jobs = results.job_list(&jobs_dir).await?;
    Ok(HttpResponse::Ok().json(JobListResponse { jobs_dir, jobs }))
}

/// Configure build routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(get_build)
        .service(list_builds)
        .service(list_jobs);
}
