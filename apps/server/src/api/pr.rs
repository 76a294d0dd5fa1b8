//! Pull request build table handler.

use actix_web::{HttpResponse, get, web};

use crate::api::builds::path_segments;
use crate::error::{AppError, AppResult};
use crate::services::BuildResults;
use crate::services::pr_builds::{BATCH_PR, org_repo};

/// Whether `pr` names a pull request number or the batch pseudo-PR.
fn is_pr_id(pr: &str) -> bool {
    pr == BATCH_PR || (!pr.is_empty() && pr.bytes().all(|b| b.is_ascii_digit()))
}

/// Build table for a pull request.
///
/// Accepts `/pr/<pr>`, `/pr/<repo>/<pr>` and `/pr/<org>/<repo>/<pr>`, where
/// `<pr>` is a number or `batch`.
#[utoipa::path(
    get,
    path = "/api/v1/pr/{path}",
    tag = "Pull Requests",
    params(
        ("path" = String, Path, description = "`[org/][repo/]<pr>`, e.g. `kubernetes/test-infra/1234` or `batch`")
    ),
    responses(
        (status = 200, description = "Builds of every job for the PR", body = crate::models::PrView),
        (status = 400, description = "Invalid PR path", body = crate::error::ErrorResponse),
        (status = 502, description = "Storage failure", body = crate::error::ErrorResponse),
    )
)]
#[get("/pr/{path:.*}")]
pub async fn get_pr(
    results: web::Data<BuildResults>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let tail = path.into_inner();
    let segments = path_segments(&tail)?;
    let [repo_path @ .., pr] = segments.as_slice() else {
        return Err(AppError::InvalidInput("Expected a PR number".to_string()));
    };
    if repo_path.len() > 2 || !is_pr_id(pr) {
        return Err(AppError::InvalidInput(format!(
            "Expected [org/][repo/]<number|{}>, got '{}'",
            BATCH_PR, tail
        )));
    }

    let settings = results.pr_settings();
    let (org, repo) = org_repo(
        &repo_path.join("/"),
        &settings.default_org,
        &settings.default_repo,
    );

    let view = results.pr_table(&org, &repo, pr).await?;
    Ok(HttpResponse::Ok().json(view))
}

/// Configure PR routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(get_pr);
}
