//! OpenAPI documentation configuration.

use utoipa::OpenApi;

use crate::{api, error, models, services};

/// OpenAPI documentation.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Buildlens Server",
        version = "0.1.0",
        description = "Read-only API aggregating CI build results (markers, JUnit reports, logs) from artifact storage"
    ),
    servers(
        (url = "/", description = "Local server")
    ),
    paths(
        // Health endpoints
        api::health::health,
        api::health::ready,
        // Build endpoints
        api::builds::get_build,
        api::builds::list_builds,
        api::builds::list_jobs,
        // Pull request endpoints
        api::pr::get_pr,
    ),
    components(
        schemas(
            // Common
            error::ErrorResponse,
            // Health
            api::health::HealthResponse,
            api::health::ReadyResponse,
            // Builds
            api::builds::BuildListResponse,
            api::builds::JobListResponse,
            services::storage::ListEntry,
            models::BuildRecord,
            models::BuildDetails,
            models::BuildView,
            models::BuildLog,
            models::PullRef,
            // Test results
            models::SuiteResult,
            models::FailedTest,
            models::TestStatus,
            // Pull requests
            models::PrInfo,
            models::PrView,
            models::PrTable,
            models::PrRow,
            models::JobHistory,
        )
    ),
    tags(
        (name = "Health", description = "Service health checks"),
        (name = "Builds", description = "Build results, build lists and jobs"),
        (name = "Pull Requests", description = "Per-PR build tables"),
    )
)]
pub struct ApiDoc;
