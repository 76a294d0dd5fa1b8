//! API endpoint modules.

pub mod builds;
pub mod health;
pub mod openapi;
pub mod pr;

pub use builds::configure_routes as configure_build_routes;
pub use health::configure_health_routes;
pub use openapi::ApiDoc;
pub use pr::configure_routes as configure_pr_routes;

use actix_web::web;

/// Mount every JSON endpoint under `/api/v1`.
pub fn configure_api(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .configure(configure_health_routes)
            .configure(configure_build_routes)
            .configure(configure_pr_routes),
    );
}
