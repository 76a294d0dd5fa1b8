//! Buildlens server - Main entry point.
//!
//! Starts the Actix-web server with configured routes and middleware.

use actix_cors::Cors;
use actix_web::{App, HttpServer, http::header, web};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use buildlens_lib::api::{self, ApiDoc};
use buildlens_lib::config::Config;
use buildlens_lib::{build_results, middleware};

/// Perform health check (for Docker healthcheck).
fn health_check() -> bool {
    // Simple check - just verify we can load config
    Config::from_env().is_ok()
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Check for --health-check flag (used by Docker HEALTHCHECK)
    if std::env::args().any(|arg| arg == "--health-check") {
        std::process::exit(if health_check() { 0 } else { 1 });
    }

    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");

    // Load configuration
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            error!("");
            error!("Please check your environment variables:");
            error!("  - RUST_ENV must be set to 'development' or 'production'");
            error!("  - In production, S3 credentials or BV_DATA_DIR must be set");
            error!("  - In production, values must not match development defaults");
            std::process::exit(1);
        }
    };

    info!("========================================");
    info!("  Buildlens Server");
    info!("  Environment: {}", config.environment);
    info!("========================================");

    if config.is_development() {
        warn!("Running in DEVELOPMENT mode - do not use in production!");
    }

    let results = match build_results(&config) {
        Ok(results) => web::Data::new(results),
        Err(e) => {
            error!("Failed to initialize artifact storage: {}", e);
            std::process::exit(1);
        }
    };

    let bind_address = config.bind_address();
    let is_development = config.is_development();
    let openapi = ApiDoc::openapi();

    let worker_count = if is_development {
        info!(
            "Starting server at http://{} (4 workers - development mode)",
            bind_address
        );
        4
    } else {
        let cpus = num_cpus::get();
        info!(
            "Starting server at http://{} ({} workers)",
            bind_address, cpus
        );
        cpus
    };

    HttpServer::new(move || {
        let cors = if is_development {
            Cors::default()
                .allowed_origin("http://localhost:3000")
                .allowed_origin("http://127.0.0.1:3000")
                .allowed_methods(vec!["GET", "OPTIONS"])
                .allowed_headers(vec![header::ACCEPT, header::CONTENT_TYPE])
                .max_age(3600)
        } else {
            // Same-origin only
            Cors::default()
                .allowed_methods(vec!["GET", "OPTIONS"])
                .allowed_headers(vec![header::ACCEPT, header::CONTENT_TYPE])
                .max_age(3600)
        };

        App::new()
            .wrap(cors)
            .wrap(middleware::RequestLogger)
            .app_data(results.clone())
            .configure(api::configure_api)
            .service(SwaggerUi::new("/api/docs/{_:.*}").url("/api/openapi.json", openapi.clone()))
    })
    .workers(worker_count)
    .bind(&bind_address)?
    .run()
    .await
}
