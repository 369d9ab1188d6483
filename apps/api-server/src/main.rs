//! # Quill API Server
//!
//! The main entry point for the Actix-web HTTP server.

use actix_cors::Cors;
use actix_web::{App, HttpServer, web};
use tracing_actix_web::TracingLogger;

mod config;
mod handlers;
mod middleware;
mod observability;
mod state;
mod telemetry;

use config::AppConfig;
use observability::RequestIdMiddleware;
use state::AppState;
use telemetry::TelemetryConfig;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    telemetry::init_telemetry(&TelemetryConfig::from_env());

    // Refuse to start on missing or broken configuration
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            std::process::exit(1);
        }
    };
    let state = match AppState::new(&config) {
        Ok(state) => state,
        Err(e) => {
            tracing::error!(error = %e, "Failed to initialize backend");
            std::process::exit(1);
        }
    };

    tracing::info!(
        "Starting Quill API Server on {}:{}",
        config.host,
        config.port
    );

    let cors_origins = config.cors_allowed_origins.clone();
    HttpServer::new(move || {
        App::new()
            .wrap(cors(cors_origins.as_deref()))
            .wrap(RequestIdMiddleware)
            .wrap(TracingLogger::default())
            .app_data(web::Data::new(state.clone()))
            .configure(handlers::configure_routes)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}

/// Any origin, method and header unless an allow-list is configured.
fn cors(allowed_origins: Option<&[String]>) -> Cors {
    match allowed_origins {
        None => Cors::permissive(),
        Some(origins) => origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
            .allow_any_method()
            .allow_any_header()
            .supports_credentials()
            .expose_headers([observability::REQUEST_ID_HEADER, handlers::NEXT_CURSOR_HEADER])
            .max_age(3600),
    }
}
