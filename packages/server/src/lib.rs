#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for anonymous crime reporting.
//!
//! Serves the REST API used by the reporting frontend: report submission
//! and lookup (including proximity search), photo triage through a
//! multimodal model, and free-text safety advice. Reports are stored in
//! `PostGIS` or `SQLite` depending on `DATABASE_URL`; the AI provider is
//! chosen from `AI_PROVIDER` or whichever API key is present.

pub mod config;
pub mod error;
mod handlers;
pub mod rate_limit;

use std::sync::Arc;
use std::time::Duration;

use actix_cors::Cors;
use actix_web::middleware::{self, DefaultHeaders};
use actix_web::{App, HttpServer, web};
use crime_report_ai::providers::{LlmProvider, create_provider_from_env};
use crime_report_database::{ReportStore, connect_from_env};

use crate::config::ServerConfig;
use crate::rate_limit::RateLimiter;

/// Upper bound on JSON request bodies. Reports may carry the photo as a
/// base64 data URL, so this sits above the encoded size of a 5 MB image.
pub const JSON_BODY_LIMIT: usize = 8 * 1024 * 1024;

/// Shared application state.
pub struct AppState {
    /// Report store.
    pub store: ReportStore,
    /// Model used for triage and advice. `None` when no credentials are
    /// configured; the AI endpoints then answer with an upstream error.
    pub ai: Option<Arc<dyn LlmProvider>>,
    /// Deployment environment reported by the health check.
    pub environment: String,
}

/// Registers the `/api` routes.
///
/// `/reports/nearby` is registered before `/reports/{id}` so it isn't
/// captured as an id.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .limit(JSON_BODY_LIMIT)
            .error_handler(error::json_error_handler),
    )
    .service(
        web::scope("/api")
            .wrap(middleware::from_fn(rate_limit::limit_requests))
            .route("/health", web::get().to(handlers::health))
            .route("/reports", web::post().to(handlers::create_report))
            .route("/reports", web::get().to(handlers::list_reports))
            .route("/reports/nearby", web::get().to(handlers::nearby_reports))
            .route("/reports/{id}", web::get().to(handlers::get_report))
            .route("/upload", web::post().to(handlers::upload_image))
            .route("/safety-tips/ai", web::post().to(handlers::safety_tip)),
    )
    .default_service(web::to(handlers::not_found));
}

/// Headers added to every response.
#[must_use]
pub fn security_headers() -> DefaultHeaders {
    DefaultHeaders::new()
        .add(("X-Content-Type-Options", "nosniff"))
        .add(("X-Frame-Options", "SAMEORIGIN"))
        .add(("Referrer-Policy", "no-referrer"))
        .add(("X-DNS-Prefetch-Control", "off"))
}

/// Starts the crime report API server.
///
/// Opens the report store named by `DATABASE_URL` (running migrations or
/// creating the `SQLite` schema), builds the AI provider, and starts the
/// Actix-Web HTTP server. The caller provides the async runtime (e.g. via
/// `#[actix_web::main]`).
///
/// # Errors
///
/// Returns an `std::io::Result` error if the HTTP server fails to bind or
/// encounters a runtime error.
///
/// # Panics
///
/// Panics if the report store cannot be opened.
#[allow(clippy::future_not_send)]
pub async fn run_server() -> std::io::Result<()> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    let config = ServerConfig::from_env();

    log::info!("Connecting to report store...");
    let store = connect_from_env()
        .await
        .expect("Failed to open report store");
    log::info!("Report store ready ({:?} backend)", store.backend());

    let ai: Option<Arc<dyn LlmProvider>> = match create_provider_from_env() {
        Ok(provider) => {
            log::info!("AI provider ready (model: {})", provider.model());
            Some(Arc::from(provider))
        }
        Err(e) => {
            log::warn!("AI features disabled: {e}");
            None
        }
    };

    let state = web::Data::new(AppState {
        store,
        ai,
        environment: config.environment.clone(),
    });

    let limiter = web::Data::new(RateLimiter::new(config.rate_limit));
    {
        let limiter = limiter.clone();
        let window = config.rate_limit.window.max(Duration::from_secs(1));
        actix_web::rt::spawn(async move {
            let mut interval = actix_web::rt::time::interval(window);
            loop {
                interval.tick().await;
                limiter.prune();
            }
        });
    }

    log::info!(
        "Starting server on {}:{} in {} mode",
        config.bind_addr,
        config.port,
        config.environment
    );

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(error::error_handlers())
            .wrap(security_headers())
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .app_data(limiter.clone())
            .configure(configure)
    })
    .bind((config.bind_addr, config.port))?
    .run()
    .await
}
