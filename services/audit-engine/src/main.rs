use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use anyhow::Context;
use audit_engine::{
    config::Config,
    controls::ControlEvaluator,
    database::Database,
    handlers, metrics,
    sanctions::{SanctionsReconciler, SanctionsScraper, ScrapeSettings, WebDriverBrowser},
    screening::MatchClient,
    store::AuditStore,
};
use dotenv::dotenv;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("audit_engine=info,actix_web=info")),
        )
        .with_target(false)
        .json()
        .init();

    info!("Starting Audit Engine...");

    let config = Config::from_env().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    info!("Configuration loaded successfully");

    let db = Arc::new(
        Database::new(
            &config.database.url,
            config.database.max_connections,
            Duration::from_secs(config.database.acquire_timeout_secs),
        )
        .await
        .context("Failed to create database pool")?,
    );

    if let Err(e) = db.health_check().await {
        warn!("Database health check failed at startup: {}", e);
    } else {
        info!("Database connected successfully");
    }

    metrics::register_metrics(&metrics::REGISTRY).context("Failed to register metrics")?;

    let store: Arc<dyn AuditStore> = db.clone();
    let evaluator = Arc::new(ControlEvaluator::new(store.clone()));

    let browser = Arc::new(WebDriverBrowser::new(&config.scraper));
    let scraper = Arc::new(SanctionsScraper::new(
        browser,
        ScrapeSettings::from(&config.scraper),
    ));
    let reconciler = Arc::new(SanctionsReconciler::new(store, scraper.clone()));

    if config.screening.api_key.is_empty() {
        warn!("No screening API key configured; match requests will be rejected upstream");
    }
    let match_client = Arc::new(
        MatchClient::new(&config.screening).context("Failed to build screening client")?,
    );

    info!("Audit components initialized");

    let server = config.server.clone();
    info!("Starting HTTP server on {}:{}", server.host, server.port);

    HttpServer::new(move || {
        let cors = server
            .allowed_origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
            .allow_any_method()
            .allow_any_header()
            .supports_credentials()
            .max_age(3600);

        App::new()
            .wrap(cors)
            .wrap(Logger::default())
            .app_data(web::Data::new(db.clone()))
            .app_data(web::Data::new(evaluator.clone()))
            .app_data(web::Data::new(scraper.clone()))
            .app_data(web::Data::new(reconciler.clone()))
            .app_data(web::Data::new(match_client.clone()))
            .configure(handlers::configure_routes)
    })
    .workers(config.server.workers)
    .bind((config.server.host.clone(), config.server.port))?
    .run()
    .await?;

    Ok(())
}
