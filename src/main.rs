// src/main.rs
use actix_web::{App, HttpServer, middleware, web};
use agrovision::AppState;
use agrovision::catalog::ProductCatalog;
use agrovision::config::Settings;
use agrovision::handlers::configure_routes;
use anyhow::Context;
use log::info;
use std::sync::Arc;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    info!("Starting agricultural vision service...");

    let settings = Arc::new(Settings::from_env().context("Invalid service configuration")?);
    let catalog = Arc::new(ProductCatalog::load(settings.catalog_path.as_deref())?);
    info!("Supported products: {:?}", catalog.supported_products());

    let app_state = AppState::new(settings.clone(), catalog);

    let max_payload_bytes = settings.max_payload_bytes;
    let (host, port) = settings.bind_address();
    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .wrap(middleware::Logger::default())
            .configure(|cfg| configure_routes(cfg, max_payload_bytes))
    })
    .bind((host, port))
    .with_context(|| format!("Failed to bind {}:{}", settings.host, settings.port))?
    .run()
    .await?;

    Ok(())
}
