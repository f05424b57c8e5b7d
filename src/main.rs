use actix_web::{middleware::Logger, web, App, HttpServer};
use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use plant_disease_backend::config::Config;
use plant_disease_backend::{configure, cors, AppState};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env().context("invalid configuration")?;
    std::fs::create_dir_all(&config.uploads.dir).with_context(|| {
        format!(
            "could not create upload directory {}",
            config.uploads.dir.display()
        )
    })?;

    let state = web::Data::new(AppState::from_config(&config)?);
    info!(model = state.inference.url(), "using hosted model");

    let addr = (config.bind_addr.clone(), config.port);
    info!("Server running on http://{}:{}", addr.0, addr.1);

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(cors())
            .wrap(Logger::default())
            .configure(configure)
    })
    .bind(addr)?
    .run()
    .await?;

    Ok(())
}
