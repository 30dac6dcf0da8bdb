use crate::config::Config;
use crate::db::{count_listings, init_db, reload_from_files};
use crate::responses::html_error_response;
use crate::router::{handle, AppState};
use anyhow::{Context, Result};
use astra::Server;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod analysis;
mod cache;
mod config;
mod db;
mod domain;
mod errors;
mod responses;
mod router;
mod spreadsheets;
mod templates;


fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,car_market_compare=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!(?config, "configuration loaded");

    if let Some(dir) = std::path::Path::new(&config.database_path).parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir).context("Failed to create database directory")?;
        }
    }

    let state = AppState::new(&config);
    init_db(&state.db, &config.schema_path).context("Database initialization failed")?;

    // First start: populate the store from the scraper output files.
    let stored = count_listings(&state.db).context("Failed to count stored listings")?;
    if stored == 0 {
        tracing::info!("listing store is empty, importing raw data files");
        reload_from_files(&state.db, config.raw_data_files.as_slice())
            .context("Initial import failed")?;
    } else {
        tracing::info!(stored, "using existing listing store");
    }

    tracing::info!(addr = %config.bind_addr, "starting server");
    let server = Server::bind(&config.bind_addr).max_workers(config.max_workers);

    server
        .serve(move |req, _info| match handle(req, &state) {
            Ok(resp) => resp,
            Err(err) => html_error_response(err),
        })
        .context("Server ended with error")?;

    tracing::info!("server shut down cleanly");
    Ok(())
}
