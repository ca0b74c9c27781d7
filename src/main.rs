use std::sync::Arc;

use anyhow::Context;
use env_logger::Env;

use portal_server::config::Config;
use portal_server::storage::{MemoryStorage, PgStorage, Storage};
use portal_server::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load()?;
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let storage: Arc<dyn Storage> = match &config.database_url {
        Some(url) => {
            log::info!("Using PostgreSQL storage");
            let pg = PgStorage::connect(url)
                .await
                .context("failed to connect to the database")?;
            pg.migrate().await.context("failed to create tables")?;
            Arc::new(pg)
        }
        None => {
            log::info!("Using in-memory storage");
            Arc::new(MemoryStorage::new())
        }
    };

    let seeded = storage
        .seed_initial_data()
        .await
        .context("failed to seed initial data")?;
    if !seeded {
        log::info!("Existing data found, skipping seed");
    }

    if config.openai_api_key.is_none() {
        log::warn!("OPENAI_API_KEY is not set, /api/chat will answer with errors");
    }

    let app = portal_server::app(AppState::from_config(storage, &config));

    let addr = config.addr();
    log::info!("Starting Portal HTTP Server on http://{}", addr);
    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await?;
    Ok(())
}
