// src/main.rs
use actix_web::{App, HttpServer, middleware, web};
use anyhow::Context;
use log::{info, warn};
use std::sync::Arc;

mod config;
mod cost;
mod errors;
mod handlers;
mod models;
mod pipeline;
mod services;
#[cfg(test)]
mod testing;

use crate::config::{Config, HistoryBackend};
use crate::pipeline::Pipeline;
use crate::services::{
    GeminiService, HistoryStore, ImageIngestor, MemoryHistoryStore, RedisHistoryStore,
};

#[derive(Clone)]
pub struct AppState {
    pipeline: Arc<Pipeline>,
    ingestor: Arc<ImageIngestor>,
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    info!("Starting Gourmet Lens...");

    let config = Config::from_env().context("invalid configuration")?;

    // Initialize services
    let gemini = Arc::new(GeminiService::new(config.gemini.clone()));
    if config.skip_key_check {
        warn!("Skipping API key confirmation");
    } else {
        gemini
            .verify_key()
            .await
            .context("could not confirm the API key")?;
        info!("API key confirmed for {}", config.gemini.analysis_model);
    }

    let history: Arc<dyn HistoryStore> = match config.history_backend {
        HistoryBackend::Redis => Arc::new(
            RedisHistoryStore::new(&config.redis_url)
                .await
                .with_context(|| format!("could not open history at {}", config.redis_url))?,
        ),
        HistoryBackend::Memory => {
            warn!("History is kept in memory and will be lost on exit");
            Arc::new(MemoryHistoryStore::new())
        }
    };

    let pipeline = Arc::new(Pipeline::new(gemini.clone(), gemini, history));
    match pipeline.refresh_history().await {
        Ok(items) => info!("Loaded {} history items", items.len()),
        Err(e) => warn!("Failed to load history: {}", e),
    }

    let app_state = AppState {
        pipeline,
        ingestor: Arc::new(ImageIngestor::new(config.max_image_dimension)),
    };

    info!("Starting HTTP server on {}", config.bind_addr);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().limit(32 * 1024 * 1024))
            .wrap(middleware::Logger::default())
            .configure(handlers::routes)
    })
    .bind(&config.bind_addr)?
    .run()
    .await?;

    Ok(())
}
