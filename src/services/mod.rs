// src/services/mod.rs
pub mod gemini_service;
pub mod history_store;
pub mod ingestion;

pub use gemini_service::GeminiService;
pub use history_store::{HistoryStore, MemoryHistoryStore, RedisHistoryStore};
pub use ingestion::ImageIngestor;
