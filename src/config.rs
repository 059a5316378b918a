// src/config.rs
use crate::errors::LensError;
use std::str::FromStr;

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryBackend {
    Redis,
    Memory,
}

impl FromStr for HistoryBackend {
    type Err = LensError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "redis" => Ok(HistoryBackend::Redis),
            "memory" => Ok(HistoryBackend::Memory),
            other => Err(LensError::Config(format!(
                "GOURMET_HISTORY must be `redis` or `memory`, got `{}`",
                other
            ))),
        }
    }
}

/// Settings for the remote model API.
#[derive(Debug, Clone)]
pub struct GeminiSettings {
    pub api_key: String,
    pub api_base: String,
    pub analysis_model: String,
    pub image_model: String,
    pub thinking_budget: u32,
    pub image_size: String,
    pub aspect_ratio: String,
    /// Language the critique fields are written in.
    pub ui_language: String,
}

impl GeminiSettings {
    pub fn new(api_key: impl Into<String>, api_base: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_base: api_base.into().trim().trim_end_matches('/').to_string(),
            analysis_model: "gemini-3-pro-preview".to_string(),
            image_model: "gemini-3-pro-image-preview".to_string(),
            thinking_budget: 2048,
            image_size: "2K".to_string(),
            aspect_ratio: "1:1".to_string(),
            ui_language: "Simplified Chinese".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub gemini: GeminiSettings,
    pub history_backend: HistoryBackend,
    pub redis_url: String,
    pub bind_addr: String,
    pub max_image_dimension: u32,
    pub skip_key_check: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, LensError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, LensError> {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let api_key = var("GEMINI_API_KEY")
            .or_else(|| var("API_KEY"))
            .ok_or_else(|| LensError::Config("GEMINI_API_KEY must be set".to_string()))?;

        let mut gemini = GeminiSettings::new(
            api_key,
            var("GEMINI_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
        );
        if let Some(model) = var("GOURMET_ANALYSIS_MODEL") {
            gemini.analysis_model = model;
        }
        if let Some(model) = var("GOURMET_IMAGE_MODEL") {
            gemini.image_model = model;
        }
        if let Some(budget) = var("GOURMET_THINKING_BUDGET") {
            gemini.thinking_budget = parse_number("GOURMET_THINKING_BUDGET", &budget)?;
        }
        if let Some(size) = var("GOURMET_IMAGE_SIZE") {
            gemini.image_size = size;
        }
        if let Some(ratio) = var("GOURMET_ASPECT_RATIO") {
            gemini.aspect_ratio = ratio;
        }
        if let Some(language) = var("GOURMET_UI_LANGUAGE") {
            gemini.ui_language = language;
        }

        let history_backend = match var("GOURMET_HISTORY") {
            Some(value) => value.parse()?,
            None => HistoryBackend::Redis,
        };

        let max_image_dimension = match var("GOURMET_MAX_IMAGE_DIMENSION") {
            Some(value) => parse_number("GOURMET_MAX_IMAGE_DIMENSION", &value)?,
            None => 2048,
        };
        if max_image_dimension == 0 {
            return Err(LensError::Config(
                "GOURMET_MAX_IMAGE_DIMENSION must be positive".to_string(),
            ));
        }

        Ok(Self {
            gemini,
            history_backend,
            redis_url: var("REDIS_URL").unwrap_or_else(|| "redis://127.0.0.1:6379".to_string()),
            bind_addr: var("GOURMET_BIND").unwrap_or_else(|| "127.0.0.1:8080".to_string()),
            max_image_dimension,
            skip_key_check: var("GOURMET_SKIP_KEY_CHECK").is_some(),
        })
    }
}

fn parse_number(name: &str, value: &str) -> Result<u32, LensError> {
    value
        .trim()
        .parse()
        .map_err(|_| LensError::Config(format!("{} must be a whole number, got `{}`", name, value)))
}
