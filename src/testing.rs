// src/testing.rs
//! In-process stand-ins for the remote models and the history database.

use crate::cost::{CostBreakdown, TokenUsage, generation_cost};
use crate::errors::{LensError, PersistenceError};
use crate::models::*;
use crate::pipeline::{AnalysisOutcome, Analyzer, GenerationOutcome, Generator};
use crate::services::{HistoryStore, MemoryHistoryStore};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Notify;

pub fn photo() -> EncodedImage {
    EncodedImage::from_bytes("image/jpeg", b"overhead phone shot")
}

pub fn enhanced() -> EncodedImage {
    EncodedImage::from_bytes("image/png", b"magazine cover")
}

pub fn analysis() -> AnalysisResult {
    AnalysisResult {
        dish_name: "小笼包".to_string(),
        critique: "俯拍导致蒸笼变形，光线发灰。".to_string(),
        improvement_strategy: "三十度机位，暖色侧光，保留蒸汽。".to_string(),
        generation_prompt: "Soup dumplings in a bamboo steamer, 30 degree angle, warm side light, visible steam".to_string(),
        literary_text: None,
    }
}

pub fn history_item() -> HistoryItem {
    HistoryItem::new(
        photo(),
        enhanced(),
        analysis(),
        CostBreakdown::new(0.00875, generation_cost(), None),
    )
}

pub enum AnalyzerMode {
    Succeed,
    MissingPrompt,
    Hang,
}

pub struct FakeAnalyzer {
    mode: AnalyzerMode,
    pub calls: AtomicUsize,
    pub entered: Notify,
}

impl FakeAnalyzer {
    pub fn new(mode: AnalyzerMode) -> Self {
        Self {
            mode,
            calls: AtomicUsize::new(0),
            entered: Notify::new(),
        }
    }
}

#[async_trait]
impl Analyzer for FakeAnalyzer {
    async fn analyze(
        &self,
        _image: &EncodedImage,
        want_literary_text: bool,
    ) -> Result<AnalysisOutcome, LensError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.entered.notify_one();

        let result = match self.mode {
            AnalyzerMode::Succeed => {
                let mut result = analysis();
                if want_literary_text {
                    result.literary_text = Some("一笼热气，一天好心情".to_string());
                }
                result
            }
            AnalyzerMode::MissingPrompt => AnalysisResult::parse(
                r#"{"dishName":"小笼包","critique":"偏暗","improvementStrategy":"补光"}"#,
                want_literary_text,
            )?,
            AnalyzerMode::Hang => std::future::pending().await,
        };

        let tokens = TokenUsage {
            prompt_tokens: 1000,
            response_tokens: 500,
        };
        Ok(AnalysisOutcome {
            result,
            cost: tokens.cost(),
            tokens,
        })
    }
}

pub enum GeneratorMode {
    Succeed,
    NoImage,
    Hang,
}

pub struct FakeGenerator {
    mode: GeneratorMode,
    pub calls: AtomicUsize,
    pub entered: Notify,
}

impl FakeGenerator {
    pub fn new(mode: GeneratorMode) -> Self {
        Self {
            mode,
            calls: AtomicUsize::new(0),
            entered: Notify::new(),
        }
    }
}

#[async_trait]
impl Generator for FakeGenerator {
    async fn generate(
        &self,
        _image: &EncodedImage,
        _analysis: &AnalysisResult,
    ) -> Result<GenerationOutcome, LensError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.entered.notify_one();

        match self.mode {
            GeneratorMode::Succeed => Ok(GenerationOutcome {
                image: enhanced(),
                cost: generation_cost(),
            }),
            GeneratorMode::NoImage => Err(LensError::Generation("no image produced".to_string())),
            GeneratorMode::Hang => std::future::pending().await,
        }
    }
}

/// Memory store that counts save attempts and can be told to refuse them.
#[derive(Default)]
pub struct CountingStore {
    inner: MemoryHistoryStore,
    refuse_saves: bool,
    pub saves: AtomicUsize,
}

impl CountingStore {
    pub fn failing() -> Self {
        Self {
            refuse_saves: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl HistoryStore for CountingStore {
    async fn save(&self, item: &HistoryItem) -> Result<(), LensError> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        if self.refuse_saves {
            return Err(PersistenceError::Storage("disk full".to_string()).into());
        }
        self.inner.save(item).await
    }

    async fn list_all(&self) -> Result<Vec<HistoryItem>, LensError> {
        self.inner.list_all().await
    }

    async fn get_by_id(&self, id: &str) -> Result<HistoryItem, LensError> {
        self.inner.get_by_id(id).await
    }

    async fn delete_by_id(&self, id: &str) -> Result<(), LensError> {
        self.inner.delete_by_id(id).await
    }
}
