// src/pipeline.rs
//! Analyze → generate orchestration.
//!
//! The session is an immutable `PipelineSnapshot`; every transition builds a
//! new one and swaps it in. Each run gets a run number and an abort handle.
//! `reset` bumps the number and fires the handle, so an in-flight stage is
//! dropped and anything that still reaches a commit point for an old run
//! number is thrown away.

use crate::cost::{CostBreakdown, TokenUsage};
use crate::errors::LensError;
use crate::models::*;
use crate::services::HistoryStore;
use async_trait::async_trait;
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{Mutex, watch};

#[derive(Debug)]
pub struct AnalysisOutcome {
    pub result: AnalysisResult,
    pub cost: f64,
    pub tokens: TokenUsage,
}

#[derive(Debug)]
pub struct GenerationOutcome {
    pub image: EncodedImage,
    pub cost: f64,
}

#[async_trait]
pub trait Analyzer: Send + Sync {
    async fn analyze(
        &self,
        image: &EncodedImage,
        want_literary_text: bool,
    ) -> Result<AnalysisOutcome, LensError>;
}

#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(
        &self,
        image: &EncodedImage,
        analysis: &AnalysisResult,
    ) -> Result<GenerationOutcome, LensError>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PipelinePhase {
    #[default]
    Idle,
    Analyzing,
    Generating,
    Complete,
    Error,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunOptions {
    #[serde(default)]
    pub literary_text: bool,
}

/// What the presentation layer sees. In `Idle` the original image, when
/// present, is the staged preview.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineSnapshot {
    pub phase: PipelinePhase,
    pub original_image: Option<EncodedImage>,
    pub enhanced_image: Option<EncodedImage>,
    pub analysis: Option<AnalysisResult>,
    pub cost: Option<CostBreakdown>,
    pub error: Option<String>,
}

impl PipelineSnapshot {
    fn require(&self, allowed: &[PipelinePhase], action: &str) -> Result<(), LensError> {
        if allowed.contains(&self.phase) {
            Ok(())
        } else {
            Err(LensError::InvalidState(format!(
                "cannot {} while {:?}",
                action, self.phase
            )))
        }
    }

    pub fn stage(self, image: EncodedImage) -> Result<Self, LensError> {
        self.require(&[PipelinePhase::Idle], "stage an image")?;
        Ok(Self {
            original_image: Some(image),
            ..Self::default()
        })
    }

    pub fn begin(self, image: EncodedImage) -> Result<Self, LensError> {
        self.require(&[PipelinePhase::Idle], "start a run")?;
        Ok(Self {
            phase: PipelinePhase::Analyzing,
            original_image: Some(image),
            ..Self::default()
        })
    }

    pub fn analyzed(self, analysis: AnalysisResult) -> Result<Self, LensError> {
        self.require(&[PipelinePhase::Analyzing], "record an analysis")?;
        Ok(Self {
            phase: PipelinePhase::Generating,
            analysis: Some(analysis),
            ..self
        })
    }

    pub fn completed(self, enhanced: EncodedImage, cost: CostBreakdown) -> Result<Self, LensError> {
        self.require(&[PipelinePhase::Generating], "complete a run")?;
        Ok(Self {
            phase: PipelinePhase::Complete,
            enhanced_image: Some(enhanced),
            cost: Some(cost),
            ..self
        })
    }

    pub fn failed(self, message: impl Into<String>) -> Result<Self, LensError> {
        self.require(
            &[PipelinePhase::Analyzing, PipelinePhase::Generating],
            "fail a run",
        )?;
        Ok(Self {
            phase: PipelinePhase::Error,
            error: Some(message.into()),
            ..self
        })
    }

    pub fn opened(self, item: HistoryItem) -> Result<Self, LensError> {
        self.require(
            &[
                PipelinePhase::Idle,
                PipelinePhase::Complete,
                PipelinePhase::Error,
            ],
            "open a history item",
        )?;
        Ok(Self {
            phase: PipelinePhase::Complete,
            original_image: Some(item.original_image),
            enhanced_image: Some(item.enhanced_image),
            analysis: Some(item.analysis),
            cost: Some(item.cost),
            error: None,
        })
    }
}

/// An accepted run that has not been driven yet.
pub struct RunTicket {
    run: u64,
    image: EncodedImage,
    options: RunOptions,
    abort: watch::Receiver<bool>,
}

struct Session {
    snapshot: Arc<PipelineSnapshot>,
    run: u64,
    abort: Option<watch::Sender<bool>>,
    history: Arc<Vec<HistoryItem>>,
}

pub struct Pipeline {
    analyzer: Arc<dyn Analyzer>,
    generator: Arc<dyn Generator>,
    history: Arc<dyn HistoryStore>,
    session: Mutex<Session>,
}

impl Pipeline {
    pub fn new(
        analyzer: Arc<dyn Analyzer>,
        generator: Arc<dyn Generator>,
        history: Arc<dyn HistoryStore>,
    ) -> Self {
        Self {
            analyzer,
            generator,
            history,
            session: Mutex::new(Session {
                snapshot: Arc::new(PipelineSnapshot::default()),
                run: 0,
                abort: None,
                history: Arc::new(Vec::new()),
            }),
        }
    }

    pub async fn snapshot(&self) -> Arc<PipelineSnapshot> {
        self.session.lock().await.snapshot.clone()
    }

    /// The history list as of the last refresh.
    #[cfg(test)]
    pub async fn history(&self) -> Arc<Vec<HistoryItem>> {
        self.session.lock().await.history.clone()
    }

    pub async fn stage(&self, image: EncodedImage) -> Result<Arc<PipelineSnapshot>, LensError> {
        let mut session = self.session.lock().await;
        let next = Arc::new(session.snapshot.as_ref().clone().stage(image)?);
        session.snapshot = next.clone();
        Ok(next)
    }

    /// Accepts a run and drives it on a background task. Returns the
    /// `Analyzing` snapshot; progress is read back through `snapshot`.
    pub async fn start(
        self: &Arc<Self>,
        image: EncodedImage,
        options: RunOptions,
    ) -> Result<Arc<PipelineSnapshot>, LensError> {
        let ticket = self.begin(image, options).await?;
        let run = ticket.run;
        let accepted = self.snapshot().await;

        let pipeline = self.clone();
        tokio::spawn(async move {
            if let Err(e) = pipeline.drive(ticket).await {
                warn!("Run {} ended without a result: {}", run, e);
            }
        });

        Ok(accepted)
    }

    /// Moves `Idle` to `Analyzing` and hands back the run to drive. Rejected
    /// in every other phase, so two runs can never interleave.
    pub async fn begin(&self, image: EncodedImage, options: RunOptions) -> Result<RunTicket, LensError> {
        let mut session = self.session.lock().await;
        let next = session.snapshot.as_ref().clone().begin(image.clone())?;

        session.run += 1;
        let (abort_tx, abort_rx) = watch::channel(false);
        session.abort = Some(abort_tx);
        session.snapshot = Arc::new(next);

        info!("Run {} started", session.run);
        Ok(RunTicket {
            run: session.run,
            image,
            options,
            abort: abort_rx,
        })
    }

    pub async fn drive(&self, ticket: RunTicket) -> Result<Arc<PipelineSnapshot>, LensError> {
        let RunTicket {
            run,
            image,
            options,
            abort,
        } = ticket;

        let analysis = tokio::select! {
            outcome = self.analyzer.analyze(&image, options.literary_text) => outcome,
            _ = aborted(abort.clone()) => return Err(discarded(run, "analysis")),
        };
        let analysis = match analysis {
            Ok(outcome) => outcome,
            Err(e) => return Err(self.fail(run, e).await),
        };

        self.commit(run, |s| s.analyzed(analysis.result.clone()))
            .await?;
        info!("Run {} generating", run);

        let generation = tokio::select! {
            outcome = self.generator.generate(&image, &analysis.result) => outcome,
            _ = aborted(abort.clone()) => return Err(discarded(run, "generation")),
        };
        let generation = match generation {
            Ok(outcome) => outcome,
            Err(e) => return Err(self.fail(run, e).await),
        };

        let cost = CostBreakdown::new(analysis.cost, generation.cost, Some(analysis.tokens));
        let item = HistoryItem::new(
            image,
            generation.image.clone(),
            analysis.result,
            cost.clone(),
        );

        // Nothing is persisted for a run that was reset while generating.
        self.ensure_current(run).await?;
        if let Err(e) = self.history.save(&item).await {
            error!("Run {} could not be saved to history: {}", run, e);
            self.commit(run, |s| {
                s.failed(format!(
                    "The enhanced image was generated but could not be saved: {}",
                    e
                ))
            })
            .await?;
            return Err(e);
        }

        let snapshot = self
            .commit(run, |s| s.completed(generation.image, cost))
            .await?;
        let tokens = item.cost.token_usage().unwrap_or_default();
        info!(
            "Run {} complete as history item {} (${:.4}: analysis ${:.4} for {}+{} tokens, generation ${:.4})",
            run,
            item.id,
            item.cost.total_cost(),
            item.cost.analysis_cost(),
            tokens.prompt_tokens,
            tokens.response_tokens,
            item.cost.generation_cost()
        );

        if let Err(e) = self.refresh_history().await {
            warn!("History refresh after run {} failed: {}", run, e);
        }

        Ok(snapshot)
    }

    /// Back to an empty `Idle`. Any in-flight run is abandoned.
    pub async fn reset(&self) -> Arc<PipelineSnapshot> {
        let mut session = self.session.lock().await;
        session.run += 1;
        if let Some(abort) = session.abort.take() {
            let _ = abort.send(true);
        }
        session.snapshot = Arc::new(PipelineSnapshot::default());
        session.snapshot.clone()
    }

    pub async fn refresh_history(&self) -> Result<Arc<Vec<HistoryItem>>, LensError> {
        let items = Arc::new(self.history.list_all().await?);
        self.session.lock().await.history = items.clone();
        Ok(items)
    }

    pub async fn open_history(&self, id: &str) -> Result<Arc<PipelineSnapshot>, LensError> {
        let item = self.history.get_by_id(id).await?;

        let mut session = self.session.lock().await;
        let next = Arc::new(session.snapshot.as_ref().clone().opened(item)?);
        session.snapshot = next.clone();
        Ok(next)
    }

    pub async fn delete_history(&self, id: &str) -> Result<Arc<Vec<HistoryItem>>, LensError> {
        self.history.delete_by_id(id).await?;
        info!("Deleted history item {}", id);
        self.refresh_history().await
    }

    async fn ensure_current(&self, run: u64) -> Result<(), LensError> {
        if self.session.lock().await.run == run {
            Ok(())
        } else {
            Err(discarded(run, "generation"))
        }
    }

    async fn commit(
        &self,
        run: u64,
        apply: impl FnOnce(PipelineSnapshot) -> Result<PipelineSnapshot, LensError>,
    ) -> Result<Arc<PipelineSnapshot>, LensError> {
        let mut session = self.session.lock().await;
        if session.run != run {
            return Err(discarded(run, "a stage"));
        }

        let next = Arc::new(apply(session.snapshot.as_ref().clone())?);
        if matches!(next.phase, PipelinePhase::Complete | PipelinePhase::Error) {
            session.abort = None;
        }
        session.snapshot = next.clone();
        Ok(next)
    }

    /// Records a stage failure and hands the error back to the caller.
    async fn fail(&self, run: u64, e: LensError) -> LensError {
        error!("Run {} failed: {}", run, e);
        let message = e.to_string();
        match self.commit(run, move |s| s.failed(message)).await {
            Ok(_) => e,
            Err(stale) => stale,
        }
    }
}

fn discarded(run: u64, stage: &str) -> LensError {
    warn!("Run {} was reset during {}; discarding its result", run, stage);
    LensError::Cancelled
}

/// Resolves once the run's abort handle fires or is dropped.
async fn aborted(mut abort: watch::Receiver<bool>) {
    loop {
        let fired = *abort.borrow_and_update();
        if fired || abort.changed().await.is_err() {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::PersistenceError;
    use crate::testing::*;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    fn pipeline(
        analyzer: Arc<FakeAnalyzer>,
        generator: Arc<FakeGenerator>,
        store: Arc<CountingStore>,
    ) -> Arc<Pipeline> {
        Arc::new(Pipeline::new(analyzer, generator, store))
    }

    /// Runs one pipeline pass in the foreground.
    async fn run(
        pipeline: &Pipeline,
        options: RunOptions,
    ) -> Result<Arc<PipelineSnapshot>, LensError> {
        let ticket = pipeline.begin(photo(), options).await?;
        pipeline.drive(ticket).await
    }

    async fn settled(pipeline: &Pipeline) -> Arc<PipelineSnapshot> {
        for _ in 0..200 {
            let snapshot = pipeline.snapshot().await;
            if matches!(snapshot.phase, PipelinePhase::Complete | PipelinePhase::Error) {
                return snapshot;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        pipeline.snapshot().await
    }

    #[tokio::test]
    async fn successful_run_completes_and_saves_once() {
        let store = Arc::new(CountingStore::default());
        let pipeline = pipeline(
            Arc::new(FakeAnalyzer::new(AnalyzerMode::Succeed)),
            Arc::new(FakeGenerator::new(GeneratorMode::Succeed)),
            store.clone(),
        );

        let snapshot = run(&pipeline, RunOptions::default()).await.unwrap();

        assert_eq!(snapshot.phase, PipelinePhase::Complete);
        let cost = snapshot.cost.as_ref().unwrap();
        assert!((cost.analysis_cost() - 0.00875).abs() < 1e-12);
        assert_eq!(cost.generation_cost(), 0.04);
        assert!((cost.total_cost() - 0.04875).abs() < 1e-12);
        assert_eq!(store.saves.load(Ordering::SeqCst), 1);

        let history = pipeline.history().await;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].original_image, photo());
        assert_eq!(Some(&history[0].enhanced_image), snapshot.enhanced_image.as_ref());
        assert_eq!(Some(&history[0].cost), snapshot.cost.as_ref());
    }

    #[tokio::test]
    async fn analysis_failure_ends_in_error_without_saving() {
        let store = Arc::new(CountingStore::default());
        let generator = Arc::new(FakeGenerator::new(GeneratorMode::Succeed));
        let pipeline = pipeline(
            Arc::new(FakeAnalyzer::new(AnalyzerMode::MissingPrompt)),
            generator.clone(),
            store.clone(),
        );

        let err = run(&pipeline, RunOptions::default()).await.unwrap_err();
        assert!(matches!(err, LensError::AnalysisParse(_)));

        let snapshot = pipeline.snapshot().await;
        assert_eq!(snapshot.phase, PipelinePhase::Error);
        assert!(snapshot.error.as_ref().unwrap().contains("generationPrompt"));
        assert!(snapshot.analysis.is_none());
        assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
        assert_eq!(store.saves.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn generation_failure_ends_in_error_and_reset_clears_analysis() {
        let store = Arc::new(CountingStore::default());
        let pipeline = pipeline(
            Arc::new(FakeAnalyzer::new(AnalyzerMode::Succeed)),
            Arc::new(FakeGenerator::new(GeneratorMode::NoImage)),
            store.clone(),
        );

        let err = run(&pipeline, RunOptions::default()).await.unwrap_err();
        assert!(matches!(err, LensError::Generation(_)));

        let snapshot = pipeline.snapshot().await;
        assert_eq!(snapshot.phase, PipelinePhase::Error);
        assert!(snapshot.error.as_ref().unwrap().contains("no image produced"));
        assert!(snapshot.analysis.is_some());
        assert_eq!(store.saves.load(Ordering::SeqCst), 0);

        let snapshot = pipeline.reset().await;
        assert_eq!(*snapshot, PipelineSnapshot::default());
    }

    #[tokio::test]
    async fn start_is_rejected_outside_idle() {
        let analyzer = Arc::new(FakeAnalyzer::new(AnalyzerMode::Succeed));
        let pipeline = pipeline(
            analyzer.clone(),
            Arc::new(FakeGenerator::new(GeneratorMode::Succeed)),
            Arc::new(CountingStore::default()),
        );

        run(&pipeline, RunOptions::default()).await.unwrap();
        let err = run(&pipeline, RunOptions::default()).await.unwrap_err();
        assert!(matches!(err, LensError::InvalidState(_)));
        assert_eq!(analyzer.calls.load(Ordering::SeqCst), 1);

        pipeline.reset().await;
        assert!(run(&pipeline, RunOptions::default()).await.is_ok());
    }

    #[tokio::test]
    async fn reset_during_analysis_discards_the_run() {
        let analyzer = Arc::new(FakeAnalyzer::new(AnalyzerMode::Hang));
        let store = Arc::new(CountingStore::default());
        let pipeline = pipeline(
            analyzer.clone(),
            Arc::new(FakeGenerator::new(GeneratorMode::Succeed)),
            store.clone(),
        );

        let ticket = pipeline.begin(photo(), RunOptions::default()).await.unwrap();
        assert_eq!(pipeline.snapshot().await.phase, PipelinePhase::Analyzing);

        let (outcome, _) = tokio::join!(pipeline.drive(ticket), async {
            analyzer.entered.notified().await;
            pipeline.reset().await
        });

        assert!(matches!(outcome, Err(LensError::Cancelled)));
        assert_eq!(*pipeline.snapshot().await, PipelineSnapshot::default());
        assert_eq!(store.saves.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn reset_during_generation_discards_the_run() {
        let generator = Arc::new(FakeGenerator::new(GeneratorMode::Hang));
        let store = Arc::new(CountingStore::default());
        let pipeline = pipeline(
            Arc::new(FakeAnalyzer::new(AnalyzerMode::Succeed)),
            generator.clone(),
            store.clone(),
        );

        let ticket = pipeline.begin(photo(), RunOptions::default()).await.unwrap();
        let (outcome, _) = tokio::join!(pipeline.drive(ticket), async {
            generator.entered.notified().await;
            assert_eq!(pipeline.snapshot().await.phase, PipelinePhase::Generating);
            pipeline.reset().await
        });

        assert!(matches!(outcome, Err(LensError::Cancelled)));
        assert_eq!(*pipeline.snapshot().await, PipelineSnapshot::default());
        assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.saves.load(Ordering::SeqCst), 0);
        assert!(pipeline.refresh_history().await.unwrap().is_empty());

        assert!(pipeline.begin(photo(), RunOptions::default()).await.is_ok());
    }

    #[tokio::test]
    async fn start_runs_in_the_background() {
        let store = Arc::new(CountingStore::default());
        let pipeline = pipeline(
            Arc::new(FakeAnalyzer::new(AnalyzerMode::Succeed)),
            Arc::new(FakeGenerator::new(GeneratorMode::Succeed)),
            store.clone(),
        );

        let accepted = pipeline.start(photo(), RunOptions::default()).await.unwrap();
        assert_eq!(accepted.phase, PipelinePhase::Analyzing);
        assert!(matches!(
            pipeline.start(photo(), RunOptions::default()).await,
            Err(LensError::InvalidState(_))
        ));

        let finished = settled(&pipeline).await;
        assert_eq!(finished.phase, PipelinePhase::Complete);
        assert_eq!(store.saves.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn opening_unknown_history_is_not_found() {
        let pipeline = pipeline(
            Arc::new(FakeAnalyzer::new(AnalyzerMode::Succeed)),
            Arc::new(FakeGenerator::new(GeneratorMode::Succeed)),
            Arc::new(CountingStore::default()),
        );

        assert!(matches!(
            pipeline.open_history("missing").await,
            Err(LensError::Persistence(PersistenceError::NotFound(_)))
        ));
        assert_eq!(*pipeline.snapshot().await, PipelineSnapshot::default());
    }

    #[tokio::test]
    async fn stale_commit_is_ignored() {
        let pipeline = pipeline(
            Arc::new(FakeAnalyzer::new(AnalyzerMode::Succeed)),
            Arc::new(FakeGenerator::new(GeneratorMode::Succeed)),
            Arc::new(CountingStore::default()),
        );

        let ticket = pipeline.begin(photo(), RunOptions::default()).await.unwrap();
        pipeline.reset().await;

        let err = pipeline
            .commit(ticket.run, |s| s.analyzed(analysis()))
            .await
            .unwrap_err();
        assert!(matches!(err, LensError::Cancelled));
        assert_eq!(pipeline.snapshot().await.phase, PipelinePhase::Idle);
    }

    #[tokio::test]
    async fn save_failure_is_reported() {
        let store = Arc::new(CountingStore::failing());
        let pipeline = pipeline(
            Arc::new(FakeAnalyzer::new(AnalyzerMode::Succeed)),
            Arc::new(FakeGenerator::new(GeneratorMode::Succeed)),
            store.clone(),
        );

        let err = run(&pipeline, RunOptions::default()).await.unwrap_err();
        assert!(matches!(err, LensError::Persistence(_)));
        assert_eq!(pipeline.snapshot().await.phase, PipelinePhase::Error);
        assert_eq!(store.saves.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn literary_option_reaches_the_analyzer() {
        let analyzer = Arc::new(FakeAnalyzer::new(AnalyzerMode::Succeed));
        let pipeline = pipeline(
            analyzer.clone(),
            Arc::new(FakeGenerator::new(GeneratorMode::Succeed)),
            Arc::new(CountingStore::default()),
        );

        let snapshot = run(&pipeline, RunOptions { literary_text: true })
            .await
            .unwrap();
        assert!(snapshot.analysis.as_ref().unwrap().literary_text.is_some());
    }

    #[tokio::test]
    async fn history_can_be_opened_and_deleted() {
        let pipeline = pipeline(
            Arc::new(FakeAnalyzer::new(AnalyzerMode::Succeed)),
            Arc::new(FakeGenerator::new(GeneratorMode::Succeed)),
            Arc::new(CountingStore::default()),
        );

        let finished = run(&pipeline, RunOptions::default()).await.unwrap();
        let id = pipeline.history().await[0].id.clone();
        pipeline.reset().await;

        let opened = pipeline.open_history(&id).await.unwrap();
        assert_eq!(opened.phase, PipelinePhase::Complete);
        assert_eq!(opened.enhanced_image, finished.enhanced_image);
        assert_eq!(opened.analysis, finished.analysis);

        let remaining = pipeline.delete_history(&id).await.unwrap();
        assert!(remaining.is_empty());
        assert!(matches!(
            pipeline.delete_history(&id).await,
            Err(LensError::Persistence(PersistenceError::NotFound(_)))
        ));
    }

    #[test]
    fn transitions_follow_the_state_machine() {
        let idle = PipelineSnapshot::default();
        assert!(idle.clone().analyzed(analysis()).is_err());
        assert!(idle.clone().failed("boom").is_err());

        let staged = idle.clone().stage(photo()).unwrap();
        assert_eq!(staged.phase, PipelinePhase::Idle);
        assert_eq!(staged.original_image, Some(photo()));

        let analyzing = staged.begin(photo()).unwrap();
        assert!(analyzing.clone().stage(photo()).is_err());
        assert!(analyzing.clone().begin(photo()).is_err());
        assert!(analyzing.clone().opened(history_item()).is_err());

        let generating = analyzing.analyzed(analysis()).unwrap();
        assert_eq!(generating.phase, PipelinePhase::Generating);
        assert_eq!(generating.analysis, Some(analysis()));

        let cost = CostBreakdown::new(0.01, 0.04, None);
        let complete = generating.clone().completed(enhanced(), cost).unwrap();
        assert_eq!(complete.phase, PipelinePhase::Complete);
        assert!(complete.clone().failed("late").is_err());
        assert!(complete.begin(photo()).is_err());

        let error = generating.failed("no image produced").unwrap();
        assert_eq!(error.phase, PipelinePhase::Error);
        assert_eq!(error.original_image, Some(photo()));
        assert!(error.begin(photo()).is_err());
    }
}
