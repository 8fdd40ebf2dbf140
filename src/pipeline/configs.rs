//! Pre-configured pipelines for the CLI commands.
//!
//! ```rust,ignore
//! let engine = ExternalEngine::from_config(&config.engine, ProgressConfig::default());
//! let pipeline = analysis_pipeline(AnalysisOptions::new(&config, &engine));
//! let (data, timings) = pipeline.execute_with_timing()?;
//! for timing in timings {
//!     log::debug!("{}", timing.format());
//! }
//! ```

use std::path::{Path, PathBuf};

use super::data::AnalysisData;
use super::stages::{DeriveStage, FitStage, LoadStage, RenderStage, SummarizeStage};
use super::{BuiltPipeline, PipelineBuilder};
use crate::config::BetavizConfig;
use crate::posterior::{FitPolicy, FittingEngine};
use crate::progress::ProgressConfig;

/// Knobs of a full analysis run that are not part of the config file.
pub struct AnalysisOptions<'a> {
    pub config: &'a BetavizConfig,
    pub engine: &'a dyn FittingEngine,
    pub policy: FitPolicy,
    /// Directory for SVG charts; `None` skips rendering
    pub figures: Option<PathBuf>,
    pub progress: ProgressConfig,
}

impl<'a> AnalysisOptions<'a> {
    /// Options taken from the configuration alone.
    pub fn new(config: &'a BetavizConfig, engine: &'a dyn FittingEngine) -> Self {
        Self {
            config,
            engine,
            policy: config.engine.policy,
            figures: Some(config.paths.figures.clone()),
            progress: ProgressConfig::default(),
        }
    }
}

/// Load, derive, fit, summarize and (optionally) render.
pub fn analysis_pipeline(options: AnalysisOptions<'_>) -> BuiltPipeline<'_, AnalysisData> {
    let AnalysisOptions {
        config,
        engine,
        policy,
        figures,
        progress,
    } = options;

    let summarized = fit_pipeline(config, engine, policy, None).stage(SummarizeStage::new(
        &config.summary,
        &config.contrasts,
        progress,
    ));
    match figures {
        Some(dir) => summarized.stage(RenderStage::new(&dir)).build(),
        None => summarized.build(),
    }
}

/// Load and derive only.
pub fn derive_pipeline<'a>(config: &'a BetavizConfig, data: &Path) -> BuiltPipeline<'a, AnalysisData> {
    PipelineBuilder::new()
        .stage(LoadStage::new(data))
        .stage(DeriveStage::new(&config.study))
        .with_progress()
        .build()
}

fn fit_pipeline<'a>(
    config: &'a BetavizConfig,
    engine: &'a dyn FittingEngine,
    policy: FitPolicy,
    draws: Option<&Path>,
) -> PipelineBuilder<'a, AnalysisData> {
    PipelineBuilder::new()
        .stage(LoadStage::new(&config.paths.data))
        .stage(DeriveStage::new(&config.study))
        .stage(
            FitStage::new(engine, &config.model, &config.paths.artifact)
                .with_policy(policy)
                .with_fallback(config.engine.fallback_to_stale)
                .with_draws(draws),
        )
        .with_progress()
}

/// Load, derive and fit; the result carries the posterior but no report.
///
/// With `draws`, the posterior is imported from that file instead of
/// fitted.
pub fn fitting_pipeline<'a>(
    config: &'a BetavizConfig,
    engine: &'a dyn FittingEngine,
    policy: FitPolicy,
    draws: Option<&Path>,
) -> BuiltPipeline<'a, AnalysisData> {
    fit_pipeline(config, engine, policy, draws).build()
}
