use anyhow::{Context, Result};
use std::path::PathBuf;

use super::load_configuration;
use crate::cli::configure_thread_pool;
use crate::output::{output_report, OutputFormat};
use crate::pipeline::{analysis_pipeline, AnalysisOptions};
use crate::posterior::{ExternalEngine, FitPolicy};
use crate::progress::ProgressConfig;

/// Everything `betaviz analyze` needs, gathered from the command line.
#[derive(Debug, Clone, Default)]
pub struct AnalyzeConfig {
    pub config: Option<PathBuf>,
    pub data: Option<PathBuf>,
    pub format: OutputFormat,
    pub output: Option<PathBuf>,
    pub policy: Option<FitPolicy>,
    pub jobs: usize,
    pub figures: Option<PathBuf>,
    pub no_figures: bool,
    pub timings: bool,
}

pub fn handle_analyze(options: AnalyzeConfig) -> Result<()> {
    configure_thread_pool(options.jobs);
    let config = load_configuration(options.config.as_deref(), options.data)?;

    let progress = ProgressConfig::from_env(false);
    let engine = ExternalEngine::from_config(&config.engine, progress.clone());
    let figures = if options.no_figures {
        None
    } else {
        Some(options.figures.unwrap_or_else(|| config.paths.figures.clone()))
    };

    let pipeline = analysis_pipeline(AnalysisOptions {
        config: &config,
        engine: &engine,
        policy: options.policy.unwrap_or(config.engine.policy),
        figures,
        progress,
    });
    let (data, timings) = pipeline
        .execute_with_timing()
        .context("Analysis failed")?;

    for timing in &timings {
        if options.timings {
            log::info!("{}", timing.format());
        } else {
            log::debug!("{}", timing.format());
        }
    }

    let report = data.into_report()?;
    output_report(&report, options.format, options.output.as_deref())
        .context("Failed to write report")?;
    Ok(())
}
