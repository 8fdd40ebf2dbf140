//! The stages of a betaviz analysis.
//!
//! Each stage wraps one library operation and borrows the configuration it
//! needs, so building a pipeline never clones the model specification or
//! the engine.

use std::path::{Path, PathBuf};

use crate::analysis::{build_report, ReportInputs};
use crate::config::{ContrastConfig, ModelConfig, StudyConfig, SummaryConfig};
use crate::data::{derive_trials, load_trials, RawTrial};
use crate::errors::AnalysisError;
use crate::model::ConditionCoding;
use crate::observability::{set_current_file, AnalysisPhase};
use crate::output::{ReportRenderer, SvgRenderer};
use crate::pipeline::data::AnalysisData;
use crate::pipeline::stage::Stage;
use crate::posterior::{fit_or_load, import_draws, FitPolicy, FitRequest, FittingEngine};
use crate::progress::ProgressConfig;

/// Stage 1: read raw trial records from CSV.
pub struct LoadStage {
    path: PathBuf,
}

impl LoadStage {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }
}

impl Stage for LoadStage {
    type Input = ();
    type Output = Vec<RawTrial>;
    type Error = AnalysisError;

    fn execute(&self, _input: Self::Input) -> Result<Self::Output, Self::Error> {
        load_trials(&self.path)
    }

    fn name(&self) -> &str {
        "Load trials"
    }

    fn phase(&self) -> AnalysisPhase {
        AnalysisPhase::Load
    }
}

/// Stage 2: filter rows and compute derived fields.
pub struct DeriveStage<'a> {
    study: &'a StudyConfig,
}

impl<'a> DeriveStage<'a> {
    pub fn new(study: &'a StudyConfig) -> Self {
        Self { study }
    }
}

impl Stage for DeriveStage<'_> {
    type Input = Vec<RawTrial>;
    type Output = AnalysisData;
    type Error = AnalysisError;

    fn execute(&self, input: Self::Input) -> Result<Self::Output, Self::Error> {
        derive_trials(input, self.study).map(AnalysisData::new)
    }

    fn name(&self) -> &str {
        "Derive features"
    }

    fn phase(&self) -> AnalysisPhase {
        AnalysisPhase::Derive
    }
}

/// Stage 3: obtain posterior draws, reusing a matching artifact when the
/// policy allows.
///
/// With [`FitStage::with_draws`] the engine is bypassed and an externally
/// produced draws file is imported into the artifact instead.
pub struct FitStage<'a> {
    engine: &'a dyn FittingEngine,
    model: &'a ModelConfig,
    artifact: PathBuf,
    policy: FitPolicy,
    fallback_to_stale: bool,
    draws: Option<PathBuf>,
}

impl<'a> FitStage<'a> {
    pub fn new(engine: &'a dyn FittingEngine, model: &'a ModelConfig, artifact: &Path) -> Self {
        Self {
            engine,
            model,
            artifact: artifact.to_path_buf(),
            policy: FitPolicy::default(),
            fallback_to_stale: false,
            draws: None,
        }
    }

    pub fn with_policy(mut self, policy: FitPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_fallback(mut self, fallback_to_stale: bool) -> Self {
        self.fallback_to_stale = fallback_to_stale;
        self
    }

    pub fn with_draws(mut self, draws: Option<&Path>) -> Self {
        self.draws = draws.map(Path::to_path_buf);
        self
    }
}

impl Stage for FitStage<'_> {
    type Input = AnalysisData;
    type Output = AnalysisData;
    type Error = AnalysisError;

    fn execute(&self, input: Self::Input) -> Result<Self::Output, Self::Error> {
        let coding = ConditionCoding::from_levels(
            input.dataset.condition_levels(),
            self.model.reference_condition.as_deref(),
        )?;
        let spec = self.model.spec().validated()?;
        log::debug!(
            "Condition coding: reference '{}' among {}",
            coding.reference(),
            coding.levels().join(", ")
        );

        let request = FitRequest {
            data: &input.dataset,
            spec: &spec,
            coding: &coding,
            artifact: &self.artifact,
            policy: self.policy,
            fallback_to_stale: self.fallback_to_stale,
        };
        let fit = match &self.draws {
            Some(draws) => {
                let _file = set_current_file(draws);
                import_draws(draws, request)?
            }
            None => fit_or_load(self.engine, request)?,
        };
        Ok(input.with_fit(coding, fit))
    }

    fn name(&self) -> &str {
        "Fit model"
    }

    fn phase(&self) -> AnalysisPhase {
        AnalysisPhase::Fit
    }
}

/// Stage 4: prediction grids, summaries and contrasts.
pub struct SummarizeStage<'a> {
    summary: &'a SummaryConfig,
    contrasts: &'a ContrastConfig,
    progress: ProgressConfig,
}

impl<'a> SummarizeStage<'a> {
    pub fn new(
        summary: &'a SummaryConfig,
        contrasts: &'a ContrastConfig,
        progress: ProgressConfig,
    ) -> Self {
        Self {
            summary,
            contrasts,
            progress,
        }
    }
}

impl Stage for SummarizeStage<'_> {
    type Input = AnalysisData;
    type Output = AnalysisData;
    type Error = AnalysisError;

    fn execute(&self, input: Self::Input) -> Result<Self::Output, Self::Error> {
        let fit = input.require_fit()?;
        let bar = self.progress.bar(0, "Summarizing posterior");
        let report = build_report(ReportInputs {
            store: &fit.store,
            data: &input.dataset,
            provenance: fit.provenance.clone(),
            summary: self.summary,
            contrasts: self.contrasts,
            progress: &bar,
        })?;
        bar.finish_and_clear();
        Ok(input.with_report(report))
    }

    fn name(&self) -> &str {
        "Summarize posterior"
    }

    fn phase(&self) -> AnalysisPhase {
        AnalysisPhase::Summarize
    }
}

/// Stage 5: write SVG charts.
pub struct RenderStage {
    figures: PathBuf,
}

impl RenderStage {
    pub fn new(figures: &Path) -> Self {
        Self {
            figures: figures.to_path_buf(),
        }
    }
}

impl Stage for RenderStage {
    type Input = AnalysisData;
    type Output = AnalysisData;
    type Error = AnalysisError;

    fn execute(&self, input: Self::Input) -> Result<Self::Output, Self::Error> {
        let mut renderer = SvgRenderer::new(&self.figures);
        renderer.render(input.require_report()?)?;
        let written = renderer.into_written();
        log::info!(
            "Wrote {} charts to {}",
            written.len(),
            self.figures.display()
        );
        Ok(input.with_figures(written))
    }

    fn name(&self) -> &str {
        "Render charts"
    }

    fn phase(&self) -> AnalysisPhase {
        AnalysisPhase::Render
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::get_current_context;
    use indoc::indoc;
    use tempfile::TempDir;

    #[test]
    fn test_load_stage_reads_trials_and_releases_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("trials.csv");
        std::fs::write(
            &path,
            indoc! {"
                participant,scenario,vis,arrival,trial,expected_payoff,optimal_payoff,mu,sigma,nu,tau
                p01,s1,bars,early,1,40,80,10,0.2,0.5,5
            "},
        )
        .unwrap();

        let trials = LoadStage::new(&path).execute(()).unwrap();
        assert_eq!(trials.len(), 1);
        assert_eq!(get_current_context().current_file, None);
    }

    #[test]
    fn test_load_stage_error_names_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing.csv");
        let err = LoadStage::new(&path).execute(()).unwrap_err();
        assert_eq!(err.category(), "I/O");
        assert!(err.to_string().contains("missing.csv"));
    }
}
