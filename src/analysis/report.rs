use indicatif::ProgressBar;
use serde::Serialize;

use super::contrasts::{best_level, contrast_sets, ConditionDraws, ContrastKind, ContrastSet};
use super::grid::{fixed_point_grid, prediction_grid};
use super::summary::{summarize_grid, DrawSummarizer, Quantity, RowSummary};
use crate::config::{ContrastConfig, RandomEffectsMode, SummaryConfig};
use crate::data::{observed_means, DeriveSummary, DerivedDataset, ObservedPoint};
use crate::errors::{AnalysisError, Result};
use crate::posterior::{PosteriorSampleStore, Provenance, RandomEffects};

/// Quantities reported on the grid and compared between conditions.
pub const REPORTED_QUANTITIES: [Quantity; 2] = [Quantity::Mean, Quantity::StandardDeviation];

/// Everything the renderers need.
#[derive(Debug, Clone, Serialize)]
pub struct StudyReport {
    pub formula: String,
    pub provenance: Provenance,
    pub derive: DeriveSummary,
    pub condition_levels: Vec<String>,
    pub reference_condition: String,
    pub credible_levels: Vec<f64>,
    pub random_effects: RandomEffectsMode,
    pub n_draws: usize,
    /// Posterior summaries across the trial range
    pub trajectory: Vec<RowSummary>,
    /// Posterior summaries at the final trial
    pub final_trial: Vec<RowSummary>,
    pub observed: Vec<ObservedPoint>,
    pub baseline: String,
    pub best: String,
    pub contrasts: Vec<ContrastSet>,
}

impl StudyReport {
    /// Contrast set for a quantity and kind, if computed.
    pub fn contrast(&self, quantity: Quantity, kind: ContrastKind) -> Option<&ContrastSet> {
        self.contrasts
            .iter()
            .find(|c| c.quantity == quantity && c.kind == kind)
    }
}

/// Inputs of [`build_report`].
pub struct ReportInputs<'a> {
    pub store: &'a PosteriorSampleStore,
    pub data: &'a DerivedDataset,
    pub provenance: Provenance,
    pub summary: &'a SummaryConfig,
    pub contrasts: &'a ContrastConfig,
    pub progress: &'a ProgressBar,
}

/// Build prediction grids, summarize them and compute every contrast.
pub fn build_report(inputs: ReportInputs<'_>) -> Result<StudyReport> {
    let ReportInputs {
        store,
        data,
        provenance,
        summary,
        contrasts,
        progress,
    } = inputs;

    let summarizer = DrawSummarizer::new(&summary.credible_levels)?;
    let effects = match summary.random_effects {
        RandomEffectsMode::PopulationLevel => RandomEffects::PopulationLevel,
        RandomEffectsMode::NewLevels => store.sample_new_levels(summary.seed)?,
        RandomEffectsMode::KnownLevels => RandomEffects::Known(summary.known_levels.to_map()),
    };
    let levels = store.coding().levels().to_vec();

    let range = data.trial_range().unwrap_or((-0.5, 0.5));
    let grid = prediction_grid(&levels, range, summary.grid_points);
    let final_grid = fixed_point_grid(&levels, summary.final_trial_point);
    progress.set_length((grid.len() + final_grid.len()) as u64);
    log::debug!(
        "Summarizing {} grid rows and {} final-trial rows over {} draws",
        grid.len(),
        final_grid.len(),
        store.n_draws()
    );

    let trajectory = summarize_grid(
        store,
        &grid,
        &effects,
        &summarizer,
        &REPORTED_QUANTITIES,
        progress,
    )?;
    let final_trial = summarize_grid(
        store,
        &final_grid,
        &effects,
        &summarizer,
        &REPORTED_QUANTITIES,
        progress,
    )?;

    let mu_draws = ConditionDraws::from_store(
        store,
        &levels,
        summary.final_trial_point,
        &effects,
        Quantity::Mean,
    )?;
    let baseline = contrasts
        .baseline
        .clone()
        .unwrap_or_else(|| store.coding().reference().to_string());
    let best = match &contrasts.best {
        Some(level) => level.clone(),
        None => best_level(&mu_draws, &summarizer)?
            .ok_or_else(|| AnalysisError::posterior("no condition levels to compare"))?,
    };
    log::info!("Contrasts against baseline '{baseline}' and best-performing '{best}'");

    let mut sets = contrast_sets(&mu_draws, &baseline, &best, &summarizer)?;
    let sd_draws = ConditionDraws::from_store(
        store,
        &levels,
        summary.final_trial_point,
        &effects,
        Quantity::StandardDeviation,
    )?;
    sets.extend(contrast_sets(&sd_draws, &baseline, &best, &summarizer)?);

    Ok(StudyReport {
        formula: store.formula().to_string(),
        provenance,
        derive: data.summary.clone(),
        reference_condition: store.coding().reference().to_string(),
        condition_levels: levels,
        credible_levels: summarizer.levels().to_vec(),
        random_effects: summary.random_effects,
        n_draws: store.n_draws(),
        trajectory,
        final_trial,
        observed: observed_means(&data.trials),
        baseline,
        best,
        contrasts: sets,
    })
}
