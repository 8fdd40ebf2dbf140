//! Feature derivation: normalized trial index, displayed intervals and the
//! bounded response ratio, plus removal of the excluded scenario.
//!
//! Derived rows are computed once and never modified afterwards. Every
//! check here is a fatal precondition: a violation means the input data is
//! not what the model was designed for, and continuing would only move the
//! failure into the (much more expensive) fitting stage.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

use super::distribution::{ShapeFamily, ShapeParams};
use super::loader::RawTrial;
use crate::config::StudyConfig;
use crate::errors::{AnalysisError, Result};
use crate::observability::AnalysisPhase;

/// How the trial index is mapped onto [-0.5, 0.5].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrialScaling {
    /// `(trial - 1) / (max - 1) - 0.5`: first trial at -0.5, last at +0.5.
    #[default]
    Endpoints,
    /// `(trial - max) / max + 0.5`: last trial at +0.5, first at -0.5 + 1/max.
    Offset,
}

/// Map a trial index onto the normalized scale.
pub fn normalize_trial(trial: u32, max_trial: u32, scaling: TrialScaling) -> f64 {
    let trial = f64::from(trial);
    let max = f64::from(max_trial);
    match scaling {
        TrialScaling::Endpoints if max_trial > 1 => (trial - 1.0) / (max - 1.0) - 0.5,
        TrialScaling::Endpoints => 0.5,
        TrialScaling::Offset => (trial - max) / max + 0.5,
    }
}

/// Why a response ratio was replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RatioAdjustment {
    /// Ratio used as-is
    None,
    /// Ratio was exactly one; replaced by optimal / (optimal + 1)
    AtOptimum,
    /// Ratio was exactly zero, including underflow; replaced by 1 / (optimal + 1)
    AtZero,
}

/// Compute the response ratio squeezed into the open interval (0, 1).
///
/// Returns the raw ratio, the adjusted ratio and the adjustment applied.
pub fn adjust_ratio(
    response: f64,
    optimal: f64,
) -> std::result::Result<(f64, f64, RatioAdjustment), String> {
    if !(optimal.is_finite() && optimal > 0.0) {
        return Err(format!("optimal value must be positive, got {optimal}"));
    }
    if !response.is_finite() {
        return Err(format!("response must be finite, got {response}"));
    }

    let ratio = response / optimal;
    if !(0.0..=1.0).contains(&ratio) {
        return Err(format!(
            "response ratio {ratio} (response {response} / optimal {optimal}) is outside [0, 1]"
        ));
    }

    let (adjusted, adjustment) = if ratio >= 1.0 {
        // optimal / (optimal + 1) rounds to 1.0 once optimal exceeds 2^53.
        let squeezed = (optimal / (optimal + 1.0)).min(1.0 - f64::EPSILON / 2.0);
        (squeezed, RatioAdjustment::AtOptimum)
    } else if ratio <= 0.0 {
        (1.0 / (optimal + 1.0), RatioAdjustment::AtZero)
    } else {
        (ratio, RatioAdjustment::None)
    };
    Ok((ratio, adjusted, adjustment))
}

/// The value shown to participants for one display level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DisplayedInterval {
    pub level: f64,
    pub value: f64,
}

impl DisplayedInterval {
    /// Column name, e.g. `displayed_interval_85`.
    pub fn column_name(level: f64) -> String {
        format!("displayed_interval_{}", (level * 100.0).round() as i64)
    }
}

/// A trial with its derived fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedTrial {
    pub participant: String,
    pub scenario: String,
    pub vis: String,
    pub arrival: String,
    pub trial: u32,
    pub trial_normalized: f64,
    pub expected_payoff: f64,
    pub optimal_payoff: f64,
    pub response_ratio: f64,
    pub response_ratio_adjusted: f64,
    pub adjustment: RatioAdjustment,
    pub displayed_intervals: Vec<DisplayedInterval>,
}

/// Counts describing what derivation did to the input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeriveSummary {
    pub input_rows: usize,
    pub excluded_rows: usize,
    pub retained_rows: usize,
    pub adjusted_at_optimum: usize,
    pub adjusted_at_zero: usize,
    pub max_trial: u32,
}

/// The cleaned, filtered trial table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedDataset {
    pub trials: Vec<DerivedTrial>,
    pub summary: DeriveSummary,
    pub display_levels: Vec<f64>,
}

impl DerivedDataset {
    /// Distinct condition levels, sorted.
    pub fn condition_levels(&self) -> Vec<String> {
        self.trials
            .iter()
            .map(|t| t.vis.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Observed range of the normalized trial covariate.
    pub fn trial_range(&self) -> Option<(f64, f64)> {
        self.trials.iter().map(|t| t.trial_normalized).fold(None, |acc, t| {
            Some(match acc {
                None => (t, t),
                Some((lo, hi)) => (lo.min(t), hi.max(t)),
            })
        })
    }

    /// Write the derived table as CSV.
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| AnalysisError::io("Failed to create output directory", parent, e))?;
        }
        let file = std::fs::File::create(path)
            .map_err(|e| AnalysisError::io("Failed to create derived table", path, e))?;
        self.write_csv_to(file).map_err(|e| AnalysisError::Csv {
            path: path.to_path_buf(),
            line: None,
            message: e.to_string(),
        })
    }

    /// Write the derived table as CSV to any writer.
    pub fn write_csv_to<W: std::io::Write>(&self, writer: W) -> std::result::Result<(), csv::Error> {
        let mut wtr = csv::Writer::from_writer(writer);

        let mut header: Vec<String> = [
            "participant",
            "scenario",
            "vis",
            "arrival",
            "trial",
            "trial_normalized",
            "expected_payoff",
            "optimal_payoff",
            "response_ratio",
            "response_ratio_adjusted",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        header.extend(
            self.display_levels
                .iter()
                .map(|l| DisplayedInterval::column_name(*l)),
        );
        wtr.write_record(&header)?;

        for t in &self.trials {
            let mut record = vec![
                t.participant.clone(),
                t.scenario.clone(),
                t.vis.clone(),
                t.arrival.clone(),
                t.trial.to_string(),
                t.trial_normalized.to_string(),
                t.expected_payoff.to_string(),
                t.optimal_payoff.to_string(),
                t.response_ratio.to_string(),
                t.response_ratio_adjusted.to_string(),
            ];
            record.extend(t.displayed_intervals.iter().map(|d| d.value.to_string()));
            wtr.write_record(&record)?;
        }
        wtr.flush()?;
        Ok(())
    }
}

/// Derive features for every retained row.
pub fn derive_trials(raw: Vec<RawTrial>, study: &StudyConfig) -> Result<DerivedDataset> {
    check_trial_bounds(&raw, study.max_trial)?;

    let input_rows = raw.len();
    let retained: Vec<RawTrial> = raw
        .into_iter()
        .filter(|t| t.scenario != study.excluded_scenario)
        .collect();
    let excluded_rows = input_rows - retained.len();
    if excluded_rows == 0 {
        log::warn!(
            "No rows belong to the excluded scenario '{}'",
            study.excluded_scenario
        );
    }

    let trials = retained
        .into_iter()
        .enumerate()
        .map(|(i, row)| derive_row(row, i, study))
        .collect::<Result<Vec<_>>>()?;

    let summary = DeriveSummary {
        input_rows,
        excluded_rows,
        retained_rows: trials.len(),
        adjusted_at_optimum: count_adjusted(&trials, RatioAdjustment::AtOptimum),
        adjusted_at_zero: count_adjusted(&trials, RatioAdjustment::AtZero),
        max_trial: study.max_trial,
    };
    log::info!(
        "Derived {} rows ({} excluded as scenario '{}'; {} at optimum and {} at zero adjusted)",
        summary.retained_rows,
        summary.excluded_rows,
        study.excluded_scenario,
        summary.adjusted_at_optimum,
        summary.adjusted_at_zero
    );

    Ok(DerivedDataset {
        trials,
        summary,
        display_levels: study.display_levels.clone(),
    })
}

fn count_adjusted(trials: &[DerivedTrial], kind: RatioAdjustment) -> usize {
    trials.iter().filter(|t| t.adjustment == kind).count()
}

fn check_trial_bounds(raw: &[RawTrial], max_trial: u32) -> Result<()> {
    let observed = raw.iter().map(|t| t.trial).max().ok_or_else(|| {
        AnalysisError::precondition(AnalysisPhase::Derive, "non_empty", "no trial records loaded")
    })?;
    if observed != max_trial {
        return Err(AnalysisError::precondition(
            AnalysisPhase::Derive,
            "max_trial",
            format!("observed maximum trial index {observed} does not equal the expected {max_trial}"),
        ));
    }
    if let Some(bad) = raw.iter().find(|t| t.trial < 1) {
        return Err(AnalysisError::precondition(
            AnalysisPhase::Derive,
            "trial_range",
            format!(
                "trial index {} for participant {} is outside [1, {max_trial}]",
                bad.trial, bad.participant
            ),
        ));
    }
    Ok(())
}

fn derive_row(row: RawTrial, index: usize, study: &StudyConfig) -> Result<DerivedTrial> {
    let (response_ratio, response_ratio_adjusted, adjustment) =
        adjust_ratio(row.expected_payoff, row.optimal_payoff).map_err(|message| {
            AnalysisError::precondition(
                AnalysisPhase::Derive,
                "response_ratio",
                format!("row {index} (participant {}, trial {}): {message}", row.participant, row.trial),
            )
        })?;

    let displayed_intervals = displayed_intervals(&row, study).map_err(|message| {
        AnalysisError::precondition(
            AnalysisPhase::Derive,
            "shape_parameters",
            format!("row {index} (participant {}, trial {}): {message}", row.participant, row.trial),
        )
    })?;

    Ok(DerivedTrial {
        trial_normalized: normalize_trial(row.trial, study.max_trial, study.trial_scaling),
        participant: row.participant,
        scenario: row.scenario,
        vis: row.vis,
        arrival: row.arrival,
        trial: row.trial,
        expected_payoff: row.expected_payoff,
        optimal_payoff: row.optimal_payoff,
        response_ratio,
        response_ratio_adjusted,
        adjustment,
        displayed_intervals,
    })
}

/// Displayed value for each level: the `1 - level` quantile, rounded, plus
/// the display offset.
fn displayed_intervals(
    row: &RawTrial,
    study: &StudyConfig,
) -> std::result::Result<Vec<DisplayedInterval>, String> {
    let params = ShapeParams {
        mu: row.mu,
        sigma: row.sigma,
        nu: row.nu,
        tau: row.tau,
    };
    study
        .display_levels
        .iter()
        .map(|&level| {
            displayed_value(study.shape_family, level, params, study.display_offset)
                .map(|value| DisplayedInterval { level, value })
        })
        .collect()
}

/// Rounded display value for one level.
pub fn displayed_value(
    family: ShapeFamily,
    level: f64,
    params: ShapeParams,
    offset: f64,
) -> std::result::Result<f64, String> {
    family
        .quantile(1.0 - level, params)
        .map(|q| q.round() + offset)
}
