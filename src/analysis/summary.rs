//! Collapsing per-draw values into medians and nested credible intervals.
//!
//! The same [`DrawSummarizer`] serves fitted values on the prediction grid
//! and contrasts between conditions. Quantiles interpolate linearly between
//! order statistics (Hyndman and Fan type 7, the default of R's `quantile`),
//! so for the draws `1..=100` the 50% interval is `[25.75, 75.25]`.

use indicatif::ProgressBar;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use super::grid::GridRow;
use crate::errors::{AnalysisError, Result};
use crate::posterior::{FittedValue, PosteriorSampleStore, RandomEffects};

/// Type-7 quantile of an ascending slice.
///
/// # Panics
///
/// Panics if `sorted` is empty.
pub fn quantile(sorted: &[f64], p: f64) -> f64 {
    let n = sorted.len();
    let h = (n - 1) as f64 * p.clamp(0.0, 1.0);
    let lo = h.floor() as usize;
    let hi = (lo + 1).min(n - 1);
    sorted[lo] + (h - lo as f64) * (sorted[hi] - sorted[lo])
}

/// Two-sided interval holding `level` of the posterior mass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CredibleInterval {
    pub level: f64,
    pub lower: f64,
    pub upper: f64,
}

impl CredibleInterval {
    pub fn contains(&self, other: &CredibleInterval) -> bool {
        self.lower <= other.lower && other.upper <= self.upper
    }
}

/// Median, mean and credible intervals of a set of draws.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PosteriorSummary {
    pub median: f64,
    pub mean: f64,
    /// Ordered by ascending level, so each interval contains the previous one
    pub intervals: Vec<CredibleInterval>,
    pub n_draws: usize,
}

impl PosteriorSummary {
    pub fn interval(&self, level: f64) -> Option<&CredibleInterval> {
        self.intervals
            .iter()
            .find(|i| (i.level - level).abs() < 1e-9)
    }

    /// Widest interval, if any.
    pub fn outer(&self) -> Option<&CredibleInterval> {
        self.intervals.last()
    }
}

/// Summarizes draws at a fixed set of credible levels.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawSummarizer {
    levels: Vec<f64>,
}

impl DrawSummarizer {
    /// Levels must lie strictly between 0 and 1; they are sorted and
    /// deduplicated.
    pub fn new(levels: &[f64]) -> Result<Self> {
        if let Some(bad) = levels.iter().find(|l| !(**l > 0.0 && **l < 1.0)) {
            return Err(AnalysisError::config(format!(
                "credible level {bad} is not in (0, 1)"
            )));
        }
        let mut levels = levels.to_vec();
        levels.sort_by(f64::total_cmp);
        levels.dedup();
        Ok(Self { levels })
    }

    pub fn levels(&self) -> &[f64] {
        &self.levels
    }

    /// Summarize raw values.
    pub fn summarize(&self, values: &[f64]) -> Result<PosteriorSummary> {
        if values.is_empty() {
            return Err(AnalysisError::posterior("cannot summarize zero draws"));
        }
        if values.iter().any(|v| v.is_nan()) {
            return Err(AnalysisError::posterior("draws contain NaN"));
        }

        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);

        let intervals = self
            .levels
            .iter()
            .map(|&level| {
                let tail = (1.0 - level) / 2.0;
                CredibleInterval {
                    level,
                    lower: quantile(&sorted, tail),
                    upper: quantile(&sorted, 1.0 - tail),
                }
            })
            .collect();

        Ok(PosteriorSummary {
            median: quantile(&sorted, 0.5),
            mean: sorted.iter().sum::<f64>() / sorted.len() as f64,
            intervals,
            n_draws: sorted.len(),
        })
    }

    /// Summarize a quantity derived from each draw.
    pub fn summarize_with<T, F>(&self, draws: &[T], derive: F) -> Result<PosteriorSummary>
    where
        F: Fn(&T) -> f64,
    {
        let values: Vec<f64> = draws.iter().map(derive).collect();
        self.summarize(&values)
    }
}

/// Per-draw quantity derived from a fitted value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Quantity {
    /// Mean of the response, `mu`
    #[serde(rename = "mu")]
    Mean,
    /// Standard deviation of the response
    #[serde(rename = "sd")]
    StandardDeviation,
    /// Precision, `phi`
    #[serde(rename = "phi")]
    Precision,
}

impl Quantity {
    pub const ALL: [Quantity; 3] = [Self::Mean, Self::StandardDeviation, Self::Precision];

    pub fn of(self, fitted: &FittedValue) -> f64 {
        match self {
            Self::Mean => fitted.mu,
            Self::StandardDeviation => fitted.sd(),
            Self::Precision => fitted.phi,
        }
    }

    /// Short name used in file names and tables.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mean => "mu",
            Self::StandardDeviation => "sd",
            Self::Precision => "phi",
        }
    }

    /// Axis label.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Mean => "Mean response ratio",
            Self::StandardDeviation => "SD of response ratio",
            Self::Precision => "Precision",
        }
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Summaries of the requested quantities at one grid row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowSummary {
    pub condition: String,
    pub trial_normalized: f64,
    pub quantities: BTreeMap<Quantity, PosteriorSummary>,
}

impl RowSummary {
    pub fn get(&self, quantity: Quantity) -> Option<&PosteriorSummary> {
        self.quantities.get(&quantity)
    }
}

/// Summarize every grid row in parallel; output order follows `grid`.
pub fn summarize_grid(
    store: &PosteriorSampleStore,
    grid: &[GridRow],
    effects: &RandomEffects,
    summarizer: &DrawSummarizer,
    quantities: &[Quantity],
    progress: &ProgressBar,
) -> Result<Vec<RowSummary>> {
    grid.par_iter()
        .map(|row| -> Result<RowSummary> {
            let fitted = store.fitted_draws(&row.covariates(), effects)?;
            let summaries = quantities
                .iter()
                .map(|&q| -> Result<(Quantity, PosteriorSummary)> {
                    Ok((q, summarizer.summarize_with(&fitted, |f| q.of(f))?))
                })
                .collect::<Result<BTreeMap<_, _>>>()?;
            progress.inc(1);
            Ok(RowSummary {
                condition: row.condition.clone(),
                trial_normalized: row.trial_normalized,
                quantities: summaries,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ConditionCoding, Formula};

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_type7_fifty_percent_interval() {
        let draws: Vec<f64> = (1..=100).map(f64::from).collect();
        let summary = DrawSummarizer::new(&[0.5]).unwrap().summarize(&draws).unwrap();
        let interval = summary.interval(0.5).unwrap();
        assert!(close(interval.lower, 25.75));
        assert!(close(interval.upper, 75.25));
        assert!(close(summary.median, 50.5));
        assert!(close(summary.mean, 50.5));
    }

    #[test]
    fn test_levels_sorted_and_nested() {
        let draws: Vec<f64> = (0..257).map(|i| ((i * 37) % 101) as f64 / 7.0).collect();
        let summarizer = DrawSummarizer::new(&[0.95, 0.5, 0.8]).unwrap();
        assert_eq!(summarizer.levels(), [0.5, 0.8, 0.95]);

        let summary = summarizer.summarize(&draws).unwrap();
        assert!(summary.intervals[1].contains(&summary.intervals[0]));
        assert!(summary.intervals[2].contains(&summary.intervals[1]));
        assert_eq!(summary.outer().unwrap().level, 0.95);
    }

    #[test]
    fn test_summary_is_order_independent() {
        let summarizer = DrawSummarizer::new(&[0.8]).unwrap();
        let a = summarizer.summarize(&[3.0, 1.0, 2.0, 5.0]).unwrap();
        let b = summarizer.summarize(&[5.0, 2.0, 3.0, 1.0]).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_single_draw() {
        let summary = DrawSummarizer::new(&[0.95]).unwrap().summarize(&[0.3]).unwrap();
        assert_eq!(summary.median, 0.3);
        assert_eq!(summary.intervals[0].lower, 0.3);
        assert_eq!(summary.intervals[0].upper, 0.3);
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(DrawSummarizer::new(&[1.0]).is_err());
        assert!(DrawSummarizer::new(&[0.0]).is_err());
        let summarizer = DrawSummarizer::new(&[0.5]).unwrap();
        assert!(summarizer.summarize(&[]).is_err());
        assert!(summarizer.summarize(&[0.1, f64::NAN]).is_err());
    }

    #[test]
    fn test_summarize_grid_preserves_order() {
        let mut formula = Formula::default();
        formula.groups.clear();
        formula.mean.interaction = false;
        formula.precision.condition = false;
        formula.precision.trial = false;
        let coding = ConditionCoding::from_levels(["bars", "hops"], None).unwrap();
        let col = |name: &str, v: [f64; 3]| (name.to_string(), v.to_vec());
        let store = PosteriorSampleStore::new(
            formula,
            coding,
            vec![
                col("b_Intercept", [0.0, 0.1, -0.1]),
                col("b_vishops", [1.0, 1.0, 1.0]),
                col("b_trial_normalized", [0.0, 0.0, 0.0]),
                col("b_phi_Intercept", [1.0, 1.0, 1.0]),
            ],
        )
        .unwrap();

        let grid = super::super::grid::prediction_grid(
            &["bars".to_string(), "hops".to_string()],
            (-0.5, 0.5),
            3,
        );
        let rows = summarize_grid(
            &store,
            &grid,
            &RandomEffects::PopulationLevel,
            &DrawSummarizer::new(&[0.5, 0.9]).unwrap(),
            &Quantity::ALL,
            &ProgressBar::hidden(),
        )
        .unwrap();

        assert_eq!(rows.len(), 6);
        assert_eq!(rows[0].condition, "bars");
        assert_eq!(rows[5].condition, "hops");
        let bars = rows[0].get(Quantity::Mean).unwrap().median;
        let hops = rows[5].get(Quantity::Mean).unwrap().median;
        assert!(close(bars, 0.5));
        assert!(close(hops, crate::posterior::logistic(1.0)));
        assert!(close(
            rows[0].get(Quantity::Precision).unwrap().median,
            1.0f64.exp()
        ));
    }
}
