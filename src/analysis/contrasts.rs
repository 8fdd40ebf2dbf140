//! Differences between conditions, computed draw by draw.
//!
//! Control mode compares every level with one reference level and keeps an
//! explicit reference-versus-itself row (exactly zero) so tables and charts
//! show where the reference sits. Pairwise mode compares every unordered
//! pair once, earlier level minus later level.

use serde::Serialize;
use std::fmt;

use super::summary::{DrawSummarizer, PosteriorSummary, Quantity};
use crate::errors::{AnalysisError, Result};
use crate::posterior::{Covariates, PosteriorSampleStore, RandomEffects};

/// Per-draw values of one quantity for every condition level.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionDraws {
    quantity: Quantity,
    levels: Vec<String>,
    values: Vec<Vec<f64>>,
}

impl ConditionDraws {
    /// Draws must be aligned: value `i` of every level comes from draw `i`.
    pub fn new(quantity: Quantity, series: Vec<(String, Vec<f64>)>) -> Result<Self> {
        let n = series.first().map(|(_, v)| v.len()).unwrap_or(0);
        if let Some((level, v)) = series.iter().find(|(_, v)| v.len() != n) {
            return Err(AnalysisError::posterior(format!(
                "level '{level}' has {} draws, expected {n}",
                v.len()
            )));
        }
        let (levels, values) = series.into_iter().unzip();
        Ok(Self {
            quantity,
            levels,
            values,
        })
    }

    /// Fitted values of `quantity` for each level at one normalized trial.
    pub fn from_store(
        store: &PosteriorSampleStore,
        levels: &[String],
        trial_normalized: f64,
        effects: &RandomEffects,
        quantity: Quantity,
    ) -> Result<Self> {
        let series = levels
            .iter()
            .map(|level| -> Result<(String, Vec<f64>)> {
                let fitted =
                    store.fitted_draws(&Covariates::new(level.clone(), trial_normalized), effects)?;
                Ok((level.clone(), fitted.iter().map(|f| quantity.of(f)).collect()))
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(quantity, series)
    }

    pub fn quantity(&self) -> Quantity {
        self.quantity
    }

    pub fn levels(&self) -> &[String] {
        &self.levels
    }

    pub fn get(&self, level: &str) -> Option<&[f64]> {
        self.levels
            .iter()
            .position(|l| l == level)
            .map(|i| self.values[i].as_slice())
    }

    fn require(&self, level: &str) -> Result<&[f64]> {
        self.get(level).ok_or_else(|| {
            AnalysisError::config(format!(
                "contrast reference '{level}' is not a condition level (known: {})",
                self.levels.join(", ")
            ))
        })
    }
}

/// Element-wise `a - b`.
pub fn difference_series(a: &[f64], b: &[f64]) -> Vec<f64> {
    a.iter().zip(b).map(|(x, y)| x - y).collect()
}

/// Per-draw difference `level - reference`.
#[derive(Debug, Clone, PartialEq)]
pub struct ContrastSeries {
    pub level: String,
    pub reference: String,
    pub values: Vec<f64>,
    /// The reference compared with itself
    pub is_reference: bool,
}

/// Differences against `reference`, reference row first, then the other
/// levels in level order.
pub fn control_series(draws: &ConditionDraws, reference: &str) -> Result<Vec<ContrastSeries>> {
    let base = draws.require(reference)?;
    let mut series = vec![ContrastSeries {
        level: reference.to_string(),
        reference: reference.to_string(),
        values: vec![0.0; base.len()],
        is_reference: true,
    }];
    for (level, values) in draws.levels.iter().zip(&draws.values) {
        if level != reference {
            series.push(ContrastSeries {
                level: level.clone(),
                reference: reference.to_string(),
                values: difference_series(values, base),
                is_reference: false,
            });
        }
    }
    Ok(series)
}

/// Differences for every unordered pair `(A, B)`, `A` before `B` in level
/// order, as `A - B`.
pub fn pairwise_series(draws: &ConditionDraws) -> Vec<ContrastSeries> {
    let n = draws.levels.len();
    let mut series = Vec::with_capacity(n * n.saturating_sub(1) / 2);
    for i in 0..n {
        for j in (i + 1)..n {
            series.push(ContrastSeries {
                level: draws.levels[i].clone(),
                reference: draws.levels[j].clone(),
                values: difference_series(&draws.values[i], &draws.values[j]),
                is_reference: false,
            });
        }
    }
    series
}

/// A summarized contrast.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comparison {
    pub level: String,
    pub reference: String,
    pub summary: PosteriorSummary,
    /// Share of draws with a positive difference; absent for the
    /// reference-versus-itself row
    pub prob_positive: Option<f64>,
    pub is_reference: bool,
}

impl Comparison {
    pub fn label(&self) -> String {
        format!("{} - {}", self.level, self.reference)
    }
}

pub fn summarize_series(
    series: &[ContrastSeries],
    summarizer: &DrawSummarizer,
) -> Result<Vec<Comparison>> {
    series
        .iter()
        .map(|s| -> Result<Comparison> {
            Ok(Comparison {
                level: s.level.clone(),
                reference: s.reference.clone(),
                summary: summarizer.summarize(&s.values)?,
                prob_positive: (!s.is_reference).then(|| prob_positive(&s.values)),
                is_reference: s.is_reference,
            })
        })
        .collect()
}

fn prob_positive(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().filter(|v| **v > 0.0).count() as f64 / values.len() as f64
}

pub fn control_contrasts(
    draws: &ConditionDraws,
    reference: &str,
    summarizer: &DrawSummarizer,
) -> Result<Vec<Comparison>> {
    summarize_series(&control_series(draws, reference)?, summarizer)
}

pub fn pairwise_contrasts(
    draws: &ConditionDraws,
    summarizer: &DrawSummarizer,
) -> Result<Vec<Comparison>> {
    summarize_series(&pairwise_series(draws), summarizer)
}

/// Level with the highest median; ties go to the earlier level.
pub fn best_level(draws: &ConditionDraws, summarizer: &DrawSummarizer) -> Result<Option<String>> {
    let mut best: Option<(usize, f64)> = None;
    for (i, values) in draws.values.iter().enumerate() {
        let median = summarizer.summarize(values)?.median;
        if best.is_none_or(|(_, m)| median > m) {
            best = Some((i, median));
        }
    }
    Ok(best.map(|(i, _)| draws.levels[i].clone()))
}

/// Which comparison a [`ContrastSet`] holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContrastKind {
    /// Control mode against the baseline condition
    Baseline,
    /// Control mode against the best-performing condition
    Best,
    Pairwise,
}

impl ContrastKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Baseline => "baseline",
            Self::Best => "best",
            Self::Pairwise => "pairwise",
        }
    }
}

impl fmt::Display for ContrastKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContrastSet {
    pub quantity: Quantity,
    pub kind: ContrastKind,
    /// Reference level in control mode
    pub reference: Option<String>,
    pub comparisons: Vec<Comparison>,
}

/// Baseline, best and pairwise contrasts for one quantity.
///
/// Each pass derives its differences from `draws` independently.
pub fn contrast_sets(
    draws: &ConditionDraws,
    baseline: &str,
    best: &str,
    summarizer: &DrawSummarizer,
) -> Result<Vec<ContrastSet>> {
    let control = |kind: ContrastKind, reference: &str| -> Result<ContrastSet> {
        Ok(ContrastSet {
            quantity: draws.quantity(),
            kind,
            reference: Some(reference.to_string()),
            comparisons: control_contrasts(draws, reference, summarizer)?,
        })
    };

    Ok(vec![
        control(ContrastKind::Baseline, baseline)?,
        control(ContrastKind::Best, best)?,
        ContrastSet {
            quantity: draws.quantity(),
            kind: ContrastKind::Pairwise,
            reference: None,
            comparisons: pairwise_contrasts(draws, summarizer)?,
        },
    ])
}
