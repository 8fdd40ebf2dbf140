//! Data flowing through the analysis pipeline.
//!
//! [`AnalysisData`] accumulates results as stages run:
//! 1. Derive → populates `dataset`
//! 2. Fit → populates `coding` and `fit`
//! 3. Summarize → populates `report`
//! 4. Render → populates `figures`
//!
//! Each stage adds its results without modifying what earlier stages
//! produced.

use std::path::PathBuf;

use crate::analysis::StudyReport;
use crate::data::DerivedDataset;
use crate::errors::{AnalysisError, Result};
use crate::model::ConditionCoding;
use crate::posterior::FitOutcome;

#[derive(Debug, Clone)]
pub struct AnalysisData {
    /// Filtered trials with derived fields
    pub dataset: DerivedDataset,

    /// Dummy coding of the condition factor used by the fit
    pub coding: Option<ConditionCoding>,

    /// Posterior draws and where they came from
    pub fit: Option<FitOutcome>,

    pub report: Option<StudyReport>,

    /// Chart files written by the render stage
    pub figures: Vec<PathBuf>,
}

impl AnalysisData {
    pub fn new(dataset: DerivedDataset) -> Self {
        Self {
            dataset,
            coding: None,
            fit: None,
            report: None,
            figures: Vec::new(),
        }
    }

    pub fn with_fit(mut self, coding: ConditionCoding, fit: FitOutcome) -> Self {
        self.coding = Some(coding);
        self.fit = Some(fit);
        self
    }

    pub fn with_report(mut self, report: StudyReport) -> Self {
        self.report = Some(report);
        self
    }

    pub fn with_figures(mut self, figures: Vec<PathBuf>) -> Self {
        self.figures = figures;
        self
    }

    /// The fit, or an error naming the missing stage.
    pub fn require_fit(&self) -> Result<&FitOutcome> {
        self.fit
            .as_ref()
            .ok_or_else(|| AnalysisError::Pipeline("no posterior: the fit stage did not run".into()))
    }

    pub fn require_report(&self) -> Result<&StudyReport> {
        self.report.as_ref().ok_or_else(|| {
            AnalysisError::Pipeline("no report: the summarize stage did not run".into())
        })
    }

    /// Consume the data and return the report.
    pub fn into_report(self) -> Result<StudyReport> {
        self.report.ok_or_else(|| {
            AnalysisError::Pipeline("no report: the summarize stage did not run".into())
        })
    }
}
