//! Bayesian beta-regression analysis of a visualization decision-making
//! study.
//!
//! The crate turns raw trial records into posterior summaries and charts:
//! load and derive features, fit (or reuse) a beta regression with varying
//! effects, summarize fitted values on a prediction grid, compare conditions
//! and render the results.

// Export modules for library usage
pub mod analysis;
pub mod cli;
pub mod commands;
pub mod config;
pub mod data;
pub mod effects;
pub mod errors;
pub mod model;
pub mod observability;
pub mod output;
pub mod pipeline;
pub mod posterior;
pub mod progress;

// Re-export commonly used types
pub use crate::analysis::{
    build_report, Comparison, ContrastKind, ContrastSet, DrawSummarizer, PosteriorSummary,
    Quantity, StudyReport,
};
pub use crate::config::{load_config, BetavizConfig};
pub use crate::data::{derive_trials, load_trials, DerivedDataset, DerivedTrial, RawTrial};
pub use crate::errors::{AnalysisError, Result};
pub use crate::model::{ConditionCoding, Formula, ModelSpec};
pub use crate::output::{output_report, OutputFormat, ReportRenderer};
pub use crate::pipeline::{analysis_pipeline, AnalysisData, AnalysisOptions};
pub use crate::posterior::{
    fit_or_load, ExternalEngine, FitOutcome, FitPolicy, FitRequest, FittingEngine,
    PosteriorSampleStore,
};
