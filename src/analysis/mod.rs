//! Posterior analysis: prediction grids, summaries and contrasts.
//!
//! - [`grid`]: condition × trial prediction points
//! - [`summary`]: medians and nested credible intervals of per-draw values
//! - [`contrasts`]: control-mode and pairwise differences between conditions
//! - [`report`]: assembles everything the renderers need

pub mod contrasts;
pub mod grid;
pub mod report;
pub mod summary;

pub use contrasts::{
    best_level, contrast_sets, control_contrasts, control_series, difference_series,
    pairwise_contrasts, pairwise_series, Comparison, ConditionDraws, ContrastKind, ContrastSeries,
    ContrastSet,
};
pub use grid::{fixed_point_grid, linspace, prediction_grid, GridRow};
pub use report::{build_report, ReportInputs, StudyReport, REPORTED_QUANTITIES};
pub use summary::{
    quantile, summarize_grid, CredibleInterval, DrawSummarizer, PosteriorSummary, Quantity,
    RowSummary,
};
