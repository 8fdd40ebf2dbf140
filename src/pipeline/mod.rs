//! Composable, typed analysis pipeline.
//!
//! - [`stage`]: the `Stage` trait and closure-backed fallible stages
//! - [`builder`]: type-checked composition and timed execution
//! - [`stages`]: load, derive, fit, summarize and render
//! - [`configs`]: the pipelines behind each CLI command
//!
//! Every stage is tagged with an [`AnalysisPhase`](crate::observability::AnalysisPhase);
//! errors leaving a stage carry that phase and the crash reporter shows it.

pub mod builder;
pub mod configs;
pub mod data;
pub mod stage;
pub mod stages;

pub use builder::{BuiltPipeline, PipelineBuilder, StageTiming};
pub use configs::{analysis_pipeline, derive_pipeline, fitting_pipeline, AnalysisOptions};
pub use data::AnalysisData;
pub use stage::{FallibleStage, Stage};
