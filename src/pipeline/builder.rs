//! Pipeline builder for composing analysis stages.
//!
//! Stages may borrow from the caller (configuration, the fitting engine),
//! so the builder carries the lifetime of those borrows.

use super::stage::{AnyStage, Stage};
use crate::errors::AnalysisError;
use crate::observability::{set_phase, AnalysisPhase};
use crate::progress::quiet_from_env;
use std::any::Any;
use std::marker::PhantomData;
use std::time::{Duration, Instant};

/// Builder for constructing pipelines.
///
/// The builder uses phantom types to track the output type of the pipeline
/// at compile time, enabling type-safe composition.
///
/// # Example
///
/// ```rust,ignore
/// let pipeline = PipelineBuilder::new()
///     .stage(load)       // Output: Vec<RawTrial>
///     .stage(derive)     // Input: Vec<RawTrial>, Output: DerivedDataset
///     .stage(fit)        // Input: DerivedDataset, Output: AnalysisData
///     .build();
/// ```
pub struct PipelineBuilder<'a, T> {
    stages: Vec<Box<dyn AnyStage + 'a>>,
    progress_enabled: bool,
    _phantom: PhantomData<fn() -> T>,
}

impl<'a> PipelineBuilder<'a, ()> {
    /// Create a new empty pipeline builder.
    pub fn new() -> Self {
        Self {
            stages: Vec::new(),
            progress_enabled: false,
            _phantom: PhantomData,
        }
    }
}

impl Default for PipelineBuilder<'_, ()> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, T> PipelineBuilder<'a, T> {
    /// Add a stage to the pipeline.
    ///
    /// The stage's input type must match the current pipeline output type.
    pub fn stage<S>(mut self, stage: S) -> PipelineBuilder<'a, S::Output>
    where
        S: Stage<Input = T> + 'a,
        S::Input: 'static,
        S::Output: 'static,
        S::Error: Into<AnalysisError>,
    {
        self.stages.push(Box::new(stage));
        PipelineBuilder {
            stages: self.stages,
            progress_enabled: self.progress_enabled,
            _phantom: PhantomData,
        }
    }

    /// Log a line per stage as the pipeline runs.
    pub fn with_progress(mut self) -> Self {
        self.progress_enabled = true;
        self
    }

    /// Build the final pipeline ready for execution.
    pub fn build(self) -> BuiltPipeline<'a, T> {
        BuiltPipeline {
            stages: self.stages,
            progress_enabled: self.progress_enabled,
            _phantom: PhantomData,
        }
    }
}

/// A built pipeline ready for execution.
///
/// The pipeline can be executed multiple times.
pub struct BuiltPipeline<'a, T> {
    stages: Vec<Box<dyn AnyStage + 'a>>,
    progress_enabled: bool,
    _phantom: PhantomData<fn() -> T>,
}

impl<T: 'static> BuiltPipeline<'_, T> {
    /// Execute the pipeline.
    ///
    /// The pipeline starts with a unit value `()` and threads data through
    /// each stage sequentially.
    pub fn execute(&self) -> Result<T, AnalysisError> {
        self.execute_with_timing().map(|(result, _)| result)
    }

    /// Execute the pipeline and collect timing information for each stage.
    pub fn execute_with_timing(&self) -> Result<(T, Vec<StageTiming>), AnalysisError> {
        let mut data: Box<dyn Any> = Box::new(());
        let mut timings = Vec::with_capacity(self.stages.len());
        let announce = self.progress_enabled && !quiet_from_env();

        if announce {
            log::info!("Pipeline: {} stages", self.stages.len());
        }

        for (i, stage) in self.stages.iter().enumerate() {
            let _phase = set_phase(stage.phase());
            let span = tracing::info_span!("stage", name = stage.name(), phase = %stage.phase());
            let _entered = span.enter();
            let start = Instant::now();

            if announce {
                log::info!("Stage {}/{}: {}", i + 1, self.stages.len(), stage.name());
            }

            data = stage.execute_any(data)?;

            let elapsed = start.elapsed();
            log::debug!("Stage '{}' finished in {:.2}s", stage.name(), elapsed.as_secs_f64());
            timings.push(StageTiming {
                name: stage.name().to_string(),
                phase: stage.phase(),
                duration: elapsed,
            });
        }

        let result = data
            .downcast::<T>()
            .map(|b| *b)
            .map_err(|_| AnalysisError::Pipeline("pipeline produced the wrong output type".into()))?;

        Ok((result, timings))
    }

    /// Get the number of stages in this pipeline.
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }
}

/// Timing information for a pipeline stage.
#[derive(Debug, Clone)]
pub struct StageTiming {
    /// Name of the stage
    pub name: String,

    pub phase: AnalysisPhase,

    /// Time taken to execute the stage
    pub duration: Duration,
}

impl StageTiming {
    /// Format the timing as a human-readable string.
    pub fn format(&self) -> String {
        format!(
            "{} ({}): {:.2}s",
            self.name,
            self.phase,
            self.duration.as_secs_f64()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::get_current_context;
    use crate::pipeline::stage::FallibleStage;

    fn infallible<I, O>(
        phase: AnalysisPhase,
        name: &str,
        func: impl Fn(I) -> O,
    ) -> impl Stage<Input = I, Output = O, Error = AnalysisError> {
        FallibleStage::new(phase, name, move |input: I| Ok::<O, AnalysisError>(func(input)))
    }

    #[test]
    fn test_pipeline_builder() {
        let pipeline = PipelineBuilder::new()
            .stage(infallible(AnalysisPhase::Load, "Add 1", |()| 1))
            .stage(infallible(AnalysisPhase::Derive, "Double", |x: i32| x * 2))
            .stage(infallible(AnalysisPhase::Render, "To String", |x: i32| {
                x.to_string()
            }))
            .build();

        assert_eq!(pipeline.execute().unwrap(), "2");
    }

    #[test]
    fn test_stages_may_borrow() {
        let offset = 5;
        let pipeline = PipelineBuilder::new()
            .stage(infallible(AnalysisPhase::Load, "Start", |()| 1))
            .stage(infallible(AnalysisPhase::Derive, "Offset", |x: i32| x + offset))
            .build();
        assert_eq!(pipeline.execute().unwrap(), 6);
    }

    #[test]
    fn test_pipeline_timing() {
        let pipeline = PipelineBuilder::new()
            .stage(infallible(AnalysisPhase::Load, "Stage 1", |()| 42))
            .stage(infallible(AnalysisPhase::Fit, "Stage 2", |x: i32| x * 2))
            .build();

        let (result, timings) = pipeline.execute_with_timing().unwrap();

        assert_eq!(result, 84);
        assert_eq!(timings.len(), 2);
        assert_eq!(timings[0].name, "Stage 1");
        assert_eq!(timings[1].phase, AnalysisPhase::Fit);
        assert!(timings[1].format().starts_with("Stage 2 (fit): "));
    }

    #[test]
    fn test_failure_names_stage() {
        let pipeline = PipelineBuilder::new()
            .stage(infallible(AnalysisPhase::Load, "Start", |()| 1))
            .stage(FallibleStage::new(AnalysisPhase::Fit, "Fit", |_: i32| {
                Err::<i32, _>(AnalysisError::Engine("sampler diverged".into()))
            }))
            .stage(infallible(AnalysisPhase::Render, "Render", |x: i32| x))
            .build();

        let err = pipeline.execute().unwrap_err();
        assert_eq!(err.phase(), Some(AnalysisPhase::Fit));
        assert!(err.to_string().contains("sampler diverged"));
    }

    #[test]
    fn test_phase_is_visible_while_stage_runs() {
        let pipeline = PipelineBuilder::new()
            .stage(infallible(AnalysisPhase::Summarize, "Current phase", |()| {
                get_current_context().phase
            }))
            .build();

        assert_eq!(pipeline.execute().unwrap(), Some(AnalysisPhase::Summarize));
        assert_eq!(get_current_context().phase, None);
    }

    #[test]
    fn test_stage_count() {
        let pipeline = PipelineBuilder::new()
            .stage(infallible(AnalysisPhase::Load, "S1", |()| 1))
            .stage(infallible(AnalysisPhase::Derive, "S2", |x: i32| x + 1))
            .stage(infallible(AnalysisPhase::Summarize, "S3", |x: i32| x * 2))
            .build();

        assert_eq!(pipeline.stage_count(), 3);
    }
}
