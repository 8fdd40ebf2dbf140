//! Pipeline stage abstractions for composable analysis workflows.
//!
//! A stage is one step of the analysis (loading, deriving, fitting,
//! summarizing or rendering). Each stage declares the [`AnalysisPhase`] it
//! belongs to so that failures and crash reports name the step that
//! produced them.

use crate::errors::AnalysisError;
use crate::observability::AnalysisPhase;
use std::any::Any;
use std::marker::PhantomData;

/// A pipeline stage that transforms data.
///
/// Stages are the building blocks of analysis pipelines. Each stage has:
/// - An input type (what data it expects)
/// - An output type (what data it produces)
/// - An error type (how it can fail)
///
/// # Type Safety
///
/// The builder only accepts a stage whose input type matches the output of
/// the previous one:
/// ```rust,ignore
/// PipelineBuilder::new()
///     .stage(load)    // Input: (), Output: Vec<RawTrial>
///     .stage(derive)  // Input: Vec<RawTrial>, Output: DerivedDataset - OK!
///     .stage(render)  // Input: StudyReport - Compile error!
/// ```
pub trait Stage {
    type Input;
    type Output;
    type Error;

    /// Execute this stage with the given input.
    fn execute(&self, input: Self::Input) -> Result<Self::Output, Self::Error>;

    /// Get the stage name for progress reporting.
    fn name(&self) -> &str;

    /// Analysis phase errors from this stage are attributed to.
    fn phase(&self) -> AnalysisPhase;
}

/// A stage that can fail with an error.
///
/// # Example
///
/// ```rust,ignore
/// let stage = FallibleStage::new(AnalysisPhase::Derive, "Derive features", |raw| {
///     derive_trials(raw, &config.study)
/// });
/// ```
pub struct FallibleStage<F, I, O, E> {
    phase: AnalysisPhase,
    name: String,
    func: F,
    _phantom: PhantomData<fn(I) -> Result<O, E>>,
}

impl<F, I, O, E> FallibleStage<F, I, O, E>
where
    F: Fn(I) -> Result<O, E>,
{
    /// Create a new fallible stage with a name and function.
    pub fn new(phase: AnalysisPhase, name: impl Into<String>, func: F) -> Self {
        Self {
            phase,
            name: name.into(),
            func,
            _phantom: PhantomData,
        }
    }
}

impl<F, I, O, E> Stage for FallibleStage<F, I, O, E>
where
    F: Fn(I) -> Result<O, E>,
{
    type Input = I;
    type Output = O;
    type Error = E;

    fn execute(&self, input: Self::Input) -> Result<Self::Output, Self::Error> {
        (self.func)(input)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn phase(&self) -> AnalysisPhase {
        self.phase
    }
}

/// Type-erased stage for dynamic dispatch.
///
/// Lets stages of different types live in one collection. Used internally
/// by the pipeline builder.
pub(crate) trait AnyStage {
    fn execute_any(&self, input: Box<dyn Any>) -> Result<Box<dyn Any>, AnalysisError>;
    fn name(&self) -> &str;
    fn phase(&self) -> AnalysisPhase;
}

impl<S> AnyStage for S
where
    S: Stage,
    S::Input: 'static,
    S::Output: 'static,
    S::Error: Into<AnalysisError>,
{
    fn execute_any(&self, input: Box<dyn Any>) -> Result<Box<dyn Any>, AnalysisError> {
        let typed_input = input.downcast::<S::Input>().map_err(|_| {
            AnalysisError::Pipeline(format!("stage '{}' received the wrong input type", self.name()))
        })?;

        let output = self
            .execute(*typed_input)
            .map_err(|e| e.into().in_stage(Stage::phase(self)))?;
        Ok(Box::new(output))
    }

    fn name(&self) -> &str {
        Stage::name(self)
    }

    fn phase(&self) -> AnalysisPhase {
        Stage::phase(self)
    }
}
