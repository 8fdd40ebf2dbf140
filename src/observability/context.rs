//! Thread-local context tracking for crash reports.
//!
//! Records which pipeline stage is running and which input is being worked
//! on, so a panic deep inside summarization or rendering still tells the
//! user where it happened.
//!
//! Context guards use RAII for automatic cleanup on drop.

use std::cell::RefCell;
use std::path::PathBuf;

use serde::Serialize;

thread_local! {
    static CURRENT_CONTEXT: RefCell<AnalysisContext> = const { RefCell::new(AnalysisContext::new()) };
}

/// Context snapshot for the current analysis operation.
#[derive(Debug, Clone, Default)]
pub struct AnalysisContext {
    /// Current pipeline stage
    pub phase: Option<AnalysisPhase>,
    /// Input file currently being processed
    pub current_file: Option<PathBuf>,
}

impl AnalysisContext {
    /// Create a new empty context.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            phase: None,
            current_file: None,
        }
    }
}

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisPhase {
    /// Reading raw trial records
    Load,
    /// Computing derived fields and filtering
    Derive,
    /// Fitting the model or loading a persisted posterior
    Fit,
    /// Building grids, summarizing draws and computing contrasts
    Summarize,
    /// Writing charts and reports
    Render,
}

impl AnalysisPhase {
    /// Stage name as shown to users.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Load => "load",
            Self::Derive => "derive",
            Self::Fit => "fit",
            Self::Summarize => "summarize",
            Self::Render => "render",
        }
    }
}

impl std::fmt::Display for AnalysisPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// RAII guard for restoring analysis context on drop.
pub struct ContextGuard {
    previous: AnalysisContext,
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        CURRENT_CONTEXT.with(|ctx| {
            *ctx.borrow_mut() = self.previous.clone();
        });
    }
}

/// Set the current pipeline stage.
///
/// Returns a guard that restores the previous stage on drop.
#[must_use]
pub fn set_phase(phase: AnalysisPhase) -> ContextGuard {
    CURRENT_CONTEXT.with(|ctx| {
        let previous = ctx.borrow().clone();
        ctx.borrow_mut().phase = Some(phase);
        ContextGuard { previous }
    })
}

/// Set the input file currently being processed.
#[must_use]
pub fn set_current_file(path: impl Into<PathBuf>) -> ContextGuard {
    CURRENT_CONTEXT.with(|ctx| {
        let previous = ctx.borrow().clone();
        ctx.borrow_mut().current_file = Some(path.into());
        ContextGuard { previous }
    })
}

/// Get the current context snapshot.
#[must_use]
pub fn get_current_context() -> AnalysisContext {
    CURRENT_CONTEXT.with(|ctx| ctx.borrow().clone())
}

/// Reset the current thread's context to empty.
pub fn reset_context() {
    CURRENT_CONTEXT.with(|ctx| {
        *ctx.borrow_mut() = AnalysisContext::new();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_guard_restores_previous() {
        reset_context();

        let _outer = set_phase(AnalysisPhase::Derive);
        {
            let _inner = set_phase(AnalysisPhase::Fit);
            assert_eq!(get_current_context().phase, Some(AnalysisPhase::Fit));
        }
        assert_eq!(get_current_context().phase, Some(AnalysisPhase::Derive));
    }

    #[test]
    fn test_file_and_phase_nest() {
        reset_context();

        let _phase = set_phase(AnalysisPhase::Load);
        let _file = set_current_file("data/trials.csv");

        let ctx = get_current_context();
        assert_eq!(ctx.phase, Some(AnalysisPhase::Load));
        assert_eq!(ctx.current_file, Some(PathBuf::from("data/trials.csv")));
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(AnalysisPhase::Load.to_string(), "load");
        assert_eq!(AnalysisPhase::Derive.to_string(), "derive");
        assert_eq!(AnalysisPhase::Fit.to_string(), "fit");
        assert_eq!(AnalysisPhase::Summarize.to_string(), "summarize");
        assert_eq!(AnalysisPhase::Render.to_string(), "render");
    }

    #[test]
    fn test_empty_context_by_default() {
        reset_context();
        let ctx = get_current_context();
        assert!(ctx.phase.is_none());
        assert!(ctx.current_file.is_none());
    }
}
