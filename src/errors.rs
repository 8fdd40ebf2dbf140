//! Error types for betaviz analysis operations.
//!
//! Every error that can escape a pipeline stage carries enough context to
//! tell the user *which* stage failed and *which* invariant was violated.
//! A long-running analysis should never blame the expensive fitting step for
//! a problem that was already present in the input data.
//!
//! # Categories
//!
//! - Load errors: unreadable files, missing columns, malformed rows
//! - Precondition violations: fatal data-integrity checks (e.g. max trial)
//! - Specification errors: inconsistent model formula / prior / sampler setup
//! - Artifact errors: missing, stale or corrupt posterior artifacts
//! - Engine errors: the external fitting engine failed or is unavailable
//! - Posterior errors: queries the sample store cannot answer
//! - Render errors: chart or report output failures

use std::path::PathBuf;
use thiserror::Error;

use crate::observability::AnalysisPhase;

/// Convenient result alias used throughout the library.
pub type Result<T, E = AnalysisError> = std::result::Result<T, E>;

/// Main error type for betaviz operations
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// File system errors with path context
    #[error("I/O error: {message} (path: {})", path.display())]
    Io {
        message: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Required input columns are absent
    #[error("Missing required column(s) in {}: {}", path.display(), columns.join(", "))]
    MissingColumns { path: PathBuf, columns: Vec<String> },

    /// Malformed delimited input
    #[error("CSV error in {}{}: {message}", path.display(), line.map(|l| format!(" at line {l}")).unwrap_or_default())]
    Csv {
        path: PathBuf,
        line: Option<u64>,
        message: String,
    },

    /// A fatal data-integrity check failed
    #[error("Precondition violated during {phase} [{invariant}]: {message}")]
    Precondition {
        phase: AnalysisPhase,
        invariant: &'static str,
        message: String,
    },

    /// The model specification is internally inconsistent
    #[error("Invalid model specification at {path}: {message}")]
    Specification { path: String, message: String },

    /// A prior targets a parameter class the beta family does not have
    #[error("Prior class '{class}' is not supported by the beta regression family")]
    UnsupportedPriorClass { class: String },

    /// No persisted artifact exists at the configured path
    #[error("Posterior artifact not found at {}; a fresh fit is required", path.display())]
    ArtifactMissing { path: PathBuf },

    /// The persisted artifact was fitted for a different model or dataset
    #[error("Posterior artifact at {} is stale (expected fingerprint {expected}, found {found}); a fresh fit is required", path.display())]
    ArtifactStale {
        path: PathBuf,
        expected: String,
        found: String,
    },

    /// The persisted artifact could not be decoded
    #[error("Corrupt posterior artifact at {}: {message}", path.display())]
    ArtifactCorrupt { path: PathBuf, message: String },

    /// The configured fitting engine could not be located
    #[error("Fitting engine '{command}' is not available: {message}")]
    EngineUnavailable { command: String, message: String },

    /// The fitting engine ran but did not produce a usable result
    #[error("Fitting engine failed: {0}")]
    Engine(String),

    /// The sample store cannot answer a query
    #[error("Posterior error: {0}")]
    Posterior(String),

    /// Configuration file or CLI override problems
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        path: Option<PathBuf>,
    },

    /// Chart or report rendering failures
    #[error("Render error: {0}")]
    Render(String),

    /// Stages were wired with mismatched input and output types
    #[error("Pipeline wiring error: {0}")]
    Pipeline(String),

    /// Any error, tagged with the pipeline stage it surfaced from
    #[error("Stage '{phase}' failed: {source}")]
    InStage {
        phase: AnalysisPhase,
        #[source]
        source: Box<AnalysisError>,
    },

    /// JSON errors
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl AnalysisError {
    /// Create an I/O error with path context
    pub fn io(message: impl Into<String>, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            path: path.into(),
            source,
        }
    }

    /// Create a precondition violation for a stage
    pub fn precondition(
        phase: AnalysisPhase,
        invariant: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self::Precondition {
            phase,
            invariant,
            message: message.into(),
        }
    }

    /// Create a specification error at a field path
    pub fn specification(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Specification {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            path: None,
        }
    }

    /// Create a configuration error with path context
    pub fn config_with_path(message: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self::Config {
            message: message.into(),
            path: Some(path.into()),
        }
    }

    /// Create a posterior query error
    pub fn posterior(message: impl Into<String>) -> Self {
        Self::Posterior(message.into())
    }

    /// Tag this error with the stage it surfaced from.
    ///
    /// Errors already tagged keep their original stage.
    pub fn in_stage(self, phase: AnalysisPhase) -> Self {
        match self {
            tagged @ Self::InStage { .. } => tagged,
            other => Self::InStage {
                phase,
                source: Box::new(other),
            },
        }
    }

    /// The stage this error is attributed to, if known.
    pub fn phase(&self) -> Option<AnalysisPhase> {
        match self {
            Self::InStage { phase, .. } | Self::Precondition { phase, .. } => Some(*phase),
            Self::MissingColumns { .. } | Self::Csv { .. } => Some(AnalysisPhase::Load),
            Self::Specification { .. }
            | Self::UnsupportedPriorClass { .. }
            | Self::ArtifactMissing { .. }
            | Self::ArtifactStale { .. }
            | Self::ArtifactCorrupt { .. }
            | Self::EngineUnavailable { .. }
            | Self::Engine(_) => Some(AnalysisPhase::Fit),
            Self::Posterior(_) => Some(AnalysisPhase::Summarize),
            Self::Render(_) => Some(AnalysisPhase::Render),
            Self::Io { .. } | Self::Config { .. } | Self::Json(_) | Self::Pipeline(_) => None,
        }
    }

    /// The innermost error, with stage tags removed.
    pub fn root(&self) -> &AnalysisError {
        match self {
            Self::InStage { source, .. } => source.root(),
            other => other,
        }
    }

    /// Get the error category name.
    pub fn category(&self) -> &'static str {
        match self.root() {
            Self::Io { .. } => "I/O",
            Self::MissingColumns { .. } | Self::Csv { .. } => "Load",
            Self::Precondition { .. } => "Precondition",
            Self::Specification { .. } | Self::UnsupportedPriorClass { .. } => "Specification",
            Self::ArtifactMissing { .. }
            | Self::ArtifactStale { .. }
            | Self::ArtifactCorrupt { .. } => "Artifact",
            Self::EngineUnavailable { .. } | Self::Engine(_) => "Engine",
            Self::Posterior(_) => "Posterior",
            Self::Config { .. } => "Config",
            Self::Render(_) => "Render",
            Self::Json(_) => "Serialization",
            Self::Pipeline(_) => "Pipeline",
            Self::InStage { .. } => "Error",
        }
    }

    /// Check whether a fresh fit would resolve this error.
    ///
    /// Missing and stale artifacts are recoverable: the pipeline may fit the
    /// model instead of failing. Everything else is fatal.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self.root(),
            Self::ArtifactMissing { .. } | Self::ArtifactStale { .. }
        )
    }
}

/// Format a list of errors for display.
///
/// Used when a validation pass accumulated several problems at once.
pub fn format_error_list(errors: &[AnalysisError]) -> String {
    errors
        .iter()
        .enumerate()
        .map(|(i, e)| format!("  {}. {}", i + 1, e))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precondition_names_stage_and_invariant() {
        let err = AnalysisError::precondition(
            AnalysisPhase::Derive,
            "max_trial",
            "observed maximum trial 38 does not match expected 39",
        );
        let text = err.to_string();
        assert!(text.contains("derive"));
        assert!(text.contains("[max_trial]"));
        assert_eq!(err.phase(), Some(AnalysisPhase::Derive));
        assert_eq!(err.category(), "Precondition");
    }

    #[test]
    fn test_in_stage_keeps_first_tag() {
        let err = AnalysisError::posterior("unknown level")
            .in_stage(AnalysisPhase::Summarize)
            .in_stage(AnalysisPhase::Render);
        assert_eq!(err.phase(), Some(AnalysisPhase::Summarize));
        assert_eq!(err.category(), "Posterior");
    }

    #[test]
    fn test_recoverable_artifact_errors() {
        let missing = AnalysisError::ArtifactMissing {
            path: PathBuf::from("models/fit.bin"),
        };
        assert!(missing.is_recoverable());
        assert!(missing.in_stage(AnalysisPhase::Fit).is_recoverable());

        let corrupt = AnalysisError::ArtifactCorrupt {
            path: PathBuf::from("models/fit.bin"),
            message: "truncated".into(),
        };
        assert!(!corrupt.is_recoverable());
    }

    #[test]
    fn test_csv_error_line_formatting() {
        let err = AnalysisError::Csv {
            path: PathBuf::from("data.csv"),
            line: Some(12),
            message: "invalid digit".into(),
        };
        assert_eq!(
            err.to_string(),
            "CSV error in data.csv at line 12: invalid digit"
        );
    }

    #[test]
    fn test_format_error_list() {
        let errors = vec![
            AnalysisError::config("bad level"),
            AnalysisError::UnsupportedPriorClass {
                class: "sigma".into(),
            },
        ];
        let formatted = format_error_list(&errors);
        assert!(formatted.contains("1. Configuration error"));
        assert!(formatted.contains("2. Prior class 'sigma'"));
    }
}
