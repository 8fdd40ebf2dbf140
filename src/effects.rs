//! Validation helpers with error accumulation.
//!
//! Configuration and model specifications are checked with stillwater's
//! `Validation` so that a user sees *every* problem in one run instead of
//! fixing them one at a time.
//!
//! # Example
//!
//! ```rust
//! use betaviz::effects::{combine_validations, validation_failure, validation_success};
//! use betaviz::errors::AnalysisError;
//!
//! let validations = vec![
//!     validation_success(1),
//!     validation_failure(AnalysisError::config("first problem")),
//!     validation_failure(AnalysisError::config("second problem")),
//! ];
//! let combined = combine_validations(validations);
//! assert!(combined.is_failure());
//! ```

use stillwater::{NonEmptyVec, Validation};

use crate::errors::{format_error_list, AnalysisError};

/// Non-empty collection of accumulated errors.
pub type AnalysisErrors = NonEmptyVec<AnalysisError>;

/// Validation result that accumulates every error.
pub type AnalysisValidation<T> = Validation<T, AnalysisErrors>;

/// Create a successful validation result.
pub fn validation_success<T>(value: T) -> AnalysisValidation<T> {
    Validation::Success(value)
}

/// Create a failed validation result with a single error.
pub fn validation_failure<T>(error: AnalysisError) -> AnalysisValidation<T> {
    Validation::Failure(NonEmptyVec::new(error, Vec::new()))
}

/// Create a validation from a list of errors; empty means success.
pub fn validation_from_errors(errors: Vec<AnalysisError>) -> AnalysisValidation<()> {
    match NonEmptyVec::from_vec(errors) {
        Some(nev) => Validation::Failure(nev),
        None => Validation::Success(()),
    }
}

/// Combine multiple validations, accumulating all errors.
pub fn combine_validations<T>(validations: Vec<AnalysisValidation<T>>) -> AnalysisValidation<Vec<T>> {
    let mut successes = Vec::new();
    let mut failures: Vec<AnalysisError> = Vec::new();

    for v in validations {
        match v {
            Validation::Success(value) => successes.push(value),
            Validation::Failure(errors) => failures.extend(errors.into_vec()),
        }
    }

    match NonEmptyVec::from_vec(failures) {
        Some(nev) => Validation::Failure(nev),
        None => Validation::Success(successes),
    }
}

/// Collapse a validation into a plain result.
///
/// A single error is returned as-is so callers can still match on its
/// variant; several errors are folded into one specification error listing
/// all of them.
pub fn run_validation<T>(validation: AnalysisValidation<T>) -> Result<T, AnalysisError> {
    match validation {
        Validation::Success(value) => Ok(value),
        Validation::Failure(errors) => {
            let mut errors = errors.into_vec();
            if errors.len() == 1 {
                Err(errors.remove(0))
            } else {
                Err(AnalysisError::specification(
                    "",
                    format!(
                        "{} problems found:\n{}",
                        errors.len(),
                        format_error_list(&errors)
                    ),
                ))
            }
        }
    }
}
