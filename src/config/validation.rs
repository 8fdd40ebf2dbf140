//! Validation with error accumulation for configuration.
//!
//! Every section is checked independently and all problems are reported
//! together, using the helpers in [`crate::effects`].
//!
//! ```rust
//! use betaviz::config::validation::validate_config;
//! use betaviz::config::BetavizConfig;
//!
//! let validation = validate_config(&BetavizConfig::default());
//! assert!(validation.is_success());
//! ```

use super::core::{BetavizConfig, EngineConfig, RandomEffectsMode, StudyConfig, SummaryConfig};
use crate::effects::{
    combine_validations, run_validation, validation_from_errors, AnalysisValidation,
};
use crate::errors::{AnalysisError, Result};

/// Validate the entire config, accumulating all errors.
pub fn validate_config(config: &BetavizConfig) -> AnalysisValidation<()> {
    let validations = vec![
        validate_study(&config.study),
        validate_summary(&config.summary),
        config.model.spec().validate(),
        validate_engine(&config.engine),
    ];
    combine_validations(validations).map(|_| ())
}

/// Validate config, failing with every accumulated problem.
pub fn validate_config_result(config: &BetavizConfig) -> Result<()> {
    run_validation(validate_config(config))
}

fn is_probability(level: f64) -> bool {
    level > 0.0 && level < 1.0
}

fn validate_study(study: &StudyConfig) -> AnalysisValidation<()> {
    let mut errors = Vec::new();

    if study.max_trial == 0 {
        errors.push(AnalysisError::config("study.max_trial must be at least 1"));
    }
    if study.excluded_scenario.trim().is_empty() {
        errors.push(AnalysisError::config("study.excluded_scenario must not be empty"));
    }
    for level in study.display_levels.iter().filter(|l| !is_probability(**l)) {
        errors.push(AnalysisError::config(format!(
            "study.display_levels: {level} is not in (0, 1)"
        )));
    }
    if !study.display_offset.is_finite() {
        errors.push(AnalysisError::config("study.display_offset must be finite"));
    }

    validation_from_errors(errors)
}

fn validate_summary(summary: &SummaryConfig) -> AnalysisValidation<()> {
    let mut errors = Vec::new();

    if summary.credible_levels.is_empty() {
        errors.push(AnalysisError::config(
            "summary.credible_levels must contain at least one level",
        ));
    }
    for level in summary
        .credible_levels
        .iter()
        .filter(|l| !is_probability(**l))
    {
        errors.push(AnalysisError::config(format!(
            "summary.credible_levels: {level} is not in (0, 1)"
        )));
    }
    if summary.grid_points == 0 {
        errors.push(AnalysisError::config("summary.grid_points must be at least 1"));
    }
    if summary.random_effects == RandomEffectsMode::KnownLevels && summary.known_levels.is_empty() {
        errors.push(AnalysisError::config(
            "summary.known_levels must name a participant or scenario when random_effects = \"known_levels\"",
        ));
    }
    if !(-0.5..=0.5).contains(&summary.final_trial_point) {
        errors.push(AnalysisError::config(format!(
            "summary.final_trial_point {} is outside [-0.5, 0.5]",
            summary.final_trial_point
        )));
    }

    validation_from_errors(errors)
}

fn validate_engine(engine: &EngineConfig) -> AnalysisValidation<()> {
    if engine.command.trim().is_empty() {
        validation_from_errors(vec![AnalysisError::config("engine.command must not be empty")])
    } else {
        validation_from_errors(Vec::new())
    }
}
