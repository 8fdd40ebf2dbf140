//! Model specification: formula, priors and sampler controls.
//!
//! The specification is a pass-through descriptor for the fitting engine.
//! Nothing here runs a computation; [`ModelSpec::validate`] only checks
//! that the pieces are consistent with each other, accumulating every
//! problem so the user sees all of them before an expensive fit starts.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::formula::Formula;
use super::priors::{default_priors, PriorClass, PriorSpec};
use crate::effects::{run_validation, validation_from_errors, AnalysisValidation};
use crate::errors::AnalysisError;

/// Sampler control settings handed to the fitting engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerControls {
    /// Independent chains
    pub chains: u32,
    /// Warmup iterations per chain
    pub warmup: u32,
    /// Post-warmup iterations per chain
    pub iterations: u32,
    /// Keep every `thin`-th post-warmup draw
    pub thin: u32,
    /// Target acceptance rate
    pub adapt_delta: f64,
    pub max_treedepth: u32,
    /// Initial step size
    pub step_size: f64,
    pub seed: Option<u64>,
}

impl Default for SamplerControls {
    fn default() -> Self {
        Self {
            chains: 4,
            warmup: 2000,
            iterations: 2000,
            thin: 2,
            adapt_delta: 0.9995,
            max_treedepth: 15,
            step_size: 0.005,
            seed: None,
        }
    }
}

impl SamplerControls {
    fn errors(&self) -> Vec<AnalysisError> {
        let mut errors = Vec::new();
        let mut check = |ok: bool, field: &str, message: String| {
            if !ok {
                errors.push(AnalysisError::specification(format!("sampler.{field}"), message));
            }
        };
        check(self.chains >= 1, "chains", "at least one chain is required".into());
        check(
            self.iterations >= 1,
            "iterations",
            "at least one post-warmup iteration is required".into(),
        );
        check(self.thin >= 1, "thin", "thinning must be at least 1".into());
        check(
            self.thin <= self.iterations.max(1),
            "thin",
            format!(
                "thinning interval {} leaves no draws from {} iterations",
                self.thin, self.iterations
            ),
        );
        check(
            self.adapt_delta > 0.0 && self.adapt_delta < 1.0,
            "adapt_delta",
            format!("must be in (0, 1), got {}", self.adapt_delta),
        );
        check(
            self.max_treedepth >= 1,
            "max_treedepth",
            "must be at least 1".into(),
        );
        check(
            self.step_size.is_finite() && self.step_size > 0.0,
            "step_size",
            format!("must be positive, got {}", self.step_size),
        );
        errors
    }
}

/// Complete description of the model to fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    #[serde(default)]
    pub formula: Formula,
    #[serde(default = "default_priors")]
    pub priors: Vec<PriorSpec>,
    #[serde(default)]
    pub sampler: SamplerControls,
}

impl Default for ModelSpec {
    fn default() -> Self {
        Self {
            formula: Formula::default(),
            priors: default_priors(),
            sampler: SamplerControls::default(),
        }
    }
}

impl ModelSpec {
    /// Parameter classes the formula gives the model.
    pub fn used_classes(&self) -> BTreeSet<PriorClass> {
        let mut classes = BTreeSet::from([PriorClass::Intercept, PriorClass::InterceptPhi]);
        if self.formula.mean.has_slopes() {
            classes.insert(PriorClass::B);
        }
        if self.formula.precision.has_slopes() {
            classes.insert(PriorClass::BPhi);
        }
        if !self.formula.groups.is_empty() {
            classes.insert(PriorClass::Sd);
        }
        if self.formula.has_varying_slope() {
            classes.insert(PriorClass::Cor);
        }
        classes
    }

    /// Classes used by the formula that have no explicit prior; the
    /// engine's defaults apply to them.
    pub fn classes_without_prior(&self) -> Vec<PriorClass> {
        let assigned: BTreeSet<PriorClass> = self
            .priors
            .iter()
            .filter_map(|p| p.parsed_class().ok())
            .collect();
        self.used_classes()
            .into_iter()
            .filter(|c| !assigned.contains(c))
            .collect()
    }

    /// Check internal consistency, accumulating every problem.
    pub fn validate(&self) -> AnalysisValidation<()> {
        let used = self.used_classes();
        let mut errors = Vec::new();
        let mut seen = BTreeSet::new();

        for (i, prior) in self.priors.iter().enumerate() {
            let path = format!("priors[{i}]");
            let class = match prior.parsed_class() {
                Ok(class) => class,
                Err(e) => {
                    errors.push(e);
                    continue;
                }
            };
            if !seen.insert(class) {
                errors.push(AnalysisError::specification(
                    &path,
                    format!("duplicate prior for class '{class}'"),
                ));
            }
            if !used.contains(&class) {
                errors.push(AnalysisError::specification(
                    &path,
                    format!("class '{class}' is not part of the formula '{}'", self.formula),
                ));
            }
            if !prior.distribution.supports(class.required_support()) {
                errors.push(AnalysisError::specification(
                    &path,
                    format!(
                        "{} cannot be used as a prior for class '{class}'",
                        prior.distribution
                    ),
                ));
            }
            if let Some(problem) = prior.distribution.parameter_error() {
                errors.push(AnalysisError::specification(&path, problem));
            }
        }

        errors.extend(self.sampler.errors());
        validation_from_errors(errors)
    }

    /// Validate and return the specification, or the accumulated errors.
    pub fn validated(self) -> Result<Self, AnalysisError> {
        run_validation(self.validate())?;
        for class in self.classes_without_prior() {
            log::warn!("No prior for class '{}'; the engine default applies", class);
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::formula::{GroupTerm, GroupingFactor};
    use crate::model::priors::PriorDistribution;

    #[test]
    fn test_default_spec_is_valid() {
        assert!(ModelSpec::default().validate().is_success());
        assert!(ModelSpec::default().classes_without_prior().is_empty());
    }

    #[test]
    fn test_default_sampler_controls() {
        let controls = SamplerControls::default();
        assert_eq!((controls.chains, controls.warmup, controls.iterations), (4, 2000, 2000));
        assert_eq!(controls.thin, 2);
    }

    #[test]
    fn test_unsupported_class_is_fatal() {
        let mut spec = ModelSpec::default();
        spec.priors.push(PriorSpec {
            class: "sigma".into(),
            distribution: PriorDistribution::Exponential { rate: 1.0 },
        });
        let err = spec.validated().unwrap_err();
        assert!(matches!(err, AnalysisError::UnsupportedPriorClass { .. }));
    }

    #[test]
    fn test_cor_prior_without_slopes_is_rejected() {
        let mut spec = ModelSpec::default();
        spec.formula.groups = vec![GroupTerm {
            factor: GroupingFactor::Participant,
            slope: false,
        }];
        let err = spec.validated().unwrap_err();
        assert!(err.to_string().contains("'cor' is not part of the formula"));
    }

    #[test]
    fn test_errors_accumulate() {
        let mut spec = ModelSpec::default();
        spec.sampler.thin = 0;
        spec.sampler.adapt_delta = 1.5;
        spec.priors[0].distribution = PriorDistribution::Lkj { eta: 1.0 };

        let err = spec.validated().unwrap_err();
        let text = err.to_string();
        assert!(text.contains("3 problems found") || text.contains("4 problems found"));
        assert!(text.contains("sampler.thin"));
        assert!(text.contains("sampler.adapt_delta"));
        assert!(text.contains("lkj(1)"));
    }

    #[test]
    fn test_missing_prior_reported_not_fatal() {
        let mut spec = ModelSpec::default();
        spec.priors.retain(|p| p.class != "sd");
        assert_eq!(spec.classes_without_prior(), vec![PriorClass::Sd]);
        assert!(spec.validated().is_ok());
    }
}
