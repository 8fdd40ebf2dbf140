//! Prior distributions per coefficient class.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::AnalysisError;

/// Coefficient classes of the beta regression family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PriorClass {
    /// Population-level slopes of the mean model
    #[serde(rename = "b")]
    B,
    /// Mean-model intercept
    Intercept,
    /// Standard deviations of varying effects
    #[serde(rename = "sd")]
    Sd,
    /// Correlations of varying effects
    #[serde(rename = "cor")]
    Cor,
    /// Population-level slopes of the precision model
    #[serde(rename = "b_phi")]
    BPhi,
    /// Precision-model intercept
    #[serde(rename = "Intercept_phi")]
    InterceptPhi,
}

impl PriorClass {
    pub const ALL: [PriorClass; 6] = [
        Self::B,
        Self::Intercept,
        Self::Sd,
        Self::Cor,
        Self::BPhi,
        Self::InterceptPhi,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::B => "b",
            Self::Intercept => "Intercept",
            Self::Sd => "sd",
            Self::Cor => "cor",
            Self::BPhi => "b_phi",
            Self::InterceptPhi => "Intercept_phi",
        }
    }

    /// Support a prior on this class must respect.
    pub const fn required_support(self) -> Support {
        match self {
            Self::Sd => Support::NonNegative,
            Self::Cor => Support::Correlation,
            _ => Support::Real,
        }
    }
}

impl fmt::Display for PriorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PriorClass {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| AnalysisError::UnsupportedPriorClass {
                class: s.to_string(),
            })
    }
}

/// Where a distribution puts its mass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Support {
    Real,
    NonNegative,
    Correlation,
}

/// Prior distribution families understood by the fitting engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum PriorDistribution {
    Normal { mean: f64, sd: f64 },
    StudentT { df: f64, location: f64, scale: f64 },
    Cauchy { location: f64, scale: f64 },
    Exponential { rate: f64 },
    Lkj { eta: f64 },
}

impl PriorDistribution {
    /// Support the distribution provides when used for a class.
    ///
    /// Location-scale families are accepted for standard deviations because
    /// the engine truncates them at zero (half-normal, half-t, half-Cauchy).
    pub fn supports(&self, support: Support) -> bool {
        match (self, support) {
            (Self::Lkj { .. }, Support::Correlation) => true,
            (Self::Lkj { .. }, _) | (_, Support::Correlation) => false,
            (Self::Exponential { .. }, Support::Real) => false,
            _ => true,
        }
    }

    /// Parameter problems, if any (non-positive scales, rates, etc.).
    pub fn parameter_error(&self) -> Option<String> {
        let positive = |name: &str, value: f64| {
            (!(value.is_finite() && value > 0.0))
                .then(|| format!("{name} must be a positive finite number, got {value}"))
        };
        match self {
            Self::Normal { mean, sd } => {
                if !mean.is_finite() {
                    return Some(format!("mean must be finite, got {mean}"));
                }
                positive("sd", *sd)
            }
            Self::StudentT {
                df,
                location,
                scale,
            } => {
                if !location.is_finite() {
                    return Some(format!("location must be finite, got {location}"));
                }
                positive("df", *df).or_else(|| positive("scale", *scale))
            }
            Self::Cauchy { location, scale } => {
                if !location.is_finite() {
                    return Some(format!("location must be finite, got {location}"));
                }
                positive("scale", *scale)
            }
            Self::Exponential { rate } => positive("rate", *rate),
            Self::Lkj { eta } => positive("eta", *eta),
        }
    }
}

impl fmt::Display for PriorDistribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Normal { mean, sd } => write!(f, "normal({mean}, {sd})"),
            Self::StudentT {
                df,
                location,
                scale,
            } => write!(f, "student_t({df}, {location}, {scale})"),
            Self::Cauchy { location, scale } => write!(f, "cauchy({location}, {scale})"),
            Self::Exponential { rate } => write!(f, "exponential({rate})"),
            Self::Lkj { eta } => write!(f, "lkj({eta})"),
        }
    }
}

/// One `class → distribution` assignment.
///
/// The class is kept as written so that an unsupported class surfaces as a
/// validation error instead of a parse failure with a poor message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorSpec {
    pub class: String,
    #[serde(flatten)]
    pub distribution: PriorDistribution,
}

impl PriorSpec {
    pub fn new(class: PriorClass, distribution: PriorDistribution) -> Self {
        Self {
            class: class.as_str().to_string(),
            distribution,
        }
    }

    /// Parsed class, or `UnsupportedPriorClass`.
    pub fn parsed_class(&self) -> Result<PriorClass, AnalysisError> {
        self.class.parse()
    }
}

/// Weakly informative defaults on the logit/log scale.
pub fn default_priors() -> Vec<PriorSpec> {
    vec![
        PriorSpec::new(PriorClass::B, PriorDistribution::Normal { mean: 0.0, sd: 1.0 }),
        PriorSpec::new(
            PriorClass::Intercept,
            PriorDistribution::StudentT {
                df: 3.0,
                location: 0.0,
                scale: 2.5,
            },
        ),
        PriorSpec::new(PriorClass::Sd, PriorDistribution::Exponential { rate: 1.0 }),
        PriorSpec::new(PriorClass::Cor, PriorDistribution::Lkj { eta: 2.0 }),
        PriorSpec::new(PriorClass::BPhi, PriorDistribution::Normal { mean: 0.0, sd: 1.0 }),
        PriorSpec::new(
            PriorClass::InterceptPhi,
            PriorDistribution::StudentT {
                df: 3.0,
                location: 0.0,
                scale: 2.5,
            },
        ),
    ]
}
