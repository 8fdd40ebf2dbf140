//! Regression formula for the beta model and the coefficient naming scheme.
//!
//! Coefficient names follow the `as_draws_df` layout produced by brms so
//! that draws exported from an R session can be imported unchanged:
//!
//! ```text
//! b_Intercept  b_visbars  b_trial_normalized  b_visbars:trial_normalized
//! b_phi_Intercept  b_phi_visbars  b_phi_trial_normalized
//! r_participant[p01,Intercept]  r_participant[p01,trial_normalized]
//! sd_participant__Intercept  cor_participant__Intercept__trial_normalized
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Column holding the modeled response.
pub const RESPONSE_COLUMN: &str = "response_ratio_adjusted";
/// Column holding the experimental condition.
pub const CONDITION_COLUMN: &str = "vis";
/// Column holding the normalized trial covariate.
pub const TRIAL_COLUMN: &str = "trial_normalized";
/// Name of the intercept term.
pub const INTERCEPT: &str = "Intercept";

/// Distributional parameter a linear predictor belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dpar {
    /// Mean of the beta response (logit link)
    Mu,
    /// Precision of the beta response (log link)
    Phi,
}

/// Grouping factors available for varying effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupingFactor {
    Participant,
    Scenario,
}

impl GroupingFactor {
    /// Data column the factor is read from.
    pub const fn column(self) -> &'static str {
        match self {
            Self::Participant => "participant",
            Self::Scenario => "scenario",
        }
    }
}

impl fmt::Display for GroupingFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// Population-level terms of one linear predictor.
///
/// The intercept is always present. `interaction` only has an effect when
/// both `condition` and `trial` are enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinearTerms {
    #[serde(default)]
    pub condition: bool,
    #[serde(default)]
    pub trial: bool,
    #[serde(default)]
    pub interaction: bool,
}

impl LinearTerms {
    /// Whether the condition × trial interaction enters the predictor.
    pub fn has_interaction(&self) -> bool {
        self.interaction && self.condition && self.trial
    }

    /// Whether any population-level slope (beyond the intercept) is present.
    pub fn has_slopes(&self) -> bool {
        self.condition || self.trial
    }

    fn rhs(&self) -> String {
        match (self.condition, self.trial, self.has_interaction()) {
            (true, true, true) => format!("{CONDITION_COLUMN} * {TRIAL_COLUMN}"),
            (true, true, false) => format!("{CONDITION_COLUMN} + {TRIAL_COLUMN}"),
            (true, false, _) => CONDITION_COLUMN.to_string(),
            (false, true, _) => TRIAL_COLUMN.to_string(),
            (false, false, _) => "1".to_string(),
        }
    }
}

/// A varying intercept (and optionally a varying trial slope) per group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupTerm {
    pub factor: GroupingFactor,
    #[serde(default)]
    pub slope: bool,
}

impl GroupTerm {
    /// Coefficient names that vary by group, in brms order.
    pub fn coefficients(&self) -> Vec<&'static str> {
        if self.slope {
            vec![INTERCEPT, TRIAL_COLUMN]
        } else {
            vec![INTERCEPT]
        }
    }
}

/// Declarative model formula: mean model with varying effects plus a
/// precision model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Formula {
    #[serde(default = "default_mean_terms")]
    pub mean: LinearTerms,
    #[serde(default = "default_groups")]
    pub groups: Vec<GroupTerm>,
    #[serde(default = "default_precision_terms")]
    pub precision: LinearTerms,
}

fn default_mean_terms() -> LinearTerms {
    LinearTerms {
        condition: true,
        trial: true,
        interaction: true,
    }
}

fn default_precision_terms() -> LinearTerms {
    LinearTerms {
        condition: true,
        trial: true,
        interaction: false,
    }
}

fn default_groups() -> Vec<GroupTerm> {
    vec![
        GroupTerm {
            factor: GroupingFactor::Participant,
            slope: true,
        },
        GroupTerm {
            factor: GroupingFactor::Scenario,
            slope: true,
        },
    ]
}

impl Default for Formula {
    fn default() -> Self {
        Self {
            mean: default_mean_terms(),
            groups: default_groups(),
            precision: default_precision_terms(),
        }
    }
}

impl Formula {
    /// Terms for the given distributional parameter.
    pub fn terms(&self, dpar: Dpar) -> &LinearTerms {
        match dpar {
            Dpar::Mu => &self.mean,
            Dpar::Phi => &self.precision,
        }
    }

    /// Whether any grouping term has both an intercept and a slope, which is
    /// what gives the model correlation parameters.
    pub fn has_varying_slope(&self) -> bool {
        self.groups.iter().any(|g| g.slope)
    }

    /// Grouping term for a factor, if the formula has one.
    pub fn group(&self, factor: GroupingFactor) -> Option<&GroupTerm> {
        self.groups.iter().find(|g| g.factor == factor)
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{RESPONSE_COLUMN} ~ {}", self.mean.rhs())?;
        for group in &self.groups {
            let lhs = if group.slope { TRIAL_COLUMN } else { "1" };
            write!(f, " + ({lhs} | {})", group.factor)?;
        }
        write!(f, ", phi ~ {}", self.precision.rhs())
    }
}

/// Strip characters brms drops when building coefficient names from factor
/// levels.
pub fn sanitize_level(level: &str) -> String {
    level
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '.')
        .collect()
}

/// Population-level coefficient name, e.g. `b_phi_visbars`.
pub fn fixed_name(dpar: Dpar, term: &str) -> String {
    match dpar {
        Dpar::Mu => format!("b_{term}"),
        Dpar::Phi => format!("b_phi_{term}"),
    }
}

/// Condition term for a (non-reference) level, e.g. `visbars`.
pub fn condition_term(level: &str) -> String {
    format!("{CONDITION_COLUMN}{}", sanitize_level(level))
}

/// Condition × trial interaction term, e.g. `visbars:trial_normalized`.
pub fn interaction_term(level: &str) -> String {
    format!("{}:{TRIAL_COLUMN}", condition_term(level))
}

/// Group-level coefficient, e.g. `r_participant[p01,Intercept]`.
pub fn varying_name(factor: GroupingFactor, level: &str, coefficient: &str) -> String {
    format!("r_{factor}[{level},{coefficient}]")
}

/// Group standard deviation, e.g. `sd_participant__Intercept`.
pub fn sd_name(factor: GroupingFactor, coefficient: &str) -> String {
    format!("sd_{factor}__{coefficient}")
}

/// Intercept/slope correlation, e.g. `cor_participant__Intercept__trial_normalized`.
pub fn cor_name(factor: GroupingFactor) -> String {
    format!("cor_{factor}__{INTERCEPT}__{TRIAL_COLUMN}")
}
