//! Column store of posterior draws and fitted-value queries.
//!
//! Draws are stored one column per parameter, named as in the brms
//! `as_draws_df` export (see [`crate::model::formula`]). Fitted values are
//! computed on the response scale: `mu = logistic(eta_mu)` and
//! `phi = exp(eta_phi)`.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::errors::{AnalysisError, Result};
use crate::model::formula::{
    condition_term, cor_name, fixed_name, interaction_term, sd_name, varying_name, INTERCEPT,
    TRIAL_COLUMN,
};
use crate::model::{ConditionCoding, Dpar, Formula, GroupingFactor};

/// Mean and precision of the beta response for one draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FittedValue {
    pub mu: f64,
    pub phi: f64,
}

impl FittedValue {
    /// Standard deviation of a Beta(mu, phi) response.
    pub fn sd(&self) -> f64 {
        (self.mu * (1.0 - self.mu) / (1.0 + self.phi)).sqrt()
    }
}

/// Population-level covariates of a prediction.
#[derive(Debug, Clone, PartialEq)]
pub struct Covariates {
    pub condition: String,
    pub trial_normalized: f64,
}

impl Covariates {
    pub fn new(condition: impl Into<String>, trial_normalized: f64) -> Self {
        Self {
            condition: condition.into(),
            trial_normalized,
        }
    }
}

/// Per-draw intercept and slope offsets of one unseen group level.
#[derive(Debug, Clone, PartialEq)]
pub struct SampledLevel {
    pub intercept: Vec<f64>,
    pub slope: Vec<f64>,
}

/// How group-level effects enter a fitted value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RandomEffects {
    /// Ignore group-level terms
    #[default]
    PopulationLevel,
    /// Use the draws of observed levels; a level absent from the posterior
    /// is an error
    Known(BTreeMap<GroupingFactor, String>),
    /// Use offsets sampled for unseen levels
    New(BTreeMap<GroupingFactor, SampledLevel>),
}

/// Posterior draws for the beta regression model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StoreRepr")]
pub struct PosteriorSampleStore {
    formula: Formula,
    coding: ConditionCoding,
    parameters: Vec<String>,
    columns: Vec<Vec<f64>>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

/// Serialized layout; field order matches the store's serialized fields.
#[derive(Deserialize)]
struct StoreRepr {
    formula: Formula,
    coding: ConditionCoding,
    parameters: Vec<String>,
    columns: Vec<Vec<f64>>,
}

impl TryFrom<StoreRepr> for PosteriorSampleStore {
    type Error = AnalysisError;

    fn try_from(repr: StoreRepr) -> Result<Self> {
        let columns = repr.parameters.into_iter().zip(repr.columns).collect();
        Self::new(repr.formula, repr.coding, columns)
    }
}

/// One term of a linear predictor: a parameter column times a covariate.
#[derive(Debug, Clone, Copy)]
struct Term {
    column: usize,
    multiplier: f64,
}

impl PosteriorSampleStore {
    /// Build a store from named draw columns.
    ///
    /// Every column must have the same, non-zero number of draws, and every
    /// population-level coefficient the formula implies must be present.
    pub fn new(
        formula: Formula,
        coding: ConditionCoding,
        columns: Vec<(String, Vec<f64>)>,
    ) -> Result<Self> {
        let n_draws = columns.first().map(|(_, c)| c.len()).unwrap_or(0);
        if n_draws == 0 {
            return Err(AnalysisError::posterior("posterior contains no draws"));
        }

        let mut index = HashMap::with_capacity(columns.len());
        let mut parameters = Vec::with_capacity(columns.len());
        let mut values = Vec::with_capacity(columns.len());
        for (i, (name, column)) in columns.into_iter().enumerate() {
            if column.len() != n_draws {
                return Err(AnalysisError::posterior(format!(
                    "parameter '{name}' has {} draws, expected {n_draws}",
                    column.len()
                )));
            }
            if index.insert(name.clone(), i).is_some() {
                return Err(AnalysisError::posterior(format!(
                    "parameter '{name}' appears more than once"
                )));
            }
            parameters.push(name);
            values.push(column);
        }

        let store = Self {
            formula,
            coding,
            parameters,
            columns: values,
            index,
        };

        let missing: Vec<String> = store
            .required_parameters()
            .into_iter()
            .filter(|p| !store.index.contains_key(p))
            .collect();
        if !missing.is_empty() {
            return Err(AnalysisError::posterior(format!(
                "draws lack parameters required by the formula: {}",
                missing.join(", ")
            )));
        }
        Ok(store)
    }

    /// Population-level coefficients the formula implies for this coding.
    pub fn required_parameters(&self) -> Vec<String> {
        let mut names = Vec::new();
        for dpar in [Dpar::Mu, Dpar::Phi] {
            let terms = self.formula.terms(dpar);
            names.push(fixed_name(dpar, INTERCEPT));
            if terms.trial {
                names.push(fixed_name(dpar, TRIAL_COLUMN));
            }
            for level in self.coding.non_reference_levels() {
                if terms.condition {
                    names.push(fixed_name(dpar, &condition_term(level)));
                }
                if terms.has_interaction() {
                    names.push(fixed_name(dpar, &interaction_term(level)));
                }
            }
        }
        names
    }

    pub fn n_draws(&self) -> usize {
        self.columns.first().map(Vec::len).unwrap_or(0)
    }

    pub fn parameters(&self) -> &[String] {
        &self.parameters
    }

    pub fn formula(&self) -> &Formula {
        &self.formula
    }

    pub fn coding(&self) -> &ConditionCoding {
        &self.coding
    }

    /// Draws of one parameter.
    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.index.get(name).map(|&i| self.columns[i].as_slice())
    }

    fn require(&self, name: &str) -> Result<usize> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| AnalysisError::posterior(format!("parameter '{name}' is not in the posterior")))
    }

    /// Levels of a grouping factor that have their own draws.
    pub fn group_levels(&self, factor: GroupingFactor) -> Vec<String> {
        let prefix = format!("r_{factor}[");
        self.parameters
            .iter()
            .filter_map(|p| p.strip_prefix(&prefix))
            .filter_map(|rest| rest.split_once(','))
            .map(|(level, _)| level.to_string())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    fn population_terms(&self, dpar: Dpar, covariates: &Covariates) -> Result<Vec<Term>> {
        let level = covariates.condition.as_str();
        if !self.coding.contains(level) {
            return Err(AnalysisError::posterior(format!(
                "unknown condition level '{level}' (known: {})",
                self.coding.levels().join(", ")
            )));
        }

        let terms = self.formula.terms(dpar);
        let t = covariates.trial_normalized;
        let mut out = vec![Term {
            column: self.require(&fixed_name(dpar, INTERCEPT))?,
            multiplier: 1.0,
        }];
        if terms.trial {
            out.push(Term {
                column: self.require(&fixed_name(dpar, TRIAL_COLUMN))?,
                multiplier: t,
            });
        }
        if !self.coding.is_reference(level) {
            if terms.condition {
                out.push(Term {
                    column: self.require(&fixed_name(dpar, &condition_term(level)))?,
                    multiplier: 1.0,
                });
            }
            if terms.has_interaction() {
                out.push(Term {
                    column: self.require(&fixed_name(dpar, &interaction_term(level)))?,
                    multiplier: t,
                });
            }
        }
        Ok(out)
    }

    fn known_group_terms(
        &self,
        levels: &BTreeMap<GroupingFactor, String>,
        t: f64,
    ) -> Result<Vec<Term>> {
        let mut out = Vec::new();
        for group in &self.formula.groups {
            let Some(level) = levels.get(&group.factor) else {
                continue;
            };
            for coefficient in group.coefficients() {
                let name = varying_name(group.factor, level, coefficient);
                let column = self.index.get(&name).copied().ok_or_else(|| {
                    AnalysisError::posterior(format!(
                        "level '{level}' of {} has no draws and new levels are not allowed",
                        group.factor
                    ))
                })?;
                let multiplier = if coefficient == INTERCEPT { 1.0 } else { t };
                out.push(Term { column, multiplier });
            }
        }
        Ok(out)
    }

    fn eta(&self, terms: &[Term], draw: usize) -> f64 {
        terms
            .iter()
            .map(|term| self.columns[term.column][draw] * term.multiplier)
            .sum()
    }

    /// Fitted `(mu, phi)` for every draw.
    pub fn fitted_draws(
        &self,
        covariates: &Covariates,
        effects: &RandomEffects,
    ) -> Result<Vec<FittedValue>> {
        let t = covariates.trial_normalized;
        let mut mu_terms = self.population_terms(Dpar::Mu, covariates)?;
        let phi_terms = self.population_terms(Dpar::Phi, covariates)?;

        if let RandomEffects::Known(levels) = effects {
            mu_terms.extend(self.known_group_terms(levels, t)?);
        }
        if let RandomEffects::New(sampled) = effects {
            if let Some((factor, _)) = sampled
                .iter()
                .find(|(_, s)| s.intercept.len() != self.n_draws() || s.slope.len() != self.n_draws())
            {
                return Err(AnalysisError::posterior(format!(
                    "sampled {factor} effects do not match the {} posterior draws",
                    self.n_draws()
                )));
            }
        }

        let fitted = (0..self.n_draws())
            .map(|draw| {
                let mut eta_mu = self.eta(&mu_terms, draw);
                if let RandomEffects::New(sampled) = effects {
                    eta_mu += sampled
                        .values()
                        .map(|s| s.intercept[draw] + s.slope[draw] * t)
                        .sum::<f64>();
                }
                FittedValue {
                    mu: logistic(eta_mu),
                    phi: self.eta(&phi_terms, draw).exp(),
                }
            })
            .collect();
        Ok(fitted)
    }

    /// Fitted `(mu, phi)` for a single draw.
    pub fn fitted(
        &self,
        covariates: &Covariates,
        effects: &RandomEffects,
        draw: usize,
    ) -> Result<FittedValue> {
        if draw >= self.n_draws() {
            return Err(AnalysisError::posterior(format!(
                "draw {draw} out of range (store holds {})",
                self.n_draws()
            )));
        }
        let draws = self.fitted_draws(covariates, effects)?;
        Ok(draws[draw])
    }

    /// Sample group-level offsets for an unseen level of every grouping
    /// factor in the formula.
    ///
    /// For each draw the offsets come from a zero-mean normal with that
    /// draw's group standard deviations and intercept/slope correlation.
    /// The same seed always gives the same offsets.
    pub fn sample_new_levels(&self, seed: u64) -> Result<RandomEffects> {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut sampled = BTreeMap::new();

        for group in &self.formula.groups {
            let sd_intercept = self.require(&sd_name(group.factor, INTERCEPT))?;
            let slope_columns = if group.slope {
                Some((
                    self.require(&sd_name(group.factor, TRIAL_COLUMN))?,
                    self.require(&cor_name(group.factor))?,
                ))
            } else {
                None
            };

            let mut level = SampledLevel {
                intercept: Vec::with_capacity(self.n_draws()),
                slope: Vec::with_capacity(self.n_draws()),
            };
            for draw in 0..self.n_draws() {
                let z1: f64 = rng.sample(StandardNormal);
                let z2: f64 = rng.sample(StandardNormal);
                level
                    .intercept
                    .push(self.columns[sd_intercept][draw] * z1);
                let slope = match slope_columns {
                    Some((sd_slope, cor)) => {
                        let rho = self.columns[cor][draw].clamp(-1.0, 1.0);
                        self.columns[sd_slope][draw] * (rho * z1 + (1.0 - rho * rho).sqrt() * z2)
                    }
                    None => 0.0,
                };
                level.slope.push(slope);
            }
            sampled.insert(group.factor, level);
        }

        Ok(RandomEffects::New(sampled))
    }
}

/// Inverse logit.
pub fn logistic(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}
