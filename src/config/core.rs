use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::data::{ShapeFamily, TrialScaling};
use crate::model::{Formula, GroupingFactor, ModelSpec, PriorSpec, SamplerControls};
use crate::posterior::FitPolicy;

/// Root configuration structure for betaviz
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BetavizConfig {
    /// Study constants and feature derivation
    #[serde(default)]
    pub study: StudyConfig,

    /// Model specification and condition coding
    #[serde(default)]
    pub model: ModelConfig,

    /// Prediction grid and posterior summaries
    #[serde(default)]
    pub summary: SummaryConfig,

    /// Reference levels for contrasts
    #[serde(default)]
    pub contrasts: ContrastConfig,

    /// Input and output locations
    #[serde(default)]
    pub paths: PathsConfig,

    /// External fitting engine
    #[serde(default)]
    pub engine: EngineConfig,
}

/// Study constants used while deriving features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudyConfig {
    /// Number of trials each participant completed
    pub max_trial: u32,
    /// Scenario dropped before modeling
    pub excluded_scenario: String,
    pub trial_scaling: TrialScaling,
    /// Probability mass levels of the intervals shown to participants
    pub display_levels: Vec<f64>,
    /// Constant added to each rounded displayed quantile
    pub display_offset: f64,
    /// Family of the outcome distributions
    pub shape_family: ShapeFamily,
}

impl Default for StudyConfig {
    fn default() -> Self {
        Self {
            max_trial: 39,
            excluded_scenario: "s4".to_string(),
            trial_scaling: TrialScaling::default(),
            display_levels: vec![0.85, 0.60, 0.99],
            display_offset: 1.0,
            shape_family: ShapeFamily::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Condition level absorbed into the intercept; first sorted level if unset
    #[serde(default)]
    pub reference_condition: Option<String>,
    #[serde(default)]
    pub formula: Formula,
    #[serde(default = "crate::model::priors::default_priors")]
    pub priors: Vec<PriorSpec>,
    #[serde(default)]
    pub sampler: SamplerControls,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            reference_condition: None,
            formula: Formula::default(),
            priors: crate::model::priors::default_priors(),
            sampler: SamplerControls::default(),
        }
    }
}

impl ModelConfig {
    /// The model specification described by this section.
    pub fn spec(&self) -> ModelSpec {
        ModelSpec {
            formula: self.formula.clone(),
            priors: self.priors.clone(),
            sampler: self.sampler.clone(),
        }
    }
}

/// How group-level effects enter fitted values on the prediction grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RandomEffectsMode {
    /// Ignore group-level effects
    #[default]
    PopulationLevel,
    /// Draw effects for an unseen participant and scenario
    NewLevels,
    /// Use the fitted effects of the levels named in `known_levels`
    KnownLevels,
}

/// Observed group levels to condition fitted values on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupLevels {
    pub participant: Option<String>,
    pub scenario: Option<String>,
}

impl GroupLevels {
    pub fn is_empty(&self) -> bool {
        self.participant.is_none() && self.scenario.is_none()
    }

    /// Levels keyed by grouping factor; unset factors are left out.
    pub fn to_map(&self) -> BTreeMap<GroupingFactor, String> {
        [
            (GroupingFactor::Participant, &self.participant),
            (GroupingFactor::Scenario, &self.scenario),
        ]
        .into_iter()
        .filter_map(|(factor, level)| level.clone().map(|l| (factor, l)))
        .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryConfig {
    /// Credible interval mass levels
    pub credible_levels: Vec<f64>,
    /// Trial values per condition on the trajectory grid
    pub grid_points: usize,
    /// Normalized trial used for end-of-study estimates
    pub final_trial_point: f64,
    pub random_effects: RandomEffectsMode,
    /// Levels used when `random_effects = "known_levels"`
    pub known_levels: GroupLevels,
    /// Seed for sampling new group levels
    pub seed: u64,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            credible_levels: vec![0.5, 0.8, 0.95],
            grid_points: 20,
            final_trial_point: 0.5,
            random_effects: RandomEffectsMode::default(),
            known_levels: GroupLevels::default(),
            seed: 20_190_501,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContrastConfig {
    /// Level every other level is compared against (the no-aid condition);
    /// defaults to the model's reference condition
    pub baseline: Option<String>,
    /// Level used for the second control pass; the level with the highest
    /// median final-trial mean when unset
    pub best: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub data: PathBuf,
    pub artifact: PathBuf,
    pub figures: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data: PathBuf::from("data/trials.csv"),
            artifact: PathBuf::from("models/beta_regression.bin"),
            figures: PathBuf::from("figures"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Executable that fits the model
    pub command: String,
    /// Extra arguments placed before the standard ones
    pub args: Vec<String>,
    /// Directory for the engine's input and output files; a temporary
    /// directory when unset
    pub workdir: Option<PathBuf>,
    pub policy: FitPolicy,
    /// Use a stale artifact when fitting fails
    pub fallback_to_stale: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            command: "betaviz-fit".to_string(),
            args: Vec::new(),
            workdir: None,
            policy: FitPolicy::default(),
            fallback_to_stale: true,
        }
    }
}
