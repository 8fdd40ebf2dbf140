//! Beta-regression model description.
//!
//! - [`formula`]: mean and precision predictors, varying effects, coefficient names
//! - [`priors`]: prior distributions per coefficient class
//! - [`spec`]: the complete specification plus sampler controls and validation
//! - [`coding`]: treatment coding of the condition factor

pub mod coding;
pub mod formula;
pub mod priors;
pub mod spec;

pub use coding::ConditionCoding;
pub use formula::{Dpar, Formula, GroupTerm, GroupingFactor, LinearTerms};
pub use priors::{PriorClass, PriorDistribution, PriorSpec};
pub use spec::{ModelSpec, SamplerControls};
