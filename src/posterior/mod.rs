//! Posterior draws: storage, fitted-value queries, persistence and fitting.

pub mod artifact;
pub mod draws_csv;
pub mod engine;
pub mod store;

pub use artifact::{fingerprint, ArtifactEnvelope, FORMAT_VERSION};
pub use engine::{
    fit_or_load, import_draws, ExternalEngine, FitOutcome, FitPolicy, FitRequest, FittingEngine,
    Provenance,
};
pub use store::{
    logistic, Covariates, FittedValue, PosteriorSampleStore, RandomEffects, SampledLevel,
};
