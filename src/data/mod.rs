//! Trial data: loading, feature derivation and observed summaries.
//!
//! - [`loader`]: raw CSV records
//! - [`distribution`]: quantiles of the outcome distributions shown to participants
//! - [`derive`]: normalized trial, displayed intervals, bounded response ratio
//! - [`observed`]: observed means used as plot overlays

pub mod derive;
pub mod distribution;
pub mod loader;
pub mod observed;

pub use derive::{
    adjust_ratio, derive_trials, normalize_trial, DeriveSummary, DerivedDataset, DerivedTrial,
    DisplayedInterval, RatioAdjustment, TrialScaling,
};
pub use distribution::{ShapeFamily, ShapeParams};
pub use loader::{load_trials, read_trials, RawTrial, REQUIRED_COLUMNS};
pub use observed::{observed_means, ObservedPoint};
