//! `.betaviz.toml` configuration.
//!
//! Every section is optional; missing values fall back to the study's
//! published constants (39 trials, scenario `s4` excluded, 50/80/95%
//! credible intervals, and the sampler settings used for the paper).

mod core;
mod loader;
pub mod validation;

pub use core::{
    BetavizConfig, ContrastConfig, EngineConfig, GroupLevels, ModelConfig, PathsConfig, RandomEffectsMode,
    StudyConfig, SummaryConfig,
};
pub use loader::{
    directory_ancestors, discover_config, load_config, load_config_from_path, parse_config,
    LoadedConfig, CONFIG_FILE_NAME,
};
pub use validation::{validate_config, validate_config_result};
