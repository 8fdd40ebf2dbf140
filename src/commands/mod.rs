//! CLI command implementations.
//!
//! - **analyze**: full pipeline with report and charts
//! - **derive**: write the cleaned, feature-enriched table
//! - **fit**: fit the model or import draws, persisting the artifact
//! - **init**: write a default configuration file
//!
//! Handlers return `anyhow::Result` and add context at the command level;
//! library errors keep their stage and category underneath.

pub mod analyze;
pub mod derive;
pub mod fit;
pub mod init;

pub use analyze::{handle_analyze, AnalyzeConfig};
pub use derive::handle_derive;
pub use fit::handle_fit;
pub use init::init_config;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::config::{load_config, BetavizConfig};

/// Load the configuration and apply a data-path override.
pub fn load_configuration(explicit: Option<&Path>, data: Option<PathBuf>) -> Result<BetavizConfig> {
    let loaded = load_config(explicit).context("Failed to load configuration")?;
    match &loaded.source {
        Some(path) => log::debug!("Using configuration from {}", path.display()),
        None => log::debug!("No configuration file found; using defaults"),
    }
    let mut config = loaded.config;
    if let Some(data) = data {
        config.paths.data = data;
    }
    Ok(config)
}
