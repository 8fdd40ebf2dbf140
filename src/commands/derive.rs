use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use super::load_configuration;
use crate::pipeline::derive_pipeline;

/// Derive features and write the cleaned table to `output`.
pub fn handle_derive(config: Option<&Path>, data: Option<PathBuf>, output: &Path) -> Result<()> {
    let config = load_configuration(config, data)?;
    let derived = derive_pipeline(&config, &config.paths.data)
        .execute()
        .context("Feature derivation failed")?;

    derived
        .dataset
        .write_csv(output)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    let summary = &derived.dataset.summary;
    println!(
        "Wrote {} rows to {} ({} excluded, {} adjusted at optimum, {} at zero)",
        summary.retained_rows,
        output.display(),
        summary.excluded_rows,
        summary.adjusted_at_optimum,
        summary.adjusted_at_zero
    );
    Ok(())
}
