use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use super::load_configuration;
use crate::pipeline::fitting_pipeline;
use crate::posterior::{ExternalEngine, FitPolicy, Provenance};
use crate::progress::ProgressConfig;

/// Fit the model, or import draws, and persist the artifact.
pub fn handle_fit(
    config: Option<&Path>,
    data: Option<PathBuf>,
    from_draws: Option<&Path>,
    policy: FitPolicy,
) -> Result<()> {
    let config = load_configuration(config, data)?;
    let engine = ExternalEngine::from_config(&config.engine, ProgressConfig::from_env(false));

    let fitted = fitting_pipeline(&config, &engine, policy, from_draws)
        .execute()
        .context("Fitting failed")?;
    let outcome = fitted.require_fit()?;

    let source = match &outcome.provenance {
        Provenance::Loaded { created_at } => format!("reused artifact fitted at {created_at}"),
        Provenance::Fitted { engine } => format!("fitted with {engine}"),
        Provenance::StaleFallback { created_at, .. } => {
            format!("fit failed; kept stale artifact fitted at {created_at}")
        }
        Provenance::Imported { draws } => format!("imported from {}", draws.display()),
    };
    println!(
        "Posterior with {} draws {} -> {} (fingerprint {})",
        outcome.store.n_draws(),
        source,
        config.paths.artifact.display(),
        &outcome.fingerprint[..outcome.fingerprint.len().min(12)]
    );
    Ok(())
}
