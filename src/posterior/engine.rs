//! Obtaining a posterior: fitting through an engine or reusing an artifact.
//!
//! The sampler itself lives outside this crate. [`FittingEngine`] is the
//! capability the pipeline needs from it; [`ExternalEngine`] satisfies it by
//! running a configured command that exchanges files with us:
//!
//! ```text
//! <command> [args] --data <dir>/data.csv --spec <dir>/spec.json --output <dir>/draws.csv
//! ```
//!
//! `draws.csv` must use the `as_draws_df` column layout.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Command;

use super::artifact::{self, fingerprint, ArtifactEnvelope};
use super::draws_csv::read_draws_file;
use super::store::PosteriorSampleStore;
use crate::config::EngineConfig;
use crate::data::DerivedDataset;
use crate::errors::{AnalysisError, Result};
use crate::model::formula::RESPONSE_COLUMN;
use crate::model::{ConditionCoding, Formula, ModelSpec, PriorSpec, SamplerControls};
use crate::progress::ProgressConfig;

/// Whether an existing artifact may stand in for a fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitPolicy {
    /// Load the artifact when its fingerprint matches, otherwise fit
    #[default]
    Reuse,
    /// Always fit and overwrite the artifact
    Refit,
    /// Never fit; a missing or stale artifact is an error
    CacheOnly,
}

/// Capability to turn data and a model specification into posterior draws.
pub trait FittingEngine {
    /// Name used in log messages.
    fn name(&self) -> &str;

    fn fit(
        &self,
        data: &DerivedDataset,
        spec: &ModelSpec,
        coding: &ConditionCoding,
    ) -> Result<PosteriorSampleStore>;
}

/// Model description handed to the external engine as JSON.
#[derive(Debug, Serialize)]
struct EngineSpec<'a> {
    family: &'static str,
    response: &'static str,
    formula_text: String,
    formula: &'a Formula,
    priors: &'a [PriorSpec],
    sampler: &'a SamplerControls,
    condition_levels: &'a [String],
    reference_condition: &'a str,
}

/// Fitting engine run as a separate process.
#[derive(Debug, Clone)]
pub struct ExternalEngine {
    pub command: String,
    pub args: Vec<String>,
    pub workdir: Option<PathBuf>,
    pub progress: ProgressConfig,
}

impl ExternalEngine {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            workdir: None,
            progress: ProgressConfig::default(),
        }
    }

    /// Engine as described by the `[engine]` config section.
    pub fn from_config(config: &EngineConfig, progress: ProgressConfig) -> Self {
        Self {
            command: config.command.clone(),
            args: config.args.clone(),
            workdir: config.workdir.clone(),
            progress,
        }
    }

    fn locate(&self) -> Result<PathBuf> {
        which::which(&self.command).map_err(|e| AnalysisError::EngineUnavailable {
            command: self.command.clone(),
            message: e.to_string(),
        })
    }

    fn write_inputs(
        &self,
        dir: &Path,
        data: &DerivedDataset,
        spec: &ModelSpec,
        coding: &ConditionCoding,
    ) -> Result<(PathBuf, PathBuf)> {
        let data_path = dir.join("data.csv");
        data.write_csv(&data_path)?;

        let spec_path = dir.join("spec.json");
        let engine_spec = EngineSpec {
            family: "beta",
            response: RESPONSE_COLUMN,
            formula_text: spec.formula.to_string(),
            formula: &spec.formula,
            priors: &spec.priors,
            sampler: &spec.sampler,
            condition_levels: coding.levels(),
            reference_condition: coding.reference(),
        };
        let json = serde_json::to_string_pretty(&engine_spec)?;
        std::fs::write(&spec_path, json)
            .map_err(|e| AnalysisError::io("Failed to write engine specification", &spec_path, e))?;
        Ok((data_path, spec_path))
    }

    fn run(&self, dir: &Path, data: &Path, spec: &Path) -> Result<PathBuf> {
        let program = self.locate()?;
        let output_path = dir.join("draws.csv");
        // A workdir may hold draws from an earlier run.
        match std::fs::remove_file(&output_path) {
            Ok(()) => log::debug!("Removed previous engine output {}", output_path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(AnalysisError::io("Failed to clear previous engine output", &output_path, e))
            }
        }

        let mut command = Command::new(&program);
        command
            .args(&self.args)
            .arg("--data")
            .arg(data)
            .arg("--spec")
            .arg(spec)
            .arg("--output")
            .arg(&output_path);
        log::debug!("Running fitting engine: {command:?}");

        let spinner = self
            .progress
            .spinner(&format!("Fitting model with {}", self.command));
        let output = command.output();
        spinner.finish_and_clear();

        let output = output.map_err(|e| AnalysisError::EngineUnavailable {
            command: program.display().to_string(),
            message: e.to_string(),
        })?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AnalysisError::Engine(format!(
                "'{}' exited with {}: {}",
                self.command,
                output.status,
                tail(&stderr, 20)
            )));
        }
        if !output_path.is_file() {
            return Err(AnalysisError::Engine(format!(
                "'{}' did not write {}",
                self.command,
                output_path.display()
            )));
        }
        Ok(output_path)
    }
}

impl FittingEngine for ExternalEngine {
    fn name(&self) -> &str {
        &self.command
    }

    fn fit(
        &self,
        data: &DerivedDataset,
        spec: &ModelSpec,
        coding: &ConditionCoding,
    ) -> Result<PosteriorSampleStore> {
        // The temporary directory lives until the draws have been read.
        let scratch;
        let dir = match &self.workdir {
            Some(dir) => {
                std::fs::create_dir_all(dir)
                    .map_err(|e| AnalysisError::io("Failed to create engine workdir", dir, e))?;
                dir.clone()
            }
            None => {
                scratch = tempfile::Builder::new()
                    .prefix("betaviz-fit-")
                    .tempdir()
                    .map_err(|e| AnalysisError::io("Failed to create engine workdir", std::env::temp_dir(), e))?;
                scratch.path().to_path_buf()
            }
        };

        let (data_path, spec_path) = self.write_inputs(&dir, data, spec, coding)?;
        let draws_path = self.run(&dir, &data_path, &spec_path)?;
        let columns = read_draws_file(&draws_path)?;
        PosteriorSampleStore::new(spec.formula.clone(), coding.clone(), columns)
            .map_err(|e| AnalysisError::Engine(format!("unusable draws from '{}': {e}", self.command)))
    }
}

fn tail(text: &str, lines: usize) -> String {
    let all: Vec<&str> = text.lines().collect();
    all[all.len().saturating_sub(lines)..].join("\n")
}

/// Where the posterior in a [`FitOutcome`] came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum Provenance {
    /// Reused an artifact with a matching fingerprint
    Loaded { created_at: String },
    /// Fitted in this run
    Fitted { engine: String },
    /// Fitting failed and an artifact for other inputs was used instead
    StaleFallback { created_at: String, reason: String },
    /// Imported from an externally produced draws file
    Imported { draws: PathBuf },
}

#[derive(Debug, Clone)]
pub struct FitOutcome {
    pub store: PosteriorSampleStore,
    pub provenance: Provenance,
    pub fingerprint: String,
}

/// Everything needed to obtain a posterior for one dataset and model.
#[derive(Debug, Clone, Copy)]
pub struct FitRequest<'a> {
    pub data: &'a DerivedDataset,
    pub spec: &'a ModelSpec,
    pub coding: &'a ConditionCoding,
    pub artifact: &'a Path,
    pub policy: FitPolicy,
    pub fallback_to_stale: bool,
}

/// Load a matching artifact or fit, according to the request's policy.
pub fn fit_or_load(engine: &dyn FittingEngine, request: FitRequest<'_>) -> Result<FitOutcome> {
    let fingerprint = fingerprint(request.spec, request.coding, request.data)?;

    match request.policy {
        FitPolicy::Reuse => match artifact::load_fresh(request.artifact, &fingerprint) {
            Ok(envelope) => return Ok(loaded(envelope, fingerprint)),
            Err(e) if e.is_recoverable() => log::info!("{e}"),
            Err(e) => return Err(e),
        },
        FitPolicy::CacheOnly => {
            let envelope = artifact::load_fresh(request.artifact, &fingerprint)?;
            return Ok(loaded(envelope, fingerprint));
        }
        FitPolicy::Refit => log::info!("Refit requested; ignoring any existing artifact"),
    }

    fit_and_persist(engine, request, fingerprint)
}

fn loaded(envelope: ArtifactEnvelope, fingerprint: String) -> FitOutcome {
    log::info!(
        "Reusing posterior artifact fitted at {} ({} draws)",
        envelope.created_at,
        envelope.store.n_draws()
    );
    FitOutcome {
        store: envelope.store,
        provenance: Provenance::Loaded {
            created_at: envelope.created_at,
        },
        fingerprint,
    }
}

fn fit_and_persist(
    engine: &dyn FittingEngine,
    request: FitRequest<'_>,
    fingerprint: String,
) -> Result<FitOutcome> {
    log::info!(
        "Fitting {} on {} rows with {}",
        request.spec.formula,
        request.data.trials.len(),
        engine.name()
    );
    let fit_error = match engine.fit(request.data, request.spec, request.coding) {
        Ok(store) => {
            artifact::save(
                request.artifact,
                &ArtifactEnvelope::new(fingerprint.clone(), store.clone()),
            )?;
            return Ok(FitOutcome {
                store,
                provenance: Provenance::Fitted {
                    engine: engine.name().to_string(),
                },
                fingerprint,
            });
        }
        Err(e) => e,
    };

    if !request.fallback_to_stale {
        return Err(fit_error);
    }
    match artifact::load_envelope(request.artifact) {
        Ok(envelope) if envelope.store.coding() == request.coding => {
            log::warn!(
                "Fitting failed ({fit_error}); falling back to the artifact fitted at {}",
                envelope.created_at
            );
            Ok(FitOutcome {
                store: envelope.store,
                provenance: Provenance::StaleFallback {
                    created_at: envelope.created_at,
                    reason: fit_error.to_string(),
                },
                fingerprint: envelope.fingerprint,
            })
        }
        Ok(_) => {
            log::warn!("Existing artifact uses different condition levels; not falling back");
            Err(fit_error)
        }
        Err(_) => Err(fit_error),
    }
}

/// Persist draws produced outside the pipeline as an artifact for the
/// current data and specification.
pub fn import_draws(draws: &Path, request: FitRequest<'_>) -> Result<FitOutcome> {
    let fingerprint = fingerprint(request.spec, request.coding, request.data)?;
    let columns = read_draws_file(draws)?;
    let store = PosteriorSampleStore::new(request.spec.formula.clone(), request.coding.clone(), columns)?;
    artifact::save(
        request.artifact,
        &ArtifactEnvelope::new(fingerprint.clone(), store.clone()),
    )?;
    Ok(FitOutcome {
        store,
        provenance: Provenance::Imported {
            draws: draws.to_path_buf(),
        },
        fingerprint,
    })
}
