//! Persisted posterior artifacts.
//!
//! An artifact is a postcard-encoded [`ArtifactEnvelope`]: the sample store
//! plus the fingerprint of the model specification and data it was fitted
//! to. A fingerprint mismatch marks the artifact stale, which callers treat
//! as "fit again" rather than as a failure. Writes go to a temporary file in
//! the same directory and are renamed into place, so readers never observe a
//! half-written artifact.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;

use super::store::PosteriorSampleStore;
use crate::data::DerivedDataset;
use crate::errors::{AnalysisError, Result};
use crate::model::{ConditionCoding, ModelSpec};

/// Bumped whenever the envelope or store layout changes.
pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactEnvelope {
    pub format_version: u32,
    pub fingerprint: String,
    /// RFC 3339 timestamp of the fit
    pub created_at: String,
    /// Formula text, for humans inspecting the artifact
    pub formula: String,
    pub store: PosteriorSampleStore,
}

impl ArtifactEnvelope {
    pub fn new(fingerprint: String, store: PosteriorSampleStore) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            fingerprint,
            created_at: chrono::Utc::now().to_rfc3339(),
            formula: store.formula().to_string(),
            store,
        }
    }
}

/// SHA-256 over the model specification, the condition coding and every
/// modeled value of the derived data.
pub fn fingerprint(
    spec: &ModelSpec,
    coding: &ConditionCoding,
    data: &DerivedDataset,
) -> Result<String> {
    let mut hasher = Sha256::new();
    hasher.update(serde_json::to_vec(spec)?);
    hasher.update(serde_json::to_vec(coding)?);
    for trial in &data.trials {
        for field in [&trial.participant, &trial.scenario, &trial.vis] {
            hasher.update(field.as_bytes());
            hasher.update([0u8]);
        }
        hasher.update(trial.trial_normalized.to_le_bytes());
        hasher.update(trial.response_ratio_adjusted.to_le_bytes());
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// Write an artifact atomically.
pub fn save(path: &Path, envelope: &ArtifactEnvelope) -> Result<()> {
    let bytes = postcard::to_allocvec(envelope).map_err(|e| AnalysisError::ArtifactCorrupt {
        path: path.to_path_buf(),
        message: format!("failed to encode: {e}"),
    })?;

    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    fs::create_dir_all(dir)
        .map_err(|e| AnalysisError::io("Failed to create artifact directory", dir, e))?;

    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp = dir.join(tmp_name);
    fs::write(&tmp, &bytes)
        .map_err(|e| AnalysisError::io("Failed to write temporary artifact", &tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| AnalysisError::io("Failed to move artifact into place", path, e))?;

    log::info!(
        "Saved posterior artifact ({} draws, {} bytes) to {}",
        envelope.store.n_draws(),
        bytes.len(),
        path.display()
    );
    Ok(())
}

/// Read an artifact envelope without checking its fingerprint.
pub fn load_envelope(path: &Path) -> Result<ArtifactEnvelope> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(AnalysisError::ArtifactMissing {
                path: path.to_path_buf(),
            })
        }
        Err(e) => return Err(AnalysisError::io("Failed to read artifact", path, e)),
    };

    let envelope: ArtifactEnvelope =
        postcard::from_bytes(&bytes).map_err(|e| AnalysisError::ArtifactCorrupt {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
    if envelope.format_version != FORMAT_VERSION {
        return Err(AnalysisError::ArtifactCorrupt {
            path: path.to_path_buf(),
            message: format!(
                "format version {} is not supported (expected {FORMAT_VERSION})",
                envelope.format_version
            ),
        });
    }
    Ok(envelope)
}

/// Load the sample store from an artifact.
pub fn load(path: &Path) -> Result<PosteriorSampleStore> {
    load_envelope(path).map(|envelope| envelope.store)
}

/// Load an artifact only if it was fitted for `expected`.
pub fn load_fresh(path: &Path, expected: &str) -> Result<ArtifactEnvelope> {
    let envelope = load_envelope(path)?;
    if envelope.fingerprint != expected {
        return Err(AnalysisError::ArtifactStale {
            path: path.to_path_buf(),
            expected: expected.to_string(),
            found: envelope.fingerprint,
        });
    }
    Ok(envelope)
}
