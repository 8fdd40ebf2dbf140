use std::fs;
use std::path::{Path, PathBuf};

use super::core::BetavizConfig;
use super::validation::validate_config_result;
use crate::errors::{AnalysisError, Result};

/// Name of the configuration file searched for in the working directory
/// and its ancestors.
pub const CONFIG_FILE_NAME: &str = ".betaviz.toml";

const MAX_TRAVERSAL_DEPTH: usize = 10;

/// A configuration together with the file it came from.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: BetavizConfig,
    /// `None` when no file was found and defaults apply
    pub source: Option<PathBuf>,
}

/// Parse configuration from TOML text.
pub fn parse_config(contents: &str) -> Result<BetavizConfig> {
    toml::from_str::<BetavizConfig>(contents)
        .map_err(|e| AnalysisError::config(format!("Failed to parse {CONFIG_FILE_NAME}: {e}")))
}

/// Generate directory ancestors up to a depth limit
pub fn directory_ancestors(start: PathBuf, max_depth: usize) -> impl Iterator<Item = PathBuf> {
    std::iter::successors(Some(start), |dir| {
        let mut parent = dir.clone();
        if parent.pop() {
            Some(parent)
        } else {
            None
        }
    })
    .take(max_depth)
}

/// Find the nearest configuration file at or above `start`.
pub fn discover_config(start: &Path) -> Option<PathBuf> {
    directory_ancestors(start.to_path_buf(), MAX_TRAVERSAL_DEPTH)
        .map(|dir| dir.join(CONFIG_FILE_NAME))
        .find(|path| path.is_file())
}

/// Read, parse and validate a configuration file.
///
/// Relative paths in the `[paths]` section are resolved against the
/// directory containing the file.
pub fn load_config_from_path(path: &Path) -> Result<BetavizConfig> {
    let contents = fs::read_to_string(path)
        .map_err(|e| AnalysisError::io("Failed to read configuration", path, e))?;
    let mut config = parse_config(&contents).map_err(|e| match e {
        AnalysisError::Config { message, .. } => AnalysisError::config_with_path(message, path),
        other => other,
    })?;
    validate_config_result(&config)?;

    if let Some(base) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        resolve_paths(&mut config, base);
    }
    log::debug!("Loaded config from {}", path.display());
    Ok(config)
}

/// Load the configuration named on the command line, or discover one
/// starting at the working directory. Defaults apply when none is found.
pub fn load_config(explicit: Option<&Path>) -> Result<LoadedConfig> {
    if let Some(path) = explicit {
        return Ok(LoadedConfig {
            config: load_config_from_path(path)?,
            source: Some(path.to_path_buf()),
        });
    }

    let current = match std::env::current_dir() {
        Ok(dir) => dir,
        Err(e) => {
            log::warn!("Failed to get current directory: {e}. Using default config.");
            return Ok(LoadedConfig {
                config: BetavizConfig::default(),
                source: None,
            });
        }
    };

    match discover_config(&current) {
        Some(path) => Ok(LoadedConfig {
            config: load_config_from_path(&path)?,
            source: Some(path),
        }),
        None => {
            log::debug!(
                "No {CONFIG_FILE_NAME} found after checking {MAX_TRAVERSAL_DEPTH} directories. Using default config."
            );
            Ok(LoadedConfig {
                config: BetavizConfig::default(),
                source: None,
            })
        }
    }
}

fn resolve_paths(config: &mut BetavizConfig, base: &Path) {
    let resolve = |path: &mut PathBuf| {
        if path.is_relative() {
            *path = base.join(&*path);
        }
    };
    resolve(&mut config.paths.data);
    resolve(&mut config.paths.artifact);
    resolve(&mut config.paths.figures);
    if let Some(workdir) = config.engine.workdir.as_mut() {
        resolve(workdir);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use tempfile::TempDir;

    #[test]
    fn test_empty_config_is_default() {
        assert_eq!(parse_config("").unwrap(), BetavizConfig::default());
    }

    #[test]
    fn test_partial_sections_keep_defaults() {
        let config = parse_config(indoc! {r#"
            [study]
            max_trial = 12

            [model.sampler]
            chains = 2
        "#})
        .unwrap();
        assert_eq!(config.study.max_trial, 12);
        assert_eq!(config.study.excluded_scenario, "s4");
        assert_eq!(config.model.sampler.chains, 2);
        assert_eq!(config.model.sampler.warmup, 2000);
        assert_eq!(config.model.priors.len(), 6);
    }

    #[test]
    fn test_parse_error_is_config_error() {
        let err = parse_config("[study]\nmax_trial = \"many\"").unwrap_err();
        assert_eq!(err.category(), "Config");
    }

    #[test]
    fn test_directory_ancestors_depth_limit() {
        let ancestors: Vec<_> = directory_ancestors(PathBuf::from("/a/b/c/d"), 3).collect();
        assert_eq!(
            ancestors,
            vec![
                PathBuf::from("/a/b/c/d"),
                PathBuf::from("/a/b/c"),
                PathBuf::from("/a/b")
            ]
        );
    }

    #[test]
    fn test_discover_walks_up() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("analysis/run");
        fs::create_dir_all(&nested).unwrap();
        fs::write(dir.path().join(CONFIG_FILE_NAME), "").unwrap();

        let found = discover_config(&nested).unwrap();
        assert_eq!(found, dir.path().join(CONFIG_FILE_NAME));
    }

    #[test]
    fn test_relative_paths_resolved_against_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "[paths]\ndata = \"input/trials.csv\"\n").unwrap();

        let config = load_config_from_path(&path).unwrap();
        assert_eq!(config.paths.data, dir.path().join("input/trials.csv"));
        assert_eq!(
            config.paths.artifact,
            dir.path().join("models/beta_regression.bin")
        );
    }

    #[test]
    fn test_invalid_values_rejected_on_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "[summary]\ncredible_levels = [0.5, 1.5]\n").unwrap();
        assert!(load_config_from_path(&path).is_err());
    }
}
