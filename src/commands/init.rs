use anyhow::{Context, Result};
use std::path::Path;

/// Contents of a freshly initialised `.betaviz.toml`; every value shown is
/// the built-in default.
pub const DEFAULT_CONFIG: &str = r#"# Betaviz configuration
#
# Relative paths are resolved against the directory of this file.

[study]
# Trials per participant; data with a different maximum is rejected
max_trial = 39
# Scenario removed before modeling
excluded_scenario = "s4"
# "endpoints": trial 1 -> -0.5, last trial -> +0.5
# "offset":    (trial - max) / max + 0.5
trial_scaling = "endpoints"
# Probability mass of the intervals shown to participants
display_levels = [0.85, 0.60, 0.99]
display_offset = 1.0
# box_cox_t | johnson_su | sinh_arcsinh
shape_family = "box_cox_t"

[model]
# Condition absorbed into the intercept (default: first level alphabetically)
# reference_condition = "none"

[model.formula]
mean = { condition = true, trial = true, interaction = true }
precision = { condition = true, trial = true, interaction = false }

[[model.formula.groups]]
factor = "participant"
slope = true

[[model.formula.groups]]
factor = "scenario"
slope = true

[[model.priors]]
class = "b"
family = "normal"
mean = 0.0
sd = 1.0

[[model.priors]]
class = "Intercept"
family = "student_t"
df = 3.0
location = 0.0
scale = 2.5

[[model.priors]]
class = "sd"
family = "exponential"
rate = 1.0

[[model.priors]]
class = "cor"
family = "lkj"
eta = 2.0

[[model.priors]]
class = "b_phi"
family = "normal"
mean = 0.0
sd = 1.0

[[model.priors]]
class = "Intercept_phi"
family = "student_t"
df = 3.0
location = 0.0
scale = 2.5

[model.sampler]
chains = 4
warmup = 2000
iterations = 2000
thin = 2
adapt_delta = 0.9995
max_treedepth = 15
step_size = 0.005
# seed = 1234

[summary]
credible_levels = [0.5, 0.8, 0.95]
# Trial values per condition on the trajectory grid
grid_points = 20
final_trial_point = 0.5
# "population_level", "new_levels" or "known_levels"
random_effects = "population_level"
# Observed levels used by "known_levels"
# known_levels = { participant = "p01", scenario = "s1" }
seed = 20190501

[contrasts]
# Compared against every other condition (default: reference_condition)
# baseline = "none"
# Second reference (default: highest median mean at the final trial)
# best = "hops"

[paths]
data = "data/trials.csv"
artifact = "models/beta_regression.bin"
figures = "figures"

[engine]
command = "betaviz-fit"
args = []
# workdir = "models/engine"
# reuse | refit | cache_only
policy = "reuse"
# Use an artifact fitted for other inputs when fitting fails
fallback_to_stale = true
"#;

/// Write [`DEFAULT_CONFIG`] to `path`.
pub fn init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "Configuration file {} already exists. Use --force to overwrite.",
            path.display()
        );
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(path, DEFAULT_CONFIG)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Created {} configuration file", path.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{parse_config, BetavizConfig};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_matches_builtin_defaults() {
        assert_eq!(parse_config(DEFAULT_CONFIG).unwrap(), BetavizConfig::default());
    }

    #[test]
    fn test_refuses_to_overwrite_without_force() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".betaviz.toml");
        std::fs::write(&path, "# mine").unwrap();

        assert!(init_config(&path, false).is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# mine");

        init_config(&path, true).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), DEFAULT_CONFIG);
    }
}
