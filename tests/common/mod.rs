// Shared fixtures for betaviz integration tests
#![allow(dead_code)]

use betaviz::config::BetavizConfig;
use betaviz::data::DerivedDataset;
use betaviz::model::{ConditionCoding, ModelSpec};
use betaviz::{AnalysisError, FittingEngine, PosteriorSampleStore};
use indoc::indoc;
use std::cell::Cell;
use std::path::Path;

/// Two conditions, one participant each, three trials, plus one row in the
/// excluded scenario. Trial 3 of `p01` responds at the optimum and trial 1
/// of `p02` responds with zero.
pub const TRIALS_CSV: &str = indoc! {"
    participant,scenario,vis,arrival,trial,expected_payoff,optimal_payoff,mu,sigma,nu,tau
    p01,s1,bars,early,1,20,40,20,0.3,0.5,8
    p01,s1,bars,early,2,30,40,20,0.3,0.5,8
    p01,s1,bars,early,3,40,40,20,0.3,0.5,8
    p02,s2,hops,late,1,0,50,25,0.3,0.5,8
    p02,s2,hops,late,2,25,50,25,0.3,0.5,8
    p02,s2,hops,late,3,45,50,25,0.3,0.5,8
    p02,s4,hops,late,3,10,50,25,0.3,0.5,8
"};

/// Configuration used with [`TRIALS_CSV`]; paths are relative to the
/// directory holding the file.
pub const CONFIG_TOML: &str = indoc! {r#"
    [study]
    max_trial = 3

    [summary]
    grid_points = 5

    [paths]
    data = "trials.csv"
    artifact = "models/fit.bin"
    figures = "figures"

    [engine]
    command = "betaviz-test-engine-that-does-not-exist"
    fallback_to_stale = false
"#};

/// Draws for the default formula with levels `bars` (reference) and `hops`.
/// `hops` has the higher mean in every draw.
pub fn draw_columns() -> Vec<(String, Vec<f64>)> {
    [
        ("b_Intercept", vec![0.0, 0.1, -0.1, 0.05]),
        ("b_trial_normalized", vec![0.4, 0.5, 0.3, 0.45]),
        ("b_vishops", vec![0.8, 0.9, 0.7, 1.0]),
        ("b_vishops:trial_normalized", vec![0.0, 0.1, -0.1, 0.0]),
        ("b_phi_Intercept", vec![2.0, 2.1, 1.9, 2.0]),
        ("b_phi_trial_normalized", vec![0.1, 0.0, 0.2, 0.1]),
        ("b_phi_vishops", vec![-0.2, -0.1, -0.3, -0.2]),
    ]
    .into_iter()
    .map(|(name, values)| (name.to_string(), values))
    .collect()
}

/// [`draw_columns`] as an `as_draws_df` export.
pub fn draws_csv() -> String {
    let columns = draw_columns();
    let mut text = String::from(".chain,.iteration,.draw");
    for (name, _) in &columns {
        text.push(',');
        text.push_str(name);
    }
    text.push('\n');
    for draw in 0..columns[0].1.len() {
        text.push_str(&format!("1,{},{}", draw + 1, draw + 1));
        for (_, values) in &columns {
            text.push_str(&format!(",{}", values[draw]));
        }
        text.push('\n');
    }
    text
}

/// Write the trial data and configuration into `dir`, returning the
/// configuration path.
pub fn write_study(dir: &Path) -> std::path::PathBuf {
    std::fs::write(dir.join("trials.csv"), TRIALS_CSV).unwrap();
    let config = dir.join(".betaviz.toml");
    std::fs::write(&config, CONFIG_TOML).unwrap();
    config
}

pub fn load_study(dir: &Path) -> BetavizConfig {
    let path = write_study(dir);
    betaviz::config::load_config_from_path(&path).unwrap()
}

/// Engine that answers every fit with [`draw_columns`].
pub struct FixedEngine {
    calls: Cell<usize>,
    fail: bool,
}

impl FixedEngine {
    pub fn new() -> Self {
        Self {
            calls: Cell::new(0),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            calls: Cell::new(0),
            fail: true,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl FittingEngine for FixedEngine {
    fn name(&self) -> &str {
        "fixed"
    }

    fn fit(
        &self,
        _data: &DerivedDataset,
        spec: &ModelSpec,
        coding: &ConditionCoding,
    ) -> betaviz::Result<PosteriorSampleStore> {
        self.calls.set(self.calls.get() + 1);
        if self.fail {
            return Err(AnalysisError::Engine("engine unavailable".into()));
        }
        PosteriorSampleStore::new(spec.formula.clone(), coding.clone(), draw_columns())
    }
}
