use serde::Serialize;

use crate::posterior::Covariates;

/// One prediction point: a condition level at a normalized trial.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridRow {
    pub condition: String,
    pub trial_normalized: f64,
}

impl GridRow {
    pub fn covariates(&self) -> Covariates {
        Covariates::new(self.condition.clone(), self.trial_normalized)
    }
}

/// `n` evenly spaced values from `lo` to `hi`, both included.
///
/// `n = 0` gives nothing and `n = 1` gives `lo`. A degenerate range gives
/// the single value `lo` regardless of `n`.
pub fn linspace(lo: f64, hi: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        _ if n == 1 || lo == hi => vec![lo],
        _ => {
            let step = (hi - lo) / (n - 1) as f64;
            (0..n)
                .map(|i| if i == n - 1 { hi } else { lo + step * i as f64 })
                .collect()
        }
    }
}

/// Every level crossed with `n` trial values spanning `range`.
///
/// Rows are ordered level by level, trials ascending within a level.
pub fn prediction_grid(levels: &[String], range: (f64, f64), n: usize) -> Vec<GridRow> {
    let (lo, hi) = if range.0 <= range.1 {
        range
    } else {
        (range.1, range.0)
    };
    let trials = linspace(lo, hi, n);
    unique_levels(levels)
        .into_iter()
        .flat_map(|level| {
            trials.iter().map(move |&t| GridRow {
                condition: level.to_string(),
                trial_normalized: t,
            })
        })
        .collect()
}

/// One row per level at a fixed normalized trial.
pub fn fixed_point_grid(levels: &[String], trial_normalized: f64) -> Vec<GridRow> {
    unique_levels(levels)
        .into_iter()
        .map(|level| GridRow {
            condition: level.to_string(),
            trial_normalized,
        })
        .collect()
}

fn unique_levels(levels: &[String]) -> Vec<&str> {
    let mut seen = Vec::with_capacity(levels.len());
    for level in levels {
        if !seen.contains(&level.as_str()) {
            seen.push(level.as_str());
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn levels(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_linspace_edges() {
        assert!(linspace(-0.5, 0.5, 0).is_empty());
        assert_eq!(linspace(-0.5, 0.5, 1), vec![-0.5]);
        assert_eq!(linspace(-0.5, 0.5, 3), vec![-0.5, 0.0, 0.5]);
        assert_eq!(linspace(0.2, 0.2, 5), vec![0.2]);
    }

    #[test]
    fn test_grid_is_cartesian_product() {
        let grid = prediction_grid(&levels(&["bars", "hops"]), (-0.5, 0.5), 20);
        assert_eq!(grid.len(), 40);
        assert_eq!(grid[0].condition, "bars");
        assert_eq!(grid[0].trial_normalized, -0.5);
        assert_eq!(grid[19].trial_normalized, 0.5);
        assert_eq!(grid[20].condition, "hops");
    }

    #[test]
    fn test_fixed_point_grid() {
        let grid = fixed_point_grid(&levels(&["bars", "hops", "bars"]), 0.5);
        assert_eq!(
            grid,
            vec![
                GridRow {
                    condition: "bars".into(),
                    trial_normalized: 0.5
                },
                GridRow {
                    condition: "hops".into(),
                    trial_normalized: 0.5
                },
            ]
        );
    }

    #[test]
    fn test_reversed_range_is_normalized() {
        let grid = prediction_grid(&levels(&["bars"]), (0.5, -0.5), 2);
        assert_eq!(grid[0].trial_normalized, -0.5);
        assert_eq!(grid[1].trial_normalized, 0.5);
    }
}
