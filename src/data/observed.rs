use serde::Serialize;
use std::collections::BTreeMap;

use super::derive::DerivedTrial;

/// Mean adjusted response ratio for one (condition, trial) cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObservedPoint {
    pub condition: String,
    pub trial_normalized: f64,
    pub mean_ratio: f64,
    pub n: usize,
}

/// Observed means per condition and normalized trial, ordered by condition
/// then trial.
pub fn observed_means(trials: &[DerivedTrial]) -> Vec<ObservedPoint> {
    // f64 is not Ord; the bit pattern is a stable key for values that come
    // from the same normalization.
    let mut cells: BTreeMap<(String, i64), (f64, f64, usize)> = BTreeMap::new();
    for t in trials {
        let key = (t.vis.clone(), ordered_key(t.trial_normalized));
        let cell = cells.entry(key).or_insert((t.trial_normalized, 0.0, 0));
        cell.1 += t.response_ratio_adjusted;
        cell.2 += 1;
    }

    cells
        .into_iter()
        .map(|((condition, _), (trial_normalized, sum, n))| ObservedPoint {
            condition,
            trial_normalized,
            mean_ratio: sum / n as f64,
            n,
        })
        .collect()
}

/// Map an f64 onto an i64 whose ordering matches the float ordering.
fn ordered_key(value: f64) -> i64 {
    let bits = value.to_bits() as i64;
    if bits < 0 {
        bits ^ i64::MAX
    } else {
        bits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::derive::RatioAdjustment;

    fn trial(vis: &str, t: f64, ratio: f64) -> DerivedTrial {
        DerivedTrial {
            participant: "p".into(),
            scenario: "s1".into(),
            vis: vis.into(),
            arrival: "early".into(),
            trial: 1,
            trial_normalized: t,
            expected_payoff: ratio,
            optimal_payoff: 1.0,
            response_ratio: ratio,
            response_ratio_adjusted: ratio,
            adjustment: RatioAdjustment::None,
            displayed_intervals: Vec::new(),
        }
    }

    #[test]
    fn test_means_grouped_and_sorted() {
        let trials = vec![
            trial("hops", 0.5, 0.4),
            trial("bars", 0.5, 0.2),
            trial("bars", -0.5, 0.6),
            trial("bars", 0.5, 0.4),
        ];
        let means = observed_means(&trials);
        assert_eq!(means.len(), 3);
        assert_eq!(means[0].condition, "bars");
        assert_eq!(means[0].trial_normalized, -0.5);
        assert_eq!(means[1].trial_normalized, 0.5);
        assert!((means[1].mean_ratio - 0.3).abs() < 1e-12);
        assert_eq!(means[1].n, 2);
        assert_eq!(means[2].condition, "hops");
    }

    #[test]
    fn test_ordered_key_preserves_order() {
        let values = [-0.5, -0.25, 0.0, 0.1, 0.5];
        let keys: Vec<i64> = values.iter().map(|v| ordered_key(*v)).collect();
        assert!(keys.windows(2).all(|w| w[0] < w[1]));
    }
}
