//! Property-based tests for derivation, grids and posterior summaries
//!
//! These tests verify invariants that should hold for all inputs:
//! - Adjusted ratios stay strictly inside (0, 1)
//! - Normalized trials stay within [-0.5, 0.5]
//! - Credible intervals are nested and contain the median
//! - Pairwise differences are antisymmetric
//! - The prediction grid is a full cross product without duplicates

use betaviz::analysis::{
    control_contrasts, difference_series, prediction_grid, ConditionDraws, DrawSummarizer,
    Quantity,
};
use betaviz::data::{adjust_ratio, normalize_trial, TrialScaling};
use proptest::prelude::*;
use std::collections::HashSet;

fn summarizer() -> DrawSummarizer {
    DrawSummarizer::new(&[0.5, 0.8, 0.95]).unwrap()
}

fn draws() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(-10.0f64..10.0, 1..200)
}

#[test]
fn test_hundred_draws_half_interval() {
    let values: Vec<f64> = (1..=100).map(f64::from).collect();
    let summary = DrawSummarizer::new(&[0.5]).unwrap().summarize(&values).unwrap();
    let interval = summary.interval(0.5).unwrap();
    assert_eq!(interval.lower, 25.75);
    assert_eq!(interval.upper, 75.25);
    assert_eq!(summary.median, 50.5);
}

proptest! {
    /// Property: every valid response maps into the open unit interval
    #[test]
    fn prop_adjusted_ratio_is_open_unit(optimal in 1u32..5000, share in 0.0f64..=1.0) {
        let optimal = f64::from(optimal);
        let response = (optimal * share).round();
        let (_, adjusted, _) = adjust_ratio(response, optimal).unwrap();
        prop_assert!(adjusted > 0.0 && adjusted < 1.0, "adjusted = {}", adjusted);
    }

    /// Property: fractional and vanishingly small responses also land in (0, 1)
    #[test]
    fn prop_adjusted_ratio_is_open_unit_for_any_scale(
        optimal in 1e-6f64..1e12,
        share in 0.0f64..=1.0,
        tiny in 0.0f64..1e-300,
    ) {
        for response in [optimal * share, tiny] {
            if response > optimal {
                continue;
            }
            let (_, adjusted, _) = adjust_ratio(response, optimal).unwrap();
            prop_assert!(
                adjusted > 0.0 && adjusted < 1.0,
                "response = {}, optimal = {}, adjusted = {}", response, optimal, adjusted
            );
        }
    }

    /// Property: responses above the optimum are rejected
    #[test]
    fn prop_ratio_above_one_rejected(optimal in 1u32..5000, extra in 1u32..100) {
        let optimal = f64::from(optimal);
        prop_assert!(adjust_ratio(optimal + f64::from(extra), optimal).is_err());
    }

    /// Property: normalized trials stay within [-0.5, 0.5] and the last
    /// trial maps to +0.5 under both scalings
    #[test]
    fn prop_normalized_trial_in_range(max_trial in 2u32..200, seed in 0u32..1000) {
        let trial = 1 + seed % max_trial;
        for scaling in [TrialScaling::Endpoints, TrialScaling::Offset] {
            let t = normalize_trial(trial, max_trial, scaling);
            prop_assert!((-0.5..=0.5).contains(&t));
            prop_assert_eq!(normalize_trial(max_trial, max_trial, scaling), 0.5);
        }
        prop_assert_eq!(normalize_trial(1, max_trial, TrialScaling::Endpoints), -0.5);
    }

    /// Property: wider intervals contain narrower ones and every interval
    /// contains the median
    #[test]
    fn prop_intervals_are_nested(values in draws()) {
        let summary = summarizer().summarize(&values).unwrap();
        prop_assert_eq!(summary.intervals.len(), 3);
        for pair in summary.intervals.windows(2) {
            prop_assert!(pair[1].contains(&pair[0]));
        }
        for interval in &summary.intervals {
            prop_assert!(interval.lower <= summary.median && summary.median <= interval.upper);
        }
    }

    /// Property: A - B is exactly the negation of B - A
    #[test]
    fn prop_differences_are_antisymmetric(
        pairs in prop::collection::vec((-1.0f64..1.0, -1.0f64..1.0), 1..100)
    ) {
        let (a, b): (Vec<f64>, Vec<f64>) = pairs.into_iter().unzip();
        let forward = difference_series(&a, &b);
        let backward = difference_series(&b, &a);
        for (f, r) in forward.iter().zip(&backward) {
            prop_assert_eq!(*f, -*r);
        }
    }

    /// Property: the control reference row is exactly zero
    #[test]
    fn prop_control_reference_row_is_zero(a in draws(), shift in -1.0f64..1.0) {
        let b: Vec<f64> = a.iter().map(|v| v + shift).collect();
        let draws = ConditionDraws::new(
            Quantity::Mean,
            vec![("bars".to_string(), a), ("hops".to_string(), b)],
        )
        .unwrap();
        let comparisons = control_contrasts(&draws, "hops", &summarizer()).unwrap();

        let reference = &comparisons[0];
        prop_assert!(reference.is_reference);
        prop_assert_eq!(reference.level.as_str(), "hops");
        prop_assert_eq!(reference.summary.median, 0.0);
        for interval in &reference.summary.intervals {
            prop_assert_eq!((interval.lower, interval.upper), (0.0, 0.0));
        }
        prop_assert!(reference.prob_positive.is_none());
    }

    /// Property: N levels and M points give N x M distinct rows
    #[test]
    fn prop_grid_is_full_cross_product(levels in 1usize..6, points in 2usize..30) {
        let names: Vec<String> = (0..levels).map(|i| format!("level{i}")).collect();
        let grid = prediction_grid(&names, (-0.5, 0.5), points);
        prop_assert_eq!(grid.len(), levels * points);

        let distinct: HashSet<(String, u64)> = grid
            .iter()
            .map(|row| (row.condition.clone(), row.trial_normalized.to_bits()))
            .collect();
        prop_assert_eq!(distinct.len(), grid.len());
        prop_assert!(grid.iter().all(|row| (-0.5..=0.5).contains(&row.trial_normalized)));
    }
}
