//! Weighted aggregation of per-criterion scores.

use std::collections::HashMap;

use super::types::Criterion;

/// Round to two decimal places, the canonical representation of
/// `overall_score` for the rest of the pipeline and for storage.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Weighted average of the supplied scores over the criteria set.
///
/// A criterion with no entry in `scores` contributes 0.0 (collaborators may
/// filter criteria mid-flight; that is tolerated, not an error). Zero total
/// weight, e.g. an empty criteria set, yields 0.0 rather than a division
/// error.
pub fn aggregate(criteria: &[Criterion], scores: &HashMap<String, f64>) -> f64 {
    let mut total_weighted_score = 0.0;
    let mut total_weight = 0.0;

    for criterion in criteria {
        let score = scores.get(&criterion.name).copied().unwrap_or(0.0);
        total_weighted_score += score * criterion.weight;
        total_weight += criterion.weight;
    }

    let overall = if total_weight > 0.0 {
        total_weighted_score / total_weight
    } else {
        0.0
    };

    round2(overall)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scores(entries: &[(&str, f64)]) -> HashMap<String, f64> {
        entries
            .iter()
            .map(|(name, score)| (name.to_string(), *score))
            .collect()
    }

    #[test]
    fn weighted_average() {
        let criteria = vec![
            Criterion::weighted("A", "", 1.0),
            Criterion::weighted("B", "", 2.0),
        ];
        let overall = aggregate(&criteria, &scores(&[("A", 8.0), ("B", 4.0)]));
        // (8*1 + 4*2) / 3 = 5.333... -> 5.33
        assert!((overall - 5.33).abs() < 1e-9);
    }

    #[test]
    fn empty_criteria_yields_zero() {
        let overall = aggregate(&[], &HashMap::new());
        assert_eq!(overall, 0.0);
    }

    #[test]
    fn zero_total_weight_yields_zero() {
        let criteria = vec![Criterion::weighted("A", "", 0.0)];
        let overall = aggregate(&criteria, &scores(&[("A", 9.0)]));
        assert_eq!(overall, 0.0);
    }

    #[test]
    fn missing_score_contributes_zero() {
        let criteria = vec![
            Criterion::weighted("A", "", 1.0),
            Criterion::weighted("B", "", 1.0),
        ];
        let overall = aggregate(&criteria, &scores(&[("A", 8.0)]));
        assert!((overall - 4.0).abs() < 1e-9);
    }

    #[test]
    fn uniform_scores_survive_uneven_weights() {
        let criteria = vec![
            Criterion::weighted("a", "", 1.0),
            Criterion::weighted("b", "", 1.2),
            Criterion::weighted("c", "", 0.9),
            Criterion::weighted("d", "", 1.1),
        ];
        let overall = aggregate(
            &criteria,
            &scores(&[("a", 7.0), ("b", 7.0), ("c", 7.0), ("d", 7.0)]),
        );
        assert!((overall - 7.0).abs() < 1e-9);
    }

    #[test]
    fn rounds_to_two_decimals() {
        assert_eq!(round2(5.333333), 5.33);
        assert_eq!(round2(5.335), 5.34);
        assert_eq!(round2(7.0), 7.0);
    }
}
