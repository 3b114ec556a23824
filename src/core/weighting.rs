use std::collections::BTreeMap;

/// Turns an importance ranking (1 = most important) into weights summing to 1.
///
/// `weight(i) = (n - rank(i) + 1) / Σ (n - rank(j) + 1)`; equal ranks share
/// equal weight.
pub fn rank_weights(ranks: &BTreeMap<String, i64>) -> BTreeMap<String, f64> {
    let n = ranks.len() as i64;
    let denominator: i64 = ranks.values().map(|rank| n - rank + 1).sum();
    if denominator == 0 {
        return BTreeMap::new();
    }

    ranks
        .iter()
        .map(|(indicator, rank)| {
            (
                indicator.clone(),
                (n - rank + 1) as f64 / denominator as f64,
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn ranks(pairs: &[(&str, i64)]) -> BTreeMap<String, i64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_three_indicators() {
        let weights = rank_weights(&ranks(&[("A", 1), ("B", 2), ("C", 3)]));
        assert_abs_diff_eq!(weights["A"], 0.5, epsilon = 1e-4);
        assert_abs_diff_eq!(weights["B"], 0.3333, epsilon = 1e-4);
        assert_abs_diff_eq!(weights["C"], 0.1667, epsilon = 1e-4);
    }

    #[test]
    fn test_weights_sum_to_one_and_do_not_grow_with_rank() {
        let weights = rank_weights(&ranks(&[
            ("population", 2),
            ("transport", 1),
            ("ecology", 4),
            ("social", 2),
            ("engineering", 5),
        ]));
        assert_abs_diff_eq!(weights.values().sum::<f64>(), 1.0, epsilon = 1e-12);

        let mut by_rank: Vec<(i64, f64)> = vec![
            (2, weights["population"]),
            (1, weights["transport"]),
            (4, weights["ecology"]),
            (2, weights["social"]),
            (5, weights["engineering"]),
        ];
        by_rank.sort_by_key(|(rank, _)| *rank);
        for pair in by_rank.windows(2) {
            assert!(pair[0].1 >= pair[1].1);
        }
        assert_eq!(weights["population"], weights["social"]);
    }

    #[test]
    fn test_single_indicator_gets_everything() {
        let weights = rank_weights(&ranks(&[("only", 1)]));
        assert_eq!(weights["only"], 1.0);
    }

    #[test]
    fn test_empty_ranking() {
        assert!(rank_weights(&BTreeMap::new()).is_empty());
    }
}
