use crate::core::reference::ReferenceConfig;
use crate::domain::model::{HexCell, TerritoryEstimate};
use std::collections::BTreeMap;

/// Mean value of every indicator over the given hexes.
pub fn mean_indicators(hexes: &[HexCell]) -> BTreeMap<String, f64> {
    let mut sums: BTreeMap<String, (f64, usize)> = BTreeMap::new();
    for hex in hexes {
        for (indicator, value) in &hex.indicators {
            let entry = sums.entry(indicator.clone()).or_insert((0.0, 0));
            entry.0 += value;
            entry.1 += 1;
        }
    }
    sums.into_iter()
        .map(|(indicator, (sum, count))| (indicator, sum / count as f64))
        .collect()
}

/// Suitability of a territory for every ranked object type.
///
/// `score = Σ weight(ind) × (mean(ind) - min(ind))`, rounded to two decimals.
/// Indicators no hex carries are skipped; a missing minimum counts as 0.
pub fn estimate_territory(hexes: &[HexCell], reference: &ReferenceConfig) -> TerritoryEstimate {
    if hexes.is_empty() {
        tracing::warn!("No hexes inside the territory, nothing to estimate");
        return TerritoryEstimate::new();
    }

    let means = mean_indicators(hexes);
    let mut estimate = TerritoryEstimate::new();

    for object_type in reference.ranked_object_types() {
        let min_values = reference.min_values(object_type);
        let score: f64 = reference
            .weights(object_type)
            .iter()
            .filter_map(|(indicator, weight)| {
                let mean = means.get(indicator)?;
                let minimum = min_values
                    .and_then(|values| values.get(indicator))
                    .copied()
                    .unwrap_or(0.0);
                Some(weight * (mean - minimum))
            })
            .sum();
        estimate.insert(object_type, round2(score));
    }

    tracing::debug!(
        "Territory of {} hexes scored for {} object types",
        hexes.len(),
        estimate.len()
    );
    estimate
}

fn round2(value: f64) -> f64 {
    let rounded = (value * 100.0).round() / 100.0;
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}
