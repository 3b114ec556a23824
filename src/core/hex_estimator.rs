//! Scoring, clustering and contiguity repair of hex cells.

use crate::core::hdbscan::{Hdbscan, HdbscanParams};
use crate::core::reference::ReferenceConfig;
use crate::core::spatial;
use crate::domain::model::{Cluster, HexCell, ObjectType, NOISE_LABEL};
use crate::utils::error::{PriocError, Result};
use crate::utils::projection::utm_to_web_mercator;
use geo::Centroid;
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::AtomicBool;

/// Sets `weighted_score` to the rank-weighted sum of the hex indicators.
pub fn weight_hexes(
    mut hexes: Vec<HexCell>,
    object_type: ObjectType,
    reference: &ReferenceConfig,
) -> Vec<HexCell> {
    let weights = reference.weights(object_type);
    if weights.is_empty() {
        tracing::warn!("No indicator ranking for {}, scores will be 0", object_type);
    }

    for hex in &mut hexes {
        let score = weights
            .iter()
            .filter_map(|(indicator, weight)| hex.indicator(indicator).map(|value| weight * value))
            .sum();
        hex.weighted_score = Some(score);
    }
    hexes
}

/// Labels hexes by density of (Web Mercator centroid, score) and drops noise.
///
/// Blocking; run it off the async executor.
pub fn cluster_hexes(
    hexes: Vec<HexCell>,
    params: HdbscanParams,
    cancel: &AtomicBool,
) -> Result<Vec<HexCell>> {
    let features = hexes
        .iter()
        .map(|hex| {
            let centroid = hex
                .geometry
                .centroid()
                .ok_or_else(|| PriocError::InvalidGeometry {
                    reason: format!("hex {} has an empty geometry", hex.id),
                })?;
            let projected = utm_to_web_mercator(centroid.0);
            Ok::<_, PriocError>([projected.x, projected.y, hex.weighted_score.unwrap_or(0.0)])
        })
        .collect::<Result<Vec<[f64; 3]>>>()?;

    let labels = Hdbscan::new(params).fit_predict(&features, cancel)?;

    let clustered: Vec<HexCell> = hexes
        .into_iter()
        .zip(labels)
        .filter(|(_, label)| *label != NOISE_LABEL)
        .map(|(mut hex, label)| {
            hex.cluster = Some(label);
            hex
        })
        .collect();

    tracing::info!("{} hexes assigned to clusters", clustered.len());
    Ok(clustered)
}

/// One contiguous record per cluster label.
///
/// Members of a label that fall into several touching components are cut down
/// to the largest component; on a tie the component holding the earliest
/// member wins.
pub fn clarify_clusters(hexes: &[HexCell]) -> Vec<Cluster> {
    let mut by_label: BTreeMap<i32, Vec<&HexCell>> = BTreeMap::new();
    for hex in hexes {
        match hex.cluster {
            Some(label) if label != NOISE_LABEL => by_label.entry(label).or_default().push(hex),
            _ => {}
        }
    }

    by_label
        .into_iter()
        .map(|(label, members)| {
            let component = largest_component(&members);
            if component.len() < members.len() {
                tracing::debug!(
                    "Cluster {}: kept {} of {} hexes after contiguity repair",
                    label,
                    component.len(),
                    members.len()
                );
            }
            let kept: Vec<&HexCell> = component.into_iter().map(|index| members[index]).collect();
            build_cluster(label, &kept)
        })
        .collect()
}

/// Indices of the largest connected component of the touching graph.
fn largest_component(members: &[&HexCell]) -> Vec<usize> {
    let n = members.len();
    let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); n];
    for i in 0..n {
        for j in (i + 1)..n {
            if spatial::touches(&members[i].geometry, &members[j].geometry) {
                adjacency[i].push(j);
                adjacency[j].push(i);
            }
        }
    }

    let mut visited = vec![false; n];
    let mut best: Vec<usize> = Vec::new();
    for start in 0..n {
        if visited[start] {
            continue;
        }
        visited[start] = true;
        let mut component = vec![start];
        let mut queue = VecDeque::from([start]);
        while let Some(node) = queue.pop_front() {
            for &next in &adjacency[node] {
                if !visited[next] {
                    visited[next] = true;
                    component.push(next);
                    queue.push_back(next);
                }
            }
        }
        if component.len() > best.len() {
            best = component;
        }
    }

    best.sort_unstable();
    best
}

fn build_cluster(label: i32, members: &[&HexCell]) -> Cluster {
    let mut sums: BTreeMap<String, (f64, usize)> = BTreeMap::new();
    for hex in members {
        for (indicator, value) in &hex.indicators {
            let entry = sums.entry(indicator.clone()).or_insert((0.0, 0));
            entry.0 += value;
            entry.1 += 1;
        }
    }

    let scores: Vec<f64> = members.iter().filter_map(|hex| hex.weighted_score).collect();
    let mean_weighted_score = if scores.is_empty() {
        None
    } else {
        Some(scores.iter().sum::<f64>() / scores.len() as f64)
    };

    Cluster {
        label,
        members: members.iter().map(|hex| hex.id).collect(),
        geometry: spatial::dissolve(members.iter().map(|hex| &hex.geometry)),
        mean_indicators: sums
            .into_iter()
            .map(|(indicator, (sum, count))| (indicator, sum / count as f64))
            .collect(),
        mean_weighted_score,
    }
}
