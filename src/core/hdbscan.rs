//! Hierarchical density-based clustering (HDBSCAN) for small feature vectors.
//!
//! Steps:
//! 1. Core distance of each point: distance to its `min_samples`-th nearest
//!    neighbour, the point itself counted as the first.
//! 2. Mutual reachability `MR(a, b) = max(core(a), core(b), dist(a, b))`.
//! 3. Minimum spanning tree over MR with Prim's algorithm (dense, O(n²), no
//!    distance matrix kept in memory).
//! 4. Single linkage hierarchy from the sorted tree edges (union-find).
//! 5. Condensed tree: splits where a side is smaller than `min_cluster_size`
//!    are treated as points falling out of the parent cluster.
//! 6. Excess-of-mass selection; clusters larger than `max_cluster_size` are
//!    never selected, their children compete instead.
//!
//! Output labels are `0..k` in condensed tree order, noise is [`NOISE_LABEL`].
//! The result depends only on the input order and the parameters.

use crate::domain::model::NOISE_LABEL;
use crate::utils::error::{PriocError, Result};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};

/// Smallest distance used when turning distances into densities (1 / d).
const MIN_DISTANCE: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HdbscanParams {
    pub min_cluster_size: usize,
    pub min_samples: usize,
    /// 0 disables the limit.
    pub max_cluster_size: usize,
}

impl Default for HdbscanParams {
    fn default() -> Self {
        Self {
            min_cluster_size: 3,
            min_samples: 3,
            max_cluster_size: 15,
        }
    }
}

impl HdbscanParams {
    pub fn validate(&self) -> Result<()> {
        if self.min_cluster_size < 2 {
            return Err(PriocError::InvalidConfigValueError {
                field: "clustering.min_cluster_size".to_string(),
                value: self.min_cluster_size.to_string(),
                reason: "Clusters need at least 2 members".to_string(),
            });
        }
        if self.min_samples < 1 {
            return Err(PriocError::InvalidConfigValueError {
                field: "clustering.min_samples".to_string(),
                value: self.min_samples.to_string(),
                reason: "At least one sample is required".to_string(),
            });
        }
        if self.max_cluster_size != 0 && self.max_cluster_size < self.min_cluster_size {
            return Err(PriocError::InvalidConfigValueError {
                field: "clustering.max_cluster_size".to_string(),
                value: self.max_cluster_size.to_string(),
                reason: "Must not be below min_cluster_size".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
struct Merge {
    left: usize,
    right: usize,
    distance: f64,
    size: usize,
}

#[derive(Debug, Clone, Copy)]
struct CondensedEdge {
    parent: usize,
    child: usize,
    lambda: f64,
    size: usize,
}

/// Clusterer behind the hex estimator; not part of the public API.
#[derive(Debug, Clone)]
pub(crate) struct Hdbscan {
    params: HdbscanParams,
}

impl Hdbscan {
    pub(crate) fn new(params: HdbscanParams) -> Self {
        Self { params }
    }

    /// Cluster label per point; `cancel` is polled between phases.
    pub(crate) fn fit_predict<const D: usize>(
        &self,
        points: &[[f64; D]],
        cancel: &AtomicBool,
    ) -> Result<Vec<i32>> {
        let n = points.len();
        if n < self.params.min_cluster_size || n < 2 {
            tracing::debug!(
                "{} points, fewer than min_cluster_size {}: everything is noise",
                n,
                self.params.min_cluster_size
            );
            return Ok(vec![NOISE_LABEL; n]);
        }

        let core = self.core_distances(points, cancel)?;
        let mst = minimum_spanning_tree(points, &core, cancel)?;
        let hierarchy = single_linkage(&mst, n);
        check(cancel)?;

        let condensed = condense(&hierarchy, n, self.params.min_cluster_size);
        let selected = self.select_clusters(&condensed, n);
        let labels = assign_labels(&condensed, &selected, n);

        tracing::debug!(
            "HDBSCAN over {} points: {} clusters, {} noise",
            n,
            selected.iter().filter(|s| **s).count(),
            labels.iter().filter(|l| **l == NOISE_LABEL).count()
        );
        Ok(labels)
    }

    fn core_distances<const D: usize>(
        &self,
        points: &[[f64; D]],
        cancel: &AtomicBool,
    ) -> Result<Vec<f64>> {
        let n = points.len();
        // The point itself is the first sample.
        let neighbour = self.params.min_samples.saturating_sub(1).min(n - 1);
        let mut core = Vec::with_capacity(n);
        let mut distances = Vec::with_capacity(n);

        for i in 0..n {
            if i % 256 == 0 {
                check(cancel)?;
            }
            if neighbour == 0 {
                core.push(0.0);
                continue;
            }
            distances.clear();
            distances.extend(
                (0..n)
                    .filter(|&j| j != i)
                    .map(|j| euclidean(&points[i], &points[j])),
            );
            let (_, kth, _) = distances.select_nth_unstable_by(neighbour - 1, f64::total_cmp);
            core.push(*kth);
        }
        Ok(core)
    }

    fn select_clusters(&self, condensed: &[CondensedEdge], n: usize) -> Vec<bool> {
        let root = n;
        let cluster_count = condensed
            .iter()
            .map(|edge| edge.parent.max(edge.child))
            .filter(|&label| label >= n)
            .max()
            .map(|max| max - n + 1)
            .unwrap_or(1);

        let mut birth = vec![0.0; cluster_count];
        let mut size = vec![n; cluster_count];
        let mut children: Vec<Vec<usize>> = vec![Vec::new(); cluster_count];
        for edge in condensed.iter().filter(|edge| edge.child >= n) {
            birth[edge.child - n] = edge.lambda;
            size[edge.child - n] = edge.size;
            children[edge.parent - n].push(edge.child);
        }

        let mut stability = vec![0.0; cluster_count];
        for edge in condensed {
            let parent = edge.parent - n;
            stability[parent] += (edge.lambda - birth[parent]) * edge.size as f64;
        }

        let max_size = if self.params.max_cluster_size == 0 {
            n + 1
        } else {
            self.params.max_cluster_size
        };

        let mut selected = vec![true; cluster_count];
        selected[root - n] = false;

        // Children always carry larger labels than their parent.
        for cluster in (1..cluster_count).rev() {
            let subtree: f64 = children[cluster].iter().map(|c| stability[c - n]).sum();
            if subtree > stability[cluster] || size[cluster] > max_size {
                selected[cluster] = false;
                stability[cluster] = subtree;
            } else {
                let mut queue: VecDeque<usize> = children[cluster].iter().copied().collect();
                while let Some(descendant) = queue.pop_front() {
                    selected[descendant - n] = false;
                    queue.extend(children[descendant - n].iter().copied());
                }
            }
        }

        selected
    }
}

fn check(cancel: &AtomicBool) -> Result<()> {
    if cancel.load(Ordering::Relaxed) {
        Err(PriocError::Cancelled)
    } else {
        Ok(())
    }
}

fn euclidean<const D: usize>(a: &[f64; D], b: &[f64; D]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

fn lambda(distance: f64) -> f64 {
    1.0 / distance.max(MIN_DISTANCE)
}

/// Prim's algorithm over mutual reachability; edges come back sorted by weight.
fn minimum_spanning_tree<const D: usize>(
    points: &[[f64; D]],
    core: &[f64],
    cancel: &AtomicBool,
) -> Result<Vec<(usize, usize, f64)>> {
    let n = points.len();
    let mut in_tree = vec![false; n];
    let mut best = vec![f64::INFINITY; n];
    let mut from = vec![0usize; n];
    let mut edges = Vec::with_capacity(n - 1);

    let mut current = 0;
    in_tree[current] = true;
    for step in 1..n {
        if step % 256 == 0 {
            check(cancel)?;
        }
        for j in 0..n {
            if in_tree[j] {
                continue;
            }
            let reach = euclidean(&points[current], &points[j])
                .max(core[current])
                .max(core[j]);
            if reach < best[j] {
                best[j] = reach;
                from[j] = current;
            }
        }

        let mut next = None;
        for j in 0..n {
            if in_tree[j] {
                continue;
            }
            match next {
                Some(k) if best[k] <= best[j] => {}
                _ => next = Some(j),
            }
        }
        let Some(next) = next else { break };

        in_tree[next] = true;
        edges.push((from[next], next, best[next]));
        current = next;
    }

    edges.sort_by(|a, b| a.2.total_cmp(&b.2));
    Ok(edges)
}

fn single_linkage(mst: &[(usize, usize, f64)], n: usize) -> Vec<Merge> {
    let mut parent: Vec<usize> = (0..2 * n - 1).collect();
    let mut size = vec![1usize; 2 * n - 1];
    let mut merges = Vec::with_capacity(n - 1);

    fn find(parent: &mut [usize], mut node: usize) -> usize {
        let mut root = node;
        while parent[root] != root {
            root = parent[root];
        }
        while parent[node] != root {
            let next = parent[node];
            parent[node] = root;
            node = next;
        }
        root
    }

    for (index, &(a, b, distance)) in mst.iter().enumerate() {
        let left = find(&mut parent, a);
        let right = find(&mut parent, b);
        let node = n + index;
        size[node] = size[left] + size[right];
        parent[left] = node;
        parent[right] = node;
        merges.push(Merge {
            left,
            right,
            distance,
            size: size[node],
        });
    }

    merges
}

fn node_size(hierarchy: &[Merge], n: usize, node: usize) -> usize {
    if node < n {
        1
    } else {
        hierarchy[node - n].size
    }
}

fn descendants(hierarchy: &[Merge], n: usize, node: usize) -> Vec<usize> {
    let mut out = Vec::new();
    let mut queue = VecDeque::from([node]);
    while let Some(current) = queue.pop_front() {
        out.push(current);
        if current >= n {
            let merge = &hierarchy[current - n];
            queue.push_back(merge.left);
            queue.push_back(merge.right);
        }
    }
    out
}

/// Condensed cluster tree; cluster labels start at `n` (the root).
fn condense(hierarchy: &[Merge], n: usize, min_cluster_size: usize) -> Vec<CondensedEdge> {
    let root = 2 * n - 2;
    let mut relabel = vec![0usize; 2 * n - 1];
    let mut ignore = vec![false; 2 * n - 1];
    let mut next_label = n + 1;
    relabel[root] = n;

    let mut result = Vec::new();

    for node in descendants(hierarchy, n, root) {
        if ignore[node] || node < n {
            continue;
        }
        let merge = hierarchy[node - n];
        let lambda_value = lambda(merge.distance);
        let left_count = node_size(hierarchy, n, merge.left);
        let right_count = node_size(hierarchy, n, merge.right);
        let parent = relabel[node];

        let fall_out = |side: usize, ignore: &mut Vec<bool>, result: &mut Vec<CondensedEdge>| {
            for sub in descendants(hierarchy, n, side) {
                if sub < n {
                    result.push(CondensedEdge {
                        parent,
                        child: sub,
                        lambda: lambda_value,
                        size: 1,
                    });
                }
                ignore[sub] = true;
            }
        };

        match (left_count >= min_cluster_size, right_count >= min_cluster_size) {
            (true, true) => {
                for (side, count) in [(merge.left, left_count), (merge.right, right_count)] {
                    relabel[side] = next_label;
                    next_label += 1;
                    result.push(CondensedEdge {
                        parent,
                        child: relabel[side],
                        lambda: lambda_value,
                        size: count,
                    });
                }
            }
            (false, false) => {
                fall_out(merge.left, &mut ignore, &mut result);
                fall_out(merge.right, &mut ignore, &mut result);
            }
            (false, true) => {
                relabel[merge.right] = parent;
                fall_out(merge.left, &mut ignore, &mut result);
            }
            (true, false) => {
                relabel[merge.left] = parent;
                fall_out(merge.right, &mut ignore, &mut result);
            }
        }
    }

    result
}

fn assign_labels(condensed: &[CondensedEdge], selected: &[bool], n: usize) -> Vec<i32> {
    let cluster_count = selected.len();
    let mut cluster_parent: Vec<Option<usize>> = vec![None; cluster_count];
    for edge in condensed.iter().filter(|edge| edge.child >= n) {
        cluster_parent[edge.child - n] = Some(edge.parent);
    }

    let mut label_of = vec![NOISE_LABEL; cluster_count];
    let mut next = 0;
    for (index, is_selected) in selected.iter().enumerate() {
        if *is_selected {
            label_of[index] = next;
            next += 1;
        }
    }

    let mut labels = vec![NOISE_LABEL; n];
    for edge in condensed.iter().filter(|edge| edge.child < n) {
        let mut cluster = Some(edge.parent);
        while let Some(current) = cluster {
            if selected[current - n] {
                labels[edge.child] = label_of[current - n];
                break;
            }
            cluster = cluster_parent[current - n];
        }
    }
    labels
}
