//! Duplication clusters: connected components of the similarity graph.

use std::collections::BTreeMap;

use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::unionfind::UnionFind;
use petgraph::visit::EdgeRef;
use serde::Serialize;
use steward_core::types::{Severity, Subject, Violation, ViolationKind};

use crate::monitor::SimilarityPair;

/// A group of mutually reachable near-duplicates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DuplicationCluster {
    /// Sorted member paths.
    pub members: Vec<String>,
    pub mean_weight: f64,
    pub edges: usize,
}

/// Components of size ≥ 2 over edges scoring at least `edge_threshold`,
/// ordered by their first member.
pub fn find_clusters(pairs: &[SimilarityPair], edge_threshold: f64) -> Vec<DuplicationCluster> {
    let mut graph: UnGraph<&str, f64> = UnGraph::new_undirected();
    let mut nodes: BTreeMap<&str, NodeIndex> = BTreeMap::new();
    for pair in pairs.iter().filter(|p| p.score >= edge_threshold) {
        let a = *nodes.entry(pair.a.as_str()).or_insert_with(|| graph.add_node(pair.a.as_str()));
        let b = *nodes.entry(pair.b.as_str()).or_insert_with(|| graph.add_node(pair.b.as_str()));
        graph.add_edge(a, b, pair.score);
    }

    let mut components = UnionFind::new(graph.node_count());
    for edge in graph.edge_references() {
        components.union(edge.source().index(), edge.target().index());
    }

    let mut grouped: BTreeMap<usize, (Vec<String>, f64, usize)> = BTreeMap::new();
    for node in graph.node_indices() {
        let root = components.find(node.index());
        grouped.entry(root).or_default().0.push(graph[node].to_string());
    }
    for edge in graph.edge_references() {
        let root = components.find(edge.source().index());
        let entry = grouped.entry(root).or_default();
        entry.1 += *edge.weight();
        entry.2 += 1;
    }

    let mut clusters: Vec<DuplicationCluster> = grouped
        .into_values()
        .filter(|(members, _, edges)| members.len() >= 2 && *edges > 0)
        .map(|(mut members, sum, edges)| {
            members.sort();
            DuplicationCluster {
                members,
                mean_weight: sum / edges as f64,
                edges,
            }
        })
        .collect();
    clusters.sort_by(|a, b| a.members.cmp(&b.members));
    clusters
}

/// One predictive DuplicationCluster violation per cluster; confidence is the
/// mean edge weight.
pub fn cluster_violation(cluster: &DuplicationCluster, edge_threshold: f64, now: i64) -> Violation {
    Violation::predictive(
        ViolationKind::DuplicationCluster,
        Severity::Medium,
        Subject::group(cluster.members.iter().cloned()),
        cluster.mean_weight,
        edge_threshold,
        cluster.mean_weight,
        None,
        now,
    )
    .with_message(format!(
        "{} files form a duplication cluster (mean similarity {:.2})",
        cluster.members.len(),
        cluster.mean_weight
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(a: &str, b: &str, score: f64) -> SimilarityPair {
        SimilarityPair {
            a: a.into(),
            b: b.into(),
            score,
        }
    }

    #[test]
    fn transitive_components() {
        let pairs = vec![
            pair("a.md", "b.md", 0.4),
            pair("b.md", "c.md", 0.2),
            pair("d.md", "e.md", 0.6),
            pair("a.md", "e.md", 0.1),
        ];
        let clusters = find_clusters(&pairs, 0.15);
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].members, vec!["a.md", "b.md", "c.md"]);
        assert!((clusters[0].mean_weight - 0.3).abs() < 1e-12);
        assert_eq!(clusters[1].members, vec!["d.md", "e.md"]);
    }

    #[test]
    fn weak_edges_form_no_cluster() {
        assert!(find_clusters(&[pair("a.md", "b.md", 0.1)], 0.15).is_empty());
    }
}
