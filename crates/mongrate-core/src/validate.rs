//! Cycle and violation detection.
//!
//! A graph is a valid forest when it has no directed cycle over embedding
//! edges, no multi-parent node, and no reference fan-in on a node the
//! duplication transform is barred from splitting. Only valid graphs reach
//! size propagation and ranking.

use std::collections::BTreeSet;

use crate::graph::{EdgeId, Graph, NodeId};

/// Why a graph is not (yet) a valid forest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    /// A directed cycle over embedding edges; the payload is the edge path
    /// from the revisited node back to itself
    Cycle(Vec<EdgeId>),

    /// A node with two or more incoming edges of which at least one is an
    /// embedding
    MultiParent(NodeId),

    /// A `no_duplicate` node referenced from more than one other node
    InvalidRefs(NodeId),
}

/// First directed cycle over embedding edges, if any.
///
/// Iterative depth-first search in id order; the first back edge closes the
/// cycle and the edge path from the revisited node is returned. Any one
/// cycle suffices for the search driver.
pub fn find_cycle(graph: &Graph) -> Option<Vec<EdgeId>> {
    let mut visited: BTreeSet<NodeId> = BTreeSet::new();

    for start in graph.node_ids() {
        if visited.contains(&start) {
            continue;
        }
        visited.insert(start);

        // frame: (node, outgoing embedding edges, next edge index)
        let mut frames: Vec<(NodeId, Vec<EdgeId>, usize)> =
            vec![(start, graph.embedding_out(start), 0)];
        let mut path_edges: Vec<EdgeId> = Vec::new();
        let mut on_path: BTreeSet<NodeId> = BTreeSet::from([start]);

        while let Some(frame) = frames.last_mut() {
            if frame.2 < frame.1.len() {
                let edge_id = frame.1[frame.2];
                frame.2 += 1;
                let to = graph.edge(edge_id).to;

                if on_path.contains(&to) {
                    let pos = frames
                        .iter()
                        .position(|f| f.0 == to)
                        .expect("on-path node has a frame");
                    let mut cycle = path_edges[pos..].to_vec();
                    cycle.push(edge_id);
                    return Some(cycle);
                }
                if visited.insert(to) {
                    on_path.insert(to);
                    path_edges.push(edge_id);
                    frames.push((to, graph.embedding_out(to), 0));
                }
            } else {
                let (node, _, _) = frames.pop().expect("frame present");
                on_path.remove(&node);
                path_edges.pop();
            }
        }
    }
    None
}

/// First node (in id order) with two or more incoming edges of which at
/// least one is an embedding.
///
/// Multiple incoming references alone are fine: such a node stays a root
/// collection that every referencing document can address by name. Mixing a
/// reference into an embedded node would leave the reference pointing at a
/// collection that does not exist.
pub fn find_multi_parent(graph: &Graph) -> Option<NodeId> {
    graph
        .nodes()
        .find(|n| {
            n.incoming.len() >= 2 && graph.incoming_edges(n.id).any(|e| e.is_embedding())
        })
        .map(|n| n.id)
}

/// First `no_duplicate` node with two or more non-self incoming reference
/// edges. Self-loops are counted separately and never disqualify.
pub fn find_invalid_refs(graph: &Graph) -> Option<NodeId> {
    graph
        .nodes()
        .find(|n| {
            n.no_duplicate
                && graph
                    .incoming_edges(n.id)
                    .filter(|e| e.reference && !e.is_self_loop())
                    .count()
                    >= 2
        })
        .map(|n| n.id)
}

/// First violation found, checked in the order the search driver prefers:
/// multi-parent nodes, then cycles, then reference fan-in.
pub fn find_violation(graph: &Graph) -> Option<Violation> {
    if let Some(node) = find_multi_parent(graph) {
        return Some(Violation::MultiParent(node));
    }
    if let Some(cycle) = find_cycle(graph) {
        return Some(Violation::Cycle(cycle));
    }
    find_invalid_refs(graph).map(Violation::InvalidRefs)
}

/// A graph is valid iff no check reports a violation.
pub fn is_valid(graph: &Graph) -> bool {
    find_violation(graph).is_none()
}

/// Whether `node` lies on an undirected cycle of embedding edges.
///
/// Edges are walked in both directions but never reused on a path. A node
/// off every such cycle gains nothing from duplication: a single reversal
/// or reference already resolves its conflicts.
pub fn on_undirected_cycle(graph: &Graph, node: NodeId) -> bool {
    // Undirected incident embedding edges, by id for determinism.
    let incident = |n: NodeId| -> Vec<EdgeId> {
        let mut edges: Vec<EdgeId> = graph
            .incoming_edges(n)
            .chain(graph.outgoing_edges(n))
            .filter(|e| e.is_embedding() && !e.is_self_loop())
            .map(|e| e.id)
            .collect();
        edges.sort_unstable();
        edges.dedup();
        edges
    };

    let other_end = |e: EdgeId, n: NodeId| -> NodeId {
        let edge = graph.edge(e);
        if edge.from == n {
            edge.to
        } else {
            edge.from
        }
    };

    let mut visited: BTreeSet<NodeId> = BTreeSet::from([node]);
    // frame: (node, entry edge, incident edges, next index)
    let mut frames: Vec<(NodeId, Option<EdgeId>, Vec<EdgeId>, usize)> =
        vec![(node, None, incident(node), 0)];

    while let Some(frame) = frames.last_mut() {
        if frame.2.len() <= frame.3 {
            frames.pop();
            continue;
        }
        let edge_id = frame.2[frame.3];
        frame.3 += 1;

        if Some(edge_id) == frame.1 {
            continue;
        }
        let next = other_end(edge_id, frame.0);
        if next == node {
            // closed a walk back to the start on a fresh edge
            return true;
        }
        if visited.insert(next) {
            frames.push((next, Some(edge_id), incident(next), 0));
        }
    }
    false
}
