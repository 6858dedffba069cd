//! Candidate enumeration.
//!
//! The driver preprocesses the initial graph, then walks a LIFO worklist of
//! graph copies, applying one mutation per successor until each surviving
//! copy is a valid forest or the mutation budget runs out. The budget of
//! (2/3) x initial edge count is the only termination guarantee besides the
//! seen-shape set and must stay in place.

use std::collections::BTreeSet;

use tracing::{debug, trace};

use crate::graph::{EdgeId, Graph, NodeId};
use crate::validate;

/// Fraction of the initial edge count allowed as mutations per search path.
const MUTATION_BUDGET_RATIO: f64 = 2.0 / 3.0;

/// Prepare the initial graph for enumeration.
///
/// Self-loop edges cannot embed and are forced to references. A node keeps
/// its eligibility for duplication only when more than one of its incoming
/// edges is a real parent (non-reference, non-self) and it sits on an
/// undirected cycle of embedding edges; everywhere else a single reversal or
/// reference already resolves the conflict, so `no_duplicate` is set.
pub fn preprocess(graph: &mut Graph) {
    for edge_id in graph.edge_ids() {
        let edge = graph.edge(edge_id);
        if edge.is_self_loop() && !edge.reference {
            graph.make_ref(edge_id);
        }
    }

    for node_id in graph.node_ids() {
        let node = graph.node(node_id);
        if node.incoming.len() < 2 {
            continue;
        }
        let real_parents = graph
            .incoming_edges(node_id)
            .filter(|e| e.is_embedding() && !e.is_self_loop())
            .count();
        if real_parents <= 1 {
            graph.node_mut(node_id).no_duplicate = true;
        }
    }

    for node_id in graph.node_ids() {
        if !validate::on_undirected_cycle(graph, node_id) {
            graph.node_mut(node_id).no_duplicate = true;
        }
    }
}

/// Enumerate valid forests reachable from the preprocessed graph.
///
/// Depth-first over a stack of copies; shapes already seen are skipped, so
/// mutation orders that converge on the same forest yield one candidate.
/// Draining the worklist without a single valid shape is the "no viable
/// schema" outcome and returns an empty list.
pub fn enumerate_candidates(initial: Graph) -> Vec<Graph> {
    let budget = MUTATION_BUDGET_RATIO * initial.edge_count() as f64;
    let base_steps = initial.steps().len();

    let mut worklist = vec![initial];
    let mut seen: BTreeSet<String> = BTreeSet::new();
    let mut candidates = Vec::new();

    while let Some(graph) = worklist.pop() {
        if !seen.insert(graph.shape_signature()) {
            continue;
        }

        let focus = match violation_focus(&graph) {
            None => {
                trace!(steps = graph.steps().len(), "candidate admitted");
                candidates.push(graph);
                continue;
            }
            Some(focus) => focus,
        };

        let depth = graph.steps().len() - base_steps;
        if (depth as f64) >= budget {
            continue;
        }
        expand(&graph, focus, &mut worklist);
    }

    debug!(count = candidates.len(), "search drained");
    candidates
}

/// What a successor generation concentrates on.
enum Focus {
    /// A multi-parent node and its incoming edges
    Node(NodeId, Vec<EdgeId>),

    /// The edges of one detected cycle
    Edges(Vec<EdgeId>),
}

/// Pick the problem focus: a multi-parent node when one exists, otherwise
/// the first cycle. A graph invalid only through reference fan-in has no
/// focus left and is abandoned.
fn violation_focus(graph: &Graph) -> Option<Focus> {
    if validate::is_valid(graph) {
        return None;
    }
    if let Some(node) = validate::find_multi_parent(graph) {
        let edges = graph.node(node).incoming.iter().copied().collect();
        return Some(Focus::Node(node, edges));
    }
    validate::find_cycle(graph).map(Focus::Edges).or_else(|| {
        trace!("unresolvable reference fan-in, abandoning path");
        Some(Focus::Edges(Vec::new()))
    })
}

/// Push one successor per applicable mutation: a duplication of the focus
/// node when it is eligible, a reversal per not-yet-reversed focus edge, a
/// reference per not-yet-reference focus edge. Order is fixed for
/// reproducibility.
fn expand(graph: &Graph, focus: Focus, worklist: &mut Vec<Graph>) {
    let edges = match focus {
        Focus::Node(node_id, ref edges) => {
            let node = graph.node(node_id);
            let real_parents = graph
                .incoming_edges(node_id)
                .filter(|e| e.is_embedding())
                .count();
            if !node.no_duplicate && real_parents >= 2 {
                let mut copy = graph.deep_copy();
                copy.duplicate(node_id);
                worklist.push(copy);
            }
            edges.clone()
        }
        Focus::Edges(ref edges) => edges.clone(),
    };

    for &edge_id in &edges {
        if !graph.edge(edge_id).reversed {
            let mut copy = graph.deep_copy();
            copy.reverse(edge_id);
            worklist.push(copy);
        }
    }
    for &edge_id in &edges {
        if !graph.edge(edge_id).reference {
            let mut copy = graph.deep_copy();
            copy.make_ref(edge_id);
            worklist.push(copy);
        }
    }
}
