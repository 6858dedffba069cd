//! The synthesis pipeline.
//!
//! Catalog snapshot in, ranked schema plans out: build the initial graph,
//! preprocess, enumerate candidates, propagate sizes, expand lossy edges,
//! score, and sort. Everything here is synchronous; the caller owns all I/O.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use tracing::{debug, info};

use crate::catalog::{CatalogError, DatabaseCatalog};
use crate::cost::{self, CostBreakdown};
use crate::graph::{Graph, NodeId};
use crate::propagate::propagate_sizes;
use crate::schema::{build_schema, SchemaPlan};
use crate::search::{enumerate_candidates, preprocess};
use crate::validate;

/// Losses below this are treated as zero when hunting lossy edges.
const LOSS_EPSILON: f64 = 1e-9;

/// One ranked synthesis result.
#[derive(Debug, Clone)]
pub struct RankedSchema {
    /// The executable plan
    pub schema: SchemaPlan,

    /// Raw and scaled cost components
    pub cost: CostBreakdown,

    /// Mutation log of the candidate the plan was built from
    pub steps: Vec<String>,
}

/// Synthesize and rank document schemas for a catalog snapshot.
///
/// An empty result means the search drained without one valid forest inside
/// the mutation budget; the host reports that no viable schema exists.
pub fn synthesize(catalog: &DatabaseCatalog) -> Result<Vec<RankedSchema>, CatalogError> {
    let mut graph = Graph::from_catalog(catalog)?;
    preprocess(&mut graph);

    let mut candidates = enumerate_candidates(graph);
    for candidate in &mut candidates {
        propagate_sizes(candidate);
    }
    expand_lossy_edges(&mut candidates);
    info!(
        database = %catalog.database,
        candidates = candidates.len(),
        "schema search finished"
    );

    let mut costs: Vec<CostBreakdown> = candidates.iter().map(cost::raw_costs).collect();
    cost::scale_scores(&mut costs);

    let mut ranked: Vec<RankedSchema> = candidates
        .into_iter()
        .zip(costs)
        .map(|(mut graph, cost)| RankedSchema {
            schema: build_schema(&mut graph),
            steps: graph.steps().to_vec(),
            cost,
        })
        .collect();

    // stable: candidates with equal scores keep insertion order
    ranked.sort_by(|a, b| {
        a.cost
            .score
            .partial_cmp(&b.cost.score)
            .unwrap_or(Ordering::Equal)
    });
    Ok(ranked)
}

/// Grow the candidate set around lossy embeddings.
///
/// For each candidate, every root-to-child embedding edge whose subtree
/// carries per-table loss spawns two variants: the edge as a reference, and
/// as a reversed reference. Valid variants are propagated, admitted, and
/// re-examined in turn, so repair can chain across several edges.
fn expand_lossy_edges(candidates: &mut Vec<Graph>) {
    let mut seen: BTreeSet<String> = candidates
        .iter()
        .map(|g| g.shape_signature())
        .collect();

    let mut index = 0;
    while index < candidates.len() {
        for variant in lossy_variants(&candidates[index]) {
            if !validate::is_valid(&variant) {
                continue;
            }
            if !seen.insert(variant.shape_signature()) {
                continue;
            }
            let mut variant = variant;
            propagate_sizes(&mut variant);
            candidates.push(variant);
        }
        index += 1;
    }
    debug!(total = candidates.len(), "lossy-edge expansion done");
}

fn lossy_variants(graph: &Graph) -> Vec<Graph> {
    let losses = cost::table_losses(graph);
    let mut variants = Vec::new();

    for root in graph.roots() {
        for edge_id in graph.embedding_out(root) {
            let subtree = subtree_tables(graph, graph.edge(edge_id).to);
            let lossy = subtree
                .iter()
                .any(|table| losses.get(table).copied().unwrap_or_default() > LOSS_EPSILON);
            if !lossy {
                continue;
            }

            let mut as_ref = graph.deep_copy();
            as_ref.make_ref(edge_id);
            variants.push(as_ref);

            let mut as_reversed_ref = graph.deep_copy();
            as_reversed_ref.make_ref(edge_id);
            as_reversed_ref.reverse(edge_id);
            variants.push(as_reversed_ref);
        }
    }
    variants
}

/// Table names in the embedding subtree hanging off `start`, inclusive.
fn subtree_tables(graph: &Graph, start: NodeId) -> BTreeSet<String> {
    let mut tables = BTreeSet::new();
    let mut stack = vec![start];
    let mut visited = BTreeSet::from([start]);
    while let Some(node_id) = stack.pop() {
        tables.insert(graph.node(node_id).table.clone());
        for edge_id in graph.embedding_out(node_id) {
            let to = graph.edge(edge_id).to;
            if visited.insert(to) {
                stack.push(to);
            }
        }
    }
    tables
}
