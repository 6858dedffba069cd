//! Cost model and cross-candidate ranking.
//!
//! Three raw components per candidate: estimated storage, estimated data
//! loss, and the number of reference edges. Raw values are scaled by the
//! mean over the whole candidate set before weighting, so the score compares
//! candidates of one synthesis run and nothing else. Lower is better.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::graph::Graph;

/// Weight of the scaled storage component.
pub const DATA_STORAGE_WEIGHT: f64 = 1.0;

/// Weight of the scaled data-loss component.
pub const DATA_LOSS_WEIGHT: f64 = 10.0;

/// Weight of the scaled reference-count component.
pub const REFERENCE_WEIGHT: f64 = 7.0;

/// Floor applied to component means to keep the scaling defined when every
/// candidate has a zero component.
const MEAN_FLOOR: f64 = 1e-9;

/// Raw and scaled cost components of one candidate.
///
/// With a single candidate every component scales to its own weight and the
/// score degenerates to the weight sum; scores are only meaningful relative
/// to the other candidates of the same run.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CostBreakdown {
    /// Sum over nodes of row_size * N
    pub data_storage: f64,

    /// Sum over distinct table names of max(0, N0 * row_size - sum of
    /// D * row_size over that table's copies)
    pub data_loss: f64,

    /// Count of reference edges
    pub reference_count: usize,

    /// data_storage / mean, weighted
    pub scaled_storage: f64,

    /// data_loss / mean, weighted
    pub scaled_loss: f64,

    /// reference_count / mean, weighted
    pub scaled_refs: f64,

    /// Sum of the scaled components; lower ranks first
    pub score: f64,
}

/// Compute the raw components of a propagated candidate.
pub fn raw_costs(graph: &Graph) -> CostBreakdown {
    let data_storage = graph.nodes().map(|n| n.row_size * n.rows).sum();
    let data_loss = table_losses(graph).values().sum();
    let reference_count = graph.edges().filter(|e| e.reference).count();

    CostBreakdown {
        data_storage,
        data_loss,
        reference_count,
        ..CostBreakdown::default()
    }
}

/// Estimated loss per table name: rows of the original table that no copy
/// in the document shape retains.
pub fn table_losses(graph: &Graph) -> BTreeMap<String, f64> {
    let mut retained: BTreeMap<&str, f64> = BTreeMap::new();
    let mut original: BTreeMap<&str, f64> = BTreeMap::new();
    for node in graph.nodes() {
        *retained.entry(&node.table).or_default() += node.distinct_rows * node.row_size;
        original.insert(&node.table, node.rows_initial * node.row_size);
    }

    original
        .into_iter()
        .map(|(table, size)| {
            let kept = retained.get(table).copied().unwrap_or_default();
            (table.to_owned(), (size - kept).max(0.0))
        })
        .collect()
}

/// Scale every candidate's components by the set-wide means and fill in the
/// weighted score. Order is preserved; call before sorting.
pub fn scale_scores(costs: &mut [CostBreakdown]) {
    if costs.is_empty() {
        return;
    }
    let count = costs.len() as f64;
    let mean_storage = (costs.iter().map(|c| c.data_storage).sum::<f64>() / count).max(MEAN_FLOOR);
    let mean_loss = (costs.iter().map(|c| c.data_loss).sum::<f64>() / count).max(MEAN_FLOOR);
    let mean_refs = (costs.iter().map(|c| c.reference_count as f64).sum::<f64>() / count)
        .max(MEAN_FLOOR);

    for cost in costs {
        cost.scaled_storage = DATA_STORAGE_WEIGHT * (cost.data_storage / mean_storage);
        cost.scaled_loss = DATA_LOSS_WEIGHT * (cost.data_loss / mean_loss);
        cost.scaled_refs = REFERENCE_WEIGHT * (cost.reference_count as f64 / mean_refs);
        cost.score = cost.scaled_storage + cost.scaled_loss + cost.scaled_refs;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{DatabaseCatalog, ForeignKeyCatalog, TableCatalog};
    use crate::propagate::propagate_sizes;
    use pretty_assertions::assert_eq;

    fn lossy_catalog() -> DatabaseCatalog {
        DatabaseCatalog::new("shop")
            .with_table(TableCatalog::new("order", "id", 50).with_data_length(2000))
            .with_table(
                TableCatalog::new("item", "id", 100)
                    .with_data_length(8000)
                    .with_foreign_key(ForeignKeyCatalog::new("order_id", "order", 50, 20)),
            )
    }

    #[test]
    fn test_raw_costs_capture_null_fk_loss() {
        let mut graph = Graph::from_catalog(&lossy_catalog()).unwrap();
        propagate_sizes(&mut graph);
        let costs = raw_costs(&graph);

        // order keeps all 50 rows at 40 B; item keeps 80 of 100 at 80 B
        assert_eq!(costs.data_storage, 50.0 * 40.0 + 80.0 * 80.0);
        assert_eq!(costs.data_loss, 20.0 * 80.0);
        assert_eq!(costs.reference_count, 0);

        let losses = table_losses(&graph);
        assert_eq!(losses["item"], 1600.0);
        assert_eq!(losses["order"], 0.0);
    }

    #[test]
    fn test_reference_eliminates_loss() {
        let mut graph = Graph::from_catalog(&lossy_catalog()).unwrap();
        let edge = graph.edge_ids()[0];
        graph.make_ref(edge);
        propagate_sizes(&mut graph);
        let costs = raw_costs(&graph);
        assert_eq!(costs.data_loss, 0.0);
        assert_eq!(costs.reference_count, 1);
    }

    #[test]
    fn test_duplicated_copies_pool_their_distinct_rows() {
        let catalog = DatabaseCatalog::new("diamond")
            .with_table(TableCatalog::new("b", "id", 10))
            .with_table(TableCatalog::new("c", "id", 10))
            .with_table(
                TableCatalog::new("d", "id", 20)
                    .with_foreign_key(ForeignKeyCatalog::new("b_id", "b", 10, 0))
                    .with_foreign_key(ForeignKeyCatalog::new("c_id", "c", 10, 0)),
            );
        let mut graph = Graph::from_catalog(&catalog).unwrap();
        let d = graph
            .nodes()
            .find(|n| n.table == "d")
            .map(|n| n.id)
            .unwrap();
        graph.duplicate(d);
        propagate_sizes(&mut graph);

        // each copy retains its own share; the table-level loss pools them
        let losses = table_losses(&graph);
        assert!(losses["d"] >= 0.0);
        let copies: f64 = graph
            .nodes()
            .filter(|n| n.table == "d")
            .map(|n| n.distinct_rows * n.row_size)
            .sum();
        let original = 20.0 * crate::catalog::FALLBACK_ROW_SIZE;
        assert_eq!(losses["d"], (original - copies).max(0.0));
    }

    #[test]
    fn test_scaling_and_score() {
        let mut costs = vec![
            CostBreakdown {
                data_storage: 100.0,
                data_loss: 5.0,
                reference_count: 0,
                ..CostBreakdown::default()
            },
            CostBreakdown {
                data_storage: 100.0,
                data_loss: 0.0,
                reference_count: 1,
                ..CostBreakdown::default()
            },
        ];
        scale_scores(&mut costs);

        // means: storage 100, loss 2.5, refs 0.5
        assert_eq!(costs[0].scaled_storage, 1.0);
        assert_eq!(costs[0].scaled_loss, 20.0);
        assert_eq!(costs[0].scaled_refs, 0.0);
        assert_eq!(costs[0].score, 21.0);

        assert_eq!(costs[1].scaled_storage, 1.0);
        assert_eq!(costs[1].scaled_loss, 0.0);
        assert_eq!(costs[1].scaled_refs, 14.0);
        assert_eq!(costs[1].score, 15.0);

        // each score is exactly the sum of its scaled components
        for cost in &costs {
            assert_eq!(
                cost.score,
                cost.scaled_storage + cost.scaled_loss + cost.scaled_refs
            );
        }
    }

    #[test]
    fn test_single_candidate_scales_to_weight_sum() {
        let mut costs = vec![CostBreakdown {
            data_storage: 100.0,
            data_loss: 5.0,
            reference_count: 2,
            ..CostBreakdown::default()
        }];
        scale_scores(&mut costs);
        assert_eq!(
            costs[0].score,
            DATA_STORAGE_WEIGHT + DATA_LOSS_WEIGHT + REFERENCE_WEIGHT
        );
    }
}
