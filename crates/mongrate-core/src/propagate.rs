//! Size propagation over a valid forest.
//!
//! Row and distinct-row estimates flow from each root down its embedded
//! children. Reference edges leave the child untouched; embedding edges
//! scale the child by the parent's presence and by FK nullability. Runs
//! right after search and again whenever lossy-edge expansion admits a new
//! candidate.

use crate::graph::Graph;

/// Recompute `rows` (N) and `distinct_rows` (D) for every node.
///
/// Per edge, with parent P and child C:
/// - reference: child keeps its catalog counts;
/// - reversed (the parent duplicates under each FK-owning row):
///   `N_C = N_P * (1 - null_fk / N0_P)`,
///   `D_C = min(D_P * (1 - null_fk / N0_P), N0_C)`;
/// - forward embedding (the FK owner nests under the parent):
///   `N_C = (N_P / N0_P) * (N0_C - null_fk)`,
///   `D_C = (D_P / N0_P) * (N0_C - null_fk)`.
pub fn propagate_sizes(graph: &mut Graph) {
    for node_id in graph.node_ids() {
        let node = graph.node_mut(node_id);
        node.rows = node.rows_initial;
        node.distinct_rows = node.rows_initial;
    }

    let mut stack = graph.roots();
    while let Some(parent_id) = stack.pop() {
        for edge_id in graph.embedding_out(parent_id) {
            let edge = graph.edge(edge_id);
            let child_id = edge.to;
            let null_fk = edge.null_fk as f64;

            let parent = graph.node(parent_id);
            let (parent_rows, parent_distinct, parent_initial) =
                (parent.rows, parent.distinct_rows, parent.rows_initial);
            let child_initial = graph.node(child_id).rows_initial;

            let (rows, distinct) = if edge.reversed {
                let present = if parent_initial > 0.0 {
                    1.0 - null_fk / parent_initial
                } else {
                    0.0
                };
                (
                    parent_rows * present,
                    (parent_distinct * present).min(child_initial),
                )
            } else {
                let scale = if parent_initial > 0.0 {
                    (child_initial - null_fk) / parent_initial
                } else {
                    0.0
                };
                (parent_rows * scale, parent_distinct * scale)
            };

            let child = graph.node_mut(child_id);
            child.rows = rows;
            child.distinct_rows = distinct;
            stack.push(child_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{DatabaseCatalog, ForeignKeyCatalog, TableCatalog};
    use crate::graph::NodeId;
    use pretty_assertions::assert_eq;

    fn node_id(graph: &Graph, table: &str) -> NodeId {
        graph
            .nodes()
            .find(|n| n.table == table)
            .map(|n| n.id)
            .expect("table present")
    }

    fn order_item_catalog(null_items: u64) -> DatabaseCatalog {
        DatabaseCatalog::new("shop")
            .with_table(TableCatalog::new("order", "id", 50).with_data_length(2000))
            .with_table(
                TableCatalog::new("item", "id", 100)
                    .with_data_length(8000)
                    .with_foreign_key(ForeignKeyCatalog::new(
                        "order_id",
                        "order",
                        50,
                        null_items,
                    )),
            )
    }

    #[test]
    fn test_forward_embedding_keeps_full_rows_without_nulls() {
        let mut graph = Graph::from_catalog(&order_item_catalog(0)).unwrap();
        propagate_sizes(&mut graph);
        let item = graph.node(node_id(&graph, "item"));
        assert_eq!(item.rows, 100.0);
        assert_eq!(item.distinct_rows, 100.0);
    }

    #[test]
    fn test_forward_embedding_drops_null_fk_rows() {
        // 20% of items have no order: they vanish from the embedded shape
        let mut graph = Graph::from_catalog(&order_item_catalog(20)).unwrap();
        propagate_sizes(&mut graph);
        let item = graph.node(node_id(&graph, "item"));
        assert_eq!(item.rows, 80.0);
        assert_eq!(item.distinct_rows, 80.0);
    }

    #[test]
    fn test_reference_edge_keeps_catalog_counts() {
        let mut graph = Graph::from_catalog(&order_item_catalog(20)).unwrap();
        let edge = graph.edge_ids()[0];
        graph.make_ref(edge);
        propagate_sizes(&mut graph);
        let item = graph.node(node_id(&graph, "item"));
        assert_eq!(item.rows, 100.0);
        assert_eq!(item.distinct_rows, 100.0);
    }

    #[test]
    fn test_reversed_edge_duplicates_parent_and_caps_distinct() {
        // item embeds its order: every non-null item row carries one order
        // copy, but distinct orders stay bounded by the catalog count
        let mut graph = Graph::from_catalog(&order_item_catalog(0)).unwrap();
        let edge = graph.edge_ids()[0];
        graph.reverse(edge);
        propagate_sizes(&mut graph);
        let order = graph.node(node_id(&graph, "order"));
        assert_eq!(order.rows, 100.0);
        assert_eq!(order.distinct_rows, 50.0);
    }

    #[test]
    fn test_reversed_edge_respects_null_fraction() {
        let mut graph = Graph::from_catalog(&order_item_catalog(20)).unwrap();
        let edge = graph.edge_ids()[0];
        graph.reverse(edge);
        propagate_sizes(&mut graph);
        let order = graph.node(node_id(&graph, "order"));
        // item is now the root: N0 = 100, 20 null FKs
        assert_eq!(order.rows, 80.0);
        assert_eq!(order.distinct_rows, 50.0);
    }

    #[test]
    fn test_propagation_cascades_through_grandchildren() {
        let catalog = DatabaseCatalog::new("shop")
            .with_table(TableCatalog::new("customer", "id", 10))
            .with_table(
                TableCatalog::new("order", "id", 40)
                    .with_foreign_key(ForeignKeyCatalog::new("customer_id", "customer", 10, 8)),
            )
            .with_table(
                TableCatalog::new("item", "id", 200)
                    .with_foreign_key(ForeignKeyCatalog::new("order_id", "order", 40, 0)),
            );
        let mut graph = Graph::from_catalog(&catalog).unwrap();
        propagate_sizes(&mut graph);

        let order = graph.node(node_id(&graph, "order"));
        assert_eq!(order.rows, 32.0);
        // items scale by the surviving order fraction: (32/40) * 200
        let item = graph.node(node_id(&graph, "item"));
        assert_eq!(item.rows, 160.0);
        assert_eq!(item.distinct_rows, 160.0);
    }
}
