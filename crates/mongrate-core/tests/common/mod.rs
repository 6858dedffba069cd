//! Common test utilities for synthesis integration tests.

#![allow(dead_code)]

use mongrate_core::graph::Graph;
use mongrate_core::schema::{ChildPlan, Collection, SchemaPlan};
use mongrate_core::{DatabaseCatalog, ForeignKeyCatalog, RankedSchema, TableCatalog};

/// Shorthand for a table with no foreign keys.
pub fn table(name: &str, rows: u64) -> TableCatalog {
    TableCatalog::new(name, "id", rows)
}

/// Shorthand for a foreign-key column with no NULLs.
pub fn fk(column: &str, referenced: &str, distinct: u64) -> ForeignKeyCatalog {
    ForeignKeyCatalog::new(column, referenced, distinct, 0)
}

/// Find a collection by table name, panicking with context on absence.
pub fn collection<'a>(schema: &'a mongrate_core::SchemaPlan, table: &str) -> &'a Collection {
    schema
        .collections
        .iter()
        .find(|c| c.table == table)
        .unwrap_or_else(|| panic!("schema has no collection '{table}'"))
}

/// Find a ranked entry whose schema roots exactly match `tables` (in any
/// order).
pub fn entry_with_roots<'a>(
    ranked: &'a [RankedSchema],
    tables: &[&str],
) -> Option<&'a RankedSchema> {
    ranked.iter().find(|entry| {
        let mut roots: Vec<&str> = entry
            .schema
            .collections
            .iter()
            .map(|c| c.table.as_str())
            .collect();
        roots.sort_unstable();
        let mut expected = tables.to_vec();
        expected.sort_unstable();
        roots == expected
    })
}

/// Assert the structural invariants every returned candidate must satisfy.
pub fn assert_candidate_invariants(graph: &Graph) {
    use mongrate_core::validate;

    assert!(
        validate::find_cycle(graph).is_none(),
        "candidate contains a non-reference cycle"
    );
    for node in graph.nodes() {
        let embed_parents = graph
            .incoming_edges(node.id)
            .filter(|e| e.is_embedding())
            .count();
        assert!(
            embed_parents <= 1,
            "node '{}' has {embed_parents} embedding parents",
            node.table
        );
        if node.no_duplicate {
            let non_self = graph
                .incoming_edges(node.id)
                .filter(|e| !e.is_self_loop())
                .count();
            assert!(
                non_self <= 1,
                "no-duplicate node '{}' has {non_self} non-self incoming edges",
                node.table
            );
        }
    }
}

/// Walk a schema plan and assert every child's labels chain from the root.
pub fn assert_paths_walkable(schema: &SchemaPlan) {
    fn walk(child: &ChildPlan, prefix: &[String]) {
        let mut path = prefix.to_vec();
        path.push(child.label.clone());
        for grandchild in &child.children {
            walk(grandchild, &path);
        }
    }
    for collection in &schema.collections {
        let prefix = vec![collection.table.clone()];
        for child in &collection.children {
            walk(child, &prefix);
        }
    }
}

/// Build a catalog for the S3 diamond: a, b(a_id), c(a_id), d(b_id, c_id).
pub fn diamond_catalog() -> DatabaseCatalog {
    DatabaseCatalog::new("diamond")
        .with_table(table("a", 10))
        .with_table(table("b", 20).with_foreign_key(fk("a_id", "a", 10)))
        .with_table(table("c", 20).with_foreign_key(fk("a_id", "a", 10)))
        .with_table(
            table("d", 40)
                .with_foreign_key(fk("b_id", "b", 20))
                .with_foreign_key(fk("c_id", "c", 20)),
        )
}
