//! Concrete document-schema plans.
//!
//! A valid forest is walked into a [`SchemaPlan`]: one collection per root,
//! nested child mappers for embedded tables, and deferred reference records
//! for every reference edge. The plan is what the data mapper executes, and
//! what gets shown to the user for selection.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::graph::{Graph, NodeId};

/// A full document schema: collections plus reference patches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaPlan {
    /// Target database name (same as the source schema)
    pub database: String,

    /// Top-level collections, one per root node
    pub collections: Vec<Collection>,

    /// Reference patches applied after the embedded load
    pub refs: Vec<RefPlan>,
}

/// A top-level target collection fed by one source table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collection {
    /// Source table and collection name
    pub table: String,

    /// Primary-key column of the table
    pub key: String,

    /// Embedded children in walk order
    pub children: Vec<ChildPlan>,
}

/// An embedded child document position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChildPlan {
    /// Field label under the parent document
    pub label: String,

    /// Source table of the child rows
    pub table: String,

    /// Primary-key column of the child table
    pub key: String,

    /// FK column joining child and parent
    pub fk_column: String,

    /// Whether the child is a list keyed by the parent, or a single row
    /// popped off the parent's FK
    pub cardinality: ChildCardinality,

    /// Children embedded below this one
    pub children: Vec<ChildPlan>,
}

/// How an embedded child joins its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChildCardinality {
    /// Forward edge: all child rows whose FK equals the parent key, labeled
    /// `"<fk_column>_<child_table>"`
    OneToMany,

    /// Reversed edge: the single row the parent's FK points at, labeled
    /// `<fk_column>`
    ManyToOne,
}

/// Direction of a deferred reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RefKind {
    /// Forward reference: parent documents receive the list of child ids
    /// whose FK matches their key
    OneToMany,

    /// Reversed reference: parent documents receive the id of the single
    /// child their FK points at
    ManyToOne,
}

/// One reference patch, executed against the target after the embedded load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefPlan {
    /// Patch direction
    pub kind: RefKind,

    /// Collection the reference points into (always a root)
    pub child_collection: String,

    /// Primary-key column of the child collection
    pub child_key: String,

    /// Labels from the hosting root collection down to the documents that
    /// receive the reference field
    pub parent_path: Vec<String>,

    /// Primary-key column of the hosting table
    pub parent_key: String,

    /// FK column the reference was derived from
    pub fk_column: String,
}

impl RefPlan {
    /// Field name the patch writes: `"<fk>_<child>_ref"` for one-to-many,
    /// `"<fk>_ref"` for many-to-one.
    pub fn field_label(&self) -> String {
        match self.kind {
            RefKind::OneToMany => format!("{}_{}_ref", self.fk_column, self.child_collection),
            RefKind::ManyToOne => format!("{}_ref", self.fk_column),
        }
    }
}

/// Walk a valid forest into a schema plan.
///
/// Embedding pass: each root becomes a collection; forward edges attach
/// one-to-many children, reversed edges many-to-one children; every visited
/// node's `path` is set to its parent's path plus the child label (roots get
/// their own name). Reference pass: one [`RefPlan`] per reference edge,
/// pointing from the `from` node's path into the `to` node's collection.
pub fn build_schema(graph: &mut Graph) -> SchemaPlan {
    let mut collections = Vec::new();
    for root in graph.roots() {
        let node = graph.node(root);
        let (table, key) = (node.table.clone(), node.primary_key.clone());
        graph.node_mut(root).path = vec![table.clone()];
        let children = build_children(graph, root);
        collections.push(Collection {
            table,
            key,
            children,
        });
    }

    let mut refs = Vec::new();
    for edge_id in graph.edge_ids() {
        let edge = graph.edge(edge_id);
        if !edge.reference {
            continue;
        }
        let parent = graph.node(edge.from);
        let child = graph.node(edge.to);
        refs.push(RefPlan {
            kind: if edge.reversed {
                RefKind::ManyToOne
            } else {
                RefKind::OneToMany
            },
            child_collection: child.table.clone(),
            child_key: child.primary_key.clone(),
            parent_path: parent.path.clone(),
            parent_key: parent.primary_key.clone(),
            fk_column: edge.fk_column.clone(),
        });
    }

    SchemaPlan {
        database: graph.database.clone(),
        collections,
        refs,
    }
}

fn build_children(graph: &mut Graph, parent_id: NodeId) -> Vec<ChildPlan> {
    let mut children = Vec::new();
    for edge_id in graph.embedding_out(parent_id) {
        let edge = graph.edge(edge_id);
        let child_id = edge.to;
        let fk_column = edge.fk_column.clone();
        let reversed = edge.reversed;

        let child = graph.node(child_id);
        let (table, key) = (child.table.clone(), child.primary_key.clone());
        let (label, cardinality) = if reversed {
            (fk_column.clone(), ChildCardinality::ManyToOne)
        } else {
            (
                format!("{}_{}", fk_column, table),
                ChildCardinality::OneToMany,
            )
        };

        let mut path = graph.node(parent_id).path.clone();
        path.push(label.clone());
        graph.node_mut(child_id).path = path;

        let grandchildren = build_children(graph, child_id);
        children.push(ChildPlan {
            label,
            table,
            key,
            fk_column,
            cardinality,
            children: grandchildren,
        });
    }
    children
}

impl fmt::Display for SchemaPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for collection in &self.collections {
            writeln!(f, "{} (key: {})", collection.table, collection.key)?;
            for child in &collection.children {
                fmt_child(f, child, 1)?;
            }
        }
        for reference in &self.refs {
            let arrow = match reference.kind {
                RefKind::OneToMany => "*->",
                RefKind::ManyToOne => "->",
            };
            writeln!(
                f,
                "ref {} {} {} (at {})",
                reference.field_label(),
                arrow,
                reference.child_collection,
                reference.parent_path.join("."),
            )?;
        }
        Ok(())
    }
}

fn fmt_child(f: &mut fmt::Formatter<'_>, child: &ChildPlan, depth: usize) -> fmt::Result {
    let marker = match child.cardinality {
        ChildCardinality::OneToMany => "[]",
        ChildCardinality::ManyToOne => "{}",
    };
    writeln!(
        f,
        "{}{} {} {} (key: {})",
        "  ".repeat(depth),
        child.label,
        marker,
        child.table,
        child.key,
    )?;
    for grandchild in &child.children {
        fmt_child(f, grandchild, depth + 1)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{DatabaseCatalog, ForeignKeyCatalog, TableCatalog};
    use pretty_assertions::assert_eq;

    fn chain_graph() -> Graph {
        let catalog = DatabaseCatalog::new("shop")
            .with_table(TableCatalog::new("parent", "id", 10))
            .with_table(
                TableCatalog::new("child", "id", 30)
                    .with_foreign_key(ForeignKeyCatalog::new("parent_id", "parent", 10, 0)),
            );
        Graph::from_catalog(&catalog).unwrap()
    }

    #[test]
    fn test_one_to_many_child_label_and_path() {
        let mut graph = chain_graph();
        let plan = build_schema(&mut graph);

        assert_eq!(plan.collections.len(), 1);
        let root = &plan.collections[0];
        assert_eq!(root.table, "parent");
        assert_eq!(root.key, "id");
        assert_eq!(root.children.len(), 1);

        let child = &root.children[0];
        assert_eq!(child.label, "parent_id_child");
        assert_eq!(child.cardinality, ChildCardinality::OneToMany);
        assert_eq!(child.fk_column, "parent_id");
        assert!(plan.refs.is_empty());

        let child_node = graph.nodes().find(|n| n.table == "child").unwrap();
        assert_eq!(child_node.path, vec!["parent", "parent_id_child"]);
    }

    #[test]
    fn test_many_to_one_child_label() {
        let mut graph = chain_graph();
        let edge = graph.edge_ids()[0];
        graph.reverse(edge);
        let plan = build_schema(&mut graph);

        let root = &plan.collections[0];
        assert_eq!(root.table, "child");
        let child = &root.children[0];
        assert_eq!(child.label, "parent_id");
        assert_eq!(child.cardinality, ChildCardinality::ManyToOne);
        assert_eq!(child.table, "parent");
    }

    #[test]
    fn test_reference_edge_emits_ref_plan() {
        let mut graph = chain_graph();
        let edge = graph.edge_ids()[0];
        graph.make_ref(edge);
        let plan = build_schema(&mut graph);

        // both tables are roots now
        assert_eq!(plan.collections.len(), 2);
        assert_eq!(plan.refs.len(), 1);

        let reference = &plan.refs[0];
        assert_eq!(reference.kind, RefKind::OneToMany);
        assert_eq!(reference.child_collection, "child");
        assert_eq!(reference.parent_path, vec!["parent"]);
        assert_eq!(reference.parent_key, "id");
        assert_eq!(reference.fk_column, "parent_id");
        assert_eq!(reference.field_label(), "parent_id_child_ref");
    }

    #[test]
    fn test_self_loop_reference_plan() {
        let catalog = DatabaseCatalog::new("tree").with_table(
            TableCatalog::new("node", "id", 100)
                .with_foreign_key(ForeignKeyCatalog::new("parent_id", "node", 40, 5)),
        );
        let mut graph = Graph::from_catalog(&catalog).unwrap();
        let edge = graph.edge_ids()[0];
        graph.make_ref(edge);
        let plan = build_schema(&mut graph);

        assert_eq!(plan.collections.len(), 1);
        let reference = &plan.refs[0];
        assert_eq!(reference.field_label(), "parent_id_node_ref");
        assert_eq!(reference.parent_path, vec!["node"]);
        assert_eq!(reference.child_collection, "node");
    }

    #[test]
    fn test_reversed_reference_field_label() {
        let mut graph = chain_graph();
        let edge = graph.edge_ids()[0];
        graph.reverse(edge);
        graph.make_ref(edge);
        let plan = build_schema(&mut graph);

        let reference = &plan.refs[0];
        assert_eq!(reference.kind, RefKind::ManyToOne);
        assert_eq!(reference.child_collection, "parent");
        assert_eq!(reference.parent_path, vec!["child"]);
        assert_eq!(reference.field_label(), "parent_id_ref");
    }

    #[test]
    fn test_nested_paths_walk_from_root() {
        let catalog = DatabaseCatalog::new("shop")
            .with_table(TableCatalog::new("customer", "id", 10))
            .with_table(
                TableCatalog::new("order", "id", 40)
                    .with_foreign_key(ForeignKeyCatalog::new("customer_id", "customer", 10, 0)),
            )
            .with_table(
                TableCatalog::new("item", "id", 200)
                    .with_foreign_key(ForeignKeyCatalog::new("order_id", "order", 40, 0)),
            );
        let mut graph = Graph::from_catalog(&catalog).unwrap();
        build_schema(&mut graph);

        let item = graph.nodes().find(|n| n.table == "item").unwrap();
        assert_eq!(
            item.path,
            vec!["customer", "customer_id_order", "order_id_item"]
        );
    }
}
