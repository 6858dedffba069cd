//! Transformation graph over the relational catalog.
//!
//! Tables are nodes, foreign keys are edges running from the referenced
//! table to the FK-owning table (the embedding direction). The search driver
//! mutates copies of this graph until each copy is a valid forest.
//!
//! Nodes and edges live in arenas keyed by integer ids and refer to each
//! other by id only; the owning [`Graph`] resolves them. Ids are drawn from a
//! single monotone counter and survive deep copies, so a node with id X in a
//! copy is the analogue of id X in the original.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::catalog::{CatalogError, DatabaseCatalog};

/// Stable identifier of a node within one graph lineage.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct NodeId(pub u32);

/// Stable identifier of an edge within one graph lineage.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct EdgeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

/// One source table, or one embedded document position after duplication.
#[derive(Debug, Clone)]
pub struct Node {
    /// Stable id, preserved across deep copies
    pub id: NodeId,

    /// Source table name (duplicated copies share it)
    pub table: String,

    /// Primary-key column
    pub primary_key: String,

    /// Estimated bytes per row
    pub row_size: f64,

    /// Row count at introspection time (N0)
    pub rows_initial: f64,

    /// Current estimated row count (N), recomputed by size propagation
    pub rows: f64,

    /// Current estimated distinct-row count (D <= N in intent)
    pub distinct_rows: f64,

    /// When set, the duplication transform must not split this node
    pub no_duplicate: bool,

    /// Edges whose `to` is this node
    pub incoming: BTreeSet<EdgeId>,

    /// Edges whose `from` is this node
    pub outgoing: BTreeSet<EdgeId>,

    /// Labels from the root collection down to this node, set by the schema
    /// builder on valid graphs only
    pub path: Vec<String>,
}

/// One foreign-key relationship, or an embedding/reference link after
/// transformation.
#[derive(Debug, Clone)]
pub struct Edge {
    /// Stable id, preserved across deep copies
    pub id: EdgeId,

    /// Embedding parent (the referenced table, until reversed)
    pub from: NodeId,

    /// Embedding child (the FK-owning table, until reversed)
    pub to: NodeId,

    /// FK column name on the owning table
    pub fk_column: String,

    /// Name of the FK-owning table
    pub fk_table: String,

    /// Distinct non-NULL FK values
    pub distinct_fk: u64,

    /// Rows with NULL in the FK column
    pub null_fk: u64,

    /// Direction has been flipped: the original parent now embeds under each
    /// FK-owning row
    pub reversed: bool,

    /// The edge denotes an id-level reference in the target, not an embedding
    pub reference: bool,
}

impl Edge {
    /// Both endpoints are the same node (a recursive foreign key).
    pub fn is_self_loop(&self) -> bool {
        self.from == self.to
    }

    /// The edge embeds its target (it is not a reference).
    pub fn is_embedding(&self) -> bool {
        !self.reference
    }
}

/// Arena of nodes and edges plus the mutation log.
#[derive(Debug)]
pub struct Graph {
    /// Source schema name
    pub database: String,

    nodes: BTreeMap<NodeId, Node>,
    edges: BTreeMap<EdgeId, Edge>,

    /// Next value handed out for either id space
    next_id: u32,

    /// Human-readable record of mutations applied along this search path
    steps: Vec<String>,
}

impl Graph {
    /// Build the initial graph from a catalog snapshot.
    ///
    /// Every edge starts as a forward embedding (`reversed = false`,
    /// `reference = false`); every node starts with `N0 = N = D = row_count`
    /// and an empty path.
    pub fn from_catalog(catalog: &DatabaseCatalog) -> Result<Self, CatalogError> {
        let mut graph = Graph {
            database: catalog.database.clone(),
            nodes: BTreeMap::new(),
            edges: BTreeMap::new(),
            next_id: 0,
            steps: Vec::new(),
        };

        let mut by_name: BTreeMap<&str, NodeId> = BTreeMap::new();
        for table in &catalog.tables {
            if by_name.contains_key(table.name.as_str()) {
                return Err(CatalogError::DuplicateTable(table.name.clone()));
            }
            let rows = table.row_count as f64;
            let id = NodeId(graph.fresh_id());
            graph.nodes.insert(
                id,
                Node {
                    id,
                    table: table.name.clone(),
                    primary_key: table.primary_key.clone(),
                    row_size: table.row_size(),
                    rows_initial: rows,
                    rows,
                    distinct_rows: rows,
                    no_duplicate: false,
                    incoming: BTreeSet::new(),
                    outgoing: BTreeSet::new(),
                    path: Vec::new(),
                },
            );
            by_name.insert(table.name.as_str(), id);
        }

        for table in &catalog.tables {
            let owner = by_name[table.name.as_str()];
            for fk in &table.foreign_keys {
                let referenced = *by_name.get(fk.referenced_table.as_str()).ok_or_else(|| {
                    CatalogError::UnknownReferencedTable {
                        table: table.name.clone(),
                        column: fk.column.clone(),
                        referenced: fk.referenced_table.clone(),
                    }
                })?;
                // referenced table -> FK owner: the embedding direction
                graph.insert_edge(
                    referenced,
                    owner,
                    fk.column.clone(),
                    table.name.clone(),
                    fk.distinct_count,
                    fk.null_count,
                    false,
                    false,
                );
            }
        }

        Ok(graph)
    }

    fn fresh_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    #[allow(clippy::too_many_arguments)]
    fn insert_edge(
        &mut self,
        from: NodeId,
        to: NodeId,
        fk_column: String,
        fk_table: String,
        distinct_fk: u64,
        null_fk: u64,
        reversed: bool,
        reference: bool,
    ) -> EdgeId {
        let id = EdgeId(self.fresh_id());
        self.edges.insert(
            id,
            Edge {
                id,
                from,
                to,
                fk_column,
                fk_table,
                distinct_fk,
                null_fk,
                reversed,
                reference,
            },
        );
        self.node_mut(from).outgoing.insert(id);
        self.node_mut(to).incoming.insert(id);
        id
    }

    // ------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------

    /// Resolve a node id. Panics if the id does not belong to this graph;
    /// edge endpoints and adjacency sets always resolve within their graph.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[&id]
    }

    /// Mutable counterpart of [`Graph::node`].
    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        self.nodes
            .get_mut(&id)
            .expect("node id resolves within its graph")
    }

    /// Resolve an edge id. Panics if the id does not belong to this graph.
    pub fn edge(&self, id: EdgeId) -> &Edge {
        &self.edges[&id]
    }

    /// Node lookup that reports absence instead of panicking.
    pub fn get_node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Edge lookup that reports absence instead of panicking.
    pub fn get_edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(&id)
    }

    /// All node ids in ascending order.
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.nodes.keys().copied().collect()
    }

    /// All edge ids in ascending order.
    pub fn edge_ids(&self) -> Vec<EdgeId> {
        self.edges.keys().copied().collect()
    }

    /// Iterate nodes in ascending id order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Iterate edges in ascending id order.
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of edges.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Incoming edges of a node in ascending id order.
    pub fn incoming_edges(&self, id: NodeId) -> impl Iterator<Item = &Edge> {
        self.node(id).incoming.iter().map(move |e| self.edge(*e))
    }

    /// Outgoing edges of a node in ascending id order.
    pub fn outgoing_edges(&self, id: NodeId) -> impl Iterator<Item = &Edge> {
        self.node(id).outgoing.iter().map(move |e| self.edge(*e))
    }

    /// Outgoing embedding (non-reference) edge ids of a node.
    pub fn embedding_out(&self, id: NodeId) -> Vec<EdgeId> {
        self.outgoing_edges(id)
            .filter(|e| e.is_embedding())
            .map(|e| e.id)
            .collect()
    }

    /// Roots of the current shape: nodes whose incoming edges are all
    /// references (or that have none). On a valid forest these become the
    /// top-level target collections.
    pub fn roots(&self) -> Vec<NodeId> {
        self.nodes
            .values()
            .filter(|n| n.incoming.iter().all(|e| self.edge(*e).reference))
            .map(|n| n.id)
            .collect()
    }

    /// The mutation log accumulated along this search path.
    pub fn steps(&self) -> &[String] {
        &self.steps
    }

    fn push_step(&mut self, step: String) {
        self.steps.push(step);
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    /// Flip an edge's direction, converting embed-child-under-parent into
    /// embed-parent-under-child (the parent row duplicates under each
    /// FK-owning row).
    pub fn reverse(&mut self, edge_id: EdgeId) {
        let (old_from, old_to) = {
            let edge = self
                .edges
                .get_mut(&edge_id)
                .expect("edge id resolves within its graph");
            let endpoints = (edge.from, edge.to);
            edge.reversed = !edge.reversed;
            edge.from = endpoints.1;
            edge.to = endpoints.0;
            endpoints
        };
        if old_from != old_to {
            let from_node = self.node_mut(old_from);
            from_node.outgoing.remove(&edge_id);
            from_node.incoming.insert(edge_id);
            let to_node = self.node_mut(old_to);
            to_node.incoming.remove(&edge_id);
            to_node.outgoing.insert(edge_id);
        }
        let step = format!(
            "reverse {} ({} -> {})",
            self.edge(edge_id).fk_column,
            self.node(old_from).table,
            self.node(old_to).table,
        );
        self.push_step(step);
    }

    /// Mark an edge as an id-level reference in the target. Idempotent.
    pub fn make_ref(&mut self, edge_id: EdgeId) {
        let already = {
            let edge = self
                .edges
                .get_mut(&edge_id)
                .expect("edge id resolves within its graph");
            let already = edge.reference;
            edge.reference = true;
            already
        };
        if !already {
            let edge = self.edge(edge_id);
            let step = format!(
                "reference {} ({} -> {})",
                edge.fk_column,
                self.node(edge.from).table,
                self.node(edge.to).table,
            );
            self.push_step(step);
        }
    }

    /// Split a multi-parent node into one copy per incoming edge, each copy
    /// carrying the original's intrinsic fields and a clone of its outgoing
    /// edges with flags preserved.
    ///
    /// Callers check eligibility (`no_duplicate` unset, at least two
    /// incoming non-reference edges). A self-loop is both incoming and
    /// outgoing; it is cloned as an outgoing edge of every copy rather than
    /// minting a copy of its own.
    ///
    /// Returns the ids of the fresh copies.
    pub fn duplicate(&mut self, node_id: NodeId) -> Vec<NodeId> {
        let node = self
            .nodes
            .remove(&node_id)
            .expect("node id resolves within its graph");

        // Detach and keep the outgoing edges as templates (self-loops
        // included; their incoming registration dies with the node).
        let mut templates: Vec<Edge> = Vec::new();
        for edge_id in &node.outgoing {
            let edge = self
                .edges
                .remove(edge_id)
                .expect("edge id resolves within its graph");
            if !edge.is_self_loop() {
                self.node_mut(edge.to).incoming.remove(edge_id);
            }
            templates.push(edge);
        }

        let parent_edges: Vec<EdgeId> = node
            .incoming
            .iter()
            .copied()
            .filter(|e| !node.outgoing.contains(e))
            .collect();

        let mut copies = Vec::with_capacity(parent_edges.len());
        for parent_edge in parent_edges {
            let copy_id = NodeId(self.fresh_id());
            self.nodes.insert(
                copy_id,
                Node {
                    id: copy_id,
                    table: node.table.clone(),
                    primary_key: node.primary_key.clone(),
                    row_size: node.row_size,
                    rows_initial: node.rows_initial,
                    rows: node.rows,
                    distinct_rows: node.distinct_rows,
                    no_duplicate: node.no_duplicate,
                    incoming: BTreeSet::from([parent_edge]),
                    outgoing: BTreeSet::new(),
                    path: Vec::new(),
                },
            );
            self.edges
                .get_mut(&parent_edge)
                .expect("edge id resolves within its graph")
                .to = copy_id;

            for template in &templates {
                let to = if template.is_self_loop() {
                    copy_id
                } else {
                    template.to
                };
                let cloned = self.insert_edge(
                    copy_id,
                    to,
                    template.fk_column.clone(),
                    template.fk_table.clone(),
                    template.distinct_fk,
                    template.null_fk,
                    template.reversed,
                    template.reference,
                );
                debug_assert!(self.edges.contains_key(&cloned));
            }
            copies.push(copy_id);
        }

        self.push_step(format!(
            "duplicate {} into {} copies",
            node.table,
            copies.len()
        ));
        copies
    }

    // ------------------------------------------------------------------
    // Copying
    // ------------------------------------------------------------------

    /// Identity-preserving deep copy.
    ///
    /// Endpoint references are id-typed, so cloning the arenas rewires them
    /// to the copy's own nodes by construction; every node and edge keeps its
    /// id, and the copy continues the same id counter. The step log is
    /// carried over and extended independently by each copy.
    pub fn deep_copy(&self) -> Graph {
        Graph {
            database: self.database.clone(),
            nodes: self.nodes.clone(),
            edges: self.edges.clone(),
            next_id: self.next_id,
            steps: self.steps.clone(),
        }
    }

    /// Canonical description of the current shape: node set plus edge
    /// endpoints and flags. Two graphs that reached the same shape through
    /// different mutation orders compare equal.
    pub fn shape_signature(&self) -> String {
        use fmt::Write;
        let mut sig = String::new();
        for node in self.nodes.values() {
            let _ = write!(sig, "n{}:{};", node.id.0, node.table);
        }
        for edge in self.edges.values() {
            let _ = write!(
                sig,
                "e{}:{}>{}:{}{};",
                edge.id.0,
                edge.from.0,
                edge.to.0,
                if edge.reversed { 'r' } else { '-' },
                if edge.reference { 'R' } else { '-' },
            );
        }
        sig
    }
}

impl fmt::Display for Graph {
    /// One line per node: the table and the children it embeds or refers to.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for node in self.nodes.values() {
            write!(f, "{}:", node.table)?;
            for edge in self.outgoing_edges(node.id) {
                let marker = if edge.reference { "&" } else { "" };
                write!(f, " {}{}", marker, self.node(edge.to).table)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
