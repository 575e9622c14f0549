//! Compiled schema model types.
//!
//! This module defines:
//! - [`SchemaId`] - Identifier of a node inside a schema graph
//! - [`Schema`] - Handle to a node of an immutable, possibly cyclic, schema graph
//! - [`SchemaBuilder`] - Allocates and fills schema nodes, then freezes them into a graph

use crate::constraint::Constraint;
use crate::value::Value;
use std::fmt;
use std::sync::{Arc, LazyLock};

/// Identifier of a schema node inside its graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SchemaId(usize);

impl SchemaId {
    /// The empty schema node every graph starts with.
    pub const EMPTY: Self = Self(0);

    pub(crate) const fn new(index: usize) -> Self {
        Self(index)
    }

    /// The position of the node in its graph.
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for SchemaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "_:s{}", self.0)
    }
}

/// A schema node: an ordered list of constraints plus annotations.
#[derive(Debug, Clone, Default)]
struct SchemaNode {
    constraints: Vec<Arc<Constraint>>,
    default: Option<Value>,
    title: Option<String>,
    description: Option<String>,
}

#[derive(Debug)]
struct SchemaGraph {
    nodes: Vec<SchemaNode>,
}

static EMPTY_SCHEMA: LazyLock<Schema> =
    LazyLock::new(|| SchemaBuilder::new().build(SchemaId::EMPTY));

/// A compiled schema.
///
/// A schema is a handle to a node of an immutable graph; nested schemas of its constraints
/// live in the same graph and may point back to it. Cloning is cheap.
///
/// ```
/// use oxjsonschema::Schema;
///
/// let empty = Schema::empty();
/// assert!(empty.is_empty());
/// assert!(empty.ptr_eq(&Schema::empty()));
/// ```
#[derive(Clone)]
pub struct Schema {
    graph: Arc<SchemaGraph>,
    id: SchemaId,
}

impl Schema {
    /// The shared empty schema: it has no constraints and accepts every value.
    pub fn empty() -> Self {
        EMPTY_SCHEMA.clone()
    }

    fn node(&self) -> &SchemaNode {
        &self.graph.nodes[self.id.0]
    }

    pub fn id(&self) -> SchemaId {
        self.id
    }

    /// The schema `id` of the same graph.
    ///
    /// Ids come from the constraints of schemas of this graph.
    pub fn at(&self, id: SchemaId) -> Self {
        debug_assert!(id.0 < self.graph.nodes.len(), "{id} is not in this graph");
        Self {
            graph: Arc::clone(&self.graph),
            id,
        }
    }

    /// The constraints of this schema, in evaluation order.
    pub fn constraints(&self) -> &[Arc<Constraint>] {
        &self.node().constraints
    }

    /// The schemas directly nested in the constraints of this schema.
    pub fn nested(&self) -> Vec<Self> {
        self.constraints()
            .iter()
            .flat_map(|constraint| constraint.nested())
            .map(|id| self.at(id))
            .collect()
    }

    /// The `default` annotation.
    pub fn default_value(&self) -> Option<&Value> {
        self.node().default.as_ref()
    }

    pub fn title(&self) -> Option<&str> {
        self.node().title.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.node().description.as_deref()
    }

    /// Returns true if the schema has neither constraints nor annotations.
    pub fn is_empty(&self) -> bool {
        let node = self.node();
        node.constraints.is_empty()
            && node.default.is_none()
            && node.title.is_none()
            && node.description.is_none()
    }

    /// Returns true if both handles designate the same node of the same graph.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.graph, &other.graph) && self.id == other.id
    }

    /// Number of nodes of the underlying graph.
    pub fn graph_len(&self) -> usize {
        self.graph.nodes.len()
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("id", &self.id)
            .field(
                "constraints",
                &self
                    .constraints()
                    .iter()
                    .map(|c| c.keyword())
                    .collect::<Vec<_>>(),
            )
            .field("title", &self.title())
            .finish_non_exhaustive()
    }
}

/// Builds a schema graph.
///
/// Nodes are allocated first and filled later so that a node can refer to itself
/// or to an ancestor.
///
/// ```
/// use oxjsonschema::{Constraint, SchemaBuilder, TypeKind};
///
/// let mut builder = SchemaBuilder::new();
/// let list = builder.allocate();
/// builder.push_constraint(list, Constraint::Type(vec![TypeKind::Array, TypeKind::Null]));
/// builder.push_constraint(
///     list,
///     Constraint::Items {
///         items: oxjsonschema::ItemsSchema::Single(list),
///         additional: None,
///     },
/// );
/// let schema = builder.build(list);
/// assert!(schema.nested()[0].ptr_eq(&schema));
/// ```
#[derive(Debug)]
pub struct SchemaBuilder {
    nodes: Vec<SchemaNode>,
    never: Option<SchemaId>,
}

impl Default for SchemaBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self {
            nodes: vec![SchemaNode::default()],
            never: None,
        }
    }

    /// Allocates a new empty node.
    pub fn allocate(&mut self) -> SchemaId {
        self.nodes.push(SchemaNode::default());
        SchemaId(self.nodes.len() - 1)
    }

    /// Allocates a node holding `constraints`.
    pub fn add(&mut self, constraints: impl IntoIterator<Item = Constraint>) -> SchemaId {
        let id = self.allocate();
        for constraint in constraints {
            self.push_constraint(id, constraint);
        }
        id
    }

    /// The node that rejects every value.
    pub fn never(&mut self) -> SchemaId {
        if let Some(id) = self.never {
            return id;
        }
        let id = self.add([Constraint::Not(SchemaId::EMPTY)]);
        self.never = Some(id);
        id
    }

    /// Appends a constraint to an allocated node.
    pub fn push_constraint(&mut self, id: SchemaId, constraint: Constraint) {
        if let Some(node) = self.nodes.get_mut(id.0) {
            node.constraints.push(Arc::new(constraint));
        }
    }

    pub fn set_default(&mut self, id: SchemaId, default: Value) {
        if let Some(node) = self.nodes.get_mut(id.0) {
            node.default = Some(default);
        }
    }

    pub fn set_title(&mut self, id: SchemaId, title: impl Into<String>) {
        if let Some(node) = self.nodes.get_mut(id.0) {
            node.title = Some(title.into());
        }
    }

    pub fn set_description(&mut self, id: SchemaId, description: impl Into<String>) {
        if let Some(node) = self.nodes.get_mut(id.0) {
            node.description = Some(description.into());
        }
    }

    /// Number of allocated nodes, including the empty one.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Freezes the graph and returns the schema of node `root`.
    pub fn build(self, root: SchemaId) -> Schema {
        Schema {
            graph: Arc::new(SchemaGraph { nodes: self.nodes }),
            id: root,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::TypeKind;

    #[test]
    fn test_empty_is_shared() {
        assert!(Schema::empty().ptr_eq(&Schema::empty()));
        assert_eq!(Schema::empty().id(), SchemaId::EMPTY);
        assert!(Schema::empty().constraints().is_empty());
    }

    #[test]
    fn test_every_graph_has_an_empty_node() {
        let mut builder = SchemaBuilder::new();
        let root = builder.add([Constraint::Not(SchemaId::EMPTY)]);
        let schema = builder.build(root);
        assert!(schema.at(SchemaId::EMPTY).is_empty());
        assert!(!schema.at(SchemaId::EMPTY).ptr_eq(&Schema::empty()));
    }

    #[test]
    fn test_never_is_allocated_once() {
        let mut builder = SchemaBuilder::new();
        let a = builder.never();
        let b = builder.never();
        assert_eq!(a, b);
        assert_eq!(builder.len(), 2);
    }

    #[test]
    fn test_annotations() {
        let mut builder = SchemaBuilder::new();
        let id = builder.add([Constraint::Type(vec![TypeKind::String])]);
        builder.set_title(id, "Name");
        builder.set_description(id, "The name");
        builder.set_default(id, Value::from("anonymous"));
        let schema = builder.build(id);
        assert_eq!(schema.title(), Some("Name"));
        assert_eq!(schema.description(), Some("The name"));
        assert_eq!(schema.default_value(), Some(&Value::from("anonymous")));
        assert!(!schema.is_empty());
        assert_eq!(schema.constraints()[0].keyword(), "type");
    }

    #[test]
    fn test_schemas_are_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Schema>();
    }
}
