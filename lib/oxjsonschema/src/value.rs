//! Generic document values.
//!
//! This module defines:
//! - [`RawValue`] - the native tree handed over by format readers, whose composite nodes
//!   have an identity and may be aliased or cyclic
//! - [`Value`] - the immutable, identity-preserving value graph used by the rest of the crate
//!
//! A [`Value`] is a handle into an arena shared by every node built from the same native tree.
//! Aliased native nodes become the same arena node and cycles stay cycles.

use crate::error::ValueError;
use rustc_hash::{FxHashMap, FxHashSet};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

/// The reserved member name that turns an object into a reference.
pub const REFERENCE_KEY: &str = "$ref";

/// A node of a native document tree, as produced by a format reader.
///
/// Composite nodes are reference counted so that the same node may appear at several
/// places of the tree, including inside itself.
#[derive(Clone)]
pub enum RawValue {
    Null,
    Boolean(bool),
    Integer(i64),
    Number(f64),
    String(String),
    Array(Rc<RefCell<Vec<RawValue>>>),
    Object(Rc<RefCell<Vec<(String, RawValue)>>>),
    /// Binary content, produced by some readers but not representable as a [`Value`].
    Bytes(Vec<u8>),
    /// A native date-time (e.g. TOML datetimes), not representable as a [`Value`].
    DateTime(String),
}

impl RawValue {
    /// Builds a new array node.
    pub fn array(items: impl IntoIterator<Item = RawValue>) -> Self {
        Self::Array(Rc::new(RefCell::new(items.into_iter().collect())))
    }

    /// Builds a new object node. Later duplicated keys replace earlier ones.
    pub fn object<K: Into<String>>(members: impl IntoIterator<Item = (K, RawValue)>) -> Self {
        let object = Self::Object(Rc::new(RefCell::new(Vec::new())));
        for (key, value) in members {
            object.insert(key, value);
        }
        object
    }

    /// Appends an element to an array node. Does nothing on other nodes.
    pub fn push(&self, value: RawValue) {
        if let Self::Array(items) = self {
            items.borrow_mut().push(value);
        }
    }

    /// Sets a member of an object node, keeping the position of an existing key.
    /// Does nothing on other nodes.
    pub fn insert(&self, key: impl Into<String>, value: RawValue) {
        if let Self::Object(members) = self {
            let key = key.into();
            let mut members = members.borrow_mut();
            if let Some(slot) = members.iter_mut().find(|(k, _)| *k == key) {
                slot.1 = value;
            } else {
                members.push((key, value));
            }
        }
    }

    /// Removes every element or member of a composite node.
    ///
    /// Cyclic native trees are never freed by reference counting alone: clearing their
    /// nodes breaks the cycles.
    pub fn clear(&self) {
        match self {
            Self::Array(items) => items.borrow_mut().clear(),
            Self::Object(members) => members.borrow_mut().clear(),
            _ => (),
        }
    }

    /// Returns true if both values are the same composite node.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Array(a), Self::Array(b)) => Rc::ptr_eq(a, b),
            (Self::Object(a), Self::Object(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Boolean(_) => "boolean",
            Self::Integer(_) => "integer",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
            Self::Bytes(_) => "bytes",
            Self::DateTime(_) => "date-time",
        }
    }
}

// Composite nodes may be cyclic, so only their identity is printed.
impl fmt::Debug for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("Null"),
            Self::Boolean(v) => f.debug_tuple("Boolean").field(v).finish(),
            Self::Integer(v) => f.debug_tuple("Integer").field(v).finish(),
            Self::Number(v) => f.debug_tuple("Number").field(v).finish(),
            Self::String(v) => f.debug_tuple("String").field(v).finish(),
            Self::Array(v) => write!(f, "Array({:p})", Rc::as_ptr(v)),
            Self::Object(v) => write!(f, "Object({:p})", Rc::as_ptr(v)),
            Self::Bytes(v) => f.debug_tuple("Bytes").field(&v.len()).finish(),
            Self::DateTime(v) => f.debug_tuple("DateTime").field(v).finish(),
        }
    }
}

impl From<bool> for RawValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<i64> for RawValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        Self::String(value.into())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<&serde_json::Value> for RawValue {
    fn from(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Boolean(*b),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map_or_else(|| Self::Number(n.as_f64().unwrap_or(f64::NAN)), Self::Integer),
            serde_json::Value::String(s) => Self::String(s.clone()),
            serde_json::Value::Array(items) => Self::array(items.iter().map(Self::from)),
            serde_json::Value::Object(members) => {
                Self::object(members.iter().map(|(k, v)| (k.as_str(), Self::from(v))))
            }
        }
    }
}

/// The kind of a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Null,
    Boolean,
    Integer,
    Number,
    String,
    Array,
    Object,
    /// An object carrying a `$ref` string member.
    Reference,
}

impl ValueKind {
    /// Returns the lowercase name of this kind.
    pub fn name(self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Boolean => "boolean",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::String => "string",
            Self::Array => "array",
            Self::Object => "object",
            Self::Reference => "reference",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

type NodeId = usize;

#[derive(Debug)]
struct ValueGraph {
    nodes: Vec<Node>,
}

impl ValueGraph {
    fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }
}

#[derive(Debug)]
enum Node {
    Null,
    Boolean(bool),
    Integer(i64),
    Number(f64),
    String(Box<str>),
    Array(Vec<NodeId>),
    Object(ObjectNode),
    Reference(ObjectNode),
}

#[derive(Debug, Default)]
struct ObjectNode {
    members: Vec<(Box<str>, NodeId)>,
    index: FxHashMap<Box<str>, usize>,
}

impl ObjectNode {
    fn new(members: Vec<(Box<str>, NodeId)>) -> Self {
        let index = members
            .iter()
            .enumerate()
            .map(|(i, (key, _))| (key.clone(), i))
            .collect();
        Self { members, index }
    }

    fn get(&self, key: &str) -> Option<NodeId> {
        self.index.get(key).map(|i| self.members[*i].1)
    }
}

/// An immutable node of a document graph.
///
/// Cloning a value is cheap: it clones a handle to the shared graph.
/// Use [`Value::ptr_eq`] to test node identity and `==` to test structural equality.
#[derive(Clone)]
pub struct Value {
    graph: Arc<ValueGraph>,
    id: NodeId,
}

/// Opaque identity of a [`Value`] node, usable as a map key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct ValueIdentity(usize, NodeId);

impl Value {
    /// Builds a value graph from a native tree.
    ///
    /// Aliased native nodes map to the same value node and native cycles are preserved.
    /// The traversal uses an explicit work list, so deeply nested input does not exhaust the stack.
    pub fn transform(raw: &RawValue) -> Result<Self, ValueError> {
        let mut builder = GraphBuilder::default();
        let id = builder.add(raw)?;
        Ok(builder.finish(id))
    }

    /// The `null` value.
    pub fn null() -> Self {
        Self::single(Node::Null)
    }

    fn single(node: Node) -> Self {
        Self {
            graph: Arc::new(ValueGraph { nodes: vec![node] }),
            id: 0,
        }
    }

    fn at_node(&self, id: NodeId) -> Self {
        Self {
            graph: Arc::clone(&self.graph),
            id,
        }
    }

    fn node(&self) -> &Node {
        self.graph.node(self.id)
    }

    pub(crate) fn identity(&self) -> ValueIdentity {
        ValueIdentity(Arc::as_ptr(&self.graph).addr(), self.id)
    }

    /// Returns true if both handles designate the same node of the same graph.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.graph, &other.graph) && self.id == other.id
    }

    /// Returns the kind of this value.
    pub fn kind(&self) -> ValueKind {
        match self.node() {
            Node::Null => ValueKind::Null,
            Node::Boolean(_) => ValueKind::Boolean,
            Node::Integer(_) => ValueKind::Integer,
            Node::Number(_) => ValueKind::Number,
            Node::String(_) => ValueKind::String,
            Node::Array(_) => ValueKind::Array,
            Node::Object(_) => ValueKind::Object,
            Node::Reference(_) => ValueKind::Reference,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self.node(), Node::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.node() {
            Node::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the value of an integer node.
    pub fn as_i64(&self) -> Option<i64> {
        match self.node() {
            Node::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the numeric value of an integer or number node.
    #[expect(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self.node() {
            Node::Integer(i) => Some(*i as f64),
            Node::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self.node() {
            Node::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns true for objects and references.
    pub fn is_object(&self) -> bool {
        matches!(self.node(), Node::Object(_) | Node::Reference(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self.node(), Node::Array(_))
    }

    /// Returns true if this value is a reference, i.e. an object carrying a `$ref` string.
    pub fn is_reference(&self) -> bool {
        matches!(self.node(), Node::Reference(_))
    }

    /// Returns the `$ref` target string of a reference.
    pub fn reference(&self) -> Option<&str> {
        match self.node() {
            Node::Reference(object) => object
                .get(REFERENCE_KEY)
                .and_then(|id| match self.graph.node(id) {
                    Node::String(s) => Some(&**s),
                    _ => None,
                }),
            _ => None,
        }
    }

    /// Number of elements of an array or members of an object, 0 otherwise.
    pub fn len(&self) -> usize {
        match self.node() {
            Node::Array(items) => items.len(),
            Node::Object(object) | Node::Reference(object) => object.members.len(),
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the element at `index` of an array.
    pub fn at(&self, index: usize) -> Option<Self> {
        match self.node() {
            Node::Array(items) => items.get(index).map(|id| self.at_node(*id)),
            _ => None,
        }
    }

    /// Returns the member `key` of an object or reference.
    pub fn get(&self, key: &str) -> Option<Self> {
        match self.node() {
            Node::Object(object) | Node::Reference(object) => {
                object.get(key).map(|id| self.at_node(id))
            }
            _ => None,
        }
    }

    /// Iterates over the elements of an array (empty for other kinds).
    pub fn elements(&self) -> Elements<'_> {
        let ids: &[NodeId] = match self.node() {
            Node::Array(items) => items,
            _ => &[],
        };
        Elements {
            value: self,
            ids: ids.iter(),
        }
    }

    /// Iterates over the members of an object or reference in insertion order
    /// (empty for other kinds).
    pub fn members(&self) -> Members<'_> {
        let members: &[(Box<str>, NodeId)] = match self.node() {
            Node::Object(object) | Node::Reference(object) => &object.members,
            _ => &[],
        };
        Members {
            value: self,
            members: members.iter(),
        }
    }

    /// Iterates over the member names of an object or reference.
    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.members().map(|(key, _)| key)
    }

    /// Converts this value graph back to a native tree, preserving aliasing and cycles.
    pub fn to_raw(&self) -> RawValue {
        let mut memo: FxHashMap<NodeId, RawValue> = FxHashMap::default();
        let mut pending = Vec::new();
        let root = raw_shell(&self.graph, self.id, &mut memo, &mut pending);
        while let Some(id) = pending.pop() {
            let shell = memo[&id].clone();
            match self.graph.node(id) {
                Node::Array(items) => {
                    for item in items {
                        shell.push(raw_shell(&self.graph, *item, &mut memo, &mut pending));
                    }
                }
                Node::Object(object) | Node::Reference(object) => {
                    for (key, member) in &object.members {
                        shell.insert(
                            &**key,
                            raw_shell(&self.graph, *member, &mut memo, &mut pending),
                        );
                    }
                }
                _ => (),
            }
        }
        root
    }
}

fn raw_shell(
    graph: &ValueGraph,
    id: NodeId,
    memo: &mut FxHashMap<NodeId, RawValue>,
    pending: &mut Vec<NodeId>,
) -> RawValue {
    if let Some(existing) = memo.get(&id) {
        return existing.clone();
    }
    let shell = match graph.node(id) {
        Node::Null => return RawValue::Null,
        Node::Boolean(b) => return RawValue::Boolean(*b),
        Node::Integer(i) => return RawValue::Integer(*i),
        Node::Number(n) => return RawValue::Number(*n),
        Node::String(s) => return RawValue::String(s.to_string()),
        Node::Array(_) => RawValue::array([]),
        Node::Object(_) | Node::Reference(_) => RawValue::object::<String>([]),
    };
    memo.insert(id, shell.clone());
    pending.push(id);
    shell
}

/// Iterator over the elements of an array [`Value`].
pub struct Elements<'a> {
    value: &'a Value,
    ids: std::slice::Iter<'a, NodeId>,
}

impl Iterator for Elements<'_> {
    type Item = Value;

    fn next(&mut self) -> Option<Value> {
        self.ids.next().map(|id| self.value.at_node(*id))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.ids.size_hint()
    }
}

/// Iterator over the members of an object [`Value`].
pub struct Members<'a> {
    value: &'a Value,
    members: std::slice::Iter<'a, (Box<str>, NodeId)>,
}

impl<'a> Iterator for Members<'a> {
    type Item = (&'a str, Value);

    fn next(&mut self) -> Option<(&'a str, Value)> {
        self.members
            .next()
            .map(|(key, id)| (&**key, self.value.at_node(*id)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.members.size_hint()
    }
}

#[derive(Default)]
struct GraphBuilder {
    nodes: Vec<Node>,
    memo: FxHashMap<*const (), NodeId>,
    pending: Vec<(NodeId, RawValue)>,
}

impl GraphBuilder {
    fn add(&mut self, raw: &RawValue) -> Result<NodeId, ValueError> {
        let root = self.intern(raw)?;
        while let Some((id, raw)) = self.pending.pop() {
            match &raw {
                RawValue::Array(items) => {
                    let mut ids = Vec::with_capacity(items.borrow().len());
                    for item in items.borrow().iter() {
                        ids.push(self.intern(item)?);
                    }
                    self.nodes[id] = Node::Array(ids);
                }
                RawValue::Object(members) => {
                    let members = members.borrow();
                    let is_reference = members
                        .iter()
                        .any(|(k, v)| k == REFERENCE_KEY && matches!(v, RawValue::String(_)));
                    let mut ids = Vec::with_capacity(members.len());
                    for (key, member) in members.iter() {
                        ids.push((key.as_str().into(), self.intern(member)?));
                    }
                    let object = ObjectNode::new(ids);
                    self.nodes[id] = if is_reference {
                        Node::Reference(object)
                    } else {
                        Node::Object(object)
                    };
                }
                _ => (),
            }
        }
        Ok(root)
    }

    /// Returns the node of a scalar, or the registered (possibly still empty) node of a composite.
    fn intern(&mut self, raw: &RawValue) -> Result<NodeId, ValueError> {
        let node = match raw {
            RawValue::Null => Node::Null,
            RawValue::Boolean(b) => Node::Boolean(*b),
            RawValue::Integer(i) => Node::Integer(*i),
            RawValue::Number(n) => Node::Number(*n),
            RawValue::String(s) => Node::String(s.as_str().into()),
            RawValue::Array(items) => {
                return Ok(self.intern_composite(
                    Rc::as_ptr(items).cast(),
                    raw,
                    Node::Array(Vec::new()),
                ));
            }
            RawValue::Object(members) => {
                return Ok(self.intern_composite(
                    Rc::as_ptr(members).cast(),
                    raw,
                    Node::Object(ObjectNode::default()),
                ));
            }
            RawValue::Bytes(_) | RawValue::DateTime(_) => {
                return Err(ValueError::unsupported_value_type(raw.kind_name()));
            }
        };
        self.nodes.push(node);
        Ok(self.nodes.len() - 1)
    }

    fn intern_composite(&mut self, identity: *const (), raw: &RawValue, placeholder: Node) -> NodeId {
        if let Some(id) = self.memo.get(&identity) {
            return *id;
        }
        self.nodes.push(placeholder);
        let id = self.nodes.len() - 1;
        self.memo.insert(identity, id);
        self.pending.push((id, raw.clone()));
        id
    }

    fn finish(self, id: NodeId) -> Value {
        Value {
            graph: Arc::new(ValueGraph { nodes: self.nodes }),
            id,
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::single(Node::Boolean(value))
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::single(Node::Integer(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::single(Node::Number(value))
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::single(Node::String(value.into()))
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::single(Node::String(value.into()))
    }
}

impl From<&serde_json::Value> for Value {
    fn from(value: &serde_json::Value) -> Self {
        let mut nodes = Vec::new();
        let id = push_json(&mut nodes, value);
        Self {
            graph: Arc::new(ValueGraph { nodes }),
            id,
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        Self::from(&value)
    }
}

fn push_json(nodes: &mut Vec<Node>, value: &serde_json::Value) -> NodeId {
    let node = match value {
        serde_json::Value::Null => Node::Null,
        serde_json::Value::Bool(b) => Node::Boolean(*b),
        serde_json::Value::Number(n) => n.as_i64().map_or_else(
            || Node::Number(n.as_f64().unwrap_or(f64::NAN)),
            Node::Integer,
        ),
        serde_json::Value::String(s) => Node::String(s.as_str().into()),
        serde_json::Value::Array(items) => {
            let ids = items.iter().map(|item| push_json(nodes, item)).collect();
            Node::Array(ids)
        }
        serde_json::Value::Object(members) => {
            let is_reference = matches!(
                members.get(REFERENCE_KEY),
                Some(serde_json::Value::String(_))
            );
            let ids = members
                .iter()
                .map(|(k, v)| (k.as_str().into(), push_json(nodes, v)))
                .collect();
            let object = ObjectNode::new(ids);
            if is_reference {
                Node::Reference(object)
            } else {
                Node::Object(object)
            }
        }
    };
    nodes.push(node);
    nodes.len() - 1
}

impl PartialEq for Value {
    /// Structural equality that terminates on cyclic graphs.
    ///
    /// Composite nodes are paired up as the comparison goes. A pair seen again is assumed equal,
    /// and a node paired with two different partners makes the graphs unequal, so aliasing
    /// must match on both sides.
    fn eq(&self, other: &Self) -> bool {
        let (left, right) = (&*self.graph, &*other.graph);
        let mut left_to_right = FxHashMap::<NodeId, NodeId>::default();
        let mut right_to_left = FxHashMap::<NodeId, NodeId>::default();
        let mut stack = vec![(self.id, other.id)];
        while let Some((l, r)) = stack.pop() {
            let (l_node, r_node) = (left.node(l), right.node(r));
            let composite = match (l_node, r_node) {
                (Node::Array(_), Node::Array(_))
                | (Node::Object(_), Node::Object(_))
                | (Node::Reference(_), Node::Reference(_)) => true,
                _ => {
                    if !scalar_eq(l_node, r_node) {
                        return false;
                    }
                    false
                }
            };
            if !composite {
                continue;
            }
            match (left_to_right.get(&l), right_to_left.get(&r)) {
                (Some(&paired_r), Some(&paired_l)) if paired_r == r && paired_l == l => continue,
                (None, None) => {
                    left_to_right.insert(l, r);
                    right_to_left.insert(r, l);
                }
                _ => return false,
            }
            match (l_node, r_node) {
                (Node::Array(a), Node::Array(b)) => {
                    if a.len() != b.len() {
                        return false;
                    }
                    stack.extend(a.iter().copied().zip(b.iter().copied()));
                }
                (Node::Object(a), Node::Object(b)) | (Node::Reference(a), Node::Reference(b)) => {
                    if a.members.len() != b.members.len() {
                        return false;
                    }
                    for (key, l_member) in &a.members {
                        let Some(r_member) = b.get(key) else {
                            return false;
                        };
                        stack.push((*l_member, r_member));
                    }
                }
                _ => return false,
            }
        }
        true
    }
}

#[expect(clippy::cast_precision_loss)]
fn scalar_eq(left: &Node, right: &Node) -> bool {
    match (left, right) {
        (Node::Null, Node::Null) => true,
        (Node::Boolean(a), Node::Boolean(b)) => a == b,
        (Node::Integer(a), Node::Integer(b)) => a == b,
        (Node::Number(a), Node::Number(b)) => a == b,
        (Node::Integer(a), Node::Number(b)) | (Node::Number(b), Node::Integer(a)) => {
            *a as f64 == *b
        }
        (Node::String(a), Node::String(b)) => a == b,
        _ => false,
    }
}

impl fmt::Display for Value {
    /// Writes a compact JSON rendering; a member leading back to one of its ancestors is written `<cycle>`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_value(f, &self.graph, self.id, &mut FxHashSet::default())
    }
}

fn write_value(
    f: &mut fmt::Formatter<'_>,
    graph: &ValueGraph,
    id: NodeId,
    ancestors: &mut FxHashSet<NodeId>,
) -> fmt::Result {
    match graph.node(id) {
        Node::Null => f.write_str("null"),
        Node::Boolean(b) => write!(f, "{b}"),
        Node::Integer(i) => write!(f, "{i}"),
        Node::Number(n) => write!(f, "{n}"),
        Node::String(s) => write!(f, "{}", serde_json::Value::String(s.to_string())),
        Node::Array(items) => {
            if !ancestors.insert(id) {
                return f.write_str("<cycle>");
            }
            f.write_str("[")?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    f.write_str(",")?;
                }
                write_value(f, graph, *item, ancestors)?;
            }
            ancestors.remove(&id);
            f.write_str("]")
        }
        Node::Object(object) | Node::Reference(object) => {
            if !ancestors.insert(id) {
                return f.write_str("<cycle>");
            }
            f.write_str("{")?;
            for (i, (key, member)) in object.members.iter().enumerate() {
                if i > 0 {
                    f.write_str(",")?;
                }
                write!(f, "{}:", serde_json::Value::String(key.to_string()))?;
                write_value(f, graph, *member, ancestors)?;
            }
            ancestors.remove(&id);
            f.write_str("}")
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Value({self})")
    }
}
