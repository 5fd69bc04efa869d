//! In-memory script AST.
//!
//! Nodes live in an arena ([`Ast`]) and refer to each other by [`NodeId`].
//! Every node records its parent, and a parent records its children in one
//! of its ordered sequences:
//!
//! - a property keeps its children in `values`;
//! - an object keeps three independent sequences: `children`, `values`
//!   and `overrides`.
//!
//! Child sequences are owned by the arena: they start empty and grow only
//! through [`Ast::add`], which keeps parent links and sequence membership
//! consistent.
//!
//! ## Example
//!
//! ```
//! use scriptcache::ast::{Ast, Node, Sequence};
//!
//! let mut ast = Ast::new();
//! let mat = ast.add_root(Node::object("mat1", "material").at("a.material", 1));
//! let diffuse = ast.add(mat, Sequence::Children, Node::property("diffuse"))?;
//! ast.add(diffuse, Sequence::Default, Node::atom("1.0"))?;
//! assert_eq!(ast.len(), 3);
//! # Ok::<(), scriptcache::Error>(())
//! ```

pub mod dump;

use std::collections::BTreeMap;

use crate::util::{Error, Result};

/// Index of a node inside its [`Ast`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    /// Position of the node in the arena.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Which ordered sequence of its parent a node belongs to.
///
/// The discriminants are the transition tags used on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Sequence {
    /// Root list, or a property's values.
    Default = 0,
    /// `ObjectNode::children`.
    Children = 1,
    /// `ObjectNode::values`.
    Values = 2,
    /// `ObjectNode::overrides`.
    Overrides = 3,
}

/// Node kind discriminant. Values match the block type written on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum NodeType {
    Atom = 1,
    Object = 2,
    Property = 3,
}

/// A single scalar value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AtomNode {
    pub value: String,
    pub id: u32,
}

/// A named property holding an ordered list of values.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PropertyNode {
    pub name: String,
    pub id: u32,
    values: Vec<NodeId>,
}

impl PropertyNode {
    /// Value nodes in order.
    pub fn values(&self) -> &[NodeId] {
        &self.values
    }
}

/// A named, typed object with bases, environment variables and three child
/// sequences.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectNode {
    pub name: String,
    pub cls: String,
    pub id: u32,
    pub is_abstract: bool,
    /// Names of the objects this one derives from, in declaration order.
    pub bases: Vec<String>,
    /// Environment variables, ordered by key.
    pub variables: BTreeMap<String, String>,
    children: Vec<NodeId>,
    values: Vec<NodeId>,
    overrides: Vec<NodeId>,
}

impl ObjectNode {
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn values(&self) -> &[NodeId] {
        &self.values
    }

    pub fn overrides(&self) -> &[NodeId] {
        &self.overrides
    }

    /// Child sequence for a transition tag.
    pub fn sequence(&self, seq: Sequence) -> Option<&[NodeId]> {
        match seq {
            Sequence::Children => Some(&self.children),
            Sequence::Values => Some(&self.values),
            Sequence::Overrides => Some(&self.overrides),
            Sequence::Default => None,
        }
    }
}

/// Kind-specific payload of a node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Atom(AtomNode),
    Property(PropertyNode),
    Object(ObjectNode),
}

impl NodeKind {
    pub fn node_type(&self) -> NodeType {
        match self {
            NodeKind::Atom(_) => NodeType::Atom,
            NodeKind::Property(_) => NodeType::Property,
            NodeKind::Object(_) => NodeType::Object,
        }
    }

    /// Compare every scalar field, bases and variables, and the length of
    /// each child sequence. Child identities are not compared.
    fn same_fields(&self, other: &NodeKind) -> bool {
        match (self, other) {
            (NodeKind::Atom(a), NodeKind::Atom(b)) => a == b,
            (NodeKind::Property(a), NodeKind::Property(b)) => {
                a.name == b.name && a.id == b.id && a.values.len() == b.values.len()
            }
            (NodeKind::Object(a), NodeKind::Object(b)) => {
                a.name == b.name
                    && a.cls == b.cls
                    && a.id == b.id
                    && a.is_abstract == b.is_abstract
                    && a.bases == b.bases
                    && a.variables == b.variables
                    && a.children.len() == b.children.len()
                    && a.values.len() == b.values.len()
                    && a.overrides.len() == b.overrides.len()
            }
            _ => false,
        }
    }
}

impl From<AtomNode> for NodeKind {
    fn from(n: AtomNode) -> Self {
        NodeKind::Atom(n)
    }
}

impl From<PropertyNode> for NodeKind {
    fn from(n: PropertyNode) -> Self {
        NodeKind::Property(n)
    }
}

impl From<ObjectNode> for NodeKind {
    fn from(n: ObjectNode) -> Self {
        NodeKind::Object(n)
    }
}

/// One AST node.
#[derive(Clone, Debug)]
pub struct Node {
    parent: Option<NodeId>,
    /// Name of the resource the node was read from.
    pub file: String,
    /// Source line number.
    pub line: u32,
    pub kind: NodeKind,
}

impl Node {
    /// Create a detached node of the given kind.
    pub fn new(kind: impl Into<NodeKind>) -> Self {
        Self {
            parent: None,
            file: String::new(),
            line: 0,
            kind: kind.into(),
        }
    }

    /// Create an atom node.
    pub fn atom(value: impl Into<String>) -> Self {
        Self::new(AtomNode {
            value: value.into(),
            id: 0,
        })
    }

    /// Create a property node with no values.
    pub fn property(name: impl Into<String>) -> Self {
        Self::new(PropertyNode {
            name: name.into(),
            id: 0,
            values: Vec::new(),
        })
    }

    /// Create an object node with no bases, variables or children.
    pub fn object(name: impl Into<String>, cls: impl Into<String>) -> Self {
        Self::new(ObjectNode {
            name: name.into(),
            cls: cls.into(),
            id: 0,
            is_abstract: false,
            bases: Vec::new(),
            variables: BTreeMap::new(),
            children: Vec::new(),
            values: Vec::new(),
            overrides: Vec::new(),
        })
    }

    /// Set the source location.
    pub fn at(mut self, file: impl Into<String>, line: u32) -> Self {
        self.file = file.into();
        self.line = line;
        self
    }

    /// Set the node's numeric tag.
    pub fn with_id(mut self, id: u32) -> Self {
        match &mut self.kind {
            NodeKind::Atom(n) => n.id = id,
            NodeKind::Property(n) => n.id = id,
            NodeKind::Object(n) => n.id = id,
        }
        self
    }

    /// Mark an object node abstract. No effect on other kinds.
    pub fn with_abstract(mut self, is_abstract: bool) -> Self {
        if let NodeKind::Object(n) = &mut self.kind {
            n.is_abstract = is_abstract;
        }
        self
    }

    /// Append a base name to an object node. No effect on other kinds.
    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        if let NodeKind::Object(n) = &mut self.kind {
            n.bases.push(base.into());
        }
        self
    }

    /// Set an environment variable on an object node. No effect on other kinds.
    pub fn with_variable(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        if let NodeKind::Object(n) = &mut self.kind {
            n.variables.insert(key.into(), value.into());
        }
        self
    }

    /// Parent node, `None` for roots.
    #[inline]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    #[inline]
    pub fn node_type(&self) -> NodeType {
        self.kind.node_type()
    }

    pub fn as_atom(&self) -> Option<&AtomNode> {
        match &self.kind {
            NodeKind::Atom(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_property(&self) -> Option<&PropertyNode> {
        match &self.kind {
            NodeKind::Property(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectNode> {
        match &self.kind {
            NodeKind::Object(n) => Some(n),
            _ => None,
        }
    }
}

/// Arena holding a list of script trees.
#[derive(Clone, Debug, Default)]
pub struct Ast {
    nodes: Vec<Node>,
    roots: Vec<NodeId>,
}

impl Ast {
    pub fn new() -> Self {
        Self::default()
    }

    /// Top-level nodes in order.
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Total number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Look up a node.
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    /// Look up a node that is known to belong to this arena.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not produced by this `Ast`.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    /// Iterate all nodes in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (NodeId(i as u32), n))
    }

    /// Name of the resource the first tree came from.
    pub fn file(&self) -> Option<&str> {
        self.roots.first().map(|&id| self.node(id).file.as_str())
    }

    /// Append a top-level node.
    pub fn add_root(&mut self, node: Node) -> NodeId {
        let id = self.push(None, node);
        self.roots.push(id);
        id
    }

    /// Append `node` to one of `parent`'s sequences.
    ///
    /// A property accepts any tag and appends to its values. An object
    /// requires `Children`, `Values` or `Overrides`. Atoms take no children.
    pub fn add(&mut self, parent: NodeId, seq: Sequence, node: Node) -> Result<NodeId> {
        let parent_type = self
            .get(parent)
            .ok_or_else(|| Error::malformed(format!("unknown parent node {}", parent.index())))?
            .node_type();
        match (parent_type, seq) {
            (NodeType::Atom, _) => {
                return Err(Error::malformed("atom nodes cannot have children"));
            }
            (NodeType::Object, Sequence::Default) => {
                return Err(Error::malformed("object child without a sequence tag"));
            }
            _ => {}
        }

        let id = self.push(Some(parent), node);
        match &mut self.nodes[parent.index()].kind {
            NodeKind::Property(p) => p.values.push(id),
            NodeKind::Object(o) => match seq {
                Sequence::Children => o.children.push(id),
                Sequence::Values => o.values.push(id),
                Sequence::Overrides => o.overrides.push(id),
                Sequence::Default => unreachable!("rejected above"),
            },
            NodeKind::Atom(_) => unreachable!("rejected above"),
        }
        Ok(id)
    }

    fn push(&mut self, parent: Option<NodeId>, mut node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        node.parent = parent;
        self.nodes.push(node);
        id
    }
}

/// Structural equality: same shape, same fields, same parent linkage and
/// sequence membership. Ignores `file` and arena order.
impl PartialEq for Ast {
    fn eq(&self, other: &Self) -> bool {
        if self.roots.len() != other.roots.len() {
            return false;
        }

        // (lhs, rhs, expected lhs parent, expected rhs parent)
        let mut stack: Vec<(NodeId, NodeId, Option<NodeId>, Option<NodeId>)> = self
            .roots
            .iter()
            .zip(&other.roots)
            .map(|(&a, &b)| (a, b, None, None))
            .collect();

        while let Some((a, b, pa, pb)) = stack.pop() {
            let (Some(na), Some(nb)) = (self.get(a), other.get(b)) else {
                return false;
            };
            if na.parent != pa || nb.parent != pb {
                return false;
            }
            if na.line != nb.line || !na.kind.same_fields(&nb.kind) {
                return false;
            }
            match (&na.kind, &nb.kind) {
                (NodeKind::Property(x), NodeKind::Property(y)) => {
                    for (&ca, &cb) in x.values.iter().zip(&y.values) {
                        stack.push((ca, cb, Some(a), Some(b)));
                    }
                }
                (NodeKind::Object(x), NodeKind::Object(y)) => {
                    let pairs = x
                        .children
                        .iter()
                        .zip(&y.children)
                        .chain(x.values.iter().zip(&y.values))
                        .chain(x.overrides.iter().zip(&y.overrides));
                    for (&ca, &cb) in pairs {
                        stack.push((ca, cb, Some(a), Some(b)));
                    }
                }
                _ => {}
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn material() -> (Ast, NodeId, NodeId) {
        let mut ast = Ast::new();
        let mat = ast.add_root(Node::object("mat1", "material").at("a.material", 1));
        let prop = ast
            .add(mat, Sequence::Children, Node::property("diffuse").at("a.material", 2))
            .unwrap();
        ast.add(prop, Sequence::Default, Node::atom("1.0")).unwrap();
        ast.add(prop, Sequence::Default, Node::atom("0.5")).unwrap();
        (ast, mat, prop)
    }

    #[test]
    fn test_parent_links() {
        let (ast, mat, prop) = material();
        assert_eq!(ast.node(mat).parent(), None);
        assert_eq!(ast.node(prop).parent(), Some(mat));
        let values = ast.node(prop).as_property().unwrap().values();
        assert_eq!(values.len(), 2);
        for &v in values {
            assert_eq!(ast.node(v).parent(), Some(prop));
        }
    }

    #[test]
    fn test_atom_rejects_children() {
        let mut ast = Ast::new();
        let atom = ast.add_root(Node::atom("x"));
        let err = ast.add(atom, Sequence::Default, Node::atom("y")).unwrap_err();
        assert!(matches!(err, Error::MalformedNesting(_)));
    }

    #[test]
    fn test_object_requires_tag() {
        let mut ast = Ast::new();
        let obj = ast.add_root(Node::object("o", "pass"));
        assert!(ast.add(obj, Sequence::Default, Node::atom("y")).is_err());
        assert!(ast.add(obj, Sequence::Overrides, Node::atom("y")).is_ok());
        assert_eq!(ast.node(obj).as_object().unwrap().overrides().len(), 1);
    }

    #[test]
    fn test_structural_eq_ignores_file_and_order() {
        let (a, _, _) = material();

        // Same tree built in a different arena order.
        let mut b = Ast::new();
        let mat = b.add_root(Node::object("mat1", "material").at("other.sbin", 1));
        let prop = b
            .add(mat, Sequence::Children, Node::property("diffuse").at("other.sbin", 2))
            .unwrap();
        b.add(prop, Sequence::Default, Node::atom("1.0")).unwrap();
        b.add(prop, Sequence::Default, Node::atom("0.5")).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_structural_eq_detects_sequence_membership() {
        let mut a = Ast::new();
        let oa = a.add_root(Node::object("o", "c"));
        a.add(oa, Sequence::Children, Node::atom("v")).unwrap();

        let mut b = Ast::new();
        let ob = b.add_root(Node::object("o", "c"));
        b.add(ob, Sequence::Values, Node::atom("v")).unwrap();

        assert_ne!(a, b);
    }

    #[test]
    fn test_structural_eq_detects_field_change() {
        let (a, _, _) = material();
        let mut b = Ast::new();
        let mat = b.add_root(Node::object("mat1", "material").at("a.material", 1));
        let prop = b
            .add(mat, Sequence::Children, Node::property("diffuse").at("a.material", 2))
            .unwrap();
        b.add(prop, Sequence::Default, Node::atom("1.0")).unwrap();
        b.add(prop, Sequence::Default, Node::atom("0.25")).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_object_builders() {
        let node = Node::object("o", "c")
            .with_id(4)
            .with_abstract(true)
            .with_base("base")
            .with_variable("k", "v");
        let obj = node.as_object().unwrap();
        assert_eq!(obj.id, 4);
        assert!(obj.is_abstract);
        assert_eq!(obj.bases, vec!["base".to_string()]);
        assert_eq!(obj.variables.get("k").map(String::as_str), Some("v"));
    }
}
