//! The key graph: flat, dot-delimited parameter keys arranged as a forest.
//!
//! `nested.a=1&nested.b=2&top=3` becomes two roots, `nested` (with children
//! `a` and `b`) and `top`. Nodes live in an [`indextree`] arena, so building
//! is an iterative walk over path segments no matter how deep the keys go.

use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt;

use indexmap::IndexMap;
use indextree::{Arena, NodeId};

use crate::trace;

/// Delimiter between path segments in a parameter key.
pub const KEY_DELIMITER: char = '.';

/// Raw values attached to a terminal node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeData {
    /// The last path segment of the key that supplied the values.
    pub key: String,
    /// The values, in the order they were supplied.
    pub values: Vec<String>,
}

/// One path segment in the key graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphNode {
    id: String,
    data: Option<NodeData>,
}

impl GraphNode {
    fn intermediate(id: &str) -> Self {
        Self {
            id: id.to_string(),
            data: None,
        }
    }

    fn terminal(id: &str, values: Vec<String>) -> Self {
        Self {
            id: id.to_string(),
            data: Some(NodeData {
                key: id.to_string(),
                values,
            }),
        }
    }

    /// The path segment this node stands for.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Values supplied directly for this node, if any.
    pub fn data(&self) -> Option<&NodeData> {
        self.data.as_ref()
    }
}

/// A forest of [`GraphNode`]s built from one raw parameter map.
pub struct KeyGraph {
    arena: Arena<GraphNode>,
    roots: IndexMap<String, NodeId>,
    delimiter: char,
}

impl KeyGraph {
    /// Build the graph, splitting keys on [`KEY_DELIMITER`].
    pub fn build<I, K, V, S>(raw: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<[S]>,
        S: AsRef<str>,
    {
        Self::build_with(raw, KEY_DELIMITER)
    }

    /// Build the graph, splitting keys on `delimiter`.
    ///
    /// Keys sharing a prefix share the intermediate nodes for that prefix.
    /// A key that is both supplied on its own and used as the prefix of a
    /// longer key is a caller error; the node then keeps the values and the
    /// children side by side.
    pub fn build_with<I, K, V, S>(raw: I, delimiter: char) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<[S]>,
        S: AsRef<str>,
    {
        let mut graph = Self {
            arena: Arena::new(),
            roots: IndexMap::new(),
            delimiter,
        };

        for (key, values) in raw {
            let key = key.as_ref();
            let values: Vec<String> = values
                .as_ref()
                .iter()
                .map(|value| value.as_ref().to_string())
                .collect();
            trace!(key, count = values.len(), "inserting parameter");
            graph.insert(key.split(delimiter), values);
        }

        graph
    }

    fn insert<'k>(&mut self, mut segments: impl Iterator<Item = &'k str>, values: Vec<String>) {
        // `str::split` always yields at least one segment
        let Some(first) = segments.next() else {
            return;
        };
        let mut segment = first;
        let mut parent: Option<NodeId> = None;

        for next in segments {
            parent = Some(self.walk_or_create(parent, segment));
            segment = next;
        }

        match self.find(parent, segment) {
            Some(existing) => {
                let node = self.arena[existing].get_mut();
                if node.data.is_none() {
                    node.data = Some(NodeData {
                        key: segment.to_string(),
                        values,
                    });
                }
            }
            None => {
                let id = self.arena.new_node(GraphNode::terminal(segment, values));
                self.attach(parent, segment, id);
            }
        }
    }

    fn walk_or_create(&mut self, parent: Option<NodeId>, segment: &str) -> NodeId {
        if let Some(existing) = self.find(parent, segment) {
            return existing;
        }
        let id = self.arena.new_node(GraphNode::intermediate(segment));
        self.attach(parent, segment, id);
        id
    }

    fn find(&self, parent: Option<NodeId>, segment: &str) -> Option<NodeId> {
        match parent {
            None => self.roots.get(segment).copied(),
            Some(parent) => parent
                .children(&self.arena)
                .find(|child| self.arena[*child].get().id == segment),
        }
    }

    fn attach(&mut self, parent: Option<NodeId>, segment: &str, id: NodeId) {
        match parent {
            None => {
                self.roots.insert(segment.to_string(), id);
            }
            Some(parent) => parent.append(id, &mut self.arena),
        }
    }

    /// The root node for `key`.
    pub fn root(&self, key: &str) -> Option<Node<'_>> {
        self.roots.get(key).map(|&id| self.node(id))
    }

    /// All root nodes, in first-seen order.
    pub fn roots(&self) -> impl Iterator<Item = Node<'_>> {
        self.roots.values().map(|&id| self.node(id))
    }

    /// Follow `path` segment by segment from the roots.
    pub fn find_path<'p>(&self, path: impl IntoIterator<Item = &'p str>) -> Option<Node<'_>> {
        let mut path = path.into_iter();
        let mut node = self.root(path.next()?)?;
        for segment in path {
            node = node.child(segment)?;
        }
        Some(node)
    }

    /// The delimiter keys were split on.
    pub fn delimiter(&self) -> char {
        self.delimiter
    }

    /// Number of root nodes.
    pub fn len(&self) -> usize {
        self.roots.len()
    }

    /// Whether the graph was built from an empty map.
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Number of nodes across the whole forest.
    pub fn node_count(&self) -> usize {
        self.arena.len()
    }

    fn node(&self, id: NodeId) -> Node<'_> {
        Node { graph: self, id }
    }
}

impl fmt::Debug for KeyGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.roots().map(|node| (node.id(), node)))
            .finish()
    }
}

/// A borrowed view of one node in a [`KeyGraph`].
#[derive(Clone, Copy)]
pub struct Node<'g> {
    graph: &'g KeyGraph,
    id: NodeId,
}

impl<'g> Node<'g> {
    fn inner(&self) -> &'g GraphNode {
        self.graph.arena[self.id].get()
    }

    /// The path segment this node stands for.
    pub fn id(&self) -> &'g str {
        self.inner().id()
    }

    /// Values supplied directly for this node, if any.
    pub fn data(&self) -> Option<&'g NodeData> {
        self.inner().data()
    }

    /// Shorthand for the values in [`Node::data`].
    pub fn values(&self) -> Option<&'g [String]> {
        self.data().map(|data| data.values.as_slice())
    }

    /// The child for the next path segment.
    pub fn child(&self, segment: &str) -> Option<Node<'g>> {
        self.graph.find(Some(self.id), segment).map(|id| self.graph.node(id))
    }

    /// Children in first-seen order.
    pub fn children(&self) -> impl Iterator<Item = Node<'g>> + 'g {
        let graph = self.graph;
        self.id.children(&graph.arena).map(move |id| graph.node(id))
    }

    /// Whether any longer key went through this node.
    pub fn has_children(&self) -> bool {
        self.graph.arena[self.id].first_child().is_some()
    }

    /// The full key from the root to this node, joined with the graph's delimiter.
    pub fn path(&self) -> String {
        let mut segments: Vec<&str> = self
            .id
            .ancestors(&self.graph.arena)
            .map(|id| self.graph.arena[id].get().id.as_str())
            .collect();
        segments.reverse();
        let mut delimiter = [0; 4];
        segments.join(&*self.graph.delimiter.encode_utf8(&mut delimiter))
    }
}

impl fmt::Debug for Node<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Node");
        s.field("id", &self.id());
        if let Some(data) = self.data() {
            s.field("values", &data.values);
        }
        if self.has_children() {
            s.field("children", &DebugChildren(*self));
        }
        s.finish()
    }
}

struct DebugChildren<'g>(Node<'g>);

impl fmt::Debug for DebugChildren<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.0.children().map(|node| (node.id(), node)))
            .finish()
    }
}

/// The siblings a schema level is matched against: the roots, or the children of one node.
#[derive(Clone, Copy, Debug)]
pub(crate) enum Level<'g> {
    Roots(&'g KeyGraph),
    Children(Node<'g>),
}

impl<'g> Level<'g> {
    pub(crate) fn get(&self, key: &str) -> Option<Node<'g>> {
        match self {
            Level::Roots(graph) => graph.root(key),
            Level::Children(node) => node.child(key),
        }
    }
}
