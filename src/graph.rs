//! Graph module: per-note signal graphs that are acyclic by construction.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use crate::invariant_ppt::{assert_invariant, GRAPH_LEGALITY, GRAPH_REJECTS_INVALID};
use crate::node::SignalNode;
use std::fmt;

/// Unique identifier for a node; also its slot index in the graph arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Errors raised while building or evaluating a graph.
#[derive(Debug, Clone, PartialEq)]
pub enum GraphError {
    /// A node was referenced or queried but is not in the graph.
    NodeNotFound(NodeId),
    /// Inserting the node would make it (transitively) depend on itself.
    CycleDetected(NodeId),
    /// A node parameter is out of range.
    InvalidParameter(&'static str),
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphError::NodeNotFound(id) => write!(f, "node {} not found", id),
            GraphError::CycleDetected(id) => write!(f, "node {} would form a cycle", id),
            GraphError::InvalidParameter(what) => write!(f, "invalid parameter: {}", what),
        }
    }
}

impl std::error::Error for GraphError {}

/// Arena of signal nodes addressed by [`NodeId`].
///
/// Every `Input` reference of an inserted node must point at a node that is
/// already present, and no insertion may close a cycle, so evaluation always
/// terminates. Removing a node can leave dangling references behind; those
/// surface as [`GraphError::NodeNotFound`] when evaluated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeGraph {
    nodes: Vec<Option<SignalNode>>,
}

impl NodeGraph {
    /// Create a new empty graph.
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    /// Add a node in the next free slot at the end of the arena.
    pub fn add_node(&mut self, node: SignalNode) -> Result<NodeId, GraphError> {
        let id = NodeId(self.nodes.len());
        self.insert(id, node)?;
        Ok(id)
    }

    /// Place a node at `id`, returning the node it replaced.
    pub fn insert(
        &mut self,
        id: NodeId,
        node: SignalNode,
    ) -> Result<Option<SignalNode>, GraphError> {
        node.validate()?;

        for input in node.referenced_nodes() {
            if input == id {
                assert_invariant(
                    GRAPH_REJECTS_INVALID,
                    true,
                    "Self reference, rejecting",
                    Some("insert"),
                );
                return Err(GraphError::CycleDetected(id));
            }
            if !self.contains(input) {
                return Err(GraphError::NodeNotFound(input));
            }
        }

        // Dangling references left by `remove_node` may already point at `id`,
        // so even an empty slot can close a cycle.
        if self.would_create_cycle(id, &node) {
            assert_invariant(
                GRAPH_REJECTS_INVALID,
                true,
                "Cycle detected, rejecting",
                Some("insert"),
            );
            return Err(GraphError::CycleDetected(id));
        }

        if id.0 >= self.nodes.len() {
            self.nodes.resize_with(id.0 + 1, || None);
        }
        let previous = self.nodes[id.0].replace(node);

        assert_invariant(
            GRAPH_LEGALITY,
            true,
            "Node inserted, graph remains acyclic",
            Some("insert"),
        );

        Ok(previous)
    }

    /// Remove a node. Nodes referencing it are kept and will fail to evaluate.
    pub fn remove_node(&mut self, id: NodeId) -> Result<SignalNode, GraphError> {
        self.nodes
            .get_mut(id.0)
            .and_then(Option::take)
            .ok_or(GraphError::NodeNotFound(id))
    }

    /// Look up a node.
    #[inline]
    pub fn get(&self, id: NodeId) -> Option<&SignalNode> {
        self.nodes.get(id.0).and_then(Option::as_ref)
    }

    /// Whether a node exists at `id`.
    #[inline]
    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    /// Number of nodes present.
    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_some()).count()
    }

    /// Whether the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of arena slots, including empty ones.
    pub fn slot_count(&self) -> usize {
        self.nodes.len()
    }

    /// Present nodes in id order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &SignalNode)> {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(i, n)| n.as_ref().map(|n| (NodeId(i), n)))
    }

    /// Longest envelope release in the graph, or 0 when it has no envelopes.
    pub fn longest_release(&self) -> f64 {
        self.iter()
            .filter_map(|(_, node)| node.release_time())
            .fold(0.0, f64::max)
    }

    pub(crate) fn slots(&self) -> impl Iterator<Item = Option<&SignalNode>> {
        self.nodes.iter().map(Option::as_ref)
    }

    pub(crate) fn slots_mut(&mut self) -> impl Iterator<Item = Option<&mut SignalNode>> {
        self.nodes.iter_mut().map(Option::as_mut)
    }

    /// Whether placing `node` at `id` lets one of its inputs reach `id`.
    fn would_create_cycle(&self, id: NodeId, node: &SignalNode) -> bool {
        let mut visited = vec![false; self.nodes.len()];
        node.referenced_nodes()
            .into_iter()
            .any(|input| self.dfs(input, id, &mut visited))
    }

    fn dfs(&self, current: NodeId, target: NodeId, visited: &mut [bool]) -> bool {
        if current == target {
            return true;
        }
        if visited.get(current.0).copied().unwrap_or(true) {
            return false;
        }
        visited[current.0] = true;
        match self.get(current) {
            Some(node) => node
                .referenced_nodes()
                .into_iter()
                .any(|next| self.dfs(next, target, visited)),
            None => false,
        }
    }
}
