//! DSL module: builder API for note templates with named nodes.

use crate::graph::{GraphError, NodeGraph, NodeId};
use crate::invariant_ppt::{assert_invariant, PATCH_NAMES_RESOLVED};
use crate::node::{SignalNode, SignalParameter};
use crate::oscillator::Waveform;
use std::collections::HashMap;
use std::fmt;

/// Handle to a node in the builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeHandle(pub NodeId);

impl From<NodeHandle> for SignalParameter {
    fn from(handle: NodeHandle) -> Self {
        SignalParameter::Input(handle.0)
    }
}

/// The patch builder.
///
/// ```
/// use voicegraph::dsl::PatchBuilder;
/// use voicegraph::{SignalParameter, Waveform};
///
/// let mut patch = PatchBuilder::new();
/// let env = patch.envelope("env", 0.01, 0.1, 0.7, 0.3).unwrap();
/// let osc = patch
///     .oscillator(
///         "osc",
///         Waveform::Sawtooth,
///         SignalParameter::MidiInput,
///         env.into(),
///         SignalParameter::Constant(0.0),
///     )
///     .unwrap();
/// let (graph, output) = patch.build("osc").unwrap();
/// assert_eq!(output, osc.0);
/// assert_eq!(graph.len(), 2);
/// ```
#[derive(Debug, Default)]
pub struct PatchBuilder {
    graph: NodeGraph,
    node_names: HashMap<String, NodeId>,
}

impl PatchBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            graph: NodeGraph::new(),
            node_names: HashMap::new(),
        }
    }

    /// Add an anonymous node.
    pub fn node(&mut self, node: SignalNode) -> Result<NodeHandle, DslError> {
        let id = self.graph.add_node(node)?;
        Ok(NodeHandle(id))
    }

    /// Add a named node.
    pub fn node_named(&mut self, name: &str, node: SignalNode) -> Result<NodeHandle, DslError> {
        if self.node_names.contains_key(name) {
            return Err(DslError::DuplicateName(name.to_string()));
        }
        let handle = self.node(node)?;
        self.node_names.insert(name.to_string(), handle.0);
        Ok(handle)
    }

    pub fn oscillator(
        &mut self,
        name: &str,
        waveform: Waveform,
        frequency: SignalParameter,
        amplitude: SignalParameter,
        bias: SignalParameter,
    ) -> Result<NodeHandle, DslError> {
        self.node_named(name, SignalNode::generator(waveform, frequency, amplitude, bias))
    }

    pub fn mixer(
        &mut self,
        name: &str,
        master_amplitude: SignalParameter,
        inputs: Vec<(SignalParameter, SignalParameter)>,
    ) -> Result<NodeHandle, DslError> {
        self.node_named(name, SignalNode::mixer(master_amplitude, inputs))
    }

    pub fn envelope(
        &mut self,
        name: &str,
        attack: f64,
        decay: f64,
        sustain: f64,
        release: f64,
    ) -> Result<NodeHandle, DslError> {
        self.node_named(name, SignalNode::envelope(attack, decay, sustain, release))
    }

    /// Parameter reading the named node's output.
    pub fn input(&self, name: &str) -> Result<SignalParameter, DslError> {
        self.handle(name).map(SignalParameter::from)
    }

    pub fn handle(&self, name: &str) -> Result<NodeHandle, DslError> {
        self.node_names
            .get(name)
            .copied()
            .map(NodeHandle)
            .ok_or_else(|| DslError::MissingNode(name.to_string()))
    }

    /// Build the graph, resolving the named output node.
    pub fn build(self, output: &str) -> Result<(NodeGraph, NodeId), DslError> {
        let handle = self.handle(output)?;
        assert_invariant(
            PATCH_NAMES_RESOLVED,
            self.graph.contains(handle.0),
            "Named output resolves to a node",
            Some("build"),
        );
        Ok((self.graph, handle.0))
    }
}

/// DSL-specific errors.
#[derive(Debug, Clone, PartialEq)]
pub enum DslError {
    Graph(GraphError),
    MissingNode(String),
    DuplicateName(String),
}

impl From<GraphError> for DslError {
    fn from(e: GraphError) -> Self {
        DslError::Graph(e)
    }
}

impl fmt::Display for DslError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DslError::Graph(e) => write!(f, "{}", e),
            DslError::MissingNode(name) => write!(f, "no node named '{}'", name),
            DslError::DuplicateName(name) => write!(f, "node name '{}' already used", name),
        }
    }
}

impl std::error::Error for DslError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DslError::Graph(e) => Some(e),
            _ => None,
        }
    }
}
