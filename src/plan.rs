//! Plan module: check a template graph before any note is built from it.

use crate::graph::{GraphError, NodeGraph, NodeId};
use crate::invariant_ppt::{assert_invariant, PLAN_SOUNDNESS};
use std::collections::VecDeque;

/// A template graph checked against an output node.
///
/// Compiling walks the whole graph in dependency order, so a plan exists only
/// for templates whose every reference resolves and that contain no cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    /// Node whose value is the audible signal.
    pub output: NodeId,
    /// Number of nodes the template holds.
    pub node_count: usize,
    /// Release time after which a released note is culled.
    pub longest_release: f64,
}

impl Plan {
    /// Create a plan from a graph.
    pub fn compile(graph: &NodeGraph, output: NodeId) -> Result<Self, GraphError> {
        if !graph.contains(output) {
            return Err(GraphError::NodeNotFound(output));
        }

        let order = topo_sort(graph)?;
        assert_invariant(
            PLAN_SOUNDNESS,
            order.len() == graph.len(),
            "Plan orders every node exactly once",
            Some("compile"),
        );

        Ok(Self {
            output,
            node_count: order.len(),
            longest_release: graph.longest_release(),
        })
    }
}

/// Topological sort of nodes (Kahn). Dangling references are reported as
/// missing nodes.
fn topo_sort(graph: &NodeGraph) -> Result<Vec<NodeId>, GraphError> {
    let slots = graph.slot_count();
    let mut in_degree = vec![0usize; slots];
    let mut readers: Vec<Vec<NodeId>> = vec![vec![]; slots];

    for (id, node) in graph.iter() {
        for input in node.referenced_nodes() {
            if !graph.contains(input) {
                return Err(GraphError::NodeNotFound(input));
            }
            readers[input.0].push(id);
            in_degree[id.0] += 1;
        }
    }

    let mut queue: VecDeque<NodeId> = graph
        .iter()
        .map(|(id, _)| id)
        .filter(|id| in_degree[id.0] == 0)
        .collect();

    let mut order = Vec::with_capacity(graph.len());
    while let Some(node) = queue.pop_front() {
        order.push(node);
        for &reader in &readers[node.0] {
            in_degree[reader.0] -= 1;
            if in_degree[reader.0] == 0 {
                queue.push_back(reader);
            }
        }
    }

    if order.len() == graph.len() {
        Ok(order)
    } else {
        let stuck = graph
            .iter()
            .map(|(id, _)| id)
            .find(|id| in_degree[id.0] > 0)
            .unwrap_or(NodeId(0));
        Err(GraphError::CycleDetected(stuck))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::SignalNode;
    use crate::node::SignalParameter::{Constant, Input, MidiInput};
    use crate::oscillator::Waveform;

    fn patch() -> (NodeGraph, NodeId, NodeId, NodeId) {
        let mut graph = NodeGraph::new();
        let env = graph.add_node(SignalNode::envelope(0.1, 0.2, 0.5, 0.4)).unwrap();
        let osc = graph
            .add_node(SignalNode::generator(Waveform::Sine, MidiInput, Input(env), Constant(0.0)))
            .unwrap();
        let unused = graph
            .add_node(SignalNode::generator(
                Waveform::Square,
                Constant(2.0),
                Constant(1.0),
                Constant(0.0),
            ))
            .unwrap();
        (graph, env, osc, unused)
    }

    #[test]
    fn plan_stability() {
        let (graph, _, osc, _) = patch();
        let plan1 = Plan::compile(&graph, osc).unwrap();
        let plan2 = Plan::compile(&graph, osc).unwrap();
        assert_eq!(plan1, plan2);
    }

    #[test]
    fn topo_sort_orders_inputs_first() {
        let (graph, env, osc, _) = patch();
        let order = topo_sort(&graph).unwrap();
        let pos = |id| order.iter().position(|n| *n == id).unwrap();
        assert!(pos(env) < pos(osc));
        assert_eq!(order.len(), 3);
    }

    #[test]
    fn plan_covers_unused_nodes() {
        let (graph, _, osc, _) = patch();
        let plan = Plan::compile(&graph, osc).unwrap();
        assert_eq!(plan.output, osc);
        assert_eq!(plan.node_count, 3);
        assert_eq!(plan.longest_release, 0.4);
    }

    #[test]
    fn plan_requires_output_node() {
        let (graph, _, _, _) = patch();
        assert_eq!(
            Plan::compile(&graph, NodeId(42)),
            Err(GraphError::NodeNotFound(NodeId(42)))
        );
    }

    #[test]
    fn plan_reports_dangling_reference() {
        let (mut graph, env, osc, _) = patch();
        graph.remove_node(env).unwrap();
        assert_eq!(Plan::compile(&graph, osc), Err(GraphError::NodeNotFound(env)));
    }
}
