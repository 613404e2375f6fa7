use std::collections::{BTreeSet, HashMap};

use smallvec::SmallVec;

use super::{ArgId, Graph, GraphError, NodeId};

/// A single outgoing edge: `arg` produced by the source node, consumed by
/// one input slot of `consumer`. A consumer reading the same value through
/// two slots contributes two edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputEdge {
    pub arg: ArgId,
    pub consumer: NodeId,
}

/// Read-only structural index over a graph snapshot.
///
/// Construction validates the graph: every consumed value must be produced
/// exactly once or come from an initializer or formal input, and the node
/// dependency relation must be acyclic. The topological order is
/// deterministic, with ties broken by ascending node id.
pub struct GraphViewer<'a> {
    graph: &'a Graph,
    topo: Vec<NodeId>,
    consumers: HashMap<ArgId, SmallVec<[NodeId; 4]>>,
    producers: HashMap<ArgId, NodeId>,
}

impl<'a> GraphViewer<'a> {
    pub fn build(graph: &'a Graph) -> Result<Self, GraphError> {
        let mut producers: HashMap<ArgId, NodeId> = HashMap::new();
        for (id, node) in graph.nodes() {
            for &output in &node.outputs {
                if producers.insert(output, id).is_some() {
                    return Err(GraphError::DuplicateProducer {
                        arg: graph.arg_name(output).to_string(),
                    });
                }
            }
        }

        let mut consumers: HashMap<ArgId, SmallVec<[NodeId; 4]>> = HashMap::new();
        for (id, node) in graph.nodes() {
            for &input in &node.inputs {
                let defined = producers.contains_key(&input)
                    || graph.is_initializer(graph.arg_name(input))
                    || graph.inputs().contains(&input);
                if !defined {
                    return Err(GraphError::DanglingValue {
                        node: node.name.clone(),
                        arg: graph.arg_name(input).to_string(),
                    });
                }
                consumers.entry(input).or_default().push(id);
            }
        }

        for &output in graph.outputs() {
            let defined = producers.contains_key(&output)
                || graph.is_initializer(graph.arg_name(output))
                || graph.inputs().contains(&output);
            if !defined {
                return Err(GraphError::UnknownOutput {
                    arg: graph.arg_name(output).to_string(),
                });
            }
        }

        let topo = topological_order(graph, &producers)?;
        Ok(GraphViewer {
            graph,
            topo,
            consumers,
            producers,
        })
    }

    pub fn graph(&self) -> &Graph {
        self.graph
    }

    pub fn nodes_in_topological_order(&self) -> &[NodeId] {
        &self.topo
    }

    pub fn producer(&self, arg: ArgId) -> Option<NodeId> {
        self.producers.get(&arg).copied()
    }

    /// Outgoing node-to-node edges of `id`, in output slot order.
    pub fn output_edges(&self, id: NodeId) -> Vec<OutputEdge> {
        let Some(node) = self.graph.node(id) else {
            return Vec::new();
        };
        let mut edges = Vec::new();
        for &output in &node.outputs {
            if let Some(consumers) = self.consumers.get(&output) {
                edges.extend(consumers.iter().map(|&consumer| OutputEdge {
                    arg: output,
                    consumer,
                }));
            }
        }
        edges
    }

    pub fn output_edge_count(&self, id: NodeId) -> usize {
        let Some(node) = self.graph.node(id) else {
            return 0;
        };
        node.outputs
            .iter()
            .map(|output| self.consumers.get(output).map_or(0, SmallVec::len))
            .sum()
    }

    /// Consumers of `id`'s outputs that a topological sweep must account
    /// for before the producer can be considered fully consumed: node
    /// edges plus references from the graph's formal outputs. Formal
    /// outputs are never visited, so a count inflated by them keeps the
    /// producing partition open for the whole sweep.
    pub fn output_consumer_count(&self, id: NodeId) -> usize {
        let Some(node) = self.graph.node(id) else {
            return 0;
        };
        let formal_refs = node
            .outputs
            .iter()
            .map(|output| {
                self.graph
                    .outputs()
                    .iter()
                    .filter(|&graph_output| graph_output == output)
                    .count()
            })
            .sum::<usize>();
        self.output_edge_count(id) + formal_refs
    }
}

fn topological_order(
    graph: &Graph,
    producers: &HashMap<ArgId, NodeId>,
) -> Result<Vec<NodeId>, GraphError> {
    let mut indegree: HashMap<NodeId, usize> = HashMap::new();
    let mut dependents: HashMap<NodeId, SmallVec<[NodeId; 4]>> = HashMap::new();
    for (id, node) in graph.nodes() {
        let mut count = 0usize;
        for &input in &node.inputs {
            if let Some(&producer) = producers.get(&input) {
                count += 1;
                dependents.entry(producer).or_default().push(id);
            }
        }
        indegree.insert(id, count);
    }

    let mut ready: BTreeSet<NodeId> = indegree
        .iter()
        .filter(|(_, &count)| count == 0)
        .map(|(&id, _)| id)
        .collect();
    let mut order = Vec::with_capacity(indegree.len());
    while let Some(&id) = ready.iter().next() {
        ready.remove(&id);
        order.push(id);
        if let Some(consumers) = dependents.get(&id) {
            for &consumer in consumers {
                let count = indegree
                    .get_mut(&consumer)
                    .expect("dependent must be a live node");
                *count -= 1;
                if *count == 0 {
                    ready.insert(consumer);
                }
            }
        }
    }

    if order.len() != graph.node_count() {
        return Err(GraphError::Cycle {
            graph: graph.name().to_string(),
        });
    }
    Ok(order)
}
