use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{ArgId, Node, NodeId, TensorData};

/// Errors raised while validating or mutating a graph.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("graph `{graph}` contains a cycle")]
    Cycle { graph: String },
    #[error("value `{arg}` is produced by more than one node")]
    DuplicateProducer { arg: String },
    #[error("node `{node}` consumes value `{arg}` which has no producer, initializer or graph input")]
    DanglingValue { node: String, arg: String },
    #[error("graph output `{arg}` is not defined anywhere in the graph")]
    UnknownOutput { arg: String },
    #[error("initializer `{name}` is declared but has no tensor data")]
    MissingInitializer { name: String },
    #[error("no live node with id {0}")]
    UnknownNode(u32),
}

/// Mutable host graph: a tombstoned node slab plus interned value names.
///
/// Values (NodeArgs) are interned once per name and referenced by [`ArgId`]
/// everywhere else, so identity comparisons are integer comparisons.
/// Serialization is fully deterministic: every container is either ordered
/// by construction or a `BTreeMap`/`BTreeSet`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    name: String,
    nodes: Vec<Option<Node>>,
    arg_names: Vec<String>,
    arg_ids: BTreeMap<String, ArgId>,
    /// Names declared to be initializers. A name may be declared without
    /// materialized tensor data (external or outer-scope data).
    initializer_names: BTreeSet<String>,
    tensors: BTreeMap<String, TensorData>,
    inputs: Vec<ArgId>,
    outputs: Vec<ArgId>,
    name_counter: u64,
}

impl Graph {
    pub fn new(name: impl Into<String>) -> Self {
        Graph {
            name: name.into(),
            ..Graph::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Interns `name`, returning the existing id when already known.
    pub fn arg(&mut self, name: &str) -> ArgId {
        if let Some(&id) = self.arg_ids.get(name) {
            return id;
        }
        let id = ArgId(self.arg_names.len() as u32);
        self.arg_names.push(name.to_string());
        self.arg_ids.insert(name.to_string(), id);
        id
    }

    pub fn find_arg(&self, name: &str) -> Option<ArgId> {
        self.arg_ids.get(name).copied()
    }

    pub fn arg_name(&self, id: ArgId) -> &str {
        &self.arg_names[id.0 as usize]
    }

    pub fn add_node(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Some(node));
        id
    }

    /// Clones `node` (owned by `src`) into this graph, re-interning its
    /// value names. Attributes, including nested graphs, are copied as-is.
    pub fn import_node(&mut self, src: &Graph, node: &Node) -> NodeId {
        let inputs = node
            .inputs
            .iter()
            .map(|&arg| self.arg(src.arg_name(arg)))
            .collect();
        let outputs = node
            .outputs
            .iter()
            .map(|&arg| self.arg(src.arg_name(arg)))
            .collect();
        self.add_node(Node {
            name: node.name.clone(),
            op_type: node.op_type.clone(),
            domain: node.domain.clone(),
            since_version: node.since_version,
            inputs,
            outputs,
            attributes: node.attributes.clone(),
            execution_provider: node.execution_provider.clone(),
        })
    }

    /// Removes a node, leaving a tombstone so other ids stay stable. The
    /// edges it fed disappear with it; consumers keep referencing the same
    /// values by id.
    pub fn remove_node(&mut self, id: NodeId) -> Result<Node, GraphError> {
        self.nodes
            .get_mut(id.0 as usize)
            .and_then(Option::take)
            .ok_or(GraphError::UnknownNode(id.0))
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0 as usize).and_then(Option::as_ref)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0 as usize).and_then(Option::as_mut)
    }

    /// Live nodes in id order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(idx, slot)| slot.as_ref().map(|node| (NodeId(idx as u32), node)))
    }

    pub fn node_ids(&self) -> Vec<NodeId> {
        self.nodes().map(|(id, _)| id).collect()
    }

    pub fn node_count(&self) -> usize {
        self.nodes().count()
    }

    /// Produces a node name that no live or removed node has used.
    pub fn generate_node_name(&mut self, base: &str) -> String {
        loop {
            let candidate = format!("{base}_{}", self.name_counter);
            self.name_counter += 1;
            if self.nodes.iter().flatten().all(|node| node.name != candidate) {
                return candidate;
            }
        }
    }

    /// Declares `name` as an initializer and stores its tensor data.
    pub fn add_initializer(&mut self, name: &str, tensor: TensorData) -> ArgId {
        let id = self.arg(name);
        self.initializer_names.insert(name.to_string());
        self.tensors.insert(name.to_string(), tensor);
        id
    }

    /// Declares `name` as an initializer without materialized data, the
    /// shape external or outer-scope initializers take.
    pub fn mark_initializer(&mut self, name: &str) -> ArgId {
        let id = self.arg(name);
        self.initializer_names.insert(name.to_string());
        id
    }

    pub fn is_initializer(&self, name: &str) -> bool {
        self.initializer_names.contains(name)
    }

    pub fn initializer(&self, name: &str) -> Option<&TensorData> {
        self.tensors.get(name)
    }

    pub fn set_inputs(&mut self, inputs: Vec<ArgId>) {
        self.inputs = inputs;
    }

    pub fn set_outputs(&mut self, outputs: Vec<ArgId>) {
        self.outputs = outputs;
    }

    pub fn inputs(&self) -> &[ArgId] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[ArgId] {
        &self.outputs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_is_stable() {
        let mut graph = Graph::new("g");
        let a = graph.arg("a");
        let b = graph.arg("b");
        assert_ne!(a, b);
        assert_eq!(graph.arg("a"), a);
        assert_eq!(graph.arg_name(b), "b");
        assert_eq!(graph.find_arg("c"), None);
    }

    #[test]
    fn removal_leaves_tombstone() {
        let mut graph = Graph::new("g");
        let node = test_node(&mut graph, "n0");
        let first = graph.add_node(node);
        let node = test_node(&mut graph, "n1");
        let second = graph.add_node(node);
        let removed = graph.remove_node(first).unwrap();
        assert_eq!(removed.name, "n0");
        assert!(graph.node(first).is_none());
        assert_eq!(graph.node(second).unwrap().name, "n1");
        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.remove_node(first), Err(GraphError::UnknownNode(0)));
    }

    #[test]
    fn generated_names_never_collide() {
        let mut graph = Graph::new("g");
        let node = test_node(&mut graph, "fused_0");
        graph.add_node(node);
        let name = graph.generate_node_name("fused");
        assert_ne!(name, "fused_0");
        assert_ne!(graph.generate_node_name("fused"), name);
    }

    fn test_node(graph: &mut Graph, name: &str) -> Node {
        let input = graph.arg(&format!("{name}_in"));
        let output = graph.arg(&format!("{name}_out"));
        Node {
            name: name.to_string(),
            op_type: "Identity".to_string(),
            domain: String::new(),
            since_version: 14,
            inputs: vec![input],
            outputs: vec![output],
            attributes: Default::default(),
            execution_provider: None,
        }
    }
}
