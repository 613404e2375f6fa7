//! Extraction of a finalized partition into a self-contained sub-model.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::graph::{ArgId, Graph, GraphError, GraphViewer};

use super::{FusionError, Partition};

/// A model wrapping one extracted main graph. Serialized into the fused
/// node's `onnx_string` attribute and handed to the kernel compiler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubModel {
    pub graph: Graph,
}

impl SubModel {
    pub fn to_bytes(&self) -> Result<Vec<u8>, FusionError> {
        Ok(bincode::serialize(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FusionError> {
        Ok(bincode::deserialize(bytes)?)
    }
}

/// Boundary and serialized body of one partition, expressed in host-graph
/// value ids so the rewriter can wire the replacement node.
pub(crate) struct Extraction {
    /// External inputs in first-encountered order.
    pub inputs: Vec<ArgId>,
    /// External outputs in first-produced order.
    pub outputs: Vec<ArgId>,
    pub bytes: Vec<u8>,
}

/// Builds the partition's sub-model: member nodes in stored order, host
/// initializers copied in by value, and formal inputs/outputs derived from
/// the values crossing the partition boundary.
pub(crate) fn extract_subgraph(
    viewer: &GraphViewer<'_>,
    partition: &Partition,
) -> Result<Extraction, FusionError> {
    let graph = viewer.graph();
    let mut sub = Graph::new("triton_subgraph");

    let mut captured_initializers: HashSet<ArgId> = HashSet::new();
    let mut external_inputs: Vec<ArgId> = Vec::new();
    // Values produced so far with consumers not yet seen inside the
    // partition; whatever survives the walk is consumed outside.
    let mut output_ref_counts: HashMap<ArgId, usize> = HashMap::new();
    let mut produced_order: Vec<ArgId> = Vec::new();

    for &node_id in &partition.nodes {
        let node = graph
            .node(node_id)
            .ok_or(GraphError::UnknownNode(node_id.0))?;
        sub.import_node(graph, node);

        for &input in &node.inputs {
            let name = graph.arg_name(input);
            if graph.is_initializer(name) {
                if captured_initializers.insert(input) {
                    let tensor = graph
                        .initializer(name)
                        .ok_or_else(|| GraphError::MissingInitializer {
                            name: name.to_string(),
                        })?;
                    sub.add_initializer(name, tensor.clone());
                }
                continue;
            }

            match output_ref_counts.get_mut(&input) {
                Some(count) => {
                    *count -= 1;
                    if *count == 0 {
                        output_ref_counts.remove(&input);
                    }
                }
                None => {
                    if !external_inputs.contains(&input) {
                        external_inputs.push(input);
                    }
                }
            }
        }

        for edge in viewer.output_edges(node_id) {
            let count = output_ref_counts.entry(edge.arg).or_insert(0);
            if *count == 0 && !produced_order.contains(&edge.arg) {
                produced_order.push(edge.arg);
            }
            *count += 1;
        }
    }

    let formal_inputs = external_inputs
        .iter()
        .map(|&arg| sub.arg(graph.arg_name(arg)))
        .collect();
    sub.set_inputs(formal_inputs);

    let external_outputs: Vec<ArgId> = produced_order
        .into_iter()
        .filter(|arg| output_ref_counts.contains_key(arg))
        .collect();
    let formal_outputs = external_outputs
        .iter()
        .map(|&arg| sub.arg(graph.arg_name(arg)))
        .collect();
    sub.set_outputs(formal_outputs);

    let bytes = SubModel { graph: sub }.to_bytes()?;
    Ok(Extraction {
        inputs: external_inputs,
        outputs: external_outputs,
        bytes,
    })
}
