//! Replacement of a partition by a single opaque fused node.

use std::collections::BTreeMap;

use crate::graph::{AttributeValue, Graph, GraphError, Node, NodeId};

use super::{Extraction, FusionError, Partition, ONNX_STRING_ATTR, TRITON_OP_DOMAIN, TRITON_OP_TYPE};

/// Inserts the fused node for `partition` and removes the originals. The
/// fused node reuses the partition's boundary value ids, so consumers keep
/// their references untouched and the topological invariants of the host
/// graph hold afterwards.
pub(crate) fn fuse_partition(
    graph: &mut Graph,
    partition: &Partition,
    extraction: Extraction,
) -> Result<NodeId, FusionError> {
    let first = *partition
        .nodes
        .first()
        .expect("finalized partitions are never empty");
    let execution_provider = graph
        .node(first)
        .ok_or(GraphError::UnknownNode(first.0))?
        .execution_provider
        .clone();

    let name = graph.generate_node_name(TRITON_OP_TYPE);
    let mut attributes = BTreeMap::new();
    attributes.insert(
        ONNX_STRING_ATTR.to_string(),
        AttributeValue::Bytes(extraction.bytes),
    );
    let fused = graph.add_node(Node {
        name,
        op_type: TRITON_OP_TYPE.to_string(),
        domain: TRITON_OP_DOMAIN.to_string(),
        since_version: 1,
        inputs: extraction.inputs,
        outputs: extraction.outputs,
        attributes,
        execution_provider,
    });

    for &node_id in &partition.nodes {
        graph.remove_node(node_id)?;
    }
    Ok(fused)
}
