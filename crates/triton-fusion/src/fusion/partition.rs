use std::collections::HashSet;

use crate::config::TritonFusionConfig;
use crate::graph::{ArgId, Graph, NodeId};

/// A contiguous cluster of supported nodes being grown toward fusion.
#[derive(Debug, Clone, Default)]
pub(crate) struct Partition {
    /// Member nodes in the topological order they were admitted.
    pub nodes: Vec<NodeId>,
    /// Values produced by member nodes with at least one unvisited
    /// consumer.
    pub outputs: HashSet<ArgId>,
    /// Poison set: values produced by nodes that touched the partition but
    /// were not admitted. A node consuming one of these must never be
    /// merged, since that would close a cycle through the outside path.
    pub dependencies: HashSet<ArgId>,
    /// Outgoing consumer references from member nodes not yet visited by
    /// the sweep. The partition is sealed when this reaches zero.
    pub output_ref_count: usize,
}

impl Partition {
    pub fn singleton(
        node: NodeId,
        outputs: impl IntoIterator<Item = ArgId>,
        output_ref_count: usize,
    ) -> Self {
        Partition {
            nodes: vec![node],
            outputs: outputs.into_iter().collect(),
            dependencies: HashSet::new(),
            output_ref_count,
        }
    }

    /// Folds `other` into `self`. The caller guarantees `self` was born
    /// before `other` and that no path outside the pair connects them, so
    /// the concatenated node list stays topologically ordered.
    pub fn merge_from(&mut self, other: Partition) {
        self.nodes.extend(other.nodes);
        self.outputs.extend(other.outputs);
        self.dependencies.extend(other.dependencies);
        self.output_ref_count += other.output_ref_count;
    }

    /// A sealed partition is worth fusing once it holds two non-no-op
    /// nodes; singletons and pure reshape chains are not.
    pub fn is_valid(&self, graph: &Graph, config: &TritonFusionConfig) -> bool {
        let mut count = 0usize;
        for node in self.nodes.iter().filter_map(|&id| graph.node(id)) {
            if !config.is_no_op(node) {
                count += 1;
                if count >= 2 {
                    return true;
                }
            }
        }
        false
    }
}
