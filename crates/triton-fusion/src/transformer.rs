//! Graph-transformer driver for the fusion pass.

use std::mem;

use crate::config::TritonFusionConfig;
use crate::fusion::{self, FusionError};
use crate::graph::{AttributeValue, Graph, GraphViewer};

/// Execution provider the pass targets by default.
pub const CUDA_EXECUTION_PROVIDER: &str = "CUDAExecutionProvider";

/// Statistics reported by a transformer run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PassResult {
    pub changed: bool,
    pub partitions_fused: usize,
    pub nodes_fused: usize,
    /// Nested control-flow graphs the pass recursed into.
    pub subgraphs_visited: usize,
}

impl PassResult {
    pub fn merge(self, other: PassResult) -> PassResult {
        PassResult {
            changed: self.changed || other.changed,
            partitions_fused: self.partitions_fused + other.partitions_fused,
            nodes_fused: self.nodes_fused + other.nodes_fused,
            subgraphs_visited: self.subgraphs_visited + other.subgraphs_visited,
        }
    }
}

/// Interface implemented by whole-graph transformations.
pub trait GraphTransformer {
    fn name(&self) -> &'static str;
    fn apply(&self, graph: &mut Graph) -> Result<PassResult, FusionError>;
}

/// The fusion pass: clusters contiguous supported nodes and replaces each
/// cluster with one `TritonOp` node carrying the serialized subgraph.
pub struct TritonFusion {
    config: TritonFusionConfig,
    compatible_providers: Vec<String>,
}

impl TritonFusion {
    pub fn new(config: TritonFusionConfig) -> Self {
        TritonFusion {
            config,
            compatible_providers: vec![CUDA_EXECUTION_PROVIDER.to_string()],
        }
    }

    /// Replaces the provider set a node must be assigned to in order to
    /// qualify. An empty set accepts any assignment.
    pub fn with_compatible_providers<I, S>(mut self, providers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.compatible_providers = providers.into_iter().map(Into::into).collect();
        self
    }

    fn apply_impl(&self, graph: &mut Graph) -> Result<PassResult, FusionError> {
        let mut result = PassResult::default();

        // Nested control-flow bodies are fused before the enclosing graph.
        // The body is taken out of the attribute slot for the duration of
        // the recursive call and restored even when the call fails, so a
        // propagated error leaves the host graph structurally intact.
        for node_id in graph.node_ids() {
            let graph_attrs: Vec<String> = match graph.node(node_id) {
                Some(node) => node
                    .attributes
                    .iter()
                    .filter(|(_, value)| matches!(value, AttributeValue::Graph(_)))
                    .map(|(key, _)| key.clone())
                    .collect(),
                None => continue,
            };
            for attr in graph_attrs {
                let Some(AttributeValue::Graph(slot)) = graph
                    .node_mut(node_id)
                    .and_then(|node| node.attributes.get_mut(&attr))
                else {
                    continue;
                };
                let mut nested = mem::take(slot);
                let nested_result = self.apply_impl(&mut nested);
                if let Some(AttributeValue::Graph(slot)) = graph
                    .node_mut(node_id)
                    .and_then(|node| node.attributes.get_mut(&attr))
                {
                    *slot = nested;
                }
                result = result.merge(nested_result?);
                result.subgraphs_visited += 1;
            }
        }

        // Phase one: plan and extract without touching the graph, so any
        // failure up to here leaves it pristine.
        let partitions;
        let mut extractions = Vec::new();
        {
            let viewer = GraphViewer::build(graph)?;
            partitions =
                fusion::plan_partitions(&viewer, &self.config, &self.compatible_providers);
            for partition in &partitions {
                extractions.push(fusion::extract_subgraph(&viewer, partition)?);
            }
        }

        // Phase two: rewrite, in ascending partition id order.
        for (partition, extraction) in partitions.iter().zip(extractions) {
            fusion::fuse_partition(graph, partition, extraction)?;
            result.changed = true;
            result.partitions_fused += 1;
            result.nodes_fused += partition.nodes.len();
        }
        Ok(result)
    }
}

impl GraphTransformer for TritonFusion {
    fn name(&self) -> &'static str {
        "triton_fusion"
    }

    fn apply(&self, graph: &mut Graph) -> Result<PassResult, FusionError> {
        self.apply_impl(graph)
    }
}
