//! Single-sweep clustering of supported nodes and their replacement with
//! opaque fused kernel nodes.

mod extract;
mod partition;
mod planner;
mod rewrite;

pub use extract::SubModel;
pub(crate) use extract::{extract_subgraph, Extraction};
pub(crate) use partition::Partition;
pub(crate) use planner::plan_partitions;
pub(crate) use rewrite::fuse_partition;

use thiserror::Error;

use crate::graph::GraphError;

/// Op type of the opaque node that replaces a fused partition.
pub const TRITON_OP_TYPE: &str = "TritonOp";
/// Reserved domain the fused node lives in.
pub const TRITON_OP_DOMAIN: &str = "com.microsoft";
/// Name of the attribute carrying the serialized subgraph.
pub const ONNX_STRING_ATTR: &str = "onnx_string";

#[derive(Debug, Error)]
pub enum FusionError {
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error("fused subgraph serialization failed: {0}")]
    Serialize(#[from] bincode::Error),
}
