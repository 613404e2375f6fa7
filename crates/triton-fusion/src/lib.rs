//! Fusion of contiguous supported operator subgraphs into single opaque
//! kernel nodes compiled just-in-time by Triton.
//!
//! The pass sweeps a host graph once in topological order, growing
//! partitions of adjacent supported nodes while keeping the induced
//! partition graph acyclic, then replaces every finalized partition with
//! one `TritonOp` node carrying the serialized subgraph as an attribute.
//!
//! The crate is a library transform: it owns no scheduling, performs no
//! I/O, and assumes exclusive mutable access to the graph for the
//! duration of [`GraphTransformer::apply`].

pub mod config;
pub mod fusion;
pub mod graph;
pub mod registry;
pub mod transformer;

pub use config::{ConfigError, OpInfo, TritonFusionConfig};
pub use fusion::{FusionError, SubModel, ONNX_STRING_ATTR, TRITON_OP_DOMAIN, TRITON_OP_TYPE};
pub use graph::{
    ArgId, AttributeValue, ElemType, Graph, GraphError, GraphViewer, Node, NodeId, TensorData,
};
pub use transformer::{GraphTransformer, PassResult, TritonFusion, CUDA_EXECUTION_PROVIDER};
