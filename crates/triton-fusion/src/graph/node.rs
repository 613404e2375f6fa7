use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::Graph;

/// Interned identity for a NodeArg, a tensor-valued edge in the graph.
///
/// Two handles refer to the same value iff their ids are equal; the owning
/// [`Graph`] maps ids back to names for serialization. The fusion pass
/// treats these as opaque keys and never dereferences tensor data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ArgId(pub u32);

/// Stable identifier for a node within its graph.
///
/// Node removal leaves a tombstone in the owning slab, so ids held by a
/// partition stay valid across unrelated removals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

/// Scalar element type carried by initializer tensors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ElemType {
    F32,
    F16,
    I64,
    I32,
    Bool,
}

/// Dense tensor payload backing a graph initializer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TensorData {
    pub elem_type: ElemType,
    pub dims: Vec<i64>,
    pub bytes: Vec<u8>,
}

/// Attribute payload attached to a node.
///
/// `Graph` attributes carry nested control-flow bodies; the fusion pass
/// recurses into them before processing the enclosing graph. `Bytes` is
/// what the fused node stores its serialized subgraph in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    Int(i64),
    Ints(Vec<i64>),
    Float(f32),
    Str(String),
    Bytes(Vec<u8>),
    Graph(Graph),
}

/// A single operator invocation in the host graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    pub op_type: String,
    pub domain: String,
    /// Opset version the operator resolves to in this graph.
    pub since_version: i64,
    pub inputs: Vec<ArgId>,
    pub outputs: Vec<ArgId>,
    pub attributes: BTreeMap<String, AttributeValue>,
    /// Execution provider the node has been assigned to, when placed.
    pub execution_provider: Option<String>,
}

impl Node {
    pub fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }
}
