//! Host graph model: nodes, interned value handles and a read-only
//! topological view.

mod base;
mod node;
mod viewer;

pub use base::{Graph, GraphError};
pub use node::{ArgId, AttributeValue, ElemType, Node, NodeId, TensorData};
pub use viewer::{GraphViewer, OutputEdge};
