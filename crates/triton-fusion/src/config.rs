//! Declarative catalog of operators the Triton compiler can consume.

use std::collections::{BTreeMap, BTreeSet};

use serde::Deserialize;
use thiserror::Error;

use crate::graph::Node;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid fusion config: {0}")]
    Json(#[from] serde_json::Error),
}

/// Per-operator entry of the catalog.
#[derive(Debug, Clone, Deserialize)]
pub struct OpInfo {
    pub domain: String,
    /// Opset versions the kernel generator handles.
    pub versions: BTreeSet<i64>,
    /// Behaviorally trivial ops (reshape-like) that do not count toward
    /// fusion-worthiness.
    pub is_no_op: bool,
    /// Attribute predicate payload, reserved for a future check.
    pub conditions: serde_json::Value,
}

/// Catalog of supported operators plus the module-level symbol fused
/// nodes will reference. An empty catalog turns the pass into a no-op.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TritonFusionConfig {
    #[serde(default)]
    pub ops: BTreeMap<String, OpInfo>,
    #[serde(default)]
    pub initializer: String,
}

impl TritonFusionConfig {
    /// Parses the JSON catalog. Every declared op must carry all four
    /// `OpInfo` fields; a missing field is a construction failure.
    pub fn from_json(src: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(src)?)
    }

    /// True iff the catalog has an entry whose (name, domain, version)
    /// triple matches the node.
    pub fn is_supported(&self, node: &Node) -> bool {
        match self.ops.get(&node.op_type) {
            Some(info) => info.domain == node.domain && info.versions.contains(&node.since_version),
            None => false,
        }
    }

    pub fn is_no_op(&self, node: &Node) -> bool {
        self.ops
            .get(&node.op_type)
            .is_some_and(|info| info.is_no_op)
    }
}
