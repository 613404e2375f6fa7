//! Construct-on-demand registry of per-op kernel builders.
//!
//! Backend integrations keep a process-wide table mapping operator names to
//! builder constructors. The table is immutable and built lazily on first
//! lookup; builders themselves are constructed per call.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;

/// Builds the backend-specific kernel for a single operator type.
pub trait OpBuilder: Send + Sync {
    fn op_type(&self) -> &str;
    /// True for ops the backend lowers to pure data movement.
    fn is_layout_only(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone, Copy)]
enum BuilderKind {
    Elementwise,
    Reduction,
    Layout,
}

struct ElementwiseOpBuilder {
    op_type: &'static str,
}

impl OpBuilder for ElementwiseOpBuilder {
    fn op_type(&self) -> &str {
        self.op_type
    }
}

struct ReductionOpBuilder {
    op_type: &'static str,
}

impl OpBuilder for ReductionOpBuilder {
    fn op_type(&self) -> &str {
        self.op_type
    }
}

struct LayoutOpBuilder {
    op_type: &'static str,
}

impl OpBuilder for LayoutOpBuilder {
    fn op_type(&self) -> &str {
        self.op_type
    }

    fn is_layout_only(&self) -> bool {
        true
    }
}

static OP_BUILDERS: Lazy<BTreeMap<&'static str, BuilderKind>> = Lazy::new(|| {
    let mut table = BTreeMap::new();
    for op_type in [
        "Add", "Sub", "Mul", "Div", "Pow", "Sqrt", "Exp", "Cast", "Where", "Dropout",
    ] {
        table.insert(op_type, BuilderKind::Elementwise);
    }
    for op_type in ["ReduceSum", "ReduceMean", "ReduceMax", "Softmax", "LayerNormalization"] {
        table.insert(op_type, BuilderKind::Reduction);
    }
    for op_type in ["Reshape", "Squeeze", "Unsqueeze", "Transpose"] {
        table.insert(op_type, BuilderKind::Layout);
    }
    table
});

/// Constructs the builder registered for `op_type`, if any.
pub fn builder_for(op_type: &str) -> Option<Box<dyn OpBuilder>> {
    let (&registered, kind) = OP_BUILDERS.get_key_value(op_type)?;
    Some(match kind {
        BuilderKind::Elementwise => Box::new(ElementwiseOpBuilder {
            op_type: registered,
        }),
        BuilderKind::Reduction => Box::new(ReductionOpBuilder {
            op_type: registered,
        }),
        BuilderKind::Layout => Box::new(LayoutOpBuilder {
            op_type: registered,
        }),
    })
}

/// Operator names with a registered builder, in lexicographic order.
pub fn registered_op_types() -> impl Iterator<Item = &'static str> {
    OP_BUILDERS.keys().copied()
}
