// Built-in passes

mod op_stats;

pub use op_stats::OpStatsPass;

use crate::registry::{DuplicateArgument, PassRegistry};

/// Registers every built-in pass with `registry`.
pub fn register_builtin_passes(registry: &mut PassRegistry) -> Result<(), DuplicateArgument> {
    registry.register_pass("print-op-stats", OpStatsPass::new)
}
