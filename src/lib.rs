//! Anchored pass pipelines over a nested operation tree.
//!
//! Passes are organized into pipelines scoped to anchor operation kinds,
//! with nested sub-pipelines following the structural nesting of the tree.
//! Pipelines can be described textually, parsed against an explicit pass
//! registry, and printed back to the identical text.

pub mod context;
pub mod diag;
pub mod external;
pub mod manager;
pub mod op;
pub mod pass;
pub mod passes;
pub mod registry;
pub mod text;
pub mod type_id;

pub use context::{Context, DialectRegistry, UnknownDialect};
pub use diag::{CollectedDiagnostics, DiagnosticSink, NullSink};
pub use external::{ExternalPass, ExternalPassHooks, ExternalPassSpec};
pub use manager::{AnchorMismatch, OpPassManager, PassManager, RunFailure, ANY_ANCHOR};
pub use op::{Block, Operation, Region};
pub use pass::{OptionError, Pass, PassExecutionState, PassFailed, PassOption};
pub use passes::{register_builtin_passes, OpStatsPass};
pub use registry::{DuplicateArgument, PassRegistry};
pub use text::{parse_pipeline, PipelineError};
pub use type_id::{PassTypeId, TypeIdAllocator};
