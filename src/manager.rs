// Pass managers
//
// An `OpPassManager` is an ordered pipeline scoped to one anchor operation
// kind; its elements are passes and nested sub-pipelines scoped to child
// operation kinds. A `PassManager` wraps the root pipeline and drives the
// run over an operation tree: nested pipelines match immediate child
// operations by exact name, level by level.

use std::fmt::{self, Display, Formatter};

use thiserror::Error;

use crate::context::{Context, UnknownDialect};
use crate::diag::DiagnosticSink;
use crate::op::Operation;
use crate::pass::{Pass, PassExecutionState};
use crate::registry::PassRegistry;
use crate::text::{self, PipelineError};

/// Anchor name matching every operation kind.
pub const ANY_ANCHOR: &str = "any";

#[derive(Debug, Error)]
#[error("pass '{pass}' anchored on '{pass_anchor}' cannot be added to a '{pipeline_anchor}' pipeline")]
pub struct AnchorMismatch {
    pub pass: String,
    pub pass_anchor: String,
    pub pipeline_anchor: String,
}

#[derive(Debug, Error)]
pub enum RunFailure {
    #[error("cannot run a '{anchor}' pipeline on a '{op}' operation")]
    RootAnchorMismatch { anchor: String, op: String },

    #[error(transparent)]
    UnknownDialect(#[from] UnknownDialect),

    #[error("one or more passes failed")]
    PassFailed,
}

/// One owned pass plus its per-instance initialization state. The state is
/// instance-local: cloning a slot produces a fresh, uninitialized instance.
struct PassSlot {
    pass: Box<dyn Pass>,
    initialized: bool,
    init_failed: bool,
}

impl PassSlot {
    fn new(pass: Box<dyn Pass>) -> Self {
        Self {
            pass,
            initialized: false,
            init_failed: false,
        }
    }
}

impl Clone for PassSlot {
    fn clone(&self) -> Self {
        Self::new(self.pass.clone_pass())
    }
}

enum PipelineElement {
    Pass(PassSlot),
    Nested(OpPassManager),
}

impl Clone for PipelineElement {
    fn clone(&self) -> Self {
        match self {
            PipelineElement::Pass(slot) => PipelineElement::Pass(slot.clone()),
            PipelineElement::Nested(nested) => PipelineElement::Nested(nested.clone()),
        }
    }
}

/// An ordered pipeline of passes scoped to one anchor operation kind.
#[derive(Clone)]
pub struct OpPassManager {
    anchor: String,
    elements: Vec<PipelineElement>,
}

impl OpPassManager {
    pub fn new(anchor: impl Into<String>) -> Self {
        Self {
            anchor: anchor.into(),
            elements: Vec::new(),
        }
    }

    pub fn any() -> Self {
        Self::new(ANY_ANCHOR)
    }

    /// The anchor operation kind. Immutable after creation.
    pub fn anchor(&self) -> &str {
        &self.anchor
    }

    /// Number of passes directly in this pipeline (nested pipelines not
    /// included).
    pub fn pass_count(&self) -> usize {
        self.elements
            .iter()
            .filter(|e| matches!(e, PipelineElement::Pass(_)))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Appends `pass`, transferring ownership to this pipeline. The pass's
    /// anchor filter must be empty or equal to this pipeline's anchor.
    pub fn add_pass(&mut self, pass: Box<dyn Pass>) -> Result<(), AnchorMismatch> {
        if let Some(filter) = pass.anchor() {
            if filter != self.anchor {
                return Err(AnchorMismatch {
                    pass: pass.name().to_string(),
                    pass_anchor: filter.to_string(),
                    pipeline_anchor: self.anchor.clone(),
                });
            }
        }
        self.elements.push(PipelineElement::Pass(PassSlot::new(pass)));
        Ok(())
    }

    /// Returns the nested pipeline for `anchor`, creating an empty one at
    /// the end of this pipeline if none exists. Idempotent by key.
    pub fn nested_under(&mut self, anchor: &str) -> &mut OpPassManager {
        let existing = self.elements.iter().position(
            |e| matches!(e, PipelineElement::Nested(n) if n.anchor == anchor),
        );
        let index = match existing {
            Some(index) => index,
            None => {
                self.elements
                    .push(PipelineElement::Nested(OpPassManager::new(anchor)));
                self.elements.len() - 1
            }
        };
        match &mut self.elements[index] {
            PipelineElement::Nested(nested) => nested,
            PipelineElement::Pass(_) => unreachable!(),
        }
    }

    /// Parses `text` as a pass-list scoped to this pipeline's anchor and
    /// appends the result. On error nothing is appended and all diagnostic
    /// text goes through `sink`.
    pub fn add_pipeline(
        &mut self,
        text: &str,
        registry: &PassRegistry,
        sink: &mut dyn DiagnosticSink,
    ) -> Result<(), PipelineError> {
        let mut staged = OpPassManager::new(self.anchor.clone());
        text::parse_pass_list_into(&mut staged, text, registry, sink)?;
        self.elements.extend(staged.elements);
        Ok(())
    }

    /// Appends a nested pipeline as its own scope, even when a sibling with
    /// the same anchor already exists. The textual codec uses this so that
    /// pipelines round-trip exactly as written.
    pub(crate) fn push_nested(&mut self, nested: OpPassManager) {
        self.elements.push(PipelineElement::Nested(nested));
    }

    fn collect_dependent_dialects(&self, out: &mut Vec<String>) {
        for element in &self.elements {
            match element {
                PipelineElement::Pass(slot) => out.extend(slot.pass.dependent_dialects()),
                PipelineElement::Nested(nested) => nested.collect_dependent_dialects(out),
            }
        }
    }

    /// Runs this pipeline's elements, in order, against `op` (which has
    /// already been matched to this pipeline's anchor). A failing pass stops
    /// the remaining elements for this node only.
    fn run_on(&mut self, ctx: &Context, op: &mut Operation, failed: &mut bool) {
        for element in &mut self.elements {
            match element {
                PipelineElement::Pass(slot) => {
                    if !slot.initialized {
                        slot.initialized = true;
                        slot.init_failed = slot.pass.initialize(ctx).is_err();
                    }
                    if slot.init_failed {
                        *failed = true;
                        break;
                    }
                    let mut state = PassExecutionState::new();
                    slot.pass.run(op, &mut state);
                    if state.failed() {
                        *failed = true;
                        break;
                    }
                }
                PipelineElement::Nested(nested) => {
                    nested.run_nested(ctx, op, failed);
                }
            }
        }
    }

    /// Matches this pipeline against the immediate child operations of
    /// `parent` and runs it on every match, in document order. The first
    /// matched node uses the primary pass instances; every additional node
    /// gets an independent replica of the pipeline.
    fn run_nested(&mut self, ctx: &Context, parent: &mut Operation, failed: &mut bool) {
        let mut matched_primary = false;
        for region in parent.regions_mut() {
            for block in region.blocks_mut() {
                for child in block.operations_mut() {
                    if !self.matches(child.name()) {
                        continue;
                    }
                    if !matched_primary {
                        matched_primary = true;
                        self.run_on(ctx, child, failed);
                    } else {
                        let mut replica = self.clone();
                        replica.run_on(ctx, child, failed);
                    }
                }
            }
        }
    }

    fn matches(&self, op_name: &str) -> bool {
        self.anchor == ANY_ANCHOR || self.anchor == op_name
    }
}

impl fmt::Debug for OpPassManager {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(self, f)
    }
}

impl Display for OpPassManager {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.anchor)?;
        for (i, element) in self.elements.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            match element {
                PipelineElement::Pass(slot) => {
                    f.write_str(slot.pass.argument())?;
                    let options = slot.pass.options();
                    if !options.is_empty() {
                        f.write_str("{")?;
                        for (j, option) in options.iter().enumerate() {
                            if j > 0 {
                                f.write_str(",")?;
                            }
                            write!(f, "{}={}", option.key, option.value)?;
                        }
                        f.write_str("}")?;
                    }
                }
                PipelineElement::Nested(nested) => write!(f, "{nested}")?,
            }
        }
        f.write_str(")")
    }
}

/// Top-level driver owning one root pipeline.
///
/// Re-runnable sequentially; a manager instance is not meant to be run
/// concurrently from multiple threads.
pub struct PassManager {
    root: OpPassManager,
}

impl PassManager {
    /// A pass manager rooted at the `any` anchor.
    pub fn new() -> Self {
        Self {
            root: OpPassManager::any(),
        }
    }

    /// A pass manager rooted at a specific anchor operation kind.
    pub fn on_operation(anchor: impl Into<String>) -> Self {
        Self {
            root: OpPassManager::new(anchor),
        }
    }

    pub fn as_op_pass_manager(&self) -> &OpPassManager {
        &self.root
    }

    pub fn as_op_pass_manager_mut(&mut self) -> &mut OpPassManager {
        &mut self.root
    }

    pub fn add_pass(&mut self, pass: Box<dyn Pass>) -> Result<(), AnchorMismatch> {
        self.root.add_pass(pass)
    }

    pub fn nested_under(&mut self, anchor: &str) -> &mut OpPassManager {
        self.root.nested_under(anchor)
    }

    pub fn add_pipeline(
        &mut self,
        text: &str,
        registry: &PassRegistry,
        sink: &mut dyn DiagnosticSink,
    ) -> Result<(), PipelineError> {
        self.root.add_pipeline(text, registry, sink)
    }

    /// Parses an anchored pipeline description and replaces the root
    /// pipeline with it. On error the manager is left unchanged.
    pub fn parse_pass_pipeline(
        &mut self,
        text: &str,
        registry: &PassRegistry,
        sink: &mut dyn DiagnosticSink,
    ) -> Result<(), PipelineError> {
        self.root = text::parse_pipeline(text, registry, sink)?;
        Ok(())
    }

    /// Runs the pipeline tree over `op`.
    ///
    /// Dependent dialects declared by any pass in the tree are loaded into
    /// `ctx` first. Pass failures are aggregated: a failing pass aborts the
    /// remaining passes of its own pipeline at that node, other scopes keep
    /// running, and the final result is `Err` iff anything failed. The
    /// operation tree itself is never left in a corrupted state by a failed
    /// run, though its transformation state is unspecified.
    pub fn run(&mut self, ctx: &mut Context, op: &mut Operation) -> Result<(), RunFailure> {
        if self.root.anchor() != ANY_ANCHOR && self.root.anchor() != op.name() {
            return Err(RunFailure::RootAnchorMismatch {
                anchor: self.root.anchor().to_string(),
                op: op.name().to_string(),
            });
        }

        let mut dialects = Vec::new();
        self.root.collect_dependent_dialects(&mut dialects);
        for dialect in dialects {
            ctx.load_dialect(&dialect)?;
        }

        let mut failed = false;
        self.root.run_on(ctx, op, &mut failed);
        if failed {
            Err(RunFailure::PassFailed)
        } else {
            Ok(())
        }
    }
}

impl Default for PassManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for PassManager {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.root.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passes::OpStatsPass;

    #[test]
    fn nested_under_is_idempotent_by_key() {
        let mut pm = PassManager::new();
        pm.nested_under("builtin.module")
            .add_pass(Box::new(OpStatsPass::new()))
            .unwrap();
        pm.nested_under("builtin.module")
            .add_pass(Box::new(OpStatsPass::new()))
            .unwrap();

        // Both calls landed in the same nested scope.
        assert_eq!(pm.nested_under("builtin.module").pass_count(), 2);
        assert_eq!(
            pm.to_string(),
            "any(builtin.module(print-op-stats{json=false},print-op-stats{json=false}))"
        );
    }

    #[test]
    fn add_pass_rejects_anchor_mismatch() {
        use crate::external::{ExternalPass, ExternalPassHooks, ExternalPassSpec};
        use crate::pass::PassExecutionState;

        struct NopHooks;
        impl ExternalPassHooks for NopHooks {
            fn clone_hooks(&self) -> Box<dyn ExternalPassHooks> {
                Box::new(NopHooks)
            }
            fn run(&mut self, _op: &mut Operation, _state: &mut PassExecutionState) {}
        }

        let mut allocator = crate::type_id::TypeIdAllocator::new();
        let spec = ExternalPassSpec::new(allocator.allocate(), "FuncOnly", "func-only")
            .with_anchor("func.func");
        let pass = ExternalPass::new(spec, Box::new(NopHooks)).into_pass();

        let mut module_pipeline = OpPassManager::new("builtin.module");
        let err = module_pipeline.add_pass(pass).unwrap_err();
        assert_eq!(err.pass_anchor, "func.func");
        assert_eq!(err.pipeline_anchor, "builtin.module");
        assert_eq!(module_pipeline.pass_count(), 0);
    }

    #[test]
    fn display_renders_nested_scopes_depth_first() {
        let mut pm = PassManager::on_operation("any");
        let funcs = pm.nested_under("builtin.module").nested_under("func.func");
        funcs.add_pass(Box::new(OpStatsPass::new())).unwrap();

        assert_eq!(
            pm.to_string(),
            "any(builtin.module(func.func(print-op-stats{json=false})))"
        );
        assert_eq!(
            pm.nested_under("builtin.module").to_string(),
            "builtin.module(func.func(print-op-stats{json=false}))"
        );
        assert_eq!(
            pm.nested_under("builtin.module")
                .nested_under("func.func")
                .to_string(),
            "func.func(print-op-stats{json=false})"
        );
    }
}
