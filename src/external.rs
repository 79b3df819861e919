// External pass adapter
//
// Wraps a caller-supplied hook object into the `Pass` contract. The hooks
// object replaces the raw user-data pointer of callback-style registration:
// the adapter never inspects its shape, it only drives the lifecycle.
//
// Lifecycle contract:
// - `construct` runs exactly once per instance, including instances
//   replicated through `clone_pass`, so construct and destruct counts
//   balance after any full lifecycle.
// - `destruct` runs exactly once per instance, when that instance is
//   dropped.
// - `clone_hooks` runs once per replicated instance beyond the first; the
//   result must be usable independently of the original.
// - `initialize` runs once per final instance before its first `run`; if it
//   fails, that instance's `run` is never invoked.

use crate::context::Context;
use crate::op::Operation;
use crate::pass::{Pass, PassExecutionState, PassFailed};
use crate::type_id::PassTypeId;

pub trait ExternalPassHooks {
    fn construct(&mut self) {}

    fn destruct(&mut self) {}

    fn initialize(&mut self, _ctx: &Context) -> Result<(), PassFailed> {
        Ok(())
    }

    /// Produces hook state for an independently replicated pass instance.
    /// Hook state that observes cloning (counters and the like) should do so
    /// through shared handles.
    fn clone_hooks(&self) -> Box<dyn ExternalPassHooks>;

    fn run(&mut self, op: &mut Operation, state: &mut PassExecutionState);
}

/// Static description of an externally defined pass class.
#[derive(Debug, Clone)]
pub struct ExternalPassSpec {
    pub type_id: PassTypeId,
    pub name: String,
    pub argument: String,
    pub description: String,
    /// `None` matches the owning pipeline's anchor.
    pub anchor: Option<String>,
    pub dependent_dialects: Vec<String>,
}

impl ExternalPassSpec {
    pub fn new(
        type_id: PassTypeId,
        name: impl Into<String>,
        argument: impl Into<String>,
    ) -> Self {
        Self {
            type_id,
            name: name.into(),
            argument: argument.into(),
            description: String::new(),
            anchor: None,
            dependent_dialects: Vec::new(),
        }
    }

    pub fn with_anchor(mut self, anchor: impl Into<String>) -> Self {
        self.anchor = Some(anchor.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_dependent_dialects<I, S>(mut self, dialects: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependent_dialects = dialects.into_iter().map(Into::into).collect();
        self
    }
}

/// Adapter turning an [`ExternalPassHooks`] object into a [`Pass`].
///
/// Creation invokes `construct`; dropping the adapter (or any clone of it)
/// invokes `destruct`. Cloning goes through `clone_hooks` and then
/// `construct` on the replica, keeping the two counts balanced.
pub struct ExternalPass {
    spec: ExternalPassSpec,
    hooks: Box<dyn ExternalPassHooks>,
}

impl ExternalPass {
    pub fn new(spec: ExternalPassSpec, mut hooks: Box<dyn ExternalPassHooks>) -> Self {
        hooks.construct();
        Self { spec, hooks }
    }

    pub fn into_pass(self) -> Box<dyn Pass> {
        Box::new(self)
    }
}

impl Pass for ExternalPass {
    fn type_id(&self) -> PassTypeId {
        self.spec.type_id
    }

    fn name(&self) -> &str {
        &self.spec.name
    }

    fn argument(&self) -> &str {
        &self.spec.argument
    }

    fn description(&self) -> &str {
        &self.spec.description
    }

    fn anchor(&self) -> Option<&str> {
        self.spec.anchor.as_deref()
    }

    fn dependent_dialects(&self) -> Vec<String> {
        self.spec.dependent_dialects.clone()
    }

    fn initialize(&mut self, ctx: &Context) -> Result<(), PassFailed> {
        self.hooks.initialize(ctx)
    }

    fn run(&mut self, op: &mut Operation, state: &mut PassExecutionState) {
        self.hooks.run(op, state);
    }

    fn clone_pass(&self) -> Box<dyn Pass> {
        Box::new(ExternalPass::new(self.spec.clone(), self.hooks.clone_hooks()))
    }
}

impl Drop for ExternalPass {
    fn drop(&mut self) {
        self.hooks.destruct();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[derive(Default)]
    struct Counters {
        constructed: Cell<usize>,
        destructed: Cell<usize>,
        cloned: Cell<usize>,
    }

    struct CountingHooks {
        counters: Rc<Counters>,
    }

    impl ExternalPassHooks for CountingHooks {
        fn construct(&mut self) {
            self.counters.constructed.set(self.counters.constructed.get() + 1);
        }

        fn destruct(&mut self) {
            self.counters.destructed.set(self.counters.destructed.get() + 1);
        }

        fn clone_hooks(&self) -> Box<dyn ExternalPassHooks> {
            self.counters.cloned.set(self.counters.cloned.get() + 1);
            Box::new(CountingHooks {
                counters: Rc::clone(&self.counters),
            })
        }

        fn run(&mut self, _op: &mut Operation, _state: &mut PassExecutionState) {}
    }

    fn spec() -> ExternalPassSpec {
        let mut allocator = crate::type_id::TypeIdAllocator::new();
        ExternalPassSpec::new(allocator.allocate(), "TestExternalPass", "test-external-pass")
    }

    #[test]
    fn construct_and_destruct_bracket_the_lifecycle() {
        let counters = Rc::new(Counters::default());
        {
            let _pass = ExternalPass::new(
                spec(),
                Box::new(CountingHooks {
                    counters: Rc::clone(&counters),
                }),
            );
            assert_eq!(counters.constructed.get(), 1);
            assert_eq!(counters.destructed.get(), 0);
        }
        assert_eq!(counters.destructed.get(), 1);
    }

    #[test]
    fn clones_construct_and_destruct_like_originals() {
        let counters = Rc::new(Counters::default());
        {
            let pass = ExternalPass::new(
                spec(),
                Box::new(CountingHooks {
                    counters: Rc::clone(&counters),
                }),
            );
            let _clone = pass.clone_pass();
            assert_eq!(counters.constructed.get(), 2);
            assert_eq!(counters.cloned.get(), 1);
        }
        // One destruct per instance keeps the counts balanced.
        assert_eq!(counters.destructed.get(), counters.constructed.get());
        assert_eq!(counters.cloned.get(), counters.constructed.get() - 1);
    }
}
