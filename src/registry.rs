// Pass registry
//
// An explicit registry object maps argument tokens to pass factories and
// pipeline aliases. It is passed by reference into parse/add-pipeline calls
// instead of living in ambient global state, which keeps parsing reentrant
// and testable.

use indexmap::IndexMap;
use thiserror::Error;

use crate::manager::{AnchorMismatch, OpPassManager};
use crate::pass::Pass;

#[derive(Debug, Error)]
#[error("'{0}' is already registered as a pass or pass pipeline")]
pub struct DuplicateArgument(pub String);

pub(crate) type PassFactory = Box<dyn Fn() -> Box<dyn Pass>>;
pub(crate) type PipelineBuilder = Box<dyn Fn(&mut OpPassManager) -> Result<(), AnchorMismatch>>;

pub(crate) enum RegistryEntry {
    Pass(PassFactory),
    Pipeline(PipelineBuilder),
}

/// Maps argument tokens to registered passes and pipeline aliases,
/// preserving registration order.
#[derive(Default)]
pub struct PassRegistry {
    entries: IndexMap<String, RegistryEntry>,
}

impl PassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a pass factory under the pass's argument token.
    pub fn register_pass<P, F>(
        &mut self,
        argument: impl Into<String>,
        factory: F,
    ) -> Result<(), DuplicateArgument>
    where
        P: Pass + 'static,
        F: Fn() -> P + 'static,
    {
        self.insert(
            argument.into(),
            RegistryEntry::Pass(Box::new(move || Box::new(factory()))),
        )
    }

    /// Registers a pipeline alias: a token that expands to a sequence of
    /// passes appended to the target pipeline.
    pub fn register_pipeline<F>(
        &mut self,
        argument: impl Into<String>,
        builder: F,
    ) -> Result<(), DuplicateArgument>
    where
        F: Fn(&mut OpPassManager) -> Result<(), AnchorMismatch> + 'static,
    {
        self.insert(argument.into(), RegistryEntry::Pipeline(Box::new(builder)))
    }

    pub fn is_registered(&self, argument: &str) -> bool {
        self.entries.contains_key(argument)
    }

    pub fn arguments(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub(crate) fn get(&self, argument: &str) -> Option<&RegistryEntry> {
        self.entries.get(argument)
    }

    fn insert(&mut self, argument: String, entry: RegistryEntry) -> Result<(), DuplicateArgument> {
        if self.entries.contains_key(&argument) {
            return Err(DuplicateArgument(argument));
        }
        self.entries.insert(argument, entry);
        Ok(())
    }
}
