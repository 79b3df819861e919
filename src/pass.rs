// The pass contract
//
// A pass is a named unit of transformation bound to an optional
// anchor filter. Passes are owned by the pipeline they are added to and are
// cloned (deep copy) when a nested scope is replicated across repeated
// anchor nodes.

use thiserror::Error;

use crate::context::Context;
use crate::op::Operation;
use crate::type_id::PassTypeId;

/// Returned by `initialize` (and used internally) to mark a pass-level
/// failure without carrying a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("pass signaled failure")]
pub struct PassFailed;

#[derive(Debug, Error)]
pub enum OptionError {
    #[error("unknown option '{key}'")]
    Unknown { key: String },

    #[error("invalid value '{value}' for option '{key}'")]
    InvalidValue { key: String, value: String },
}

/// One printable pass option. The printer renders every option, defaulted
/// or not, as `key=value` in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassOption {
    pub key: String,
    pub value: String,
}

impl PassOption {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Per-invocation execution state handed to [`Pass::run`]. Calling
/// [`signal_failure`](PassExecutionState::signal_failure) is the only way a
/// pass reports failure from `run`.
#[derive(Debug, Default)]
pub struct PassExecutionState {
    failed: bool,
}

impl PassExecutionState {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub fn signal_failure(&mut self) {
        self.failed = true;
    }

    pub fn failed(&self) -> bool {
        self.failed
    }
}

pub trait Pass {
    /// Identity token distinguishing this pass class.
    fn type_id(&self) -> PassTypeId;

    /// Human-readable display name.
    fn name(&self) -> &str;

    /// Command-line-style argument token used in pipeline text.
    fn argument(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    /// Anchor operation-name filter. `None` matches the owning pipeline's
    /// anchor, whatever it is.
    fn anchor(&self) -> Option<&str> {
        None
    }

    /// Dialects that must be loaded into the context before this pass runs.
    fn dependent_dialects(&self) -> Vec<String> {
        Vec::new()
    }

    /// Current option values in declaration order.
    fn options(&self) -> Vec<PassOption> {
        Vec::new()
    }

    /// Applies one parsed `key=value` option.
    fn set_option(&mut self, key: &str, _value: &str) -> Result<(), OptionError> {
        Err(OptionError::Unknown {
            key: key.to_string(),
        })
    }

    /// Invoked once per pass instance before its first `run`. A failure
    /// here keeps this instance's `run` from ever being invoked and fails
    /// the enclosing pipeline execution.
    fn initialize(&mut self, _ctx: &Context) -> Result<(), PassFailed> {
        Ok(())
    }

    /// Transforms `op`. Failure is reported solely through
    /// [`PassExecutionState::signal_failure`].
    fn run(&mut self, op: &mut Operation, state: &mut PassExecutionState);

    /// Deep-copies this pass for an independently replicated pipeline
    /// instance.
    fn clone_pass(&self) -> Box<dyn Pass>;
}
