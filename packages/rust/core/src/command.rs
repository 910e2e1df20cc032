//! The command and filter execution contract.

use std::any::Any;
use std::sync::Arc;

use chainworks_shared::{ChainError, Result};

use crate::context::Context;

/// Result of a forward `execute` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Processing is not complete; the enclosing chain runs the next command.
    Continue,
    /// Processing is complete; the enclosing chain stops its forward pass.
    Processed,
}

impl Outcome {
    pub fn is_processed(self) -> bool {
        matches!(self, Self::Processed)
    }
}

impl From<bool> for Outcome {
    fn from(processed: bool) -> Self {
        if processed { Self::Processed } else { Self::Continue }
    }
}

impl From<Outcome> for bool {
    fn from(outcome: Outcome) -> Self {
        outcome.is_processed()
    }
}

/// Result of a filter's `postprocess` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Propagation {
    /// Any in-flight error keeps propagating to the caller.
    Continue,
    /// The in-flight error, if any, is considered handled.
    Stop,
}

/// Access to the concrete type behind a `dyn Command`.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A single executable processing step.
///
/// Configuration is set before the command is shared and is read-only
/// afterwards, so `execute` takes `&self`.
pub trait Command: AsAny + Send + Sync {
    /// Run this step against `context`.
    fn execute(&self, context: &mut Context) -> Result<Outcome>;

    /// This command viewed as a [`Filter`], if it is one.
    ///
    /// Filters override this to return `Some(self)`; chains use it to decide
    /// which members take part in the unwind.
    fn as_filter(&self) -> Option<&dyn Filter> {
        None
    }

    /// Label used in trace output.
    fn describe(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Commands this one runs directly, for wiring checks. Composites
    /// override this; leaf commands have none.
    fn members(&self) -> &[Arc<dyn Command>] {
        &[]
    }
}

/// A command that also post-processes during a chain's unwind.
pub trait Filter: Command {
    /// Called once per chain execution that invoked this filter's `execute`,
    /// in reverse order of invocation, with the error in flight (if any).
    fn postprocess(&self, context: &mut Context, error: Option<&ChainError>) -> Result<Propagation>;
}

impl dyn Command {
    /// Downcast to the concrete command type.
    pub fn downcast_ref<T: Command>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    /// Whether the concrete command type is `T`.
    pub fn is<T: Command>(&self) -> bool {
        self.as_any().is::<T>()
    }
}

impl std::fmt::Debug for dyn Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Command").field(&self.describe()).finish()
    }
}
