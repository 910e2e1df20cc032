//! Ordered composite of commands.
//!
//! A [`Chain`] runs its members in order until one reports
//! [`Outcome::Processed`], one fails, or the members run out. Filters that
//! were reached are then post-processed in reverse order:
//!
//! - a failing `postprocess` replaces the in-flight error (last write wins);
//! - a `postprocess` returning [`Propagation::Stop`] clears it, but the
//!   remaining filters are still unwound.
//!
//! If an error survives the unwind it is returned unchanged; otherwise the
//! forward result is.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chainworks_shared::{ChainError, Result};
use tracing::{debug, instrument, trace};

use crate::command::{Command, Filter, Outcome, Propagation};
use crate::context::Context;

/// Lifecycle of a single chain execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainState {
    NotStarted,
    Running,
    /// Every member returned `Continue`.
    Completed,
    /// A member returned `Processed`.
    ShortCircuited,
    /// A member raised an error.
    Failed,
}

/// An ordered sequence of commands that is itself a command.
///
/// The same command instance may appear more than once. The sequence is
/// frozen by the first call to [`Command::execute`].
#[derive(Default)]
pub struct Chain {
    commands: Vec<Arc<dyn Command>>,
    frozen: AtomicBool,
}

impl Chain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a chain from an ordered list of members.
    pub fn with_commands(commands: impl IntoIterator<Item = Arc<dyn Command>>) -> Self {
        Self {
            commands: commands.into_iter().collect(),
            frozen: AtomicBool::new(false),
        }
    }

    /// Append a member. Fails with [`ChainError::Frozen`] once the chain has
    /// been executed.
    pub fn add_command(&mut self, command: Arc<dyn Command>) -> Result<()> {
        if self.is_frozen() {
            return Err(ChainError::Frozen);
        }
        self.commands.push(command);
        Ok(())
    }

    pub fn commands(&self) -> &[Arc<dyn Command>] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen.load(Ordering::Acquire)
    }

    fn unwind(
        &self,
        context: &mut Context,
        executed_filters: &[&dyn Filter],
        mut saved_error: Option<ChainError>,
    ) -> Option<ChainError> {
        for filter in executed_filters.iter().rev() {
            match filter.postprocess(context, saved_error.as_ref()) {
                Ok(Propagation::Stop) => {
                    if saved_error.take().is_some() {
                        debug!(filter = filter.describe(), "error handled by filter");
                    }
                }
                Ok(Propagation::Continue) => {}
                Err(err) => {
                    debug!(filter = filter.describe(), error = %err, "postprocess failed");
                    saved_error = Some(err);
                }
            }
        }
        saved_error
    }
}

impl std::fmt::Debug for Chain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let members: Vec<&str> = self.commands.iter().map(|c| c.describe()).collect();
        f.debug_struct("Chain")
            .field("commands", &members)
            .field("frozen", &self.is_frozen())
            .finish()
    }
}

impl Command for Chain {
    #[instrument(name = "chain.execute", skip_all, fields(members = self.commands.len()))]
    fn execute(&self, context: &mut Context) -> Result<Outcome> {
        self.frozen.store(true, Ordering::Release);

        let mut state = ChainState::Running;
        let mut executed_filters: Vec<&dyn Filter> = Vec::new();
        let mut saved_error = None;
        let mut result = Outcome::Continue;

        for (position, command) in self.commands.iter().enumerate() {
            if let Some(filter) = command.as_filter() {
                executed_filters.push(filter);
            }

            match command.execute(context) {
                Ok(Outcome::Processed) => {
                    state = ChainState::ShortCircuited;
                    result = Outcome::Processed;
                    debug!(position, command = command.describe(), "chain short-circuited");
                    break;
                }
                Ok(Outcome::Continue) => {
                    trace!(position, command = command.describe(), "command continued");
                }
                Err(err) => {
                    state = ChainState::Failed;
                    debug!(position, command = command.describe(), error = %err, "command failed");
                    saved_error = Some(err);
                    break;
                }
            }
        }

        if state == ChainState::Running {
            state = ChainState::Completed;
        }
        trace!(?state, filters = executed_filters.len(), "unwinding");

        match self.unwind(context, &executed_filters, saved_error) {
            Some(err) => Err(err),
            None => Ok(result),
        }
    }

    fn describe(&self) -> &str {
        "chain"
    }

    fn members(&self) -> &[Arc<dyn Command>] {
        &self.commands
    }
}
