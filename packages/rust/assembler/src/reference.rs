//! Placeholder for a command referenced by name.

use std::sync::{Arc, OnceLock};

use chainworks_core::{Command, Context, Filter, Outcome, Propagation};
use chainworks_shared::{ChainError, Result};

/// Stands in for a named command until the assembler binds it.
///
/// References are bound once, when the assembly run finishes, so they may
/// name commands defined later in the stream. After binding, the reference
/// executes (and post-processes) exactly as its target does.
pub struct CommandRef {
    /// Catalog key in scope where the reference appeared.
    scope: String,
    target_name: String,
    target: OnceLock<Arc<dyn Command>>,
}

impl CommandRef {
    pub(crate) fn new(scope: impl Into<String>, target_name: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            target_name: target_name.into(),
            target: OnceLock::new(),
        }
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// The referenced name as written, possibly `catalog.name`.
    pub fn target_name(&self) -> &str {
        &self.target_name
    }

    pub fn target(&self) -> Option<&Arc<dyn Command>> {
        self.target.get()
    }

    pub fn is_bound(&self) -> bool {
        self.target.get().is_some()
    }

    pub(crate) fn bind(&self, target: Arc<dyn Command>) {
        // A second bind keeps the first target.
        let _ = self.target.set(target);
    }

    fn bound(&self) -> Result<&Arc<dyn Command>> {
        self.target.get().ok_or_else(|| {
            ChainError::configuration(format!("unresolved reference '{}'", self.target_name))
        })
    }
}

impl Command for CommandRef {
    fn execute(&self, context: &mut Context) -> Result<Outcome> {
        self.bound()?.execute(context)
    }

    fn as_filter(&self) -> Option<&dyn Filter> {
        match self.target.get() {
            Some(target) if target.as_filter().is_some() => Some(self),
            _ => None,
        }
    }

    fn describe(&self) -> &str {
        &self.target_name
    }

    fn members(&self) -> &[Arc<dyn Command>] {
        self.target.get().map(std::slice::from_ref).unwrap_or(&[])
    }
}

impl Filter for CommandRef {
    fn postprocess(&self, context: &mut Context, error: Option<&ChainError>) -> Result<Propagation> {
        match self.bound()?.as_filter() {
            Some(filter) => filter.postprocess(context, error),
            None => Ok(Propagation::Continue),
        }
    }
}

impl std::fmt::Debug for CommandRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandRef")
            .field("scope", &self.scope)
            .field("target", &self.target_name)
            .field("bound", &self.is_bound())
            .finish()
    }
}
