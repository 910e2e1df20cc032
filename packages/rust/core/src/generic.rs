//! General-purpose commands usable from any definition document.

use std::sync::{Arc, Weak};

use chainworks_shared::{ChainError, Result};
use serde_json::Value;
use tracing::{debug, instrument};

use crate::command::{Command, Filter, Outcome, Propagation};
use crate::context::Context;
use crate::factory::CatalogFactory;

// ---------------------------------------------------------------------------
// CopyCommand
// ---------------------------------------------------------------------------

/// Copies a context value, or a literal, to another key.
#[derive(Debug, Clone, Default)]
pub struct CopyCommand {
    /// Source key. Ignored when `value` is set.
    pub from_key: Option<String>,
    /// Destination key.
    pub to_key: String,
    /// Literal string to store instead of copying.
    pub value: Option<String>,
}

impl Command for CopyCommand {
    fn execute(&self, context: &mut Context) -> Result<Outcome> {
        let value = match (&self.value, &self.from_key) {
            (Some(literal), _) => Some(Value::String(literal.clone())),
            (None, Some(from)) => context.get(from).cloned(),
            (None, None) => None,
        };

        match value {
            Some(value) => {
                context.insert(self.to_key.clone(), value);
            }
            None => {
                context.remove(&self.to_key);
            }
        }
        Ok(Outcome::Continue)
    }

    fn describe(&self) -> &str {
        "copy"
    }
}

// ---------------------------------------------------------------------------
// RemoveCommand
// ---------------------------------------------------------------------------

/// Removes a key from the context.
#[derive(Debug, Clone, Default)]
pub struct RemoveCommand {
    pub from_key: String,
}

impl Command for RemoveCommand {
    fn execute(&self, context: &mut Context) -> Result<Outcome> {
        context.remove(&self.from_key);
        Ok(Outcome::Continue)
    }

    fn describe(&self) -> &str {
        "remove"
    }
}

// ---------------------------------------------------------------------------
// LookupCommand
// ---------------------------------------------------------------------------

/// Looks up another command in a catalog at execution time and delegates to it.
///
/// The command name is `name`, or the string stored under `name_key` in the
/// context. When the target is a filter, `postprocess` is delegated as well.
#[derive(Debug, Clone, Default)]
pub struct LookupCommand {
    pub factory: Weak<CatalogFactory>,
    /// Catalog to search; `None` means the default catalog.
    pub catalog: Option<String>,
    pub name: Option<String>,
    pub name_key: Option<String>,
    /// Return `Continue` instead of failing when the target is missing.
    pub optional: bool,
    /// Return `Continue` regardless of the target's outcome.
    pub ignore_execute_result: bool,
    /// Return `Continue` regardless of the target's postprocess result.
    pub ignore_postprocess_result: bool,
}

impl LookupCommand {
    pub fn new(factory: &Arc<CatalogFactory>) -> Self {
        Self {
            factory: Arc::downgrade(factory),
            ..Self::default()
        }
    }

    fn resolve(&self, context: &Context) -> Result<Option<Arc<dyn Command>>> {
        let name = match (&self.name, &self.name_key) {
            (Some(name), _) => name.clone(),
            (None, Some(key)) => context
                .get_str(key)
                .map(str::to_string)
                .ok_or_else(|| {
                    ChainError::configuration(format!("no command name under context key '{key}'"))
                })?,
            (None, None) => {
                return Err(ChainError::configuration(
                    "lookup command needs either `name` or `name_key`",
                ));
            }
        };

        let factory = self
            .factory
            .upgrade()
            .ok_or_else(|| ChainError::configuration("catalog factory is no longer available"))?;
        let catalog = self.catalog.as_deref();
        let found = factory.get(catalog).and_then(|c| c.get(&name));

        match found {
            Some(command) => Ok(Some(command)),
            None if self.optional => {
                debug!(catalog = catalog.unwrap_or_default(), %name, "optional lookup found nothing");
                Ok(None)
            }
            None => Err(ChainError::not_found(catalog.unwrap_or_default(), name)),
        }
    }
}

impl Command for LookupCommand {
    #[instrument(name = "lookup.execute", skip_all, fields(catalog = self.catalog.as_deref().unwrap_or_default()))]
    fn execute(&self, context: &mut Context) -> Result<Outcome> {
        let Some(command) = self.resolve(context)? else {
            return Ok(Outcome::Continue);
        };

        let outcome = command.execute(context)?;
        if self.ignore_execute_result {
            Ok(Outcome::Continue)
        } else {
            Ok(outcome)
        }
    }

    fn as_filter(&self) -> Option<&dyn Filter> {
        Some(self)
    }

    fn describe(&self) -> &str {
        "lookup"
    }
}

impl Filter for LookupCommand {
    fn postprocess(&self, context: &mut Context, error: Option<&ChainError>) -> Result<Propagation> {
        let Some(command) = self.resolve(context)? else {
            return Ok(Propagation::Continue);
        };
        let Some(filter) = command.as_filter() else {
            return Ok(Propagation::Continue);
        };

        let propagation = filter.postprocess(context, error)?;
        if self.ignore_postprocess_result {
            Ok(Propagation::Continue)
        } else {
            Ok(propagation)
        }
    }
}
