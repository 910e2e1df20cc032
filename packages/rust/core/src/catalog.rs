//! Named registry of commands.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use chainworks_shared::{ChainError, Result};
use tracing::debug;

use crate::command::Command;

/// Maps unique names to commands (chains included).
///
/// Registering a name twice is rejected; use [`Catalog::replace`] to
/// overwrite. Names enumerate in sorted order.
#[derive(Default)]
pub struct Catalog {
    name: String,
    commands: RwLock<BTreeMap<String, Arc<dyn Command>>>,
}

impl Catalog {
    /// Create an empty catalog. `name` is used in error messages only; the
    /// default catalog uses the empty name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            commands: RwLock::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Register `command` under `name`. Fails with
    /// [`ChainError::DuplicateName`] if the name is taken.
    pub fn register(&self, name: impl Into<String>, command: Arc<dyn Command>) -> Result<()> {
        let name = name.into();
        let mut commands = self.commands.write().unwrap_or_else(PoisonError::into_inner);
        if commands.contains_key(&name) {
            return Err(ChainError::duplicate(&self.name, name));
        }
        debug!(catalog = %self.name, %name, "registered command");
        commands.insert(name, command);
        Ok(())
    }

    /// Register `command` under `name`, returning any command it displaced.
    pub fn replace(&self, name: impl Into<String>, command: Arc<dyn Command>) -> Option<Arc<dyn Command>> {
        let name = name.into();
        debug!(catalog = %self.name, %name, "replaced command");
        self.commands
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name, command)
    }

    /// Look up `name`, failing with [`ChainError::NotFound`] when absent.
    pub fn lookup(&self, name: &str) -> Result<Arc<dyn Command>> {
        self.get(name)
            .ok_or_else(|| ChainError::not_found(&self.name, name))
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Command>> {
        self.commands
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.commands
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    /// Snapshot of the registered names, sorted. Later registrations are not
    /// reflected in a snapshot already taken.
    pub fn names(&self) -> Vec<String> {
        self.commands
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.commands.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for Catalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Catalog")
            .field("name", &self.name)
            .field("commands", &self.names())
            .finish()
    }
}
