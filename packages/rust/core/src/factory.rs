//! Registry of catalogs, keyed by catalog name.
//!
//! A [`CatalogFactory`] is constructed explicitly and passed to whoever
//! needs it; there is no process-global instance. Entries live until
//! [`CatalogFactory::clear`] or until the factory is dropped.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use chainworks_shared::{ChainError, Result};
use tracing::debug;

use crate::catalog::Catalog;
use crate::command::Command;

/// Separator between catalog and command in a qualified command id.
pub const QUALIFIER: char = '.';

#[derive(Debug)]
struct Catalogs {
    default: Arc<Catalog>,
    named: BTreeMap<String, Arc<Catalog>>,
}

/// Maps catalog names to catalogs, with one default catalog.
///
/// The default catalog is reached by `None`, by `""`, and by the optional
/// alias given to [`CatalogFactory::with_default_name`].
#[derive(Debug)]
pub struct CatalogFactory {
    default_name: Option<String>,
    catalogs: RwLock<Catalogs>,
}

impl Default for CatalogFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogFactory {
    pub fn new() -> Self {
        Self {
            default_name: None,
            catalogs: RwLock::new(Catalogs {
                default: Arc::new(Catalog::new("")),
                named: BTreeMap::new(),
            }),
        }
    }

    /// A factory whose default catalog is also reachable as `alias`.
    /// An empty alias is the same as [`CatalogFactory::new`].
    pub fn with_default_name(alias: impl Into<String>) -> Self {
        let alias = alias.into();
        let mut factory = Self::new();
        if !alias.is_empty() {
            factory.default_name = Some(alias);
        }
        factory
    }

    /// Name under which the default catalog is also reachable, if any.
    pub fn default_name(&self) -> Option<&str> {
        self.default_name.as_deref()
    }

    /// Whether `name` refers to the default catalog.
    pub fn is_default(&self, name: Option<&str>) -> bool {
        match name {
            None | Some("") => true,
            Some(name) => self.default_name.as_deref() == Some(name),
        }
    }

    /// The catalog called `name`, created empty on first reference.
    pub fn catalog(&self, name: Option<&str>) -> Arc<Catalog> {
        if let Some(existing) = self.get(name) {
            return existing;
        }

        let name = name.unwrap_or_default();
        let mut catalogs = self.catalogs.write().unwrap_or_else(PoisonError::into_inner);
        catalogs
            .named
            .entry(name.to_string())
            .or_insert_with(|| {
                debug!(catalog = name, "created catalog");
                Arc::new(Catalog::new(name))
            })
            .clone()
    }

    /// The catalog called `name`, if it exists. The default catalog always
    /// exists.
    pub fn get(&self, name: Option<&str>) -> Option<Arc<Catalog>> {
        let catalogs = self.catalogs.read().unwrap_or_else(PoisonError::into_inner);
        if self.is_default(name) {
            return Some(catalogs.default.clone());
        }
        name.and_then(|n| catalogs.named.get(n).cloned())
    }

    /// Install `catalog` under `name`, replacing any existing catalog.
    pub fn set_catalog(&self, name: Option<&str>, catalog: Arc<Catalog>) {
        let mut catalogs = self.catalogs.write().unwrap_or_else(PoisonError::into_inner);
        if self.is_default(name) {
            catalogs.default = catalog;
        } else if let Some(name) = name {
            catalogs.named.insert(name.to_string(), catalog);
        }
    }

    /// Explicitly named catalogs, sorted. The default catalog is not listed
    /// unless it was installed under its alias.
    pub fn catalog_names(&self) -> Vec<String> {
        self.catalogs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .named
            .keys()
            .cloned()
            .collect()
    }

    /// Look up a qualified command id of the form `catalog.command`.
    ///
    /// An id without a qualifier is looked up in the default catalog, and so
    /// is an id whose prefix names no existing catalog.
    pub fn lookup_command(&self, id: &str) -> Result<Arc<dyn Command>> {
        if let Some((catalog, name)) = id.split_once(QUALIFIER) {
            if let Some(catalog) = self.get(Some(catalog)) {
                return catalog.lookup(name);
            }
        }
        self.get(None)
            .ok_or_else(|| ChainError::not_found("", id))?
            .lookup(id)
    }

    /// Forget every catalog, including the contents of the default one.
    pub fn clear(&self) {
        let mut catalogs = self.catalogs.write().unwrap_or_else(PoisonError::into_inner);
        catalogs.named.clear();
        catalogs.default = Arc::new(Catalog::new(""));
        debug!("cleared catalog factory");
    }
}
