//! The assembly directive stream.

use std::collections::BTreeMap;

/// Property name to raw string value, applied through registered setters.
pub type Properties = BTreeMap<String, String>;

/// Where a command definition gets its command from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandSource {
    /// Instantiate a registered type (or alias).
    Implementation(String),
    /// Refer to another command by name, optionally `catalog.name`.
    Reference(String),
}

/// One step of a definition, delivered in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// Start a catalog. `None` or an empty name is the default catalog.
    BeginCatalog { name: Option<String> },
    EndCatalog,
    /// Define a command. Registered under `id` at top level, appended to the
    /// enclosing chain otherwise.
    DefineCommand {
        id: Option<String>,
        source: CommandSource,
        properties: Properties,
    },
    /// Open a chain. Members follow until the matching [`Directive::EndChain`].
    BeginChain {
        id: Option<String>,
        implementation: Option<String>,
        properties: Properties,
    },
    EndChain,
    /// Set a property on the innermost open chain.
    SetProperty { name: String, value: String },
    /// Make `alias` usable as a type reference for the rest of the run.
    Alias { alias: String, implementation: String },
}

impl Directive {
    /// Command built from a registered type (or alias), without properties.
    pub fn command(id: Option<&str>, implementation: &str) -> Self {
        Self::DefineCommand {
            id: id.map(str::to_string),
            source: CommandSource::Implementation(implementation.to_string()),
            properties: Properties::new(),
        }
    }

    /// Reference to another command, resolved when the run finishes.
    pub fn reference(id: Option<&str>, target: &str) -> Self {
        Self::DefineCommand {
            id: id.map(str::to_string),
            source: CommandSource::Reference(target.to_string()),
            properties: Properties::new(),
        }
    }

    /// Open a plain chain.
    pub fn chain(id: Option<&str>) -> Self {
        Self::BeginChain {
            id: id.map(str::to_string),
            implementation: None,
            properties: Properties::new(),
        }
    }

    pub fn catalog(name: Option<&str>) -> Self {
        Self::BeginCatalog {
            name: name.map(str::to_string),
        }
    }

    /// Add a property to a command or chain definition.
    ///
    /// Only `DefineCommand` and `BeginChain` carry properties. On any other
    /// directive the property is dropped, and debug builds panic.
    pub fn with(mut self, name: &str, value: &str) -> Self {
        match &mut self {
            Self::DefineCommand { properties, .. } | Self::BeginChain { properties, .. } => {
                properties.insert(name.to_string(), value.to_string());
            }
            other => debug_assert!(
                false,
                "property '{name}' set on a {} directive, which takes no properties",
                other.kind()
            ),
        }
        self
    }

    /// Short label used in error messages and traces.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::BeginCatalog { .. } => "begin-catalog",
            Self::EndCatalog => "end-catalog",
            Self::DefineCommand { .. } => "define-command",
            Self::BeginChain { .. } => "begin-chain",
            Self::EndChain => "end-chain",
            Self::SetProperty { .. } => "set-property",
            Self::Alias { .. } => "alias",
        }
    }
}
