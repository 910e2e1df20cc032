//! Error types for Chainworks.
//!
//! Library crates use [`ChainError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Boxed error raised by a command's own logic.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Top-level error type for all Chainworks operations.
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    /// Raised by a command during `execute` (or a filter during `postprocess`).
    ///
    /// Displays as the underlying error so callers see the original message.
    #[error("{source}")]
    Execution { source: BoxError },

    /// Catalog lookup of an unregistered name.
    #[error("command '{name}' not found in catalog '{catalog}'")]
    NotFound { catalog: String, name: String },

    /// Registration of a name that is already taken.
    #[error("command '{name}' is already registered in catalog '{catalog}'")]
    DuplicateName { catalog: String, name: String },

    /// Assembly-time failure: unresolved reference, unknown type or property,
    /// malformed nesting, unreadable definition document.
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// A chain was modified after its first execution.
    #[error("chain is frozen: commands cannot be added after execution has started")]
    Frozen,

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ChainError>;

impl ChainError {
    /// Wrap an error raised by command logic.
    pub fn execution(err: impl Into<BoxError>) -> Self {
        Self::Execution { source: err.into() }
    }

    /// Create a configuration error from any displayable message.
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration {
            message: msg.into(),
        }
    }

    /// Create a not-found error for `name` in `catalog`.
    pub fn not_found(catalog: impl Into<String>, name: impl Into<String>) -> Self {
        Self::NotFound {
            catalog: catalog.into(),
            name: name.into(),
        }
    }

    /// Create a duplicate-name error for `name` in `catalog`.
    pub fn duplicate(catalog: impl Into<String>, name: impl Into<String>) -> Self {
        Self::DuplicateName {
            catalog: catalog.into(),
            name: name.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// The error raised by command logic, if this is an execution error.
    pub fn execution_source(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            Self::Execution { source } => Some(source.as_ref()),
            _ => None,
        }
    }

    /// Downcast the execution source to a concrete error type.
    pub fn downcast_execution<E: std::error::Error + 'static>(&self) -> Option<&E> {
        self.execution_source()?.downcast_ref::<E>()
    }

    /// Whether this error came from assembling a configuration.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration { .. })
    }
}
