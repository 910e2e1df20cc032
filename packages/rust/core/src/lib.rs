//! Chain-of-responsibility execution engine for Chainworks.
//!
//! Commands run against a shared [`Context`]. A [`Chain`] is itself a
//! command, so pipelines nest. Named commands live in a [`Catalog`], and
//! catalogs live in a [`CatalogFactory`].

pub mod catalog;
pub mod chain;
pub mod command;
pub mod context;
pub mod factory;
pub mod generic;

pub use catalog::Catalog;
pub use chain::{Chain, ChainState};
pub use command::{Command, Filter, Outcome, Propagation};
pub use context::Context;
pub use factory::CatalogFactory;
pub use generic::{CopyCommand, LookupCommand, RemoveCommand};
