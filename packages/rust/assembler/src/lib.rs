//! Declarative assembly of chains and catalogs for Chainworks.
//!
//! An [`Assembler`] consumes an ordered stream of [`Directive`]s, builds the
//! described commands through a [`ComponentRegistry`], and commits them to a
//! [`CatalogFactory`](chainworks_core::CatalogFactory) once the whole stream
//! has been accepted. The [`document`] module reads that stream from TOML.

pub mod assembler;
pub mod directive;
pub mod document;
pub mod reference;
pub mod registry;

#[cfg(test)]
mod testkit;

pub use assembler::{Assembler, AssemblySummary};
pub use directive::{CommandSource, Directive, Properties};
pub use reference::CommandRef;
pub use registry::{BuildContext, ChainType, CommandType, ComponentRegistry, parse_value};
