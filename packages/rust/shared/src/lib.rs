//! Shared error model and configuration for Chainworks.
//!
//! This crate is the foundation depended on by all other Chainworks crates.
//! It provides:
//! - [`ChainError`], the unified error type
//! - Configuration ([`AppConfig`], [`AssemblerConfig`], config loading)

pub mod config;
pub mod error;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, AssemblerConfig, DuplicatePolicy, RunConfig, config_dir, config_file_path,
    init_config, load_config, load_config_from,
};
pub use error::{BoxError, ChainError, Result};
