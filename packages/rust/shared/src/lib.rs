//! Shared types, error model, and configuration for bindery.
//!
//! This crate is the foundation depended on by all other bindery crates.
//! It provides:
//! - [`BinderyError`] — the unified error type
//! - Domain types ([`Item`], [`OutlineEntry`], [`Diagnostic`], [`RunId`])
//! - Configuration ([`AppConfig`], [`BookConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, BookConfig, BookMeta, ChapterEntry, ConverterConfig, DefaultsConfig, StylesConfig,
    TocConfig, CHAPTERS_DIR_NAME, config_dir, config_file_path, init_config, load_book_config,
    load_config, load_config_from,
};
pub use error::{BinderyError, Result};
pub use types::{
    BuildReport, DEFAULT_LAYOUT, Diagnostic, Item, ItemConfig, OutlineEntry, RunId, Severity,
};
