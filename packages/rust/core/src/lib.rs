//! Core publishing pipeline for bindery.
//!
//! Owns the item store, the phase event bus, the pipeline controller, and
//! the assembler. Content parsing, decoration, and conversion reach this
//! crate only through the adapter traits ([`ContentParser`], [`Decorator`],
//! [`Converter`]), so every external collaborator is replaceable.

pub mod assembler;
pub mod events;
pub mod frontmatter;
pub mod pipeline;
pub mod project;
pub mod store;
pub mod toc;

pub use assembler::{AssembleConfig, ConvertOutcome, Converter, assemble_and_convert};
pub use events::{EventBus, Hook, PhaseEvent};
pub use pipeline::{
    ContentParser, DecorationContext, Decorator, ParsedContent, PipelineController,
    ProgressReporter, PublishOptions, PublishResult, SilentProgress, publish,
};
pub use project::{LoadedBook, load_book};
pub use store::ItemStore;
