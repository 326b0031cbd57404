//! Core engine for cellmark: markdown tokenization, outline building,
//! sanitized HTML rendering, and the selection-driven parse reactor.
//!
//! The pipeline is rebuilt from scratch on every input change; nothing is
//! patched incrementally. Large inputs are parsed on a background worker,
//! everything else stays on the calling thread.

pub mod ai;
pub mod debounce;
pub mod emoji;
pub mod export;
pub mod hierarchy;
pub mod highlight;
pub mod pipeline;
pub mod reactor;
pub mod sanitize;
pub mod token;

mod render;
mod worker;

// Re-export key types for easier usage
pub use hierarchy::{HierNode, NodeKind, build_hierarchy};
pub use pipeline::{ParseOptions, ParsePath, ParsePipeline, ParseResult, PipelineError};
pub use reactor::{
    CellContent, CellRef, CellSource, FetchError, OverrideSource, ReactorOptions,
    SelectionNotifier, SelectionReactor, Update,
};
pub use token::{Token, tokenize};
