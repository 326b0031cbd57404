//! The parse pipeline: emoji expansion, tokenize, render, sanitize and
//! outline building, with size-based dispatch between a synchronous light
//! path and a worker-backed heavy path.
//!
//! Tokenizing and rendering dominate the cost on large inputs, so past the
//! size threshold they move to the worker; sanitizing and outline building
//! stay on the calling thread, which avoids shipping the sanitized HTML
//! back across the boundary a second time.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::emoji;
use crate::hierarchy::{self, HierNode};
use crate::highlight::Highlighter;
use crate::render;
use crate::sanitize::Sanitizer;
use crate::worker::{ParseWorker, WorkerReply};

/// Input length (in characters) at which parsing moves to the worker.
pub const DEFAULT_HEAVY_THRESHOLD: usize = 8_000;

/// Tuning knobs for the pipeline. The threshold default matches the point
/// where main-thread parsing starts to crowd interactive latency; it is a
/// parameter, not a constant, so hosts can adjust it.
#[derive(Debug, Clone)]
pub struct ParseOptions {
    pub heavy_threshold: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            heavy_threshold: DEFAULT_HEAVY_THRESHOLD,
        }
    }
}

/// Which execution path produced a [`ParseResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParsePath {
    Light,
    Heavy,
}

/// The two pipeline outputs plus timing, rebuilt in full on every parse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseResult {
    /// Sanitized HTML, safe to hand to a presentation surface.
    pub html: String,
    /// Outline forest for the structure view.
    pub hierarchy: Vec<HierNode>,
    /// Light path: the whole pipeline. Heavy path: worker-side tokenize
    /// plus render only.
    pub parse_ms: u64,
    /// Heavy path only: main-thread sanitize plus outline time.
    pub finalize_ms: u64,
    pub path: ParsePath,
}

impl ParseResult {
    pub fn empty() -> Self {
        Self {
            html: String::new(),
            hierarchy: Vec::new(),
            parse_ms: 0,
            finalize_ms: 0,
            path: ParsePath::Light,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.html.is_empty() && self.hierarchy.is_empty()
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to start parse worker: {0}")]
    WorkerSpawn(#[from] std::io::Error),
    #[error("parse worker is no longer running")]
    WorkerGone,
}

pub struct ParsePipeline {
    options: ParseOptions,
    highlighter: Highlighter,
    sanitizer: Sanitizer,
    worker: ParseWorker,
    generation: AtomicU64,
}

impl ParsePipeline {
    pub fn new(options: ParseOptions) -> Result<Self, PipelineError> {
        Ok(Self {
            options,
            highlighter: Highlighter::new(),
            sanitizer: Sanitizer::new(),
            worker: ParseWorker::spawn()?,
            generation: AtomicU64::new(0),
        })
    }

    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    /// Parse a markdown document, dispatching on input size.
    ///
    /// Empty input short-circuits to an empty result without touching the
    /// tokenizer. The only error is a dead worker; callers are expected to
    /// keep their previous output on that path.
    pub fn parse(&self, markdown: &str) -> Result<ParseResult, PipelineError> {
        if markdown.is_empty() {
            return Ok(ParseResult::empty());
        }
        if markdown.chars().count() < self.options.heavy_threshold {
            Ok(self.parse_light(markdown))
        } else {
            self.parse_heavy(markdown)
        }
    }

    /// Run the whole pipeline on the calling thread.
    pub fn parse_light(&self, markdown: &str) -> ParseResult {
        if markdown.is_empty() {
            return ParseResult::empty();
        }
        let started = Instant::now();
        let prepared = emoji::replace_shortcodes(markdown);
        let (raw_html, tokens) = render::parse_markdown(&prepared, &self.highlighter);
        let html = self.sanitizer.sanitize(&raw_html);
        let hierarchy = hierarchy::build_hierarchy(&tokens);
        ParseResult {
            html,
            hierarchy,
            parse_ms: started.elapsed().as_millis() as u64,
            finalize_ms: 0,
            path: ParsePath::Light,
        }
    }

    /// Offload tokenize + render to the worker, then finish the reply on
    /// this thread. Replies carry the generation of their request; anything
    /// older than the latest issued generation is a superseded input and is
    /// dropped instead of overwriting newer state.
    fn parse_heavy(&self, markdown: &str) -> Result<ParseResult, PipelineError> {
        let prepared = emoji::replace_shortcodes(markdown);
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.worker.submit(generation, prepared)?;
        loop {
            let reply = self.worker.recv()?;
            if reply.generation < generation {
                log::debug!("discarding stale parse reply (generation {})", reply.generation);
                continue;
            }
            return Ok(self.finish(reply));
        }
    }

    fn finish(&self, reply: WorkerReply) -> ParseResult {
        let started = Instant::now();
        let html = self.sanitizer.sanitize(&reply.html);
        let hierarchy = hierarchy::build_hierarchy(&reply.tokens);
        ParseResult {
            html,
            hierarchy,
            parse_ms: reply.parse_ms,
            finalize_ms: started.elapsed().as_millis() as u64,
            path: ParsePath::Heavy,
        }
    }
}
