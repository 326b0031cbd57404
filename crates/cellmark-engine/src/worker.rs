//! Background parse worker.
//!
//! One long-lived thread owns its own copy of the renderer state and
//! communicates with the pipeline over channels only; no state is shared
//! across the boundary. The worker lives as long as its owning pipeline
//! and is shut down and joined when the pipeline is dropped.

use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crate::highlight::Highlighter;
use crate::pipeline::PipelineError;
use crate::render;
use crate::token::Token;

pub(crate) enum WorkerRequest {
    Parse { generation: u64, markdown: String },
    Shutdown,
}

#[derive(Debug)]
pub(crate) struct WorkerReply {
    pub generation: u64,
    pub html: String,
    pub tokens: Vec<Token>,
    pub parse_ms: u64,
}

pub(crate) struct ParseWorker {
    requests: Sender<WorkerRequest>,
    replies: Receiver<WorkerReply>,
    handle: Option<JoinHandle<()>>,
}

impl ParseWorker {
    pub(crate) fn spawn() -> std::io::Result<Self> {
        let (request_tx, request_rx) = mpsc::channel();
        let (reply_tx, reply_rx) = mpsc::channel();
        let handle = thread::Builder::new()
            .name("cellmark-parse-worker".to_string())
            .spawn(move || worker_loop(request_rx, reply_tx))?;
        Ok(Self {
            requests: request_tx,
            replies: reply_rx,
            handle: Some(handle),
        })
    }

    pub(crate) fn submit(&self, generation: u64, markdown: String) -> Result<(), PipelineError> {
        self.requests
            .send(WorkerRequest::Parse {
                generation,
                markdown,
            })
            .map_err(|_| PipelineError::WorkerGone)
    }

    pub(crate) fn recv(&self) -> Result<WorkerReply, PipelineError> {
        self.replies.recv().map_err(|_| PipelineError::WorkerGone)
    }
}

impl Drop for ParseWorker {
    fn drop(&mut self) {
        let _ = self.requests.send(WorkerRequest::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn worker_loop(requests: Receiver<WorkerRequest>, replies: Sender<WorkerReply>) {
    let highlighter = Highlighter::new();
    while let Ok(request) = requests.recv() {
        match request {
            WorkerRequest::Parse {
                generation,
                markdown,
            } => {
                let started = Instant::now();
                let (html, tokens) = render::parse_markdown(&markdown, &highlighter);
                let parse_ms = started.elapsed().as_millis() as u64;
                log::debug!(
                    "worker parsed generation {generation}: {} bytes in {parse_ms}ms",
                    markdown.len()
                );
                if replies
                    .send(WorkerReply {
                        generation,
                        html,
                        tokens,
                        parse_ms,
                    })
                    .is_err()
                {
                    break;
                }
            }
            WorkerRequest::Shutdown => break,
        }
    }
}
