//! Selection reactor: the bridge between host selection-change
//! notifications and the parse pipeline.
//!
//! The host hands notifications to a [`SelectionNotifier`]; the reactor
//! thread debounces them, fetches the selected cell's markdown through the
//! [`CellSource`] port, runs the pipeline and publishes the outcome. Fetch
//! failures are per-cycle: they are published as [`Update::Failed`] and the
//! next notification is a fresh attempt.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::debounce::Debouncer;
use crate::pipeline::{ParseOptions, ParsePipeline, ParseResult, PipelineError};

/// Default quiet window for collapsing selection-change bursts.
pub const DEFAULT_DEBOUNCE_WINDOW: Duration = Duration::from_millis(150);

/// Identifies where a cell value came from. All fields are optional: an
/// absent selection is an empty reference, not an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellRef {
    pub table_id: Option<String>,
    pub record_id: Option<String>,
    pub field_id: Option<String>,
}

/// A fetched cell value: extracted markdown text plus its reference.
#[derive(Debug, Clone, Default)]
pub struct CellContent {
    pub markdown: String,
    pub cell: CellRef,
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("data source unavailable: {0}")]
    Unavailable(String),
    #[error("unexpected cell value shape: {0}")]
    UnexpectedShape(String),
}

/// Host data-source port. Implementations must tolerate an absent
/// selection by returning empty content rather than an error.
pub trait CellSource: Send + Sync {
    fn selected_cell(&self) -> Result<CellContent, FetchError>;
}

/// Optional port for a locally-persisted markdown override. When it yields
/// a value the reactor uses it verbatim instead of fetching the cell.
pub trait OverrideSource: Send + Sync {
    fn markdown_override(&self) -> Option<String>;
}

/// What the reactor publishes to the presentation layer after each cycle.
#[derive(Debug, Clone)]
pub enum Update {
    Parsed { result: ParseResult, cell: CellRef },
    Failed { message: String },
}

#[derive(Debug, Clone)]
pub struct ReactorOptions {
    pub debounce_window: Duration,
    pub parse: ParseOptions,
}

impl Default for ReactorOptions {
    fn default() -> Self {
        Self {
            debounce_window: DEFAULT_DEBOUNCE_WINDOW,
            parse: ParseOptions::default(),
        }
    }
}

enum ReactorMsg {
    Notify,
    Shutdown,
}

/// Cloneable handle the host's selection-change stream feeds. Sends after
/// the reactor shut down are silently dropped.
#[derive(Clone)]
pub struct SelectionNotifier {
    messages: Sender<ReactorMsg>,
}

impl SelectionNotifier {
    pub fn notify(&self) {
        let _ = self.messages.send(ReactorMsg::Notify);
    }
}

/// The reactor itself. Dropping it (or calling [`shutdown`]) cancels any
/// pending debounced cycle, detaches from the notification stream and
/// joins the worker thread; results from cycles still in flight are not
/// published past that point.
///
/// [`shutdown`]: SelectionReactor::shutdown
pub struct SelectionReactor {
    messages: Sender<ReactorMsg>,
    alive: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl SelectionReactor {
    /// Start the reactor. One fetch+parse cycle fires immediately on spawn
    /// regardless of debounce state, so subscribers have content without
    /// waiting for the first selection change.
    pub fn spawn(
        source: Arc<dyn CellSource>,
        overrides: Option<Arc<dyn OverrideSource>>,
        options: ReactorOptions,
        publish: Box<dyn Fn(Update) + Send>,
    ) -> Result<Self, PipelineError> {
        let pipeline = ParsePipeline::new(options.parse.clone())?;
        let (messages, inbox) = mpsc::channel();
        let alive = Arc::new(AtomicBool::new(true));
        let thread_alive = Arc::clone(&alive);
        let window = options.debounce_window;
        let handle = thread::Builder::new()
            .name("cellmark-selection-reactor".to_string())
            .spawn(move || {
                reactor_loop(
                    inbox,
                    thread_alive,
                    window,
                    pipeline,
                    source,
                    overrides,
                    publish,
                )
            })
            .map_err(PipelineError::WorkerSpawn)?;
        Ok(Self {
            messages,
            alive,
            handle: Some(handle),
        })
    }

    /// Handle for the host's selection-change subscription.
    pub fn notifier(&self) -> SelectionNotifier {
        SelectionNotifier {
            messages: self.messages.clone(),
        }
    }

    /// Record one selection-change notification.
    pub fn notify(&self) {
        let _ = self.messages.send(ReactorMsg::Notify);
    }

    /// Unsubscribe: cancel pending work, stop publishing, join the thread.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.alive.store(false, Ordering::SeqCst);
        let _ = self.messages.send(ReactorMsg::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for SelectionReactor {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.stop();
        }
    }
}

/// Upper bound on one wait when no cycle is pending; notifications wake the
/// loop earlier.
const IDLE_WAIT: Duration = Duration::from_secs(60);

fn reactor_loop(
    inbox: Receiver<ReactorMsg>,
    alive: Arc<AtomicBool>,
    window: Duration,
    pipeline: ParsePipeline,
    source: Arc<dyn CellSource>,
    overrides: Option<Arc<dyn OverrideSource>>,
    publish: Box<dyn Fn(Update) + Send>,
) {
    let mut debouncer = Debouncer::new(window);

    // Cold start.
    run_cycle(
        &alive,
        &pipeline,
        source.as_ref(),
        overrides.as_deref(),
        publish.as_ref(),
    );

    loop {
        if !alive.load(Ordering::SeqCst) {
            break;
        }
        let wait = debouncer
            .time_remaining(Instant::now())
            .unwrap_or(IDLE_WAIT);
        match inbox.recv_timeout(wait) {
            Ok(ReactorMsg::Notify) => debouncer.notify(Instant::now()),
            Ok(ReactorMsg::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {}
        }
        if debouncer.poll(Instant::now()) {
            run_cycle(
                &alive,
                &pipeline,
                source.as_ref(),
                overrides.as_deref(),
                publish.as_ref(),
            );
        }
    }
}

fn run_cycle(
    alive: &AtomicBool,
    pipeline: &ParsePipeline,
    source: &dyn CellSource,
    overrides: Option<&dyn OverrideSource>,
    publish: &(dyn Fn(Update) + Send),
) {
    if !alive.load(Ordering::SeqCst) {
        return;
    }

    let fetched = match overrides.and_then(OverrideSource::markdown_override) {
        Some(markdown) => Ok(CellContent {
            markdown,
            cell: CellRef::default(),
        }),
        None => source.selected_cell(),
    };

    let update = match fetched {
        Ok(content) => match pipeline.parse(&content.markdown) {
            Ok(result) => Update::Parsed {
                result,
                cell: content.cell,
            },
            Err(err) => {
                log::error!("parse cycle failed: {err}");
                Update::Failed {
                    message: err.to_string(),
                }
            }
        },
        Err(err) => {
            log::warn!("cell fetch failed: {err}");
            Update::Failed {
                message: err.to_string(),
            }
        }
    };

    // Liveness check gates every publish; a cycle that raced shutdown must
    // not mutate presentation state.
    if alive.load(Ordering::SeqCst) {
        publish(update);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;

    struct FakeSource {
        fetches: AtomicUsize,
        markdown: Mutex<String>,
        fail: AtomicBool,
    }

    impl FakeSource {
        fn new(markdown: &str) -> Arc<Self> {
            Arc::new(Self {
                fetches: AtomicUsize::new(0),
                markdown: Mutex::new(markdown.to_string()),
                fail: AtomicBool::new(false),
            })
        }

        fn fetch_count(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }

        fn set_markdown(&self, markdown: &str) {
            *self.markdown.lock().expect("lock") = markdown.to_string();
        }

        fn set_failing(&self, failing: bool) {
            self.fail.store(failing, Ordering::SeqCst);
        }
    }

    impl CellSource for FakeSource {
        fn selected_cell(&self) -> Result<CellContent, FetchError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return Err(FetchError::Unavailable("host gone".to_string()));
            }
            Ok(CellContent {
                markdown: self.markdown.lock().expect("lock").clone(),
                cell: CellRef {
                    record_id: Some("r1".to_string()),
                    ..CellRef::default()
                },
            })
        }
    }

    struct FixedOverride(String);

    impl OverrideSource for FixedOverride {
        fn markdown_override(&self) -> Option<String> {
            Some(self.0.clone())
        }
    }

    fn collector() -> (Box<dyn Fn(Update) + Send>, Receiver<Update>) {
        let (tx, rx) = mpsc::channel();
        (
            Box::new(move |update| {
                let _ = tx.send(update);
            }),
            rx,
        )
    }

    fn options(window_ms: u64) -> ReactorOptions {
        ReactorOptions {
            debounce_window: Duration::from_millis(window_ms),
            parse: ParseOptions::default(),
        }
    }

    fn recv(updates: &Receiver<Update>) -> Update {
        updates
            .recv_timeout(Duration::from_secs(5))
            .expect("update within deadline")
    }

    #[test]
    fn cold_start_publishes_without_a_notification() {
        let source = FakeSource::new("# Hello");
        let (publish, updates) = collector();
        let reactor =
            SelectionReactor::spawn(source.clone(), None, options(25), publish).expect("spawn");

        match recv(&updates) {
            Update::Parsed { result, cell } => {
                assert!(result.html.contains("<h1"));
                assert_eq!(cell.record_id.as_deref(), Some("r1"));
            }
            Update::Failed { message } => panic!("unexpected failure: {message}"),
        }
        reactor.shutdown();
    }

    #[test]
    fn a_burst_of_notifications_collapses_to_one_cycle() {
        let source = FakeSource::new("first");
        let (publish, updates) = collector();
        let reactor =
            SelectionReactor::spawn(source.clone(), None, options(40), publish).expect("spawn");

        // Wait out the cold-start cycle so the burst is measured alone.
        recv(&updates);
        assert_eq!(source.fetch_count(), 1);

        source.set_markdown("last");
        for _ in 0..5 {
            reactor.notify();
        }
        match recv(&updates) {
            Update::Parsed { result, .. } => assert!(result.html.contains("last")),
            Update::Failed { message } => panic!("unexpected failure: {message}"),
        }

        // Allow any extra (incorrect) cycles to surface before counting.
        thread::sleep(Duration::from_millis(150));
        assert_eq!(source.fetch_count(), 2);
        reactor.shutdown();
    }

    #[test]
    fn fetch_failure_is_published_and_does_not_stop_the_reactor() {
        let source = FakeSource::new("ok");
        let (publish, updates) = collector();
        let reactor =
            SelectionReactor::spawn(source.clone(), None, options(25), publish).expect("spawn");
        recv(&updates);

        source.set_failing(true);
        reactor.notify();
        match recv(&updates) {
            Update::Failed { message } => assert!(message.contains("host gone")),
            Update::Parsed { .. } => panic!("expected failure update"),
        }

        // The next notification is an independent attempt.
        source.set_failing(false);
        reactor.notify();
        match recv(&updates) {
            Update::Parsed { result, .. } => assert!(result.html.contains("ok")),
            Update::Failed { message } => panic!("unexpected failure: {message}"),
        }
        reactor.shutdown();
    }

    #[test]
    fn shutdown_cancels_a_pending_debounced_cycle() {
        let source = FakeSource::new("content");
        let (publish, updates) = collector();
        let reactor =
            SelectionReactor::spawn(source.clone(), None, options(100), publish).expect("spawn");
        recv(&updates);
        assert_eq!(source.fetch_count(), 1);

        reactor.notify();
        reactor.shutdown();

        thread::sleep(Duration::from_millis(250));
        assert_eq!(source.fetch_count(), 1, "pending cycle ran after shutdown");
        assert!(updates.try_recv().is_err(), "published after shutdown");
    }

    #[test]
    fn override_replaces_the_fetched_cell_text() {
        let source = FakeSource::new("from the cell");
        let overrides: Arc<dyn OverrideSource> =
            Arc::new(FixedOverride("# from the override".to_string()));
        let (publish, updates) = collector();
        let reactor =
            SelectionReactor::spawn(source.clone(), Some(overrides), options(25), publish)
                .expect("spawn");

        match recv(&updates) {
            Update::Parsed { result, cell } => {
                assert!(result.html.contains("from the override"));
                assert_eq!(cell, CellRef::default());
            }
            Update::Failed { message } => panic!("unexpected failure: {message}"),
        }
        assert_eq!(source.fetch_count(), 0);
        reactor.shutdown();
    }

    #[test]
    fn empty_selection_yields_an_empty_parsed_update() {
        struct EmptySource;
        impl CellSource for EmptySource {
            fn selected_cell(&self) -> Result<CellContent, FetchError> {
                Ok(CellContent::default())
            }
        }

        let (publish, updates) = collector();
        let reactor = SelectionReactor::spawn(Arc::new(EmptySource), None, options(25), publish)
            .expect("spawn");
        match recv(&updates) {
            Update::Parsed { result, .. } => assert!(result.is_empty()),
            Update::Failed { message } => panic!("unexpected failure: {message}"),
        }
        reactor.shutdown();
    }
}
