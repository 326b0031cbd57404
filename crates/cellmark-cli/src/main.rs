//! Terminal preview panel.
//!
//! A directory of `.md` files plays the spreadsheet host: each file is one
//! record, and moving the selection with `j`/`k` feeds the selection
//! reactor exactly like cell-selection changes from a real host. The two
//! pipeline outputs land in the outline pane and the preview pane, with
//! parse timings in the status line.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::time::{Duration, Instant};
use std::{env, fs, io::stdout, process};

use anyhow::Result;
use cellmark_config::{Preferences, SharedPreferences};
use cellmark_engine::hierarchy::{HierNode, NodeKind};
use cellmark_engine::{
    CellContent, CellRef, CellSource, FetchError, ReactorOptions, SelectionReactor, Update, export,
};
use crossterm::{
    event::{self, Event, KeyCode},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
};

/// Folder-backed stand-in for the host data source: one markdown file per
/// record, the selected file is the selected cell.
struct DirectoryCellSource {
    root: PathBuf,
    files: Vec<PathBuf>,
    selected: AtomicUsize,
}

impl DirectoryCellSource {
    fn new(root: PathBuf) -> Result<Self> {
        let mut files: Vec<PathBuf> = fs::read_dir(&root)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "md"))
            .collect();
        files.sort();
        Ok(Self {
            root,
            files,
            selected: AtomicUsize::new(0),
        })
    }

    fn len(&self) -> usize {
        self.files.len()
    }

    fn selected_index(&self) -> usize {
        self.selected.load(Ordering::SeqCst)
    }

    fn select_next(&self) {
        let last = self.files.len().saturating_sub(1);
        let current = self.selected.load(Ordering::SeqCst);
        self.selected.store((current + 1).min(last), Ordering::SeqCst);
    }

    fn select_previous(&self) {
        let current = self.selected.load(Ordering::SeqCst);
        self.selected.store(current.saturating_sub(1), Ordering::SeqCst);
    }

    fn record_names(&self) -> Vec<String> {
        self.files.iter().map(|path| display_name(path)).collect()
    }
}

fn display_name(path: &std::path::Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

impl CellSource for DirectoryCellSource {
    fn selected_cell(&self) -> Result<CellContent, FetchError> {
        let Some(path) = self.files.get(self.selected_index()) else {
            // No records is an empty selection, not a failure.
            return Ok(CellContent::default());
        };
        let markdown = fs::read_to_string(path)
            .map_err(|err| FetchError::Unavailable(format!("{}: {err}", path.display())))?;
        Ok(CellContent {
            markdown,
            cell: CellRef {
                table_id: Some(display_name(&self.root)),
                record_id: Some(display_name(path)),
                field_id: None,
            },
        })
    }
}

struct App {
    source: Arc<DirectoryCellSource>,
    reactor: SelectionReactor,
    updates: Receiver<Update>,
    preferences: SharedPreferences,
    record_state: ListState,
    outline_lines: Vec<String>,
    preview: String,
    meta: String,
    error: Option<String>,
    parse_ms: u64,
    finalize_ms: u64,
    render_ms: u64,
    scroll: u16,
    status: Option<String>,
}

impl App {
    fn new(
        source: Arc<DirectoryCellSource>,
        reactor: SelectionReactor,
        updates: Receiver<Update>,
        preferences: SharedPreferences,
    ) -> Self {
        let mut record_state = ListState::default();
        if source.len() > 0 {
            record_state.select(Some(0));
        }
        Self {
            source,
            reactor,
            updates,
            preferences,
            record_state,
            outline_lines: Vec::new(),
            preview: String::new(),
            meta: "no selection".to_string(),
            error: None,
            parse_ms: 0,
            finalize_ms: 0,
            render_ms: 0,
            scroll: 0,
            status: None,
        }
    }

    fn next_record(&mut self) {
        self.source.select_next();
        self.record_state.select(Some(self.source.selected_index()));
        self.reactor.notify();
    }

    fn previous_record(&mut self) {
        self.source.select_previous();
        self.record_state.select(Some(self.source.selected_index()));
        self.reactor.notify();
    }

    fn drain_updates(&mut self) {
        while let Ok(update) = self.updates.try_recv() {
            self.apply_update(update);
        }
    }

    fn apply_update(&mut self, update: Update) {
        match update {
            Update::Parsed { result, cell } => {
                let started = Instant::now();
                self.outline_lines = flatten_outline(&result.hierarchy);
                self.preview = result.html;
                self.meta = describe_cell(&cell);
                self.parse_ms = result.parse_ms;
                self.finalize_ms = result.finalize_ms;
                self.render_ms = started.elapsed().as_millis() as u64;
                self.error = None;
                self.scroll = 0;
            }
            // A failed cycle keeps the previous preview on screen; only the
            // error indicator changes.
            Update::Failed { message } => self.error = Some(message),
        }
    }

    fn start_trial(&mut self) {
        self.preferences
            .update(|p| p.license.start_trial(epoch_ms(), 3));
        match self.preferences.snapshot().save() {
            Ok(()) => self.status = Some("3-day trial started".to_string()),
            Err(err) => self.status = Some(format!("trial started, but not saved: {err}")),
        }
    }

    fn export_preview(&mut self) {
        if self.preview.is_empty() {
            self.status = Some("nothing to export yet".to_string());
            return;
        }
        let preferences = self.preferences.snapshot();
        if !preferences.license.is_active(epoch_ms()) {
            self.status = Some("HTML export needs an active license or trial".to_string());
            return;
        }
        let css = preferences.theme_css();
        let target = PathBuf::from("preview.html");
        match export::write_html(&target, &self.preview, Some(&css)) {
            Ok(()) => {
                log::info!("exported preview to {}", target.display());
                self.status = Some(format!("exported {}", target.display()));
            }
            Err(err) => self.status = Some(err.to_string()),
        }
    }
}

fn epoch_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}

fn describe_cell(cell: &CellRef) -> String {
    format!(
        "table {} | record {} | field {}",
        cell.table_id.as_deref().unwrap_or("-"),
        cell.record_id.as_deref().unwrap_or("-"),
        cell.field_id.as_deref().unwrap_or("-"),
    )
}

fn flatten_outline(nodes: &[HierNode]) -> Vec<String> {
    let mut lines = Vec::new();
    flatten_level(nodes, 0, &mut lines);
    lines
}

fn flatten_level(nodes: &[HierNode], depth: usize, lines: &mut Vec<String>) {
    for node in nodes {
        let indent = "  ".repeat(depth);
        let line = match node.kind {
            NodeKind::Heading => {
                format!("{indent}H{} {}", node.level.unwrap_or(0), node.text)
            }
            NodeKind::ListItem => format!("{indent}- {}", node.text),
            _ => format!("{indent}[{}] {}", kind_label(node.kind), node.text),
        };
        lines.push(line);
        flatten_level(&node.children, depth + 1, lines);
    }
}

fn kind_label(kind: NodeKind) -> &'static str {
    match kind {
        NodeKind::Heading => "heading",
        NodeKind::List => "list",
        NodeKind::ListItem => "item",
        NodeKind::Table => "table",
        NodeKind::Code => "code",
        NodeKind::Paragraph => "para",
        NodeKind::Blockquote => "quote",
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() != 2 {
        eprintln!("Usage: {} <markdown-folder>", args[0]);
        process::exit(1);
    }
    let root = PathBuf::from(&args[1]);
    if !root.is_dir() {
        eprintln!("Error: '{}' is not a directory", root.display());
        process::exit(1);
    }

    let preferences = match Preferences::load() {
        Ok(Some(stored)) => SharedPreferences::new(stored),
        Ok(None) => SharedPreferences::default(),
        Err(err) => {
            eprintln!("Error: failed to load preferences: {err}");
            process::exit(1);
        }
    };

    let source = Arc::new(DirectoryCellSource::new(root)?);
    let (update_tx, update_rx) = mpsc::channel();
    let reactor = SelectionReactor::spawn(
        source.clone(),
        Some(Arc::new(preferences.clone())),
        ReactorOptions::default(),
        Box::new(move |update| {
            let _ = update_tx.send(update);
        }),
    )?;

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(source, reactor, update_rx, preferences);
    let res = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    app.reactor.shutdown();

    if let Err(err) = res {
        println!("{err:?}");
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()>
where
    <B as ratatui::backend::Backend>::Error: Send + Sync + 'static,
{
    loop {
        app.drain_updates();
        terminal.draw(|f| ui(f, app))?;

        if event::poll(Duration::from_millis(50))?
            && let Event::Key(key) = event::read()?
        {
            match key.code {
                KeyCode::Char('q') => return Ok(()),
                KeyCode::Down | KeyCode::Char('j') => app.next_record(),
                KeyCode::Up | KeyCode::Char('k') => app.previous_record(),
                KeyCode::PageDown | KeyCode::Char('d') => {
                    app.scroll = app.scroll.saturating_add(5);
                }
                KeyCode::PageUp | KeyCode::Char('u') => {
                    app.scroll = app.scroll.saturating_sub(5);
                }
                KeyCode::Char('e') => app.export_preview(),
                KeyCode::Char('t') => app.start_trial(),
                _ => {}
            }
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(f.area());

    let panes = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(20),
            Constraint::Percentage(35),
            Constraint::Percentage(45),
        ])
        .split(rows[0]);

    // Record list
    let records: Vec<ListItem> = app
        .source
        .record_names()
        .into_iter()
        .map(|name| ListItem::new(Line::from(name)))
        .collect();
    let record_list = List::new(records)
        .block(Block::default().borders(Borders::ALL).title("Records"))
        .highlight_style(Style::default().bg(Color::Yellow).fg(Color::Black));
    f.render_stateful_widget(record_list, panes[0], &mut app.record_state);

    // Outline pane
    let outline_text: Vec<Line> = if app.outline_lines.is_empty() {
        vec![Line::from("(no structure)")]
    } else {
        app.outline_lines
            .iter()
            .map(|line| Line::from(line.clone()))
            .collect()
    };
    let outline = Paragraph::new(outline_text)
        .block(Block::default().borders(Borders::ALL).title("Structure"));
    f.render_widget(outline, panes[1]);

    // Preview pane: the sanitized HTML the widget would mount
    let preview_text: Vec<Line> = if app.preview.is_empty() {
        vec![Line::from("Select a record with markdown content")]
    } else {
        app.preview.lines().map(|l| Line::from(l.to_string())).collect()
    };
    let preview = Paragraph::new(preview_text)
        .block(Block::default().borders(Borders::ALL).title("Preview (sanitized HTML)"))
        .scroll((app.scroll, 0))
        .wrap(Wrap { trim: false });
    f.render_widget(preview, panes[2]);

    // Meta line: selection reference, timings, error indicator
    let mut meta_spans = vec![
        Span::raw(app.meta.clone()),
        Span::raw(format!(
            " | parse {}ms{} | render {}ms",
            app.parse_ms,
            if app.finalize_ms > 0 {
                format!(" (+{}ms finalize)", app.finalize_ms)
            } else {
                String::new()
            },
            app.render_ms,
        )),
    ];
    if let Some(error) = &app.error {
        meta_spans.push(Span::styled(
            format!(" | error: {error}"),
            Style::default().fg(Color::Red),
        ));
    }
    if let Some(status) = &app.status {
        meta_spans.push(Span::styled(
            format!(" | {status}"),
            Style::default().fg(Color::Green),
        ));
    }
    f.render_widget(Paragraph::new(Line::from(meta_spans)), rows[1]);

    let help = Line::from(vec![
        Span::raw("q: Quit | "),
        Span::raw("j/k: Select record | "),
        Span::raw("d/u: Scroll preview | "),
        Span::raw("e: Export HTML | "),
        Span::raw("t: Start trial"),
    ]);
    f.render_widget(Paragraph::new(help), rows[2]);
}
