//! Panel state and event loop
//!
//! The UI loop is the single owner of the event log: network tasks deliver
//! decoded records over an unbounded channel and the loop appends them in
//! channel order, which is stream order. Each form submission runs on its
//! own spawned task, so the panel stays responsive while requests are in
//! flight. There is no cancellation; a running stream completes or fails.

pub mod forms;
pub mod render;

use crate::domain::{BtsLocation, MapSelection, SimulationEvent};
use crate::infra::Config;
use crate::io::backend::{BackendApi, StreamSummary};
use crate::io::export::CsvExporter;
use crate::services::event_log::EventLog;
use crate::services::projector::{plane_from_click, project, Projection};
use crossterm::event::{
    self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent,
    MouseEventKind,
};
use forms::{ConnectForm, FormStatus, GenerateForm, ReplayForm};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::Rect;
use ratatui::Terminal;
use std::cell::Cell;
use std::io;
use std::path::Path;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Which form a message or focus target belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormKind {
    Generate,
    Replay,
    Connect,
}

/// Messages delivered to the UI loop from spawned tasks
#[derive(Debug)]
pub enum UiMsg {
    /// One decoded record, appended to the event log
    Event(SimulationEvent),
    /// A submission finished, successfully or not
    TaskFinished { form: FormKind, result: Result<StreamSummary, String> },
    /// Startup BTS fetch completed
    Bts(Result<Vec<BtsLocation>, String>),
}

/// Keyboard focus, cycled with Tab / Shift-Tab
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    GenerateUsers,
    GenerateEvents,
    ReplayPath,
    ConnectImei,
    ConnectX,
    ConnectY,
    ConnectTimestamp,
    ConnectKeepalive,
}

impl Focus {
    const ORDER: [Focus; 8] = [
        Focus::GenerateUsers,
        Focus::GenerateEvents,
        Focus::ReplayPath,
        Focus::ConnectImei,
        Focus::ConnectX,
        Focus::ConnectY,
        Focus::ConnectTimestamp,
        Focus::ConnectKeepalive,
    ];

    fn position(self) -> usize {
        Self::ORDER.iter().position(|f| *f == self).unwrap_or(0)
    }

    pub fn next(self) -> Self {
        Self::ORDER[(self.position() + 1) % Self::ORDER.len()]
    }

    pub fn prev(self) -> Self {
        Self::ORDER[(self.position() + Self::ORDER.len() - 1) % Self::ORDER.len()]
    }

    pub fn form(self) -> FormKind {
        match self {
            Focus::GenerateUsers | Focus::GenerateEvents => FormKind::Generate,
            Focus::ReplayPath => FormKind::Replay,
            _ => FormKind::Connect,
        }
    }
}

/// Panel state shared between the input handlers and the renderer
pub struct App {
    backend: Arc<dyn BackendApi>,
    tx: mpsc::UnboundedSender<UiMsg>,
    exporter: CsvExporter,
    tick: Duration,
    base_url: String,

    pub log: EventLog,
    pub projection: Projection,
    dirty: Rc<Cell<bool>>,

    pub bts: Vec<BtsLocation>,
    pub generate: GenerateForm,
    pub replay: ReplayForm,
    pub connect: ConnectForm,
    pub focus: Focus,
    pub selection: Option<MapSelection>,
    /// Panel-wide status line (export results, BTS fetch problems)
    pub status_line: Option<String>,
    /// Inner rect of the map widget, recorded at render time for click
    /// mapping
    pub map_area: Option<Rect>,
    pub should_quit: bool,
}

impl App {
    pub fn new(
        config: &Config,
        backend: Arc<dyn BackendApi>,
        tx: mpsc::UnboundedSender<UiMsg>,
    ) -> Self {
        let mut log = EventLog::new();
        let dirty = Rc::new(Cell::new(false));
        let flag = dirty.clone();
        log.subscribe(Box::new(move |_| flag.set(true)));

        Self {
            backend,
            tx,
            exporter: CsvExporter::new(config.export_dir()),
            tick: Duration::from_millis(config.tick_ms()),
            base_url: config.base_url().to_string(),
            log,
            projection: Projection::default(),
            dirty,
            bts: Vec::new(),
            generate: GenerateForm::new(),
            replay: ReplayForm::new(),
            connect: ConnectForm::new(),
            focus: Focus::GenerateUsers,
            selection: None,
            status_line: None,
            map_area: None,
            should_quit: false,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// True when the projection must be recomputed
    pub fn take_dirty(&mut self) -> bool {
        self.dirty.replace(false)
    }

    pub fn handle_msg(&mut self, msg: UiMsg) {
        match msg {
            UiMsg::Event(event) => self.log.append(event),
            UiMsg::TaskFinished { form, result } => self.finish_task(form, result),
            UiMsg::Bts(Ok(list)) => self.bts = list,
            UiMsg::Bts(Err(e)) => {
                self.status_line = Some(format!("Failed to load BTS locations: {}", e));
            }
        }
    }

    fn finish_task(&mut self, form: FormKind, result: Result<StreamSummary, String>) {
        match form {
            FormKind::Generate => {
                self.generate.busy = false;
                self.generate.status = Some(match result {
                    Ok(summary) => FormStatus::success(format!(
                        "Simulation generated.{}",
                        skipped_note(summary.malformed)
                    )),
                    Err(_) => FormStatus::failure("Generate failed."),
                });
                if self.generate.status.as_ref().is_some_and(|s| s.ok) {
                    self.generate.reset_after_success();
                }
            }
            FormKind::Replay => {
                self.replay.busy = false;
                self.replay.status = Some(match result {
                    Ok(summary) => FormStatus::success(format!(
                        "Replay finished.{}",
                        skipped_note(summary.malformed)
                    )),
                    Err(_) => FormStatus::failure("Replay failed."),
                });
                if self.replay.status.as_ref().is_some_and(|s| s.ok) {
                    self.replay.reset_after_success();
                }
            }
            FormKind::Connect => {
                self.connect.busy = false;
                match result {
                    Ok(_) => {
                        self.connect.status =
                            Some(FormStatus::success("Connect sent successfully."));
                        self.connect.reset_after_success();
                    }
                    Err(_) => {
                        self.connect.status = Some(FormStatus::failure("Connect failed."));
                    }
                }
            }
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }

        if key.modifiers.contains(KeyModifiers::CONTROL) {
            match key.code {
                KeyCode::Char('c') => self.should_quit = true,
                KeyCode::Char('e') => self.export_log(),
                KeyCode::Char('l') => self.log.clear(),
                KeyCode::Char('t') => self.connect.set_timestamp_now(),
                _ => {}
            }
            return;
        }

        match key.code {
            KeyCode::Esc => self.should_quit = true,
            KeyCode::Tab => self.focus = self.focus.next(),
            KeyCode::BackTab => self.focus = self.focus.prev(),
            KeyCode::Enter => self.submit_focused(),
            KeyCode::Char(' ') if self.focus == Focus::ConnectKeepalive => {
                self.connect.keepalive = !self.connect.keepalive;
            }
            KeyCode::Char(c) => {
                if let Some(buffer) = self.focused_buffer() {
                    buffer.push(c);
                }
            }
            KeyCode::Backspace => {
                if let Some(buffer) = self.focused_buffer() {
                    buffer.pop();
                }
            }
            _ => {}
        }
    }

    fn focused_buffer(&mut self) -> Option<&mut String> {
        match self.focus {
            Focus::GenerateUsers => Some(&mut self.generate.users),
            Focus::GenerateEvents => Some(&mut self.generate.events),
            Focus::ReplayPath => Some(&mut self.replay.path),
            Focus::ConnectImei => Some(&mut self.connect.imei),
            Focus::ConnectX => Some(&mut self.connect.x),
            Focus::ConnectY => Some(&mut self.connect.y),
            Focus::ConnectTimestamp => Some(&mut self.connect.timestamp),
            Focus::ConnectKeepalive => None,
        }
    }

    pub fn handle_mouse(&mut self, mouse: MouseEvent) {
        if mouse.kind != MouseEventKind::Down(MouseButton::Left) {
            return;
        }
        let Some(area) = self.map_area else { return };
        if mouse.column < area.x
            || mouse.row < area.y
            || mouse.column >= area.x + area.width
            || mouse.row >= area.y + area.height
        {
            return;
        }

        // Cell centers, so the middle cell of the widget maps to (200, 200)
        let px = (mouse.column - area.x) as f64 + 0.5;
        let py = (mouse.row - area.y) as f64 + 0.5;
        if let Some(selection) =
            plane_from_click(px, py, area.width as f64, area.height as f64)
        {
            self.apply_selection(selection);
        }
    }

    fn apply_selection(&mut self, selection: MapSelection) {
        self.connect.apply_selection(&selection);
        self.selection = Some(selection);
    }

    pub fn export_log(&mut self) {
        self.status_line = Some(match self.exporter.export(self.log.events()) {
            Ok(path) => format!("Exported {}", path.display()),
            Err(e) => format!("Export failed: {}", e),
        });
    }

    fn submit_focused(&mut self) {
        match self.focus.form() {
            FormKind::Generate => self.submit_generate(),
            FormKind::Replay => self.submit_replay(),
            FormKind::Connect => self.submit_connect(),
        }
    }

    pub fn submit_generate(&mut self) {
        if self.generate.busy {
            return;
        }
        let params = match self.generate.parsed() {
            Ok(params) => params,
            Err(message) => {
                self.generate.status = Some(FormStatus::failure(message));
                return;
            }
        };
        self.generate.begin_submit();

        let backend = self.backend.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let event_tx = tx.clone();
            let mut sink = move |event| {
                let _ = event_tx.send(UiMsg::Event(event));
            };
            let result = backend
                .generate(params.users, params.events, &mut sink)
                .await
                .map_err(|e| e.to_string());
            let _ = tx.send(UiMsg::TaskFinished { form: FormKind::Generate, result });
        });
    }

    pub fn submit_replay(&mut self) {
        if self.replay.busy {
            return;
        }
        let path = match self.replay.parsed() {
            Ok(path) => path,
            Err(message) => {
                self.replay.status = Some(FormStatus::failure(message));
                return;
            }
        };
        self.replay.begin_submit();

        let backend = self.backend.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let file_name = Path::new(&path)
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "replay.csv".to_string());

            let result = match tokio::fs::read(&path).await {
                Ok(bytes) => {
                    let event_tx = tx.clone();
                    let mut sink = move |event| {
                        let _ = event_tx.send(UiMsg::Event(event));
                    };
                    backend
                        .replay(&file_name, bytes, &mut sink)
                        .await
                        .map_err(|e| e.to_string())
                }
                Err(e) => Err(format!("read {}: {}", path, e)),
            };
            let _ = tx.send(UiMsg::TaskFinished { form: FormKind::Replay, result });
        });
    }

    pub fn submit_connect(&mut self) {
        if self.connect.busy {
            return;
        }
        let req = match self.connect.parsed() {
            Ok(req) => req,
            Err(message) => {
                self.connect.status = Some(FormStatus::failure(message));
                return;
            }
        };
        self.connect.begin_submit();

        let backend = self.backend.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = match backend.connect_manual(&req).await {
                Ok(event) => {
                    let _ = tx.send(UiMsg::Event(event));
                    Ok(StreamSummary { records: 1, malformed: 0 })
                }
                Err(e) => Err(e.to_string()),
            };
            let _ = tx.send(UiMsg::TaskFinished { form: FormKind::Connect, result });
        });
    }
}

fn skipped_note(malformed: u64) -> String {
    if malformed > 0 {
        format!(" {} malformed lines skipped.", malformed)
    } else {
        String::new()
    }
}

/// Main panel loop: drain task messages, recompute the projection when the
/// log changed, draw, then poll input for one tick.
pub async fn run(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    mut app: App,
    mut rx: mpsc::UnboundedReceiver<UiMsg>,
) -> anyhow::Result<()> {
    loop {
        while let Ok(msg) = rx.try_recv() {
            app.handle_msg(msg);
        }

        if app.take_dirty() {
            app.projection = project(app.log.events());
        }

        terminal.draw(|f| render::draw(f, &mut app))?;

        if event::poll(app.tick)? {
            match event::read()? {
                Event::Key(key) => app.handle_key(key),
                Event::Mouse(mouse) => app.handle_mouse(mouse),
                _ => {}
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}
