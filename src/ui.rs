use std::io::{self, Stdout};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use crossbeam_channel::{unbounded, Receiver, Sender};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::backend::CrosstermBackend;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::Paragraph;
use ratatui::{Frame, Terminal};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::catalog::{CatalogError, CatalogSource, ContentItem};
use crate::config;
use crate::filter;
use crate::input::{self, TextInput};

const COLOR_NAME: Color = Color::Indexed(205);
const COLOR_YEAR: Color = Color::Indexed(242);
const COLOR_TYPE: Color = Color::Indexed(39);
const COLOR_URL: Color = Color::Indexed(100);
const COLOR_PLACEHOLDER: Color = Color::Indexed(240);
const COLOR_ERROR: Color = Color::Rgb(243, 139, 168);

const BASE_NAME_WIDTH: usize = 20;
const YEAR_WIDTH: usize = 10;
const TYPE_WIDTH: usize = 10;
const URL_EDGE: usize = 10;
const ELLIPSIS: &str = "...";
const LOADING_MARKER: &str = "[Loading...]";
const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub visible_items: usize,
    pub name_step: usize,
    pub truncate_urls: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self::from(&config::UIConfig::default())
    }
}

impl From<&config::UIConfig> for Settings {
    fn from(cfg: &config::UIConfig) -> Self {
        Self {
            visible_items: cfg.visible_items,
            name_step: cfg.name_step.max(1),
            truncate_urls: cfg.truncate_urls,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    Loading,
    Loaded,
    Error(String),
}

#[derive(Debug)]
pub enum Message {
    Key(KeyEvent),
    CatalogLoaded(Vec<ContentItem>),
    CatalogFailed(CatalogError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Everything the view shows. Only [`update`] changes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct State {
    phase: Phase,
    catalog: Vec<ContentItem>,
    filtered: Vec<ContentItem>,
    input: TextInput,
    char_count: usize,
    settings: Settings,
}

impl Default for State {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

impl State {
    pub fn new(settings: Settings) -> Self {
        Self {
            phase: Phase::Loading,
            catalog: Vec::new(),
            filtered: Vec::new(),
            input: TextInput::default(),
            char_count: 0,
            settings,
        }
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn filtered(&self) -> &[ContentItem] {
        &self.filtered
    }

    pub fn filter_text(&self) -> &str {
        self.input.value()
    }

    pub fn char_count(&self) -> usize {
        self.char_count
    }

    fn refilter(&mut self) {
        self.filtered = filter::filter_items(&self.catalog, self.input.value());
    }

    fn visible(&self) -> &[ContentItem] {
        let count = self.settings.visible_items.min(self.filtered.len());
        &self.filtered[..count]
    }

    /// Only shown while the catalog is still on its way.
    fn marker(&self) -> Option<&'static str> {
        match self.phase {
            Phase::Loading => Some(LOADING_MARKER),
            Phase::Loaded | Phase::Error(_) => None,
        }
    }

    pub fn render(&self) -> Text<'static> {
        if let Phase::Error(message) = &self.phase {
            return Text::from(Line::from(Span::styled(
                format!("Error: {message}"),
                Style::default().fg(COLOR_ERROR),
            )));
        }

        let mut lines = vec![self.input_line(), Line::default()];
        let name_width = name_width(self.char_count, self.settings.name_step);
        for item in self.visible() {
            lines.push(item_row(item, name_width, self.settings.truncate_urls));
        }
        if let Some(marker) = self.marker() {
            lines.push(Line::default());
            lines.push(Line::from(marker));
        }
        Text::from(lines)
    }

    fn input_line(&self) -> Line<'static> {
        let mut spans = vec![Span::raw(input::PROMPT)];
        if self.input.value().is_empty() {
            spans.push(Span::styled(
                input::PLACEHOLDER,
                Style::default()
                    .fg(COLOR_PLACEHOLDER)
                    .add_modifier(Modifier::ITALIC),
            ));
        } else {
            spans.push(Span::raw(self.input.value().to_string()));
        }
        Line::from(spans)
    }
}

pub fn is_quit_key(key: &KeyEvent) -> bool {
    match key.code {
        KeyCode::Esc | KeyCode::Enter => true,
        KeyCode::Char('c') => key.modifiers.contains(KeyModifiers::CONTROL),
        _ => false,
    }
}

/// Applies one message to the view state.
pub fn update(mut state: State, message: Message) -> (State, Flow) {
    match message {
        Message::Key(key) => {
            if is_quit_key(&key) {
                return (state, Flow::Quit);
            }
            if state.input.handle_key(&key) {
                state.refilter();
            }
            state.char_count = state.input.char_count();
        }
        Message::CatalogLoaded(items) => {
            if matches!(state.phase, Phase::Error(_)) {
                return (state, Flow::Continue);
            }
            state.catalog = items;
            state.phase = Phase::Loaded;
            state.refilter();
        }
        Message::CatalogFailed(err) => {
            tracing::warn!(error = %err, "catalog load failed");
            state.phase = Phase::Error(err.to_string());
        }
    }
    (state, Flow::Continue)
}

pub fn name_width(char_count: usize, step: usize) -> usize {
    let step = step.max(1);
    BASE_NAME_WIDTH + (char_count / step) * step
}

/// Pads `name` to exactly `width` columns, cutting it with `...` when too long.
pub fn fit_name(name: &str, width: usize) -> String {
    let current = UnicodeWidthStr::width(name);
    if current <= width {
        let mut padded = name.to_string();
        padded.push_str(&" ".repeat(width - current));
        return padded;
    }

    let budget = width.saturating_sub(ELLIPSIS.len());
    let mut out = String::new();
    let mut used = 0;
    for ch in name.chars() {
        let w = UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + w > budget {
            break;
        }
        out.push(ch);
        used += w;
    }
    out.push_str(&" ".repeat(budget - used));
    out.push_str(ELLIPSIS);
    out
}

pub fn shorten_url(url: &str) -> String {
    let chars: Vec<char> = url.chars().collect();
    if chars.len() <= URL_EDGE * 2 + ELLIPSIS.len() {
        return url.to_string();
    }
    let head: String = chars[..URL_EDGE].iter().collect();
    let tail: String = chars[chars.len() - URL_EDGE..].iter().collect();
    format!("{head}{ELLIPSIS}{tail}")
}

fn item_row(item: &ContentItem, name_width: usize, truncate_urls: bool) -> Line<'static> {
    let url = if truncate_urls {
        shorten_url(&item.url)
    } else {
        item.url.clone()
    };
    Line::from(vec![
        Span::styled(fit_name(&item.name, name_width), Style::default().fg(COLOR_NAME)),
        Span::raw(" | "),
        Span::styled(
            format!("{:>width$}", item.year, width = YEAR_WIDTH),
            Style::default().fg(COLOR_YEAR),
        ),
        Span::raw(" | "),
        Span::styled(
            format!("{:<width$}", item.kind, width = TYPE_WIDTH),
            Style::default().fg(COLOR_TYPE),
        ),
        Span::raw(" | URL: "),
        Span::styled(url, Style::default().fg(COLOR_URL)),
    ])
}

pub fn draw(frame: &mut Frame<'_>, state: &State) {
    let area = frame.size();
    frame.render_widget(Paragraph::new(state.render()), area);

    if !matches!(state.phase, Phase::Error(_)) && area.height > 0 {
        let x = UnicodeWidthStr::width(input::PROMPT) + state.input.cursor_width();
        let x = (x as u16).min(area.width.saturating_sub(1));
        frame.set_cursor(area.x + x, area.y);
    }
}

#[derive(Clone)]
pub struct Options {
    pub source: Arc<dyn CatalogSource>,
    pub settings: Settings,
}

struct PendingCatalog {
    cancel_flag: Arc<AtomicBool>,
}

pub struct Model {
    state: State,
    source: Arc<dyn CatalogSource>,
    pending: Option<PendingCatalog>,
    response_tx: Sender<Message>,
    response_rx: Receiver<Message>,
    needs_redraw: bool,
}

impl Model {
    pub fn new(opts: Options) -> Self {
        let (response_tx, response_rx) = unbounded();
        Self {
            state: State::new(opts.settings),
            source: opts.source,
            pending: None,
            response_tx,
            response_rx,
            needs_redraw: true,
        }
    }

    pub fn run(&mut self) -> Result<()> {
        let mut stdout = io::stdout();
        enable_raw_mode().context("enable raw mode")?;
        stdout
            .execute(EnterAlternateScreen)
            .context("enter alternate screen")?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).context("initialize terminal")?;
        terminal.clear()?;

        self.start_catalog_fetch();
        let result = self.event_loop(&mut terminal);
        self.cancel_pending();

        disable_raw_mode()?;
        terminal.backend_mut().execute(LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    fn start_catalog_fetch(&mut self) {
        self.cancel_pending();
        let cancel_flag = Arc::new(AtomicBool::new(false));
        let flag = cancel_flag.clone();
        let source = self.source.clone();
        let tx = self.response_tx.clone();
        thread::spawn(move || {
            let message = match source.fetch_catalog() {
                Ok(items) => Message::CatalogLoaded(items),
                Err(err) => Message::CatalogFailed(err),
            };
            if !flag.load(Ordering::SeqCst) {
                let _ = tx.send(message);
            }
        });
        self.pending = Some(PendingCatalog { cancel_flag });
    }

    fn cancel_pending(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.cancel_flag.store(true, Ordering::SeqCst);
        }
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        loop {
            if self.poll_async() == Flow::Quit {
                break;
            }

            if self.needs_redraw {
                terminal.draw(|frame| draw(frame, &self.state))?;
                self.needs_redraw = false;
            }

            if event::poll(POLL_INTERVAL)? {
                match event::read()? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => {
                        if self.dispatch(Message::Key(key)) == Flow::Quit {
                            break;
                        }
                    }
                    Event::Resize(_, _) => self.needs_redraw = true,
                    _ => {}
                }
            }
        }

        Ok(())
    }

    fn poll_async(&mut self) -> Flow {
        while let Ok(message) = self.response_rx.try_recv() {
            let cancelled = self
                .pending
                .as_ref()
                .map_or(true, |pending| pending.cancel_flag.load(Ordering::SeqCst));
            if cancelled {
                continue;
            }
            self.pending = None;
            if self.dispatch(message) == Flow::Quit {
                return Flow::Quit;
            }
        }
        Flow::Continue
    }

    fn dispatch(&mut self, message: Message) -> Flow {
        let (state, flow) = update(std::mem::take(&mut self.state), message);
        self.state = state;
        self.needs_redraw = true;
        flow
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::backend::TestBackend;

    fn key(code: KeyCode) -> Message {
        Message::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn item(name: &str, year: i64, kind: &str, url: &str) -> ContentItem {
        ContentItem {
            name: name.into(),
            year,
            kind: kind.into(),
            url: url.into(),
        }
    }

    fn catalog(count: usize) -> Vec<ContentItem> {
        (0..count)
            .map(|idx| item(&format!("Item {idx:02}"), 2000, "movie", "https://x"))
            .collect()
    }

    fn decode_error() -> CatalogError {
        CatalogError::Decode(serde_json::from_str::<Vec<ContentItem>>("{oops").unwrap_err())
    }

    fn type_text(mut state: State, text: &str) -> State {
        for ch in text.chars() {
            let (next, flow) = update(state, key(KeyCode::Char(ch)));
            assert_eq!(flow, Flow::Continue);
            state = next;
        }
        state
    }

    fn plain(text: &Text<'_>) -> Vec<String> {
        text.lines
            .iter()
            .map(|line| line.spans.iter().map(|s| s.content.as_ref()).collect())
            .collect()
    }

    #[test]
    fn starts_loading_with_marker() {
        let state = State::default();
        assert_eq!(state.phase(), &Phase::Loading);
        let lines = plain(&state.render());
        assert_eq!(lines[0], format!("> {}", input::PLACEHOLDER));
        assert_eq!(lines.last().unwrap(), LOADING_MARKER);
    }

    #[test]
    fn quit_keys_end_the_loop_from_every_phase() {
        let loaded = update(State::default(), Message::CatalogLoaded(catalog(2))).0;
        let failed = update(State::default(), Message::CatalogFailed(decode_error())).0;
        for state in [State::default(), loaded, failed] {
            for quit in [
                KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE),
                KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE),
                KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL),
            ] {
                let (_, flow) = update(state.clone(), Message::Key(quit));
                assert_eq!(flow, Flow::Quit);
            }
        }
    }

    #[test]
    fn plain_c_is_not_a_quit_key() {
        let (state, flow) = update(State::default(), key(KeyCode::Char('c')));
        assert_eq!(flow, Flow::Continue);
        assert_eq!(state.filter_text(), "c");
    }

    #[test]
    fn typing_before_load_is_applied_once_loaded() {
        let state = type_text(State::default(), "al");
        assert_eq!(state.char_count(), 2);
        assert!(state.filtered().is_empty());
        let items = vec![
            item("alpha", 1, "t", "u"),
            item("Zeta", 2, "t", "u"),
            item("Alloy", 3, "t", "u"),
        ];
        let (state, _) = update(state, Message::CatalogLoaded(items));
        assert_eq!(state.phase(), &Phase::Loaded);
        let names: Vec<_> = state.filtered().iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, ["alpha", "Alloy"]);
    }

    #[test]
    fn backspace_widens_the_filter() {
        let state = update(State::default(), Message::CatalogLoaded(catalog(3))).0;
        let state = type_text(state, "01");
        assert_eq!(state.filtered().len(), 1);
        let (state, _) = update(state, key(KeyCode::Backspace));
        assert_eq!(state.filter_text(), "0");
        assert_eq!(state.filtered().len(), 3);
        assert_eq!(state.char_count(), 1);
    }

    #[test]
    fn error_renders_only_the_message() {
        let (state, flow) = update(State::default(), Message::CatalogFailed(decode_error()));
        assert_eq!(flow, Flow::Continue);
        assert!(matches!(state.phase(), Phase::Error(_)));
        let lines = plain(&state.render());
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("Error: decode catalog"));

        let state = type_text(state, "x");
        assert_eq!(plain(&state.render()).len(), 1);
        let (state, _) = update(state, Message::CatalogLoaded(catalog(1)));
        assert!(matches!(state.phase(), Phase::Error(_)));
    }

    #[test]
    fn loaded_list_shows_visible_window_without_marker() {
        let state = update(State::default(), Message::CatalogLoaded(catalog(12))).0;
        assert_eq!(state.phase(), &Phase::Loaded);
        let lines = plain(&state.render());
        // input, blank, ten rows
        assert_eq!(lines.len(), 12);
        assert!(lines[11].starts_with("Item 09"));
        assert!(lines.iter().all(|line| !line.starts_with('[')));

        let state = update(State::default(), Message::CatalogLoaded(catalog(3))).0;
        let lines = plain(&state.render());
        assert_eq!(lines.len(), 5);
        assert!(lines.iter().all(|line| !line.starts_with('[')));
    }

    /// Hands out its result only after the gate is opened.
    struct GatedSource {
        gate: Receiver<()>,
        fail: bool,
    }

    impl CatalogSource for GatedSource {
        fn fetch_catalog(&self) -> Result<Vec<ContentItem>, CatalogError> {
            let _ = self.gate.recv();
            if self.fail {
                Err(decode_error())
            } else {
                Ok(catalog(3))
            }
        }
    }

    fn gated_model(fail: bool) -> (Model, Sender<()>) {
        let (open, gate) = unbounded();
        let model = Model::new(Options {
            source: Arc::new(GatedSource { gate, fail }),
            settings: Settings::default(),
        });
        (model, open)
    }

    fn poll_until_settled(model: &mut Model) {
        for _ in 0..200 {
            assert_eq!(model.poll_async(), Flow::Continue);
            if model.state.phase() != &Phase::Loading {
                return;
            }
            thread::sleep(Duration::from_millis(10));
        }
    }

    #[test]
    fn background_fetch_delivers_catalog_into_the_loop() {
        let (mut model, open) = gated_model(false);
        model.start_catalog_fetch();
        assert_eq!(model.poll_async(), Flow::Continue);
        assert_eq!(model.state.phase(), &Phase::Loading);

        open.send(()).unwrap();
        poll_until_settled(&mut model);
        assert_eq!(model.state.phase(), &Phase::Loaded);
        assert_eq!(model.state.filtered().len(), 3);
        assert!(model.pending.is_none());
    }

    #[test]
    fn background_fetch_failure_moves_to_error() {
        let (mut model, open) = gated_model(true);
        model.start_catalog_fetch();
        open.send(()).unwrap();
        poll_until_settled(&mut model);
        assert!(matches!(model.state.phase(), Phase::Error(_)));
    }

    #[test]
    fn cancelled_fetch_result_is_dropped() {
        let (mut model, open) = gated_model(false);
        model.start_catalog_fetch();
        model.cancel_pending();
        open.send(()).unwrap();
        thread::sleep(Duration::from_millis(100));
        assert_eq!(model.poll_async(), Flow::Continue);
        assert_eq!(model.state.phase(), &Phase::Loading);
        assert!(model.state.filtered().is_empty());
    }

    #[test]
    fn row_layout_and_colors() {
        let items = vec![item("Alien", 1979, "movie", "https://example.com/alien")];
        let state = update(State::default(), Message::CatalogLoaded(items)).0;
        let text = state.render();
        let row = &text.lines[2];
        let content: String = row.spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(
            content,
            format!(
                "{:<20} | {:>10} | {:<10} | URL: https://example.com/alien",
                "Alien", 1979, "movie"
            )
        );
        let colors: Vec<_> = row.spans.iter().filter_map(|s| s.style.fg).collect();
        assert_eq!(colors, [COLOR_NAME, COLOR_YEAR, COLOR_TYPE, COLOR_URL]);
    }

    #[test]
    fn name_column_grows_with_input_in_steps() {
        assert_eq!(name_width(0, 5), 20);
        assert_eq!(name_width(4, 5), 20);
        assert_eq!(name_width(5, 5), 25);
        assert_eq!(name_width(12, 10), 30);
        assert_eq!(name_width(3, 0), 23);
    }

    #[test]
    fn fit_name_pads_and_truncates() {
        assert_eq!(fit_name("abc", 6), "abc   ");
        assert_eq!(fit_name("abcdefghij", 6), "abc...");
        assert_eq!(fit_name("abcdef", 6), "abcdef");
        let wide = fit_name("🦀🦀🦀🦀", 6);
        assert_eq!(UnicodeWidthStr::width(wide.as_str()), 6);
        assert!(wide.ends_with(ELLIPSIS));
    }

    #[test]
    fn shorten_url_keeps_both_ends() {
        assert_eq!(shorten_url("https://a.b"), "https://a.b");
        assert_eq!(
            shorten_url("https://example.com/some/long/path.mp4"),
            "https://ex...g/path.mp4"
        );
    }

    #[test]
    fn truncated_urls_when_enabled() {
        let settings = Settings {
            truncate_urls: true,
            ..Settings::default()
        };
        let items = vec![item("A", 1, "t", "https://example.com/some/long/path.mp4")];
        let state = update(State::new(settings), Message::CatalogLoaded(items)).0;
        let text = state.render();
        let url = text.lines[2].spans.last().unwrap().content.to_string();
        assert_eq!(url, "https://ex...g/path.mp4");
    }

    #[test]
    fn draws_into_a_terminal_buffer() {
        let items = vec![item("Alien", 1979, "movie", "https://a")];
        let state = update(State::default(), Message::CatalogLoaded(items)).0;
        let state = type_text(state, "ali");
        let mut terminal = Terminal::new(TestBackend::new(80, 6)).unwrap();
        terminal.draw(|frame| draw(frame, &state)).unwrap();
        let buffer = terminal.backend().buffer();
        let row = |y: u16| -> String { (0..80).map(|x| buffer.get(x, y).symbol()).collect() };
        assert!(row(0).starts_with("> ali"));
        assert!(row(2).starts_with("Alien"));
        assert!(row(2).contains("URL: https://a"));
    }
}
