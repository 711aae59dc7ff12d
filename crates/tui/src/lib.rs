use std::io::{self, Stdout};
use std::time::{Duration, Instant};

use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers,
};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState};
use ratatui::{Frame, Terminal};
use shelf_core::browser::{
    BrowserError, DeletePrompt, DisplaySurface, FormSession, TableBrowser, TableView,
};
use shelf_core::catalog::TableCatalog;
use shelf_core::notice::{Notice, NoticeId};
use shelf_core::settings::BrowserSettings;
use shelf_core::store::RecordStore;
use thiserror::Error;
use tokio::runtime::Runtime;
use tracing::{debug, info, warn};

const TICK_RATE: Duration = Duration::from_millis(120);

#[derive(Debug, Error)]
pub enum TuiError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

/// What the terminal currently shows; the browser pushes every change here.
#[derive(Debug, Default)]
pub struct TuiSurface {
    view: Option<TableView>,
    selection: Option<usize>,
    form: Option<FormSession>,
    notice: Option<Notice>,
    delete_prompt: Option<DeletePrompt>,
}

impl TuiSurface {
    #[must_use]
    pub fn view(&self) -> Option<&TableView> {
        self.view.as_ref()
    }

    #[must_use]
    pub fn selection(&self) -> Option<usize> {
        self.selection
    }

    #[must_use]
    pub fn form(&self) -> Option<&FormSession> {
        self.form.as_ref()
    }

    #[must_use]
    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    #[must_use]
    pub fn delete_prompt(&self) -> Option<&DeletePrompt> {
        self.delete_prompt.as_ref()
    }
}

impl DisplaySurface for TuiSurface {
    fn show_rows(&mut self, view: &TableView) {
        self.view = Some(view.clone());
    }

    fn show_selection(&mut self, index: Option<usize>) {
        self.selection = index;
    }

    fn show_form(&mut self, form: &FormSession) {
        self.form = Some(form.clone());
    }

    fn close_form(&mut self) {
        self.form = None;
    }

    fn show_notice(&mut self, notice: &Notice) {
        self.notice = Some(notice.clone());
    }

    fn dismiss_notice(&mut self, id: NoticeId) {
        if self.notice.as_ref().is_some_and(|notice| notice.id == id) {
            self.notice = None;
        }
    }

    fn show_delete_prompt(&mut self, prompt: Option<&DeletePrompt>) {
        self.delete_prompt = prompt.cloned();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Focus {
    Sidebar,
    Rows,
    Search,
}

impl Focus {
    fn next(self) -> Self {
        match self {
            Self::Sidebar => Self::Rows,
            Self::Rows | Self::Search => Self::Sidebar,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Sidebar => "Tables",
            Self::Rows => "Records",
            Self::Search => "Search",
        }
    }
}

/// How key presses are read: commands, free text, or a yes/no answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputMode {
    Browse,
    Text,
    Confirm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DirectionKey {
    Up,
    Down,
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Msg {
    Quit,
    ToggleHelp,
    NextFocus,
    PreviousFocus,
    Navigate(DirectionKey),
    Submit,
    StartSearch,
    ClearSearch,
    Create,
    Edit,
    Delete,
    Confirm,
    Cancel,
    Input(char),
    Backspace,
    Tick,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct SidebarEntry {
    category: String,
    table: String,
}

struct TuiApp<S: RecordStore> {
    browser: TableBrowser<S, TuiSurface>,
    runtime: Runtime,
    sidebar: Vec<SidebarEntry>,
    sidebar_index: usize,
    focus: Focus,
    search_input: String,
    show_help: bool,
    should_quit: bool,
}

impl<S: RecordStore + Sync> TuiApp<S> {
    fn new(
        open_store: impl FnOnce() -> S,
        catalog: TableCatalog,
        settings: BrowserSettings,
    ) -> Result<Self, TuiError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        // Store clients may spawn background tasks when built.
        let store = {
            let _guard = runtime.enter();
            open_store()
        };
        let sidebar = catalog
            .categories()
            .into_iter()
            .flat_map(|category| {
                category.tables.into_iter().map(move |table| SidebarEntry {
                    category: category.name.to_string(),
                    table: table.name.clone(),
                })
            })
            .collect::<Vec<_>>();
        let sidebar_index = sidebar
            .iter()
            .position(|entry| entry.table.eq_ignore_ascii_case(&settings.default_table))
            .unwrap_or(0);

        let mut app = Self {
            browser: TableBrowser::new(store, TuiSurface::default(), catalog, settings),
            runtime,
            sidebar,
            sidebar_index,
            focus: Focus::Rows,
            search_input: String::new(),
            show_help: false,
            should_quit: false,
        };
        let opened = app.runtime.block_on(app.browser.open_default_table());
        log_outcome("open default table", opened);
        Ok(app)
    }

    fn surface(&self) -> &TuiSurface {
        self.browser.surface()
    }

    fn input_mode(&self) -> InputMode {
        if self.browser.pending_delete().is_some() {
            InputMode::Confirm
        } else if self.browser.form().is_some() || self.focus == Focus::Search {
            InputMode::Text
        } else {
            InputMode::Browse
        }
    }

    fn handle(&mut self, msg: Msg) {
        match msg {
            Msg::Tick => {
                self.browser.tick(Instant::now());
                return;
            }
            Msg::Quit => {
                self.should_quit = true;
                return;
            }
            _ => {}
        }
        debug!(?msg, mode = ?self.input_mode(), "key message");

        match self.input_mode() {
            InputMode::Confirm => self.handle_confirm(msg),
            InputMode::Text if self.browser.form().is_some() => self.handle_form(msg),
            InputMode::Text => self.handle_search(msg),
            InputMode::Browse => self.handle_browse(msg),
        }
        self.sync_search_input();
    }

    // Reloads after a save or delete drop the filter; the search line follows the view.
    fn sync_search_input(&mut self) {
        if self.focus == Focus::Search {
            return;
        }
        let filtered = self
            .surface()
            .view()
            .is_some_and(|view| view.search_term.is_some());
        if !filtered {
            self.search_input.clear();
        }
    }

    fn handle_browse(&mut self, msg: Msg) {
        if self.show_help {
            if matches!(msg, Msg::ToggleHelp | Msg::Cancel) {
                self.show_help = false;
            }
            return;
        }

        match msg {
            Msg::ToggleHelp => self.show_help = true,
            Msg::NextFocus | Msg::PreviousFocus => self.focus = self.focus.next(),
            Msg::Navigate(direction) => self.navigate(direction),
            Msg::Submit => self.submit_browse(),
            Msg::StartSearch => self.focus = Focus::Search,
            Msg::ClearSearch => {
                self.search_input.clear();
                let cleared = self.runtime.block_on(self.browser.clear_search());
                log_outcome("clear search", cleared);
            }
            Msg::Create => {
                let opened = self.browser.open_create_form();
                log_outcome("open create form", opened);
            }
            Msg::Edit => {
                let opened = self.browser.open_edit_form();
                log_outcome("open edit form", opened);
            }
            Msg::Delete => {
                let requested = self.runtime.block_on(self.browser.request_delete());
                log_outcome("request delete", requested);
            }
            Msg::Quit
            | Msg::Confirm
            | Msg::Cancel
            | Msg::Input(_)
            | Msg::Backspace
            | Msg::Tick => {}
        }
    }

    fn handle_search(&mut self, msg: Msg) {
        match msg {
            Msg::Input(ch) => self.search_input.push(ch),
            Msg::Backspace => {
                self.search_input.pop();
            }
            Msg::Submit => {
                let term = self.search_input.clone();
                let searched = self.runtime.block_on(self.browser.search(&term));
                log_outcome("search", searched);
                self.focus = Focus::Rows;
            }
            Msg::Cancel | Msg::NextFocus | Msg::PreviousFocus => self.focus = Focus::Rows,
            _ => {}
        }
    }

    fn handle_form(&mut self, msg: Msg) {
        let edited = match msg {
            Msg::Input(ch) => self.browser.edit_form(|fields| fields.push_char(ch)),
            Msg::Backspace => self.browser.edit_form(|fields| fields.pop_char()),
            Msg::NextFocus | Msg::Navigate(DirectionKey::Down) => {
                self.browser.edit_form(|fields| fields.focus_next())
            }
            Msg::PreviousFocus | Msg::Navigate(DirectionKey::Up) => {
                self.browser.edit_form(|fields| fields.focus_previous())
            }
            Msg::Submit => {
                let submitted = self.runtime.block_on(self.browser.submit_form());
                log_outcome("submit form", submitted);
                Ok(())
            }
            Msg::Cancel => {
                self.browser.close_form();
                Ok(())
            }
            _ => Ok(()),
        };
        log_outcome("edit form", edited);
    }

    fn handle_confirm(&mut self, msg: Msg) {
        match msg {
            Msg::Confirm => {
                let deleted = self.runtime.block_on(self.browser.confirm_delete());
                log_outcome("confirm delete", deleted);
            }
            Msg::Cancel => self.browser.cancel_delete(),
            _ => {}
        }
    }

    fn navigate(&mut self, direction: DirectionKey) {
        match (self.focus, direction) {
            (_, DirectionKey::Left) => self.focus = Focus::Sidebar,
            (_, DirectionKey::Right) => self.focus = Focus::Rows,
            (Focus::Sidebar, DirectionKey::Up) => {
                self.sidebar_index = self.sidebar_index.saturating_sub(1);
            }
            (Focus::Sidebar, DirectionKey::Down) => {
                let last = self.sidebar.len().saturating_sub(1);
                self.sidebar_index = (self.sidebar_index + 1).min(last);
            }
            (Focus::Rows | Focus::Search, DirectionKey::Up) => {
                self.browser.step_selection(false);
            }
            (Focus::Rows | Focus::Search, DirectionKey::Down) => {
                self.browser.step_selection(true);
            }
        }
    }

    fn submit_browse(&mut self) {
        match self.focus {
            Focus::Sidebar => {
                let Some(entry) = self.sidebar.get(self.sidebar_index) else {
                    return;
                };
                let table = entry.table.clone();
                let shown = self.runtime.block_on(self.browser.show_table(&table));
                if shown.is_ok() {
                    self.search_input.clear();
                    self.focus = Focus::Rows;
                }
                log_outcome("show table", shown);
            }
            Focus::Rows if self.browser.selection().is_none() => {
                self.browser.step_selection(true);
            }
            Focus::Rows => {
                let opened = self.browser.open_edit_form();
                log_outcome("open edit form", opened);
            }
            Focus::Search => {}
        }
    }

    fn close_store(&self) {
        if let Err(error) = self.runtime.block_on(self.browser.store().close()) {
            warn!(%error, "failed to close the store");
        }
    }
}

// Failures were already shown by the browser; only the log needs them.
fn log_outcome<T>(action: &str, outcome: Result<T, BrowserError>) {
    if let Err(error) = outcome {
        debug!(action, %error, "browser operation failed");
    }
}

#[must_use]
pub fn ui_name() -> &'static str {
    "shelf-tui"
}

/// Runs the record browser until the user quits, then closes the store.
pub fn run<S: RecordStore + Sync>(
    open_store: impl FnOnce() -> S,
    catalog: TableCatalog,
    settings: BrowserSettings,
) -> Result<(), TuiError> {
    let mut app = TuiApp::new(open_store, catalog, settings)?;
    info!(tables = app.sidebar.len(), "starting terminal ui");

    let mut terminal = setup_terminal()?;
    let run_result = run_loop(&mut terminal, &mut app);
    let restore_result = restore_terminal(&mut terminal);
    app.close_store();

    if let Err(error) = run_result {
        restore_result?;
        return Err(error);
    }

    restore_result?;
    Ok(())
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>, TuiError> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<(), TuiError> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}

fn run_loop<S: RecordStore + Sync>(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    app: &mut TuiApp<S>,
) -> Result<(), TuiError> {
    let mut last_tick = Instant::now();

    loop {
        terminal.draw(|frame| render(frame, app))?;

        let timeout = TICK_RATE
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    if let Some(message) = map_key_event(app.input_mode(), key) {
                        app.handle(message);
                    }
                }
            }
        }

        if last_tick.elapsed() >= TICK_RATE {
            app.handle(Msg::Tick);
            last_tick = Instant::now();
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}

fn render<S: RecordStore + Sync>(frame: &mut Frame<'_>, app: &TuiApp<S>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(8),
            Constraint::Length(4),
        ])
        .split(frame.area());

    render_header(frame, app, chunks[0]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(24), Constraint::Min(20)])
        .split(chunks[1]);
    render_sidebar(frame, app, body[0]);

    let main = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(3)])
        .split(body[1]);
    render_search(frame, app, main[0]);
    render_rows(frame, app, main[1]);

    render_footer(frame, app, chunks[2]);

    if let Some(form) = app.surface().form() {
        render_form_popup(frame, form);
    }
    if let Some(prompt) = app.surface().delete_prompt() {
        render_confirm_popup(frame, prompt);
    }
    if app.show_help {
        render_help_popup(frame);
    }
}

fn focus_block(title: &str, focused: bool) -> Block<'_> {
    let style = if focused {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };
    Block::default()
        .borders(Borders::ALL)
        .border_style(style)
        .title(title)
}

fn render_header<S: RecordStore + Sync>(frame: &mut Frame<'_>, app: &TuiApp<S>, area: Rect) {
    let view = app.surface().view();
    let rows = view.map_or_else(
        || "-".to_string(),
        |view| format!("{} of {}", view.rows.len(), view.total_rows),
    );
    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            format!(" Table: {} ", app.browser.active_table().unwrap_or("none")),
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" | "),
        Span::raw(format!("Rows: {rows}")),
        Span::raw(" | "),
        Span::raw(format!(
            "Search: {}",
            view.and_then(|view| view.search_term.as_deref())
                .unwrap_or("off")
        )),
        Span::raw(" | "),
        Span::raw(format!("Focus: {}", app.focus.name())),
    ]))
    .block(Block::default().borders(Borders::ALL).title("Shelf"));
    frame.render_widget(header, area);
}

fn render_sidebar<S: RecordStore + Sync>(frame: &mut Frame<'_>, app: &TuiApp<S>, area: Rect) {
    let mut lines = Vec::new();
    let mut current_category: Option<&str> = None;
    for (index, entry) in app.sidebar.iter().enumerate() {
        if current_category != Some(entry.category.as_str()) {
            current_category = Some(entry.category.as_str());
            lines.push(Line::from(Span::styled(
                entry.category.clone(),
                Style::default().add_modifier(Modifier::BOLD),
            )));
        }
        let marker = if index == app.sidebar_index { ">" } else { " " };
        let style = if app.browser.active_table() == Some(entry.table.as_str()) {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default()
        };
        lines.push(Line::from(Span::styled(
            format!("{marker} {}", entry.table),
            style,
        )));
    }

    let sidebar =
        Paragraph::new(lines).block(focus_block("Tables", app.focus == Focus::Sidebar));
    frame.render_widget(sidebar, area);
}

fn render_search<S: RecordStore + Sync>(frame: &mut Frame<'_>, app: &TuiApp<S>, area: Rect) {
    let editing = app.focus == Focus::Search;
    let text = if editing {
        format!("/{}_", app.search_input)
    } else if app.search_input.is_empty() {
        "Press / to search".to_string()
    } else {
        format!("/{}", app.search_input)
    };
    let search = Paragraph::new(text).block(focus_block("Search", editing));
    frame.render_widget(search, area);
}

fn render_rows<S: RecordStore + Sync>(frame: &mut Frame<'_>, app: &TuiApp<S>, area: Rect) {
    let block = focus_block("Records", app.focus == Focus::Rows);
    let Some(view) = app.surface().view() else {
        let empty = Paragraph::new("Select a table from the sidebar.")
            .block(block)
            .alignment(Alignment::Center);
        frame.render_widget(empty, area);
        return;
    };

    if let Some(message) = view.empty_message() {
        let empty = Paragraph::new(message)
            .block(block)
            .alignment(Alignment::Center);
        frame.render_widget(empty, area);
        return;
    }

    let header = Row::new(
        view.columns
            .iter()
            .map(|column| Cell::from(column.as_str()))
            .collect::<Vec<_>>(),
    )
    .style(Style::default().add_modifier(Modifier::BOLD));
    let rows = view.rows.iter().map(|record| {
        Row::new(
            record
                .values
                .iter()
                .map(|value| Cell::from(value.as_str()))
                .collect::<Vec<_>>(),
        )
    });
    let widths = vec![Constraint::Fill(1); view.columns.len().max(1)];
    let table = Table::new(rows, widths)
        .header(header)
        .block(block)
        .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED));

    let mut state = TableState::default();
    state.select(app.surface().selection());
    frame.render_stateful_widget(table, area, &mut state);
}

fn notice_style(notice: &Notice) -> Style {
    if notice.is_error() {
        Style::default().fg(Color::Red)
    } else {
        Style::default().fg(Color::Green)
    }
}

fn render_footer<S: RecordStore + Sync>(frame: &mut Frame<'_>, app: &TuiApp<S>, area: Rect) {
    let hints = match app.input_mode() {
        InputMode::Confirm => "y: delete | n/Esc: keep",
        InputMode::Text if app.browser.form().is_some() => {
            "Enter: save | Tab/arrows: field | Esc: close"
        }
        InputMode::Text => "Enter: search | Esc: back",
        InputMode::Browse => {
            "Enter: open | /: search | x: clear | n: new | e: edit | d: delete | ?: help | q: quit"
        }
    };
    let status = app.surface().notice().map_or_else(
        || Line::from("Status: ready"),
        |notice| {
            Line::from(Span::styled(
                format!("Status: {}", notice.text),
                notice_style(notice),
            ))
        },
    );
    let footer = Paragraph::new(vec![Line::from(hints), status])
        .block(Block::default().borders(Borders::ALL).title("Keys"));
    frame.render_widget(footer, area);
}

fn render_form_popup(frame: &mut Frame<'_>, form: &FormSession) {
    let area = centered_rect(60, 70, frame.area());
    frame.render_widget(Clear, area);

    let mut lines = Vec::with_capacity(form.fields.len() + 3);
    for (index, field) in form.fields.fields().iter().enumerate() {
        let marker = if index == form.fields.focused_index() {
            ">"
        } else {
            " "
        };
        let line = if field.locked {
            Line::from(Span::styled(
                format!("{marker} {}: {} (key)", field.label, field.value),
                Style::default().fg(Color::DarkGray),
            ))
        } else {
            Line::from(format!("{marker} {}: {}", field.label, field.value))
        };
        lines.push(line);
    }
    lines.push(Line::from(""));
    if let Some(notice) = &form.notice {
        lines.push(Line::from(Span::styled(
            notice.text.clone(),
            notice_style(notice),
        )));
    }

    let popup = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(form.title()),
    );
    frame.render_widget(popup, area);
}

fn render_confirm_popup(frame: &mut Frame<'_>, prompt: &DeletePrompt) {
    let area = centered_rect(50, 20, frame.area());
    frame.render_widget(Clear, area);
    let popup = Paragraph::new(vec![
        Line::from(prompt.question()),
        Line::from(""),
        Line::from("y: delete    n / Esc: keep"),
    ])
    .alignment(Alignment::Center)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Red))
            .title("Confirm delete"),
    );
    frame.render_widget(popup, area);
}

fn render_help_popup(frame: &mut Frame<'_>) {
    let area = centered_rect(70, 60, frame.area());
    frame.render_widget(Clear, area);
    let help = Paragraph::new(vec![
        Line::from("Global keymap"),
        Line::from("q: quit"),
        Line::from("?: toggle help"),
        Line::from("Tab: switch between tables and records"),
        Line::from("Arrows or hjkl: navigation"),
        Line::from("Enter: open table, select record, or edit selection"),
        Line::from("/: search the current table, x: clear search"),
        Line::from("n: new record, e: edit record, d: delete record"),
        Line::from("In forms: type to edit, Tab to move, Enter to save, Esc to close"),
    ])
    .block(Block::default().borders(Borders::ALL).title("Help"));
    frame.render_widget(help, area);
}

fn centered_rect(width_percent: u16, height_percent: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100_u16 - height_percent) / 2),
            Constraint::Percentage(height_percent),
            Constraint::Percentage((100_u16 - height_percent) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100_u16 - width_percent) / 2),
            Constraint::Percentage(width_percent),
            Constraint::Percentage((100_u16 - width_percent) / 2),
        ])
        .split(vertical[1])[1]
}

fn map_key_event(mode: InputMode, key: KeyEvent) -> Option<Msg> {
    if key.modifiers == KeyModifiers::CONTROL && key.code == KeyCode::Char('c') {
        return Some(Msg::Quit);
    }

    match mode {
        InputMode::Confirm => match key.code {
            KeyCode::Char('y' | 'Y') => Some(Msg::Confirm),
            KeyCode::Char('n' | 'N') | KeyCode::Esc => Some(Msg::Cancel),
            _ => None,
        },
        InputMode::Text => match key.code {
            KeyCode::Esc => Some(Msg::Cancel),
            KeyCode::Enter => Some(Msg::Submit),
            KeyCode::Tab => Some(Msg::NextFocus),
            KeyCode::BackTab => Some(Msg::PreviousFocus),
            KeyCode::Up => Some(Msg::Navigate(DirectionKey::Up)),
            KeyCode::Down => Some(Msg::Navigate(DirectionKey::Down)),
            KeyCode::Backspace => Some(Msg::Backspace),
            KeyCode::Char(ch) => Some(Msg::Input(ch)),
            _ => None,
        },
        InputMode::Browse => match key.code {
            KeyCode::Char('q') => Some(Msg::Quit),
            KeyCode::Char('?') => Some(Msg::ToggleHelp),
            KeyCode::Tab => Some(Msg::NextFocus),
            KeyCode::BackTab => Some(Msg::PreviousFocus),
            KeyCode::Enter => Some(Msg::Submit),
            KeyCode::Esc => Some(Msg::Cancel),
            KeyCode::Char('/') => Some(Msg::StartSearch),
            KeyCode::Char('x') => Some(Msg::ClearSearch),
            KeyCode::Char('n') => Some(Msg::Create),
            KeyCode::Char('e') => Some(Msg::Edit),
            KeyCode::Char('d') => Some(Msg::Delete),
            KeyCode::Up | KeyCode::Char('k') => Some(Msg::Navigate(DirectionKey::Up)),
            KeyCode::Down | KeyCode::Char('j') => Some(Msg::Navigate(DirectionKey::Down)),
            KeyCode::Left | KeyCode::Char('h') => Some(Msg::Navigate(DirectionKey::Left)),
            KeyCode::Right | KeyCode::Char('l') => Some(Msg::Navigate(DirectionKey::Right)),
            _ => None,
        },
    }
}
