use crate::display::{self, GoalDisplay};
use crate::model::{validate_goal_input, Goal, GoalFile, GoalId};
use crate::storage::{parse_document, save_goals, GoalsLocation, GoalsScope};
use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::{Alignment, Color, Modifier, Rect, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use ratatui::Terminal;
use std::fs;
use std::io::{stdout, Stdout, Write};
use std::path::PathBuf;
use std::time::{Duration, Instant};

const TICK_INTERVAL: Duration = Duration::from_secs(1);

pub fn run(
    file: Option<GoalFile>,
    location: GoalsLocation,
    startup_error: Option<String>,
) -> Result<()> {
    let mut terminal = setup_terminal()?;
    let mut app = App::new(file, location, startup_error);
    let result = app.event_loop(&mut terminal);
    teardown_terminal(&mut terminal)?;
    result
}

struct App {
    file: GoalFile,
    location: GoalsLocation,
    columns: Vec<GoalColumn>,
    selected: usize,
    status: String,
    mode: Mode,
    tick_state: TickState,
    last_tick: Instant,
}

struct GoalColumn {
    goal: Goal,
    display: GoalDisplay,
    alerted: bool,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
enum TickState {
    Idle,
    Running,
}

enum Mode {
    Normal,
    Creating(GoalForm),
    Editing { goal_id: GoalId, form: GoalForm },
    ConfirmDelete { goal_id: GoalId },
    Loading(FieldValue),
}

enum FormAction {
    Create,
    Edit(GoalId),
}

struct GoalForm {
    name: FieldValue,
    days: FieldValue,
    hours: FieldValue,
    minutes: FieldValue,
    image: FieldValue,
    audio: bool,
    field: FormField,
}

#[derive(Copy, Clone, PartialEq, Eq)]
enum FormField {
    Name,
    Days,
    Hours,
    Minutes,
    Image,
    Audio,
}

struct GoalInput {
    name: String,
    days: f64,
    hours: f64,
    minutes: f64,
    image_path: Option<String>,
    audio_alert: bool,
}

#[derive(Clone)]
struct FieldValue {
    value: String,
    cursor: usize,
}

impl FieldValue {
    fn new(value: &str) -> Self {
        FieldValue {
            value: value.to_string(),
            cursor: value.len(),
        }
    }

    fn move_left(&mut self) {
        if let Some(ch) = self.value[..self.cursor].chars().next_back() {
            self.cursor -= ch.len_utf8();
        }
    }

    fn move_right(&mut self) {
        if let Some(ch) = self.value[self.cursor..].chars().next() {
            self.cursor += ch.len_utf8();
        }
    }

    fn backspace(&mut self) {
        if let Some(ch) = self.value[..self.cursor].chars().next_back() {
            let start = self.cursor - ch.len_utf8();
            self.value.drain(start..self.cursor);
            self.cursor = start;
        }
    }

    fn insert_char(&mut self, ch: char) {
        self.value.insert(self.cursor, ch);
        self.cursor += ch.len_utf8();
    }

    fn with_caret(&self) -> String {
        let mut text = self.value.clone();
        text.insert_str(self.cursor, "▌");
        text
    }
}

impl GoalForm {
    fn new() -> Self {
        GoalForm {
            name: FieldValue::new(""),
            days: FieldValue::new(""),
            hours: FieldValue::new(""),
            minutes: FieldValue::new(""),
            image: FieldValue::new(""),
            audio: false,
            field: FormField::Name,
        }
    }

    fn from_goal(goal: &Goal) -> Self {
        GoalForm {
            name: FieldValue::new(&goal.name),
            days: FieldValue::new(&number_field(goal.frequency_days)),
            hours: FieldValue::new(&number_field(goal.frequency_hours)),
            minutes: FieldValue::new(&number_field(goal.frequency_minutes)),
            image: FieldValue::new(goal.image_path.as_deref().unwrap_or_default()),
            audio: goal.audio_alert,
            field: FormField::Name,
        }
    }

    fn next_field(&mut self) {
        self.field = match self.field {
            FormField::Name => FormField::Days,
            FormField::Days => FormField::Hours,
            FormField::Hours => FormField::Minutes,
            FormField::Minutes => FormField::Image,
            FormField::Image => FormField::Audio,
            FormField::Audio => FormField::Name,
        };
    }

    fn prev_field(&mut self) {
        self.field = match self.field {
            FormField::Name => FormField::Audio,
            FormField::Days => FormField::Name,
            FormField::Hours => FormField::Days,
            FormField::Minutes => FormField::Hours,
            FormField::Image => FormField::Minutes,
            FormField::Audio => FormField::Image,
        };
    }

    fn active_field_mut(&mut self) -> Option<&mut FieldValue> {
        match self.field {
            FormField::Name => Some(&mut self.name),
            FormField::Days => Some(&mut self.days),
            FormField::Hours => Some(&mut self.hours),
            FormField::Minutes => Some(&mut self.minutes),
            FormField::Image => Some(&mut self.image),
            FormField::Audio => None,
        }
    }

    fn parse(&self) -> Result<GoalInput> {
        let name = self.name.value.trim().to_string();
        let days = parse_number("days", &self.days.value)?;
        let hours = parse_number("hours", &self.hours.value)?;
        let minutes = parse_number("minutes", &self.minutes.value)?;
        validate_goal_input(&name, days, hours, minutes)?;
        let image = self.image.value.trim();
        Ok(GoalInput {
            name,
            days,
            hours,
            minutes,
            image_path: if image.is_empty() {
                None
            } else {
                Some(image.to_string())
            },
            audio_alert: self.audio,
        })
    }
}

fn parse_number(label: &str, raw: &str) -> Result<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(0.0);
    }
    trimmed
        .parse::<f64>()
        .map_err(|_| anyhow!("invalid {}: {}", label, trimmed))
}

fn number_field(value: f64) -> String {
    if value == 0.0 {
        String::new()
    } else {
        format!("{}", value)
    }
}

impl App {
    fn new(file: Option<GoalFile>, location: GoalsLocation, startup_error: Option<String>) -> Self {
        let mut app = App {
            file: GoalFile::default(),
            location,
            columns: Vec::new(),
            selected: 0,
            status: String::new(),
            mode: Mode::Normal,
            tick_state: TickState::Idle,
            last_tick: Instant::now(),
        };
        match file {
            Some(file) => {
                let count = file.goals.len();
                app.apply_document(file, Utc::now());
                app.status = format!(
                    "Loaded {} goal(s) from {}",
                    count,
                    app.location.path.display()
                );
            }
            None => {
                app.status = startup_error
                    .unwrap_or_else(|| "No goals document loaded (press o to load one)".into());
            }
        }
        app
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        loop {
            terminal.draw(|f| self.draw(f))?;
            if event::poll(Duration::from_millis(200))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_key(key)? {
                        break;
                    }
                }
            }
            if self.last_tick.elapsed() >= TICK_INTERVAL {
                self.last_tick = Instant::now();
                if self.refresh(Utc::now()) {
                    ring_bell();
                }
            }
        }
        Ok(())
    }

    /// Replaces the column set wholesale and restarts the tick clock; one
    /// synchronous derivation pass runs before the next tick.
    fn apply_document(&mut self, file: GoalFile, now: DateTime<Utc>) {
        self.file = file;
        self.rebuild_columns(now);
        self.tick_state = TickState::Running;
        self.last_tick = Instant::now();
    }

    fn rebuild_columns(&mut self, now: DateTime<Utc>) {
        self.columns = self
            .file
            .goals
            .iter()
            .map(|goal| GoalColumn {
                display: display::derive(goal, now),
                goal: goal.clone(),
                alerted: false,
            })
            .collect();
        self.selected = self.selected.min(self.columns.len().saturating_sub(1));
    }

    /// Returns true when an audio-alert goal has just crossed into overdue.
    fn refresh(&mut self, now: DateTime<Utc>) -> bool {
        let mut ring = false;
        for column in &mut self.columns {
            column.display = display::derive(&column.goal, now);
            if column.display.overdue {
                if column.goal.audio_alert && !column.alerted {
                    column.alerted = true;
                    ring = true;
                }
            } else {
                column.alerted = false;
            }
        }
        ring
    }

    fn load_document_text(&mut self, text: &str, origin: PathBuf) -> bool {
        match parse_document(text) {
            Ok(file) => {
                let count = file.goals.len();
                self.apply_document(file, Utc::now());
                self.status = format!("Loaded {} goal(s) from {}", count, origin.display());
                self.location = GoalsLocation {
                    path: origin,
                    scope: GoalsScope::External,
                };
                true
            }
            Err(err) => {
                self.status = format!("Could not load {}: {}", origin.display(), err);
                false
            }
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> Result<bool> {
        match self.mode {
            Mode::Normal => self.handle_normal_key(key),
            Mode::Creating(_) | Mode::Editing { .. } => self.handle_form_key(key),
            Mode::ConfirmDelete { .. } => self.handle_confirm_key(key),
            Mode::Loading(_) => self.handle_loading_key(key),
        }
    }

    fn handle_normal_key(&mut self, key: KeyEvent) -> Result<bool> {
        match key.code {
            KeyCode::Char('q') => return Ok(true),
            KeyCode::Left | KeyCode::Char('h') => {
                if self.selected > 0 {
                    self.selected -= 1;
                }
            }
            KeyCode::Right | KeyCode::Char('l') => {
                if self.selected + 1 < self.columns.len() {
                    self.selected += 1;
                }
            }
            KeyCode::Char('n') => {
                self.mode = Mode::Creating(GoalForm::new());
                self.status =
                    "Creating goal (Tab/Shift-Tab move, Space toggles audio, Enter save, Esc cancel)"
                        .into();
            }
            KeyCode::Char('e') => match self.columns.get(self.selected) {
                Some(column) => {
                    let goal_id = column.goal.id;
                    let form = GoalForm::from_goal(&column.goal);
                    self.mode = Mode::Editing { goal_id, form };
                    self.status = format!("Editing {}", column.goal.name);
                }
                None => self.status = "No goal selected to edit".into(),
            },
            KeyCode::Char('d') => match self.columns.get(self.selected) {
                Some(column) => {
                    let goal_id = column.goal.id;
                    self.mode = Mode::ConfirmDelete { goal_id };
                    self.status = format!(
                        "Delete {}? (y to confirm, n/Esc to cancel)",
                        column.goal.name
                    );
                }
                None => self.status = "No goal selected to delete".into(),
            },
            KeyCode::Char('r') => self.reset_selected()?,
            KeyCode::Char('o') => {
                self.mode = Mode::Loading(FieldValue::new(""));
                self.status = "Load goals file (Enter to load, Esc to cancel)".into();
            }
            _ => {}
        }
        Ok(false)
    }

    fn handle_form_key(&mut self, key: KeyEvent) -> Result<bool> {
        let mut close_form = false;
        let mut mode = std::mem::replace(&mut self.mode, Mode::Normal);
        match &mut mode {
            Mode::Creating(form) => {
                close_form = self.process_form_key(FormAction::Create, form, key)?;
            }
            Mode::Editing { goal_id, form } => {
                let id = *goal_id;
                close_form = self.process_form_key(FormAction::Edit(id), form, key)?;
            }
            _ => {}
        }
        self.mode = if close_form { Mode::Normal } else { mode };
        Ok(false)
    }

    fn process_form_key(
        &mut self,
        action: FormAction,
        form: &mut GoalForm,
        key: KeyEvent,
    ) -> Result<bool> {
        let mut close_form = false;
        match key.code {
            KeyCode::Esc => {
                close_form = true;
                self.status = "Canceled".into();
            }
            KeyCode::Tab | KeyCode::Down => form.next_field(),
            KeyCode::BackTab | KeyCode::Up => form.prev_field(),
            KeyCode::Left => {
                if let Some(field) = form.active_field_mut() {
                    field.move_left();
                }
            }
            KeyCode::Right => {
                if let Some(field) = form.active_field_mut() {
                    field.move_right();
                }
            }
            KeyCode::Backspace => {
                if let Some(field) = form.active_field_mut() {
                    field.backspace();
                }
            }
            KeyCode::Enter => {
                close_form = self.try_submit(action, form)?;
            }
            KeyCode::Char(c) => {
                if key
                    .modifiers
                    .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
                {
                    return Ok(false);
                }
                if form.field == FormField::Audio {
                    if c == ' ' {
                        form.audio = !form.audio;
                    }
                } else if let Some(field) = form.active_field_mut() {
                    field.insert_char(c);
                }
            }
            _ => {}
        }
        Ok(close_form)
    }

    fn try_submit(&mut self, action: FormAction, form: &GoalForm) -> Result<bool> {
        let input = match form.parse() {
            Ok(input) => input,
            Err(err) => {
                self.status = format!("Could not save: {}", err);
                return Ok(false);
            }
        };
        match action {
            FormAction::Create => self.create_goal(input)?,
            FormAction::Edit(goal_id) => self.edit_goal(goal_id, input)?,
        }
        Ok(true)
    }

    fn create_goal(&mut self, input: GoalInput) -> Result<()> {
        let now = Utc::now();
        let id = self.file.next_id();
        let mut goal = Goal::new(id, input.name, now);
        goal.frequency_days = input.days;
        goal.frequency_hours = input.hours;
        goal.frequency_minutes = input.minutes;
        goal.image_path = input.image_path;
        goal.audio_alert = input.audio_alert;
        let name = goal.name.clone();
        self.file.add_goal(goal);
        self.rebuild_columns(now);
        self.selected = self.columns.len().saturating_sub(1);
        self.tick_state = TickState::Running;
        self.persist(format!("Added {}", name))?;
        Ok(())
    }

    fn edit_goal(&mut self, goal_id: GoalId, input: GoalInput) -> Result<()> {
        self.file.update_goal(goal_id, |goal| {
            goal.name = input.name;
            goal.frequency_days = input.days;
            goal.frequency_hours = input.hours;
            goal.frequency_minutes = input.minutes;
            goal.image_path = input.image_path;
            goal.audio_alert = input.audio_alert;
        })?;
        self.rebuild_columns(Utc::now());
        self.persist(format!("Updated goal {}", goal_id))?;
        Ok(())
    }

    fn handle_confirm_key(&mut self, key: KeyEvent) -> Result<bool> {
        let goal_id = match &self.mode {
            Mode::ConfirmDelete { goal_id } => *goal_id,
            _ => return Ok(false),
        };
        match key.code {
            KeyCode::Char('y') | KeyCode::Enter => {
                match self.file.remove_goal(goal_id) {
                    Ok(removed) => {
                        self.rebuild_columns(Utc::now());
                        self.persist(format!("Deleted {}", removed.name))?;
                    }
                    Err(err) => self.status = format!("Delete failed: {}", err),
                }
                self.mode = Mode::Normal;
            }
            KeyCode::Char('n') | KeyCode::Esc => {
                self.status = "Delete canceled".into();
                self.mode = Mode::Normal;
            }
            _ => {}
        }
        Ok(false)
    }

    fn handle_loading_key(&mut self, key: KeyEvent) -> Result<bool> {
        let mut close_prompt = false;
        let mut mode = std::mem::replace(&mut self.mode, Mode::Normal);
        if let Mode::Loading(field) = &mut mode {
            match key.code {
                KeyCode::Esc => {
                    close_prompt = true;
                    self.status = "Load canceled".into();
                }
                KeyCode::Left => field.move_left(),
                KeyCode::Right => field.move_right(),
                KeyCode::Backspace => field.backspace(),
                KeyCode::Enter => {
                    let raw = field.value.trim().to_string();
                    if raw.is_empty() {
                        self.status = "No path given".into();
                    } else {
                        self.load_document_path(PathBuf::from(raw));
                        close_prompt = true;
                    }
                }
                KeyCode::Char(c) => {
                    if !key
                        .modifiers
                        .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
                    {
                        field.insert_char(c);
                    }
                }
                _ => {}
            }
        }
        self.mode = if close_prompt { Mode::Normal } else { mode };
        Ok(false)
    }

    fn load_document_path(&mut self, path: PathBuf) {
        match fs::read_to_string(&path) {
            Ok(text) => {
                self.load_document_text(&text, path);
            }
            Err(err) => {
                self.status = format!("Could not read {}: {}", path.display(), err);
            }
        }
    }

    fn reset_selected(&mut self) -> Result<()> {
        let (goal_id, name) = match self.columns.get(self.selected) {
            Some(column) => (column.goal.id, column.goal.name.clone()),
            None => {
                self.status = "No goal selected to reset".into();
                return Ok(());
            }
        };
        let now = Utc::now();
        self.file.reset_goal(goal_id, now)?;
        self.rebuild_columns(now);
        self.persist(format!("Reset {}", name))?;
        Ok(())
    }

    fn persist(&mut self, message: impl Into<String>) -> Result<()> {
        save_goals(&self.location, &self.file)?;
        self.status = message.into();
        Ok(())
    }

    fn draw(&mut self, f: &mut ratatui::Frame<'_>) {
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(8),
                Constraint::Length(4),
            ])
            .split(f.size());

        self.draw_header(f, layout[0]);
        self.draw_columns(f, layout[1]);
        self.draw_footer(f, layout[2]);

        match &self.mode {
            Mode::Creating(form) => draw_form(f, "New Goal", form),
            Mode::Editing { form, .. } => draw_form(f, "Edit Goal", form),
            Mode::ConfirmDelete { goal_id } => self.draw_confirm(f, *goal_id),
            Mode::Loading(field) => draw_load_prompt(f, field),
            Mode::Normal => {}
        }
    }

    fn draw_header(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let title = Line::from(vec![
            Span::styled(
                "goalboard ",
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!("{}", self.location.path.display()),
                Style::default().fg(Color::DarkGray),
            ),
            Span::raw("  •  "),
            Span::styled(self.location.scope.label(), Style::default().fg(Color::Green)),
            Span::raw("  •  "),
            Span::styled(
                format!("{} goal(s)", self.columns.len()),
                Style::default().fg(Color::Gray),
            ),
        ]);
        let block = Block::default()
            .borders(Borders::BOTTOM)
            .border_style(Style::default().fg(Color::DarkGray));
        let paragraph = Paragraph::new(title)
            .alignment(Alignment::Center)
            .block(block);
        f.render_widget(paragraph, area);
    }

    fn draw_columns(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        if self.columns.is_empty() {
            let message = match self.tick_state {
                TickState::Idle => "No goals document loaded (o to load, n to add)",
                TickState::Running => "No goals yet (n to add one)",
            };
            let paragraph = Paragraph::new(message)
                .alignment(Alignment::Center)
                .block(Block::default().borders(Borders::ALL).title("goalboard"));
            f.render_widget(paragraph, area);
            return;
        }

        let constraints = self
            .columns
            .iter()
            .map(|_| Constraint::Percentage((100 / self.columns.len() as u16).max(1)))
            .collect::<Vec<_>>();
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(constraints)
            .split(area);

        for (idx, column) in self.columns.iter().enumerate() {
            draw_column(f, chunks[idx], column, idx == self.selected);
        }
    }

    fn draw_footer(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(2), Constraint::Length(2)])
            .split(area);

        let help_bar = Paragraph::new(help_line())
            .alignment(Alignment::Center)
            .block(
                Block::default()
                    .borders(Borders::TOP)
                    .border_style(Style::default().fg(Color::DarkGray)),
            );
        f.render_widget(help_bar, rows[0]);

        let bottom = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(rows[1]);

        let status = Paragraph::new(self.status.clone())
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .borders(Borders::TOP)
                    .border_style(Style::default().fg(Color::DarkGray)),
            );
        f.render_widget(status, bottom[0]);

        let detail = Paragraph::new(self.detail_line())
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .borders(Borders::TOP)
                    .border_style(Style::default().fg(Color::DarkGray))
                    .title("Selected"),
            );
        f.render_widget(detail, bottom[1]);
    }

    fn detail_line(&self) -> Line<'static> {
        let column = match self.columns.get(self.selected) {
            Some(column) => column,
            None => return Line::from("No goal selected"),
        };
        let (r, g, b) = column.display.background;
        let mut spans = vec![
            Span::styled(
                column.goal.name.clone(),
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw(format!("  every {}", column.goal.frequency_label())),
            Span::raw(format!("  {:.0}%", column.display.progress * 100.0)),
            Span::styled(
                format!("  {}", display::gradient_hex(column.display.progress)),
                Style::default().fg(Color::Rgb(r, g, b)),
            ),
            Span::styled(
                format!("  {}", column.goal.asset()),
                Style::default().fg(Color::Gray).add_modifier(Modifier::DIM),
            ),
        ];
        if column.goal.audio_alert {
            spans.push(Span::styled(
                "  audio",
                Style::default().fg(Color::LightMagenta),
            ));
        }
        Line::from(spans)
    }

    fn draw_confirm(&self, f: &mut ratatui::Frame<'_>, goal_id: GoalId) {
        let area = centered_rect(50, 30, f.size());
        let name = self
            .file
            .find(goal_id)
            .map(|g| g.name.clone())
            .unwrap_or_else(|| goal_id.to_string());
        let body = vec![
            Line::from(Span::styled(
                format!("Delete \"{}\"?", name),
                Style::default()
                    .fg(Color::LightRed)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from("Press y to confirm, n or Esc to cancel"),
        ];
        let dialog = Paragraph::new(body).alignment(Alignment::Center).block(
            Block::default()
                .title(Span::styled(
                    "Confirm Delete",
                    Style::default()
                        .fg(Color::LightRed)
                        .add_modifier(Modifier::BOLD),
                ))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::LightRed)),
        );
        f.render_widget(Clear, area);
        f.render_widget(dialog, area);
    }
}

#[derive(Debug, Clone, PartialEq)]
struct ColumnView {
    countdown: String,
    name: String,
    asset: String,
    balloon_row: u16,
    background: (u8, u8, u8),
    overdue: bool,
}

fn column_view(goal: &Goal, state: &GoalDisplay, canvas_rows: u16) -> ColumnView {
    ColumnView {
        countdown: state.countdown.clone(),
        name: goal.name.clone(),
        asset: goal.asset(),
        balloon_row: balloon_row(state.progress, canvas_rows),
        background: state.background,
        overdue: state.overdue,
    }
}

// Terminal-row version of the position mapper: one row of padding at the
// top and bottom of the canvas.
fn balloon_row(progress: f64, canvas_rows: u16) -> u16 {
    if canvas_rows == 0 {
        return 0;
    }
    let rows = f64::from(canvas_rows);
    let padding = if canvas_rows >= 3 { 1.0 } else { 0.0 };
    let row = display::balloon_y(progress, rows, padding).round();
    row.clamp(0.0, rows - 1.0) as u16
}

fn draw_column(f: &mut ratatui::Frame<'_>, area: Rect, column: &GoalColumn, selected: bool) {
    let title_style = if column.display.overdue {
        Style::default()
            .fg(Color::LightRed)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default()
            .fg(Color::White)
            .add_modifier(Modifier::BOLD)
    };
    let border = if selected {
        Color::Cyan
    } else {
        Color::DarkGray
    };
    let block = Block::default()
        .title(Span::styled(column.display.countdown.clone(), title_style))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border));
    let inner = block.inner(area);
    f.render_widget(block, area);
    if inner.height < 3 {
        return;
    }

    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(1),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(inner);
    let canvas = sections[0];
    let view = column_view(&column.goal, &column.display, canvas.height);

    let (r, g, b) = view.background;
    let balloon = Paragraph::new(canvas_lines(&view, canvas.height, canvas.width))
        .style(Style::default().bg(Color::Rgb(r, g, b)).fg(Color::Black));
    f.render_widget(balloon, canvas);

    let name = Paragraph::new(view.name)
        .alignment(Alignment::Center)
        .style(
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        );
    f.render_widget(name, sections[1]);

    let asset = Paragraph::new(view.asset)
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::DarkGray).add_modifier(Modifier::DIM));
    f.render_widget(asset, sections[2]);
}

fn canvas_lines(view: &ColumnView, rows: u16, width: u16) -> Vec<Line<'static>> {
    (0..rows)
        .map(|row| {
            if row == view.balloon_row {
                let pad = width.saturating_sub(1) / 2;
                Line::raw(format!("{}O", " ".repeat(pad as usize)))
            } else {
                Line::raw("")
            }
        })
        .collect()
}

fn help_line() -> Line<'static> {
    Line::from(vec![
        Span::styled("←→ / h l", Style::default().fg(Color::LightCyan)),
        Span::raw(" select  "),
        Span::styled("n", Style::default().fg(Color::LightMagenta)),
        Span::raw(" new  "),
        Span::styled("e", Style::default().fg(Color::LightYellow)),
        Span::raw(" edit  "),
        Span::styled("r", Style::default().fg(Color::LightGreen)),
        Span::raw(" reset  "),
        Span::styled("d", Style::default().fg(Color::LightRed)),
        Span::raw(" delete  "),
        Span::styled("o", Style::default().fg(Color::LightCyan)),
        Span::raw(" load  "),
        Span::styled("q", Style::default().fg(Color::LightRed)),
        Span::raw(" quit"),
    ])
}

fn draw_form(f: &mut ratatui::Frame<'_>, title: &str, form: &GoalForm) {
    let area = centered_rect(60, 50, f.size());
    let mut lines = vec![
        field_line("Name", &form.name, form.field == FormField::Name),
        field_line("Days", &form.days, form.field == FormField::Days),
        field_line("Hours", &form.hours, form.field == FormField::Hours),
        field_line("Minutes", &form.minutes, form.field == FormField::Minutes),
        field_line("Image", &form.image, form.field == FormField::Image),
        toggle_line("Audio alert", form.audio, form.field == FormField::Audio),
    ];
    lines.push(Line::from(Span::styled(
        "Enter save • Esc cancel • Tab/Shift-Tab move • Space toggles audio",
        Style::default().fg(Color::Gray),
    )));
    let dialog = Paragraph::new(lines)
        .block(
            Block::default()
                .title(Span::styled(
                    title.to_string(),
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD),
                ))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan)),
        )
        .wrap(Wrap { trim: true });
    f.render_widget(Clear, area);
    f.render_widget(dialog, area);
}

fn draw_load_prompt(f: &mut ratatui::Frame<'_>, field: &FieldValue) {
    let area = centered_rect(60, 20, f.size());
    let lines = vec![
        field_line("Path", field, true),
        Line::from(Span::styled(
            "Enter load • Esc cancel",
            Style::default().fg(Color::Gray),
        )),
    ];
    let dialog = Paragraph::new(lines).block(
        Block::default()
            .title(Span::styled(
                "Load Goals File",
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)),
    );
    f.render_widget(Clear, area);
    f.render_widget(dialog, area);
}

fn field_line(label: &str, field: &FieldValue, active: bool) -> Line<'static> {
    let label_style = Style::default()
        .fg(Color::Gray)
        .add_modifier(Modifier::BOLD | Modifier::DIM);
    let value_style = Style::default().fg(if active { Color::Cyan } else { Color::White });
    let text = if active {
        field.with_caret()
    } else {
        field.value.clone()
    };
    Line::from(vec![
        Span::styled(format!("{}: ", label), label_style),
        Span::styled(text, value_style),
    ])
}

fn toggle_line(label: &str, on: bool, active: bool) -> Line<'static> {
    let label_style = Style::default()
        .fg(Color::Gray)
        .add_modifier(Modifier::BOLD | Modifier::DIM);
    let value_style = Style::default().fg(if active { Color::Cyan } else { Color::White });
    let mark = if on { "[x]" } else { "[ ]" };
    Line::from(vec![
        Span::styled(format!("{}: ", label), label_style),
        Span::styled(mark.to_string(), value_style),
    ])
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

fn ring_bell() {
    let mut out = stdout();
    let _ = out.write_all(b"\x07");
    let _ = out.flush();
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

fn teardown_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, TimeZone};

    fn test_location() -> GoalsLocation {
        GoalsLocation {
            path: PathBuf::from("goals.json"),
            scope: GoalsScope::External,
        }
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn overdue_audio_goal() -> GoalFile {
        let mut goal = Goal::new(1, "Stretch".into(), at(0));
        goal.frequency_minutes = 1.0;
        goal.audio_alert = true;
        GoalFile {
            last_goal_id: 1,
            goals: vec![goal],
        }
    }

    #[test]
    fn starts_idle_without_a_document() {
        let mut app = App::new(None, test_location(), None);
        assert_eq!(app.tick_state, TickState::Idle);
        assert!(app.columns.is_empty());
        assert!(!app.refresh(Utc::now()));
    }

    #[test]
    fn loading_a_document_builds_columns_with_derived_state() {
        let last = Utc::now() - ChronoDuration::days(1);
        let raw = format!(
            r#"{{"goals":[{{"id":1,"name":"Read","last_completed_date":"{}","frequency_days":2}}]}}"#,
            last.to_rfc3339()
        );
        let mut app = App::new(None, test_location(), None);
        assert!(app.load_document_text(&raw, PathBuf::from("read.json")));
        assert_eq!(app.tick_state, TickState::Running);
        assert_eq!(app.columns.len(), 1);
        let state = &app.columns[0].display;
        assert!((state.progress - 0.5).abs() < 1e-6);
        assert_eq!(display::gradient_hex(state.progress), "#FFFF00");
        assert_eq!(app.location.path, PathBuf::from("read.json"));
    }

    #[test]
    fn malformed_document_leaves_existing_columns_untouched() {
        let mut app = App::new(Some(overdue_audio_goal()), test_location(), None);
        assert_eq!(app.columns.len(), 1);
        let before = app.columns[0].goal.clone();

        assert!(!app.load_document_text("{broken", PathBuf::from("bad.json")));
        assert_eq!(app.columns.len(), 1);
        assert_eq!(app.columns[0].goal.id, before.id);
        assert_eq!(app.columns[0].goal.name, before.name);
        assert_eq!(app.location.path, PathBuf::from("goals.json"));
        assert!(app.status.contains("Could not load"));
    }

    #[test]
    fn reloading_replaces_the_column_set_wholesale() {
        let mut app = App::new(Some(overdue_audio_goal()), test_location(), None);
        let raw = r#"{"goals":[
            {"id": 5, "name": "Run", "last_completed_date": "2024-03-01T08:30:00Z", "frequency_days": 1},
            {"id": 6, "name": "Swim", "last_completed_date": "2024-03-01T08:30:00Z", "frequency_days": 7}
        ]}"#;
        assert!(app.load_document_text(raw, PathBuf::from("other.json")));
        assert_eq!(app.columns.len(), 2);
        assert_eq!(app.columns[0].goal.id, 5);
        assert_eq!(app.tick_state, TickState::Running);
    }

    #[test]
    fn audio_alert_rings_once_until_rearmed() {
        let mut app = App::new(Some(overdue_audio_goal()), test_location(), None);
        let now = Utc::now();
        assert!(app.refresh(now));
        assert!(!app.refresh(now + ChronoDuration::seconds(1)));

        // Resetting the goal re-arms the alert for the next cycle.
        app.file.reset_goal(1, now).unwrap();
        app.rebuild_columns(now);
        assert!(!app.refresh(now + ChronoDuration::seconds(2)));
        assert!(app.refresh(now + ChronoDuration::seconds(90)));
    }

    #[test]
    fn balloon_row_spans_the_canvas_monotonically() {
        assert_eq!(balloon_row(0.0, 20), 1);
        assert_eq!(balloon_row(0.5, 20), 10);
        assert_eq!(balloon_row(1.0, 20), 19);
        let mut previous = 0;
        for step in 0..=100 {
            let row = balloon_row(f64::from(step) / 100.0, 20);
            assert!(row >= previous, "row decreased at step {step}");
            previous = row;
        }
        assert_eq!(balloon_row(0.7, 0), 0);
    }

    #[test]
    fn form_round_trips_a_goal_and_validates_input() {
        let mut goal = Goal::new(4, "Read".into(), at(0));
        goal.frequency_days = 2.0;
        goal.image_path = Some("red.png".into());
        goal.audio_alert = true;
        let form = GoalForm::from_goal(&goal);
        let input = form.parse().unwrap();
        assert_eq!(input.name, "Read");
        assert_eq!(input.days, 2.0);
        assert_eq!(input.image_path.as_deref(), Some("red.png"));
        assert!(input.audio_alert);

        let empty = GoalForm::new();
        assert!(empty.parse().is_err());

        let mut bad_number = GoalForm::new();
        bad_number.name = FieldValue::new("Run");
        bad_number.days = FieldValue::new("two");
        assert!(bad_number.parse().is_err());
    }

    #[test]
    fn field_editing_keeps_cursor_on_char_boundaries() {
        let mut field = FieldValue::new("ab");
        field.move_left();
        field.insert_char('é');
        assert_eq!(field.value, "aéb");
        field.backspace();
        assert_eq!(field.value, "ab");
        field.move_right();
        field.backspace();
        assert_eq!(field.value, "a");
    }
}
