use std::{io, thread, time::Duration};

use anyhow::{Context, Result};
use chrono::Local;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    cursor::Show,
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame, Terminal,
};
use snowseeker_core::{
    Catalog, ChangeKind, FavoritesStore, FileStore, KeyValueStore, Resort, SortOrder,
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

const TICK_RATE: Duration = Duration::from_millis(250);
const MAX_SEARCH_LEN: usize = 64;

#[derive(Debug, Clone)]
struct Theme {
    primary_fg: Color,
    accent: Color,
    muted: Color,
    selection_bg: Color,
    favorite: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            primary_fg: Color::White,
            accent: Color::Cyan,
            muted: Color::DarkGray,
            selection_bg: Color::DarkGray,
            favorite: Color::Red,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Browse,
    Search,
}

/// Sort order chooser shown as a modal over the list.
#[derive(Debug, Clone)]
struct SortPrompt {
    cursor: usize,
}

impl SortPrompt {
    fn new(current: SortOrder) -> Self {
        let cursor = SortOrder::ALL
            .iter()
            .position(|order| *order == current)
            .unwrap_or(0);
        Self { cursor }
    }

    fn move_cursor(&mut self, delta: isize) {
        let len = SortOrder::ALL.len() as isize;
        self.cursor = (self.cursor as isize + delta).clamp(0, len - 1) as usize;
    }

    fn selected(&self) -> SortOrder {
        SortOrder::ALL[self.cursor]
    }
}

enum AppEvent {
    Input(Event),
    Tick,
    FavoriteChanged { id: String, kind: ChangeKind },
}

/// Terminal front end listing resorts and managing favorites.
pub struct SnowSeekerApp<S = FileStore> {
    catalog: Catalog,
    favorites: FavoritesStore<S>,
    state: UiState,
    sort_prompt: Option<SortPrompt>,
    theme: Theme,
}

impl<S: KeyValueStore> SnowSeekerApp<S> {
    pub fn new(catalog: Catalog, favorites: FavoritesStore<S>, sort: SortOrder) -> Self {
        let mut state = UiState::default();
        state.sort = sort;
        Self {
            catalog,
            favorites,
            state,
            sort_prompt: None,
            theme: Theme::default(),
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        self.state.apply_projection(&self.catalog);
        self.state.set_status(format!(
            "Loaded {} resorts, {} favorites",
            self.catalog.len(),
            self.favorites.len()
        ));

        let (event_tx, mut event_rx) = mpsc::channel::<AppEvent>(128);
        let notice_tx = event_tx.clone();
        let listener = self.favorites.subscribe(move |change| {
            let event = AppEvent::FavoriteChanged {
                id: change.id.to_string(),
                kind: change.kind,
            };
            if notice_tx.try_send(event).is_err() {
                warn!(id = change.id, "Dropped favorites notification");
            }
        });

        let mut stdout = io::stdout();
        enable_raw_mode().context("failed to enter raw mode")?;
        let mut guard = RestoreGuard::new(restore_terminal);
        execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).context("failed to create terminal")?;
        terminal.hide_cursor()?;
        terminal.clear()?;

        spawn_input_thread(event_tx);

        loop {
            terminal.draw(|frame| self.draw(frame))?;
            if self.state.should_quit {
                break;
            }
            if !self.process_app_event(event_rx.recv().await) {
                break;
            }
        }

        self.favorites.unsubscribe(listener);
        guard.finish()?;
        terminal.show_cursor()?;
        Ok(())
    }

    fn process_app_event(&mut self, maybe_event: Option<AppEvent>) -> bool {
        match maybe_event {
            Some(AppEvent::Input(event)) => {
                if let Err(err) = self.handle_input(event) {
                    self.state.set_status(format!("Error: {err}"));
                }
                true
            }
            Some(AppEvent::Tick) => {
                self.handle_tick();
                true
            }
            Some(AppEvent::FavoriteChanged { id, kind }) => {
                self.handle_favorite_changed(&id, kind);
                true
            }
            None => false,
        }
    }

    fn handle_tick(&mut self) {
        if self.state.mode == Mode::Search {
            self.state
                .set_status(format!("Search: {}", self.state.search));
        }
    }

    fn handle_favorite_changed(&mut self, id: &str, kind: ChangeKind) {
        let name = self
            .catalog
            .get(id)
            .map(|resort| resort.name.clone())
            .unwrap_or_else(|| id.to_string());
        let time = Local::now().format("%H:%M");
        let message = match kind {
            ChangeKind::Add => format!("Added {name} to favorites ({time})"),
            ChangeKind::Remove => format!("Removed {name} from favorites ({time})"),
        };
        info!(id, ?kind, "Favorites changed");
        self.state.set_status(message);
    }

    fn handle_input(&mut self, event: Event) -> Result<()> {
        match event {
            Event::Key(key) if key.kind == KeyEventKind::Press => self.handle_key(key),
            Event::Key(_) => Ok(()),
            Event::Resize(_, _) => Ok(()),
            Event::Mouse(_) => Ok(()),
            Event::FocusGained | Event::FocusLost | Event::Paste(_) => Ok(()),
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> Result<()> {
        if self.sort_prompt.is_some() {
            return self.handle_sort_prompt_key(key);
        }
        match self.state.mode {
            Mode::Search => self.handle_search_key(key),
            Mode::Browse => self.handle_browse_key(key),
        }
    }

    fn handle_search_key(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Esc => {
                self.state.mode = Mode::Browse;
                self.state.search.clear();
                self.state.apply_projection(&self.catalog);
                self.state.set_status("Search cleared".to_string());
            }
            KeyCode::Enter => {
                self.state.mode = Mode::Browse;
                self.state.set_status(format!(
                    "Search applied: {} ({} matches)",
                    self.state.search,
                    self.state.filtered.len()
                ));
            }
            KeyCode::Backspace => {
                self.state.search.pop();
                self.state.apply_projection(&self.catalog);
            }
            KeyCode::Char(c) => {
                if (key.modifiers.is_empty() || key.modifiers == KeyModifiers::SHIFT)
                    && self.state.search.chars().count() < MAX_SEARCH_LEN
                {
                    self.state.search.push(c);
                    self.state.apply_projection(&self.catalog);
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn handle_browse_key(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Char('q') if key.modifiers.is_empty() => self.state.should_quit = true,
            KeyCode::Char('c') if key.modifiers == KeyModifiers::CONTROL => {
                self.state.should_quit = true
            }
            KeyCode::Char('j') | KeyCode::Down => self.state.move_cursor(1),
            KeyCode::Char('k') | KeyCode::Up => self.state.move_cursor(-1),
            KeyCode::Char('g') if key.modifiers.is_empty() => self.state.move_to(0),
            KeyCode::Char('G') => self.state.move_to_end(),
            KeyCode::Home => self.state.move_to(0),
            KeyCode::End => self.state.move_to_end(),
            KeyCode::PageDown => self.state.page_down(),
            KeyCode::PageUp => self.state.page_up(),
            KeyCode::Char('/') => {
                self.state.mode = Mode::Search;
                self.state.set_status("Type to search resort names".to_string());
            }
            KeyCode::Char('s') if key.modifiers.is_empty() => {
                self.sort_prompt = Some(SortPrompt::new(self.state.sort));
            }
            KeyCode::Char('S') => self.apply_sort(self.state.sort.next()),
            KeyCode::Char('f') | KeyCode::Char(' ') => self.toggle_favorite(),
            KeyCode::Esc if !self.state.search.is_empty() => {
                self.state.search.clear();
                self.state.apply_projection(&self.catalog);
                self.state.set_status("Search cleared".to_string());
            }
            _ => {}
        }
        Ok(())
    }

    fn handle_sort_prompt_key(&mut self, key: KeyEvent) -> Result<()> {
        let Some(prompt) = self.sort_prompt.as_mut() else {
            return Ok(());
        };
        let chosen = match key.code {
            KeyCode::Esc => {
                self.sort_prompt = None;
                self.state.set_status("Sort unchanged".to_string());
                return Ok(());
            }
            KeyCode::Char('j') | KeyCode::Down => {
                prompt.move_cursor(1);
                return Ok(());
            }
            KeyCode::Char('k') | KeyCode::Up => {
                prompt.move_cursor(-1);
                return Ok(());
            }
            KeyCode::Char(digit @ '1'..='3') => {
                let index = digit as usize - '1' as usize;
                SortOrder::ALL[index]
            }
            KeyCode::Enter => prompt.selected(),
            _ => return Ok(()),
        };

        self.sort_prompt = None;
        self.apply_sort(chosen);
        Ok(())
    }

    fn apply_sort(&mut self, order: SortOrder) {
        self.state.sort = order;
        self.state.apply_projection(&self.catalog);
        debug!(sort = ?order, "Sort order changed");
        self.state.set_status(format!("Sorted: {}", order.label()));
    }

    fn toggle_favorite(&mut self) {
        let Some(id) = self.state.current_resort().map(|resort| resort.id.clone()) else {
            self.state.set_status("No resort selected".to_string());
            return;
        };
        self.favorites.toggle(&id);
    }

    fn draw(&mut self, frame: &mut Frame) {
        let size = frame.size();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(8), Constraint::Length(4)])
            .split(size);

        let body_chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
            .split(chunks[0]);

        self.render_resort_list(frame, body_chunks[0]);
        self.render_resort_details(frame, body_chunks[1]);
        self.render_status(frame, chunks[1]);
        if let Some(prompt) = &self.sort_prompt {
            self.render_sort_prompt(frame, prompt);
        }
    }

    fn render_resort_list(&mut self, frame: &mut Frame, area: Rect) {
        self.state.list_height = area.height.saturating_sub(2) as usize;
        self.state.clamp_cursor();
        self.state.ensure_cursor_visible();

        let mut list_state = ListState::default();
        let resorts = self.state.visible_resorts(self.state.list_height);
        if !resorts.is_empty() {
            let selected = self
                .state
                .cursor
                .saturating_sub(self.state.offset)
                .min(resorts.len().saturating_sub(1));
            list_state.select(Some(selected));
        }

        let items: Vec<ListItem> = resorts
            .iter()
            .enumerate()
            .map(|(idx, resort)| {
                let is_selected = self.state.cursor == self.state.offset + idx;
                let marker = if is_selected {
                    Span::styled(
                        "▶ ",
                        Style::default()
                            .fg(self.theme.accent)
                            .add_modifier(Modifier::BOLD),
                    )
                } else {
                    Span::raw("  ")
                };
                let mut line = vec![
                    marker,
                    Span::styled(
                        resort.name.clone(),
                        Style::default()
                            .fg(self.theme.primary_fg)
                            .add_modifier(Modifier::BOLD),
                    ),
                    Span::styled(
                        format!(" · {} · {} runs", resort.country, resort.runs),
                        Style::default().fg(self.theme.muted),
                    ),
                ];
                if self.favorites.contains(&resort.id) {
                    line.push(Span::styled(
                        " ♥",
                        Style::default().fg(self.theme.favorite),
                    ));
                }
                ListItem::new(Line::from(line))
            })
            .collect();

        let title = if self.state.search.is_empty() {
            format!("Resorts · {}", self.state.sort.label())
        } else {
            format!("Resorts · {} · \"{}\"", self.state.sort.label(), self.state.search)
        };
        let block = Block::default().borders(Borders::ALL).title(title);
        let list = List::new(items)
            .block(block)
            .highlight_style(Style::default().bg(self.theme.selection_bg));
        frame.render_stateful_widget(list, area, &mut list_state);
    }

    fn render_resort_details(&self, frame: &mut Frame, area: Rect) {
        let Some(resort) = self.state.current_resort() else {
            let block = Block::default().borders(Borders::ALL).title("Welcome");
            let lines = vec![
                Line::from(Span::styled(
                    "Welcome to SnowSeeker!",
                    Style::default().add_modifier(Modifier::BOLD),
                )),
                Line::from(""),
                Line::from("Select a resort from the list to see its details."),
                Line::from(Span::styled(
                    "Press / to search or s to change the sort order.",
                    Style::default().fg(self.theme.muted),
                )),
            ];
            let paragraph = Paragraph::new(lines).block(block).wrap(Wrap { trim: true });
            frame.render_widget(paragraph, area);
            return;
        };

        let block = Block::default().borders(Borders::ALL).title(resort.title());
        let paragraph = Paragraph::new(self.detail_lines(resort))
            .block(block)
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }

    fn detail_lines(&self, resort: &Resort) -> Vec<Line<'static>> {
        let bold = Style::default().add_modifier(Modifier::BOLD);
        let mut lines = vec![
            Line::from(vec![
                Span::styled("Size: ", bold),
                Span::raw(resort.size_label()),
                Span::raw("   "),
                Span::styled("Price: ", bold),
                Span::raw(resort.price_label()),
            ]),
            Line::from(vec![
                Span::styled("Elevation: ", bold),
                Span::raw(format!("{}m", resort.elevation)),
                Span::raw("   "),
                Span::styled("Snow: ", bold),
                Span::raw(format!("{}cm", resort.snow_depth)),
                Span::raw("   "),
                Span::styled("Runs: ", bold),
                Span::raw(resort.runs.to_string()),
            ]),
            Line::from(""),
            Line::from(resort.description.clone()),
            Line::from(""),
            Line::from(Span::styled("Facilities", bold)),
        ];
        if resort.facilities.is_empty() {
            lines.push(Line::from(Span::styled(
                "None listed",
                Style::default().fg(self.theme.muted),
            )));
        } else {
            lines.push(Line::from(resort.facility_list()));
        }
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            resort.image_credit.clone(),
            Style::default().fg(self.theme.muted),
        )));
        lines.push(Line::from(""));
        if self.favorites.contains(&resort.id) {
            lines.push(Line::from(vec![
                Span::styled("♥ Favorite", Style::default().fg(self.theme.favorite)),
                Span::styled(
                    "  (f to remove)",
                    Style::default().fg(self.theme.muted),
                ),
            ]));
        } else {
            lines.push(Line::from(Span::styled(
                "Press f to add to favorites",
                Style::default().fg(self.theme.muted),
            )));
        }
        lines
    }

    fn render_sort_prompt(&self, frame: &mut Frame, prompt: &SortPrompt) {
        let area = centered_rect(36, 7, frame.size());
        let items: Vec<ListItem> = SortOrder::ALL
            .iter()
            .enumerate()
            .map(|(idx, order)| {
                let current = if *order == self.state.sort { " (current)" } else { "" };
                ListItem::new(format!("{}. {}{}", idx + 1, order.label(), current))
            })
            .collect();
        let mut list_state = ListState::default();
        list_state.select(Some(prompt.cursor));
        let list = List::new(items)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title("Choose Sort Order")
                    .border_style(Style::default().fg(self.theme.accent)),
            )
            .highlight_style(
                Style::default()
                    .bg(self.theme.selection_bg)
                    .add_modifier(Modifier::BOLD),
            );
        frame.render_widget(Clear, area);
        frame.render_stateful_widget(list, area, &mut list_state);
    }

    fn render_status(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::ALL).title("Status");
        let primary = if self.state.mode == Mode::Search {
            format!("Search: {}▏", self.state.search)
        } else {
            self.state.status.clone()
        };
        let secondary = format!(
            "{}/{} resorts · {} favorites · / search  s sort  S next sort  f favorite  q quit",
            self.state.filtered.len(),
            self.catalog.len(),
            self.favorites.len()
        );
        let paragraph = Paragraph::new(vec![
            Line::from(primary),
            Line::from(Span::styled(secondary, Style::default().fg(self.theme.muted))),
        ])
        .block(block)
        .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

/// Runs a terminal restore step once, on `finish` or when dropped early by `?`.
struct RestoreGuard {
    restore: Option<fn() -> Result<()>>,
}

impl RestoreGuard {
    fn new(restore: fn() -> Result<()>) -> Self {
        Self {
            restore: Some(restore),
        }
    }

    fn finish(&mut self) -> Result<()> {
        match self.restore.take() {
            Some(restore) => restore(),
            None => Ok(()),
        }
    }
}

impl Drop for RestoreGuard {
    fn drop(&mut self) {
        if let Err(err) = self.finish() {
            warn!(?err, "Failed to restore terminal");
        }
    }
}

fn restore_terminal() -> Result<()> {
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(io::stdout(), LeaveAlternateScreen, Show)
        .context("failed to leave alternate screen")?;
    Ok(())
}

fn spawn_input_thread(sender: mpsc::Sender<AppEvent>) {
    thread::spawn(move || loop {
        match event::poll(TICK_RATE) {
            Ok(true) => match event::read() {
                Ok(evt) => {
                    if sender.blocking_send(AppEvent::Input(evt)).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            },
            Ok(false) => {
                if sender.blocking_send(AppEvent::Tick).is_err() {
                    break;
                }
            }
            Err(_) => break,
        }
    });
}

struct UiState {
    filtered: Vec<Resort>,
    cursor: usize,
    offset: usize,
    list_height: usize,
    search: String,
    sort: SortOrder,
    status: String,
    mode: Mode,
    should_quit: bool,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            filtered: Vec::new(),
            cursor: 0,
            offset: 0,
            list_height: 1,
            search: String::new(),
            sort: SortOrder::default(),
            status: "Ready".to_string(),
            mode: Mode::Browse,
            should_quit: false,
        }
    }
}

impl UiState {
    /// Recompute the visible list, keeping the selected resort when it survives.
    fn apply_projection(&mut self, catalog: &Catalog) {
        let selected = self.current_resort().map(|resort| resort.id.clone());
        self.filtered = catalog
            .project(self.sort, &self.search)
            .into_iter()
            .cloned()
            .collect();
        self.cursor = selected
            .and_then(|id| self.filtered.iter().position(|resort| resort.id == id))
            .unwrap_or(0);
        self.offset = 0;
        self.ensure_cursor_visible();
    }

    fn move_cursor(&mut self, delta: isize) {
        if self.filtered.is_empty() {
            return;
        }
        let len = self.filtered.len() as isize;
        self.cursor = (self.cursor as isize + delta).clamp(0, len - 1) as usize;
        self.ensure_cursor_visible();
    }

    fn move_to(&mut self, index: usize) {
        if self.filtered.is_empty() {
            return;
        }
        self.cursor = index.min(self.filtered.len() - 1);
        self.ensure_cursor_visible();
    }

    fn move_to_end(&mut self) {
        if self.filtered.is_empty() {
            return;
        }
        self.cursor = self.filtered.len() - 1;
        self.ensure_cursor_visible();
    }

    fn page_down(&mut self) {
        if self.filtered.is_empty() || self.list_height == 0 {
            return;
        }
        let delta = self.list_height.min(self.filtered.len());
        self.move_cursor(delta as isize);
    }

    fn page_up(&mut self) {
        if self.filtered.is_empty() || self.list_height == 0 {
            return;
        }
        let delta = self.list_height.min(self.filtered.len());
        self.move_cursor(-(delta as isize));
    }

    fn visible_resorts(&self, height: usize) -> &[Resort] {
        if self.filtered.is_empty() {
            return &[];
        }
        let end = (self.offset + height).min(self.filtered.len());
        &self.filtered[self.offset..end]
    }

    fn current_resort(&self) -> Option<&Resort> {
        self.filtered.get(self.cursor)
    }

    fn set_status(&mut self, message: String) {
        self.status = message;
    }

    fn clamp_cursor(&mut self) {
        if self.filtered.is_empty() {
            self.cursor = 0;
            self.offset = 0;
        } else if self.cursor >= self.filtered.len() {
            self.cursor = self.filtered.len() - 1;
        }
    }

    fn ensure_cursor_visible(&mut self) {
        if self.filtered.is_empty() || self.list_height == 0 {
            self.offset = 0;
            return;
        }
        let height = self.list_height;
        let max_offset = self.filtered.len().saturating_sub(height);

        if self.cursor < self.offset {
            self.offset = self.cursor;
        } else if self.cursor >= self.offset + height {
            self.offset = self.cursor + 1 - height;
        }

        if self.offset > max_offset {
            self.offset = max_offset;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use snowseeker_core::MemoryStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn sample_catalog() -> Catalog {
        Catalog::bundled().expect("bundled catalog should decode")
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn app(storage: &MemoryStore) -> SnowSeekerApp<&MemoryStore> {
        let mut app = SnowSeekerApp::new(
            sample_catalog(),
            FavoritesStore::load(storage),
            SortOrder::Unsorted,
        );
        app.state.apply_projection(&app.catalog);
        app
    }

    #[test]
    fn projection_keeps_selection_across_sort_changes() {
        let catalog = sample_catalog();
        let mut state = UiState::default();
        state.list_height = 5;
        state.apply_projection(&catalog);
        state.move_to(3);
        let selected = state.current_resort().map(|resort| resort.id.clone());

        state.sort = SortOrder::ByCountry;
        state.apply_projection(&catalog);
        assert_eq!(
            state.current_resort().map(|resort| resort.id.clone()),
            selected
        );
        assert!(state.cursor >= state.offset && state.cursor < state.offset + 5);
    }

    #[test]
    fn search_resets_cursor_when_selection_is_filtered_out() {
        let catalog = sample_catalog();
        let mut state = UiState::default();
        state.apply_projection(&catalog);
        state.move_to_end();

        state.search = "zer".to_string();
        state.apply_projection(&catalog);
        assert_eq!(state.cursor, 0);
        assert_eq!(
            state.current_resort().map(|resort| resort.name.as_str()),
            Some("Zermatt")
        );
    }

    #[test]
    fn cursor_stays_in_bounds() {
        let catalog = sample_catalog();
        let mut state = UiState::default();
        state.list_height = 4;
        state.apply_projection(&catalog);

        state.move_cursor(-3);
        assert_eq!(state.cursor, 0);
        state.page_down();
        assert_eq!(state.cursor, 4);
        state.move_cursor(1_000);
        assert_eq!(state.cursor, catalog.len() - 1);
        assert_eq!(state.offset, catalog.len() - 4);
        assert_eq!(state.visible_resorts(4).len(), 4);
    }

    #[test]
    fn search_keys_filter_live_and_escape_clears() -> Result<()> {
        let storage = MemoryStore::new();
        let mut app = app(&storage);
        let total = app.catalog.len();

        app.handle_key(key(KeyCode::Char('/')))?;
        for c in "ASP".chars() {
            app.handle_key(key(KeyCode::Char(c)))?;
        }
        assert_eq!(app.state.search, "ASP");
        assert_eq!(app.state.filtered.len(), 1);
        assert_eq!(app.state.filtered[0].name, "Aspen");

        app.handle_key(key(KeyCode::Esc))?;
        assert_eq!(app.state.mode, Mode::Browse);
        assert!(app.state.search.is_empty());
        assert_eq!(app.state.filtered.len(), total);
        Ok(())
    }

    #[test]
    fn sort_prompt_applies_selection() -> Result<()> {
        let storage = MemoryStore::new();
        let mut app = app(&storage);

        app.handle_key(key(KeyCode::Char('s')))?;
        assert!(app.sort_prompt.is_some());
        app.handle_key(key(KeyCode::Down))?;
        app.handle_key(key(KeyCode::Enter))?;
        assert!(app.sort_prompt.is_none());
        assert_eq!(app.state.sort, SortOrder::Alphabetical);
        assert!(app
            .state
            .filtered
            .windows(2)
            .all(|pair| pair[0].name <= pair[1].name));

        app.handle_key(key(KeyCode::Char('s')))?;
        app.handle_key(key(KeyCode::Char('3')))?;
        assert_eq!(app.state.sort, SortOrder::ByCountry);
        Ok(())
    }

    #[test]
    fn shift_s_cycles_sort_order() -> Result<()> {
        let storage = MemoryStore::new();
        let mut app = app(&storage);

        app.handle_key(KeyEvent::new(KeyCode::Char('S'), KeyModifiers::SHIFT))?;
        assert_eq!(app.state.sort, SortOrder::Alphabetical);
        assert!(app.sort_prompt.is_none());
        app.handle_key(KeyEvent::new(KeyCode::Char('S'), KeyModifiers::SHIFT))?;
        assert_eq!(app.state.sort, SortOrder::ByCountry);
        app.handle_key(KeyEvent::new(KeyCode::Char('S'), KeyModifiers::SHIFT))?;
        assert_eq!(app.state.sort, SortOrder::Unsorted);
        assert_eq!(app.state.status, "Sorted: Default");
        Ok(())
    }

    static EARLY_RESTORES: AtomicUsize = AtomicUsize::new(0);
    static FINISHED_RESTORES: AtomicUsize = AtomicUsize::new(0);

    #[test]
    fn restore_guard_runs_on_early_return() {
        fn count() -> Result<()> {
            EARLY_RESTORES.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        fn setup_fails() -> Result<()> {
            let _guard = RestoreGuard::new(count);
            Err(anyhow::anyhow!("terminal setup failed"))
        }

        assert!(setup_fails().is_err());
        assert_eq!(EARLY_RESTORES.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn restore_guard_runs_once_after_finish() -> Result<()> {
        fn count() -> Result<()> {
            FINISHED_RESTORES.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        let mut guard = RestoreGuard::new(count);
        guard.finish()?;
        guard.finish()?;
        drop(guard);
        assert_eq!(FINISHED_RESTORES.load(Ordering::SeqCst), 1);
        Ok(())
    }

    #[test]
    fn favorite_key_toggles_selected_resort() -> Result<()> {
        let storage = MemoryStore::new();
        let mut app = app(&storage);
        let id = app
            .state
            .current_resort()
            .map(|resort| resort.id.clone())
            .expect("catalog should not be empty");

        app.handle_key(key(KeyCode::Char('f')))?;
        assert!(app.favorites.contains(&id));
        app.handle_key(key(KeyCode::Char(' ')))?;
        assert!(!app.favorites.contains(&id));

        app.handle_key(key(KeyCode::Char('f')))?;
        let restored = FavoritesStore::load(&storage);
        assert!(restored.contains(&id));
        Ok(())
    }

    #[test]
    fn favorite_notice_names_the_resort() {
        let storage = MemoryStore::new();
        let mut app = app(&storage);
        app.handle_favorite_changed("zermatt-switzerland", ChangeKind::Add);
        assert!(app.state.status.starts_with("Added Zermatt to favorites"));
        app.handle_favorite_changed("retired-resort", ChangeKind::Remove);
        assert!(app
            .state
            .status
            .starts_with("Removed retired-resort from favorites"));
    }
}
