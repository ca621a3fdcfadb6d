// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use dexview_app::{
    CatalogSession, DetailRecord, HydrationProgress, Intent, ListingEntry, LoadStatus,
    ProjectedItem, SessionEvent, ViewState,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState};
use std::io;
use std::time::Duration;
use tracing::debug;

const PLACEHOLDER_UNAVAILABLE: &str = "details not available";
const PLACEHOLDER_LOADING: &str = "loading…";
const COLUMNS: [&str; 4] = ["#", "name", "category", "sprite"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum InputMode {
    #[default]
    Browse,
    Search,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct SelectedItem {
    entry: ListingEntry,
    detail: Option<DetailRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct UiState {
    input: InputMode,
    cursor: usize,
    selected: Option<SelectedItem>,
    status_line: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyOutcome {
    Continue,
    Quit,
}

pub fn run_app(session: &mut CatalogSession) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen).context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let mut ui = UiState::default();
    apply_session_events(&mut ui, session.start());

    let mut result = Ok(());
    loop {
        let events = session.pump();
        apply_session_events(&mut ui, events);

        if let Err(error) = terminal.draw(|frame| render(frame, session, &ui)) {
            result = Err(error).context("draw frame");
            break;
        }

        let has_event = match event::poll(Duration::from_millis(120)).context("poll event") {
            Ok(has_event) => has_event,
            Err(error) => {
                result = Err(error);
                break;
            }
        };
        if has_event {
            match event::read().context("read event") {
                Ok(Event::Key(key)) => {
                    if handle_key_event(session, &mut ui, key) == KeyOutcome::Quit {
                        break;
                    }
                }
                Ok(_) => {}
                Err(error) => {
                    result = Err(error);
                    break;
                }
            }
        }
    }

    session.dispose();
    disable_raw_mode().context("disable raw mode")?;
    execute!(io::stdout(), terminal::LeaveAlternateScreen).context("leave alternate screen")?;
    result
}

fn apply_session_events(ui: &mut UiState, events: Vec<SessionEvent>) {
    for event in events {
        match event {
            SessionEvent::LoadFailed(_) => {
                ui.selected = None;
            }
            SessionEvent::HydrationFinished { unavailable } => {
                ui.status_line = Some(if unavailable == 0 {
                    "all details loaded".to_owned()
                } else {
                    format!("all details loaded; {unavailable} unavailable")
                });
            }
            SessionEvent::ItemSelected { entry, detail } => {
                ui.selected = Some(SelectedItem { entry, detail });
            }
            SessionEvent::Navigation(_) => {
                ui.cursor = 0;
            }
            SessionEvent::LoadStarted
            | SessionEvent::ListingLoaded { .. }
            | SessionEvent::DetailHydrated { .. } => {}
        }
    }
}

fn handle_key_event(session: &mut CatalogSession, ui: &mut UiState, key: KeyEvent) -> KeyOutcome {
    if key.code == KeyCode::Char('q') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return KeyOutcome::Quit;
    }

    if ui.selected.is_some() {
        if matches!(key.code, KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q')) {
            ui.selected = None;
        }
        return KeyOutcome::Continue;
    }

    if !session.status().is_ready() {
        let failed = matches!(session.status(), LoadStatus::Failed(_));
        match key.code {
            KeyCode::Char('q') => return KeyOutcome::Quit,
            KeyCode::Char('r') if failed => {
                let events = session.dispatch(Intent::Retry);
                apply_session_events(ui, events);
            }
            _ => {}
        }
        return KeyOutcome::Continue;
    }

    if ui.input == InputMode::Search {
        handle_search_key(session, ui, key);
        return KeyOutcome::Continue;
    }

    let intent = match key.code {
        KeyCode::Char('q') => return KeyOutcome::Quit,
        KeyCode::Char('/') => {
            ui.input = InputMode::Search;
            None
        }
        KeyCode::Char('c') => Some(Intent::CategoryChanged(cycle_category(
            &session.categories(),
            session.view().selected_category.as_deref(),
            true,
        ))),
        KeyCode::Char('C') => Some(Intent::CategoryChanged(cycle_category(
            &session.categories(),
            session.view().selected_category.as_deref(),
            false,
        ))),
        KeyCode::Char('x') => Some(Intent::CategoryChanged(None)),
        KeyCode::Right | KeyCode::Char('l') => Some(Intent::NextPage),
        KeyCode::Left | KeyCode::Char('h') => Some(Intent::PrevPage),
        KeyCode::Down | KeyCode::Char('j') => {
            let rows = session.projection().page_items.len();
            if ui.cursor + 1 < rows {
                ui.cursor += 1;
            }
            None
        }
        KeyCode::Up | KeyCode::Char('k') => {
            ui.cursor = ui.cursor.saturating_sub(1);
            None
        }
        KeyCode::Enter => Some(Intent::Select(ui.cursor)),
        _ => None,
    };

    if let Some(intent) = intent {
        debug!(?intent, "dispatch");
        let events = session.dispatch(intent);
        apply_session_events(ui, events);
    }
    KeyOutcome::Continue
}

fn handle_search_key(session: &mut CatalogSession, ui: &mut UiState, key: KeyEvent) {
    let mut query = session.view().search_query.clone();
    match key.code {
        KeyCode::Esc | KeyCode::Enter => {
            ui.input = InputMode::Browse;
            return;
        }
        KeyCode::Backspace => {
            query.pop();
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            query.clear();
        }
        KeyCode::Char(ch) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            query.push(ch);
        }
        _ => return,
    }
    let events = session.dispatch(Intent::SearchChanged(query));
    apply_session_events(ui, events);
}

/// Next (or previous) category after `current`, wrapping through "no
/// category" at both ends.
fn cycle_category(categories: &[String], current: Option<&str>, forward: bool) -> Option<String> {
    if categories.is_empty() {
        return None;
    }
    let position = current.and_then(|name| categories.iter().position(|c| c == name));
    let next = match (position, forward) {
        (None, true) => Some(0),
        (None, false) => Some(categories.len() - 1),
        (Some(index), true) if index + 1 < categories.len() => Some(index + 1),
        (Some(index), false) if index > 0 => Some(index - 1),
        (Some(_), _) => None,
    };
    next.map(|index| categories[index].clone())
}

fn render(frame: &mut ratatui::Frame<'_>, session: &CatalogSession, ui: &UiState) {
    match session.status() {
        LoadStatus::Loading => {
            let body = Paragraph::new("loading catalog…")
                .block(Block::default().title("dexview").borders(Borders::ALL));
            frame.render_widget(body, frame.area());
            return;
        }
        LoadStatus::Failed(message) => {
            let body = Paragraph::new(render_error_text(message))
                .style(Style::default().fg(Color::Red))
                .block(Block::default().title("dexview").borders(Borders::ALL));
            frame.render_widget(body, frame.area());
            return;
        }
        LoadStatus::Ready => {}
    }

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(3),
        ])
        .split(frame.area());

    let header = Paragraph::new(render_header_text(session.view(), ui.input))
        .block(Block::default().title("dexview").borders(Borders::ALL));
    frame.render_widget(header, layout[0]);

    let view = session.projection();
    let rows = view
        .page_items
        .iter()
        .map(|item| Row::new(row_cells(item).map(Cell::from)))
        .collect::<Vec<_>>();
    let table = Table::new(
        rows,
        [
            Constraint::Length(6),
            Constraint::Percentage(30),
            Constraint::Percentage(20),
            Constraint::Percentage(50),
        ],
    )
    .header(
        Row::new(COLUMNS.map(Cell::from)).style(Style::default().add_modifier(Modifier::BOLD)),
    )
    .row_highlight_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
    .block(
        Block::default()
            .title(render_pager_text(session.view(), view.total_pages, view.match_count))
            .borders(Borders::ALL),
    );
    let mut table_state = TableState::default();
    if !view.page_items.is_empty() {
        table_state.select(Some(ui.cursor.min(view.page_items.len() - 1)));
    }
    frame.render_stateful_widget(table, layout[1], &mut table_state);

    let status = Paragraph::new(render_status_text(session.progress(), ui.status_line.as_deref()))
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(status, layout[2]);

    if let Some(selected) = &ui.selected {
        let area = centered_rect(60, 40, frame.area());
        frame.render_widget(Clear, area);
        let overlay = Paragraph::new(render_detail_text(&selected.entry, selected.detail.as_ref()))
            .block(
                Block::default()
                    .title(selected.entry.name.as_str())
                    .borders(Borders::ALL),
            );
        frame.render_widget(overlay, area);
    }
}

fn row_cells(item: &ProjectedItem<'_>) -> [String; 4] {
    match item.detail {
        Some(detail) if detail.is_unavailable() => [
            String::new(),
            item.entry.name.clone(),
            detail.category_name.clone(),
            PLACEHOLDER_UNAVAILABLE.to_owned(),
        ],
        Some(detail) => [
            detail.id.get().to_string(),
            item.entry.name.clone(),
            detail.category_name.clone(),
            detail.sprite.clone(),
        ],
        None => [
            String::new(),
            item.entry.name.clone(),
            String::new(),
            PLACEHOLDER_LOADING.to_owned(),
        ],
    }
}

fn render_header_text(view: &ViewState, input: InputMode) -> String {
    let cursor = if input == InputMode::Search { "▏" } else { "" };
    let category = view.selected_category.as_deref().unwrap_or("all");
    format!(
        "search: {}{cursor}   category: {category}",
        view.search_query
    )
}

fn render_pager_text(view: &ViewState, total_pages: usize, match_count: usize) -> String {
    if total_pages == 0 {
        return "no matches".to_owned();
    }
    format!(
        "page {} / {total_pages} ({match_count} matches)",
        view.current_page + 1
    )
}

fn render_status_text(progress: HydrationProgress, status_line: Option<&str>) -> String {
    let mut text = format!("details {}/{}", progress.cached, progress.total);
    if progress.unavailable > 0 {
        text.push_str(&format!(" ({} unavailable)", progress.unavailable));
    }
    if let Some(line) = status_line {
        text.push_str(" · ");
        text.push_str(line);
    }
    text.push_str("   / search · c/C category · x clear · ←/→ page · enter open · q quit");
    text
}

fn render_error_text(message: &str) -> String {
    format!("could not load the catalog\n\n{message}\n\npress r to retry or q to quit")
}

fn render_detail_text(entry: &ListingEntry, detail: Option<&DetailRecord>) -> String {
    match detail {
        Some(detail) if !detail.is_unavailable() => format!(
            "id: {}\nname: {}\ncategory: {}\nsprite: {}\nsource: {}",
            detail.id.get(),
            entry.name,
            detail.category_name,
            detail.sprite,
            entry.url
        ),
        Some(_) => format!("name: {}\n{PLACEHOLDER_UNAVAILABLE}\nsource: {}", entry.name, entry.url),
        None => format!("name: {}\n{PLACEHOLDER_LOADING}\nsource: {}", entry.name, entry.url),
    }
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}
