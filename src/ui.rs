use chrono::NaiveDate;
use color_eyre::Result;
use crossterm::{
    event::{KeyCode, KeyEvent, KeyModifiers},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Position},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame, Terminal,
};
use std::io::{stdout, Stdout};

use crate::controller::ControllerEvent;
use crate::diary_state::DiaryState;
use crate::editor::Editor;
use crate::save_status::SaveStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Editor,
    Entries,
}

/// Screen-local state: the editing buffer, focus and list selection.
pub struct Page {
    editor: Editor,
    focus: Focus,
    list_state: ListState,
    seen_revision: u64,
    seen_list_revision: u64,
    /// Row dates as of the last sync, so a selection survives list reloads.
    row_dates: Vec<NaiveDate>,
}

impl Default for Page {
    fn default() -> Self {
        Page::new()
    }
}

impl Page {
    pub fn new() -> Self {
        Page {
            editor: Editor::new(),
            focus: Focus::Editor,
            list_state: ListState::default(),
            seen_revision: 0,
            seen_list_revision: 0,
            row_dates: Vec::new(),
        }
    }

    pub fn focus(&self) -> Focus {
        self.focus
    }

    pub fn selected_date(&self) -> Option<NaiveDate> {
        self.list_state
            .selected()
            .and_then(|i| self.row_dates.get(i).copied())
    }

    /// Picks up content loaded by the controller (initial load or entry
    /// switch) and keeps the list selection on the same date when the list
    /// is reloaded.
    pub fn sync(&mut self, state: &DiaryState, today: NaiveDate) {
        let rows = state.rows(today);
        if state.content_revision() != self.seen_revision {
            self.seen_revision = state.content_revision();
            self.editor.set_text(state.content());
            self.list_state
                .select(rows.iter().position(|row| row.active));
        } else if state.list_revision() != self.seen_list_revision {
            let selected = self
                .selected_date()
                .and_then(|date| rows.iter().position(|row| row.date == date))
                .or_else(|| rows.iter().position(|row| row.active));
            self.list_state.select(selected);
        }
        self.seen_list_revision = state.list_revision();
        self.row_dates = rows.into_iter().map(|row| row.date).collect();
    }

    pub fn handle_key(
        &mut self,
        key: KeyEvent,
        state: &DiaryState,
        today: NaiveDate,
    ) -> Option<ControllerEvent> {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Some(ControllerEvent::Exit);
        }
        match self.focus {
            Focus::Editor => self.handle_editor_key(key),
            Focus::Entries => self.handle_entries_key(key, state, today),
        }
    }

    fn handle_editor_key(&mut self, key: KeyEvent) -> Option<ControllerEvent> {
        let changed = match key.code {
            KeyCode::Esc => return Some(ControllerEvent::Exit),
            KeyCode::Tab => {
                self.focus = Focus::Entries;
                false
            }
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.editor.insert_char(c);
                true
            }
            KeyCode::Enter => {
                self.editor.insert_newline();
                true
            }
            KeyCode::Backspace => self.editor.backspace(),
            KeyCode::Delete => self.editor.delete(),
            KeyCode::Left => {
                self.editor.move_left();
                false
            }
            KeyCode::Right => {
                self.editor.move_right();
                false
            }
            KeyCode::Up => {
                self.editor.move_up();
                false
            }
            KeyCode::Down => {
                self.editor.move_down();
                false
            }
            KeyCode::Home => {
                self.editor.move_home();
                false
            }
            KeyCode::End => {
                self.editor.move_end();
                false
            }
            _ => false,
        };

        changed.then(|| ControllerEvent::ContentEdited(self.editor.text().to_string()))
    }

    fn handle_entries_key(
        &mut self,
        key: KeyEvent,
        state: &DiaryState,
        today: NaiveDate,
    ) -> Option<ControllerEvent> {
        let rows = state.rows(today);
        match key.code {
            KeyCode::Tab | KeyCode::Esc => {
                self.focus = Focus::Editor;
                None
            }
            KeyCode::Up => {
                let selected = self.list_state.selected().unwrap_or(0);
                self.list_state.select(Some(selected.saturating_sub(1)));
                None
            }
            KeyCode::Down => {
                if !rows.is_empty() {
                    let next = self
                        .list_state
                        .selected()
                        .map_or(0, |i| (i + 1).min(rows.len() - 1));
                    self.list_state.select(Some(next));
                }
                None
            }
            KeyCode::Enter => {
                let row = rows.get(self.list_state.selected()?)?;
                self.focus = Focus::Editor;
                Some(ControllerEvent::EntrySelected(row.date))
            }
            _ => None,
        }
    }

    pub fn render(&mut self, f: &mut Frame, state: &DiaryState, today: NaiveDate) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .margin(1)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(5),
                Constraint::Length(3),
            ])
            .split(f.area());

        let title = Paragraph::new(state.heading_text(today))
            .style(
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            )
            .alignment(ratatui::layout::Alignment::Center)
            .block(Block::default().borders(Borders::ALL).title("Personal Diary"));
        f.render_widget(title, chunks[0]);

        let body = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(24), Constraint::Min(20)])
            .split(chunks[1]);

        let current_focus = self.focus;
        let focus_style = move |focus: Focus| {
            if current_focus == focus {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default()
            }
        };

        let entries_block = Block::default()
            .borders(Borders::ALL)
            .title("Entries")
            .border_style(focus_style(Focus::Entries));
        match state.list_placeholder() {
            Some(message) => {
                let placeholder = Paragraph::new(message.to_string())
                    .style(Style::default().fg(Color::DarkGray))
                    .block(entries_block);
                f.render_widget(placeholder, body[0]);
            }
            None => {
                let items: Vec<ListItem> = state
                    .rows(today)
                    .into_iter()
                    .map(|row| {
                        let style = if row.active {
                            Style::default()
                                .fg(Color::Cyan)
                                .add_modifier(Modifier::BOLD)
                        } else {
                            Style::default()
                        };
                        ListItem::new(Line::from(Span::styled(row.label, style)))
                    })
                    .collect();
                let list = List::new(items)
                    .block(entries_block)
                    .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
                    .highlight_symbol("> ");
                f.render_stateful_widget(list, body[0], &mut self.list_state);
            }
        }

        let editor_title = match state.notice() {
            Some(notice) => format!("Entry ({notice})"),
            None => "Entry".to_string(),
        };
        let content = Paragraph::new(self.editor.text().to_string()).block(
            Block::default()
                .borders(Borders::ALL)
                .title(editor_title)
                .border_style(focus_style(Focus::Editor)),
        );
        f.render_widget(content, body[1]);
        if self.focus == Focus::Editor {
            let (row, column) = self.editor.cursor_position();
            f.set_cursor_position(Position::new(
                body[1].x.saturating_add(1).saturating_add(column),
                body[1].y.saturating_add(1).saturating_add(row),
            ));
        }

        let status = state.status();
        let footer = Line::from(vec![
            Span::styled(
                format!(" {} ", status.as_str()),
                Style::default()
                    .fg(Color::Black)
                    .bg(status_color(status))
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw("  "),
            Span::styled("Tab", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" switch pane, "),
            Span::styled("Enter", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" open entry, "),
            Span::styled("Esc", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" quit"),
        ]);
        let footer = Paragraph::new(footer).block(Block::default().borders(Borders::ALL));
        f.render_widget(footer, chunks[2]);
    }
}

fn status_color(status: SaveStatus) -> Color {
    match status {
        SaveStatus::Ready => Color::Gray,
        SaveStatus::Saving => Color::Yellow,
        SaveStatus::Saved => Color::Green,
        SaveStatus::Error => Color::Red,
    }
}

/// What the event loop needs from the terminal.
pub trait Screen {
    fn display(&mut self, state: &DiaryState, today: NaiveDate) -> Result<()>;

    fn handle_key(
        &mut self,
        key: KeyEvent,
        state: &DiaryState,
        today: NaiveDate,
    ) -> Option<ControllerEvent>;

    /// Hands the terminal back to the shell.
    fn restore(&mut self) -> Result<()>;
}

pub struct UI {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    page: Page,
}

impl UI {
    pub fn new() -> Result<Self> {
        enable_raw_mode()?;
        stdout().execute(EnterAlternateScreen)?;

        let backend = CrosstermBackend::new(stdout());
        let terminal = Terminal::new(backend)?;

        Ok(UI {
            terminal,
            page: Page::new(),
        })
    }
}

impl Screen for UI {
    fn display(&mut self, state: &DiaryState, today: NaiveDate) -> Result<()> {
        let UI { terminal, page } = self;
        page.sync(state, today);
        terminal.draw(|f| page.render(f, state, today))?;
        Ok(())
    }

    fn handle_key(
        &mut self,
        key: KeyEvent,
        state: &DiaryState,
        today: NaiveDate,
    ) -> Option<ControllerEvent> {
        self.page.handle_key(key, state, today)
    }

    fn restore(&mut self) -> Result<()> {
        disable_raw_mode()?;
        self.terminal.backend_mut().execute(LeaveAlternateScreen)?;
        self.terminal.show_cursor()?;
        Ok(())
    }
}
