use std::{io, time::Duration};

use color_eyre::Result;
use crossterm::{
    event::{self, DisableMouseCapture, Event, KeyCode},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, List, ListItem, ListState, Paragraph},
    Terminal,
};

use crate::{commands::stored_label, storage::DemoStore};

const PREVIEW_CHARS: usize = 60;

/// One line of the entry browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryRow {
    pub key: String,
    pub stored: String,
    pub preview: String,
}

/// Snapshot the namespace's entries. Keys whose entries vanish or fail to
/// decode between listing and reading are shown as unreadable.
pub async fn load_rows(store: &DemoStore) -> Result<Vec<EntryRow>> {
    let mut rows = Vec::new();
    for key in store.keys().await? {
        let row = match store.get(key.as_str()).await? {
            Some(entry) => EntryRow {
                stored: stored_label(&entry),
                preview: preview(&serde_json::to_string(&entry.value)?),
                key,
            },
            None => EntryRow {
                key,
                stored: "-".to_string(),
                preview: "<unreadable>".to_string(),
            },
        };
        rows.push(row);
    }
    Ok(rows)
}

fn preview(json: &str) -> String {
    if json.chars().count() <= PREVIEW_CHARS {
        return json.to_string();
    }
    let mut cut: String = json.chars().take(PREVIEW_CHARS).collect();
    cut.push('…');
    cut
}

/// Read-only browser over the namespace's entries.
/// Use arrow keys to move; press `q` or `Esc` to exit.
pub fn launch(namespace: &str, rows: &[EntryRow]) -> Result<()> {
    // Guard restores the terminal even if we early-return.
    let _guard = TerminalGuard::enter()?;
    let mut terminal = _guard.terminal()?;
    let mut state = ListState::default();
    if !rows.is_empty() {
        state.select(Some(0));
    }

    loop {
        terminal.draw(|frame| {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .margin(2)
                .constraints([
                    Constraint::Length(3),
                    Constraint::Min(1),
                    Constraint::Length(3),
                ])
                .split(frame.area());

            let header = Paragraph::new(Line::from(vec![
                Span::styled(
                    "Sealbox",
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::raw(format!(" namespace `{namespace}`, {} entries", rows.len())),
            ]))
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_type(BorderType::Rounded)
                    .title(Span::styled(
                        "Secure store",
                        Style::default()
                            .fg(Color::Green)
                            .add_modifier(Modifier::BOLD | Modifier::ITALIC),
                    )),
            );
            frame.render_widget(header, chunks[0]);

            let items: Vec<ListItem> = rows
                .iter()
                .map(|row| {
                    ListItem::new(Line::from(vec![
                        Span::styled(&row.key, Style::default().add_modifier(Modifier::BOLD)),
                        Span::raw(" "),
                        Span::styled(&row.stored, Style::default().fg(Color::Yellow)),
                        Span::raw(" "),
                        Span::raw(&row.preview),
                    ]))
                })
                .collect();

            let body = List::new(items)
                .block(Block::default().borders(Borders::ALL).title("Entries"))
                .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
            frame.render_stateful_widget(body, chunks[1], &mut state);

            let footer = Paragraph::new(Line::from(vec![
                Span::styled("↑/↓", Style::default().fg(Color::Cyan)),
                Span::raw(" move, "),
                Span::styled("q", Style::default().fg(Color::Cyan)),
                Span::raw(" or "),
                Span::styled("Esc", Style::default().fg(Color::Cyan)),
                Span::raw(" to quit."),
            ]))
            .block(Block::default().borders(Borders::ALL).title("Controls"));
            frame.render_widget(footer, chunks[2]);
        })?;

        if event::poll(Duration::from_millis(150))? {
            if let Event::Key(key) = event::read()? {
                match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => break,
                    KeyCode::Down => state.select_next(),
                    KeyCode::Up => state.select_previous(),
                    _ => {}
                }
            }
        }
    }

    Ok(())
}

struct TerminalGuard;

impl TerminalGuard {
    fn enter() -> Result<Self> {
        enable_raw_mode()?;
        // Enter alternate screen to avoid polluting the shell buffer.
        execute!(io::stdout(), EnterAlternateScreen)?;
        Ok(Self)
    }

    fn terminal(&self) -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
        let backend = CrosstermBackend::new(io::stdout());
        Ok(Terminal::new(backend)?)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        // Best-effort cleanup; errors are logged but not propagated from Drop.
        if let Err(err) = disable_raw_mode() {
            eprintln!("failed to disable raw mode: {err}");
        }
        if let Err(err) = execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture) {
            eprintln!("failed to restore terminal: {err}");
        }
    }
}
