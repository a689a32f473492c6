use crate::{
    app::{App, DialogChoice, Focus, FormField, InputMode, ToastLevel},
    logging,
    record::{GameRecord, GameStatus},
};
use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use log::Level;
use ratatui::{
    prelude::*,
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Cell, Clear, Padding, Paragraph, Row, Table, TableState},
};
use std::{
    io,
    time::{Duration, Instant},
};

const FORM_PANEL_WIDTH: u16 = 44;
const LOG_PANEL_HEIGHT: u16 = 7;

#[derive(Clone)]
struct Theme {
    accent: Color,
    accent_soft: Color,
    border: Color,
    text: Color,
    muted: Color,
    success: Color,
    warning: Color,
    error: Color,
    header_bg: Color,
    log_bg: Color,
}

impl Theme {
    fn new() -> Self {
        Self {
            accent: Color::Rgb(120, 190, 255),
            accent_soft: Color::Rgb(70, 110, 160),
            border: Color::Rgb(65, 75, 90),
            text: Color::Rgb(220, 230, 240),
            muted: Color::Rgb(135, 145, 155),
            success: Color::Rgb(120, 220, 140),
            warning: Color::Rgb(230, 200, 120),
            error: Color::Rgb(235, 100, 95),
            header_bg: Color::Rgb(22, 28, 36),
            log_bg: Color::Rgb(16, 20, 26),
        }
    }

    fn block(&self, title: &'static str, focused: bool) -> Block<'static> {
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(if focused {
                self.accent_soft
            } else {
                self.border
            }))
            .title(Span::styled(
                title,
                Style::default()
                    .fg(self.accent)
                    .add_modifier(Modifier::BOLD),
            ))
    }

    fn panel(&self, title: &'static str, focused: bool) -> Block<'static> {
        self.block(title, focused).padding(Padding {
            left: 1,
            right: 1,
            top: 1,
            bottom: 0,
        })
    }

    fn status_color(&self, status: GameStatus) -> Color {
        match status {
            GameStatus::Owned => self.text,
            GameStatus::InProgress => self.accent,
            GameStatus::Finished => self.success,
            GameStatus::Wishlisted => self.warning,
        }
    }
}

pub fn run(app: &mut App) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_loop(&mut terminal, app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn run_loop(terminal: &mut Terminal<impl Backend>, app: &mut App) -> Result<()> {
    loop {
        app.tick();
        app.clamp_cursor();
        terminal.draw(|frame| draw(frame, app))?;

        if app.should_quit {
            break;
        }

        if event::poll(Duration::from_millis(200))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    handle_key(app, key);
                }
            }
        }
    }

    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    if app.dialog.is_some() {
        handle_dialog_mode(app, key);
        return;
    }

    let mode = std::mem::replace(&mut app.input_mode, InputMode::Normal);
    match mode {
        InputMode::Normal => match app.focus {
            Focus::Games => handle_games_mode(app, key),
            Focus::Form => handle_form_mode(app, key),
        },
        InputMode::Editing {
            prompt,
            mut buffer,
            purpose,
        } => match key.code {
            KeyCode::Esc => {
                app.status = format!("{prompt}: cancelled");
            }
            KeyCode::Enter => {
                app.handle_submit(purpose, buffer);
            }
            KeyCode::Char(c) => {
                if !key.modifiers.contains(KeyModifiers::CONTROL) {
                    buffer.push(c);
                }
                app.input_mode = InputMode::Editing {
                    prompt,
                    buffer,
                    purpose,
                };
            }
            KeyCode::Backspace => {
                buffer.pop();
                app.input_mode = InputMode::Editing {
                    prompt,
                    buffer,
                    purpose,
                };
            }
            _ => {
                app.input_mode = InputMode::Editing {
                    prompt,
                    buffer,
                    purpose,
                };
            }
        },
    }
}

fn handle_dialog_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Left | KeyCode::Char('h') | KeyCode::Char('H') => app.dialog_choice_left(),
        KeyCode::Right | KeyCode::Char('l') | KeyCode::Char('L') | KeyCode::Tab => {
            app.dialog_choice_right()
        }
        KeyCode::Char('y') | KeyCode::Char('Y') => app.dialog_set_choice(DialogChoice::Yes),
        KeyCode::Char('n') | KeyCode::Char('N') => app.dialog_set_choice(DialogChoice::No),
        KeyCode::Char(' ') => app.dialog_toggle(),
        KeyCode::Enter => app.dialog_confirm(),
        KeyCode::Esc => {
            app.dialog_set_choice(DialogChoice::No);
            app.dialog_confirm();
        }
        _ => {}
    }
}

fn handle_games_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') | KeyCode::Char('Q') => app.should_quit = true,
        KeyCode::Tab => app.cycle_focus(),
        KeyCode::Up | KeyCode::Char('k') => app.move_cursor(-1),
        KeyCode::Down | KeyCode::Char('j') => app.move_cursor(1),
        KeyCode::PageUp => app.move_cursor(-10),
        KeyCode::PageDown => app.move_cursor(10),
        KeyCode::Home => app.cursor = 0,
        KeyCode::End => app.cursor = app.rows.len().saturating_sub(1),
        KeyCode::Enter | KeyCode::Char('e') => app.edit_current(),
        KeyCode::Char('d') | KeyCode::Delete => app.prompt_delete_game(),
        KeyCode::Char('n') => app.new_entry(),
        KeyCode::Char('/') => app.enter_filter(),
        KeyCode::Char('[') => app.cycle_profile(-1),
        KeyCode::Char(']') => app.cycle_profile(1),
        KeyCode::Char('c') => app.enter_create_profile(),
        KeyCode::Char('x') => app.prompt_delete_profile(),
        KeyCode::Char('s') => app.retry_save(),
        KeyCode::Esc => app.clear_selection(),
        _ => {}
    }
}

fn handle_form_mode(app: &mut App, key: KeyEvent) {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        match key.code {
            KeyCode::Char('n') => app.new_entry(),
            KeyCode::Char('s') => app.submit_form(),
            KeyCode::Char('c') | KeyCode::Char('q') => app.should_quit = true,
            _ => {}
        }
        return;
    }

    match key.code {
        KeyCode::Esc => app.focus = Focus::Games,
        KeyCode::Enter => app.submit_form(),
        KeyCode::Tab | KeyCode::Down => app.form_next_field(),
        KeyCode::BackTab | KeyCode::Up => app.form_prev_field(),
        KeyCode::Left if app.form_field == FormField::Status => app.cycle_status(false),
        KeyCode::Right if app.form_field == FormField::Status => app.cycle_status(true),
        KeyCode::Char(' ') if app.form_field == FormField::Status => app.cycle_status(true),
        KeyCode::Char(c) => {
            if let Some(value) = app.form_value_mut() {
                value.push(c);
            }
        }
        KeyCode::Backspace => {
            if let Some(value) = app.form_value_mut() {
                value.pop();
            }
        }
        _ => {}
    }
}

fn draw(frame: &mut Frame<'_>, app: &App) {
    let area = frame.size();
    let theme = Theme::new();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(8),
            Constraint::Length(LOG_PANEL_HEIGHT),
            Constraint::Length(1),
        ])
        .split(area);

    frame.render_widget(header(app, &theme), chunks[0]);
    frame.render_widget(profile_strip(app, &theme), chunks[1]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(30), Constraint::Length(FORM_PANEL_WIDTH)])
        .split(chunks[2]);
    draw_games(frame, app, &theme, body[0]);
    draw_form(frame, app, &theme, body[1]);
    draw_logs(frame, app, &theme, chunks[3]);

    let status = Paragraph::new(status_bar_line(app))
        .style(Style::default().fg(theme.muted).bg(theme.header_bg));
    frame.render_widget(status, chunks[4]);

    if let InputMode::Editing { prompt, buffer, .. } = &app.input_mode {
        draw_prompt(frame, &theme, prompt, buffer);
    }
    draw_dialog(frame, app, &theme);
    draw_toast(frame, app, &theme, chunks[2]);
}

fn header(app: &App, theme: &Theme) -> Paragraph<'static> {
    let counts = app
        .session
        .collection()
        .map(|collection| collection.status_counts())
        .unwrap_or_default();
    let mut spans = vec![
        Span::styled("Profile: ", Style::default().fg(theme.muted)),
        Span::styled(app.active_profile_label(), Style::default().fg(theme.accent)),
        Span::raw("   "),
        Span::styled("Games: ", Style::default().fg(theme.muted)),
        Span::styled(counts.total().to_string(), Style::default().fg(theme.text)),
    ];
    for status in GameStatus::ALL {
        spans.push(Span::raw("   "));
        spans.push(Span::styled(
            format!("{}: ", status.label()),
            Style::default().fg(theme.muted),
        ));
        spans.push(Span::styled(
            counts.get(status).to_string(),
            Style::default().fg(theme.status_color(status)),
        ));
    }
    if let Some(filter) = &app.filter {
        spans.push(Span::raw("   "));
        spans.push(Span::styled(
            format!("Filter: {filter}"),
            Style::default().fg(theme.warning),
        ));
    }

    Paragraph::new(vec![
        Line::from(Span::styled(
            "GameShelf",
            Style::default()
                .fg(theme.accent)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(spans),
    ])
    .style(Style::default().bg(theme.header_bg))
    .alignment(Alignment::Center)
}

fn profile_strip(app: &App, theme: &Theme) -> Paragraph<'static> {
    let active = app.session.active_profile();
    let mut spans = Vec::new();
    for name in &app.profiles {
        let style = if Some(name.as_str()) == active {
            Style::default()
                .fg(Color::Black)
                .bg(theme.accent)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(theme.text)
        };
        spans.push(Span::styled(format!(" {name} "), style));
        spans.push(Span::raw(" "));
    }
    Paragraph::new(Line::from(spans)).block(theme.block("Profiles  [ ] switch  c new  x delete", false))
}

fn draw_games(frame: &mut Frame<'_>, app: &App, theme: &Theme, area: Rect) {
    let selected = app.session.selected();
    let rows: Vec<Row> = app
        .rows
        .iter()
        .filter_map(|index| {
            let record = app.session.collection()?.get(*index)?;
            Some(row_for_record(*index, record, selected == Some(*index), theme))
        })
        .collect();
    let header = Row::new(vec!["#", "Title", "Platform", "Genre", "Status"]).style(
        Style::default()
            .fg(theme.muted)
            .add_modifier(Modifier::BOLD),
    );
    let widths = [
        Constraint::Length(4),
        Constraint::Percentage(40),
        Constraint::Percentage(18),
        Constraint::Percentage(22),
        Constraint::Length(12),
    ];
    let table = Table::new(rows, widths)
        .header(header)
        .block(theme.block("Collection", app.focus == Focus::Games))
        .highlight_style(
            Style::default()
                .bg(theme.accent_soft)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");
    let mut state = TableState::default();
    if !app.rows.is_empty() {
        state.select(Some(app.cursor));
    }
    frame.render_stateful_widget(table, area, &mut state);

    if app.rows.is_empty() {
        let message = if app.filter.is_some() {
            "No game matches the filter"
        } else {
            "Your collection is empty. Press n to add a game."
        };
        let inner = Rect::new(
            area.x + 2,
            area.y + 3,
            area.width.saturating_sub(4),
            1u16.min(area.height.saturating_sub(3)),
        );
        frame.render_widget(
            Paragraph::new(message).style(Style::default().fg(theme.muted)),
            inner,
        );
    }
}

fn row_for_record(index: usize, record: &GameRecord, editing: bool, theme: &Theme) -> Row<'static> {
    let marker_style = if editing {
        Style::default().fg(theme.warning)
    } else {
        Style::default().fg(theme.muted)
    };
    Row::new(vec![
        Cell::from(index.to_string()).style(marker_style),
        Cell::from(record.title.clone()),
        Cell::from(record.platform.clone()),
        Cell::from(record.genre.clone()).style(Style::default().fg(theme.muted)),
        Cell::from(record.status.label()).style(Style::default().fg(theme.status_color(record.status))),
    ])
}

fn draw_form(frame: &mut Frame<'_>, app: &App, theme: &Theme, area: Rect) {
    let focused = app.focus == Focus::Form;
    let (title, mode_style) = match app.session.selected() {
        Some(index) => (format!("Editing #{index}"), Style::default().fg(theme.warning)),
        None => ("New game".to_string(), Style::default().fg(theme.success)),
    };
    let mut lines = vec![
        Line::from(Span::styled(title, mode_style.add_modifier(Modifier::BOLD))),
        Line::from(""),
    ];
    for field in FormField::ALL {
        let active = focused && app.form_field == field;
        let value = match field {
            FormField::Title => app.form.title.clone(),
            FormField::Platform => app.form.platform.clone(),
            FormField::Genre => app.form.genre.clone(),
            FormField::Status => format!("< {} >", app.form.status.label()),
        };
        let cursor = if active && field != FormField::Status { "_" } else { "" };
        let label_style = if active {
            Style::default().fg(theme.accent).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(theme.muted)
        };
        lines.push(Line::from(vec![
            Span::styled(format!("{:<9}", field.label()), label_style),
            Span::styled(format!("{value}{cursor}"), Style::default().fg(theme.text)),
        ]));
    }
    lines.push(Line::from(""));
    let hint = if focused {
        "Enter save  Esc back  Ctrl+N new"
    } else {
        "Tab to edit  Enter load  n new"
    };
    lines.push(Line::from(Span::styled(hint, Style::default().fg(theme.muted))));

    frame.render_widget(
        Paragraph::new(lines).block(theme.panel("Add / Edit", focused)),
        area,
    );
}

fn draw_logs(frame: &mut Frame<'_>, app: &App, theme: &Theme, area: Rect) {
    let height = area.height.saturating_sub(2) as usize;
    let lines: Vec<Line> = app
        .logs
        .recent(height)
        .into_iter()
        .map(|entry| {
            let color = match entry.level {
                Level::Error => theme.error,
                Level::Warn => theme.warning,
                _ => theme.muted,
            };
            Line::from(vec![
                Span::styled(
                    format!("[{}] ", logging::level_label(entry.level)),
                    Style::default().fg(color),
                ),
                Span::styled(entry.message, Style::default().fg(theme.text)),
            ])
        })
        .collect();
    frame.render_widget(
        Paragraph::new(lines)
            .block(theme.block("Log", false))
            .style(Style::default().bg(theme.log_bg)),
        area,
    );
}

fn status_bar_line(app: &App) -> String {
    let keys = match app.focus {
        Focus::Games => "q quit  Tab form  Enter edit  d delete  / filter  s save",
        Focus::Form => "Tab/Up/Down field  Left/Right status  Enter save  Esc table",
    };
    if app.status.is_empty() {
        keys.to_string()
    } else {
        format!("{}  |  {keys}", app.status)
    }
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width.saturating_sub(2));
    let height = height.min(area.height.saturating_sub(2));
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}

fn draw_prompt(frame: &mut Frame<'_>, theme: &Theme, prompt: &str, buffer: &str) {
    let area = centered(frame.size(), 50, 5);
    frame.render_widget(Clear, area);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(theme.accent_soft))
        .title(Span::styled(
            prompt.to_string(),
            Style::default().fg(theme.accent).add_modifier(Modifier::BOLD),
        ))
        .style(Style::default().bg(theme.header_bg));
    let body = Paragraph::new(vec![
        Line::from(format!("{buffer}_")),
        Line::from(Span::styled(
            "Enter confirm  Esc cancel",
            Style::default().fg(theme.muted),
        )),
    ])
    .block(block)
    .style(Style::default().fg(theme.text));
    frame.render_widget(body, area);
}

fn draw_dialog(frame: &mut Frame<'_>, app: &App, theme: &Theme) {
    let Some(dialog) = &app.dialog else {
        return;
    };

    let area = frame.size();
    let width = (area.width.saturating_mul(2) / 3).clamp(34, area.width.saturating_sub(2).max(34));
    let height = if dialog.toggle.is_some() { 9 } else { 7 };
    let dialog_area = centered(area, width, height);

    let yes_selected = matches!(dialog.choice, DialogChoice::Yes);
    let yes_style = if yes_selected {
        Style::default()
            .fg(Color::Black)
            .bg(theme.accent)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(theme.text)
    };
    let no_style = if !yes_selected {
        Style::default()
            .fg(Color::Black)
            .bg(theme.warning)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(theme.text)
    };

    let mut lines = vec![
        Line::from(Span::styled(
            dialog.title.clone(),
            Style::default().fg(theme.accent).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(dialog.message.clone()),
    ];
    if let Some(toggle) = &dialog.toggle {
        let mark = if toggle.checked { "[x]" } else { "[ ]" };
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!("{mark} {} (space)", toggle.label),
            Style::default().fg(theme.muted),
        )));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(vec![
        Span::styled(format!(" {} ", dialog.yes_label), yes_style),
        Span::raw("   "),
        Span::styled(format!(" {} ", dialog.no_label), no_style),
    ]));

    frame.render_widget(Clear, dialog_area);
    let dialog_block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(theme.accent_soft))
        .style(Style::default().bg(theme.header_bg));
    let dialog_widget = Paragraph::new(lines)
        .block(dialog_block)
        .style(Style::default().fg(theme.text))
        .alignment(Alignment::Center);
    frame.render_widget(dialog_widget, dialog_area);
}

fn toast_width(chars: usize, max_width: u16) -> u16 {
    u16::try_from(chars)
        .unwrap_or(u16::MAX)
        .saturating_add(4)
        .clamp(24, max_width.max(24))
}

fn draw_toast(frame: &mut Frame<'_>, app: &App, theme: &Theme, body_area: Rect) {
    let Some(toast) = app.toast.as_ref() else {
        return;
    };
    if toast.expires_at <= Instant::now() {
        return;
    }

    let mut message = toast.message.clone();
    let max_width = body_area.width.saturating_sub(4).max(24);
    let max_text = max_width.saturating_sub(4) as usize;
    if message.chars().count() > max_text {
        message = message.chars().take(max_text.saturating_sub(3)).collect();
        message.push_str("...");
    }
    let width = toast_width(message.chars().count(), max_width);
    let x = body_area.x + (body_area.width.saturating_sub(width)) / 2;
    let toast_area = Rect::new(x, body_area.y + 1, width, 3);

    let border = match toast.level {
        ToastLevel::Info => theme.accent,
        ToastLevel::Warn => theme.warning,
        ToastLevel::Error => theme.error,
    };

    frame.render_widget(Clear, toast_area);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(border))
        .style(Style::default().bg(theme.header_bg));
    let content = Paragraph::new(message)
        .block(block)
        .style(Style::default().fg(theme.text))
        .alignment(Alignment::Center);
    frame.render_widget(content, toast_area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toast_width_saturates_for_long_messages() {
        assert_eq!(toast_width(3, 80), 24);
        assert_eq!(toast_width(40, 80), 44);
        assert_eq!(toast_width(70_000, 80), 80);
        assert_eq!(toast_width(usize::MAX, 120), 120);
    }
}
