use crate::client::AppSnapshot;
use color_eyre::eyre::Result;
use crossterm::event::{
    self,
    Event,
    KeyCode,
    KeyEventKind,
};
use crossterm::terminal::{
    disable_raw_mode,
    enable_raw_mode,
};
use gama_dice::{
    lifecycle::BetPhase,
    notify::Severity,
};
use ratatui::prelude::*;
use ratatui::widgets::*;
use std::io::stdout;

pub enum UserEvent {
    Quit,
    NextNumber,
    PrevNumber,
    PlaceBetAmount(u64),
    ExportHistory,
    Redraw,
}

#[derive(Debug, Default)]
pub struct UiState {
    mode: Mode,
    terminal: Option<Terminal<CrosstermBackend<std::io::Stdout>>>,
}

#[derive(Clone, Debug, Default)]
enum Mode {
    #[default]
    Normal,
    BetModal(BetState),
    QuitModal,
}

#[derive(Clone, Debug, Default)]
struct BetState {
    amount: u64,
}

pub fn terminal_enter(state: &mut UiState) -> Result<()> {
    enable_raw_mode()?;
    crossterm::execute!(std::io::stdout(), crossterm::terminal::EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout());
    state.terminal = Some(Terminal::new(backend)?);
    Ok(())
}

pub fn terminal_exit() -> Result<()> {
    disable_raw_mode()?;
    crossterm::execute!(std::io::stdout(), crossterm::terminal::LeaveAlternateScreen)?;
    Ok(())
}

pub fn draw(state: &mut UiState, snap: &AppSnapshot) -> Result<()> {
    if let Some(mut term) = state.terminal.take() {
        term.draw(|f| ui(f, state, snap))?;
        state.terminal = Some(term);
    }
    Ok(())
}

pub async fn next_event(state: &mut UiState) -> Result<UserEvent> {
    loop {
        if let Event::Key(k) = event::read()? {
            if k.kind != KeyEventKind::Press {
                continue;
            }
            match &mut state.mode {
                Mode::BetModal(bs) => match k.code {
                    KeyCode::Esc => {
                        state.mode = Mode::Normal;
                        return Ok(UserEvent::Redraw);
                    }
                    KeyCode::Enter => {
                        let amount = bs.amount;
                        state.mode = Mode::Normal;
                        return Ok(UserEvent::PlaceBetAmount(amount));
                    }
                    KeyCode::Up | KeyCode::Char('+') => {
                        bs.amount = bs.amount.saturating_add(10);
                        return Ok(UserEvent::Redraw);
                    }
                    KeyCode::Down | KeyCode::Char('-') => {
                        bs.amount = bs.amount.saturating_sub(10);
                        return Ok(UserEvent::Redraw);
                    }
                    KeyCode::Backspace => {
                        bs.amount /= 10;
                        return Ok(UserEvent::Redraw);
                    }
                    KeyCode::Char(c) if c.is_ascii_digit() => {
                        let d = c.to_digit(10).unwrap() as u64;
                        bs.amount = bs.amount.saturating_mul(10).saturating_add(d);
                        return Ok(UserEvent::Redraw);
                    }
                    _ => {}
                },
                Mode::QuitModal => match k.code {
                    KeyCode::Char('y') | KeyCode::Char('Y') => return Ok(UserEvent::Quit),
                    KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                        state.mode = Mode::Normal;
                        return Ok(UserEvent::Redraw);
                    }
                    _ => {}
                },
                Mode::Normal => {}
            }
            if matches!(state.mode, Mode::Normal) {
                return Ok(match k.code {
                    KeyCode::Char('q') | KeyCode::Esc => {
                        state.mode = Mode::QuitModal;
                        UserEvent::Redraw
                    }
                    KeyCode::Right => UserEvent::NextNumber,
                    KeyCode::Left => UserEvent::PrevNumber,
                    KeyCode::Char('b') | KeyCode::Enter => {
                        state.mode = Mode::BetModal(BetState::default());
                        UserEvent::Redraw
                    }
                    KeyCode::Char('x') => UserEvent::ExportHistory,
                    _ => continue,
                });
            }
        }
    }
}

fn ui(f: &mut Frame, state: &UiState, snap: &AppSnapshot) {
    f.render_widget(Clear, f.area());
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(5),
            Constraint::Min(6),
            Constraint::Length(8),
            Constraint::Length(3),
        ])
        .split(f.area());

    draw_top(f, chunks[0], snap);
    draw_bet_panel(f, chunks[1], snap);
    draw_history(f, chunks[2], snap);
    draw_notices(f, chunks[3], snap);
    draw_help(f, chunks[4], snap);
    draw_modals(f, state, snap);
}

fn draw_top(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let account = snap
        .account
        .map(|a| a.to_string())
        .unwrap_or_else(|| String::from("not connected"));
    let degraded = if snap.funds.degraded { " (stale)" } else { "" };
    let line = Line::from(vec![
        Span::styled(
            format!(" {} (chain {}) ", snap.network, snap.chain_id),
            Style::default().fg(Color::Cyan),
        ),
        Span::raw(format!("{account} ")),
        Span::styled(
            format!(
                "chips {} | allowance {}{degraded}",
                snap.funds.balance,
                if snap.funds.allowance == u64::MAX {
                    String::from("max")
                } else {
                    snap.funds.allowance.to_string()
                },
            ),
            Style::default().fg(Color::Yellow),
        ),
    ]);
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!("GAMA Dice {}", snap.dice_contract));
    f.render_widget(Paragraph::new(line).block(block), area);
}

fn phase_style(phase: BetPhase) -> Style {
    match phase {
        BetPhase::Resolved => Style::default().fg(Color::Green),
        BetPhase::Errored | BetPhase::TimedOut => Style::default().fg(Color::Red),
        BetPhase::Idle => Style::default().fg(Color::DarkGray),
        _ => Style::default().fg(Color::Yellow),
    }
}

fn draw_bet_panel(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let dice: Vec<Span> = (1..=6u8)
        .flat_map(|n| {
            let style = if n == snap.selected_number {
                Style::default().fg(Color::Black).bg(Color::White)
            } else {
                Style::default()
            };
            vec![Span::styled(format!(" {n} "), style), Span::raw(" ")]
        })
        .collect();
    let result = match snap.last_result {
        Some((rolled, payout)) if payout > 0 => {
            format!("last roll {rolled}, paid {payout}")
        }
        Some((rolled, _)) => format!("last roll {rolled}, no win"),
        None => String::new(),
    };
    let lines = vec![
        Line::from(dice),
        Line::from(vec![
            Span::raw(format!("stake {} | ", snap.amount)),
            Span::styled(snap.phase.label(), phase_style(snap.phase)),
            Span::raw(if result.is_empty() {
                String::new()
            } else {
                format!(" | {result}")
            }),
        ]),
        Line::from(Span::styled(
            &snap.status,
            Style::default().fg(Color::DarkGray),
        )),
    ];
    let block = Block::default().borders(Borders::ALL).title("Bet");
    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn draw_history(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let rows: Vec<Row> = snap
        .history
        .iter()
        .map(|h| {
            let rolled = h
                .rolled
                .map(|r| r.to_string())
                .unwrap_or_else(|| String::from("…"));
            let outcome = if h.rolled.is_none() {
                Span::styled("pending", Style::default().fg(Color::Yellow))
            } else if h.won {
                Span::styled(format!("+{}", h.payout), Style::default().fg(Color::Green))
            } else {
                Span::styled(format!("-{}", h.amount), Style::default().fg(Color::Red))
            };
            Row::new(vec![
                Cell::from(h.chosen.to_string()),
                Cell::from(rolled),
                Cell::from(h.amount.to_string()),
                Cell::from(outcome),
            ])
        })
        .collect();
    let stats = snap.stats;
    let title = format!(
        "History ({} bets, {} won, {} wagered, {} paid)",
        stats.bets, stats.wins, stats.total_wagered, stats.total_paid
    );
    let table = Table::new(
        rows,
        [
            Constraint::Length(7),
            Constraint::Length(7),
            Constraint::Length(10),
            Constraint::Min(8),
        ],
    )
    .header(Row::new(vec!["picked", "rolled", "stake", "outcome"]))
    .block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(table, area);
}

fn severity_style(severity: Severity) -> Style {
    match severity {
        Severity::Info => Style::default(),
        Severity::Success => Style::default().fg(Color::Green),
        Severity::Warning => Style::default().fg(Color::Yellow),
        Severity::Error => Style::default().fg(Color::Red),
    }
}

fn draw_notices(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let items: Vec<ListItem> = snap
        .notices
        .iter()
        .map(|n| {
            ListItem::new(Line::from(Span::styled(
                format!("{} {}", n.at.format("%H:%M:%S"), n.message),
                severity_style(n.severity),
            )))
        })
        .collect();
    let list =
        List::new(items).block(Block::default().borders(Borders::ALL).title("Notices"));
    f.render_widget(list, area);
}

fn draw_help(f: &mut Frame, area: Rect, _snap: &AppSnapshot) {
    let help = "←/→ pick number | b/Enter bet | x export history | q quit";
    f.render_widget(
        Paragraph::new(help).block(Block::default().borders(Borders::ALL)),
        area,
    );
}

fn draw_modals(f: &mut Frame, state: &UiState, snap: &AppSnapshot) {
    match &state.mode {
        Mode::BetModal(bs) => {
            let area = centered_rect(40, 20, f.area());
            f.render_widget(Clear, area);
            let text = vec![
                Line::from(format!("Stake on {}: {}", snap.selected_number, bs.amount)),
                Line::from(Span::styled(
                    "type digits, +/- steps 10, Enter places, Esc cancels",
                    Style::default().fg(Color::DarkGray),
                )),
            ];
            let block = Block::default().borders(Borders::ALL).title("Place bet");
            f.render_widget(Paragraph::new(text).block(block), area);
        }
        Mode::QuitModal => {
            let area = centered_rect(30, 15, f.area());
            f.render_widget(Clear, area);
            let block = Block::default().borders(Borders::ALL).title("Quit?");
            f.render_widget(Paragraph::new("y to quit, n to stay").block(block), area);
        }
        Mode::Normal => {}
    }
}

fn centered_rect(w_percent: u16, h_percent: u16, r: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - h_percent) / 2),
            Constraint::Percentage(h_percent),
            Constraint::Percentage((100 - h_percent) / 2),
        ])
        .split(r);
    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - w_percent) / 2),
            Constraint::Percentage(w_percent),
            Constraint::Percentage((100 - w_percent) / 2),
        ])
        .split(vertical[1]);
    horizontal[1]
}
