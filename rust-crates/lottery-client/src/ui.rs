use crate::{
    actions::ActionKind,
    state::{
        LotterySnapshot,
        UiFeedback,
    },
};
use alloy::primitives::Address;
use color_eyre::eyre::Result;
use crossterm::{
    event::{
        Event,
        KeyCode,
        KeyEventKind,
        KeyModifiers,
    },
    terminal::{
        disable_raw_mode,
        enable_raw_mode,
    },
};
use ratatui::{
    prelude::*,
    widgets::*,
};
use std::io::stdout;

pub enum UserEvent {
    Quit,
    Connect,
    Disconnect,
    Enter,
    SelectWinner,
    PayWinner,
    Refresh,
    Redraw,
}

#[derive(Default)]
pub struct UiState {
    terminal: Option<Terminal<CrosstermBackend<std::io::Stdout>>>,
}

/// Fixed facts about the session shown in the header.
#[derive(Clone, Debug)]
pub struct DashboardInfo {
    pub network: String,
    pub contract_address: Address,
}

pub fn terminal_enter(state: &mut UiState) -> Result<()> {
    enable_raw_mode()?;
    crossterm::execute!(std::io::stdout(), crossterm::terminal::EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout());
    let terminal = Terminal::new(backend)?;
    state.terminal = Some(terminal);
    Ok(())
}

pub fn terminal_exit(state: &mut UiState) -> Result<()> {
    state.terminal = None;
    disable_raw_mode()?;
    crossterm::execute!(std::io::stdout(), crossterm::terminal::LeaveAlternateScreen)?;
    Ok(())
}

pub fn draw(
    state: &mut UiState,
    info: &DashboardInfo,
    snap: &LotterySnapshot,
    pending: &[ActionKind],
) -> Result<()> {
    if let Some(term) = state.terminal.as_mut() {
        term.draw(|f| ui(f, info, snap, pending))?;
    }
    Ok(())
}

pub fn interpret_event(event: &Event) -> Option<UserEvent> {
    match event {
        Event::Key(key) if key.kind == KeyEventKind::Press => match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                Some(UserEvent::Quit)
            }
            KeyCode::Char('q') | KeyCode::Esc => Some(UserEvent::Quit),
            KeyCode::Char('c') => Some(UserEvent::Connect),
            KeyCode::Char('d') => Some(UserEvent::Disconnect),
            KeyCode::Char('e') => Some(UserEvent::Enter),
            KeyCode::Char('s') => Some(UserEvent::SelectWinner),
            KeyCode::Char('p') => Some(UserEvent::PayWinner),
            KeyCode::Char('r') => Some(UserEvent::Refresh),
            _ => None,
        },
        Event::Resize(_, _) => Some(UserEvent::Redraw),
        _ => None,
    }
}

fn ui(f: &mut Frame, info: &DashboardInfo, snap: &LotterySnapshot, pending: &[ActionKind]) {
    f.render_widget(Clear, f.area());
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4), // session
            Constraint::Length(3), // round + pot
            Constraint::Min(6),    // players + history
            Constraint::Length(4), // feedback
            Constraint::Length(3), // help
        ])
        .split(f.area());

    draw_session(f, chunks[0], info, snap);
    draw_round(f, chunks[1], snap, pending);
    draw_lists(f, chunks[2], snap);
    draw_feedback(f, chunks[3], snap);
    let help = Paragraph::new(
        "c connect | e enter | s select winner | p pay winner | r refresh | d disconnect | q quit",
    )
    .block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(help, chunks[4]);
}

fn draw_session(f: &mut Frame, area: Rect, info: &DashboardInfo, snap: &LotterySnapshot) {
    let wallet = match (snap.session.connected, snap.session.wallet_address) {
        (true, Some(address)) => Line::styled(
            format!("Wallet: {address}"),
            Style::default().fg(Color::Green),
        ),
        _ => Line::styled(
            "Wallet: not connected (press c)",
            Style::default().fg(Color::DarkGray),
        ),
    };
    let contract = Line::from(format!(
        "Network: {} | Contract: {}",
        info.network, info.contract_address
    ));
    let widget = Paragraph::new(vec![wallet, contract])
        .block(Block::default().borders(Borders::ALL).title("Session"));
    f.render_widget(widget, area);
}

fn draw_round(f: &mut Frame, area: Rect, snap: &LotterySnapshot, pending: &[ActionKind]) {
    let round = snap
        .lottery_id
        .map_or_else(|| String::from("N/A"), |id| id.to_string());
    let pot = snap
        .pot
        .map_or_else(|| String::from("N/A"), |pot| format!("{pot} ETH"));
    let mut text = format!(
        "Round: {round} | Pot: {pot} | Tickets: {}",
        snap.players.len()
    );
    if !pending.is_empty() {
        let names: Vec<String> = pending.iter().map(ToString::to_string).collect();
        text.push_str(&format!(" | Pending: {}", names.join(", ")));
    }
    let widget =
        Paragraph::new(text).block(Block::default().borders(Borders::ALL).title("Lottery"));
    f.render_widget(widget, area);
}

fn draw_lists(f: &mut Frame, area: Rect, snap: &LotterySnapshot) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    let players: Vec<ListItem> = if snap.players.is_empty() {
        vec![ListItem::new(Line::styled(
            "None",
            Style::default().fg(Color::DarkGray),
        ))]
    } else {
        snap.players
            .iter()
            .enumerate()
            .map(|(i, player)| ListItem::new(format!("{:>3}. {player}", i + 1)))
            .collect()
    };
    let players = List::new(players).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!("Players ({})", snap.players.len())),
    );
    f.render_widget(players, columns[0]);

    let history: Vec<ListItem> = if snap.history.is_empty() {
        vec![ListItem::new(Line::styled(
            "None",
            Style::default().fg(Color::DarkGray),
        ))]
    } else {
        snap.history
            .iter()
            .map(|entry| ListItem::new(format!("#{:<4} {}", entry.round_id, entry.winner)))
            .collect()
    };
    let history =
        List::new(history).block(Block::default().borders(Borders::ALL).title("Winners"));
    f.render_widget(history, columns[1]);
}

fn draw_feedback(f: &mut Frame, area: Rect, snap: &LotterySnapshot) {
    let widget = match &snap.feedback {
        UiFeedback::Error(message) => Paragraph::new(message.as_str())
            .block(Block::default().borders(Borders::ALL).title("Error"))
            .style(Style::default().fg(Color::Red)),
        UiFeedback::Success(message) => Paragraph::new(message.as_str())
            .block(Block::default().borders(Borders::ALL).title("Status"))
            .style(Style::default().fg(Color::Green)),
        UiFeedback::None => Paragraph::new("Ready")
            .block(Block::default().borders(Borders::ALL).title("Status")),
    };
    f.render_widget(widget.wrap(Wrap { trim: false }), area);
}
