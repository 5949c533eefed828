use crate::{
    format::{
        format_delay,
        format_number,
        format_target_count,
    },
    model::TargetId,
    view::{
        GameView,
        NoticeKind,
        PurchaseFeedback,
        TargetCard,
        UpgradeCard,
    },
};
use color_eyre::eyre::{
    Result,
    eyre,
};
use crossterm::{
    event::{
        Event,
        EventStream,
        KeyCode,
        KeyEventKind,
        KeyModifiers,
    },
    terminal::{
        disable_raw_mode,
        enable_raw_mode,
    },
};
use futures::StreamExt;
use itertools::Itertools;
use ratatui::{
    prelude::*,
    widgets::*,
};
use std::io::stdout;
use unicode_width::{
    UnicodeWidthChar,
    UnicodeWidthStr,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UserEvent {
    Quit,
    Redraw,
    Click(TargetId),
    Select(TargetId),
    Buy(String),
    Save,
    Load,
    Refresh,
}

#[derive(Debug, Default)]
pub struct UiState {
    mode: Mode,
    target_focus: Focus<TargetId>,
    upgrade_focus: Focus<String>,
    terminal: Option<Terminal<CrosstermBackend<std::io::Stdout>>>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum Mode {
    #[default]
    Normal,
    QuitModal,
}

const KEY_HINTS: [&str; 9] = [
    "←/→ target",
    "Enter/Space click",
    "s select",
    "↑/↓ upgrade",
    "b buy",
    "w save",
    "l load",
    "r refresh",
    "q/Esc quit",
];

pub type InputEventReceiver = EventStream;

pub fn input_event_stream() -> InputEventReceiver {
    EventStream::new()
}

pub async fn next_raw_event(events: &mut InputEventReceiver) -> Result<Event> {
    match events.next().await {
        Some(event) => Ok(event?),
        None => Err(eyre!("terminal input stream closed")),
    }
}

pub fn terminal_enter(state: &mut UiState) -> Result<()> {
    enable_raw_mode()?;
    crossterm::execute!(std::io::stdout(), crossterm::terminal::EnterAlternateScreen)?;
    // Create a single persistent Terminal to preserve buffers across draws
    let backend = CrosstermBackend::new(stdout());
    let terminal = Terminal::new(backend)?;
    state.terminal = Some(terminal);
    Ok(())
}

pub fn terminal_exit() -> Result<()> {
    disable_raw_mode()?;
    crossterm::execute!(std::io::stdout(), crossterm::terminal::LeaveAlternateScreen)?;
    Ok(())
}

pub fn draw(state: &mut UiState, view: &GameView) -> Result<()> {
    if let Some(mut term) = state.terminal.take() {
        term.draw(|f| render(f, state, view))?;
        state.terminal = Some(term);
    }
    Ok(())
}

/// Cursor over a keyed row of cards. It stays on the focused key while that
/// key is on screen and falls back to the last slot it held once it is gone.
#[derive(Debug)]
struct Focus<K> {
    key: Option<K>,
    slot: usize,
}

impl<K> Default for Focus<K> {
    fn default() -> Self {
        Self { key: None, slot: 0 }
    }
}

impl<K: Clone + PartialEq> Focus<K> {
    fn index(&self, keys: &[K]) -> Option<usize> {
        if keys.is_empty() {
            return None;
        }
        let by_key = self
            .key
            .as_ref()
            .and_then(|key| keys.iter().position(|k| k == key));
        Some(by_key.unwrap_or_else(|| self.slot.min(keys.len() - 1)))
    }

    fn resolve(&self, keys: &[K]) -> Option<K> {
        self.index(keys).and_then(|index| keys.get(index).cloned())
    }

    fn step(&mut self, keys: &[K], forward: bool) {
        let len = keys.len();
        let next = match self.index(keys) {
            None => 0,
            Some(current) if forward => (current + 1) % len,
            Some(current) => (current + len - 1) % len,
        };
        self.slot = next;
        self.key = keys.get(next).cloned();
    }
}

impl UiState {
    pub fn focused_target(&self, view: &GameView) -> Option<TargetId> {
        self.target_focus.resolve(&view.targets().keys())
    }

    pub fn focused_upgrade(&self, view: &GameView) -> Option<String> {
        self.upgrade_focus.resolve(&view.upgrades().keys())
    }
}

pub fn interpret_event(
    state: &mut UiState,
    event: Event,
    view: &GameView,
) -> Option<UserEvent> {
    let key = match event {
        Event::Key(key) => key,
        Event::Resize(..) => return Some(UserEvent::Redraw),
        _ => return None,
    };
    if key.kind != KeyEventKind::Press {
        return None;
    }
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Some(UserEvent::Quit);
    }
    if state.mode == Mode::QuitModal {
        return match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => Some(UserEvent::Quit),
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                state.mode = Mode::Normal;
                Some(UserEvent::Redraw)
            }
            _ => None,
        };
    }
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => {
            state.mode = Mode::QuitModal;
            Some(UserEvent::Redraw)
        }
        KeyCode::Right => {
            state.target_focus.step(&view.targets().keys(), true);
            Some(UserEvent::Redraw)
        }
        KeyCode::Left => {
            state.target_focus.step(&view.targets().keys(), false);
            Some(UserEvent::Redraw)
        }
        KeyCode::Down | KeyCode::Char('j') => {
            state.upgrade_focus.step(&view.upgrades().keys(), true);
            Some(UserEvent::Redraw)
        }
        KeyCode::Up | KeyCode::Char('k') => {
            state.upgrade_focus.step(&view.upgrades().keys(), false);
            Some(UserEvent::Redraw)
        }
        KeyCode::Enter | KeyCode::Char(' ') => {
            state.focused_target(view).map(UserEvent::Click)
        }
        KeyCode::Char('s') => state.focused_target(view).map(UserEvent::Select),
        KeyCode::Char('b') => state.focused_upgrade(view).map(UserEvent::Buy),
        KeyCode::Char('w') => Some(UserEvent::Save),
        KeyCode::Char('l') => Some(UserEvent::Load),
        KeyCode::Char('r') => Some(UserEvent::Refresh),
        _ => None,
    }
}

pub fn render(f: &mut Frame, state: &UiState, view: &GameView) {
    f.render_widget(Clear, f.area());
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // score
            Constraint::Length(8), // targets
            Constraint::Min(6),    // upgrades
            Constraint::Length(3), // notice
            Constraint::Length(3), // help
        ])
        .split(f.area());

    draw_score(f, chunks[0], view);
    draw_targets(f, state, chunks[1], view);
    draw_upgrades(f, state, chunks[2], view);
    draw_notice(f, chunks[3], view);
    draw_help(f, chunks[4]);
    if state.mode == Mode::QuitModal {
        draw_quit_modal(f);
    }
}

fn draw_score(f: &mut Frame, area: Rect, view: &GameView) {
    let text = match view.score() {
        Some(score) => format!(
            "Points: {} | Clicks: {} | {} | {}",
            format_number(score.points),
            format_number(score.total_clicks),
            format_delay(score.auto_click_delay_secs),
            format_target_count(score.target_count),
        ),
        None => "Waiting for game state...".to_string(),
    };
    let p = Paragraph::new(text)
        .style(Style::default().add_modifier(Modifier::BOLD))
        .block(Block::default().borders(Borders::ALL).title("Clicker"));
    f.render_widget(p, area);
}

fn target_color(hex: &str) -> Color {
    hex.parse().unwrap_or(Color::Gray)
}

fn draw_targets(f: &mut Frame, state: &UiState, area: Rect, view: &GameView) {
    let targets = view.targets();
    if targets.is_empty() {
        let block = Block::default().borders(Borders::ALL).title("Targets");
        f.render_widget(Paragraph::new("No targets yet").block(block), area);
        return;
    }
    let focused = state.target_focus.index(&targets.keys());
    let cols = targets.len() as u16;
    let col_w = (area.width / cols).max(1);
    for (i, node) in targets.iter().enumerate() {
        let c = i as u16;
        if c * col_w >= area.width {
            break;
        }
        let rect = Rect::new(area.x + c * col_w, area.y, col_w, area.height);
        draw_target_card(f, rect, node.card(), focused == Some(i));
    }
}

fn draw_target_card(f: &mut Frame, rect: Rect, card: &TargetCard, focused: bool) {
    let face = card.face();
    let color = target_color(&face.color);
    let mut title = format!("Target {}", face.number);
    if face.selected {
        title.push_str(" ★");
    }
    let title_style = if focused {
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(color)
    };
    let border_style = if card.is_flashing() {
        Style::default().fg(Color::Black).bg(color)
    } else {
        Style::default().fg(color)
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style)
        .title(Span::styled(title, title_style));
    let inner_w = block.inner(rect).width as usize;
    let lines: Vec<Line> = [
        format!("+{} / click", face.points_per_click),
        format!("{} auto / tick", face.auto_clicks_per_tick),
        format!("Clicks: {}", format_number(face.total_clicks)),
        format!("Earned: {}", format_number(face.points_earned)),
    ]
    .into_iter()
    .map(|text| Line::from(fit_width(&text, inner_w)))
    .collect();
    f.render_widget(Paragraph::new(lines).block(block), rect);
}

fn draw_upgrades(f: &mut Frame, state: &UiState, area: Rect, view: &GameView) {
    let title = match view.selection() {
        Some(label) => Span::styled(
            format!("Upgrades for target {}", label.number),
            Style::default()
                .fg(target_color(&label.color))
                .add_modifier(Modifier::BOLD),
        ),
        None => Span::raw("Upgrades"),
    };
    let block = Block::default().borders(Borders::ALL).title(title);
    let inner_w = block.inner(area).width as usize;
    let focused = state.upgrade_focus.index(&view.upgrades().keys());
    let items: Vec<ListItem> = view
        .upgrades()
        .iter()
        .enumerate()
        .map(|(i, node)| upgrade_item(node.card(), focused == Some(i), inner_w))
        .collect();
    f.render_widget(List::new(items).block(block), area);
}

fn upgrade_item(card: &UpgradeCard, focused: bool, width: usize) -> ListItem<'static> {
    let face = card.face();
    let marker = if focused { "> " } else { "  " };
    let price_style = if face.affordable {
        Style::default().fg(Color::Green)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let heading = Line::from(vec![
        Span::raw(marker),
        Span::styled(
            format!("{} (lvl {})", face.name, face.level),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::raw(" | "),
        Span::styled(format!("{} pts", format_number(face.price)), price_style),
    ]);
    let description = Line::from(fit_width(
        &format!("    {}", face.description),
        width,
    ));
    let style = match card.feedback() {
        Some(PurchaseFeedback::Success) => Style::default().bg(Color::Green).fg(Color::Black),
        Some(PurchaseFeedback::Failure) => Style::default().bg(Color::Red).fg(Color::White),
        None => Style::default(),
    };
    ListItem::new(vec![heading, description]).style(style)
}

fn draw_notice(f: &mut Frame, area: Rect, view: &GameView) {
    let p = match view.notice() {
        Some(notice) => {
            let color = match notice.kind {
                NoticeKind::Success => Color::Green,
                NoticeKind::Error => Color::Red,
            };
            Paragraph::new(notice.message.clone()).style(Style::default().fg(color))
        }
        None => Paragraph::new("Ready"),
    };
    f.render_widget(
        p.block(Block::default().borders(Borders::ALL).title("Status")),
        area,
    );
}

fn draw_help(f: &mut Frame, area: Rect) {
    let help = Paragraph::new(KEY_HINTS.iter().join(" | "))
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(help, area);
}

fn draw_quit_modal(f: &mut Frame) {
    let area = centered_rect(40, 20, f.area());
    let block = Block::default().borders(Borders::ALL).title("Confirm Quit");
    let p = Paragraph::new("Quit the game? (Y/N)");
    f.render_widget(Clear, area);
    f.render_widget(block.clone(), area);
    f.render_widget(p, block.inner(area));
}

fn centered_rect(w_percent: u16, h_percent: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - h_percent) / 2),
            Constraint::Percentage(h_percent),
            Constraint::Percentage((100 - h_percent) / 2),
        ])
        .split(r);

    let vertical = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - w_percent) / 2),
            Constraint::Percentage(w_percent),
            Constraint::Percentage((100 - w_percent) / 2),
        ])
        .split(popup_layout[1]);

    vertical[1]
}

/// Truncates `text` to at most `max` terminal columns, marking the cut
/// with an ellipsis.
fn fit_width(text: &str, max: usize) -> String {
    if text.width() <= max {
        return text.to_string();
    }
    if max == 0 {
        return String::new();
    }
    let mut out = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w + 1 > max {
            break;
        }
        out.push(ch);
        used += w;
    }
    out.push('…');
    out
}
