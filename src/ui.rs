use crate::client::{AppSnapshot, PunkCard};
use crate::view::TxPhase;
use color_eyre::eyre::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use ethers::types::Address;
use ratatui::prelude::*;
use ratatui::widgets::*;
use std::io::stdout;

pub enum UserEvent {
    Quit,
    NextPunk,
    PrevPunk,
    Refresh,
    Claim,
    Buy,
    OpenDeployModal,
    ConfirmDeploy,
    OpenBindModal,
    ConfirmBind { address: String },
    OpenTransferModal,
    ConfirmTransfer { to: String },
    OpenSellModal,
    ConfirmSell { price_ckb: u64 },
    Redraw,
}

#[derive(Debug)]
pub struct UiState {
    mode: Mode,
    terminal: Option<Terminal<CrosstermBackend<std::io::Stdout>>>,
}

impl Default for UiState {
    fn default() -> Self {
        UiState {
            mode: Mode::Normal,
            terminal: None,
        }
    }
}

#[derive(Clone, Debug, Default)]
enum Mode {
    #[default]
    Normal,
    DeployModal,
    BindModal(AddressInput),
    TransferModal(AddressInput),
    SellModal(SellState),
    QuitModal,
}

#[derive(Clone, Debug, Default)]
struct AddressInput {
    text: String,
}

#[derive(Clone, Debug)]
struct SellState {
    price_ckb: u64,
}

impl Default for SellState {
    fn default() -> Self {
        SellState { price_ckb: 1 }
    }
}

pub fn terminal_enter(state: &mut UiState) -> Result<()> {
    enable_raw_mode()?;
    crossterm::execute!(
        std::io::stdout(),
        crossterm::terminal::EnterAlternateScreen,
        crossterm::event::EnableMouseCapture
    )?;
    // Create a single persistent Terminal to preserve buffers across draws
    let backend = CrosstermBackend::new(stdout());
    let terminal = Terminal::new(backend)?;
    state.terminal = Some(terminal);
    Ok(())
}

pub fn terminal_exit() -> Result<()> {
    disable_raw_mode()?;
    crossterm::execute!(
        std::io::stdout(),
        crossterm::event::DisableMouseCapture,
        crossterm::terminal::LeaveAlternateScreen
    )?;
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
            // Modal handling
            match &mut state.mode {
                Mode::DeployModal => match k.code {
                    KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                        state.mode = Mode::Normal;
                        return Ok(UserEvent::ConfirmDeploy);
                    }
                    KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                        state.mode = Mode::Normal;
                        return Ok(UserEvent::Redraw);
                    }
                    _ => {}
                },
                Mode::BindModal(input) => match k.code {
                    KeyCode::Esc => {
                        state.mode = Mode::Normal;
                        return Ok(UserEvent::Redraw);
                    }
                    KeyCode::Enter => {
                        let address = input.text.clone();
                        state.mode = Mode::Normal;
                        return Ok(UserEvent::ConfirmBind { address });
                    }
                    KeyCode::Backspace => {
                        input.text.pop();
                        return Ok(UserEvent::Redraw);
                    }
                    KeyCode::Char(c) if c.is_ascii_alphanumeric() => {
                        input.text.push(c);
                        return Ok(UserEvent::Redraw);
                    }
                    _ => {}
                },
                Mode::TransferModal(input) => match k.code {
                    KeyCode::Esc => {
                        state.mode = Mode::Normal;
                        return Ok(UserEvent::Redraw);
                    }
                    KeyCode::Enter => {
                        let to = input.text.clone();
                        state.mode = Mode::Normal;
                        return Ok(UserEvent::ConfirmTransfer { to });
                    }
                    KeyCode::Backspace => {
                        input.text.pop();
                        return Ok(UserEvent::Redraw);
                    }
                    KeyCode::Char(c) if c.is_ascii_alphanumeric() => {
                        input.text.push(c);
                        return Ok(UserEvent::Redraw);
                    }
                    _ => {}
                },
                Mode::SellModal(ss) => match k.code {
                    KeyCode::Esc => {
                        state.mode = Mode::Normal;
                        return Ok(UserEvent::Redraw);
                    }
                    KeyCode::Enter => {
                        let price_ckb = ss.price_ckb;
                        state.mode = Mode::Normal;
                        return Ok(UserEvent::ConfirmSell { price_ckb });
                    }
                    KeyCode::Up | KeyCode::Char('+') => {
                        ss.price_ckb = ss.price_ckb.saturating_add(1);
                        return Ok(UserEvent::Redraw);
                    }
                    KeyCode::Down | KeyCode::Char('-') => {
                        ss.price_ckb = ss.price_ckb.saturating_sub(1);
                        return Ok(UserEvent::Redraw);
                    }
                    KeyCode::Backspace => {
                        ss.price_ckb /= 10;
                        return Ok(UserEvent::Redraw);
                    }
                    KeyCode::Char(c) if c.is_ascii_digit() => {
                        let d = c.to_digit(10).unwrap_or(0) as u64;
                        ss.price_ckb = ss.price_ckb.saturating_mul(10).saturating_add(d);
                        return Ok(UserEvent::Redraw);
                    }
                    _ => {}
                },
                Mode::QuitModal => match k.code {
                    KeyCode::Char('y') | KeyCode::Char('Y') => {
                        return Ok(UserEvent::Quit);
                    }
                    KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                        state.mode = Mode::Normal;
                        return Ok(UserEvent::Redraw);
                    }
                    _ => {}
                },
                Mode::Normal => {}
            }
            return Ok(match k.code {
                KeyCode::Char('q') | KeyCode::Esc => {
                    state.mode = Mode::QuitModal;
                    UserEvent::Redraw
                }
                KeyCode::Right => UserEvent::NextPunk,
                KeyCode::Left => UserEvent::PrevPunk,
                KeyCode::Char('r') => UserEvent::Refresh,
                KeyCode::Char('c') => UserEvent::Claim,
                KeyCode::Char('b') => UserEvent::Buy,
                KeyCode::Char('d') => {
                    state.mode = Mode::DeployModal;
                    UserEvent::OpenDeployModal
                }
                KeyCode::Char('x') => {
                    state.mode = Mode::BindModal(AddressInput::default());
                    UserEvent::OpenBindModal
                }
                KeyCode::Char('t') => {
                    state.mode = Mode::TransferModal(AddressInput::default());
                    UserEvent::OpenTransferModal
                }
                KeyCode::Char('s') => {
                    state.mode = Mode::SellModal(SellState::default());
                    UserEvent::OpenSellModal
                }
                _ => continue,
            });
        }
    }
}

fn ui(f: &mut Frame, state: &UiState, snap: &AppSnapshot) {
    // Clear the whole frame to avoid leftover fragments
    f.render_widget(Clear, f.area());
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),  // status
            Constraint::Length(12), // punk grid
            Constraint::Length(6),  // errors + help
        ])
        .split(f.area());

    draw_top(f, chunks[0], snap);
    draw_grid(f, chunks[1], snap);
    draw_bottom(f, chunks[2], snap);
    draw_modals(f, state, snap);
}

fn draw_top(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let market = match snap.contract {
        Some(addr) => short_addr(&addr),
        None => String::from("none"),
    };
    let tx = match snap.last_outcome {
        TxPhase::Idle => String::from("-"),
        phase => format!("{phase:?}"),
    };
    let gauge = Paragraph::new(format!(
        "Account: {} | Balance: {} CKB | Chain: {} | Market: {} | Unclaimed: {} | Last tx: {}\n{}",
        short_addr(&snap.account),
        snap.balance_ckb,
        snap.chain_id,
        market,
        snap.remaining,
        tx,
        snap.status
    ))
    .style(Style::default())
    .block(Block::default().borders(Borders::ALL).title("Status"));
    f.render_widget(gauge, area);
}

fn draw_grid(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let cols = snap.punks.len().max(1) as u16;
    let col_w = area.width / cols;
    for (i, punk) in snap.punks.iter().enumerate() {
        let c = i as u16;
        let rect = Rect::new(area.x + c * col_w, area.y, col_w, area.height);
        let selected = punk.index == snap.selected;
        let label = Paragraph::new(punk_lines(punk));
        let block = Block::default().borders(Borders::ALL).title(Span::styled(
            format!("#{} {}", punk.index, punk.name),
            if selected {
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            },
        ));
        f.render_widget(&block, rect);
        let inner = block.inner(rect);
        f.render_widget(label, inner);
    }
}

fn punk_lines(punk: &PunkCard) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    match punk.owner {
        Some(_) if punk.yours => {
            lines.push(Line::styled("Yours!", Style::default().fg(Color::Green)))
        }
        Some(owner) => lines.push(Line::from(format!("Owned by {}", short_addr(&owner)))),
        None => lines.push(Line::styled(
            "Claimable",
            Style::default().fg(Color::Cyan),
        )),
    }
    if punk.offer.active {
        lines.push(Line::from(format!(
            "For sale: {} CKB",
            crate::client::format_ckb(punk.offer.min_price)
        )));
    } else {
        lines.push(Line::from("Not for sale"));
    }
    if punk.bid.active {
        lines.push(Line::from(format!(
            "Bid: {} CKB from {}",
            crate::client::format_ckb(punk.bid.amount),
            short_addr(&punk.bid.bidder)
        )));
    } else {
        lines.push(Line::from("No bids"));
    }
    lines
}

fn draw_bottom(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Length(3)])
        .split(area);

    // Errors/logs
    let mut lines: Vec<Line> = Vec::new();
    if snap.errors.is_empty() {
        lines.push(Line::from("No errors"));
    } else {
        for e in &snap.errors {
            lines.push(Line::from(e.clone()));
        }
    }
    let errors = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Errors"));
    let color = if snap.contract.is_none() {
        Color::DarkGray
    } else if snap.errors.is_empty() {
        Color::Green
    } else {
        Color::Red
    };
    f.render_widget(errors.style(Style::default().fg(color)), chunks[0]);

    // Help
    let help = Paragraph::new(
        "←/→ select | c claim | b buy | s sell | t transfer | d deploy | x bind | r refresh | q/Esc quit",
    )
    .block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(help, chunks[1]);
}

fn draw_modals(f: &mut Frame, state: &UiState, snap: &AppSnapshot) {
    match &state.mode {
        Mode::DeployModal => {
            let area = centered_rect(50, 25, f.area());
            let block = Block::default().borders(Borders::ALL).title("Deploy Market");
            let p = Paragraph::new(
                "Deploy a fresh CRYPTOFUNK market and bind to it? (Y/N)",
            );
            f.render_widget(Clear, area);
            f.render_widget(block.clone(), area);
            f.render_widget(p, block.inner(area));
        }
        Mode::BindModal(input) => {
            let area = centered_rect(60, 25, f.area());
            let block = Block::default()
                .borders(Borders::ALL)
                .title("Bind to Market Address");
            let p = Paragraph::new(format!(
                "Address: {}\nEnter=bind Esc=cancel",
                input.text
            ));
            f.render_widget(Clear, area);
            f.render_widget(block.clone(), area);
            f.render_widget(p, block.inner(area));
        }
        Mode::TransferModal(input) => {
            let area = centered_rect(60, 25, f.area());
            let name = crate::client::punk_name(snap.selected);
            let block = Block::default()
                .borders(Borders::ALL)
                .title(format!("Transfer {name}"));
            let p = Paragraph::new(format!(
                "Recipient: {}\nEnter=transfer Esc=cancel",
                input.text
            ));
            f.render_widget(Clear, area);
            f.render_widget(block.clone(), area);
            f.render_widget(p, block.inner(area));
        }
        Mode::SellModal(ss) => {
            let area = centered_rect(50, 25, f.area());
            let name = crate::client::punk_name(snap.selected);
            let block = Block::default()
                .borders(Borders::ALL)
                .title(format!("Offer {name} for Sale"));
            let p = Paragraph::new(format!(
                "Minimum price: {} CKB\nEnter=confirm Esc=cancel +/- or digits to edit",
                ss.price_ckb
            ));
            f.render_widget(Clear, area);
            f.render_widget(block.clone(), area);
            f.render_widget(p, block.inner(area));
        }
        Mode::QuitModal => {
            let area = centered_rect(40, 20, f.area());
            let block = Block::default().borders(Borders::ALL).title("Confirm Quit");
            let p = Paragraph::new("Quit the market? (Y/N)");
            f.render_widget(Clear, area);
            f.render_widget(block.clone(), area);
            f.render_widget(p, block.inner(area));
        }
        Mode::Normal => {}
    }
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

fn short_addr(addr: &Address) -> String {
    let full = format!("{addr:#x}");
    format!("{}..{}", &full[..8], &full[full.len() - 4..])
}
