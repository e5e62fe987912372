//! Single-task dispatcher tying the channels to the console.
//!
//! All state mutation happens on this task: frames from both sessions
//! and lines from stdin are multiplexed through one `select!` loop, so
//! `GameTable::apply` calls are serialized per connection and need no
//! locking.

use crate::commands::{self, HELP_COMMANDS, ParsedInput, SeatContext};
use crate::session::{ChannelSession, SessionEvent};
use anyhow::Result;
use log::{error, warn};
use open_blackjack::entities::{Phase, Seat, SeatIndex};
use open_blackjack::messages::{GameServerMessage, LobbyServerMessage};
use open_blackjack::net::codec;
use open_blackjack::{GameTable, LobbyState, SessionContext, ViewUpdate, render};
use tokio::io::AsyncBufReadExt;
use tokio::sync::mpsc;

fn print_updates(updates: &[ViewUpdate]) {
    for update in updates {
        println!("{update}");
    }
}

fn format_seat(idx: SeatIndex, seat: &Seat, my_idx: Option<SeatIndex>, turn: bool) -> String {
    let Some(occupant) = &seat.occupant else {
        return format!("  seat {idx}: (empty)");
    };
    let marker = if turn { " →" } else { "" };
    let you = if my_idx == Some(idx) { " (you)" } else { "" };
    let mut line = format!(
        "  seat {idx}: {}{you}{marker} - ${} - bet ${}",
        occupant.username, seat.dollars, seat.bet
    );
    if !seat.hand.is_empty() {
        use std::fmt::Write;
        let mut cards = String::new();
        for card in seat.hand.cards() {
            let _ = write!(&mut cards, "{card} ");
        }
        let value = if seat.hand.is_blackjack() {
            "blackjack".to_string()
        } else {
            seat.hand.value().to_string()
        };
        let _ = write!(&mut line, "\n           {} ({value})", cards.trim_end());
    }
    line
}

/// Dump the mirrored table state in a readable block.
pub fn display_table(table: &GameTable) {
    use std::fmt::Write;

    let state = table.state();
    println!("{}", "─".repeat(60));
    println!("phase: {}", state.phase);

    let mut dealer_line = String::from("  dealer:");
    if state.dealer.hand.is_empty() {
        dealer_line.push_str(" (no cards)");
    } else {
        for (i, card) in state.dealer.hand.cards().iter().enumerate() {
            if i == 0 && state.dealer.hole_card_hidden {
                dealer_line.push_str("   ??");
            } else {
                let _ = write!(&mut dealer_line, " {card}");
            }
        }
        if !state.dealer.hole_card_hidden {
            let value = if state.dealer.blackjack {
                "blackjack".to_string()
            } else {
                state.dealer.hand.value().to_string()
            };
            let _ = write!(&mut dealer_line, " ({value})");
        }
    }
    println!("{dealer_line}");

    for (idx, seat) in state.seats.iter().enumerate() {
        let turn = state.phase == Phase::PlayerTurns && state.current_turn == Some(idx);
        println!("{}", format_seat(idx, seat, table.ctx().my_idx(), turn));
    }

    if let Some(line) = state.chat.last() {
        println!("  last chat: {}: {}", line.author, line.text);
    }
    println!("{}", "─".repeat(60));
}

pub struct App {
    table: GameTable,
    lobby: LobbyState,
    game_session: Option<ChannelSession>,
    lobby_session: ChannelSession,
}

impl App {
    fn seat_context(&self) -> SeatContext {
        SeatContext {
            my_idx: self.table.ctx().my_idx(),
            max_bet: self.table.my_seat().map_or(0, Seat::max_bet),
        }
    }

    fn on_game_frame(&mut self, frame: &str) {
        let msg: GameServerMessage = match codec::decode(frame) {
            Ok(msg) => msg,
            Err(e) => {
                warn!("dropping game frame: {e}");
                return;
            }
        };
        match self.table.apply(&msg) {
            Ok(()) => print_updates(&render::project(&self.table, &msg)),
            Err(violation) => {
                error!("rejected {msg}: {violation}");
                print_updates(&render::project_error(&violation));
            }
        }
    }

    fn on_lobby_frame(&mut self, frame: &str) {
        let msg: LobbyServerMessage = match codec::decode(frame) {
            Ok(msg) => msg,
            Err(e) => {
                warn!("dropping lobby frame: {e}");
                return;
            }
        };
        self.lobby.apply(&msg);
        print_updates(&render::project_lobby(&self.lobby, &msg));
    }

    /// Returns false once the user asks to quit.
    fn on_input(&mut self, line: &str) -> bool {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return true;
        }
        match commands::parse_input(trimmed, &self.seat_context()) {
            Ok(ParsedInput::Game(command)) => match &self.game_session {
                Some(session) => session.send(&command),
                None => eprintln!("not connected to a table, pass one with --table"),
            },
            Ok(ParsedInput::Lobby(command)) => self.lobby_session.send(&command),
            Ok(ParsedInput::ShowTable) => display_table(&self.table),
            Ok(ParsedInput::Help) => println!("{HELP_COMMANDS}"),
            Ok(ParsedInput::Quit) => {
                if let Some(session) = &self.game_session {
                    session.close();
                }
                self.lobby_session.close();
                return false;
            }
            Err(e) => eprintln!("{e}"),
        }
        true
    }
}

/// Connect the channels, then run until EOF, quit, or both channels are
/// gone. Dropped channels are reported and left dropped; reconnection is
/// the user's call.
pub async fn run(server: &str, table: Option<&str>) -> Result<()> {
    let (tx_lobby, mut rx_lobby) = mpsc::unbounded_channel();
    let lobby_url = format!("{server}/ws/lobby/");
    println!("connecting to {lobby_url}...");
    let lobby_session = ChannelSession::open(&lobby_url, tx_lobby).await?;

    // The game receiver exists even without a table so the select loop
    // stays uniform; it just never fires.
    let (tx_game, mut rx_game) = mpsc::unbounded_channel();
    let game_session = match table {
        Some(table) => {
            let game_url = format!("{server}/ws/game/{table}/");
            println!("connecting to {game_url}...");
            Some(ChannelSession::open_game(&game_url, tx_game).await?)
        }
        None => None,
    };

    println!("connected, type 'help' for commands");

    let mut app = App {
        table: GameTable::new(SessionContext::new()),
        lobby: LobbyState::new(),
        game_session,
        lobby_session,
    };

    let mut stdin = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = stdin.next_line() => match line? {
                Some(line) => {
                    if !app.on_input(&line) {
                        break;
                    }
                }
                None => break,
            },
            Some(event) = rx_game.recv() => match event {
                SessionEvent::Frame(frame) => app.on_game_frame(&frame),
                SessionEvent::Disconnected { reason } => {
                    println!("[alert] game channel disconnected: {reason}");
                    app.game_session = None;
                }
            },
            Some(event) = rx_lobby.recv() => match event {
                SessionEvent::Frame(frame) => app.on_lobby_frame(&frame),
                SessionEvent::Disconnected { reason } => {
                    println!("[alert] lobby channel disconnected: {reason}");
                }
            },
        }
    }

    Ok(())
}
