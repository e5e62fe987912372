//! Console input parsing.
//!
//! Every line the player types is parsed here before anything touches
//! the wire, so bad input never leaves the process.

use open_blackjack::DEFAULT_BET;
use open_blackjack::entities::{SeatIndex, Usd};
use open_blackjack::messages::{GameClientCommand, LobbyClientCommand};
use std::fmt;

pub const HELP_COMMANDS: &str = "\
commands:
  ready [AMOUNT|max]   ready up for the next round, betting AMOUNT dollars
  hit                  take another card
  hold                 stand on the current hand
  double               double the bet and take exactly one more card
  start                start the round without waiting for every seat
  say MESSAGE          send MESSAGE to the table chat
  lobby MESSAGE        send MESSAGE to the lobby chat
  table                print the current table state
  help                 print this message
  quit                 close both channels and exit\
";

/// What the local player can currently do, fed into parsing so seat
/// actions fail fast when the player is not seated.
#[derive(Clone, Copy, Debug)]
pub struct SeatContext {
    pub my_idx: Option<SeatIndex>,
    pub max_bet: Usd,
}

/// One successfully parsed line of input.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ParsedInput {
    Game(GameClientCommand),
    Lobby(LobbyClientCommand),
    ShowTable,
    Help,
    Quit,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ParseError {
    EmptyChatMessage,
    InvalidBetAmount(String),
    NotSeated,
    UnrecognizedCommand(String),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::EmptyChatMessage => "chat messages cannot be empty".to_string(),
            Self::InvalidBetAmount(raw) => {
                format!("'{raw}' is not a valid bet, expected a positive whole dollar amount")
            }
            Self::NotSeated => "you are not seated at this table".to_string(),
            Self::UnrecognizedCommand(raw) => {
                format!("unrecognized command '{raw}', try 'help'")
            }
        };
        write!(f, "{repr}")
    }
}

impl std::error::Error for ParseError {}

fn my_seat(seat: &SeatContext) -> Result<SeatIndex, ParseError> {
    seat.my_idx.ok_or(ParseError::NotSeated)
}

fn parse_bet(raw: &str, seat: &SeatContext) -> Result<Usd, ParseError> {
    if raw.eq_ignore_ascii_case("max") {
        return Ok(seat.max_bet);
    }
    match raw.parse::<Usd>() {
        Ok(bet) if bet > 0 => Ok(bet),
        _ => Err(ParseError::InvalidBetAmount(raw.to_string())),
    }
}

/// Parse one line of console input.
pub fn parse_input(input: &str, seat: &SeatContext) -> Result<ParsedInput, ParseError> {
    let trimmed = input.trim();
    let (head, rest) = match trimmed.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (trimmed, ""),
    };
    match head.to_ascii_lowercase().as_str() {
        "ready" => {
            let idx = my_seat(seat)?;
            let bet = if rest.is_empty() {
                DEFAULT_BET
            } else {
                parse_bet(rest, seat)?
            };
            Ok(ParsedInput::Game(GameClientCommand::PlayerReady {
                idx,
                bet,
            }))
        }
        "hit" => Ok(ParsedInput::Game(GameClientCommand::Hit {
            idx: my_seat(seat)?,
        })),
        "hold" => Ok(ParsedInput::Game(GameClientCommand::Hold {
            idx: my_seat(seat)?,
        })),
        "double" => Ok(ParsedInput::Game(GameClientCommand::Double {
            idx: my_seat(seat)?,
        })),
        "start" => Ok(ParsedInput::Game(GameClientCommand::StartGame)),
        "say" => {
            if rest.is_empty() {
                Err(ParseError::EmptyChatMessage)
            } else {
                Ok(ParsedInput::Game(GameClientCommand::Chat {
                    chat_message: rest.to_string(),
                }))
            }
        }
        "lobby" => {
            if rest.is_empty() {
                Err(ParseError::EmptyChatMessage)
            } else {
                Ok(ParsedInput::Lobby(LobbyClientCommand::Chat {
                    chat_message: rest.to_string(),
                }))
            }
        }
        "table" => Ok(ParsedInput::ShowTable),
        "help" | "?" => Ok(ParsedInput::Help),
        "quit" | "exit" => Ok(ParsedInput::Quit),
        _ => Err(ParseError::UnrecognizedCommand(trimmed.to_string())),
    }
}
