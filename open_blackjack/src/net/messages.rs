//! Message types for the lobby and game channels.
//!
//! Every frame is a JSON object carrying a case-sensitive `type`
//! discriminator. Each direction of each channel is a closed tagged
//! union; an unrecognized tag fails decoding instead of being silently
//! ignored.

use serde::{Deserialize, Deserializer, Serialize};
use std::{collections::BTreeMap, fmt};

use crate::game::entities::{Card, Outcome, SeatIndex, TABLE_SEATS, Usd};

/// Sentinel the server uses for "no seat" in `my_idx` and
/// `current_turn` fields.
const NO_SEAT: i64 = -1;

fn no_seat() -> i64 {
    NO_SEAT
}

/// Seat indices sometimes arrive as stringified map keys rather than
/// numbers. Accept both.
fn seat_key<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Num(i64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Num(idx) => Ok(idx),
        Raw::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

/// The `players` map arrives with stringified integer keys, and the
/// internally tagged envelope buffers the payload in a form where map
/// keys stay strings. Parse them explicitly instead of relying on
/// integer-key inference.
fn seat_keyed_map<'de, D>(
    deserializer: D,
) -> Result<BTreeMap<SeatIndex, PlayerSnapshot>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, PlayerSnapshot>::deserialize(deserializer)?;
    raw.into_iter()
        .map(|(key, player)| {
            key.trim()
                .parse::<SeatIndex>()
                .map(|idx| (idx, player))
                .map_err(serde::de::Error::custom)
        })
        .collect()
}

fn seat_keys<'de, D>(deserializer: D) -> Result<Vec<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Num(i64),
        Text(String),
    }

    let raw = Vec::<Raw>::deserialize(deserializer)?;
    raw.into_iter()
        .map(|key| match key {
            Raw::Num(idx) => Ok(idx),
            Raw::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
        })
        .collect()
}

/// Server lifecycle tag for the whole table.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum GameStateTag {
    #[default]
    NotStarted,
    AwaitingReady,
    Started,
}

/// Server lifecycle tag for a single player.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlayerStateTag {
    #[default]
    GameNotStarted,
    AwaitingReady,
    Ready,
    GameStarted,
    GameOverBlackjack,
}

/// One player's slice of a state snapshot.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct PlayerSnapshot {
    /// Opaque channel key for the player's connection.
    pub name: String,
    pub username: String,
    #[serde(default = "no_seat", deserialize_with = "seat_key")]
    pub index: i64,
    #[serde(default)]
    pub dollars: Usd,
    #[serde(default)]
    pub current_bet: Usd,
    #[serde(default)]
    pub in_game: bool,
    #[serde(default)]
    pub current_hand: Vec<Card>,
    #[serde(default)]
    pub current_hand_value: u32,
    #[serde(default)]
    pub player_game_state: PlayerStateTag,
    #[serde(default)]
    pub player_game_outcome: Outcome,
    #[serde(default)]
    pub win_loss: Usd,
}

/// A full `state` payload, sufficient to rebuild table state from
/// scratch. `players` is keyed by seat index (the server stringifies
/// the keys; serde maps them back to integers).
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct TableSnapshot {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "seat_keyed_map")]
    pub players: BTreeMap<SeatIndex, PlayerSnapshot>,
    #[serde(default)]
    pub game_state: GameStateTag,
    #[serde(default = "no_seat", deserialize_with = "seat_key")]
    pub current_turn: i64,
    #[serde(default)]
    pub dealer_hand: Vec<Card>,
    #[serde(default)]
    pub dealer_hand_value: u32,
    #[serde(default)]
    pub dealer_blackjack: bool,
}

// Derived Default would set current_turn to 0, a valid seat; the
// documented sentinel is -1.
impl Default for TableSnapshot {
    fn default() -> Self {
        Self {
            url: None,
            players: BTreeMap::new(),
            game_state: GameStateTag::default(),
            current_turn: NO_SEAT,
            dealer_hand: Vec::new(),
            dealer_hand_value: 0,
            dealer_blackjack: false,
        }
    }
}

impl TableSnapshot {
    /// The seat currently authorized to act, if `current_turn` points at
    /// a real seat. `-1` means no turn yet; `>= TABLE_SEATS` means play
    /// has passed to the dealer.
    pub fn turn_seat(&self) -> Option<SeatIndex> {
        (0..TABLE_SEATS as i64)
            .contains(&self.current_turn)
            .then_some(self.current_turn as SeatIndex)
    }
}

/// Game channel, client to server.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameClientCommand {
    /// Request a full snapshot. Always the first frame after connect;
    /// the server pushes nothing on a bare connection.
    InitGame,
    Chat { chat_message: String },
    StartGame,
    Hold { idx: SeatIndex },
    Hit { idx: SeatIndex },
    Double { idx: SeatIndex },
    PlayerReady { idx: SeatIndex, bet: Usd },
}

impl fmt::Display for GameClientCommand {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::InitGame => "requested a snapshot".to_string(),
            Self::Chat { .. } => "sent a chat message".to_string(),
            Self::StartGame => "started the game".to_string(),
            Self::Hold { idx } => format!("seat {idx} holds"),
            Self::Hit { idx } => format!("seat {idx} hits"),
            Self::Double { idx } => format!("seat {idx} doubles down"),
            Self::PlayerReady { idx, bet } => format!("seat {idx} is ready with ${bet}"),
        };
        write!(f, "{repr}")
    }
}

/// Game channel, server to client.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameServerMessage {
    ChatMessage {
        player: String,
        chat_message: String,
    },
    InitGame {
        state: TableSnapshot,
        #[serde(default = "no_seat", deserialize_with = "seat_key")]
        my_idx: i64,
    },
    PlayerAdded {
        #[serde(deserialize_with = "seat_key")]
        idx: i64,
        player_added: PlayerSnapshot,
    },
    PlayerRemoved {
        #[serde(deserialize_with = "seat_key")]
        idx: i64,
        player_removed: PlayerSnapshot,
    },
    GameStarted {
        state: TableSnapshot,
    },
    GameStartedAllReady {
        state: TableSnapshot,
    },
    NextTurn {
        state: TableSnapshot,
    },
    PlayerHit {
        #[serde(deserialize_with = "seat_key")]
        idx: i64,
        state: TableSnapshot,
    },
    PlayerReady {
        #[serde(deserialize_with = "seat_key")]
        idx: i64,
        state: TableSnapshot,
    },
    DealerFinalTurn {
        state: TableSnapshot,
    },
    PlayersBlackjack {
        #[serde(deserialize_with = "seat_keys")]
        players: Vec<i64>,
    },
}

impl fmt::Display for GameServerMessage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::ChatMessage { player, .. } => format!("chat from {player}"),
            Self::InitGame { my_idx, .. } => format!("snapshot, my seat {my_idx}"),
            Self::PlayerAdded { idx, .. } => format!("player joined seat {idx}"),
            Self::PlayerRemoved { idx, .. } => format!("player left seat {idx}"),
            Self::GameStarted { .. } => "round opened for bets".to_string(),
            Self::GameStartedAllReady { .. } => "initial deal".to_string(),
            Self::NextTurn { state } => format!("turn moved to seat {}", state.current_turn),
            Self::PlayerHit { idx, .. } => format!("seat {idx} hit"),
            Self::PlayerReady { idx, .. } => format!("seat {idx} ready"),
            Self::DealerFinalTurn { .. } => "dealer's final turn".to_string(),
            Self::PlayersBlackjack { players } => format!("blackjack at seats {players:?}"),
        };
        write!(f, "{repr}")
    }
}

/// Lobby channel, client to server.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LobbyClientCommand {
    Chat { chat_message: String },
}

/// Lobby channel, server to client.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LobbyServerMessage {
    UpdateGame {
        url: String,
        num_players: u32,
        creator: String,
    },
    RemoveGame {
        url: String,
    },
    ChatMessage {
        player: String,
        chat_message: String,
    },
}

impl fmt::Display for LobbyServerMessage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::UpdateGame {
                url, num_players, ..
            } => format!("table {url} has {num_players} player(s)"),
            Self::RemoveGame { url } => format!("table {url} closed"),
            Self::ChatMessage { player, .. } => format!("chat from {player}"),
        };
        write!(f, "{repr}")
    }
}
