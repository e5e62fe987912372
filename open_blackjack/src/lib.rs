//! # Open Blackjack
//!
//! Client-side synchronization for a multiplayer blackjack table whose
//! authoritative state lives on a remote server.
//!
//! The server pushes discrete events over two long-lived channels: a
//! lobby channel (open tables, lobby chat) and a per-table game channel
//! (seats, hands, bets, turn order). This library interprets those
//! streams into consistent local state and emits declarative view
//! updates; it performs no dealing, shuffling, or settlement of its own.
//!
//! ## Architecture
//!
//! - [`net`]: the JSON frame protocol - closed tagged unions for both
//!   channels, plus the one-frame codec.
//! - [`game`]: table entities and [`game::GameTable`], the event-driven
//!   state machine with its per-connection [`game::SessionContext`].
//! - [`lobby`]: the lobby's simpler sibling state machine.
//! - [`render`]: pure projection from state to [`render::ViewUpdate`]
//!   instructions for whatever view layer consumes them.
//!
//! ## Example
//!
//! ```
//! use open_blackjack::{GameTable, SessionContext, net::codec, render};
//! use open_blackjack::net::messages::GameServerMessage;
//!
//! let mut table = GameTable::new(SessionContext::new());
//! let frame = r#"{"type":"INIT_GAME","my_idx":-1,"state":{}}"#;
//! let msg: GameServerMessage = codec::decode(frame).unwrap();
//! match table.apply(&msg) {
//!     Ok(()) => drop(render::project(&table, &msg)),
//!     Err(violation) => drop(render::project_error(&violation)),
//! }
//! ```

/// Wire protocol: message unions, codec, decode errors.
pub mod net;
pub use net::{codec, errors::DecodeError, messages};

/// Table entities and the game-channel state machine.
pub mod game;
pub use game::{
    GameTable, ProtocolError, SessionContext,
    entities::{self, DEFAULT_BET, DEFAULT_DOLLARS, TABLE_SEATS},
};

/// Lobby-channel view state.
pub mod lobby;
pub use lobby::{LobbyEntry, LobbyState};

/// Pure state-to-view projection.
pub mod render;
pub use render::{ViewUpdate, project, project_error, project_lobby};
