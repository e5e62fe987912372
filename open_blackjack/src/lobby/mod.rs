//! Lobby view-state: the set of open tables plus the lobby chat log.
//!
//! A much simpler sibling of the game state machine: three events, all
//! infallible. `UPDATE_GAME` is an idempotent upsert keyed by table url;
//! `REMOVE_GAME` of an unknown url is a no-op.

use std::collections::BTreeMap;

use crate::game::entities::ChatLine;
use crate::net::messages::LobbyServerMessage;

/// One open table as advertised to the lobby.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LobbyEntry {
    /// Unique table identifier, also the join path segment.
    pub url: String,
    pub num_players: u32,
    pub creator: String,
}

/// Lobby channel state, exclusively owned by its dispatcher.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct LobbyState {
    entries: BTreeMap<String, LobbyEntry>,
    chat: Vec<ChatLine>,
}

impl LobbyState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> impl Iterator<Item = &LobbyEntry> {
        self.entries.values()
    }

    pub fn entry(&self, url: &str) -> Option<&LobbyEntry> {
        self.entries.get(url)
    }

    pub fn chat(&self) -> &[ChatLine] {
        &self.chat
    }

    pub fn apply(&mut self, msg: &LobbyServerMessage) {
        match msg {
            LobbyServerMessage::UpdateGame {
                url,
                num_players,
                creator,
            } => {
                self.entries
                    .entry(url.clone())
                    .and_modify(|entry| {
                        entry.num_players = *num_players;
                        entry.creator = creator.clone();
                    })
                    .or_insert_with(|| LobbyEntry {
                        url: url.clone(),
                        num_players: *num_players,
                        creator: creator.clone(),
                    });
            }
            LobbyServerMessage::RemoveGame { url } => {
                self.entries.remove(url);
            }
            LobbyServerMessage::ChatMessage {
                player,
                chat_message,
            } => {
                self.chat.push(ChatLine {
                    author: player.clone(),
                    text: chat_message.clone(),
                });
            }
        }
    }
}
