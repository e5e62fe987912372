//! Pure projection from state to declarative view updates.
//!
//! [`project`] maps the table state plus the event just applied to a
//! list of [`ViewUpdate`] instructions. It never mutates state and never
//! remembers anything, so replaying the same `(state, event)` pair
//! yields identical output. Binding the instructions to an actual UI
//! toolkit is the consumer's concern.

use std::fmt;

use crate::game::entities::{Card, Outcome, Seat, SeatIndex, TableState, Usd, DEFAULT_BET};
use crate::game::state_machine::{GameTable, ProtocolError};
use crate::lobby::LobbyState;
use crate::net::messages::{GameServerMessage, LobbyServerMessage};

/// Seat-local status line.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SeatMessage {
    PlaceBet,
    Waiting,
    Ready,
    YourTurn,
    PlayingTurn,
    /// Settled outcome; `amount` is only present for the local seat's
    /// own wins and losses.
    Outcome {
        outcome: Outcome,
        amount: Option<Usd>,
    },
}

impl fmt::Display for SeatMessage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::PlaceBet => write!(f, "Select your bet and press ready!"),
            Self::Waiting => write!(f, "Waiting..."),
            Self::Ready => write!(f, "Player ready!"),
            Self::YourTurn => write!(f, "Your turn. Get up to 21 and beat the dealer to win."),
            Self::PlayingTurn => write!(f, "Currently playing turn..."),
            Self::Outcome { outcome, amount } => match (outcome, amount) {
                (Outcome::Win, Some(amount)) => write!(f, "You win! You won ${amount}"),
                (Outcome::Win, None) => write!(f, "Player wins!"),
                (Outcome::Loss, Some(amount)) => write!(f, "Dealer wins! You lost ${amount}"),
                (Outcome::Loss, None) => write!(f, "Dealer wins!"),
                (Outcome::Push, _) => write!(f, "It's a draw! You neither win nor lose."),
                (Outcome::Pending, _) => Ok(()),
            },
        }
    }
}

/// Displayed hand total.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum HandValueDisplay {
    Value(u32),
    Blackjack,
}

impl fmt::Display for HandValueDisplay {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Value(value) => write!(f, "{value}"),
            Self::Blackjack => write!(f, "Blackjack!"),
        }
    }
}

/// One declarative UI instruction. The consumer decides what a "seat
/// box" or "bet input" concretely is.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ViewUpdate {
    SeatHeading { idx: SeatIndex, text: String },
    ShowSeatBox { idx: SeatIndex },
    HideSeatBox { idx: SeatIndex },
    SetDollars { idx: SeatIndex, dollars: Usd },
    /// `None` clears the input.
    SetBetInput { idx: SeatIndex, bet: Option<Usd> },
    EnableBetEntry { idx: SeatIndex },
    LockBetEntry { idx: SeatIndex },
    ShowMaxBetButton { idx: SeatIndex },
    HideMaxBetButton { idx: SeatIndex },
    ShowReadyButton { idx: SeatIndex },
    HideReadyButton { idx: SeatIndex },
    ShowActionButtons { idx: SeatIndex },
    HideActionButtons { idx: SeatIndex },
    ShowStartButton,
    HideStartButton,
    SeatMessage { idx: SeatIndex, message: SeatMessage },
    ClearSeatHand { idx: SeatIndex },
    DealSeatCard { idx: SeatIndex, card: Card, position: usize },
    SetSeatHandValue { idx: SeatIndex, value: HandValueDisplay },
    ClearDealerHand,
    /// The dealer's face-down card; deliberately carries no card value.
    DealDealerHoleCard { position: usize },
    DealDealerCard { card: Card, position: usize },
    SetDealerHandValue { value: HandValueDisplay },
    AppendChat { author: String, text: String },
    Alert { text: String },
    UpsertLobbyTable {
        url: String,
        num_players: u32,
        creator: String,
    },
    RemoveLobbyTable { url: String },
    AppendLobbyChat { author: String, text: String },
}

impl fmt::Display for ViewUpdate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::SeatHeading { idx, text } => write!(f, "[seat {idx}] {text}"),
            Self::ShowSeatBox { idx } => write!(f, "[seat {idx}] joined the table"),
            Self::HideSeatBox { idx } => write!(f, "[seat {idx}] empty"),
            Self::SetDollars { idx, dollars } => write!(f, "[seat {idx}] ${dollars}"),
            Self::SetBetInput { idx, bet: Some(bet) } => write!(f, "[seat {idx}] bet ${bet}"),
            Self::SetBetInput { idx, bet: None } => write!(f, "[seat {idx}] bet cleared"),
            Self::EnableBetEntry { idx } => write!(f, "[seat {idx}] bet entry open"),
            Self::LockBetEntry { idx } => write!(f, "[seat {idx}] bet entry locked"),
            Self::ShowMaxBetButton { idx } => write!(f, "[seat {idx}] max-bet available"),
            Self::HideMaxBetButton { idx } => write!(f, "[seat {idx}] max-bet hidden"),
            Self::ShowReadyButton { idx } => write!(f, "[seat {idx}] ready button shown"),
            Self::HideReadyButton { idx } => write!(f, "[seat {idx}] ready button hidden"),
            Self::ShowActionButtons { idx } => {
                write!(f, "[seat {idx}] hit/hold/double enabled")
            }
            Self::HideActionButtons { idx } => {
                write!(f, "[seat {idx}] hit/hold/double disabled")
            }
            Self::ShowStartButton => write!(f, "[table] start button shown"),
            Self::HideStartButton => write!(f, "[table] start button hidden"),
            Self::SeatMessage { idx, message } => write!(f, "[seat {idx}] {message}"),
            Self::ClearSeatHand { idx } => write!(f, "[seat {idx}] hand cleared"),
            Self::DealSeatCard {
                idx,
                card,
                position,
            } => write!(f, "[seat {idx}] card {position}: {card}"),
            Self::SetSeatHandValue { idx, value } => write!(f, "[seat {idx}] total {value}"),
            Self::ClearDealerHand => write!(f, "[dealer] hand cleared"),
            Self::DealDealerHoleCard { position } => {
                write!(f, "[dealer] card {position}: face down")
            }
            Self::DealDealerCard { card, position } => {
                write!(f, "[dealer] card {position}: {card}")
            }
            Self::SetDealerHandValue { value } => write!(f, "[dealer] total {value}"),
            Self::AppendChat { author, text } => write!(f, "[chat] {author}: {text}"),
            Self::Alert { text } => write!(f, "[alert] {text}"),
            Self::UpsertLobbyTable {
                url,
                num_players,
                creator,
            } => write!(f, "[lobby] {creator}'s game {url}, {num_players} player(s)"),
            Self::RemoveLobbyTable { url } => write!(f, "[lobby] game {url} closed"),
            Self::AppendLobbyChat { author, text } => {
                write!(f, "[lobby chat] {author}: {text}")
            }
        }
    }
}

fn hand_value_display(seat: &Seat) -> HandValueDisplay {
    if seat.hand.is_blackjack() {
        HandValueDisplay::Blackjack
    } else {
        HandValueDisplay::Value(seat.hand.value())
    }
}

fn dealer_value_display(state: &TableState) -> HandValueDisplay {
    if state.dealer.blackjack {
        HandValueDisplay::Blackjack
    } else {
        HandValueDisplay::Value(state.dealer.hand.value())
    }
}

/// Hide every control a non-interactive seat box carries.
fn disable_controls(idx: SeatIndex, updates: &mut Vec<ViewUpdate>) {
    updates.push(ViewUpdate::HideMaxBetButton { idx });
    updates.push(ViewUpdate::HideActionButtons { idx });
    updates.push(ViewUpdate::HideReadyButton { idx });
    updates.push(ViewUpdate::SetBetInput { idx, bet: None });
    updates.push(ViewUpdate::LockBetEntry { idx });
}

fn occupied_heading(idx: SeatIndex, seat: &Seat, updates: &mut Vec<ViewUpdate>) {
    if let Some(occupant) = &seat.occupant {
        updates.push(ViewUpdate::SeatHeading {
            idx,
            text: format!("Player: {}", occupant.username),
        });
        updates.push(ViewUpdate::SetDollars {
            idx,
            dollars: seat.dollars,
        });
    }
}

/// Map an applied event plus the resulting table state to view updates.
///
/// Must be called with the state the event produced; it reads hands,
/// bets, and balances from the state rather than the raw payload so a
/// replay against the same state is exactly reproducible.
pub fn project(table: &GameTable, msg: &GameServerMessage) -> Vec<ViewUpdate> {
    let state = table.state();
    let my_idx = table.ctx().my_idx();
    let mut updates = Vec::new();

    match msg {
        GameServerMessage::ChatMessage {
            player,
            chat_message,
        } => {
            updates.push(ViewUpdate::AppendChat {
                author: player.clone(),
                text: chat_message.clone(),
            });
        }
        GameServerMessage::InitGame { .. } => {
            for (idx, seat) in state.seats.iter().enumerate() {
                if my_idx == Some(idx) {
                    updates.push(ViewUpdate::SeatHeading {
                        idx,
                        text: format!("This is your game, {}", table.ctx().username()),
                    });
                    updates.push(ViewUpdate::SetDollars {
                        idx,
                        dollars: seat.dollars,
                    });
                    disable_controls(idx, &mut updates);
                } else if seat.is_occupied() {
                    occupied_heading(idx, seat, &mut updates);
                    disable_controls(idx, &mut updates);
                } else {
                    updates.push(ViewUpdate::HideSeatBox { idx });
                }
            }
        }
        GameServerMessage::PlayerAdded { idx, player_added } => {
            let Ok(idx) = usize::try_from(*idx) else {
                return updates;
            };
            if idx >= state.seats.len() {
                return updates;
            }
            // Self-echo: the local seat box was set up at snapshot time.
            if table.ctx().is_self_echo(idx, player_added) {
                return updates;
            }
            let seat = state.seat(idx);
            occupied_heading(idx, seat, &mut updates);
            updates.push(ViewUpdate::ShowSeatBox { idx });
            disable_controls(idx, &mut updates);
        }
        GameServerMessage::PlayerRemoved {
            idx,
            player_removed,
        } => {
            let Ok(idx) = usize::try_from(*idx) else {
                return updates;
            };
            if idx >= state.seats.len() {
                return updates;
            }
            if table.ctx().is_self_echo(idx, player_removed) {
                return updates;
            }
            updates.push(ViewUpdate::SeatHeading {
                idx,
                text: "No player joined!".to_string(),
            });
            updates.push(ViewUpdate::HideSeatBox { idx });
        }
        GameServerMessage::GameStarted { .. } => {
            updates.push(ViewUpdate::HideStartButton);
            updates.push(ViewUpdate::ClearDealerHand);
            for (idx, _) in state.occupied_seats() {
                updates.push(ViewUpdate::SeatMessage {
                    idx,
                    message: SeatMessage::Waiting,
                });
                updates.push(ViewUpdate::ClearSeatHand { idx });
            }
            if let Some(idx) = my_idx {
                updates.push(ViewUpdate::ShowReadyButton { idx });
                updates.push(ViewUpdate::SetBetInput {
                    idx,
                    bet: Some(DEFAULT_BET),
                });
                updates.push(ViewUpdate::EnableBetEntry { idx });
                updates.push(ViewUpdate::ShowMaxBetButton { idx });
                updates.push(ViewUpdate::SeatMessage {
                    idx,
                    message: SeatMessage::PlaceBet,
                });
            }
        }
        GameServerMessage::GameStartedAllReady { .. } => {
            // Hole card first, face down; only the second card shows.
            updates.push(ViewUpdate::DealDealerHoleCard { position: 0 });
            if let Some(card) = state.dealer.hand.cards().get(1) {
                updates.push(ViewUpdate::DealDealerCard {
                    card: *card,
                    position: 1,
                });
            }
            for (idx, seat) in state.occupied_seats() {
                for (position, card) in seat.hand.cards().iter().enumerate() {
                    updates.push(ViewUpdate::DealSeatCard {
                        idx,
                        card: *card,
                        position,
                    });
                }
                if !seat.hand.is_empty() {
                    updates.push(ViewUpdate::SetSeatHandValue {
                        idx,
                        value: hand_value_display(seat),
                    });
                }
                updates.push(ViewUpdate::SeatMessage {
                    idx,
                    message: SeatMessage::Waiting,
                });
            }
        }
        GameServerMessage::NextTurn { .. } => {
            for (idx, _) in state.occupied_seats() {
                updates.push(ViewUpdate::SeatMessage {
                    idx,
                    message: SeatMessage::Waiting,
                });
            }
            if let Some(idx) = my_idx {
                updates.push(ViewUpdate::HideActionButtons { idx });
            }
            if let Some(turn) = state.current_turn {
                if my_idx == Some(turn) {
                    updates.push(ViewUpdate::SeatMessage {
                        idx: turn,
                        message: SeatMessage::YourTurn,
                    });
                    updates.push(ViewUpdate::ShowActionButtons { idx: turn });
                } else {
                    updates.push(ViewUpdate::SeatMessage {
                        idx: turn,
                        message: SeatMessage::PlayingTurn,
                    });
                }
            }
        }
        GameServerMessage::PlayerHit { idx, .. } => {
            let Ok(idx) = usize::try_from(*idx) else {
                return updates;
            };
            if idx >= state.seats.len() {
                return updates;
            }
            let seat = state.seat(idx);
            if let Some(card) = seat.hand.last_card() {
                updates.push(ViewUpdate::DealSeatCard {
                    idx,
                    card,
                    position: seat.hand.len() - 1,
                });
            }
            updates.push(ViewUpdate::SetSeatHandValue {
                idx,
                value: hand_value_display(seat),
            });
            updates.push(ViewUpdate::SetDollars {
                idx,
                dollars: seat.dollars,
            });
            updates.push(ViewUpdate::SetBetInput {
                idx,
                bet: Some(seat.bet),
            });
            updates.push(ViewUpdate::LockBetEntry { idx });
        }
        GameServerMessage::PlayerReady { idx, .. } => {
            let Ok(idx) = usize::try_from(*idx) else {
                return updates;
            };
            if idx >= state.seats.len() {
                return updates;
            }
            let seat = state.seat(idx);
            updates.push(ViewUpdate::SetDollars {
                idx,
                dollars: seat.dollars,
            });
            updates.push(ViewUpdate::SetBetInput {
                idx,
                bet: Some(seat.bet),
            });
            updates.push(ViewUpdate::LockBetEntry { idx });
            updates.push(ViewUpdate::HideReadyButton { idx });
            updates.push(ViewUpdate::HideMaxBetButton { idx });
            updates.push(ViewUpdate::SeatMessage {
                idx,
                message: SeatMessage::Ready,
            });
        }
        GameServerMessage::PlayersBlackjack { players } => {
            for &idx in players {
                let Ok(idx) = usize::try_from(idx) else {
                    continue;
                };
                if idx < state.seats.len() {
                    updates.push(ViewUpdate::SetSeatHandValue {
                        idx,
                        value: HandValueDisplay::Blackjack,
                    });
                }
            }
        }
        GameServerMessage::DealerFinalTurn { .. } => {
            if let Some(idx) = my_idx {
                updates.push(ViewUpdate::HideActionButtons { idx });
            }
            for (idx, _) in state.occupied_seats() {
                updates.push(ViewUpdate::SeatMessage {
                    idx,
                    message: SeatMessage::Waiting,
                });
            }
            updates.push(ViewUpdate::ClearDealerHand);
            for (position, card) in state.dealer.hand.cards().iter().enumerate() {
                updates.push(ViewUpdate::DealDealerCard {
                    card: *card,
                    position,
                });
            }
            updates.push(ViewUpdate::SetDealerHandValue {
                value: dealer_value_display(state),
            });
            for (idx, seat) in state.occupied_seats() {
                let amount = (my_idx == Some(idx)
                    && matches!(seat.outcome, Outcome::Win | Outcome::Loss))
                .then_some(seat.win_loss);
                updates.push(ViewUpdate::SeatMessage {
                    idx,
                    message: SeatMessage::Outcome {
                        outcome: seat.outcome,
                        amount,
                    },
                });
                updates.push(ViewUpdate::SetDollars {
                    idx,
                    dollars: seat.dollars,
                });
                updates.push(ViewUpdate::SetBetInput { idx, bet: None });
            }
            updates.push(ViewUpdate::ShowStartButton);
        }
    }

    updates
}

/// Map an applied lobby event to view updates.
pub fn project_lobby(state: &LobbyState, msg: &LobbyServerMessage) -> Vec<ViewUpdate> {
    match msg {
        LobbyServerMessage::UpdateGame { url, .. } => match state.entry(url) {
            Some(entry) => vec![ViewUpdate::UpsertLobbyTable {
                url: entry.url.clone(),
                num_players: entry.num_players,
                creator: entry.creator.clone(),
            }],
            None => Vec::new(),
        },
        LobbyServerMessage::RemoveGame { url } => {
            vec![ViewUpdate::RemoveLobbyTable { url: url.clone() }]
        }
        LobbyServerMessage::ChatMessage {
            player,
            chat_message,
        } => vec![ViewUpdate::AppendLobbyChat {
            author: player.clone(),
            text: chat_message.clone(),
        }],
    }
}

/// A protocol violation rendered as a non-fatal, user-visible alert.
pub fn project_error(error: &ProtocolError) -> Vec<ViewUpdate> {
    vec![ViewUpdate::Alert {
        text: error.to_string(),
    }]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::state_machine::SessionContext;
    use crate::net::messages::{GameStateTag, PlayerSnapshot, TableSnapshot};

    fn player(idx: usize) -> PlayerSnapshot {
        PlayerSnapshot {
            name: format!("chan.{idx}"),
            username: format!("player{idx}"),
            index: idx as i64,
            dollars: 100,
            current_bet: 0,
            in_game: true,
            current_hand: vec![],
            current_hand_value: 0,
            player_game_state: Default::default(),
            player_game_outcome: Outcome::Pending,
            win_loss: 0,
        }
    }

    fn seated_table(my_idx: usize, indices: &[usize]) -> GameTable {
        let mut snapshot = TableSnapshot::default();
        for &idx in indices {
            snapshot.players.insert(idx, player(idx));
        }
        let mut table = GameTable::new(SessionContext::new());
        table
            .apply(&GameServerMessage::InitGame {
                state: snapshot,
                my_idx: my_idx as i64,
            })
            .unwrap();
        table
    }

    #[test]
    fn test_projection_is_idempotent() {
        let table = seated_table(0, &[0, 1]);
        let msg = GameServerMessage::InitGame {
            state: TableSnapshot::default(),
            my_idx: 0,
        };
        assert_eq!(project(&table, &msg), project(&table, &msg));
    }

    #[test]
    fn test_init_game_hides_empty_seats_and_marks_own() {
        let table = seated_table(0, &[0, 1]);
        let msg = GameServerMessage::InitGame {
            state: TableSnapshot::default(),
            my_idx: 0,
        };
        let updates = project(&table, &msg);
        assert!(updates.contains(&ViewUpdate::SeatHeading {
            idx: 0,
            text: "This is your game, player0".into(),
        }));
        assert!(updates.contains(&ViewUpdate::SeatHeading {
            idx: 1,
            text: "Player: player1".into(),
        }));
        assert!(updates.contains(&ViewUpdate::HideSeatBox { idx: 2 }));
    }

    #[test]
    fn test_self_echo_projects_nothing() {
        let table = seated_table(0, &[0]);
        let msg = GameServerMessage::PlayerAdded {
            idx: 0,
            player_added: player(0),
        };
        assert!(project(&table, &msg).is_empty());
    }

    #[test]
    fn test_game_started_enables_only_own_bet_entry() {
        let mut table = seated_table(0, &[0, 1]);
        let mut snapshot = TableSnapshot::default();
        snapshot.players.insert(0, player(0));
        snapshot.players.insert(1, player(1));
        snapshot.game_state = GameStateTag::AwaitingReady;
        let msg = GameServerMessage::GameStarted { state: snapshot };
        table.apply(&msg).unwrap();

        let updates = project(&table, &msg);
        assert!(updates.contains(&ViewUpdate::EnableBetEntry { idx: 0 }));
        assert!(updates.contains(&ViewUpdate::SetBetInput {
            idx: 0,
            bet: Some(DEFAULT_BET),
        }));
        assert!(!updates.contains(&ViewUpdate::EnableBetEntry { idx: 1 }));
        assert!(updates.contains(&ViewUpdate::HideStartButton));
    }

    #[test]
    fn test_initial_deal_never_leaks_dealer_hole_card() {
        use crate::game::entities::{Card, Num, Suit};

        let mut table = seated_table(0, &[0]);
        let mut snapshot = TableSnapshot::default();
        let mut p = player(0);
        p.current_hand = vec![
            Card {
                suit: Suit::Clubs,
                num: Num::Five,
            },
            Card {
                suit: Suit::Hearts,
                num: Num::Six,
            },
        ];
        p.current_hand_value = 11;
        snapshot.players.insert(0, p);
        snapshot.game_state = GameStateTag::Started;
        snapshot.dealer_hand = vec![
            Card {
                suit: Suit::Spades,
                num: Num::Ace,
            },
            Card {
                suit: Suit::Diamonds,
                num: Num::Nine,
            },
        ];
        let msg = GameServerMessage::GameStartedAllReady { state: snapshot };
        table.apply(&msg).unwrap();

        let updates = project(&table, &msg);
        assert!(updates.contains(&ViewUpdate::DealDealerHoleCard { position: 0 }));
        let dealer_cards: Vec<_> = updates
            .iter()
            .filter(|u| matches!(u, ViewUpdate::DealDealerCard { .. }))
            .collect();
        assert_eq!(dealer_cards.len(), 1);
        assert_eq!(
            dealer_cards[0],
            &ViewUpdate::DealDealerCard {
                card: Card {
                    suit: Suit::Diamonds,
                    num: Num::Nine,
                },
                position: 1,
            }
        );
    }

    #[test]
    fn test_own_win_message_carries_amount() {
        let msg = SeatMessage::Outcome {
            outcome: Outcome::Win,
            amount: Some(10),
        };
        assert_eq!(msg.to_string(), "You win! You won $10");

        let msg = SeatMessage::Outcome {
            outcome: Outcome::Push,
            amount: None,
        };
        assert!(msg.to_string().starts_with("It's a draw!"));
    }

    #[test]
    fn test_lobby_projection() {
        let mut lobby = LobbyState::new();
        let msg = LobbyServerMessage::UpdateGame {
            url: "abc".into(),
            num_players: 2,
            creator: "alice".into(),
        };
        lobby.apply(&msg);
        let updates = project_lobby(&lobby, &msg);
        assert_eq!(
            updates,
            vec![ViewUpdate::UpsertLobbyTable {
                url: "abc".into(),
                num_players: 2,
                creator: "alice".into(),
            }]
        );

        let remove = LobbyServerMessage::RemoveGame { url: "abc".into() };
        lobby.apply(&remove);
        assert_eq!(
            project_lobby(&lobby, &remove),
            vec![ViewUpdate::RemoveLobbyTable { url: "abc".into() }]
        );
    }
}
