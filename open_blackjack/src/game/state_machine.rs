//! Client-side table state machine.
//!
//! [`GameTable`] mirrors server-authoritative table state by applying
//! each incoming [`GameServerMessage`] as a transition. Events are
//! validated in full before any field is touched; a violation leaves the
//! table exactly as it was and surfaces as a recoverable
//! [`ProtocolError`].

use log::warn;
use thiserror::Error;

use super::entities::{
    Occupant, Phase, Seat, SeatIndex, TABLE_SEATS, TableState,
};
use crate::net::messages::{
    GameServerMessage, GameStateTag, PlayerSnapshot, PlayerStateTag, TableSnapshot,
};

/// Protocol invariant violations. These indicate a disagreement with the
/// server rather than a local bug, so they are surfaced as alerts instead
/// of panics, and the offending event is not applied.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum ProtocolError {
    #[error("seat index {idx} is outside the table")]
    SeatOutOfRange { idx: i64 },
    #[error("dealer was dealt {count} card(s) instead of 2")]
    BadDealerDeal { count: usize },
    #[error("seat {idx} was dealt {count} card(s) instead of 2")]
    BadSeatDeal { idx: SeatIndex, count: usize },
    #[error("seat {idx} hand went from {prev} to {got} card(s) on a single hit")]
    BadHitHandSize {
        idx: SeatIndex,
        prev: usize,
        got: usize,
    },
    #[error("snapshot has no player at seat {idx}")]
    MissingSeat { idx: SeatIndex },
}

/// The local participant's identity at one table, fixed for the life of
/// the connection. Replaces any notion of ambient "my seat" globals.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SessionContext {
    my_idx: Option<SeatIndex>,
    username: String,
    channel: String,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// The seat assigned by the first snapshot, if any.
    pub fn my_idx(&self) -> Option<SeatIndex> {
        self.my_idx
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn is_my_seat(&self, idx: SeatIndex) -> bool {
        self.my_idx == Some(idx)
    }

    /// Whether a join/leave notification refers to this client itself.
    pub fn is_self_echo(&self, idx: SeatIndex, player: &PlayerSnapshot) -> bool {
        self.is_my_seat(idx) || (!self.channel.is_empty() && self.channel == player.name)
    }

    /// Assign the seat exactly once; later snapshots never move it.
    fn claim_seat(&mut self, idx: SeatIndex, player: &PlayerSnapshot) {
        if self.my_idx.is_some() {
            return;
        }
        self.my_idx = Some(idx);
        self.username = player.username.clone();
        self.channel = player.name.clone();
    }
}

fn check_seat(idx: i64) -> Result<SeatIndex, ProtocolError> {
    if (0..TABLE_SEATS as i64).contains(&idx) {
        Ok(idx as SeatIndex)
    } else {
        Err(ProtocolError::SeatOutOfRange { idx })
    }
}

/// Initial phase is derived from the snapshot, never assumed. The server
/// reuses its "not-started" tag both for a table that has never played
/// and for one parked after settlement; the dealer's leftover cards tell
/// those apart.
fn derive_phase(snapshot: &TableSnapshot) -> Phase {
    match snapshot.game_state {
        GameStateTag::AwaitingReady => Phase::Betting,
        GameStateTag::Started => {
            if snapshot.current_turn < 0 {
                Phase::Dealing
            } else if snapshot.turn_seat().is_some() {
                Phase::PlayerTurns
            } else {
                Phase::DealerTurn
            }
        }
        GameStateTag::NotStarted => {
            if snapshot.dealer_hand.is_empty() {
                Phase::LobbyWait
            } else {
                Phase::RoundSettled
            }
        }
    }
}

fn seat_from_snapshot(player: &PlayerSnapshot) -> Seat {
    let mut seat = Seat::default();
    seat.occupy(
        Occupant {
            username: player.username.clone(),
            channel: player.name.clone(),
        },
        player.dollars,
    );
    seat.bet = player.current_bet;
    seat.hand
        .replace(player.current_hand.clone(), player.current_hand_value);
    if player.player_game_state == PlayerStateTag::GameOverBlackjack {
        seat.hand.mark_blackjack();
    }
    seat.outcome = player.player_game_outcome;
    seat.win_loss = player.win_loss;
    seat
}

/// The authoritative-state mirror for one table, owned by exactly one
/// dispatcher; all mutation goes through [`GameTable::apply`].
#[derive(Clone, Debug, Default)]
pub struct GameTable {
    ctx: SessionContext,
    state: TableState,
}

impl GameTable {
    pub fn new(ctx: SessionContext) -> Self {
        Self {
            ctx,
            state: TableState::default(),
        }
    }

    pub fn state(&self) -> &TableState {
        &self.state
    }

    pub fn ctx(&self) -> &SessionContext {
        &self.ctx
    }

    /// The local participant's seat, once assigned.
    pub fn my_seat(&self) -> Option<&Seat> {
        self.ctx.my_idx().map(|idx| self.state.seat(idx))
    }

    /// Apply one server event as a state transition.
    ///
    /// On `Err`, nothing was mutated and the phase is unchanged; the
    /// caller should surface the error as a non-fatal alert.
    pub fn apply(&mut self, msg: &GameServerMessage) -> Result<(), ProtocolError> {
        match msg {
            GameServerMessage::ChatMessage {
                player,
                chat_message,
            } => {
                self.state.push_chat(player.clone(), chat_message.clone());
                Ok(())
            }
            GameServerMessage::InitGame { state, my_idx } => self.init_game(state, *my_idx),
            GameServerMessage::PlayerAdded { idx, player_added } => {
                self.player_added(*idx, player_added)
            }
            GameServerMessage::PlayerRemoved {
                idx,
                player_removed,
            } => self.player_removed(*idx, player_removed),
            GameServerMessage::GameStarted { state } => self.game_started(state),
            GameServerMessage::GameStartedAllReady { state } => self.all_ready(state),
            GameServerMessage::NextTurn { state } => self.next_turn(state),
            GameServerMessage::PlayerHit { idx, state } => self.player_hit(*idx, state),
            GameServerMessage::PlayerReady { idx, state } => self.player_ready(*idx, state),
            GameServerMessage::DealerFinalTurn { state } => self.dealer_final_turn(state),
            GameServerMessage::PlayersBlackjack { players } => self.players_blackjack(players),
        }
    }

    /// Rebuild every seat and the dealer from a full snapshot. Seat
    /// indices are validated before anything is replaced.
    fn load_snapshot(&mut self, snapshot: &TableSnapshot) -> Result<(), ProtocolError> {
        let mut seats: [Seat; TABLE_SEATS] = Default::default();
        for (&idx, player) in &snapshot.players {
            check_seat(idx as i64)?;
            seats[idx] = seat_from_snapshot(player);
        }

        let phase = derive_phase(snapshot);
        self.state.seats = seats;
        self.state.dealer.hand.replace(
            snapshot.dealer_hand.clone(),
            snapshot.dealer_hand_value,
        );
        self.state.dealer.blackjack = snapshot.dealer_blackjack;
        self.state.dealer.hole_card_hidden = !snapshot.dealer_hand.is_empty()
            && matches!(
                phase,
                Phase::Dealing | Phase::PlayerTurns | Phase::DealerTurn
            );
        self.state.current_turn = snapshot.turn_seat();
        self.state.phase = phase;
        Ok(())
    }

    fn init_game(&mut self, snapshot: &TableSnapshot, my_idx: i64) -> Result<(), ProtocolError> {
        // Validate the seat claim before replacing anything.
        let claim = match check_seat(my_idx) {
            Ok(idx) => match snapshot.players.get(&idx) {
                Some(player) => Some((idx, player.clone())),
                None => return Err(ProtocolError::MissingSeat { idx }),
            },
            Err(_) => {
                // The server failed to find this session's seat; keep the
                // table view, but never enable interactive affordances.
                warn!("snapshot reply carries no seat for this session (my_idx {my_idx})");
                None
            }
        };

        self.load_snapshot(snapshot)?;
        if let Some((idx, player)) = claim {
            self.ctx.claim_seat(idx, &player);
        }
        Ok(())
    }

    fn player_added(&mut self, idx: i64, player: &PlayerSnapshot) -> Result<(), ProtocolError> {
        let idx = check_seat(idx)?;
        // The local seat's own join echo was already handled at snapshot
        // time; occupying it again would duplicate the seat box.
        if self.ctx.is_self_echo(idx, player) {
            return Ok(());
        }
        self.state.seats[idx].occupy(
            Occupant {
                username: player.username.clone(),
                channel: player.name.clone(),
            },
            player.dollars,
        );
        Ok(())
    }

    fn player_removed(&mut self, idx: i64, player: &PlayerSnapshot) -> Result<(), ProtocolError> {
        let idx = check_seat(idx)?;
        if self.ctx.is_self_echo(idx, player) {
            return Ok(());
        }
        self.state.seats[idx].vacate();
        Ok(())
    }

    fn game_started(&mut self, snapshot: &TableSnapshot) -> Result<(), ProtocolError> {
        self.load_snapshot(snapshot)?;
        for seat in self.state.seats.iter_mut().filter(|s| s.is_occupied()) {
            seat.reset_for_round();
        }
        self.state.dealer.reset();
        self.state.current_turn = None;
        self.state.phase = Phase::Betting;
        Ok(())
    }

    fn player_ready(&mut self, idx: i64, snapshot: &TableSnapshot) -> Result<(), ProtocolError> {
        let idx = check_seat(idx)?;
        let player = snapshot
            .players
            .get(&idx)
            .ok_or(ProtocolError::MissingSeat { idx })?;
        let seat = &mut self.state.seats[idx];
        seat.bet = player.current_bet;
        seat.dollars = player.dollars;
        Ok(())
    }

    fn all_ready(&mut self, snapshot: &TableSnapshot) -> Result<(), ProtocolError> {
        // The initial deal is exactly two cards everywhere; anything else
        // means the client and server disagree about the round.
        if snapshot.dealer_hand.len() != 2 {
            return Err(ProtocolError::BadDealerDeal {
                count: snapshot.dealer_hand.len(),
            });
        }
        for (&idx, player) in &snapshot.players {
            check_seat(idx as i64)?;
            if player.in_game && player.current_hand.len() != 2 {
                return Err(ProtocolError::BadSeatDeal {
                    idx,
                    count: player.current_hand.len(),
                });
            }
        }

        for (&idx, player) in &snapshot.players {
            let seat = &mut self.state.seats[idx];
            if !seat.is_occupied() {
                // Server-authoritative: a deal for a seat we never saw
                // join still seats them.
                *seat = seat_from_snapshot(player);
            } else {
                seat.hand
                    .replace(player.current_hand.clone(), player.current_hand_value);
                seat.bet = player.current_bet;
                seat.dollars = player.dollars;
            }
        }
        self.state
            .dealer
            .hand
            .replace(snapshot.dealer_hand.clone(), snapshot.dealer_hand_value);
        self.state.dealer.blackjack = snapshot.dealer_blackjack;
        self.state.dealer.hole_card_hidden = true;
        self.state.current_turn = None;
        self.state.phase = Phase::Dealing;
        Ok(())
    }

    fn next_turn(&mut self, snapshot: &TableSnapshot) -> Result<(), ProtocolError> {
        let turn = snapshot
            .turn_seat()
            .ok_or(ProtocolError::SeatOutOfRange {
                idx: snapshot.current_turn,
            })?;
        self.state.current_turn = Some(turn);
        self.state.phase = Phase::PlayerTurns;
        Ok(())
    }

    fn player_hit(&mut self, idx: i64, snapshot: &TableSnapshot) -> Result<(), ProtocolError> {
        let idx = check_seat(idx)?;
        let player = snapshot
            .players
            .get(&idx)
            .ok_or(ProtocolError::MissingSeat { idx })?;
        let prev = self.state.seats[idx].hand.len();
        let got = player.current_hand.len();
        // A hit appends at most one card; a shrinking hand means we lost
        // sync with the server.
        if got < prev || got > prev + 1 {
            return Err(ProtocolError::BadHitHandSize { idx, prev, got });
        }
        let seat = &mut self.state.seats[idx];
        seat.hand
            .replace(player.current_hand.clone(), player.current_hand_value);
        // A double-down moves dollars into the bet mid-turn.
        seat.bet = player.current_bet;
        seat.dollars = player.dollars;
        Ok(())
    }

    fn players_blackjack(&mut self, players: &[i64]) -> Result<(), ProtocolError> {
        let mut indices = Vec::with_capacity(players.len());
        for &idx in players {
            indices.push(check_seat(idx)?);
        }
        for idx in indices {
            self.state.seats[idx].hand.mark_blackjack();
        }
        Ok(())
    }

    fn dealer_final_turn(&mut self, snapshot: &TableSnapshot) -> Result<(), ProtocolError> {
        if snapshot.dealer_hand.len() < 2 {
            return Err(ProtocolError::BadDealerDeal {
                count: snapshot.dealer_hand.len(),
            });
        }
        for &idx in snapshot.players.keys() {
            check_seat(idx as i64)?;
        }

        self.state
            .dealer
            .hand
            .replace(snapshot.dealer_hand.clone(), snapshot.dealer_hand_value);
        self.state.dealer.blackjack = snapshot.dealer_blackjack;
        self.state.dealer.hole_card_hidden = false;
        for (&idx, player) in &snapshot.players {
            let seat = &mut self.state.seats[idx];
            if !seat.is_occupied() {
                *seat = seat_from_snapshot(player);
                continue;
            }
            seat.outcome = player.player_game_outcome;
            seat.win_loss = player.win_loss;
            seat.dollars = player.dollars;
            seat.bet = player.current_bet;
            seat.hand
                .replace(player.current_hand.clone(), player.current_hand_value);
        }
        self.state.current_turn = None;
        self.state.phase = Phase::RoundSettled;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::entities::{Card, Num, Outcome, Suit};
    use crate::net::messages::GameStateTag;

    fn card(num: Num) -> Card {
        Card {
            suit: Suit::Spades,
            num,
        }
    }

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
            player_game_state: PlayerStateTag::AwaitingReady,
            player_game_outcome: Outcome::Pending,
            win_loss: 0,
        }
    }

    fn snapshot_with(indices: &[usize]) -> TableSnapshot {
        let mut snapshot = TableSnapshot::default();
        for &idx in indices {
            snapshot.players.insert(idx, player(idx));
        }
        snapshot
    }

    fn seated_table(my_idx: usize, indices: &[usize]) -> GameTable {
        let mut table = GameTable::new(SessionContext::new());
        table
            .apply(&GameServerMessage::InitGame {
                state: snapshot_with(indices),
                my_idx: my_idx as i64,
            })
            .unwrap();
        table
    }

    #[test]
    fn test_phase_derives_from_snapshot_tag() {
        let mut snapshot = snapshot_with(&[0]);
        assert_eq!(derive_phase(&snapshot), Phase::LobbyWait);

        snapshot.game_state = GameStateTag::AwaitingReady;
        assert_eq!(derive_phase(&snapshot), Phase::Betting);

        snapshot.game_state = GameStateTag::Started;
        snapshot.current_turn = -1;
        assert_eq!(derive_phase(&snapshot), Phase::Dealing);
        snapshot.current_turn = 1;
        assert_eq!(derive_phase(&snapshot), Phase::PlayerTurns);
        snapshot.current_turn = 1001;
        assert_eq!(derive_phase(&snapshot), Phase::DealerTurn);

        snapshot.game_state = GameStateTag::NotStarted;
        snapshot.dealer_hand = vec![card(Num::Nine), card(Num::King)];
        assert_eq!(derive_phase(&snapshot), Phase::RoundSettled);
    }

    #[test]
    fn test_init_game_claims_seat_once() {
        let mut table = seated_table(0, &[0, 1]);
        assert_eq!(table.ctx().my_idx(), Some(0));
        assert_eq!(table.ctx().username(), "player0");

        // A later snapshot never reassigns the seat.
        table
            .apply(&GameServerMessage::InitGame {
                state: snapshot_with(&[0, 1]),
                my_idx: 1,
            })
            .unwrap();
        assert_eq!(table.ctx().my_idx(), Some(0));
    }

    #[test]
    fn test_init_game_with_no_seat_keeps_table_usable() {
        let mut table = GameTable::new(SessionContext::new());
        table
            .apply(&GameServerMessage::InitGame {
                state: snapshot_with(&[1]),
                my_idx: -1,
            })
            .unwrap();
        assert_eq!(table.ctx().my_idx(), None);
        assert!(table.state().seat(1).is_occupied());
    }

    #[test]
    fn test_self_echo_join_is_ignored() {
        let mut table = seated_table(0, &[0]);
        let before = table.state().clone();
        table
            .apply(&GameServerMessage::PlayerAdded {
                idx: 0,
                player_added: player(0),
            })
            .unwrap();
        assert_eq!(table.state(), &before);
    }

    #[test]
    fn test_self_echo_matches_on_channel_key_too() {
        let mut table = seated_table(0, &[0]);
        // Same channel key reported at a different index.
        let mut echo = player(1);
        echo.name = "chan.0".into();
        table
            .apply(&GameServerMessage::PlayerRemoved {
                idx: 1,
                player_removed: echo,
            })
            .unwrap();
        assert!(!table.state().seat(1).is_occupied());

        // A genuine leave for another seat still applies.
        table
            .apply(&GameServerMessage::PlayerAdded {
                idx: 1,
                player_added: player(1),
            })
            .unwrap();
        assert!(table.state().seat(1).is_occupied());
        table
            .apply(&GameServerMessage::PlayerRemoved {
                idx: 1,
                player_removed: player(1),
            })
            .unwrap();
        assert!(!table.state().seat(1).is_occupied());
    }

    #[test]
    fn test_out_of_range_seat_is_rejected_without_mutation() {
        let mut table = seated_table(0, &[0]);
        let before = table.state().clone();
        let result = table.apply(&GameServerMessage::PlayerAdded {
            idx: 7,
            player_added: player(1),
        });
        assert_eq!(result, Err(ProtocolError::SeatOutOfRange { idx: 7 }));
        assert_eq!(table.state(), &before);
    }

    #[test]
    fn test_short_initial_deal_is_rejected_without_phase_change() {
        let mut table = seated_table(0, &[0, 1]);
        let mut snapshot = snapshot_with(&[0, 1]);
        snapshot.game_state = GameStateTag::Started;
        snapshot.dealer_hand = vec![card(Num::Nine)];
        let result = table.apply(&GameServerMessage::GameStartedAllReady { state: snapshot });
        assert_eq!(result, Err(ProtocolError::BadDealerDeal { count: 1 }));
        assert_eq!(table.state().phase, Phase::LobbyWait);
    }

    #[test]
    fn test_hit_appends_at_most_one_card() {
        let mut table = seated_table(0, &[0, 1]);
        let mut snapshot = snapshot_with(&[0, 1]);
        snapshot.game_state = GameStateTag::Started;
        snapshot.dealer_hand = vec![card(Num::Nine), card(Num::King)];
        for p in snapshot.players.values_mut() {
            p.current_hand = vec![card(Num::Five), card(Num::Six)];
            p.current_hand_value = 11;
        }
        table
            .apply(&GameServerMessage::GameStartedAllReady {
                state: snapshot.clone(),
            })
            .unwrap();

        // One new card is fine.
        let mut hit = snapshot.clone();
        let p0 = hit.players.get_mut(&0).unwrap();
        p0.current_hand.push(card(Num::Eight));
        p0.current_hand_value = 19;
        table
            .apply(&GameServerMessage::PlayerHit {
                idx: 0,
                state: hit,
            })
            .unwrap();
        assert_eq!(table.state().seat(0).hand.len(), 3);
        assert_eq!(table.state().seat(0).hand.value(), 19);

        // A shrinking hand is a protocol violation.
        let mut shrunk = snapshot.clone();
        shrunk.players.get_mut(&0).unwrap().current_hand = vec![card(Num::Five)];
        let result = table.apply(&GameServerMessage::PlayerHit {
            idx: 0,
            state: shrunk,
        });
        assert_eq!(
            result,
            Err(ProtocolError::BadHitHandSize {
                idx: 0,
                prev: 3,
                got: 1
            })
        );
        assert_eq!(table.state().seat(0).hand.len(), 3);
    }

    #[test]
    fn test_game_started_resets_round_state() {
        let mut table = seated_table(0, &[0, 1]);
        let mut snapshot = snapshot_with(&[0, 1]);
        snapshot.game_state = GameStateTag::AwaitingReady;
        table
            .apply(&GameServerMessage::GameStarted { state: snapshot })
            .unwrap();
        assert_eq!(table.state().phase, Phase::Betting);
        assert_eq!(table.state().current_turn, None);
        assert!(table.state().dealer.hand.is_empty());
        for (_, seat) in table.state().occupied_seats() {
            assert!(seat.hand.is_empty());
            assert_eq!(seat.bet, 0);
            assert_eq!(seat.outcome, Outcome::Pending);
        }
    }

    #[test]
    fn test_players_blackjack_validates_all_indices_first() {
        let mut table = seated_table(0, &[0, 1]);
        let result = table.apply(&GameServerMessage::PlayersBlackjack {
            players: vec![0, 9],
        });
        assert_eq!(result, Err(ProtocolError::SeatOutOfRange { idx: 9 }));
        assert!(!table.state().seat(0).hand.is_blackjack());

        table
            .apply(&GameServerMessage::PlayersBlackjack { players: vec![0] })
            .unwrap();
        assert!(table.state().seat(0).hand.is_blackjack());
    }

    #[test]
    fn test_dealer_final_turn_settles_and_reveals() {
        let mut table = seated_table(0, &[0, 1]);
        let mut snapshot = snapshot_with(&[0, 1]);
        snapshot.game_state = GameStateTag::Started;
        snapshot.dealer_hand = vec![card(Num::Nine), card(Num::King)];
        for p in snapshot.players.values_mut() {
            p.current_hand = vec![card(Num::Ten), card(Num::Nine)];
            p.current_hand_value = 19;
        }
        table
            .apply(&GameServerMessage::GameStartedAllReady {
                state: snapshot.clone(),
            })
            .unwrap();
        assert!(table.state().dealer.hole_card_hidden);

        snapshot.game_state = GameStateTag::NotStarted;
        snapshot.dealer_hand_value = 19;
        {
            let p0 = snapshot.players.get_mut(&0).unwrap();
            p0.player_game_outcome = Outcome::Push;
            p0.dollars = 100;
        }
        {
            let p1 = snapshot.players.get_mut(&1).unwrap();
            p1.player_game_outcome = Outcome::Push;
            p1.dollars = 100;
        }
        table
            .apply(&GameServerMessage::DealerFinalTurn { state: snapshot })
            .unwrap();
        assert_eq!(table.state().phase, Phase::RoundSettled);
        assert!(!table.state().dealer.hole_card_hidden);
        assert_eq!(table.state().current_turn, None);
        assert_eq!(table.state().seat(0).outcome, Outcome::Push);
    }
}
