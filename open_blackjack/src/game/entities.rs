use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of fixed seats at a table.
pub const TABLE_SEATS: usize = 3;

/// Starting balance the server assigns to a fresh seat.
pub const DEFAULT_DOLLARS: Usd = 100;

/// Bet the client pre-fills when a betting round opens.
pub const DEFAULT_BET: Usd = 5;

/// Placeholder for dollar amounts.
pub type Usd = i64;

/// Type alias for seat positions at the table.
pub type SeatIndex = usize;

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Suit {
    Clubs,
    Spades,
    // The wire name is the HTML entity the original table skin used.
    #[serde(rename = "diams")]
    Diamonds,
    Hearts,
}

impl fmt::Display for Suit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Clubs => "♣",
            Self::Spades => "♠",
            Self::Diamonds => "♦",
            Self::Hearts => "♥",
        };
        write!(f, "{repr}")
    }
}

/// Card face symbol. Numeric values live server-side; the client only
/// ever displays what it was dealt.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Num {
    #[serde(rename = "A")]
    Ace,
    #[serde(rename = "2")]
    Two,
    #[serde(rename = "3")]
    Three,
    #[serde(rename = "4")]
    Four,
    #[serde(rename = "5")]
    Five,
    #[serde(rename = "6")]
    Six,
    #[serde(rename = "7")]
    Seven,
    #[serde(rename = "8")]
    Eight,
    #[serde(rename = "9")]
    Nine,
    #[serde(rename = "10")]
    Ten,
    #[serde(rename = "J")]
    Jack,
    #[serde(rename = "Q")]
    Queen,
    #[serde(rename = "K")]
    King,
}

impl fmt::Display for Num {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Ace => "A",
            Self::Two => "2",
            Self::Three => "3",
            Self::Four => "4",
            Self::Five => "5",
            Self::Six => "6",
            Self::Seven => "7",
            Self::Eight => "8",
            Self::Nine => "9",
            Self::Ten => "10",
            Self::Jack => "J",
            Self::Queen => "Q",
            Self::King => "K",
        };
        write!(f, "{repr}")
    }
}

/// A playing card as it crosses the wire. The server also attaches a
/// redundant numeric `value` field, which the client ignores.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Card {
    pub suit: Suit,
    pub num: Num,
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = format!("{}/{}", self.num, self.suit);
        write!(f, "{repr:>4}")
    }
}

/// Round outcome for one seat, as computed by the server.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    #[default]
    #[serde(rename = "na")]
    Pending,
    Win,
    Loss,
    Push,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Pending => "pending",
            Self::Win => "win",
            Self::Loss => "loss",
            Self::Push => "push",
        };
        write!(f, "{repr}")
    }
}

/// An ordered, append-only hand of cards with the server-computed value
/// attached. Values are never recomputed client-side.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Hand {
    cards: Vec<Card>,
    value: u32,
    blackjack: bool,
}

impl Hand {
    pub fn new(cards: Vec<Card>, value: u32) -> Self {
        Self {
            cards,
            value,
            blackjack: false,
        }
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn last_card(&self) -> Option<Card> {
        self.cards.last().copied()
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn value(&self) -> u32 {
        self.value
    }

    pub fn is_blackjack(&self) -> bool {
        self.blackjack
    }

    pub fn mark_blackjack(&mut self) {
        self.blackjack = true;
    }

    pub fn reset(&mut self) {
        self.cards.clear();
        self.value = 0;
        self.blackjack = false;
    }

    /// Replace the hand's contents with a fresh server snapshot.
    pub fn replace(&mut self, cards: Vec<Card>, value: u32) {
        self.cards = cards;
        self.value = value;
    }
}

impl fmt::Display for Hand {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.blackjack {
            return write!(f, "blackjack!");
        }
        for card in &self.cards {
            write!(f, "{card} ")?;
        }
        write!(f, "({})", self.value)
    }
}

/// The identity occupying a seat: display name plus the opaque channel
/// key the server uses to address that connection. The channel key is
/// what self-echo suppression matches against.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Occupant {
    pub username: String,
    pub channel: String,
}

/// One of the table's 3 fixed positions.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Seat {
    pub occupant: Option<Occupant>,
    pub dollars: Usd,
    pub bet: Usd,
    pub hand: Hand,
    pub outcome: Outcome,
    pub win_loss: Usd,
}

impl Seat {
    pub fn is_occupied(&self) -> bool {
        self.occupant.is_some()
    }

    pub fn occupy(&mut self, occupant: Occupant, dollars: Usd) {
        self.occupant = Some(occupant);
        self.dollars = dollars;
        self.bet = 0;
        self.hand.reset();
        self.outcome = Outcome::Pending;
        self.win_loss = 0;
    }

    pub fn vacate(&mut self) {
        *self = Self::default();
    }

    /// Largest bet the seat can place, used by the max-bet shortcut.
    pub fn max_bet(&self) -> Usd {
        self.dollars
    }

    /// Clear per-round fields when a new betting round opens.
    pub fn reset_for_round(&mut self) {
        self.bet = 0;
        self.hand.reset();
        self.outcome = Outcome::Pending;
        self.win_loss = 0;
    }
}

/// The dealer's hand. The first card stays face-down from the initial
/// deal until the dealer's final turn.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Dealer {
    pub hand: Hand,
    pub blackjack: bool,
    pub hole_card_hidden: bool,
}

impl Dealer {
    pub fn reset(&mut self) {
        self.hand.reset();
        self.blackjack = false;
        self.hole_card_hidden = false;
    }
}

/// Stage of the round lifecycle.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Phase {
    /// Table open, no round played yet.
    #[default]
    LobbyWait,
    /// Round open, seats may place bets.
    Betting,
    /// Initial two-card deal just landed.
    Dealing,
    /// Turn pointer advances seat by seat.
    PlayerTurns,
    /// Dealer is resolving their hand.
    DealerTurn,
    /// Outcomes shown, waiting on the creator to restart.
    RoundSettled,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::LobbyWait => "lobby wait",
            Self::Betting => "betting",
            Self::Dealing => "dealing",
            Self::PlayerTurns => "player turns",
            Self::DealerTurn => "dealer turn",
            Self::RoundSettled => "round settled",
        };
        write!(f, "{repr}")
    }
}

/// One chat line. Append-only; retention is a view concern.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ChatLine {
    pub author: String,
    pub text: String,
}

/// Canonical per-table state as mirrored from the server.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct TableState {
    pub seats: [Seat; TABLE_SEATS],
    pub dealer: Dealer,
    pub phase: Phase,
    /// Only meaningful during [`Phase::PlayerTurns`].
    pub current_turn: Option<SeatIndex>,
    pub chat: Vec<ChatLine>,
}

impl TableState {
    pub fn seat(&self, idx: SeatIndex) -> &Seat {
        &self.seats[idx]
    }

    pub fn occupied_seats(&self) -> impl Iterator<Item = (SeatIndex, &Seat)> {
        self.seats
            .iter()
            .enumerate()
            .filter(|(_, seat)| seat.is_occupied())
    }

    pub fn push_chat(&mut self, author: String, text: String) {
        self.chat.push(ChatLine { author, text });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_card_display() {
        let card = Card {
            suit: Suit::Spades,
            num: Num::Ace,
        };
        assert_eq!(card.to_string().trim(), "A/♠");
    }

    #[test]
    fn test_card_wire_shape() {
        let card = Card {
            suit: Suit::Diamonds,
            num: Num::Ten,
        };
        let json = serde_json::to_string(&card).unwrap();
        assert_eq!(json, r#"{"suit":"diams","num":"10"}"#);
    }

    #[test]
    fn test_card_decode_ignores_extra_value_field() {
        let card: Card =
            serde_json::from_str(r#"{"suit":"hearts","num":"K","value":10}"#).unwrap();
        assert_eq!(card.suit, Suit::Hearts);
        assert_eq!(card.num, Num::King);
    }

    #[test]
    fn test_outcome_wire_names() {
        assert_eq!(serde_json::to_string(&Outcome::Pending).unwrap(), r#""na""#);
        assert_eq!(serde_json::to_string(&Outcome::Win).unwrap(), r#""win""#);
        let outcome: Outcome = serde_json::from_str(r#""push""#).unwrap();
        assert_eq!(outcome, Outcome::Push);
    }

    #[test]
    fn test_hand_reset_clears_everything() {
        let mut hand = Hand::new(
            vec![Card {
                suit: Suit::Clubs,
                num: Num::Five,
            }],
            5,
        );
        hand.mark_blackjack();
        hand.reset();
        assert!(hand.is_empty());
        assert_eq!(hand.value(), 0);
        assert!(!hand.is_blackjack());
    }

    #[test]
    fn test_seat_occupy_and_vacate() {
        let mut seat = Seat::default();
        assert!(!seat.is_occupied());
        seat.occupy(
            Occupant {
                username: "alice".into(),
                channel: "chan.1".into(),
            },
            DEFAULT_DOLLARS,
        );
        assert!(seat.is_occupied());
        assert_eq!(seat.max_bet(), DEFAULT_DOLLARS);
        seat.vacate();
        assert!(!seat.is_occupied());
        assert_eq!(seat.dollars, 0);
    }
}
