use serde::{Deserialize, Serialize};
use std::fmt;

use crate::cards::Card;
use crate::ledger::Cashout;
use crate::logger::RoundRecord;
use crate::player::{PlayerAction, PlayerHand};
use crate::rules::Outcome;

/// Where the current round stands. Ordered so that `phase >= DealerTurn`
/// means the dealer's hole card is public.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// No chips on the table
    Idle,
    /// A bet is being built up but no cards are out
    Betting,
    /// Cards are out; naturals not yet checked
    Dealt,
    /// Waiting for the player to act on the active hand
    PlayerTurn,
    /// The dealer is drawing
    DealerTurn,
    /// Payouts credited; the next bet starts a new round
    Resolved,
}

impl Phase {
    /// Bets and cash-outs are only accepted while no cards are live.
    pub fn is_between_rounds(self) -> bool {
        matches!(self, Phase::Idle | Phase::Betting | Phase::Resolved)
    }

    pub fn dealer_revealed(self) -> bool {
        self >= Phase::DealerTurn
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Idle => "idle",
            Phase::Betting => "betting",
            Phase::Dealt => "dealt",
            Phase::PlayerTurn => "player_turn",
            Phase::DealerTurn => "dealer_turn",
            Phase::Resolved => "resolved",
        };
        f.write_str(name)
    }
}

/// Every state-machine transition, used to report which one was refused.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    PlaceBet,
    ClearBet,
    Deal,
    Player(PlayerAction),
    CashOut,
}

impl From<PlayerAction> for Action {
    fn from(action: PlayerAction) -> Self {
        Action::Player(action)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::PlaceBet => f.write_str("place a bet"),
            Action::ClearBet => f.write_str("clear the bet"),
            Action::Deal => f.write_str("deal"),
            Action::Player(action) => write!(f, "{action}"),
            Action::CashOut => f.write_str("cash out"),
        }
    }
}

/// Dealer cards as a player may see them. Before the dealer's turn the hole
/// card is `None` and the total is withheld.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DealerView {
    pub cards: Vec<Option<Card>>,
    pub value: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandView {
    pub cards: Vec<Card>,
    pub value: u32,
    pub bet: u64,
    pub doubled: bool,
    pub finished: bool,
    pub outcome: Option<Outcome>,
}

impl From<&PlayerHand> for HandView {
    fn from(hand: &PlayerHand) -> Self {
        Self {
            cards: hand.cards().to_vec(),
            value: hand.value(),
            bet: hand.bet,
            doubled: hand.doubled,
            finished: hand.finished,
            outcome: hand.outcome,
        }
    }
}

/// Player-safe snapshot of a whole game: what the status query returns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableView {
    pub phase: Phase,
    pub bank: u64,
    pub current_bet: u64,
    pub player_hands: Vec<HandView>,
    pub active_hand: Option<usize>,
    pub dealer_hand: DealerView,
    pub dealer_turn: bool,
    /// Newest first.
    pub history: Vec<RoundRecord>,
    /// Sum of payout minus bet over every recorded round.
    pub net: i64,
    pub cashouts: Vec<Cashout>,
}
