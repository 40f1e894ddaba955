use serde::{Deserialize, Serialize};
use std::fmt;

use crate::cards::Card;
use crate::hand::Hand;
use crate::rules::Outcome;

/// A decision the player can make while it is their turn.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerAction {
    /// Take one more card
    Hit,
    /// Keep the current total and pass to the next hand or the dealer
    Stand,
    /// Double the bet, take exactly one card, then stand
    DoubleDown,
    /// Give up the round for half the bet back
    Surrender,
    /// Play a pair as two hands with an equal second bet
    Split,
}

impl fmt::Display for PlayerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PlayerAction::Hit => "hit",
            PlayerAction::Stand => "stand",
            PlayerAction::DoubleDown => "double down",
            PlayerAction::Surrender => "surrender",
            PlayerAction::Split => "split",
        };
        f.write_str(name)
    }
}

/// One wagered hand on the player's side of the table. A round has one of
/// these, or two after a split.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerHand {
    pub hand: Hand,
    pub bet: u64,
    pub doubled: bool,
    pub from_split: bool,
    /// Set once the hand takes its first hit.
    pub hit: bool,
    /// No further cards will be dealt to this hand.
    pub finished: bool,
    pub outcome: Option<Outcome>,
    pub payout: u64,
}

impl PlayerHand {
    pub fn new(cards: impl Into<Vec<Card>>, bet: u64) -> Self {
        Self {
            hand: Hand::from_cards(cards),
            bet,
            doubled: false,
            from_split: false,
            hit: false,
            finished: false,
            outcome: None,
            payout: 0,
        }
    }

    pub(crate) fn split_from(first: Card, second: Card, bet: u64) -> Self {
        Self {
            from_split: true,
            ..Self::new(vec![first, second], bet)
        }
    }

    pub fn cards(&self) -> &[Card] {
        self.hand.cards()
    }

    pub fn value(&self) -> u32 {
        self.hand.value()
    }

    pub fn is_bust(&self) -> bool {
        self.hand.is_bust()
    }

    /// Still holding the two opening cards with no hit or double taken.
    pub fn is_untouched(&self) -> bool {
        self.hand.len() == 2 && !self.hit && !self.doubled
    }

    pub(crate) fn close(&mut self, outcome: Outcome) {
        self.finished = true;
        self.outcome = Some(outcome);
        self.payout = outcome.payout(self.bet);
    }
}
