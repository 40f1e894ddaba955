use serde::{Deserialize, Serialize};

use crate::cards::{Card, Rank};

/// Best blackjack total for `cards`.
///
/// Every ace starts at 11; while the total is over 21 and an ace is still
/// counted high, one ace is reduced to 1. The result may exceed 21 (bust).
pub fn hand_value(cards: &[Card]) -> u32 {
    let (total, _) = total_and_soft_aces(cards);
    total
}

/// True while at least one ace is still counted as 11.
pub fn is_soft(cards: &[Card]) -> bool {
    let (_, soft_aces) = total_and_soft_aces(cards);
    soft_aces > 0
}

/// A natural: exactly two cards worth 21.
pub fn is_blackjack(cards: &[Card]) -> bool {
    cards.len() == 2 && hand_value(cards) == 21
}

pub fn is_bust(cards: &[Card]) -> bool {
    hand_value(cards) > 21
}

fn total_and_soft_aces(cards: &[Card]) -> (u32, u32) {
    let mut total: u32 = cards.iter().map(|c| c.rank.value()).sum();
    let mut soft_aces = cards.iter().filter(|c| c.rank == Rank::Ace).count() as u32;
    while total > 21 && soft_aces > 0 {
        total -= 10;
        soft_aces -= 1;
    }
    (total, soft_aces)
}

/// An ordered run of cards held by the player or the dealer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Hand {
    cards: Vec<Card>,
}

impl Hand {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_cards(cards: impl Into<Vec<Card>>) -> Self {
        Self {
            cards: cards.into(),
        }
    }

    pub fn push(&mut self, card: Card) {
        self.cards.push(card);
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn value(&self) -> u32 {
        hand_value(&self.cards)
    }

    pub fn is_soft(&self) -> bool {
        is_soft(&self.cards)
    }

    pub fn is_blackjack(&self) -> bool {
        is_blackjack(&self.cards)
    }

    pub fn is_bust(&self) -> bool {
        is_bust(&self.cards)
    }

    /// Two cards of the same rank. Ten-valued cards of different ranks
    /// (e.g. K and Q) are not a pair.
    pub fn is_pair(&self) -> bool {
        matches!(self.cards.as_slice(), [a, b] if a.rank == b.rank)
    }
}
