use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

use crate::cards::{full_deck, Card};
use crate::errors::GameError;

/// A single 52-card deck dealt from the top (the end of the vector).
///
/// A fresh permutation is produced for every round by [`Deck::shuffle`]. The
/// shuffle only has to be uniform, so a seeded ChaCha stream is used; a
/// real-money table would swap in a vetted RNG here.
#[derive(Debug, Clone)]
pub struct Deck {
    cards: Vec<Card>,
    rng: ChaCha20Rng,
    // Deal order restored on every shuffle instead of a random permutation.
    preset: Option<Vec<Card>>,
}

impl Deck {
    pub fn new_with_seed(seed: u64) -> Self {
        let rng = ChaCha20Rng::seed_from_u64(seed);
        // Keep initial order until shuffle is called explicitly
        Self {
            cards: full_deck(),
            rng,
            preset: None,
        }
    }

    /// Seeds from the thread RNG. The seed is returned so a round can be
    /// replayed from logs.
    pub fn from_entropy() -> (Self, u64) {
        let seed: u64 = rand::random();
        (Self::new_with_seed(seed), seed)
    }

    /// A deck that deals `first` in the given order, followed by the remaining
    /// cards of a standard deck in canonical order. Every shuffle restores the
    /// same order. `first` must not contain duplicates.
    pub fn stacked(first: Vec<Card>) -> Self {
        let mut order = first.clone();
        order.extend(full_deck().into_iter().filter(|c| !first.contains(c)));
        // drawn from the end
        order.reverse();
        Self {
            cards: order.clone(),
            rng: ChaCha20Rng::seed_from_u64(0),
            preset: Some(order),
        }
    }

    /// Replaces the remaining cards with a freshly permuted full deck.
    pub fn shuffle(&mut self) {
        match &self.preset {
            Some(order) => self.cards = order.clone(),
            None => {
                self.cards = full_deck();
                self.cards.shuffle(&mut self.rng);
            }
        }
    }

    /// Removes and returns the top card.
    pub fn draw(&mut self) -> Result<Card, GameError> {
        self.cards.pop().ok_or(GameError::DeckExhausted)
    }

    pub fn remaining(&self) -> usize {
        self.cards.len()
    }

    pub fn is_stacked(&self) -> bool {
        self.preset.is_some()
    }
}
