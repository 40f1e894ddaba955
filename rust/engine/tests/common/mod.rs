#![allow(dead_code)]

use blackjack_engine::cards::{Card, Rank, Suit};
use blackjack_engine::deck::Deck;
use blackjack_engine::engine::Engine;

/// Builds a deck that deals `ranks` in order (player, dealer, player, dealer,
/// then every later draw). Repeated ranks get distinct suits.
pub fn stacked(ranks: &[Rank]) -> Deck {
    let suits = [Suit::Spades, Suit::Hearts, Suit::Clubs, Suit::Diamonds];
    let mut seen: Vec<Rank> = Vec::new();
    let cards = ranks
        .iter()
        .map(|&rank| {
            let n = seen.iter().filter(|&&r| r == rank).count();
            seen.push(rank);
            Card::new(rank, suits[n])
        })
        .collect();
    Deck::stacked(cards)
}

/// Engine with `bank` chips, `bet` placed and the stacked cards dealt.
pub fn dealt(bank: u64, bet: u64, ranks: &[Rank]) -> Engine {
    let mut engine = Engine::with_deck(bank, stacked(ranks));
    engine.place_bet(bet).expect("place bet");
    engine.deal().expect("deal");
    engine
}
