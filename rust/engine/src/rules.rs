use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::cards::Card;
use crate::hand::{hand_value, is_blackjack};

pub const BLACKJACK: u32 = 21;
/// The dealer draws while below this total and stands on any 17, soft or hard.
pub const DEALER_STANDS_ON: u32 = 17;

/// Result of one player hand against the dealer.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Win,
    Loss,
    Push,
    Blackjack,
    Surrender,
}

impl Outcome {
    /// Amount credited back to the bank for a hand that wagered `bet`.
    /// The bet itself was debited when it was placed on the table.
    ///
    /// ```
    /// use blackjack_engine::rules::Outcome;
    ///
    /// assert_eq!(Outcome::Win.payout(100), 200);
    /// assert_eq!(Outcome::Blackjack.payout(50), 125);
    /// assert_eq!(Outcome::Blackjack.payout(25), 62);
    /// assert_eq!(Outcome::Push.payout(40), 40);
    /// assert_eq!(Outcome::Surrender.payout(25), 12);
    /// assert_eq!(Outcome::Loss.payout(100), 0);
    /// ```
    pub fn payout(self, bet: u64) -> u64 {
        match self {
            Outcome::Win => bet.saturating_mul(2),
            Outcome::Loss => 0,
            Outcome::Push => bet,
            // 3:2, rounded down
            Outcome::Blackjack => bet.saturating_mul(5) / 2,
            Outcome::Surrender => bet / 2,
        }
    }
}

pub fn dealer_should_hit(dealer: &[Card]) -> bool {
    hand_value(dealer) < DEALER_STANDS_ON
}

/// Outcome decided by the first four cards, if any.
pub fn natural_outcome(player: &[Card], dealer: &[Card]) -> Option<Outcome> {
    match (is_blackjack(player), is_blackjack(dealer)) {
        (true, true) => Some(Outcome::Push),
        (true, false) => Some(Outcome::Blackjack),
        (false, true) => Some(Outcome::Loss),
        (false, false) => None,
    }
}

/// Settles a finished player hand against the dealer's final hand.
pub fn settle(player: &[Card], dealer: &[Card]) -> Outcome {
    let player_value = hand_value(player);
    if player_value > BLACKJACK {
        return Outcome::Loss;
    }
    let dealer_value = hand_value(dealer);
    if dealer_value > BLACKJACK {
        return Outcome::Win;
    }
    match player_value.cmp(&dealer_value) {
        Ordering::Greater => Outcome::Win,
        Ordering::Less => Outcome::Loss,
        Ordering::Equal => Outcome::Push,
    }
}

/// Single label for a round played as several hands.
pub fn aggregate_outcome(total_bet: u64, total_payout: u64) -> Outcome {
    match total_payout.cmp(&total_bet) {
        Ordering::Greater => Outcome::Win,
        Ordering::Equal => Outcome::Push,
        Ordering::Less => Outcome::Loss,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::{Rank, Suit};

    fn cards(ranks: &[Rank]) -> Vec<Card> {
        ranks.iter().map(|&r| Card::new(r, Suit::Diamonds)).collect()
    }

    #[test]
    fn dealer_stands_on_soft_seventeen() {
        assert!(!dealer_should_hit(&cards(&[Rank::Ace, Rank::Six])));
        assert!(dealer_should_hit(&cards(&[Rank::Ten, Rank::Six])));
    }

    #[test]
    fn busted_player_loses_even_if_dealer_busts() {
        let player = cards(&[Rank::Ten, Rank::Nine, Rank::Five]);
        let dealer = cards(&[Rank::Ten, Rank::Six, Rank::King]);
        assert_eq!(settle(&player, &dealer), Outcome::Loss);
    }

    #[test]
    fn settle_compares_totals() {
        let nineteen = cards(&[Rank::King, Rank::Nine]);
        let seventeen = cards(&[Rank::Ten, Rank::Seven]);
        assert_eq!(settle(&nineteen, &seventeen), Outcome::Win);
        assert_eq!(settle(&seventeen, &nineteen), Outcome::Loss);
        assert_eq!(settle(&seventeen, &seventeen), Outcome::Push);
    }

    #[test]
    fn naturals_are_checked_for_both_sides() {
        let natural = cards(&[Rank::Ace, Rank::King]);
        let twenty = cards(&[Rank::Queen, Rank::Jack]);
        assert_eq!(natural_outcome(&natural, &natural), Some(Outcome::Push));
        assert_eq!(natural_outcome(&natural, &twenty), Some(Outcome::Blackjack));
        assert_eq!(natural_outcome(&twenty, &natural), Some(Outcome::Loss));
        assert_eq!(natural_outcome(&twenty, &twenty), None);
    }

    #[test]
    fn aggregate_uses_net_result() {
        assert_eq!(aggregate_outcome(200, 200), Outcome::Push);
        assert_eq!(aggregate_outcome(200, 400), Outcome::Win);
        assert_eq!(aggregate_outcome(200, 0), Outcome::Loss);
    }
}
