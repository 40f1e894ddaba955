use std::collections::HashSet;

use blackjack_engine::engine::Engine;
use blackjack_engine::game::Phase;
use blackjack_engine::player::PlayerAction;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

const ACTIONS: [PlayerAction; 5] = [
    PlayerAction::Hit,
    PlayerAction::Stand,
    PlayerAction::DoubleDown,
    PlayerAction::Surrender,
    PlayerAction::Split,
];

fn cards_in_play(engine: &Engine) -> usize {
    let player: usize = engine.player_hands().iter().map(|h| h.cards().len()).sum();
    player + engine.dealer_hand().len()
}

fn assert_cards_unique(engine: &Engine) {
    let mut seen = HashSet::new();
    for card in engine
        .player_hands()
        .iter()
        .flat_map(|h| h.cards())
        .chain(engine.dealer_hand().cards())
    {
        assert!(seen.insert(*card), "card {card} dealt twice");
    }
    assert_eq!(cards_in_play(engine) + engine.deck_remaining(), 52);
}

#[test]
fn random_play_conserves_chips() {
    for seed in 0..200u64 {
        let mut engine = Engine::new(1000, Some(seed));
        let mut rng = ChaCha8Rng::seed_from_u64(seed ^ 0x5eed);

        for _ in 0..25 {
            if engine.bank() == 0 {
                break;
            }
            let before = engine.bank();
            let bet = rng.random_range(1..=before.min(200));
            engine.place_bet(bet).unwrap();
            engine.deal().unwrap();
            assert_cards_unique(&engine);

            for _ in 0..40 {
                if engine.phase() != Phase::PlayerTurn {
                    break;
                }
                let action = ACTIONS[rng.random_range(0..ACTIONS.len())];
                let snapshot = engine.view(usize::MAX);
                let remaining = engine.deck_remaining();
                if engine.act(action).is_err() {
                    assert_eq!(
                        engine.view(usize::MAX),
                        snapshot,
                        "seed {seed}: {action} mutated state"
                    );
                    assert_eq!(engine.deck_remaining(), remaining);
                }
                assert_cards_unique(&engine);
            }
            if engine.phase() == Phase::PlayerTurn {
                engine.stand().unwrap();
            }

            assert_eq!(engine.phase(), Phase::Resolved, "seed {seed}");
            let round = engine.last_round().unwrap();
            assert_eq!(
                engine.bank(),
                before - round.bet + round.payout,
                "seed {seed}: bank does not match round {}",
                round.round_id
            );
            assert_eq!(engine.current_bet(), 0);
            assert!(round.payout <= round.bet * 5 / 2);
        }

        let net: i64 = engine.history().rounds().iter().map(|r| r.net()).sum();
        assert_eq!(engine.bank() as i64, 1000 + net, "seed {seed}");
        assert_eq!(engine.history().net(), net);
    }
}
