mod common;

use blackjack_engine::cards::Rank::*;
use blackjack_engine::engine::Engine;
use blackjack_engine::game::Phase;
use blackjack_engine::rules::Outcome;

use common::stacked;

fn play_rounds(engine: &mut Engine, rounds: usize) {
    for _ in 0..rounds {
        engine.place_bet(100).unwrap();
        engine.deal().unwrap();
        if engine.phase() == Phase::PlayerTurn {
            engine.stand().unwrap();
        }
    }
}

#[test]
fn every_resolved_round_is_recorded_in_order() {
    let mut engine = Engine::with_deck(1000, stacked(&[King, Ten, Nine, Seven]));
    play_rounds(&mut engine, 3);

    let rounds = engine.history().rounds();
    assert_eq!(rounds.len(), 3);
    let ids: Vec<&str> = rounds.iter().map(|r| r.round_id.as_str()).collect();
    assert!(ids[0].ends_with("-000001"));
    assert!(ids[2].ends_with("-000003"));
    assert!(rounds.iter().all(|r| r.outcome == Outcome::Win));
    assert_eq!(engine.history().net(), 300);
    assert_eq!(engine.bank(), 1300);
}

#[test]
fn records_are_not_rewritten_by_later_rounds() {
    let mut engine = Engine::with_deck(1000, stacked(&[King, Ten, Nine, Seven]));
    play_rounds(&mut engine, 1);
    let first = engine.history().rounds()[0].clone();

    play_rounds(&mut engine, 4);
    assert_eq!(engine.history().rounds()[0], first);
    assert_eq!(first.player_hands[0].value(), 19);
    assert_eq!(first.dealer_hand.value(), 17);
}

#[test]
fn status_history_is_newest_first_and_capped() {
    let mut engine = Engine::with_deck(10_000, stacked(&[King, Ten, Nine, Seven]));
    play_rounds(&mut engine, 25);

    let view = engine.view(20);
    assert_eq!(view.history.len(), 20);
    assert!(view.history[0].round_id.ends_with("-000025"));
    assert!(view.history[19].round_id.ends_with("-000006"));
    assert_eq!(view.net, 2500, "net covers every round, not just the visible ones");
    assert_eq!(engine.history().len(), 25);
}

#[test]
fn natural_rounds_are_recorded_on_deal() {
    let mut engine = Engine::with_deck(1000, stacked(&[Ace, Ten, King, Seven]));
    engine.place_bet(50).unwrap();
    engine.deal().unwrap();
    assert_eq!(engine.history().len(), 1);

    // the stacked deck deals the same natural again
    engine.place_bet(50).unwrap();
    engine.deal().unwrap();
    assert_eq!(engine.history().len(), 2);
    assert_eq!(engine.bank(), 1150);
}
