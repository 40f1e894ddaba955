mod common;

use blackjack_engine::cards::Rank::*;
use blackjack_engine::errors::GameError;
use blackjack_engine::game::{Action, Phase};
use blackjack_engine::player::PlayerAction;
use blackjack_engine::rules::Outcome;

use common::dealt;

fn illegal(action: PlayerAction, phase: Phase) -> Result<(), GameError> {
    Err(GameError::IllegalTransition {
        action: Action::Player(action),
        phase,
    })
}

#[test]
fn double_down_doubles_bet_and_takes_one_card() {
    // player 5 6, dealer 10 7, double draws 10
    let mut engine = dealt(1000, 100, &[Five, Ten, Six, Seven, Ten]);
    engine.double_down().expect("double");

    assert_eq!(engine.phase(), Phase::Resolved);
    let hand = &engine.player_hands()[0];
    assert!(hand.doubled);
    assert_eq!(hand.cards().len(), 3);
    assert_eq!(hand.bet, 200);
    assert_eq!(engine.bank(), 1200);

    let round = engine.last_round().unwrap();
    assert_eq!((round.bet, round.payout, round.outcome), (200, 400, Outcome::Win));
}

#[test]
fn double_down_stands_even_on_a_low_total() {
    let mut engine = dealt(1000, 100, &[Two, Ten, Three, Seven, Two]);
    engine.double_down().unwrap();
    assert_eq!(engine.player_hands()[0].value(), 7);
    assert_eq!(engine.phase(), Phase::Resolved);
    assert_eq!(engine.bank(), 800);
}

#[test]
fn double_down_bust_skips_dealer_draw() {
    let mut engine = dealt(1000, 100, &[Ten, Ten, Six, Six, Nine]);
    engine.double_down().unwrap();
    assert_eq!(engine.dealer_hand().len(), 2);
    assert_eq!(engine.bank(), 800);
    assert_eq!(engine.last_round().unwrap().outcome, Outcome::Loss);
}

#[test]
fn double_down_after_hit_is_illegal() {
    let mut engine = dealt(1000, 100, &[Two, Ten, Three, Seven, Two]);
    engine.hit().unwrap();
    assert_eq!(
        engine.double_down(),
        illegal(PlayerAction::DoubleDown, Phase::PlayerTurn)
    );
    assert_eq!(engine.bank(), 900);
    assert_eq!(engine.player_hands()[0].bet, 100);
}

#[test]
fn double_down_needs_matching_funds() {
    let mut engine = dealt(150, 100, &[Five, Ten, Six, Seven, Ten]);
    assert_eq!(
        engine.double_down(),
        Err(GameError::InsufficientFunds {
            requested: 100,
            available: 50
        })
    );
    assert_eq!(engine.phase(), Phase::PlayerTurn);
    assert_eq!(engine.player_hands()[0].cards().len(), 2);
}

#[test]
fn surrender_refunds_half_the_bet() {
    let mut engine = dealt(1000, 100, &[Ten, Ten, Six, Seven]);
    engine.surrender().unwrap();
    assert_eq!(engine.phase(), Phase::Resolved);
    assert_eq!(engine.bank(), 950);
    assert_eq!(engine.dealer_hand().len(), 2);

    let round = engine.last_round().unwrap();
    assert_eq!((round.outcome, round.payout), (Outcome::Surrender, 50));
}

#[test]
fn surrender_rounds_odd_refunds_down() {
    let mut engine = dealt(1000, 25, &[Ten, Ten, Six, Seven]);
    engine.surrender().unwrap();
    assert_eq!(engine.bank(), 1000 - 25 + 12);
}

#[test]
fn surrender_after_hit_is_illegal() {
    let mut engine = dealt(1000, 100, &[Two, Ten, Three, Seven, Two]);
    engine.hit().unwrap();
    assert_eq!(
        engine.surrender(),
        illegal(PlayerAction::Surrender, Phase::PlayerTurn)
    );
}

#[test]
fn split_plays_two_hands_in_order() {
    // 8 8 vs 10 7; split hands get 3 and 2, then hit 10 each
    let mut engine = dealt(1000, 100, &[Eight, Ten, Eight, Seven, Three, Two, Ten, Ten]);
    engine.split().expect("split");

    assert_eq!(engine.bank(), 800);
    assert_eq!(engine.current_bet(), 200);
    assert_eq!(engine.player_hands().len(), 2);
    assert_eq!(engine.active_hand(), Some(0));
    assert_eq!(engine.player_hands()[0].value(), 11);
    assert_eq!(engine.player_hands()[1].value(), 10);

    engine.hit().unwrap();
    assert_eq!(engine.player_hands()[0].value(), 21);
    assert_eq!(engine.active_hand(), Some(1), "21 moves play to the next hand");

    engine.hit().unwrap();
    assert_eq!(engine.player_hands()[1].value(), 20);
    engine.stand().unwrap();

    assert_eq!(engine.phase(), Phase::Resolved);
    assert_eq!(engine.bank(), 1200);
    let round = engine.last_round().unwrap();
    assert_eq!((round.bet, round.payout, round.outcome), (200, 400, Outcome::Win));
    assert_eq!(round.player_hands.len(), 2);
}

#[test]
fn split_with_one_win_and_one_loss_is_a_push_overall() {
    let mut engine = dealt(1000, 100, &[Eight, Ten, Eight, Seven, Ten, Two, Five]);
    engine.split().unwrap();
    assert_eq!(engine.player_hands()[0].value(), 18);
    engine.stand().unwrap();
    engine.hit().unwrap();
    assert_eq!(engine.player_hands()[1].value(), 15);
    engine.stand().unwrap();

    let hands = engine.player_hands();
    assert_eq!(hands[0].outcome, Some(Outcome::Win));
    assert_eq!(hands[1].outcome, Some(Outcome::Loss));
    assert_eq!(engine.bank(), 1000);
    assert_eq!(engine.last_round().unwrap().outcome, Outcome::Push);
}

#[test]
fn dealer_skips_drawing_when_every_split_hand_busts() {
    let mut engine = dealt(1000, 100, &[Eight, Ten, Eight, Six, Six, Five, Ten, Ten]);
    engine.split().unwrap();
    engine.hit().unwrap();
    assert!(engine.player_hands()[0].is_bust());
    engine.hit().unwrap();
    assert!(engine.player_hands()[1].is_bust());

    assert_eq!(engine.phase(), Phase::Resolved);
    assert_eq!(engine.dealer_hand().len(), 2);
    assert_eq!(engine.bank(), 800);
    assert_eq!(engine.last_round().unwrap().payout, 0);
}

#[test]
fn split_twenty_one_is_not_blackjack() {
    // A A vs 10 7; first hand gets K, second gets 9
    let mut engine = dealt(1000, 100, &[Ace, Ten, Ace, Seven, King, Nine]);
    engine.split().unwrap();
    assert_eq!(engine.active_hand(), Some(1), "first hand already on 21");
    engine.stand().unwrap();

    let hands = engine.player_hands();
    assert_eq!(hands[0].outcome, Some(Outcome::Win));
    assert_eq!(hands[0].payout, 200);
    assert_eq!(engine.bank(), 1200);
}

#[test]
fn double_after_split_is_allowed() {
    let mut engine = dealt(1000, 100, &[Eight, Ten, Eight, Seven, Three, Two, Ten, Ten]);
    engine.split().unwrap();
    engine.double_down().unwrap();
    assert_eq!(engine.bank(), 700);
    assert_eq!(engine.player_hands()[0].bet, 200);
    assert_eq!(engine.active_hand(), Some(1));
    engine.stand().unwrap();

    // 21 on the doubled hand wins 400, 10 loses
    assert_eq!(engine.bank(), 1100);
    let round = engine.last_round().unwrap();
    assert_eq!((round.bet, round.payout, round.outcome), (300, 400, Outcome::Win));
}

#[test]
fn split_rules() {
    let mut engine = dealt(1000, 100, &[King, Ten, Queen, Seven]);
    assert_eq!(engine.split(), illegal(PlayerAction::Split, Phase::PlayerTurn));

    let mut engine = dealt(150, 100, &[Eight, Ten, Eight, Seven]);
    assert_eq!(
        engine.split(),
        Err(GameError::InsufficientFunds {
            requested: 100,
            available: 50
        })
    );
    assert_eq!(engine.player_hands().len(), 1);

    let mut engine = dealt(1000, 100, &[Eight, Ten, Eight, Seven, Eight, Two]);
    engine.split().unwrap();
    assert_eq!(
        engine.split(),
        illegal(PlayerAction::Split, Phase::PlayerTurn),
        "no resplitting"
    );
    assert_eq!(
        engine.surrender(),
        illegal(PlayerAction::Surrender, Phase::PlayerTurn)
    );
}
