/// Requests racing on one session must be applied one at a time; different
/// sessions must not interfere.
use blackjack_engine::game::Phase;
use blackjack_web::server::AppContext;
use blackjack_web::session::{SessionError, SessionManager};
use blackjack_web::GameSettings;
use std::collections::HashSet;
use std::sync::{Arc, Barrier};
use std::thread;
use tokio::task::JoinSet;

/// Bets and deals until the player has a decision to make.
fn session_on_player_turn(manager: &SessionManager) -> String {
    let id = manager.create_session().expect("create session").session_id;
    loop {
        manager.place_bet(&id, 10).expect("bet");
        if manager.deal(&id).expect("deal").phase == Phase::PlayerTurn {
            return id;
        }
    }
}

#[test]
fn concurrent_hits_on_one_session_are_serialized() {
    for seed in 0..20u64 {
        let manager = Arc::new(SessionManager::new(GameSettings {
            seed: Some(seed),
            ..GameSettings::default()
        }));
        let id = session_on_player_turn(&manager);
        let before = manager.status(&id).unwrap().table;

        let threads = 8;
        let barrier = Arc::new(Barrier::new(threads));
        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let manager = Arc::clone(&manager);
                let barrier = Arc::clone(&barrier);
                let id = id.clone();
                thread::spawn(move || {
                    barrier.wait();
                    manager.hit(&id)
                })
            })
            .collect();

        let mut applied = 0;
        for handle in handles {
            match handle.join().expect("thread panicked") {
                Ok(_) => applied += 1,
                Err(SessionError::Game(_)) => {}
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        let after = manager.status(&id).unwrap().table;
        let hand = &after.player_hands[0];
        assert_eq!(hand.cards.len(), 2 + applied, "seed {seed}: one card per applied hit");

        let unique: HashSet<_> = hand.cards.iter().collect();
        assert_eq!(unique.len(), hand.cards.len(), "seed {seed}: no card dealt twice");

        match after.phase {
            Phase::PlayerTurn => assert_eq!(after.bank, before.bank),
            Phase::Resolved => {
                let round = &after.history[0];
                assert_eq!(after.bank, before.bank + round.payout, "seed {seed}");
            }
            other => panic!("seed {seed}: unexpected phase {other}"),
        }
    }
}

#[test]
fn concurrent_bets_accumulate_exactly() {
    let manager = Arc::new(SessionManager::new(GameSettings::default()));
    let id = manager.create_session().unwrap().session_id;

    let handles: Vec<_> = (0..10)
        .map(|_| {
            let manager = Arc::clone(&manager);
            let id = id.clone();
            thread::spawn(move || manager.place_bet(&id, 150))
        })
        .collect();
    let accepted = handles
        .into_iter()
        .map(|h| h.join().expect("thread panicked"))
        .filter(Result::is_ok)
        .count();

    // 1000 chips cover six bets of 150
    assert_eq!(accepted, 6);
    assert_eq!(manager.status(&id).unwrap().table.current_bet, 900);
}

#[tokio::test]
async fn sessions_play_independently() {
    let context = Arc::new(AppContext::new_for_tests());
    let mut join_set = JoinSet::new();

    for _ in 0..10 {
        let ctx = Arc::clone(&context);
        join_set.spawn(async move {
            let sessions = ctx.sessions();
            let id = sessions.create_session().expect("create session").session_id;
            for _ in 0..5 {
                sessions.place_bet(&id, 20).expect("bet");
                let dealt = sessions.deal(&id).expect("deal");
                if dealt.phase == Phase::PlayerTurn {
                    sessions.stand(&id).expect("stand");
                }
            }
            id
        });
    }

    let mut ids = HashSet::new();
    while let Some(result) = join_set.join_next().await {
        ids.insert(result.expect("task completed"));
    }
    assert_eq!(ids.len(), 10);

    for id in &ids {
        let status = context.sessions().status(id).expect("status");
        assert_eq!(status.table.history.len(), 5);
        let net: i64 = status.table.net;
        assert_eq!(status.table.bank as i64, 1000 + net);
    }
}
