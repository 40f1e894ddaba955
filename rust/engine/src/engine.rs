use chrono::Utc;
use tracing::{debug, error};

use crate::deck::Deck;
use crate::errors::GameError;
use crate::game::{Action, DealerView, HandView, Phase, TableView};
use crate::hand::Hand;
use crate::ledger::{CashoutId, CashoutStatus, Ledger};
use crate::logger::{format_round_id, RoundLog, RoundRecord};
use crate::player::{PlayerAction, PlayerHand};
use crate::rules::{
    aggregate_outcome, dealer_should_hit, natural_outcome, settle, Outcome, BLACKJACK,
};

/// Round state machine for a single player against the dealer.
///
/// Every transition is applied to a staged copy of the table and committed
/// only when it succeeds, so a rejected action never debits the bank or
/// consumes a card.
///
/// # Examples
///
/// ```
/// use blackjack_engine::cards::{Card, Rank, Suit};
/// use blackjack_engine::deck::Deck;
/// use blackjack_engine::engine::Engine;
/// use blackjack_engine::game::Phase;
/// use blackjack_engine::rules::Outcome;
///
/// // player K 9, dealer 10 7
/// let deck = Deck::stacked(vec![
///     Card::new(Rank::King, Suit::Spades),
///     Card::new(Rank::Ten, Suit::Hearts),
///     Card::new(Rank::Nine, Suit::Clubs),
///     Card::new(Rank::Seven, Suit::Diamonds),
/// ]);
/// let mut engine = Engine::with_deck(1000, deck);
///
/// engine.place_bet(100)?;
/// engine.deal()?;
/// assert_eq!(engine.phase(), Phase::PlayerTurn);
/// assert_eq!(engine.bank(), 900);
///
/// engine.stand()?;
/// let round = engine.last_round().expect("round resolved");
/// assert_eq!(round.outcome, Outcome::Win);
/// assert_eq!(round.payout, 200);
/// assert_eq!(engine.bank(), 1100);
/// # Ok::<(), blackjack_engine::errors::GameError>(())
/// ```
#[derive(Debug)]
pub struct Engine {
    table: Table,
    history: RoundLog,
    ledger: Ledger,
    round_seq: u32,
    seed: Option<u64>,
}

impl Engine {
    /// Fresh game with `starting_bank` chips. Without a seed, one is drawn
    /// from the thread RNG and kept for replay.
    pub fn new(starting_bank: u64, seed: Option<u64>) -> Self {
        let (deck, seed) = match seed {
            Some(seed) => (Deck::new_with_seed(seed), seed),
            None => Deck::from_entropy(),
        };
        let mut engine = Self::with_deck(starting_bank, deck);
        engine.seed = Some(seed);
        engine
    }

    pub fn with_deck(starting_bank: u64, deck: Deck) -> Self {
        Self {
            table: Table {
                phase: Phase::Idle,
                bank: starting_bank,
                current_bet: 0,
                deck,
                hands: Vec::new(),
                active: 0,
                dealer: Hand::new(),
                just_resolved: false,
            },
            history: RoundLog::new(),
            ledger: Ledger::new(),
            round_seq: 0,
            seed: None,
        }
    }

    pub fn place_bet(&mut self, amount: u64) -> Result<(), GameError> {
        self.transition(Action::PlaceBet, |table| table.place_bet(amount))
    }

    pub fn clear_bet(&mut self) -> Result<(), GameError> {
        self.transition(Action::ClearBet, Table::clear_bet)
    }

    pub fn deal(&mut self) -> Result<(), GameError> {
        self.transition(Action::Deal, Table::deal)
    }

    pub fn hit(&mut self) -> Result<(), GameError> {
        self.act(PlayerAction::Hit)
    }

    pub fn stand(&mut self) -> Result<(), GameError> {
        self.act(PlayerAction::Stand)
    }

    pub fn double_down(&mut self) -> Result<(), GameError> {
        self.act(PlayerAction::DoubleDown)
    }

    pub fn surrender(&mut self) -> Result<(), GameError> {
        self.act(PlayerAction::Surrender)
    }

    pub fn split(&mut self) -> Result<(), GameError> {
        self.act(PlayerAction::Split)
    }

    pub fn act(&mut self, action: PlayerAction) -> Result<(), GameError> {
        self.transition(action.into(), |table| match action {
            PlayerAction::Hit => table.hit(),
            PlayerAction::Stand => table.stand(),
            PlayerAction::DoubleDown => table.double_down(),
            PlayerAction::Surrender => table.surrender(),
            PlayerAction::Split => table.split(),
        })
    }

    /// Debits `amount` for the payment collaborator and records it as pending.
    /// Only chips not already committed to the next bet can leave the table.
    pub fn begin_cashout(
        &mut self,
        destination: impl Into<String>,
        amount: u64,
    ) -> Result<CashoutId, GameError> {
        let table = &mut self.table;
        if !table.phase.is_between_rounds() {
            return Err(table.illegal(Action::CashOut));
        }
        if amount == 0 {
            return Err(GameError::InvalidCashout { amount });
        }
        let available = table.bank.saturating_sub(table.current_bet);
        if amount > available {
            return Err(GameError::InsufficientFunds {
                requested: amount,
                available,
            });
        }
        table.bank -= amount;
        let id = self.ledger.open(destination.into(), amount);
        debug!(cashout_id = id, amount, bank = table.bank, "cash-out pending");
        Ok(id)
    }

    /// Records the collaborator's answer. A failed payout returns the amount
    /// to the bank.
    pub fn settle_cashout(
        &mut self,
        id: CashoutId,
        result: Result<String, String>,
    ) -> Result<(), GameError> {
        let (status, refund) = match result {
            Ok(tx_ref) => (CashoutStatus::Confirmed { tx_ref }, false),
            Err(reason) => (CashoutStatus::Failed { reason }, true),
        };
        let amount = self.ledger.close(id, status)?;
        if refund {
            self.table.bank = self.table.bank.saturating_add(amount);
        }
        debug!(cashout_id = id, refund, bank = self.table.bank, "cash-out settled");
        Ok(())
    }

    pub fn phase(&self) -> Phase {
        self.table.phase
    }

    pub fn bank(&self) -> u64 {
        self.table.bank
    }

    pub fn current_bet(&self) -> u64 {
        self.table.current_bet
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    pub fn player_hands(&self) -> &[PlayerHand] {
        &self.table.hands
    }

    /// Index of the hand awaiting a decision, only during the player's turn.
    pub fn active_hand(&self) -> Option<usize> {
        (self.table.phase == Phase::PlayerTurn).then_some(self.table.active)
    }

    /// Unmasked dealer cards. Use [`Engine::dealer_view`] for anything a
    /// player sees.
    pub fn dealer_hand(&self) -> &Hand {
        &self.table.dealer
    }

    /// Dealer cards with the hole card (the first one dealt) and the total
    /// hidden until the dealer's turn.
    pub fn dealer_view(&self) -> DealerView {
        let revealed = self.table.phase.dealer_revealed();
        let cards = self
            .table
            .dealer
            .cards()
            .iter()
            .enumerate()
            .map(|(i, card)| (revealed || i > 0).then_some(*card))
            .collect();
        DealerView {
            cards,
            value: revealed.then(|| self.table.dealer.value()),
        }
    }

    pub fn history(&self) -> &RoundLog {
        &self.history
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// The round that just finished, while its cards are still on the table.
    pub fn last_round(&self) -> Option<&RoundRecord> {
        if self.table.phase == Phase::Resolved {
            self.history.last()
        } else {
            None
        }
    }

    pub fn deck_remaining(&self) -> usize {
        self.table.deck.remaining()
    }

    pub fn view(&self, history_limit: usize) -> TableView {
        TableView {
            phase: self.table.phase,
            bank: self.table.bank,
            current_bet: self.table.current_bet,
            player_hands: self.table.hands.iter().map(HandView::from).collect(),
            active_hand: self.active_hand(),
            dealer_hand: self.dealer_view(),
            dealer_turn: self.table.phase.dealer_revealed(),
            history: self.history.recent(history_limit),
            net: self.history.net(),
            cashouts: self.ledger.entries().to_vec(),
        }
    }

    fn transition<F>(&mut self, action: Action, apply: F) -> Result<(), GameError>
    where
        F: FnOnce(&mut Table) -> Result<(), GameError>,
    {
        let mut staged = self.table.clone();
        if let Err(err) = apply(&mut staged) {
            if err.is_fatal() {
                error!(
                    %action,
                    phase = %self.table.phase,
                    error = %err,
                    "round integrity check failed"
                );
            } else {
                debug!(%action, phase = %self.table.phase, error = %err, "transition rejected");
            }
            return Err(err);
        }

        if std::mem::take(&mut staged.just_resolved) {
            let record = self.record_round(&staged);
            debug!(
                round_id = %record.round_id,
                outcome = ?record.outcome,
                bet = record.bet,
                payout = record.payout,
                bank = staged.bank,
                "round resolved"
            );
            self.history.append(record);
        }

        debug!(
            %action,
            from = %self.table.phase,
            to = %staged.phase,
            bank = staged.bank,
            "transition applied"
        );
        self.table = staged;
        Ok(())
    }

    fn record_round(&mut self, table: &Table) -> RoundRecord {
        self.round_seq += 1;
        let bet: u64 = table.hands.iter().map(|h| h.bet).sum();
        let payout: u64 = table.hands.iter().map(|h| h.payout).sum();
        let outcome = match table.hands.as_slice() {
            [single] => single
                .outcome
                .unwrap_or_else(|| aggregate_outcome(bet, payout)),
            _ => aggregate_outcome(bet, payout),
        };
        let now = Utc::now();
        RoundRecord {
            round_id: format_round_id(&now.format("%Y%m%d").to_string(), self.round_seq),
            bet,
            payout,
            outcome,
            player_hands: table.hands.iter().map(|h| h.hand.clone()).collect(),
            dealer_hand: table.dealer.clone(),
            ts: now.to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone)]
struct Table {
    phase: Phase,
    bank: u64,
    current_bet: u64,
    deck: Deck,
    hands: Vec<PlayerHand>,
    active: usize,
    dealer: Hand,
    // Set by `resolve`, consumed by `Engine::transition`.
    just_resolved: bool,
}

impl Table {
    fn illegal(&self, action: impl Into<Action>) -> GameError {
        GameError::IllegalTransition {
            action: action.into(),
            phase: self.phase,
        }
    }

    fn expect_turn(&self, action: PlayerAction) -> Result<(), GameError> {
        if self.phase == Phase::PlayerTurn {
            Ok(())
        } else {
            Err(self.illegal(action))
        }
    }

    fn place_bet(&mut self, amount: u64) -> Result<(), GameError> {
        if !self.phase.is_between_rounds() {
            return Err(self.illegal(Action::PlaceBet));
        }
        if amount == 0 {
            return Err(GameError::InvalidBet { amount });
        }
        let requested = self.current_bet.saturating_add(amount);
        if requested > self.bank {
            return Err(GameError::InsufficientFunds {
                requested,
                available: self.bank,
            });
        }
        if self.phase == Phase::Resolved {
            self.clear_cards();
        }
        self.current_bet = requested;
        self.phase = Phase::Betting;
        Ok(())
    }

    fn clear_bet(&mut self) -> Result<(), GameError> {
        if self.phase != Phase::Betting {
            return Err(self.illegal(Action::ClearBet));
        }
        self.current_bet = 0;
        self.phase = Phase::Idle;
        Ok(())
    }

    fn deal(&mut self) -> Result<(), GameError> {
        if !self.phase.is_between_rounds() {
            return Err(self.illegal(Action::Deal));
        }
        let bet = self.current_bet;
        if bet == 0 || bet > self.bank {
            return Err(GameError::InvalidBet { amount: bet });
        }

        self.deck.shuffle();
        let player_first = self.deck.draw()?;
        let dealer_first = self.deck.draw()?;
        let player_second = self.deck.draw()?;
        let dealer_second = self.deck.draw()?;

        self.bank -= bet;
        self.hands = vec![PlayerHand::new(vec![player_first, player_second], bet)];
        self.active = 0;
        self.dealer = Hand::from_cards(vec![dealer_first, dealer_second]);
        self.phase = Phase::Dealt;

        match natural_outcome(self.hands[0].cards(), self.dealer.cards()) {
            Some(outcome) => {
                self.hands[0].close(outcome);
                self.resolve();
            }
            None => self.phase = Phase::PlayerTurn,
        }
        Ok(())
    }

    fn hit(&mut self) -> Result<(), GameError> {
        self.expect_turn(PlayerAction::Hit)?;
        let card = self.deck.draw()?;

        let hand = &mut self.hands[self.active];
        hand.hand.push(card);
        hand.hit = true;
        if hand.is_bust() {
            hand.close(Outcome::Loss);
        } else if hand.value() == BLACKJACK {
            hand.finished = true;
        }

        if hand.finished {
            self.advance()?;
        }
        Ok(())
    }

    fn stand(&mut self) -> Result<(), GameError> {
        self.expect_turn(PlayerAction::Stand)?;
        self.hands[self.active].finished = true;
        self.advance()
    }

    fn double_down(&mut self) -> Result<(), GameError> {
        self.expect_turn(PlayerAction::DoubleDown)?;
        let hand = &self.hands[self.active];
        if !hand.is_untouched() {
            return Err(self.illegal(PlayerAction::DoubleDown));
        }
        let extra = hand.bet;
        if extra > self.bank {
            return Err(GameError::InsufficientFunds {
                requested: extra,
                available: self.bank,
            });
        }
        let card = self.deck.draw()?;

        self.bank -= extra;
        self.current_bet += extra;
        let hand = &mut self.hands[self.active];
        hand.bet += extra;
        hand.doubled = true;
        hand.hand.push(card);
        if hand.is_bust() {
            hand.close(Outcome::Loss);
        } else {
            hand.finished = true;
        }
        self.advance()
    }

    fn surrender(&mut self) -> Result<(), GameError> {
        self.expect_turn(PlayerAction::Surrender)?;
        if !matches!(self.hands.as_slice(), [hand] if hand.is_untouched()) {
            return Err(self.illegal(PlayerAction::Surrender));
        }
        self.hands[0].close(Outcome::Surrender);
        self.resolve();
        Ok(())
    }

    fn split(&mut self) -> Result<(), GameError> {
        self.expect_turn(PlayerAction::Split)?;
        let (first, second, bet) = match self.hands.as_slice() {
            [hand] if hand.is_untouched() && hand.hand.is_pair() => {
                (hand.cards()[0], hand.cards()[1], hand.bet)
            }
            _ => return Err(self.illegal(PlayerAction::Split)),
        };
        if bet > self.bank {
            return Err(GameError::InsufficientFunds {
                requested: bet,
                available: self.bank,
            });
        }
        let first_extra = self.deck.draw()?;
        let second_extra = self.deck.draw()?;

        self.bank -= bet;
        self.current_bet += bet;
        self.hands = vec![
            PlayerHand::split_from(first, first_extra, bet),
            PlayerHand::split_from(second, second_extra, bet),
        ];
        self.active = 0;
        self.advance()
    }

    /// Moves to the next hand that still needs a decision, or to the dealer
    /// once none is left. Hands standing on 21 need no decision.
    fn advance(&mut self) -> Result<(), GameError> {
        while let Some(hand) = self.hands.get_mut(self.active) {
            if !hand.finished {
                if hand.value() < BLACKJACK {
                    return Ok(());
                }
                hand.finished = true;
            }
            self.active += 1;
        }
        self.active = self.hands.len().saturating_sub(1);
        self.play_dealer()
    }

    fn play_dealer(&mut self) -> Result<(), GameError> {
        self.phase = Phase::DealerTurn;
        // no need to draw against hands that already lost
        if self.hands.iter().any(|h| !h.is_bust()) {
            while dealer_should_hit(self.dealer.cards()) {
                let card = self.deck.draw()?;
                self.dealer.push(card);
            }
        }
        for hand in self.hands.iter_mut().filter(|h| h.outcome.is_none()) {
            let outcome = settle(hand.cards(), self.dealer.cards());
            hand.close(outcome);
        }
        self.resolve();
        Ok(())
    }

    fn resolve(&mut self) {
        let payout: u64 = self.hands.iter().map(|h| h.payout).sum();
        self.bank = self.bank.saturating_add(payout);
        self.current_bet = 0;
        self.phase = Phase::Resolved;
        self.just_resolved = true;
    }

    fn clear_cards(&mut self) {
        self.hands.clear();
        self.active = 0;
        self.dealer = Hand::new();
    }
}
