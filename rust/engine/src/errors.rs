use thiserror::Error;

use crate::game::{Action, Phase};
use crate::ledger::CashoutId;

/// Every failure leaves the game exactly as it was before the call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GameError {
    #[error("Cannot {action} while the round is in phase {phase}")]
    IllegalTransition { action: Action, phase: Phase },
    #[error("Insufficient funds: {requested} requested, {available} available")]
    InsufficientFunds { requested: u64, available: u64 },
    #[error("Invalid bet amount: {amount}")]
    InvalidBet { amount: u64 },
    #[error("Invalid cash-out amount: {amount}")]
    InvalidCashout { amount: u64 },
    #[error("Deck exhausted mid-round")]
    DeckExhausted,
    #[error("Unknown cash-out: {0}")]
    UnknownCashout(CashoutId),
    #[error("Cash-out {0} is already settled")]
    CashoutAlreadySettled(CashoutId),
}

impl GameError {
    /// Integrity failures that a retry cannot fix.
    pub fn is_fatal(&self) -> bool {
        matches!(self, GameError::DeckExhausted)
    }
}
