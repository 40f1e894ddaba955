use serde::{Deserialize, Serialize};

use crate::hand::Hand;
use crate::rules::Outcome;

/// Complete record of a finished round. Appended to the session history once
/// and never modified afterwards.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct RoundRecord {
    /// Unique identifier for this round (format: YYYYMMDD-NNNNNN)
    pub round_id: String,
    /// Total wagered, including double-down and split bets
    pub bet: u64,
    /// Total credited back to the bank
    pub payout: u64,
    pub outcome: Outcome,
    pub player_hands: Vec<Hand>,
    pub dealer_hand: Hand,
    /// Timestamp when the round resolved (RFC3339 format)
    pub ts: String,
}

impl RoundRecord {
    pub fn net(&self) -> i64 {
        self.payout as i64 - self.bet as i64
    }
}

pub fn format_round_id(yyyymmdd: &str, seq: u32) -> String {
    format!("{}-{:06}", yyyymmdd, seq)
}

/// Append-only round history in chronological order.
#[derive(Debug, Clone, Default)]
pub struct RoundLog {
    rounds: Vec<RoundRecord>,
}

impl RoundLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, record: RoundRecord) {
        self.rounds.push(record);
    }

    pub fn len(&self) -> usize {
        self.rounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rounds.is_empty()
    }

    /// Chronological order, oldest first.
    pub fn rounds(&self) -> &[RoundRecord] {
        &self.rounds
    }

    pub fn last(&self) -> Option<&RoundRecord> {
        self.rounds.last()
    }

    /// Up to `limit` rounds, newest first.
    pub fn recent(&self, limit: usize) -> Vec<RoundRecord> {
        self.rounds.iter().rev().take(limit).cloned().collect()
    }

    pub fn net(&self) -> i64 {
        self.rounds.iter().map(RoundRecord::net).sum()
    }
}
