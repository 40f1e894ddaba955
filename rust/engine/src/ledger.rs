use serde::{Deserialize, Serialize};

use crate::errors::GameError;

pub type CashoutId = u64;

/// Settlement state reported by the payment collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CashoutStatus {
    Pending,
    Confirmed { tx_ref: String },
    Failed { reason: String },
}

/// A withdrawal from the bank. The amount leaves the bank when the record is
/// created; a failed settlement puts it back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cashout {
    pub id: CashoutId,
    pub destination: String,
    pub amount: u64,
    #[serde(flatten)]
    pub status: CashoutStatus,
    pub requested_at: String,
}

/// Cash-outs for one session, in request order.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    entries: Vec<Cashout>,
    next_id: CashoutId,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn open(&mut self, destination: String, amount: u64) -> CashoutId {
        self.next_id += 1;
        let id = self.next_id;
        self.entries.push(Cashout {
            id,
            destination,
            amount,
            status: CashoutStatus::Pending,
            requested_at: chrono::Utc::now().to_rfc3339(),
        });
        id
    }

    /// Moves a pending entry to its final state and returns its amount.
    pub(crate) fn close(
        &mut self,
        id: CashoutId,
        status: CashoutStatus,
    ) -> Result<u64, GameError> {
        let entry = self
            .entries
            .iter_mut()
            .find(|entry| entry.id == id)
            .ok_or(GameError::UnknownCashout(id))?;
        if entry.status != CashoutStatus::Pending {
            return Err(GameError::CashoutAlreadySettled(id));
        }
        entry.status = status;
        Ok(entry.amount)
    }

    pub fn get(&self, id: CashoutId) -> Option<&Cashout> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    pub fn entries(&self) -> &[Cashout] {
        &self.entries
    }

    pub fn pending(&self) -> impl Iterator<Item = &Cashout> {
        self.entries
            .iter()
            .filter(|entry| entry.status == CashoutStatus::Pending)
    }
}
