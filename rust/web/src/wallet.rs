//! Payment collaborator used to settle cash-outs.
//!
//! The session registry debits the bank, hands a [`PayoutRequest`] to a
//! [`PaymentGateway`] and records the answer once the returned future
//! completes. [`StubGateway`] stands in for a real payment network.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use blackjack_engine::ledger::CashoutId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::WalletSettings;
use crate::session::SessionId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WalletError {
    #[error("Cash-outs are disabled")]
    Disabled,
    #[error("No async runtime available to settle the cash-out")]
    RuntimeUnavailable,
    #[error("Payout rejected by {gateway}: {reason}")]
    Rejected { gateway: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutRequest {
    pub session_id: SessionId,
    pub cashout_id: CashoutId,
    pub destination: String,
    pub amount: u64,
}

/// Resolves to the transaction reference of a completed payout.
pub type SettlementFuture = Pin<Box<dyn Future<Output = Result<String, WalletError>> + Send>>;

pub trait PaymentGateway: Send + Sync + std::fmt::Debug {
    fn name(&self) -> &str;

    fn submit(&self, request: PayoutRequest) -> SettlementFuture;
}

/// Confirms every payout after a fixed delay with a synthetic reference.
#[derive(Debug, Clone)]
pub struct StubGateway {
    confirmation_delay: Duration,
}

impl StubGateway {
    pub fn new(confirmation_delay: Duration) -> Self {
        Self { confirmation_delay }
    }

    pub fn from_settings(settings: &WalletSettings) -> Self {
        Self::new(settings.confirmation_delay())
    }
}

impl Default for StubGateway {
    fn default() -> Self {
        Self::from_settings(&WalletSettings::default())
    }
}

impl PaymentGateway for StubGateway {
    fn name(&self) -> &str {
        "stub"
    }

    fn submit(&self, request: PayoutRequest) -> SettlementFuture {
        let delay = self.confirmation_delay;
        Box::pin(async move {
            tokio::time::sleep(delay).await;
            Ok(stub_tx_ref(&request.session_id, chrono::Utc::now().timestamp()))
        })
    }
}

fn stub_tx_ref(session_id: &str, unix_ts: i64) -> String {
    let prefix: String = session_id.chars().take(8).collect();
    format!("stub-tx-{prefix}-{unix_ts}")
}
