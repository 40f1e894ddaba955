use blackjack_engine::engine::Engine;
use blackjack_engine::errors::GameError;
use blackjack_engine::game::{DealerView, HandView, Phase, TableView};
use blackjack_engine::ledger::{CashoutId, CashoutStatus};
use blackjack_engine::rules::{Outcome, BLACKJACK};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};
use thiserror::Error;
use uuid::Uuid;

use crate::config::{GameSettings, WalletSettings};
use crate::wallet::{PaymentGateway, PayoutRequest, StubGateway, WalletError};

pub type SessionId = String;

/// Owns every live game. Lookups take the map lock briefly; all game state
/// sits behind the per-session mutex, so requests on one session run one at a
/// time while different sessions proceed independently.
#[derive(Debug)]
pub struct SessionManager {
    sessions: RwLock<HashMap<SessionId, Arc<GameSession>>>,
    settings: GameSettings,
    session_ttl: Duration,
    wallet_enabled: bool,
    gateway: Arc<dyn PaymentGateway>,
}

impl SessionManager {
    pub fn new(settings: GameSettings) -> Self {
        let wallet = WalletSettings::default();
        let gateway = Arc::new(StubGateway::from_settings(&wallet));
        Self::with_wallet(settings, &wallet, gateway)
    }

    pub fn with_wallet(
        settings: GameSettings,
        wallet: &WalletSettings,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            session_ttl: settings.session_ttl(),
            settings,
            wallet_enabled: wallet.enabled,
            gateway,
        }
    }

    pub fn with_ttl(settings: GameSettings, ttl: Duration) -> Self {
        Self {
            session_ttl: ttl,
            ..Self::new(settings)
        }
    }

    pub fn settings(&self) -> &GameSettings {
        &self.settings
    }

    pub fn create_session(&self) -> Result<CreatedSession, SessionError> {
        let engine = Engine::new(self.settings.initial_bank, self.settings.seed);
        self.create_session_with_engine(engine)
    }

    /// Registers a game built by the caller, e.g. one dealing from a
    /// stacked deck for replay.
    pub fn create_session_with_engine(
        &self,
        engine: Engine,
    ) -> Result<CreatedSession, SessionError> {
        let id = Uuid::new_v4().to_string();
        let bank = engine.bank();
        let seed = engine.seed();

        {
            let mut guard = self
                .sessions
                .write()
                .map_err(|_| SessionError::StoragePoisoned)?;
            guard.insert(id.clone(), Arc::new(GameSession::new(id.clone(), engine)));
        }

        tracing::info!(session_id = %id, bank, seed = ?seed, "session created");
        Ok(CreatedSession {
            session_id: id,
            bank,
        })
    }

    pub fn get_session(&self, id: &SessionId) -> Result<Arc<GameSession>, SessionError> {
        let guard = self
            .sessions
            .read()
            .map_err(|_| SessionError::StoragePoisoned)?;
        guard
            .get(id)
            .cloned()
            .ok_or_else(|| SessionError::NotFound(id.clone()))
    }

    pub fn status(&self, session_id: &SessionId) -> Result<SessionStatus, SessionError> {
        let limit = self.settings.max_history_entries;
        self.live_session(session_id)?.with_engine(|engine| {
            Ok(SessionStatus {
                session_id: session_id.clone(),
                table: engine.view(limit),
            })
        })
    }

    pub fn place_bet(
        &self,
        session_id: &SessionId,
        amount: u64,
    ) -> Result<BetResponse, SessionError> {
        self.live_session(session_id)?.with_engine(|engine| {
            engine.place_bet(amount)?;
            tracing::debug!(
                session_id = %session_id,
                amount,
                current_bet = engine.current_bet(),
                "bet placed"
            );
            Ok(BetResponse::from_engine(engine))
        })
    }

    pub fn clear_bet(&self, session_id: &SessionId) -> Result<BetResponse, SessionError> {
        self.live_session(session_id)?.with_engine(|engine| {
            engine.clear_bet()?;
            Ok(BetResponse::from_engine(engine))
        })
    }

    pub fn deal(&self, session_id: &SessionId) -> Result<DealResponse, SessionError> {
        self.live_session(session_id)?.with_engine(|engine| {
            engine.deal()?;
            let response = DealResponse {
                bank: engine.bank(),
                player_hand: engine
                    .player_hands()
                    .first()
                    .map(HandView::from)
                    .ok_or_else(|| SessionError::Inconsistent("no player hand after deal".into()))?,
                dealer_hand: engine.dealer_view(),
                outcome: engine.last_round().map(|round| round.outcome),
                phase: engine.phase(),
            };
            tracing::debug!(
                session_id = %session_id,
                phase = %response.phase,
                outcome = ?response.outcome,
                "cards dealt"
            );
            Ok(response)
        })
    }

    pub fn hit(&self, session_id: &SessionId) -> Result<HitResponse, SessionError> {
        self.live_session(session_id)?.with_engine(|engine| {
            let index = engine.active_hand().unwrap_or_default();
            engine.hit()?;
            let hand = hand_view(engine, index)?;
            Ok(HitResponse {
                busted: hand.value > BLACKJACK,
                hand,
                active_hand: engine.active_hand(),
                bank: engine.bank(),
                phase: engine.phase(),
            })
        })
    }

    pub fn stand(&self, session_id: &SessionId) -> Result<StandResponse, SessionError> {
        self.live_session(session_id)?.with_engine(|engine| {
            engine.stand()?;
            Ok(StandResponse::from_engine(engine))
        })
    }

    pub fn double_down(&self, session_id: &SessionId) -> Result<DoubleResponse, SessionError> {
        self.live_session(session_id)?.with_engine(|engine| {
            let index = engine.active_hand().unwrap_or_default();
            engine.double_down()?;
            Ok(DoubleResponse {
                hand: hand_view(engine, index)?,
                result: StandResponse::from_engine(engine),
            })
        })
    }

    pub fn surrender(&self, session_id: &SessionId) -> Result<SurrenderResponse, SessionError> {
        self.live_session(session_id)?.with_engine(|engine| {
            engine.surrender()?;
            let round = engine.last_round().ok_or_else(|| {
                SessionError::Inconsistent("surrender left no round record".into())
            })?;
            Ok(SurrenderResponse {
                bank: engine.bank(),
                outcome: round.outcome,
                payout: round.payout,
                phase: engine.phase(),
            })
        })
    }

    pub fn split(&self, session_id: &SessionId) -> Result<SplitResponse, SessionError> {
        self.live_session(session_id)?.with_engine(|engine| {
            engine.split()?;
            Ok(SplitResponse {
                hands: engine.player_hands().iter().map(HandView::from).collect(),
                active_hand: engine.active_hand(),
                dealer_hand: engine.dealer_view(),
                bank: engine.bank(),
                phase: engine.phase(),
            })
        })
    }

    /// Debits `amount` and hands it to the payment gateway. Settlement runs on
    /// the current tokio runtime; the pending entry shows up in the status
    /// until it completes.
    pub fn cash_out(
        &self,
        session_id: &SessionId,
        destination: String,
        amount: u64,
    ) -> Result<CashoutResponse, SessionError> {
        if !self.wallet_enabled {
            return Err(WalletError::Disabled.into());
        }
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|_| WalletError::RuntimeUnavailable)?;

        let session = self.live_session(session_id)?;
        let (cashout_id, bank) = session.with_engine(|engine| {
            let id = engine.begin_cashout(destination.clone(), amount)?;
            Ok((id, engine.bank()))
        })?;

        tracing::info!(
            session_id = %session_id,
            cashout_id,
            amount,
            gateway = self.gateway.name(),
            "cash-out submitted"
        );

        let settlement = self.gateway.submit(PayoutRequest {
            session_id: session_id.clone(),
            cashout_id,
            destination,
            amount,
        });
        runtime.spawn(async move {
            let result = settlement.await.map_err(|err| err.to_string());
            if let Err(reason) = &result {
                tracing::warn!(
                    session_id = %session.id(),
                    cashout_id,
                    reason = %reason,
                    "cash-out failed, refunding"
                );
            }
            let settled = session.with_engine(|engine| {
                engine.settle_cashout(cashout_id, result)?;
                Ok(engine.bank())
            });
            match settled {
                Ok(bank) => {
                    tracing::info!(session_id = %session.id(), cashout_id, bank, "cash-out settled")
                }
                Err(err) => tracing::error!(
                    session_id = %session.id(),
                    cashout_id,
                    error = %err,
                    "failed to record cash-out settlement"
                ),
            }
        });

        Ok(CashoutResponse {
            cashout_id,
            bank,
            status: CashoutStatus::Pending,
        })
    }

    /// Drops sessions idle for longer than the TTL. A session with chips on
    /// the table or an unsettled cash-out is kept until both are resolved.
    pub fn cleanup_expired_sessions(&self) -> usize {
        let mut expired = Vec::new();
        {
            let mut guard = match self.sessions.write() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            guard.retain(|id, session| {
                if session.retire_if_idle(self.session_ttl) {
                    expired.push(id.clone());
                    false
                } else {
                    true
                }
            });
        }

        for id in &expired {
            tracing::info!(session_id = %id, "session expired");
        }
        expired.len()
    }

    pub fn active_sessions(&self) -> Vec<SessionId> {
        match self.sessions.read() {
            Ok(guard) => guard.keys().cloned().collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Looks up a session for a request, dropping it if it has been idle for
    /// longer than the TTL.
    fn live_session(&self, session_id: &SessionId) -> Result<Arc<GameSession>, SessionError> {
        let session = self.get_session(session_id)?;
        if session.is_expired(self.session_ttl) && self.evict(session_id)? {
            tracing::info!(session_id = %session_id, "session expired due to inactivity");
            return Err(SessionError::Expired(session_id.clone()));
        }
        session.touch();
        Ok(session)
    }

    fn evict(&self, session_id: &SessionId) -> Result<bool, SessionError> {
        let mut guard = self
            .sessions
            .write()
            .map_err(|_| SessionError::StoragePoisoned)?;
        let retired = guard
            .get(session_id)
            .is_some_and(|session| session.retire_if_idle(self.session_ttl));
        if retired {
            guard.remove(session_id);
        }
        Ok(retired)
    }
}

/// One player's game. The engine mutex is held for the whole of every
/// transition.
pub struct GameSession {
    id: SessionId,
    engine: Mutex<Engine>,
    /// Set under the engine lock once the session leaves the registry
    retired: AtomicBool,
    created_at: Instant,
    last_active: Mutex<Instant>,
}

impl std::fmt::Debug for GameSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameSession")
            .field("id", &self.id)
            .field("created_at", &self.created_at)
            .finish()
    }
}

impl GameSession {
    fn new(id: SessionId, engine: Engine) -> Self {
        let now = Instant::now();
        Self {
            id,
            engine: Mutex::new(engine),
            retired: AtomicBool::new(false),
            created_at: now,
            last_active: Mutex::new(now),
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// Runs `f` with exclusive access to the game. Fails with `Expired` once
    /// the session has been evicted, even through a handle taken earlier.
    pub fn with_engine<T, F>(&self, f: F) -> Result<T, SessionError>
    where
        F: FnOnce(&mut Engine) -> Result<T, SessionError>,
    {
        let mut engine = self
            .engine
            .lock()
            .map_err(|_| SessionError::StoragePoisoned)?;
        if self.retired.load(Ordering::Acquire) {
            return Err(SessionError::Expired(self.id.clone()));
        }
        f(&mut engine)
    }

    /// Marks an expired session as gone, unless it still holds money in
    /// flight or a request is using it right now.
    fn retire_if_idle(&self, ttl: Duration) -> bool {
        if !self.is_expired(ttl) {
            return false;
        }
        let Ok(engine) = self.engine.try_lock() else {
            return false;
        };
        if !holds_no_money_in_flight(&engine) {
            tracing::debug!(
                session_id = %self.id,
                phase = %engine.phase(),
                "expired session kept until settled"
            );
            return false;
        }
        self.retired.store(true, Ordering::Release);
        true
    }

    fn touch(&self) {
        if let Ok(mut guard) = self.last_active.lock() {
            *guard = Instant::now();
        }
    }

    fn is_expired(&self, ttl: Duration) -> bool {
        match self.last_active.lock() {
            Ok(last) => last.elapsed() >= ttl,
            Err(_) => false,
        }
    }
}

#[cfg(test)]
impl GameSession {
    fn force_last_active(&self, instant: Instant) {
        if let Ok(mut guard) = self.last_active.lock() {
            *guard = instant;
        }
    }
}

/// Nothing staked and no cash-out awaiting its answer.
fn holds_no_money_in_flight(engine: &Engine) -> bool {
    matches!(engine.phase(), Phase::Idle | Phase::Resolved)
        && engine.ledger().pending().next().is_none()
}

fn hand_view(engine: &Engine, index: usize) -> Result<HandView, SessionError> {
    engine
        .player_hands()
        .get(index)
        .map(HandView::from)
        .ok_or_else(|| SessionError::Inconsistent(format!("no player hand at index {index}")))
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreatedSession {
    pub session_id: SessionId,
    pub bank: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionStatus {
    pub session_id: SessionId,
    #[serde(flatten)]
    pub table: TableView,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BetResponse {
    pub bank: u64,
    pub current_bet: u64,
    pub phase: Phase,
}

impl BetResponse {
    fn from_engine(engine: &Engine) -> Self {
        Self {
            bank: engine.bank(),
            current_bet: engine.current_bet(),
            phase: engine.phase(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DealResponse {
    pub bank: u64,
    pub player_hand: HandView,
    pub dealer_hand: DealerView,
    pub phase: Phase,
    /// Set when a natural ended the round on the deal
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<Outcome>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HitResponse {
    pub hand: HandView,
    pub busted: bool,
    pub active_hand: Option<usize>,
    pub bank: u64,
    pub phase: Phase,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StandResponse {
    pub dealer_hand: DealerView,
    pub bank: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<Outcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payout: Option<u64>,
    pub active_hand: Option<usize>,
    pub phase: Phase,
}

impl StandResponse {
    fn from_engine(engine: &Engine) -> Self {
        let round = engine.last_round();
        Self {
            dealer_hand: engine.dealer_view(),
            bank: engine.bank(),
            outcome: round.map(|r| r.outcome),
            payout: round.map(|r| r.payout),
            active_hand: engine.active_hand(),
            phase: engine.phase(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DoubleResponse {
    pub hand: HandView,
    #[serde(flatten)]
    pub result: StandResponse,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SurrenderResponse {
    pub bank: u64,
    pub outcome: Outcome,
    pub payout: u64,
    pub phase: Phase,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SplitResponse {
    pub hands: Vec<HandView>,
    pub active_hand: Option<usize>,
    pub dealer_hand: DealerView,
    pub bank: u64,
    pub phase: Phase,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CashoutResponse {
    pub cashout_id: CashoutId,
    pub bank: u64,
    #[serde(flatten)]
    pub status: CashoutStatus,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    NotFound(SessionId),
    #[error("Session expired: {0}")]
    Expired(SessionId),
    #[error(transparent)]
    Game(#[from] GameError),
    #[error(transparent)]
    Wallet(#[from] WalletError),
    #[error("Session state inconsistent: {0}")]
    Inconsistent(String),
    #[error("Session storage poisoned")]
    StoragePoisoned,
}

impl crate::errors::IntoErrorResponse for SessionError {
    fn status_code(&self) -> warp::http::StatusCode {
        use warp::http::StatusCode;
        match self {
            SessionError::NotFound(_) => StatusCode::NOT_FOUND,
            SessionError::Expired(_) => StatusCode::GONE,
            SessionError::Game(err) => match err {
                GameError::IllegalTransition { .. } => StatusCode::CONFLICT,
                GameError::InsufficientFunds { .. }
                | GameError::InvalidBet { .. }
                | GameError::InvalidCashout { .. } => StatusCode::BAD_REQUEST,
                GameError::UnknownCashout(_) => StatusCode::NOT_FOUND,
                GameError::CashoutAlreadySettled(_) => StatusCode::CONFLICT,
                GameError::DeckExhausted => StatusCode::INTERNAL_SERVER_ERROR,
            },
            SessionError::Wallet(WalletError::Disabled) => StatusCode::FORBIDDEN,
            SessionError::Wallet(_) => StatusCode::SERVICE_UNAVAILABLE,
            SessionError::Inconsistent(_) | SessionError::StoragePoisoned => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            SessionError::NotFound(_) => "session_not_found",
            SessionError::Expired(_) => "session_expired",
            SessionError::Game(err) => match err {
                GameError::IllegalTransition { .. } => "illegal_transition",
                GameError::InsufficientFunds { .. } => "insufficient_funds",
                GameError::InvalidBet { .. } => "invalid_bet",
                GameError::InvalidCashout { .. } => "invalid_cashout",
                GameError::UnknownCashout(_) => "cashout_not_found",
                GameError::CashoutAlreadySettled(_) => "cashout_already_settled",
                GameError::DeckExhausted => "deck_exhausted",
            },
            SessionError::Wallet(WalletError::Disabled) => "cashout_disabled",
            SessionError::Wallet(_) => "wallet_unavailable",
            SessionError::Inconsistent(_) => "session_inconsistent",
            SessionError::StoragePoisoned => "session_storage_error",
        }
    }

    fn error_message(&self) -> String {
        self.to_string()
    }

    fn error_details(&self) -> Option<serde_json::Value> {
        match self {
            SessionError::NotFound(id) => Some(serde_json::json!({
                "session_id": id
            })),
            SessionError::Expired(id) => Some(serde_json::json!({
                "session_id": id,
                "reason": "Session expired due to inactivity"
            })),
            SessionError::Game(GameError::IllegalTransition { action, phase }) => {
                Some(serde_json::json!({
                    "action": action,
                    "phase": phase
                }))
            }
            SessionError::Game(GameError::InsufficientFunds {
                requested,
                available,
            }) => Some(serde_json::json!({
                "requested": requested,
                "available": available
            })),
            _ => None,
        }
    }

    fn severity(&self) -> crate::errors::ErrorSeverity {
        use crate::errors::ErrorSeverity;
        match self {
            SessionError::StoragePoisoned
            | SessionError::Inconsistent(_)
            | SessionError::Game(GameError::DeckExhausted) => ErrorSeverity::Critical,
            SessionError::Wallet(
                WalletError::RuntimeUnavailable | WalletError::Rejected { .. },
            ) => ErrorSeverity::Server,
            _ => ErrorSeverity::Client,
        }
    }
}
