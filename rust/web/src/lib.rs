//! HTTP front end for the blackjack engine.
//!
//! The [`SessionManager`] owns one [`blackjack_engine::engine::Engine`] per
//! player and serializes requests on each of them; [`WebServer`] exposes the
//! games as a JSON API over warp.

pub mod config;
pub mod errors;
pub mod handlers;
pub mod logging;
pub mod middleware;
pub mod server;
pub mod session;
pub mod wallet;

pub use config::{BlackjackConfig, ConfigError, GameSettings, ServerSettings, WalletSettings};
pub use errors::{ErrorResponse, ErrorSeverity, IntoErrorResponse};
pub use logging::{init_logging, init_test_logging, LogEntry, TestLogSubscriber};
pub use middleware::{log_response, with_request_logging};
pub use server::{AppContext, ServerConfig, ServerError, ServerHandle, WebServer};
pub use session::{
    BetResponse, CashoutResponse, CreatedSession, DealResponse, DoubleResponse, GameSession,
    HitResponse, SessionError, SessionId, SessionManager, SessionStatus, SplitResponse,
    StandResponse, SurrenderResponse,
};
pub use wallet::{PaymentGateway, PayoutRequest, SettlementFuture, StubGateway, WalletError};
