use crate::session::{SessionId, SessionManager};
use serde::Deserialize;
use std::sync::Arc;
use warp::http::StatusCode;
use warp::reply::Response;

use super::respond;

#[derive(Debug, Deserialize)]
pub struct BetRequest {
    pub amount: u64,
}

/// Starts a new game.
///
/// # HTTP Method and Path
/// - **Method**: POST
/// - **Path**: `/api/sessions`
///
/// # Response Format
/// - **Success (201 Created)**:
/// ```json
/// { "session_id": "uuid-string", "bank": 1000 }
/// ```
/// - **Error (500)**: `session_storage_error` when the registry lock is poisoned
pub async fn create_session(sessions: Arc<SessionManager>) -> Response {
    respond(StatusCode::CREATED, sessions.create_session())
}

/// Returns the player-safe view of a game.
///
/// # HTTP Method and Path
/// - **Method**: GET
/// - **Path**: `/api/sessions/{session_id}`
///
/// # Response Format
/// - **Success (200 OK)**:
/// ```json
/// {
///   "session_id": "uuid",
///   "phase": "player_turn",
///   "bank": 900,
///   "current_bet": 100,
///   "player_hands": [{ "cards": [...], "value": 19, "bet": 100, ... }],
///   "active_hand": 0,
///   "dealer_hand": { "cards": [null, { "suit": "hearts", "rank": "7" }], "value": null },
///   "dealer_turn": false,
///   "history": [],
///   "net": 0,
///   "cashouts": []
/// }
/// ```
/// The dealer's hole card and total stay `null` until the dealer plays.
/// `history` is newest first and capped at `max_history_entries`.
///
/// # Error Cases
/// - `session_not_found` (404)
/// - `session_expired` (410): idle past the timeout with nothing staked and
///   no cash-out pending; the id answers `session_not_found` afterwards
pub async fn get_session(sessions: Arc<SessionManager>, session_id: SessionId) -> Response {
    respond(StatusCode::OK, sessions.status(&session_id))
}

/// Adds chips to the pending bet.
///
/// # HTTP Method and Path
/// - **Method**: POST
/// - **Path**: `/api/sessions/{session_id}/bet`
///
/// # Request Format
/// ```json
/// { "amount": 100 }
/// ```
///
/// # Response Format
/// - **Success (200 OK)**: `{ "bank": 1000, "current_bet": 100, "phase": "betting" }`
///
/// # Error Cases
/// - `invalid_bet` (400): amount is zero
/// - `insufficient_funds` (400): the total bet would exceed the bank
/// - `illegal_transition` (409): a round is in progress
pub async fn place_bet(
    sessions: Arc<SessionManager>,
    session_id: SessionId,
    request: BetRequest,
) -> Response {
    respond(StatusCode::OK, sessions.place_bet(&session_id, request.amount))
}

/// Takes the pending bet back. `POST /api/sessions/{session_id}/bet/clear`
pub async fn clear_bet(sessions: Arc<SessionManager>, session_id: SessionId) -> Response {
    respond(StatusCode::OK, sessions.clear_bet(&session_id))
}

/// Debits the bet and deals two cards each.
///
/// # HTTP Method and Path
/// - **Method**: POST
/// - **Path**: `/api/sessions/{session_id}/deal`
///
/// # Response Format
/// - **Success (200 OK)**: `{ bank, player_hand, dealer_hand, phase, outcome? }`.
///   `outcome` is present when a natural settled the round immediately.
///
/// # Error Cases
/// - `invalid_bet` (400): no bet placed
/// - `illegal_transition` (409): a round is in progress
pub async fn deal(sessions: Arc<SessionManager>, session_id: SessionId) -> Response {
    respond(StatusCode::OK, sessions.deal(&session_id))
}

/// `POST /api/sessions/{session_id}/hit`: `{ hand, busted, active_hand, bank, phase }`
pub async fn hit(sessions: Arc<SessionManager>, session_id: SessionId) -> Response {
    respond(StatusCode::OK, sessions.hit(&session_id))
}

/// Ends the active hand. Once no hand needs a decision the dealer plays out
/// and the round is settled in the same request.
///
/// - **Path**: `POST /api/sessions/{session_id}/stand`
/// - **Success (200 OK)**: `{ dealer_hand, bank, outcome?, payout?, active_hand, phase }`
pub async fn stand(sessions: Arc<SessionManager>, session_id: SessionId) -> Response {
    respond(StatusCode::OK, sessions.stand(&session_id))
}

/// `POST /api/sessions/{session_id}/double`: same body as stand plus the doubled `hand`.
pub async fn double_down(sessions: Arc<SessionManager>, session_id: SessionId) -> Response {
    respond(StatusCode::OK, sessions.double_down(&session_id))
}

pub async fn surrender(sessions: Arc<SessionManager>, session_id: SessionId) -> Response {
    respond(StatusCode::OK, sessions.surrender(&session_id))
}

pub async fn split(sessions: Arc<SessionManager>, session_id: SessionId) -> Response {
    respond(StatusCode::OK, sessions.split(&session_id))
}
