use crate::session::{SessionId, SessionManager};
use serde::Deserialize;
use std::sync::Arc;
use warp::http::StatusCode;
use warp::reply::Response;

use super::respond;

#[derive(Debug, Deserialize)]
pub struct CashoutRequest {
    #[serde(alias = "playerPkh")]
    pub destination: String,
    pub amount: u64,
}

/// Withdraws chips to an external destination.
///
/// # HTTP Method and Path
/// - **Method**: POST
/// - **Path**: `/api/sessions/{session_id}/cashout`
///
/// # Request Format
/// ```json
/// { "destination": "addr_test1...", "amount": 250 }
/// ```
///
/// # Response Format
/// - **Success (202 Accepted)**: `{ "cashout_id": 1, "bank": 750, "status": "pending" }`.
///   The amount is debited immediately; the final status appears in the
///   session's `cashouts` once the payment settles, and a failed payout is
///   credited back.
///
/// # Error Cases
/// - `invalid_cashout` (400): amount is zero
/// - `insufficient_funds` (400): more than the bank minus the pending bet
/// - `illegal_transition` (409): a round is in progress
/// - `cashout_disabled` (403)
pub async fn cash_out(
    sessions: Arc<SessionManager>,
    session_id: SessionId,
    request: CashoutRequest,
) -> Response {
    respond(
        StatusCode::ACCEPTED,
        sessions.cash_out(&session_id, request.destination, request.amount),
    )
}
