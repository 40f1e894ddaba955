pub mod game;
pub mod health;
pub mod wallet;

pub use game::{
    clear_bet, create_session, deal, double_down, get_session, hit, place_bet, split, stand,
    surrender, BetRequest,
};
pub use health::health;
pub use wallet::{cash_out, CashoutRequest};

use crate::errors::IntoErrorResponse;
use crate::session::SessionError;
use serde::Serialize;
use warp::http::StatusCode;
use warp::reply::{self, Response};
use warp::Reply;

fn success_response<T>(status: StatusCode, body: T) -> Response
where
    T: Serialize,
{
    reply::with_status(reply::json(&body), status).into_response()
}

fn session_error(err: SessionError) -> Response {
    err.into_http_response()
}

fn respond<T: Serialize>(status: StatusCode, result: Result<T, SessionError>) -> Response {
    match result {
        Ok(body) => success_response(status, body),
        Err(err) => session_error(err),
    }
}
