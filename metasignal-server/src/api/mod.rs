//! HTTP API handlers.
//!
//! # Endpoints
//!
//! - `POST /register`               – register a subscriber address
//! - `POST /follow`                 – follow an actor
//! - `POST /unfollow`               – stop following an actor
//! - `GET  /follows`                – list followed actors
//! - `GET  /feed`                   – page through a subscriber's feed
//! - `POST /quote`                  – quote a swap against given reserves
//! - `GET  /pools/{address}/quote`  – quote a swap against live reserves

use axum::{
    Json, Router,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use metasignal_sdk::objects::ErrorResponse;

use crate::state::AppState;

mod feed;
mod quote;
mod user;

/// Build the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(user::register))
        .route("/follow", post(user::follow))
        .route("/unfollow", post(user::unfollow))
        .route("/follows", get(user::list_follows))
        .route("/feed", get(feed::get_feed))
        .route("/quote", post(quote::quote))
        .route("/pools/{address}/quote", get(quote::pool_quote))
}

fn error_response(status: StatusCode, error: impl ToString) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
        .into_response()
}
