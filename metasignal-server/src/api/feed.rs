use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use metasignal_core::store::{FeedPage, StoreError};
use metasignal_sdk::objects::{FeedEvent, FeedQuery, FeedResponse};

use super::error_response;
use crate::state::AppState;

#[derive(Debug)]
pub(super) enum FeedApiError {
    Store(StoreError),
}

impl IntoResponse for FeedApiError {
    fn into_response(self) -> axum::response::Response {
        match self {
            FeedApiError::Store(e) => {
                tracing::error!(error = %e, "Feed API store error");
                error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
            }
        }
    }
}

/// `GET /feed?address=&offset=&limit=`: oldest entry first.
///
/// An address without entries (registered or not) gets an empty feed.
pub(super) async fn get_feed(
    state: State<AppState>,
    Query(query): Query<FeedQuery>,
) -> Result<Json<FeedResponse>, FeedApiError> {
    let page = FeedPage::new(query.offset, query.limit);
    let entries = state
        .feeds
        .get_feed(query.address, page)
        .await
        .map_err(FeedApiError::Store)?;

    Ok(Json(FeedResponse {
        events: entries.iter().map(FeedEvent::from).collect(),
    }))
}
