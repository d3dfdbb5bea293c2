//! Registration and follow graph endpoints.

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use metasignal_core::store::RegistryError;
use metasignal_sdk::objects::{
    FollowRequest, FollowResponse, FollowsQuery, RegisterRequest, RegisterResponse,
};

use super::error_response;
use crate::state::AppState;

#[derive(Debug)]
pub(super) struct UserApiError(RegistryError);

impl From<RegistryError> for UserApiError {
    fn from(e: RegistryError) -> Self {
        Self(e)
    }
}

impl IntoResponse for UserApiError {
    fn into_response(self) -> axum::response::Response {
        match self.0 {
            e @ RegistryError::NotRegistered(_) => error_response(StatusCode::NOT_FOUND, e),
            e @ RegistryError::SelfFollow => error_response(StatusCode::BAD_REQUEST, e),
            RegistryError::Store(e) => {
                tracing::error!(error = %e, "User API store error");
                error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
            }
        }
    }
}

/// `POST /register`. Registering twice is not an error.
pub(super) async fn register(
    state: State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<impl IntoResponse, UserApiError> {
    let created = state.registry.register(request.address).await?;
    if created {
        tracing::info!(address = %request.address, "Registered subscriber");
    }
    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((
        status,
        Json(RegisterResponse {
            success: true,
            address: request.address,
            created,
        }),
    ))
}

/// `POST /follow`. Following the same actor twice is a no-op.
pub(super) async fn follow(
    state: State<AppState>,
    Json(request): Json<FollowRequest>,
) -> Result<Json<FollowResponse>, UserApiError> {
    let follows = state
        .registry
        .follow(request.address, request.follow)
        .await?;
    Ok(Json(FollowResponse {
        success: true,
        follows,
    }))
}

/// `POST /unfollow`
pub(super) async fn unfollow(
    state: State<AppState>,
    Json(request): Json<FollowRequest>,
) -> Result<Json<FollowResponse>, UserApiError> {
    let follows = state
        .registry
        .unfollow(request.address, request.follow)
        .await?;
    Ok(Json(FollowResponse {
        success: true,
        follows,
    }))
}

/// `GET /follows?address=`
pub(super) async fn list_follows(
    state: State<AppState>,
    Query(query): Query<FollowsQuery>,
) -> Result<Json<FollowResponse>, UserApiError> {
    let follows = state.registry.follows(query.address).await?;
    Ok(Json(FollowResponse {
        success: true,
        follows,
    }))
}
