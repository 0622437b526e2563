use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use tracing::instrument;

use crate::{
    auth::dto::{LoginRequest, RegisterRequest, TokenResponse},
    error::ApiError,
    state::AppState,
    users::{dto::PublicUser, service},
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/registro", post(register))
        .route("/auth/login", post(login))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<PublicUser>), ApiError> {
    let user = service::register(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let token = service::authenticate(&state, payload).await?;
    Ok(Json(token))
}
