use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::jwt::AuthUser,
    error::ApiError,
    state::AppState,
    users::{
        dto::{ListQuery, PublicUser, StatusMessage, UserUpdate},
        service,
    },
};

pub fn user_routes() -> Router<AppState> {
    Router::new().nest(
        "/users",
        Router::new()
            .route("/me", get(get_me))
            .route("/", get(list_users))
            .route(
                "/:id",
                get(get_user).put(update_user).delete(deactivate_user),
            ),
    )
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(email): AuthUser,
) -> Result<Json<PublicUser>, ApiError> {
    let user = service::get_current_user(&state, &email).await?;
    Ok(Json(user))
}

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    AuthUser(_email): AuthUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<PublicUser>>, ApiError> {
    let users = service::list_users(&state, query.department, query.active).await?;
    Ok(Json(users))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    AuthUser(_email): AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<PublicUser>, ApiError> {
    let user = service::get_user(&state, id).await?;
    Ok(Json(user))
}

#[instrument(skip(state, patch))]
pub async fn update_user(
    State(state): State<AppState>,
    AuthUser(_email): AuthUser,
    Path(id): Path<i64>,
    Json(patch): Json<UserUpdate>,
) -> Result<Json<PublicUser>, ApiError> {
    let user = service::update_user(&state, id, patch).await?;
    Ok(Json(user))
}

#[instrument(skip(state))]
pub async fn deactivate_user(
    State(state): State<AppState>,
    AuthUser(_email): AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<StatusMessage>, ApiError> {
    let confirmation = service::deactivate_user(&state, id).await?;
    Ok(Json(confirmation))
}
