use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;

use crate::{
    dtos::{CreateUserRequest, UpdateUserRequest, UserResponse},
    handlers::json_body,
    models::UserUpdate,
    AppState,
};

pub async fn create_user(
    State(state): State<AppState>,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    let user = json_body(payload)?.into_user()?;
    let user = state.stores.users.create_user(user).await?;

    tracing::info!(user_id = %user.id, external_id = %user.external_id, "User created");

    Ok((StatusCode::CREATED, Json(user.into())))
}

pub async fn list_users(
    State(state): State<AppState>,
) -> Result<Json<Vec<UserResponse>>, AppError> {
    let users = state.stores.users.list_users().await?;
    Ok(Json(users.into_iter().map(Into::into).collect()))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(external_id): Path<String>,
) -> Result<Json<UserResponse>, AppError> {
    state
        .stores
        .users
        .find_by_external_id(&external_id)
        .await?
        .map(|user| Json(user.into()))
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("User not found")))
}

pub async fn update_user(
    State(state): State<AppState>,
    Path(external_id): Path<String>,
    payload: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> Result<Json<UserResponse>, AppError> {
    let update = UserUpdate::try_from(json_body(payload)?)?;

    let user = state
        .stores
        .users
        .update_user(&external_id, update)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("User not found")))?;

    tracing::info!(user_id = %user.id, "User updated");
    Ok(Json(user.into()))
}
