//! Handlers for the `/users` resource.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use warden_core::authz::ResourceContext;
use warden_core::types::DbId;

use super::auth::UserResponse;
use crate::error::AppResult;
use crate::extract::AppJson;
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::{authorize, Operation};
use crate::state::AppState;

/// Request body for `PUT /users/{id}/password`.
#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// Request body for `PUT /users/{id}/role`.
#[derive(Debug, Deserialize)]
pub struct ChangeRoleRequest {
    pub role: String,
}

/// A user record is owned by the user it describes.
fn target(id: DbId) -> ResourceContext {
    ResourceContext::owned_by(id.to_string())
}

/// GET /api/v1/users
pub async fn list_users(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<Vec<UserResponse>>> {
    authorize(&state, &user, Operation::ListUsers, &ResourceContext::none())?;
    let users = state.users.list().await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

/// GET /api/v1/users/{id}
pub async fn get_user(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<UserResponse>> {
    authorize(&state, &user, Operation::ViewUser, &target(id))?;
    let identity = state.users.find(id).await?;
    Ok(Json(identity.into()))
}

/// PUT /api/v1/users/{id}/password
///
/// Only the owner may change a password, and only with the current one.
pub async fn change_password(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
    AppJson(input): AppJson<ChangePasswordRequest>,
) -> AppResult<StatusCode> {
    authorize(&state, &user, Operation::ChangePassword, &target(id))?;
    state
        .users
        .change_password(id, &input.current_password, &input.new_password)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/v1/users/{id}/role
pub async fn change_role(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
    AppJson(input): AppJson<ChangeRoleRequest>,
) -> AppResult<Json<UserResponse>> {
    authorize(&state, &user, Operation::ChangeRole, &target(id))?;
    let updated = state.users.change_role(id, input.role.trim()).await?;
    Ok(Json(updated.into()))
}
