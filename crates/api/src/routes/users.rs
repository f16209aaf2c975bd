//! Route definitions for the `/users` resource.

use axum::routing::{get, put};
use axum::Router;

use crate::handlers::users;
use crate::state::AppState;

/// Routes mounted at `/users`. All require auth.
///
/// ```text
/// GET /                -> list_users
/// GET /{id}            -> get_user
/// PUT /{id}/password   -> change_password
/// PUT /{id}/role       -> change_role
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(users::list_users))
        .route("/{id}", get(users::get_user))
        .route("/{id}/password", put(users::change_password))
        .route("/{id}/role", put(users::change_role))
}
