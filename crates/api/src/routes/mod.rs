pub mod auth;
pub mod health;
pub mod users;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /auth/login                    login (public)
/// /auth/signup                   sign-up (public)
/// /auth/me                       current user (requires auth)
///
/// /users                         list (admin only)
/// /users/{id}                    get (owner or admin)
/// /users/{id}/password           change password (owner only)
/// /users/{id}/role               change role (admin, not self)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/users", users::router())
}
