//! Handlers for the `/auth` resource (login, sign-up, current user).

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use validator::Validate;
use warden_core::authz::ResourceContext;
use warden_core::credentials::Credentials;
use warden_core::identity::StoredIdentity;
use warden_core::types::{DbId, Timestamp};

use crate::error::{AppError, AppResult};
use crate::extract::AppJson;
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::{authorize, Operation};
use crate::services::SignUpProfile;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /auth/signup`.
#[derive(Debug, Deserialize, Validate)]
pub struct SignUpRequest {
    pub login_id: String,
    pub password: String,
    #[validate(length(min = 1, max = 100, message = "display_name must be 1-100 characters"))]
    pub display_name: Option<String>,
}

/// Successful login response.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: &'static str,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
    pub user: UserResponse,
}

/// Public view of a stored identity. Never includes the password hash.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: DbId,
    pub login_id: String,
    pub role: String,
    pub display_name: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<StoredIdentity> for UserResponse {
    fn from(identity: StoredIdentity) -> Self {
        Self {
            id: identity.id,
            login_id: identity.login_id,
            role: identity.role,
            display_name: identity.display_name,
            created_at: identity.created_at,
            updated_at: identity.updated_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/auth/login
///
/// Authenticate with login id + password. Unknown login ids and wrong
/// passwords produce the same 401 response.
pub async fn login(
    State(state): State<AppState>,
    AppJson(input): AppJson<Credentials>,
) -> AppResult<Json<LoginResponse>> {
    let outcome = state.users.login(&input).await?;

    Ok(Json(LoginResponse {
        access_token: outcome.access_token,
        token_type: "Bearer",
        expires_in: outcome.expires_in,
        user: outcome.identity.into(),
    }))
}

/// POST /api/v1/auth/signup
///
/// Create an identity with the default role. Returns 201 Created.
pub async fn signup(
    State(state): State<AppState>,
    AppJson(input): AppJson<SignUpRequest>,
) -> AppResult<(StatusCode, Json<UserResponse>)> {
    input
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let credentials = Credentials::new(input.login_id, input.password);
    let identity = state
        .users
        .sign_up(
            &credentials,
            SignUpProfile {
                display_name: input.display_name,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(identity.into())))
}

/// GET /api/v1/auth/me
pub async fn me(State(state): State<AppState>, user: AuthUser) -> AppResult<Json<UserResponse>> {
    authorize(&state, &user, Operation::ViewSelf, &ResourceContext::none())?;
    let identity = state.users.find(user.user_id).await?;
    Ok(Json(identity.into()))
}
