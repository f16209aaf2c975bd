//! HTTP-level integration tests for the `/users` resource and its policies.

mod common;

use axum::http::StatusCode;
use common::{body_json, get_auth, login, put_json_auth, sign_up, ADMIN_LOGIN, ADMIN_PASSWORD};
use serde_json::json;

const PASSWORD: &str = "correct-horse-battery";

/// Sign up `login_id` and return `(id, token)`.
async fn user_with_token(t: &common::TestApp, login_id: &str) -> (i64, String) {
    let created = sign_up(t.app(), login_id, PASSWORD).await;
    let id = created["id"].as_i64().expect("id should be numeric");
    (id, login(t.app(), login_id, PASSWORD).await)
}

// ---------------------------------------------------------------------------
// Listing and viewing
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_admin_lists_users() {
    let t = common::build_test_app().await;
    sign_up(t.app(), "alice", PASSWORD).await;
    let admin = login(t.app(), ADMIN_LOGIN, ADMIN_PASSWORD).await;

    let response = get_auth(t.app(), "/api/v1/users", &admin).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    let logins: Vec<&str> = json
        .as_array()
        .expect("array")
        .iter()
        .filter_map(|u| u["login_id"].as_str())
        .collect();
    assert_eq!(logins, vec![ADMIN_LOGIN, "alice"]);
}

#[tokio::test]
async fn test_non_admin_cannot_list_users() {
    let t = common::build_test_app().await;
    let (_, token) = user_with_token(&t, "alice").await;

    let response = get_auth(t.app(), "/api/v1/users", &token).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await["error"], "Forbidden");
}

#[tokio::test]
async fn test_user_views_self_but_not_others() {
    let t = common::build_test_app().await;
    let (alice_id, alice) = user_with_token(&t, "alice").await;
    let (bob_id, _) = user_with_token(&t, "bob").await;

    let own = get_auth(t.app(), &format!("/api/v1/users/{alice_id}"), &alice).await;
    assert_eq!(own.status(), StatusCode::OK);

    let other = get_auth(t.app(), &format!("/api/v1/users/{bob_id}"), &alice).await;
    assert_eq!(other.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_admin_views_missing_user_is_404() {
    let t = common::build_test_app().await;
    let admin = login(t.app(), ADMIN_LOGIN, ADMIN_PASSWORD).await;

    let response = get_auth(t.app(), "/api/v1/users/9999", &admin).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Password changes
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_owner_changes_password() {
    let t = common::build_test_app().await;
    let (id, token) = user_with_token(&t, "alice").await;

    let response = put_json_auth(
        t.app(),
        &format!("/api/v1/users/{id}/password"),
        json!({ "current_password": PASSWORD, "new_password": "a-brand-new-password" }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    login(t.app(), "alice", "a-brand-new-password").await;
}

#[tokio::test]
async fn test_password_change_with_wrong_current_is_400() {
    let t = common::build_test_app().await;
    let (id, token) = user_with_token(&t, "alice").await;

    let response = put_json_auth(
        t.app(),
        &format!("/api/v1/users/{id}/password"),
        json!({ "current_password": "wrong-current-pass", "new_password": "a-brand-new-password" }),
        &token,
    )
    .await;
    // The bearer token is fine; only the submitted password is wrong.
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");
    assert_eq!(json["error"], "Current password is incorrect");

    let response = get_auth(t.app(), "/api/v1/auth/me", &token).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_admin_cannot_change_someone_elses_password() {
    let t = common::build_test_app().await;
    let (id, _) = user_with_token(&t, "alice").await;
    let admin = login(t.app(), ADMIN_LOGIN, ADMIN_PASSWORD).await;

    let response = put_json_auth(
        t.app(),
        &format!("/api/v1/users/{id}/password"),
        json!({ "current_password": PASSWORD, "new_password": "a-brand-new-password" }),
        &admin,
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

// ---------------------------------------------------------------------------
// Role changes
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_admin_promotes_user() {
    let t = common::build_test_app().await;
    let (id, old_token) = user_with_token(&t, "alice").await;
    let admin = login(t.app(), ADMIN_LOGIN, ADMIN_PASSWORD).await;

    let response = put_json_auth(
        t.app(),
        &format!("/api/v1/users/{id}/role"),
        json!({ "role": "admin" }),
        &admin,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["role"], "admin");

    // Existing tokens keep their role claim until they expire.
    let response = get_auth(t.app(), "/api/v1/users", &old_token).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let fresh = login(t.app(), "alice", PASSWORD).await;
    let response = get_auth(t.app(), "/api/v1/users", &fresh).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_admin_cannot_change_own_role() {
    let t = common::build_test_app().await;
    let admin = login(t.app(), ADMIN_LOGIN, ADMIN_PASSWORD).await;
    let me = body_json(get_auth(t.app(), "/api/v1/auth/me", &admin).await).await;
    let id = me["id"].as_i64().expect("id should be numeric");

    let response = put_json_auth(
        t.app(),
        &format!("/api/v1/users/{id}/role"),
        json!({ "role": "user" }),
        &admin,
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_unknown_role_is_400() {
    let t = common::build_test_app().await;
    let (id, _) = user_with_token(&t, "alice").await;
    let admin = login(t.app(), ADMIN_LOGIN, ADMIN_PASSWORD).await;

    let response = put_json_auth(
        t.app(),
        &format!("/api/v1/users/{id}/role"),
        json!({ "role": "superuser" }),
        &admin,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_user_cannot_change_roles() {
    let t = common::build_test_app().await;
    let (id, token) = user_with_token(&t, "alice").await;

    let response = put_json_auth(
        t.app(),
        &format!("/api/v1/users/{id}/role"),
        json!({ "role": "admin" }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
