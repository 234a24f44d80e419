mod common;

use common::{spawn_app, token};
use serde_json::{json, Value};

// --- Registration Tests ---

#[tokio::test]
async fn register_returns_201_with_tokens_and_profile() {
    let app = spawn_app().await;

    let response = app.register("a@x.com", "pw123456").await;
    assert_eq!(201, response.status().as_u16());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body.get("access_token").is_some());
    assert!(body.get("refresh_token").is_some());
    assert_eq!(body["token_type"], "Bearer");
    assert_eq!(body["expires_in"], 900);
    assert_eq!(body["user"]["email"], "a@x.com");
    assert_eq!(body["user"]["role"], "user");
}

#[tokio::test]
async fn register_returns_400_for_invalid_input() {
    let app = spawn_app().await;

    let cases = vec![
        (json!({"email": "notanemail", "password": "pw123456"}), "invalid email"),
        (json!({"email": "user@", "password": "pw123456"}), "truncated email"),
        (json!({"email": "a@x.com", "password": "abc"}), "short password"),
    ];

    for (body, reason) in cases {
        let response = app.post_json("/auth/register", &body).await;
        assert_eq!(400, response.status().as_u16(), "Should reject {}", reason);
    }
}

#[tokio::test]
async fn register_returns_400_for_missing_fields() {
    let app = spawn_app().await;

    let cases = vec![
        (json!({"password": "pw123456"}), "missing email"),
        (json!({"email": "a@x.com"}), "missing password"),
        (json!({}), "missing all fields"),
    ];

    for (body, reason) in cases {
        let response = app.post_json("/auth/register", &body).await;
        assert_eq!(400, response.status().as_u16(), "Should reject {}", reason);
    }
}

#[tokio::test]
async fn register_returns_409_for_duplicate_email() {
    let app = spawn_app().await;

    assert_eq!(201, app.register("a@x.com", "pw123456").await.status().as_u16());

    let response = app.register("A@X.com", "other-password").await;
    assert_eq!(409, response.status().as_u16());

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "EMAIL_TAKEN");

    // The first password still works
    assert_eq!(200, app.login("a@x.com", "pw123456").await.status().as_u16());
}

// --- Login Tests ---

#[tokio::test]
async fn login_returns_200_for_valid_credentials() {
    let app = spawn_app().await;
    app.register("a@x.com", "pw123456").await;

    let response = app.login("a@x.com", "pw123456").await;
    assert_eq!(200, response.status().as_u16());

    let body: Value = response.json().await.unwrap();
    assert!(body.get("access_token").is_some());
    assert!(body.get("refresh_token").is_some());
    assert_eq!(body["user"]["email"], "a@x.com");
}

#[tokio::test]
async fn login_does_not_reveal_which_credential_was_wrong() {
    let app = spawn_app().await;
    app.register("a@x.com", "pw123456").await;

    let wrong_password = app.login("a@x.com", "wrong-password").await;
    let unknown_email = app.login("b@x.com", "pw123456").await;

    assert_eq!(401, wrong_password.status().as_u16());
    assert_eq!(401, unknown_email.status().as_u16());

    let first: Value = wrong_password.json().await.unwrap();
    let second: Value = unknown_email.json().await.unwrap();
    assert_eq!(first["code"], "INVALID_CREDENTIALS");
    assert_eq!(first["code"], second["code"]);
    assert_eq!(first["message"], second["message"]);
}

#[tokio::test]
async fn login_invalidates_previous_access_tokens() {
    let app = spawn_app().await;
    let registered: Value = app.register("a@x.com", "pw123456").await.json().await.unwrap();
    let old_access = token(&registered, "access_token");

    assert_eq!(200, app.get_me(&old_access).await.status().as_u16());

    let logged_in: Value = app.login("a@x.com", "pw123456").await.json().await.unwrap();
    let new_access = token(&logged_in, "access_token");

    assert_eq!(401, app.get_me(&old_access).await.status().as_u16());
    assert_eq!(200, app.get_me(&new_access).await.status().as_u16());
}

// --- Protected Route Tests ---

#[tokio::test]
async fn protected_route_returns_401_without_token() {
    let app = spawn_app().await;

    let response = app
        .client
        .get(&format!("{}/users/me", app.address))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(401, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "MISSING_TOKEN");
}

#[tokio::test]
async fn protected_route_rejects_malformed_authorization_header() {
    let app = spawn_app().await;

    for header in ["Token abc", "Bearer", "Bearer not.a.jwt"] {
        let response = app
            .client
            .get(&format!("{}/users/me", app.address))
            .header("Authorization", header)
            .send()
            .await
            .expect("Failed to execute request.");

        assert_eq!(401, response.status().as_u16(), "header {:?}", header);
    }
}

#[tokio::test]
async fn refresh_token_is_not_an_access_token() {
    let app = spawn_app().await;
    let body: Value = app.register("a@x.com", "pw123456").await.json().await.unwrap();

    let response = app.get_me(&token(&body, "refresh_token")).await;
    assert_eq!(401, response.status().as_u16());
}

#[tokio::test]
async fn get_current_user_returns_profile() {
    let app = spawn_app().await;
    let body: Value = app.register("a@x.com", "pw123456").await.json().await.unwrap();

    let response = app.get_me(&token(&body, "access_token")).await;
    assert_eq!(200, response.status().as_u16());

    let profile: Value = response.json().await.unwrap();
    assert_eq!(profile["email"], "a@x.com");
    assert_eq!(profile["id"], body["user"]["id"]);
    assert!(profile.get("created_at").is_some());
    assert!(profile.get("updated_at").is_some());
    assert!(profile.get("password_hash").is_none());
}

// --- Refresh Tests ---

#[tokio::test]
async fn refresh_rotates_tokens() {
    let app = spawn_app().await;
    let registered: Value = app.register("a@x.com", "pw123456").await.json().await.unwrap();
    let old_refresh = token(&registered, "refresh_token");

    let response = app.refresh(&old_refresh).await;
    assert_eq!(200, response.status().as_u16());

    let body: Value = response.json().await.unwrap();
    let new_refresh = token(&body, "refresh_token");
    assert_ne!(old_refresh, new_refresh, "Refresh token should be rotated on each refresh");
    assert!(body.get("user").is_none());

    // Rotation keeps the epoch, so the new access token is live
    let new_access = token(&body, "access_token");
    assert_eq!(200, app.get_me(&new_access).await.status().as_u16());
}

#[tokio::test]
async fn refresh_returns_invalid_refresh_for_garbage_token() {
    let app = spawn_app().await;

    let response = app.refresh("definitely_not_a_valid_token").await;
    assert_eq!(401, response.status().as_u16());

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "INVALID_REFRESH");
}

#[tokio::test]
async fn refresh_returns_400_for_missing_token() {
    let app = spawn_app().await;

    let response = app.post_json("/auth/refresh", &json!({})).await;
    assert_eq!(400, response.status().as_u16());
}

#[tokio::test]
async fn replayed_refresh_token_terminates_session() {
    let app = spawn_app().await;
    let registered: Value = app.register("a@x.com", "pw123456").await.json().await.unwrap();
    let r0 = token(&registered, "refresh_token");

    let rotated: Value = app.refresh(&r0).await.json().await.unwrap();
    let a1 = token(&rotated, "access_token");
    let r1 = token(&rotated, "refresh_token");

    let replay = app.refresh(&r0).await;
    assert_eq!(401, replay.status().as_u16());
    let body: Value = replay.json().await.unwrap();
    assert_eq!(body["code"], "SESSION_TERMINATED");

    // Everything from the torn-down session is dead
    let follow_up: Value = app.refresh(&r1).await.json().await.unwrap();
    assert_eq!(follow_up["code"], "SESSION_TERMINATED");
    assert_eq!(401, app.get_me(&a1).await.status().as_u16());

    // A fresh login recovers
    assert_eq!(200, app.login("a@x.com", "pw123456").await.status().as_u16());
}

// --- Logout Tests ---

#[tokio::test]
async fn logout_ends_session() {
    let app = spawn_app().await;
    let registered: Value = app.register("a@x.com", "pw123456").await.json().await.unwrap();
    let access = token(&registered, "access_token");
    let refresh = token(&registered, "refresh_token");

    let response = app.logout(&access).await;
    assert_eq!(200, response.status().as_u16());

    assert_eq!(401, app.get_me(&access).await.status().as_u16());

    let body: Value = app.refresh(&refresh).await.json().await.unwrap();
    assert_eq!(body["code"], "SESSION_TERMINATED");
}

#[tokio::test]
async fn logout_requires_token() {
    let app = spawn_app().await;

    let response = app
        .client
        .post(&format!("{}/auth/logout", app.address))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(401, response.status().as_u16());
}
