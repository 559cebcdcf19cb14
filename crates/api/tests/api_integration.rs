//! API integration tests.
//!
//! Requests run through the real router and auth middleware over a mock
//! database. Mock query results are consumed in order, so each test queues
//! exactly the rows its requests read.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::redundant_clone)]

use std::{sync::Arc, time::Duration};

use amora_api::{middleware::AppState, router as api_router};
use amora_common::config::{Config, DatabaseConfig, ServerConfig};
use amora_db::{
    entities::{app_setting, bot_global_settings, user},
    repositories::user::fixtures,
};
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
    middleware,
};
use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase};
use serde_json::Value;
use tower::ServiceExt;

fn create_test_config() -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 3000,
        },
        database: DatabaseConfig {
            url: "postgres://localhost/test".to_string(),
            max_connections: 10,
            min_connections: 1,
        },
        bots: Default::default(),
        economy: Default::default(),
        payments: Default::default(),
    }
}

fn create_test_router(db: DatabaseConnection) -> (Router, AppState) {
    let state = AppState::new(Arc::new(db), &create_test_config());
    let app = api_router()
        .layer(middleware::from_fn_with_state(
            state.clone(),
            amora_api::middleware::auth_middleware,
        ))
        .with_state(state.clone());
    (app, state)
}

fn post(uri: &str, token: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .uri(uri)
        .method("POST")
        .header("Content-Type", "application/json");
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_unknown_endpoint_returns_404() {
    let (app, _) = create_test_router(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/nonexistent/endpoint")
                .method("GET")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_balance_requires_auth() {
    let (app, _) = create_test_router(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/coins/balance")
                .method("GET")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_balance_with_token() {
    let member = fixtures::member("u1", 42);
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([[member.clone()], [member]])
        .into_connection();
    let (app, _) = create_test_router(db);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/coins/balance")
                .method("GET")
                .header("Authorization", "Bearer token_u1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["data"]["balance"], 42);
    assert_eq!(body["data"]["isPremium"], false);
}

#[tokio::test]
async fn test_banned_token_is_anonymous() {
    let banned = user::Model {
        is_banned: true,
        ..fixtures::member("u1", 42)
    };
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([[banned]])
        .into_connection();
    let (app, _) = create_test_router(db);

    let response = app
        .oneshot(post(
            "/reports/create",
            Some("token_u1"),
            r#"{"reportedId":"u2","reason":"spam"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_auto_like_rate_limited_after_three_calls() {
    let member = fixtures::member("u1", 0);
    let mut mock = MockDatabase::new(DatabaseBackend::Postgres);
    for _ in 0..3 {
        // auth lookup, then no global settings row
        mock = mock
            .append_query_results([[member.clone()]])
            .append_query_results([Vec::<bot_global_settings::Model>::new()]);
    }
    mock = mock.append_query_results([[member]]);
    let (app, _) = create_test_router(mock.into_connection());

    for _ in 0..3 {
        let response = app
            .clone()
            .oneshot(post("/bots/auto-like", Some("token_u1"), "{}"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["data"]["likedBy"], serde_json::json!([]));
    }

    let response = app
        .oneshot(post("/bots/auto-like", Some("token_u1"), "{}"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_admin_requires_staff() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([[fixtures::member("u1", 0)]])
        .into_connection();
    let (app, _) = create_test_router(db);

    let response = app
        .oneshot(post("/admin/moderation/run", Some("token_u1"), "{}"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_spend_without_balance_skips_prompt() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([[fixtures::member("u1", 5)]])
        .into_connection();
    let (app, state) = create_test_router(db);

    let response = app
        .oneshot(post(
            "/coins/spend",
            Some("token_u1"),
            r#"{"amount":10,"reason":"super_like"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "INSUFFICIENT_BALANCE");
    assert!(state.confirmations.existing("u1").await.is_none());
}

#[tokio::test]
async fn test_confirm_without_pending_returns_404() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([[fixtures::member("u1", 5)]])
        .into_connection();
    let (app, _) = create_test_router(db);

    let response = app
        .oneshot(post(
            "/coins/confirm",
            Some("token_u1"),
            r#"{"id":"01missing","accept":true}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

/// Wait until the spend request has parked on the user's gate.
async fn wait_for_prompt(state: &AppState, user_id: &str) {
    for _ in 0..200 {
        if let Some(gate) = state.confirmations.existing(user_id).await {
            if gate.pending().await.is_some() {
                return;
            }
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("spend never requested confirmation");
}

#[tokio::test]
async fn test_spend_waits_for_confirmation() {
    let member = fixtures::member("u1", 100);
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        // spend auth, confirm auth, spend's user read, conditional debit
        .append_query_results([
            [member.clone()],
            [member.clone()],
            [member],
            [fixtures::member("u1", 90)],
        ])
        .into_connection();
    let (app, state) = create_test_router(db);

    let spend = tokio::spawn(app.clone().oneshot(post(
        "/coins/spend",
        Some("token_u1"),
        r#"{"amount":10,"reason":"super_like","description":"Send a super like"}"#,
    )));

    wait_for_prompt(&state, "u1").await;
    let prompt = state
        .confirmations
        .existing("u1")
        .await
        .unwrap()
        .pending()
        .await
        .unwrap();
    assert_eq!(prompt.amount, 10);
    assert_eq!(prompt.reason, "super_like");

    let answer = serde_json::json!({ "id": prompt.id, "accept": true }).to_string();
    let response = app
        .oneshot(post("/coins/confirm", Some("token_u1"), &answer))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["data"]["delivered"], true);

    let response = spend.await.unwrap().unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["data"]["accepted"], true);
    assert_eq!(body["data"]["outcome"]["charged"], 10);
    assert_eq!(body["data"]["outcome"]["balance"], 90);

    // The finished round trip leaves no gate behind
    assert!(state.confirmations.is_empty().await);
}

#[tokio::test]
async fn test_answer_with_stale_id_is_not_delivered() {
    let member = fixtures::member("u1", 100);
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        // spend auth, stale confirm auth, decline auth
        .append_query_results([[member.clone()], [member.clone()], [member]])
        .into_connection();
    let (app, state) = create_test_router(db);

    let spend = tokio::spawn(app.clone().oneshot(post(
        "/coins/spend",
        Some("token_u1"),
        r#"{"amount":10,"reason":"super_like"}"#,
    )));
    wait_for_prompt(&state, "u1").await;

    let response = app
        .clone()
        .oneshot(post(
            "/coins/confirm",
            Some("token_u1"),
            r#"{"id":"01replaced","accept":true}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["data"]["delivered"], false);

    // Still waiting on the prompt the user actually saw
    let prompt = state
        .confirmations
        .existing("u1")
        .await
        .unwrap()
        .pending()
        .await
        .unwrap();
    let answer = serde_json::json!({ "id": prompt.id, "accept": false }).to_string();
    let response = app
        .oneshot(post("/coins/confirm", Some("token_u1"), &answer))
        .await
        .unwrap();
    assert_eq!(json_body(response).await["data"]["delivered"], true);

    let body = json_body(spend.await.unwrap().unwrap()).await;
    assert_eq!(body["data"]["accepted"], false);
}

#[tokio::test]
async fn test_declined_spend_charges_nothing() {
    let member = fixtures::member("u1", 100);
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([[member.clone()], [member]])
        .into_connection();
    let (app, state) = create_test_router(db);

    let spend = tokio::spawn(app.clone().oneshot(post(
        "/coins/spend",
        Some("token_u1"),
        r#"{"amount":10,"reason":"super_like"}"#,
    )));

    wait_for_prompt(&state, "u1").await;
    let prompt = state
        .confirmations
        .existing("u1")
        .await
        .unwrap()
        .pending()
        .await
        .unwrap();
    let answer = serde_json::json!({ "id": prompt.id, "accept": false }).to_string();
    let response = app
        .oneshot(post("/coins/confirm", Some("token_u1"), &answer))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = spend.await.unwrap().unwrap();
    let body = json_body(response).await;
    assert_eq!(body["data"]["accepted"], false);
    assert!(body["data"].get("outcome").is_none());
}

#[tokio::test]
async fn test_unlock_of_tier_feature_is_conflict() {
    let premium = user::Model {
        is_premium: true,
        ..fixtures::member("u1", 100)
    };
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([[premium]])
        .append_query_results([Vec::<app_setting::Model>::new()])
        .into_connection();
    let (app, _) = create_test_router(db);

    let response = app
        .oneshot(post(
            "/unlocks/create",
            Some("token_u1"),
            r#"{"feature":"profile_visitors"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
}
