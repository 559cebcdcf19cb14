//! Database integration tests.
//!
//! These tests require a running `PostgreSQL` instance.
//! Run with: `cargo test --test db_integration -- --ignored`
//!
//! Environment variables:
//!   `TEST_DB_HOST` (default: localhost)
//!   `TEST_DB_PORT` (default: 5433)
//!   `TEST_DB_USER` (default: `amora_test`)
//!   `TEST_DB_PASSWORD` (default: `amora_test`)
//!   `TEST_DB_NAME` (default: `amora_test`)

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use amora_db::entities::{
    profile_like,
    user::{self, UserRole},
};
use amora_db::repositories::{CooldownRepository, LikeRepository, UserRepository};
use amora_db::test_utils::{TestDatabase, TestDbConfig};
use chrono::{Duration, Utc};
use sea_orm::{ActiveModelTrait, Set};

async fn insert_user(db: &TestDatabase, id: &str, coin_balance: i64) {
    user::ActiveModel {
        id: Set(id.to_string()),
        username: Set(id.to_string()),
        display_name: Set(None),
        gender: Set(None),
        is_bot: Set(false),
        token: Set(None),
        role: Set(UserRole::User),
        coin_balance: Set(coin_balance),
        is_premium: Set(false),
        referral_code: Set(id.to_uppercase()),
        referred_by: Set(None),
        is_banned: Set(false),
        is_hidden: Set(false),
        created_at: Set(Utc::now().into()),
    }
    .insert(db.connection())
    .await
    .unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_database_connection() {
    let result = TestDatabase::with_config(TestDbConfig::default()).await;
    assert!(result.is_ok(), "Failed to connect: {:?}", result.err());
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_concurrent_debits_never_overdraw() {
    let db = TestDatabase::create_unique().await.expect("Failed to create");
    insert_user(&db, "spender", 10).await;

    let repo = UserRepository::new(Arc::new(db.connection().clone()));
    let (a, b) = tokio::join!(
        repo.debit("spender", 10),
        repo.debit("spender", 10)
    );

    let succeeded = [a.unwrap(), b.unwrap()]
        .into_iter()
        .filter(Option::is_some)
        .count();
    assert_eq!(succeeded, 1);
    assert_eq!(repo.get_by_id("spender").await.unwrap().coin_balance, 0);

    db.drop_database().await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_capped_debit_stops_at_zero() {
    let db = TestDatabase::create_unique().await.expect("Failed to create");
    insert_user(&db, "premium", 3).await;

    let repo = UserRepository::new(Arc::new(db.connection().clone()));
    let (charged, row) = repo.debit_capped("premium", 10).await.unwrap().unwrap();
    assert_eq!(charged, 3);
    assert_eq!(row.coin_balance, 0);

    let (charged, _) = repo.debit_capped("premium", 10).await.unwrap().unwrap();
    assert_eq!(charged, 0);

    db.drop_database().await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_second_like_for_pair_is_skipped() {
    let db = TestDatabase::create_unique().await.expect("Failed to create");
    insert_user(&db, "bot", 0).await;
    insert_user(&db, "member", 0).await;

    let repo = LikeRepository::new(Arc::new(db.connection().clone()));
    let like = |id: &str| profile_like::ActiveModel {
        id: Set(id.to_string()),
        liker_id: Set("bot".to_string()),
        liked_id: Set("member".to_string()),
        is_automated: Set(true),
        created_at: Set(Utc::now().into()),
    };

    assert!(repo.create_if_absent(like("like1")).await.unwrap());
    assert!(!repo.create_if_absent(like("like2")).await.unwrap());

    db.drop_database().await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_cooldown_upsert_overwrites() {
    let db = TestDatabase::create_unique().await.expect("Failed to create");
    insert_user(&db, "bot", 0).await;
    insert_user(&db, "member", 0).await;

    let repo = CooldownRepository::new(Arc::new(db.connection().clone()));
    let earlier = Utc::now() - Duration::hours(5);
    let later = Utc::now();

    repo.upsert("bot", "member", earlier).await.unwrap();
    repo.upsert("bot", "member", later).await.unwrap();

    let record = repo.find("bot", "member").await.unwrap().unwrap();
    assert_eq!(
        record.last_interaction_at.timestamp(),
        later.timestamp()
    );

    db.drop_database().await.unwrap();
}

#[test]
fn test_database_url_format() {
    let config = TestDbConfig {
        host: "testhost".to_string(),
        port: 5432,
        username: "testuser".to_string(),
        password: "testpass".to_string(),
        database: "testdb".to_string(),
    };

    let url = config.database_url();
    assert!(url.starts_with("postgres://"));
    assert!(url.contains("testhost"));
    assert!(url.ends_with("/testdb"));
}
