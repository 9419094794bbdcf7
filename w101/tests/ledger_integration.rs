//! Integration tests for rewards, store purchases and ledger reconciliation.

mod common;

use chrono::{Duration, Utc};
use serial_test::serial;
use w101::auth::RegisterRequest;
use w101::ledger::TransactionType;
use w101::{ErrorKind, GameError};

#[tokio::test]
#[serial]
async fn test_daily_reward_once_per_day() {
    let Some(env) = common::setup().await else { return };
    let user = env.player(100).await;

    let claim = env.rewards.claim_daily(user).await.unwrap();
    assert_eq!(claim.amount, 50);
    assert_eq!(claim.balance, 150);
    assert!(claim.next_at > Utc::now());

    let err = env.rewards.claim_daily(user).await.unwrap_err();
    assert!(matches!(err, GameError::RewardNotAvailable(next) if next == claim.next_at));
    assert_eq!(err.kind(), ErrorKind::InvalidState);
    assert_eq!(env.balance(user).await, 150);

    let status = env.rewards.status(user).await.unwrap();
    assert!(!status.can_claim_daily);
    assert!(status.can_claim_ad);
}

#[tokio::test]
#[serial]
async fn test_daily_reward_opens_the_next_day() {
    let Some(env) = common::setup().await else { return };
    let user = env.player(0).await;

    sqlx::query("UPDATE users SET last_daily_reward = $1 WHERE id = $2")
        .bind(Utc::now() - Duration::days(1))
        .bind(user)
        .execute(&env.pool)
        .await
        .unwrap();

    assert!(env.rewards.claim_daily(user).await.is_ok());
}

#[tokio::test]
#[serial]
async fn test_ad_reward_cooldown() {
    let Some(env) = common::setup().await else { return };
    let user = env.player(0).await;

    let claim = env.rewards.claim_ad(user).await.unwrap();
    assert_eq!(claim.amount, 25);
    assert!(matches!(
        env.rewards.claim_ad(user).await,
        Err(GameError::RewardNotAvailable(_))
    ));

    sqlx::query("UPDATE users SET last_ad_reward = $1 WHERE id = $2")
        .bind(Utc::now() - Duration::minutes(21))
        .bind(user)
        .execute(&env.pool)
        .await
        .unwrap();
    assert_eq!(env.rewards.claim_ad(user).await.unwrap().balance, 50);
}

#[tokio::test]
#[serial]
async fn test_concurrent_daily_claims_grant_once() {
    let Some(env) = common::setup().await else { return };
    let user = env.player(0).await;

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let rewards = env.rewards.clone();
            tokio::spawn(async move { rewards.claim_daily(user).await })
        })
        .collect();

    let mut granted = 0;
    for handle in handles {
        if handle.await.expect("claim task panicked").is_ok() {
            granted += 1;
        }
    }

    assert_eq!(granted, 1);
    assert_eq!(env.balance(user).await, 50);
    assert_eq!(env.ledger_rows(user).await, 1);
}

#[tokio::test]
#[serial]
async fn test_store_purchase() {
    let Some(env) = common::setup().await else { return };
    let user = env.player(10).await;

    let item_id: i64 = sqlx::query_scalar(
        "INSERT INTO shop_items (name, diamond_amount, price_local) VALUES ('Pouch', 120, 9.99) RETURNING id",
    )
    .fetch_one(&env.pool)
    .await
    .unwrap();
    let retired_id: i64 = sqlx::query_scalar(
        "INSERT INTO shop_items (name, diamond_amount, price_local, is_active)
         VALUES ('Old chest', 500, 29.99, FALSE) RETURNING id",
    )
    .fetch_one(&env.pool)
    .await
    .unwrap();

    let receipt = env.store.purchase(user, item_id).await.unwrap();
    assert_eq!(receipt.diamonds_received, 120);
    assert_eq!(receipt.balance, 130);

    let history = env.ledger.history(user, 50).await.unwrap();
    assert_eq!(history[0].transaction_type, TransactionType::Purchase);
    assert_eq!(history[0].description, "Store purchase - Pouch");

    assert_eq!(
        env.store.purchase(user, retired_id).await.unwrap_err().kind(),
        ErrorKind::InvalidState
    );
    assert!(matches!(
        env.store.purchase(user, -1).await,
        Err(GameError::ShopItemNotFound(-1))
    ));
    assert_eq!(env.balance(user).await, 130);
}

#[tokio::test]
#[serial]
async fn test_fresh_account_reconciles() {
    let Some(env) = common::setup().await else { return };
    let response = env
        .auth
        .register(RegisterRequest {
            username: format!("fresh_{}", &uuid::Uuid::new_v4().simple().to_string()[..12]),
            email: None,
            password: "secret123".to_string(),
        })
        .await
        .unwrap();

    let check = env.ledger.reconcile(response.user_id).await.unwrap();
    assert_eq!(check.balance, common::STARTING_DIAMONDS);
    assert_eq!(check.opening_balance, common::STARTING_DIAMONDS);
    assert_eq!(check.ledger_net, 0);
    assert_eq!(check.discrepancy, 0);

    env.rewards.claim_daily(response.user_id).await.unwrap();
    let check = env.ledger.reconcile(response.user_id).await.unwrap();
    assert_eq!(check.ledger_net, 50);
    assert_eq!(check.discrepancy, 0);
}

#[tokio::test]
#[serial]
async fn test_reconcile_tracks_every_ledger_change() {
    let Some(env) = common::setup().await else { return };
    let (table_id, [u1, u2, u3, u4]) = env.full_table().await;
    assert_eq!(env.ledger.reconcile(u2).await.unwrap().discrepancy, 0);

    let started = env.matches.start_match(u1, table_id).await.unwrap();
    let results = [
        common::result(u1, 30, 1),
        common::result(u2, -20, 2),
        common::result(u3, -5, 3),
        common::result(u4, 0, 4),
    ];
    env.matches
        .finish_match(u1, started.match_id, u1, &results)
        .await
        .unwrap();
    env.rewards.claim_ad(u2).await.unwrap();

    let after = env.ledger.reconcile(u2).await.unwrap();
    assert_eq!(after.balance, 500 - 20 + 25);
    assert_eq!(after.ledger_net, -20 + 25);
    assert_eq!(after.discrepancy, 0);
    for user in [u1, u3, u4] {
        assert_eq!(env.ledger.reconcile(user).await.unwrap().discrepancy, 0);
    }

    // A balance edited behind the ledger's back shows up
    sqlx::query("UPDATE users SET diamonds = diamonds + 7 WHERE id = $1")
        .bind(u3)
        .execute(&env.pool)
        .await
        .unwrap();
    assert_eq!(env.ledger.reconcile(u3).await.unwrap().discrepancy, 7);
}
