//! Diamond shop purchases.

use super::manager::DiamondLedger;
use super::models::{LedgerDelta, PurchaseReceipt, ShopItem, TransactionType};
use crate::auth::UserId;
use crate::db::timeouts::with_transaction_timeout;
use crate::errors::{GameError, GameResult};
use sqlx::PgPool;

#[derive(Clone)]
pub struct StoreManager {
    pool: PgPool,
    ledger: DiamondLedger,
}

impl StoreManager {
    pub fn new(pool: PgPool, ledger: DiamondLedger) -> Self {
        Self { pool, ledger }
    }

    /// Buy a shop item: credits its diamonds and records the purchase
    /// atomically. Payment capture happens upstream of this call.
    pub async fn purchase(
        &self,
        user_id: UserId,
        shop_item_id: i64,
    ) -> GameResult<PurchaseReceipt> {
        with_transaction_timeout(self.run_purchase(user_id, shop_item_id)).await
    }

    async fn run_purchase(
        &self,
        user_id: UserId,
        shop_item_id: i64,
    ) -> GameResult<PurchaseReceipt> {
        let mut tx = self.pool.begin().await?;

        let item = sqlx::query_as::<_, ShopItem>(
            "SELECT id, name, diamond_amount, price_local, is_active
             FROM shop_items WHERE id = $1",
        )
        .bind(shop_item_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(GameError::ShopItemNotFound(shop_item_id))?;

        if !item.is_active {
            return Err(GameError::InvalidState(format!(
                "{} is no longer for sale",
                item.name
            )));
        }

        let delta = LedgerDelta::credit(
            user_id,
            item.diamond_amount,
            TransactionType::Purchase,
            format!("Store purchase - {}", item.name),
        );
        let receipt = self.ledger.apply_delta(&mut tx, &delta).await?;

        let purchase_id: i64 = sqlx::query_scalar(
            "INSERT INTO purchases (user_id, shop_item_id, amount_paid, diamonds_received)
             VALUES ($1, $2, $3, $4)
             RETURNING id",
        )
        .bind(user_id)
        .bind(item.id)
        .bind(item.price_local)
        .bind(item.diamond_amount)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        log::info!(
            "User {} bought '{}', received {} diamonds",
            user_id,
            item.name,
            item.diamond_amount
        );

        Ok(PurchaseReceipt {
            purchase_id,
            item_name: item.name,
            diamonds_received: item.diamond_amount,
            balance: receipt.balance_after,
        })
    }
}
