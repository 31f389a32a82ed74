use async_trait::async_trait;
use sqlx::PgPool;

use super::AlertStore;
use crate::models::{NewSuspiciousTrade, SuspiciousTradeRow};

/// Insert a new suspicious trade record.
pub async fn insert_suspicious_trade(
    pool: &PgPool,
    row: &NewSuspiciousTrade,
) -> anyhow::Result<SuspiciousTradeRow> {
    let inserted = sqlx::query_as::<_, SuspiciousTradeRow>(
        r#"
        INSERT INTO suspicious_trades (tx_hash, wallet_address, market_slug, amount_usd, wallet_age_hours)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(row.tx_hash.as_deref())
    .bind(&row.wallet_address)
    .bind(&row.market_slug)
    .bind(row.amount_usd)
    .bind(row.wallet_age_hours)
    .fetch_one(pool)
    .await?;

    Ok(inserted)
}

/// Get the N most recent suspicious trades, newest first.
pub async fn get_recent_suspicious_trades(
    pool: &PgPool,
    limit: i64,
) -> anyhow::Result<Vec<SuspiciousTradeRow>> {
    let rows = sqlx::query_as::<_, SuspiciousTradeRow>(
        "SELECT * FROM suspicious_trades ORDER BY timestamp DESC, id DESC LIMIT $1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Postgres-backed [`AlertStore`].
#[derive(Debug, Clone)]
pub struct PgAlertStore {
    pool: PgPool,
}

impl PgAlertStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AlertStore for PgAlertStore {
    async fn append(&self, row: &NewSuspiciousTrade) -> anyhow::Result<SuspiciousTradeRow> {
        insert_suspicious_trade(&self.pool, row).await
    }

    async fn query_recent(&self, limit: i64) -> anyhow::Result<Vec<SuspiciousTradeRow>> {
        get_recent_suspicious_trades(&self.pool, limit).await
    }

    async fn ping(&self) -> anyhow::Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
