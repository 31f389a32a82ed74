pub mod suspicious_trade_repo;

pub use suspicious_trade_repo::PgAlertStore;

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::models::{NewSuspiciousTrade, SuspiciousTradeRow};

pub async fn init_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;

    // Verify connectivity
    sqlx::query("SELECT 1").execute(&pool).await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}

/// Append-only store of insider verdicts.
#[async_trait]
pub trait AlertStore: Send + Sync {
    async fn append(&self, row: &NewSuspiciousTrade) -> anyhow::Result<SuspiciousTradeRow>;

    /// Most recent rows first.
    async fn query_recent(&self, limit: i64) -> anyhow::Result<Vec<SuspiciousTradeRow>>;

    async fn ping(&self) -> anyhow::Result<()>;
}
