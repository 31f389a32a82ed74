use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Url};

use super::types::ApiActivity;
use crate::intelligence::{FirstSeenLookup, LookupError};

pub const DATA_API_BASE: &str = "https://data-api.polymarket.com";

/// Polymarket Data API client, used as the slow path for wallet age.
#[derive(Debug, Clone)]
pub struct DataClient {
    http: Client,
    base_url: String,
}

impl DataClient {
    pub fn with_base_url(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Fetch the oldest recorded activity for a wallet, if any.
    pub async fn get_earliest_activity(
        &self,
        wallet: &str,
    ) -> Result<Option<ApiActivity>, LookupError> {
        let url = Url::parse_with_params(
            &format!("{}/activity", self.base_url),
            &[
                ("user", wallet),
                ("limit", "1"),
                ("sortBy", "TIMESTAMP"),
                ("sortDirection", "ASC"),
            ],
        )
        .map_err(|e| LookupError::Unavailable(format!("bad data API URL: {e}")))?;

        let resp = self
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()?;

        let activity: Vec<ApiActivity> = resp.json().await?;
        Ok(activity.into_iter().min_by_key(|a| a.timestamp))
    }
}

#[async_trait]
impl FirstSeenLookup for DataClient {
    /// A wallet with no recorded activity is treated as first seen now: the
    /// trade being classified is its first.
    async fn first_seen(&self, wallet: &str) -> Result<DateTime<Utc>, LookupError> {
        match self.get_earliest_activity(wallet).await? {
            Some(activity) => DateTime::from_timestamp(activity.timestamp, 0)
                .ok_or(LookupError::InvalidTimestamp(activity.timestamp)),
            None => Ok(Utc::now()),
        }
    }
}
