use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use crate::errors::AppError;
use crate::models::HistoricalAlert;
use crate::AppState;

const DEFAULT_LIMIT: i64 = 100;
const MAX_LIMIT: i64 = 500;

#[derive(Debug, Deserialize)]
pub struct AlertsQuery {
    pub limit: Option<i64>,
}

/// Recent insider alerts from the persistence sink, newest first.
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<AlertsQuery>,
) -> Result<Json<Vec<HistoricalAlert>>, AppError> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);
    if !(1..=MAX_LIMIT).contains(&limit) {
        return Err(AppError::BadRequest(format!(
            "limit must be between 1 and {MAX_LIMIT}"
        )));
    }

    let rows = state.store.query_recent(limit).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to query alert history");
        AppError::Unavailable("alert history unavailable".into())
    })?;
    Ok(Json(rows.into_iter().map(HistoricalAlert::from).collect()))
}
