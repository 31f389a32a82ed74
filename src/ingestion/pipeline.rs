use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, histogram};

use crate::db::AlertStore;
use crate::hub::AlertPublisher;
use crate::ingestion::normalizer::normalize;
use crate::intelligence::{AgeResolver, RiskThresholds};
use crate::models::{Alert, NewSuspiciousTrade, RawEvent, SuspiciousTradeRow};

/// What happened to one upstream event.
#[derive(Debug)]
pub enum PipelineOutcome {
    /// Below the noise floor; nothing was constructed or sent.
    Filtered,
    Alerted(AlertReport),
}

#[derive(Debug)]
pub struct AlertReport {
    pub alert: Alert,
    /// Set for insider verdicts whose row was written.
    pub persisted: Option<SuspiciousTradeRow>,
    /// `None` when the broadcast itself failed.
    pub delivered: Option<usize>,
}

/// Normalize → noise filter → age → classify → persist (insider) → broadcast.
pub struct Pipeline {
    thresholds: RiskThresholds,
    resolver: AgeResolver,
    store: Arc<dyn AlertStore>,
    publisher: Arc<dyn AlertPublisher>,
}

impl Pipeline {
    pub fn new(
        thresholds: RiskThresholds,
        resolver: AgeResolver,
        store: Arc<dyn AlertStore>,
        publisher: Arc<dyn AlertPublisher>,
    ) -> Self {
        Self {
            thresholds,
            resolver,
            store,
            publisher,
        }
    }

    pub fn thresholds(&self) -> &RiskThresholds {
        &self.thresholds
    }

    /// Process a single upstream event.
    ///
    /// Persistence and broadcast failures are logged and reported in the
    /// outcome, never retried and never returned as errors: one sink failing
    /// must not stop the other or the events that follow.
    pub async fn process_event(&self, raw: &RawEvent) -> PipelineOutcome {
        let start = Instant::now();
        counter!("raw_events_total").increment(1);

        let trade = normalize(raw);

        // Step 1: Filter noise
        if self.thresholds.is_noise(trade.size_usd) {
            tracing::trace!(trade = %trade, "Below noise floor, skipping");
            counter!("noise_filtered_total").increment(1);
            return PipelineOutcome::Filtered;
        }

        tracing::debug!(trade = %trade, "Notable trade");

        // Step 2: Resolve wallet age
        let age = self.resolver.resolve_age(&trade.trader_id).await;

        // Step 3: Classify
        let profile = self.thresholds.classify(trade.size_usd, age);
        let alert = Alert::new(&trade, age.hours(), profile);

        // Step 4: Persist insider verdicts
        let mut persisted = None;
        if alert.is_insider() {
            counter!("insider_alerts_total").increment(1);
            tracing::warn!(
                wallet = %alert.trader,
                market = %alert.market,
                amount_usd = %alert.amount,
                age_hours = alert.account_age_hours,
                "INSIDER ALERT"
            );

            let row = NewSuspiciousTrade::from_alert(&alert, trade.tx_hash.clone());
            match self.store.append(&row).await {
                Ok(saved) => persisted = Some(saved),
                Err(e) => {
                    counter!("persist_failures_total").increment(1);
                    tracing::error!(
                        error = %e,
                        alert_id = %alert.id,
                        wallet = %alert.trader,
                        "Failed to persist insider alert, row lost"
                    );
                }
            }
        }

        // Step 5: Broadcast every notable trade
        let delivered = match self.publisher.publish(&alert).await {
            Ok(n) => {
                counter!("alerts_broadcast_total").increment(1);
                tracing::debug!(alert_id = %alert.id, subscribers = n, "Alert broadcast");
                Some(n)
            }
            Err(e) => {
                tracing::error!(error = %e, alert_id = %alert.id, "Failed to broadcast alert");
                None
            }
        };

        histogram!("pipeline_latency_seconds").record(start.elapsed().as_secs_f64());

        PipelineOutcome::Alerted(AlertReport {
            alert,
            persisted,
            delivered,
        })
    }
}
