pub mod mock_feed;
pub mod normalizer;
pub mod pipeline;
pub mod state;
pub mod ws_listener;

pub use pipeline::{AlertReport, Pipeline, PipelineOutcome};
pub use state::Backoff;
pub use ws_listener::ListenerConfig;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, PartialEq)]
pub enum IngestionMode {
    Live(ListenerConfig),
    Mock,
}

/// The long-lived ingestion task, owned by the process lifecycle.
///
/// Shutdown is best-effort: the task is signalled, given a grace period to
/// finish the event in hand, then aborted.
pub struct IngestionTask {
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl IngestionTask {
    pub fn spawn(mode: IngestionMode, pipeline: Arc<Pipeline>) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(async move {
            match mode {
                IngestionMode::Live(config) => {
                    ws_listener::run_ws_listener(config, &pipeline, shutdown_rx).await
                }
                IngestionMode::Mock => mock_feed::run_mock_feed(&pipeline, shutdown_rx).await,
            }
        });

        Self {
            shutdown_tx,
            handle,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub async fn shutdown(self, grace: Duration) {
        let _ = self.shutdown_tx.send(true);

        let mut handle = self.handle;
        match tokio::time::timeout(grace, &mut handle).await {
            Ok(Ok(())) => tracing::info!("Ingestion task stopped"),
            Ok(Err(e)) => tracing::error!(error = %e, "Ingestion task ended abnormally"),
            Err(_) => {
                tracing::warn!(grace_secs = grace.as_secs(), "Ingestion task did not stop in time, abandoning");
                handle.abort();
            }
        }
    }
}

/// Resolves once shutdown has been signalled or the sender is gone.
pub(crate) async fn shutdown_requested(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            return;
        }
    }
}
