use std::time::Duration;

use rand::Rng;
use serde_json::json;
use tokio::sync::watch;
use tokio::time::sleep;

use super::pipeline::Pipeline;
use super::shutdown_requested;
use crate::models::RawEvent;

pub const MIN_MOCK_INTERVAL: Duration = Duration::from_millis(500);
pub const MAX_MOCK_INTERVAL: Duration = Duration::from_millis(2000);

/// Feed synthetic trades through the pipeline on a random 0.5-2.0s cadence.
pub async fn run_mock_feed(pipeline: &Pipeline, mut shutdown: watch::Receiver<bool>) {
    tracing::info!("Running in mock data mode - generating simulated trades");

    loop {
        let delay = random_interval();
        tokio::select! {
            _ = sleep(delay) => {}
            _ = shutdown_requested(&mut shutdown) => break,
        }

        let event = mock_trade();
        pipeline.process_event(&event).await;
    }

    tracing::info!("Mock feed stopped");
}

fn random_interval() -> Duration {
    let mut rng = rand::thread_rng();
    rng.gen_range(MIN_MOCK_INTERVAL..=MAX_MOCK_INTERVAL)
}

/// One synthetic event in the upstream's loose shape.
pub fn mock_trade() -> RawEvent {
    let mut rng = rand::thread_rng();
    let side = if rng.gen_bool(0.5) { "BUY" } else { "SELL" };

    let value = json!({
        "maker_address": format!(
            "0x{}...{}",
            rng.gen_range(1000..=9999),
            rng.gen_range(1000..=9999)
        ),
        "size": rng.gen_range(100..=50_000),
        "price": rng.gen::<f64>(),
        "side": side,
        "market": format!("Market_{}", rng.gen_range(1..=10)),
    });

    match value {
        serde_json::Value::Object(obj) => obj,
        _ => RawEvent::new(),
    }
}
