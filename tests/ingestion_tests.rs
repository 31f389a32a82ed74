mod common;

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use rust_decimal::Decimal;
use serde_json::json;
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;

use common::{MemoryAlertStore, ScriptedLookup};
use insider_sentinel::hub::SubscriberHandle;
use insider_sentinel::ingestion::state::BACKOFF_FLOOR;
use insider_sentinel::ingestion::{IngestionMode, IngestionTask, ListenerConfig};
use insider_sentinel::models::{Alert, RiskProfile};

async fn next_message<S>(ws: &mut S) -> Message
where
    S: futures_util::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    tokio::time::timeout(Duration::from_secs(10), ws.next())
        .await
        .expect("message should arrive in time")
        .expect("stream open")
        .expect("valid frame")
}

async fn next_alert(rx: &mut tokio::sync::mpsc::Receiver<Arc<str>>) -> Alert {
    let payload = tokio::time::timeout(Duration::from_secs(10), rx.recv())
        .await
        .expect("alert should arrive in time")
        .expect("hub channel open");
    serde_json::from_str(&payload).expect("alert JSON")
}

#[tokio::test]
async fn test_live_listener_subscribes_and_processes_frames() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    // Fake upstream: check the subscription, then push a few frames.
    let upstream = tokio::spawn(async move {
        let (tcp, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();

        let subscription = match ws.next().await {
            Some(Ok(Message::Text(text))) => serde_json::from_str::<serde_json::Value>(text.as_str()).unwrap(),
            other => panic!("expected subscription, got {other:?}"),
        };

        let frames = [
            json!({ "maker_address": "0xabc", "size": 5000, "price": 3, "side": "sell" }).to_string(),
            "heartbeat".to_string(),
            json!([{ "user": "0xold", "amount_usd": 20000 }, { "user": "0xdust", "value": 5 }]).to_string(),
        ];
        for frame in frames {
            ws.send(Message::Text(frame.into())).await.unwrap();
        }

        // Hold the connection open until the listener goes away.
        while let Some(Ok(_)) = ws.next().await {}
        subscription
    });

    let store = Arc::new(MemoryAlertStore::default());
    let (pipeline, hub) =
        common::hub_pipeline(Arc::new(ScriptedLookup::with_age("0xabc", 10)), store.clone());
    let (handle, mut rx) = SubscriberHandle::channel(16);
    hub.register(handle).await;

    let task = IngestionTask::spawn(
        IngestionMode::Live(ListenerConfig::new(format!("ws://{addr}"))),
        Arc::new(pipeline),
    );

    let insider = next_alert(&mut rx).await;
    assert_eq!(insider.trader, "0xabc");
    assert_eq!(insider.risk_profile, RiskProfile::Insider);
    assert_eq!(insider.amount, Decimal::from(15_000));

    let normal = next_alert(&mut rx).await;
    assert_eq!(normal.trader, "0xold");
    assert_eq!(normal.risk_profile, RiskProfile::Normal);

    task.shutdown(Duration::from_secs(2)).await;

    let subscription = upstream.await.unwrap();
    assert_eq!(subscription, json!({ "type": "subscribe", "channel": "trades" }));
    assert_eq!(store.rows().await.len(), 1);
    assert!(rx.try_recv().is_err(), "dust trade must not be broadcast");
}

#[tokio::test]
async fn test_shutdown_interrupts_reconnect_wait() {
    // Grab a free port and release it so the connect is refused.
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };

    let store = Arc::new(MemoryAlertStore::default());
    let (pipeline, _hub) = common::hub_pipeline(Arc::new(ScriptedLookup::default()), store);

    let task = IngestionTask::spawn(
        IngestionMode::Live(ListenerConfig::new(format!("ws://{addr}"))),
        Arc::new(pipeline),
    );

    // Let the first attempt fail and the 5s backoff begin.
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(!task.is_finished());

    let started = std::time::Instant::now();
    task.shutdown(Duration::from_secs(3)).await;
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test(start_paused = true)]
async fn test_mock_mode_feeds_pipeline() {
    let store = Arc::new(MemoryAlertStore::default());
    let (pipeline, hub) = common::hub_pipeline(Arc::new(ScriptedLookup::default()), store);
    let (handle, mut rx) = SubscriberHandle::channel(64);
    hub.register(handle).await;

    let task = IngestionTask::spawn(IngestionMode::Mock, Arc::new(pipeline));

    let payload = tokio::time::timeout(Duration::from_secs(600), rx.recv())
        .await
        .expect("mock feed should produce an alert")
        .unwrap();
    let alert: Alert = serde_json::from_str(&payload).unwrap();
    assert!(alert.market.starts_with("Market_"));
    assert!(alert.amount >= Decimal::from(100));

    task.shutdown(Duration::from_secs(1)).await;
}

#[tokio::test]
async fn test_silent_upstream_gets_pinged_after_idle_timeout() {
    let idle = Duration::from_millis(300);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let upstream = tokio::spawn(async move {
        let (tcp, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();

        assert!(matches!(next_message(&mut ws).await, Message::Text(_)));
        let subscribed_at = std::time::Instant::now();

        // Say nothing; the listener should ping.
        let frame = next_message(&mut ws).await;
        (frame, subscribed_at.elapsed())
    });

    let store = Arc::new(MemoryAlertStore::default());
    let (pipeline, _hub) = common::hub_pipeline(Arc::new(ScriptedLookup::default()), store);
    let task = IngestionTask::spawn(
        IngestionMode::Live(ListenerConfig::new(format!("ws://{addr}")).with_idle_timeout(idle)),
        Arc::new(pipeline),
    );

    let (frame, waited) = upstream.await.unwrap();
    assert!(matches!(frame, Message::Ping(_)), "expected ping, got {frame:?}");
    assert!(waited >= idle - Duration::from_millis(50), "pinged after {waited:?}");
    assert!(waited < Duration::from_secs(5), "pinged after {waited:?}");
    assert!(!task.is_finished());

    task.shutdown(Duration::from_secs(2)).await;
}

#[tokio::test]
async fn test_reconnects_after_floor_when_upstream_closes() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let upstream = tokio::spawn(async move {
        let (tcp, _) = listener.accept().await.unwrap();
        let mut first = tokio_tungstenite::accept_async(tcp).await.unwrap();
        assert!(matches!(next_message(&mut first).await, Message::Text(_)));
        first.close(None).await.unwrap();
        let closed_at = std::time::Instant::now();

        let (tcp, _) = listener.accept().await.unwrap();
        let gap = closed_at.elapsed();
        let mut second = tokio_tungstenite::accept_async(tcp).await.unwrap();
        assert!(matches!(next_message(&mut second).await, Message::Text(_)));
        second
            .send(Message::Text(json!({ "user": "0xback", "amount_usd": 700 }).to_string().into()))
            .await
            .unwrap();

        while let Some(Ok(_)) = second.next().await {}
        gap
    });

    let store = Arc::new(MemoryAlertStore::default());
    let (pipeline, hub) = common::hub_pipeline(Arc::new(ScriptedLookup::default()), store);
    let (handle, mut rx) = SubscriberHandle::channel(16);
    hub.register(handle).await;

    let task = IngestionTask::spawn(
        IngestionMode::Live(ListenerConfig::new(format!("ws://{addr}"))),
        Arc::new(pipeline),
    );

    let alert = next_alert(&mut rx).await;
    assert_eq!(alert.trader, "0xback");

    task.shutdown(Duration::from_secs(2)).await;

    let gap = upstream.await.unwrap();
    assert!(gap >= BACKOFF_FLOOR - Duration::from_millis(100), "reconnected after {gap:?}");
    assert!(gap < BACKOFF_FLOOR + Duration::from_secs(3), "reconnected after {gap:?}");
}

#[tokio::test]
async fn test_upstream_ignoring_subscription_still_streams() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    // Never reads the subscription; just pushes trades.
    let upstream = tokio::spawn(async move {
        let (tcp, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
        for trader in ["0xone", "0xtwo"] {
            let frame = json!({ "maker_address": trader, "size_usd": 2500 }).to_string();
            ws.send(Message::Text(frame.into())).await.unwrap();
        }
        tokio::time::sleep(Duration::from_secs(10)).await;
    });

    let store = Arc::new(MemoryAlertStore::default());
    let (pipeline, hub) = common::hub_pipeline(Arc::new(ScriptedLookup::default()), store);
    let (handle, mut rx) = SubscriberHandle::channel(16);
    hub.register(handle).await;

    let task = IngestionTask::spawn(
        IngestionMode::Live(ListenerConfig::new(format!("ws://{addr}"))),
        Arc::new(pipeline),
    );

    assert_eq!(next_alert(&mut rx).await.trader, "0xone");
    assert_eq!(next_alert(&mut rx).await.trader, "0xtwo");

    task.shutdown(Duration::from_secs(2)).await;
    upstream.abort();
}
