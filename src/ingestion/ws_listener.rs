use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use metrics::counter;
use serde_json::Value;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::time::{sleep, timeout};
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use super::pipeline::Pipeline;
use super::shutdown_requested;
use super::state::{Backoff, ConnectFailure, ConnectionFsm, ListenerEvent, ListenerState};
use crate::models::RawEvent;
use crate::polymarket::WsSubscribe;

pub const IDLE_TIMEOUT: Duration = Duration::from_secs(30);
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Event types that mark a bare object as a trade.
const TRADE_EVENT_TYPES: &[&str] = &["fill", "trade", "match"];
/// Container fields that may carry the actual events, in priority order.
const NESTED_EVENT_FIELDS: &[&str] = &["data", "payload"];

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Upstream connection settings. `new` applies the production timings.
#[derive(Debug, Clone, PartialEq)]
pub struct ListenerConfig {
    pub ws_url: String,
    /// Silence after which a ping is sent.
    pub idle_timeout: Duration,
    pub connect_timeout: Duration,
    pub backoff: Backoff,
}

impl ListenerConfig {
    pub fn new(ws_url: impl Into<String>) -> Self {
        Self {
            ws_url: ws_url.into(),
            idle_timeout: IDLE_TIMEOUT,
            connect_timeout: CONNECT_TIMEOUT,
            backoff: Backoff::default(),
        }
    }

    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }
}

#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("invalid WebSocket endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("connection timed out after {0:?}")]
    Timeout(Duration),

    #[error("transport error: {0}")]
    Transport(#[from] tungstenite::Error),
}

impl ConnectError {
    pub fn failure(&self) -> ConnectFailure {
        match self {
            ConnectError::InvalidEndpoint(_) => ConnectFailure::InvalidEndpoint,
            ConnectError::Timeout(_) | ConnectError::Transport(_) => ConnectFailure::Transient,
        }
    }
}

enum SessionEnd {
    Closed,
    Shutdown,
}

/// Run the upstream listener until shutdown is requested.
///
/// Every transport failure is retried through the [`ConnectionFsm`]
/// backoff schedule; nothing here ends the loop except `shutdown`.
pub async fn run_ws_listener(
    config: ListenerConfig,
    pipeline: &Pipeline,
    mut shutdown: watch::Receiver<bool>,
) {
    let ws_url = config.ws_url.as_str();
    let mut fsm = ConnectionFsm::new(config.backoff.clone());
    fsm.handle(ListenerEvent::Start);

    loop {
        tracing::info!(url = %ws_url, "Connecting to Polymarket WebSocket...");

        let connected = tokio::select! {
            result = connect(ws_url, config.connect_timeout) => result,
            _ = shutdown_requested(&mut shutdown) => break,
        };

        match connected {
            Ok(ws_stream) => {
                tracing::info!(url = %ws_url, "WebSocket connected successfully");
                fsm.handle(ListenerEvent::Connected);

                let (mut write, mut read) = ws_stream.split();

                let subscribe = WsSubscribe::for_endpoint(ws_url);
                match serde_json::to_string(&subscribe) {
                    Ok(msg) => match write.send(Message::Text(msg.clone().into())).await {
                        Ok(()) => tracing::info!(subscription = %msg, "Subscription sent"),
                        Err(e) => tracing::warn!(
                            error = %e,
                            "Failed to send subscription message (may not be required)"
                        ),
                    },
                    Err(e) => tracing::warn!(error = %e, "Failed to encode subscription message"),
                }
                fsm.handle(ListenerEvent::SubscriptionAttempted);

                let end = loop {
                    let next = tokio::select! {
                        next = timeout(config.idle_timeout, read.next()) => next,
                        _ = shutdown_requested(&mut shutdown) => break SessionEnd::Shutdown,
                    };

                    match next {
                        Err(_elapsed) => {
                            fsm.handle(ListenerEvent::IdleTimeout);
                            match write.send(Message::Ping(Vec::new().into())).await {
                                Ok(()) => tracing::debug!("Sent ping to keep connection alive"),
                                Err(e) => tracing::debug!(error = %e, "Keep-alive ping failed"),
                            }
                        }
                        Ok(Some(Ok(Message::Text(text)))) => {
                            fsm.handle(ListenerEvent::MessageReceived);
                            handle_text_message(text.as_str(), pipeline).await;
                        }
                        Ok(Some(Ok(Message::Binary(data)))) => {
                            fsm.handle(ListenerEvent::MessageReceived);
                            match std::str::from_utf8(&data) {
                                Ok(text) => handle_text_message(text, pipeline).await,
                                Err(_) => tracing::debug!(len = data.len(), "Dropping non-UTF-8 binary frame"),
                            }
                        }
                        Ok(Some(Ok(Message::Ping(data)))) => {
                            if let Err(e) = write.send(Message::Pong(data)).await {
                                tracing::warn!(error = %e, "Failed to send pong");
                                break SessionEnd::Closed;
                            }
                        }
                        Ok(Some(Ok(Message::Close(_)))) => {
                            tracing::warn!("WebSocket connection closed by server");
                            break SessionEnd::Closed;
                        }
                        Ok(Some(Ok(_))) => {} // Pong, Frame
                        Ok(Some(Err(e))) => {
                            tracing::error!(error = %e, "WebSocket read error");
                            break SessionEnd::Closed;
                        }
                        Ok(None) => {
                            tracing::warn!("WebSocket stream ended");
                            break SessionEnd::Closed;
                        }
                    }
                };

                if let SessionEnd::Shutdown = end {
                    let _ = write.send(Message::Close(None)).await;
                    break;
                }
                fsm.handle(ListenerEvent::ConnectionClosed);
            }
            Err(e) => {
                match &e {
                    ConnectError::InvalidEndpoint(_) => tracing::error!(
                        error = %e,
                        url = %ws_url,
                        "Invalid WebSocket URI. Please check the URL"
                    ),
                    _ => tracing::error!(error = %e, url = %ws_url, "WebSocket connection failed"),
                }
                fsm.handle(ListenerEvent::ConnectFailed(e.failure()));
            }
        }

        if let ListenerState::ReconnectWait(delay) = fsm.state() {
            counter!("upstream_reconnects_total").increment(1);
            tracing::info!(delay_secs = delay.as_secs_f64(), "Reconnecting...");
            tokio::select! {
                _ = sleep(delay) => {}
                _ = shutdown_requested(&mut shutdown) => break,
            }
        }
        fsm.handle(ListenerEvent::WaitElapsed);
    }

    tracing::info!("WebSocket listener stopped");
}

async fn connect(ws_url: &str, limit: Duration) -> Result<WsStream, ConnectError> {
    match timeout(limit, connect_async(ws_url)).await {
        Err(_) => Err(ConnectError::Timeout(limit)),
        Ok(Ok((stream, _response))) => Ok(stream),
        Ok(Err(e @ (tungstenite::Error::Url(_) | tungstenite::Error::HttpFormat(_)))) => {
            Err(ConnectError::InvalidEndpoint(e.to_string()))
        }
        Ok(Err(e)) => Err(ConnectError::Transport(e)),
    }
}

/// Decode one text frame and run each contained event through the pipeline.
///
/// Events are processed in arrival order, one at a time.
pub async fn handle_text_message(text: &str, pipeline: &Pipeline) {
    let Some(events) = parse_events(text) else {
        tracing::debug!(raw = %preview(text, 100), "Received non-JSON message");
        return;
    };

    tracing::debug!(events = events.len(), raw = %preview(text, 200), "Received message");

    for raw in &events {
        pipeline.process_event(raw).await;
    }
}

/// Parse a text frame into events. `None` means the payload was not JSON.
pub fn parse_events(text: &str) -> Option<Vec<RawEvent>> {
    let value: Value = serde_json::from_str(text).ok()?;
    Some(extract_events(value))
}

/// Split a decoded payload into individual events:
/// - an object that looks like a trade is one event,
/// - an array yields each object element,
/// - an object with a `data`/`payload` list (or object) yields its contents,
/// - any other object is still tried as a single event.
///
/// Non-object values (bare strings, numbers, null) carry no fields and yield
/// nothing.
pub fn extract_events(value: Value) -> Vec<RawEvent> {
    match value {
        Value::Array(items) => items.into_iter().filter_map(into_object).collect(),
        Value::Object(obj) => {
            if looks_like_trade(&obj) {
                return vec![obj];
            }

            let nested = NESTED_EVENT_FIELDS
                .iter()
                .find_map(|field| match obj.get(*field) {
                    Some(Value::Array(_)) | Some(Value::Object(_)) => Some(*field),
                    _ => None,
                });

            match nested {
                Some(field) => {
                    let mut obj = obj;
                    match obj.remove(field) {
                        Some(Value::Array(items)) => items.into_iter().filter_map(into_object).collect(),
                        Some(Value::Object(inner)) => vec![inner],
                        _ => Vec::new(),
                    }
                }
                None => {
                    tracing::debug!(
                        keys = ?obj.keys().take(5).collect::<Vec<_>>(),
                        "Unrecognized message format, attempting to process"
                    );
                    vec![obj]
                }
            }
        }
        other => {
            tracing::trace!(raw = %other, "Non-object message ignored");
            Vec::new()
        }
    }
}

fn looks_like_trade(obj: &RawEvent) -> bool {
    let typed_trade = obj
        .get("type")
        .and_then(Value::as_str)
        .is_some_and(|t| TRADE_EVENT_TYPES.contains(&t));

    typed_trade || obj.contains_key("maker_address") || obj.contains_key("size")
}

fn into_object(value: Value) -> Option<RawEvent> {
    match value {
        Value::Object(obj) => Some(obj),
        _ => None,
    }
}

fn preview(text: &str, max_chars: usize) -> &str {
    text.char_indices().nth(max_chars).map_or(text, |(idx, _)| &text[..idx])
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
