use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Activity (Data API, REST)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiActivity {
    /// Epoch seconds.
    pub timestamp: i64,
    #[serde(default)]
    pub proxy_wallet: Option<String>,
    #[serde(default, rename = "type")]
    pub activity_type: Option<String>,
    #[serde(default)]
    pub transaction_hash: Option<String>,
}

// ---------------------------------------------------------------------------
// WebSocket subscribe message
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum WsSubscribe {
    /// Real-time data socket: `{"type": "subscribe", "channel": "trades"}`
    Channel {
        #[serde(rename = "type")]
        msg_type: String,
        channel: String,
    },
    /// CLOB market socket: `{"type": "market", "assets_ids": []}` (empty = all)
    Market {
        #[serde(rename = "type")]
        msg_type: String,
        assets_ids: Vec<String>,
    },
}

impl WsSubscribe {
    pub fn trades_channel() -> Self {
        WsSubscribe::Channel {
            msg_type: "subscribe".into(),
            channel: "trades".into(),
        }
    }

    pub fn all_markets() -> Self {
        WsSubscribe::Market {
            msg_type: "market".into(),
            assets_ids: Vec::new(),
        }
    }

    /// Pick the subscription shape the endpoint expects. Unknown endpoints get
    /// the trades-channel form.
    pub fn for_endpoint(ws_url: &str) -> Self {
        let url = ws_url.to_lowercase();
        if url.contains("live-data") || url.contains("rtds") {
            Self::trades_channel()
        } else if url.contains("clob") {
            Self::all_markets()
        } else {
            Self::trades_channel()
        }
    }
}
