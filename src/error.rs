use thiserror::Error;

/// Why an inbound feed message was rejected at the boundary.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("field `{field}` must be finite")]
    NonFinite { field: String },

    #[error("field `{field}` must not be negative (got {value})")]
    Negative { field: String, value: f64 },

    #[error("binary payload is not valid utf-8")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("duplicate gpu id {0}")]
    DuplicateGpu(u32),

    #[error("unsupported timestamp: {0}")]
    Timestamp(String),
}

/// Failures of the websocket link itself.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("connect to {endpoint} failed: {source}")]
    Connect {
        endpoint: String,
        #[source]
        source: tokio_tungstenite::tungstenite::Error,
    },

    #[error("receive failed: {0}")]
    Receive(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("connection closed by server")]
    Closed,

    #[error("gave up after {0} failed attempts")]
    GaveUp(u32),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("endpoint must use ws:// or wss:// (got {0})")]
    Scheme(String),

    #[error("tick interval must be at least 1ms")]
    Tick,

    #[error("backoff initial ({initial}ms) exceeds max ({max}ms)")]
    Backoff { initial: u64, max: u64 },
}
