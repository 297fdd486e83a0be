use thiserror::Error;

/// Errors surfaced by this crate.
///
/// Transport-level retry (MQTT reconnects, HTTP backoff) is handled by the
/// underlying clients; these variants only describe what failed.
#[derive(Debug, Error)]
pub enum Error {
    #[error("MQTT client not connected, call connect() first")]
    NotConnected,

    #[error("MQTT request failed: {0}")]
    Mqtt(#[from] rumqttc::ClientError),

    #[error("We Connect API request failed: {0}")]
    Api(#[from] reqwest::Error),

    #[error("We Connect authentication failed: {0}")]
    Auth(String),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
