use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use serde::Deserialize;
use tracing_subscriber::filter::LevelFilter;

use crate::error::{Error, Result};

/// Default MQTT discovery prefix expected by Home Assistant.
pub const DEFAULT_PREFIX: &str = "homeassistant";

const DEFAULT_MQTT_PORT: u16 = 1883;
const DEFAULT_INTERVAL_SECS: u64 = 300;

/// Command line arguments.
///
/// Every value can also come from a TOML config file passed via `--config`;
/// flags given on the command line win over file values.
#[derive(Debug, Default, Parser)]
#[command(name = "weconnect2mqtt")]
#[command(about = "Publish We Connect ID vehicle status to Home Assistant over MQTT")]
pub struct Cli {
    /// Path to a TOML configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Address of the MQTT broker
    #[arg(long)]
    pub broker: Option<String>,

    /// Port of the MQTT broker
    #[arg(long)]
    pub port: Option<u16>,

    /// Username of the We Connect ID account
    #[arg(short, long)]
    pub username: Option<String>,

    /// Password of the We Connect ID account
    #[arg(short, long)]
    pub password: Option<String>,

    /// Username for the MQTT broker, if it requires authentication
    #[arg(long)]
    pub mqtt_username: Option<String>,

    /// Password for the MQTT broker
    #[arg(long)]
    pub mqtt_password: Option<String>,

    /// API request interval in seconds
    #[arg(short, long)]
    pub interval: Option<u64>,

    /// Directory where one image per vehicle is saved as {vin}.png
    #[arg(long)]
    pub images: Option<PathBuf>,

    /// MQTT discovery prefix
    #[arg(long)]
    pub prefix: Option<String>,

    /// MQTT client id
    #[arg(long)]
    pub client_id: Option<String>,

    /// Log level: trace, debug, info, warn, error
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,
}

/// Values read from the optional TOML config file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    broker: Option<String>,
    port: Option<u16>,
    username: Option<String>,
    password: Option<String>,
    mqtt_username: Option<String>,
    mqtt_password: Option<String>,
    interval: Option<u64>,
    images: Option<PathBuf>,
    prefix: Option<String>,
    client_id: Option<String>,
    log_level: Option<LogLevel>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => LevelFilter::TRACE,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
        }
    }
}

/// Fully resolved runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub broker: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub mqtt_username: Option<String>,
    pub mqtt_password: Option<String>,
    pub interval: Duration,
    pub images: Option<PathBuf>,
    pub prefix: String,
    pub client_id: String,
    pub log_level: LogLevel,
}

impl Config {
    /// Merge CLI arguments over the optional config file and apply defaults.
    pub fn resolve(cli: Cli) -> Result<Self> {
        let file = match &cli.config {
            Some(path) => {
                let raw = std::fs::read_to_string(path)?;
                toml::from_str::<FileConfig>(&raw).map_err(|e| Error::Config(e.to_string()))?
            }
            None => FileConfig::default(),
        };

        let broker = cli
            .broker
            .or(file.broker)
            .ok_or_else(|| Error::Config("MQTT broker address is required".to_string()))?;
        let username = cli
            .username
            .or(file.username)
            .ok_or_else(|| Error::Config("We Connect username is required".to_string()))?;
        let password = cli
            .password
            .or(file.password)
            .ok_or_else(|| Error::Config("We Connect password is required".to_string()))?;

        // tokio::time::interval panics on a zero period
        let interval = cli.interval.or(file.interval).unwrap_or(DEFAULT_INTERVAL_SECS);
        if interval == 0 {
            return Err(Error::Config(
                "interval must be at least 1 second".to_string(),
            ));
        }

        Ok(Self {
            broker,
            port: cli.port.or(file.port).unwrap_or(DEFAULT_MQTT_PORT),
            username,
            password,
            mqtt_username: cli.mqtt_username.or(file.mqtt_username),
            mqtt_password: cli.mqtt_password.or(file.mqtt_password),
            interval: Duration::from_secs(interval),
            images: cli.images.or(file.images),
            prefix: cli
                .prefix
                .or(file.prefix)
                .unwrap_or_else(|| DEFAULT_PREFIX.to_string()),
            client_id: cli
                .client_id
                .or(file.client_id)
                .unwrap_or_else(default_client_id),
            log_level: cli.log_level.or(file.log_level).unwrap_or_default(),
        })
    }
}

fn default_client_id() -> String {
    let host = hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string());
    format!("weconnect2mqtt-{host}")
}
