use std::collections::BTreeMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use reqwest::Url;
use serde::Serialize;
use slotwatch_collector::ingestor::{StreamConfig, DEFAULT_RECONNECT_DELAY};
use slotwatch_collector::monitor::MonitorSettings;
use slotwatch_collector::poller::{SlotTarget, DEFAULT_POLL_INTERVAL, DEFAULT_POLL_TIMEOUT};
use slotwatch_core::alert::DEFAULT_HISTORY_LIMIT;
use slotwatch_core::error::CoreError;
use slotwatch_core::metric_names::DEFAULT_CHANNELS;
use slotwatch_core::ring_buffer::DEFAULT_CAPACITY;
use slotwatch_core::sample::{Category, Slot};
use slotwatch_core::thresholds::{BoundaryPolicy, Hysteresis, ThresholdConfig};

const DEFAULT_HOST: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);
const DEFAULT_PORT: u16 = 9090;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_BLUE_URL: &str = "http://localhost:3001";
const DEFAULT_GREEN_URL: &str = "http://localhost:3002";

const HTTP_SCHEMES: &[&str] = &["http", "https"];
const WS_SCHEMES: &[&str] = &["ws", "wss"];

/// Why the environment could not be turned into a [`MonitorConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} must be {expected}, got '{value}'")]
    Invalid {
        var: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("{var} is not a valid URL ('{value}'): {reason}")]
    InvalidUrl {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("Invalid thresholds: {0}")]
    Thresholds(#[from] CoreError),
}

/// Output format of the `fmt` tracing layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}

/// Monitor configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: IpAddr,
    /// Bind port (default: `9090`).
    pub port: u16,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Deployment slots polled over HTTP, always blue then green.
    pub slots: Vec<SlotTarget>,
    pub poll_interval: Duration,
    pub health_timeout: Duration,
    /// Game stream settings; `None` disables the ingestor.
    pub stream: Option<StreamConfig>,
    /// Webhook for alert transitions; `None` means log only.
    pub webhook_url: Option<String>,
    pub history_capacity: usize,
    pub alert_history_limit: usize,
    pub thresholds: ThresholdConfig,
    pub log_format: LogFormat,
}

impl MonitorConfig {
    /// Load configuration from the process environment.
    ///
    /// | Env Var                     | Default                                      |
    /// |-----------------------------|----------------------------------------------|
    /// | `HOST`                      | `0.0.0.0`                                    |
    /// | `PORT`                      | `9090`                                       |
    /// | `REQUEST_TIMEOUT_SECS`      | `30`                                         |
    /// | `BLUE_URL`                  | `http://localhost:3001`                      |
    /// | `GREEN_URL`                 | `http://localhost:3002`                      |
    /// | `HEALTH_POLL_INTERVAL_SECS` | `30`                                         |
    /// | `HEALTH_TIMEOUT_SECS`       | `10`                                         |
    /// | `GAME_WS_URL`               | unset (ingestor disabled)                    |
    /// | `GAME_WS_CHANNELS`          | `performance,pathfinding,selection,resources`|
    /// | `WS_RECONNECT_DELAY_SECS`   | `5`                                          |
    /// | `ALERT_WEBHOOK_URL`         | unset (log only)                             |
    /// | `HISTORY_CAPACITY`          | `60`                                         |
    /// | `ALERT_HISTORY_LIMIT`       | `100`                                        |
    /// | `FPS_TARGET`                | `60`                                         |
    /// | `FPS_MINIMUM`               | `45`                                         |
    /// | `MAX_ENTITIES`              | `1000`                                       |
    /// | `MEMORY_LIMIT_MB`           | `512`                                        |
    /// | `PATHFINDING_TARGET_MS`     | `10`                                         |
    /// | `SELECTION_TARGET_MS`       | `5`                                          |
    /// | `MAX_RESPONSE_TIME_MS`      | `2000`                                       |
    /// | `THRESHOLD_BOUNDARY`        | `strict`                                     |
    /// | `ALERT_OPEN_AFTER`          | `1`                                          |
    /// | `ALERT_RESOLVE_AFTER`       | `1`                                          |
    /// | `FPS_ALERT_OPEN_AFTER`      | unset (uses `ALERT_OPEN_AFTER`)              |
    /// | `LOG_FORMAT`                | `text`                                       |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration from any variable lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env { lookup };

        let host = env.parse("HOST", DEFAULT_HOST, "an IP address")?;
        let port = env.parse("PORT", DEFAULT_PORT, "a valid port number")?;
        let request_timeout_secs = env.at_least_one("REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS)?;

        let slots = vec![
            SlotTarget::new(Slot::Blue, env.url("BLUE_URL", DEFAULT_BLUE_URL, HTTP_SCHEMES)?),
            SlotTarget::new(Slot::Green, env.url("GREEN_URL", DEFAULT_GREEN_URL, HTTP_SCHEMES)?),
        ];
        let poll_interval =
            Duration::from_secs(env.at_least_one("HEALTH_POLL_INTERVAL_SECS", DEFAULT_POLL_INTERVAL.as_secs())?);
        let health_timeout =
            Duration::from_secs(env.at_least_one("HEALTH_TIMEOUT_SECS", DEFAULT_POLL_TIMEOUT.as_secs())?);

        let stream = match env.optional_url("GAME_WS_URL", WS_SCHEMES)? {
            Some(url) => Some(StreamConfig {
                url,
                channels: env.list("GAME_WS_CHANNELS", &DEFAULT_CHANNELS),
                reconnect_delay: Duration::from_secs(
                    env.at_least_one("WS_RECONNECT_DELAY_SECS", DEFAULT_RECONNECT_DELAY.as_secs())?,
                ),
            }),
            None => None,
        };
        let webhook_url = env.optional_url("ALERT_WEBHOOK_URL", HTTP_SCHEMES)?;

        let history_capacity = env.at_least_one("HISTORY_CAPACITY", DEFAULT_CAPACITY as u64)? as usize;
        let alert_history_limit =
            env.at_least_one("ALERT_HISTORY_LIMIT", DEFAULT_HISTORY_LIMIT as u64)? as usize;

        let thresholds = load_thresholds(&env)?;
        let log_format = env.parse("LOG_FORMAT", LogFormat::Text, "'text' or 'json'")?;

        Ok(Self {
            host,
            port,
            request_timeout_secs,
            slots,
            poll_interval,
            health_timeout,
            stream,
            webhook_url,
            history_capacity,
            alert_history_limit,
            thresholds,
            log_format,
        })
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn monitor_settings(&self) -> MonitorSettings {
        MonitorSettings {
            slots: self.slots.iter().map(|target| target.slot).collect(),
            thresholds: self.thresholds.clone(),
            history_capacity: self.history_capacity,
            alert_history_limit: self.alert_history_limit,
            stream_enabled: self.stream.is_some(),
        }
    }
}

fn load_thresholds<F>(env: &Env<F>) -> Result<ThresholdConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let defaults = ThresholdConfig::default();
    let fps_target = env.parse("FPS_TARGET", defaults.fps_target, "a number")?;
    // The frame budget follows the fps target.
    let target_frame_time_ms = if fps_target > 0.0 {
        1000.0 / fps_target
    } else {
        defaults.target_frame_time_ms
    };

    let hysteresis = Hysteresis {
        open_after: env.parse("ALERT_OPEN_AFTER", defaults.hysteresis.open_after, "a positive integer")?,
        resolve_after: env.parse(
            "ALERT_RESOLVE_AFTER",
            defaults.hysteresis.resolve_after,
            "a positive integer",
        )?,
    };
    let mut overrides = BTreeMap::new();
    if let Some(open_after) = env.optional("FPS_ALERT_OPEN_AFTER", "a positive integer")? {
        overrides.insert(
            Category::Fps,
            Hysteresis {
                open_after,
                ..hysteresis
            },
        );
    }

    let thresholds = ThresholdConfig {
        fps_target,
        fps_minimum: env.parse("FPS_MINIMUM", defaults.fps_minimum, "a number")?,
        target_frame_time_ms,
        max_entities: env.parse("MAX_ENTITIES", defaults.max_entities, "a number")?,
        memory_limit_mb: env.parse("MEMORY_LIMIT_MB", defaults.memory_limit_mb, "a number")?,
        pathfinding_target_ms: env.parse(
            "PATHFINDING_TARGET_MS",
            defaults.pathfinding_target_ms,
            "a number",
        )?,
        selection_target_ms: env.parse("SELECTION_TARGET_MS", defaults.selection_target_ms, "a number")?,
        max_response_time_ms: env.parse(
            "MAX_RESPONSE_TIME_MS",
            defaults.max_response_time_ms,
            "a number",
        )?,
        boundary: env.parse("THRESHOLD_BOUNDARY", BoundaryPolicy::Strict, "'strict' or 'inclusive'")?,
        hysteresis,
        overrides,
    };
    thresholds.validate()?;
    Ok(thresholds)
}

/// Typed accessors over a variable lookup.
struct Env<F> {
    lookup: F,
}

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, var: &str) -> Option<String> {
        (self.lookup)(var)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    fn parse<T: FromStr>(&self, var: &'static str, default: T, expected: &'static str) -> Result<T, ConfigError> {
        Ok(self.optional(var, expected)?.unwrap_or(default))
    }

    fn optional<T: FromStr>(&self, var: &'static str, expected: &'static str) -> Result<Option<T>, ConfigError> {
        match self.get(var) {
            None => Ok(None),
            Some(value) => match value.parse() {
                Ok(parsed) => Ok(Some(parsed)),
                Err(_) => Err(ConfigError::Invalid { var, value, expected }),
            },
        }
    }

    fn at_least_one(&self, var: &'static str, default: u64) -> Result<u64, ConfigError> {
        const EXPECTED: &str = "a positive integer";
        match self.parse(var, default, EXPECTED)? {
            0 => Err(ConfigError::Invalid {
                var,
                value: "0".into(),
                expected: EXPECTED,
            }),
            n => Ok(n),
        }
    }

    fn list(&self, var: &str, default: &[&str]) -> Vec<String> {
        let items: Vec<String> = match self.get(var) {
            Some(raw) => raw
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            None => Vec::new(),
        };
        if items.is_empty() {
            default.iter().map(|s| s.to_string()).collect()
        } else {
            items
        }
    }

    fn url(&self, var: &'static str, default: &str, schemes: &[&str]) -> Result<String, ConfigError> {
        let value = self.get(var).unwrap_or_else(|| default.to_string());
        check_url(var, value, schemes)
    }

    fn optional_url(&self, var: &'static str, schemes: &[&str]) -> Result<Option<String>, ConfigError> {
        self.get(var).map(|value| check_url(var, value, schemes)).transpose()
    }
}

fn check_url(var: &'static str, value: String, schemes: &[&str]) -> Result<String, ConfigError> {
    match Url::parse(&value) {
        Ok(url) if schemes.contains(&url.scheme()) => Ok(value),
        Ok(url) => Err(ConfigError::InvalidUrl {
            var,
            reason: format!("scheme must be one of {}, got '{}'", schemes.join(", "), url.scheme()),
            value,
        }),
        Err(e) => Err(ConfigError::InvalidUrl {
            var,
            reason: e.to_string(),
            value,
        }),
    }
}
