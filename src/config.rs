use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;

pub const DEFAULT_ENDPOINT: &str = "ws://localhost:8000/ws";

/// Terminal dashboard for a live fine-tuning metrics feed
#[derive(Parser, Debug, Clone)]
#[command(name = "finetune-monitor", version)]
pub struct Config {
    /// WebSocket endpoint publishing metrics snapshots
    #[arg(short, long, env = "FINETUNE_MONITOR_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,

    /// UI refresh / input poll interval in milliseconds
    #[arg(long, default_value_t = 100)]
    pub tick_ms: u64,

    /// First reconnect delay in milliseconds
    #[arg(long, default_value_t = 500)]
    pub backoff_initial_ms: u64,

    /// Reconnect delay ceiling in milliseconds
    #[arg(long, default_value_t = 10_000)]
    pub backoff_max_ms: u64,

    /// Consecutive failed connects before giving up (0 = keep trying)
    #[arg(long, default_value_t = 0)]
    pub max_retries: u32,

    /// File receiving the log output (the terminal is owned by the UI)
    #[arg(long, env = "FINETUNE_MONITOR_LOG", default_value = "finetune-monitor.log")]
    pub log_file: PathBuf,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.endpoint.starts_with("ws://") || self.endpoint.starts_with("wss://")) {
            return Err(ConfigError::Scheme(self.endpoint.clone()));
        }
        if self.tick_ms == 0 {
            return Err(ConfigError::Tick);
        }
        if self.backoff_initial_ms > self.backoff_max_ms {
            return Err(ConfigError::Backoff {
                initial: self.backoff_initial_ms,
                max: self.backoff_max_ms,
            });
        }
        Ok(())
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Config {
        Config::try_parse_from(std::iter::once("finetune-monitor").chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    fn defaults_point_at_local_producer() {
        let config = parse(&[]);
        if std::env::var_os("FINETUNE_MONITOR_ENDPOINT").is_none() {
            assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        }
        assert_eq!(config.tick(), Duration::from_millis(100));
        assert_eq!(config.max_retries, 0);
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn rejects_non_websocket_endpoint() {
        let config = parse(&["--endpoint", "http://localhost:8000/ws"]);
        assert_eq!(
            config.validate(),
            Err(ConfigError::Scheme("http://localhost:8000/ws".into()))
        );
    }

    #[test]
    fn rejects_zero_tick_and_inverted_backoff() {
        assert_eq!(parse(&["--tick-ms", "0"]).validate(), Err(ConfigError::Tick));
        assert_eq!(
            parse(&["--backoff-initial-ms", "5000", "--backoff-max-ms", "100"]).validate(),
            Err(ConfigError::Backoff {
                initial: 5000,
                max: 100
            })
        );
    }
}
