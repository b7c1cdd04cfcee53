use crate::balance::Algorithm;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub http_server: ListenConfig,
    #[serde(default)]
    pub https_server: Option<TlsListenConfig>,
    #[serde(default)]
    pub metrics_server: MetricsConfig,
    /// Backend pool, in the order the round-robin policies will walk it.
    pub servers: Vec<ServerEntry>,
    pub balancing_alg: Algorithm,
    /// Resource paths routed through the balancer.
    #[serde(default = "default_resources")]
    pub resources: Vec<String>,
    pub health_check: HealthCheckConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Demo harness only: staggered backend shutdowns (`loadstone demo`).
    #[serde(default)]
    pub servers_outage: Option<OutageConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListenConfig {
    pub host: String,
    pub port: u16,
}

impl ListenConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TlsListenConfig {
    pub host: String,
    pub port: u16,
    pub cert_file: String,
    pub key_file: String,
}

impl TlsListenConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_host")]
    pub host: String,
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

impl MetricsConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            host: default_metrics_host(),
            port: default_metrics_port(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerEntry {
    /// `host:port`, no scheme.
    pub url: String,
    #[serde(default = "default_weight")]
    pub weight: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HealthCheckConfig {
    /// Milliseconds between sweeps.
    pub interval: u64,
    /// Per-probe deadline, milliseconds.
    #[serde(default = "default_probe_timeout")]
    pub timeout: u64,
}

impl HealthCheckConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `debug`, `info`, `warn` or `error`; `RUST_LOG` overrides when set.
    pub level: String,
    /// Directory for log files; empty means log to stdout.
    pub path: String,
    /// Log file name; empty means log to stdout.
    pub file: String,
    /// Accepted for config compatibility. Both listeners share one
    /// subscriber, so TLS traffic logs to the main sink.
    pub file_tls: String,
    /// Truncate the log file at startup instead of appending.
    pub rewrite: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            path: String::new(),
            file: String::new(),
            file_tls: String::new(),
            rewrite: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct OutageConfig {
    /// Seconds until the first backend stops; negative disables outages.
    pub after: f64,
    /// Delay factor between consecutive outages.
    #[serde(default = "default_outage_multiplier")]
    pub multiplier: f64,
}

fn default_resources() -> Vec<String> {
    vec!["/resource1".to_string(), "/resource2".to_string()]
}

fn default_metrics_host() -> String {
    "0.0.0.0".to_string()
}

fn default_metrics_port() -> u16 {
    9091
}

fn default_weight() -> u32 {
    1
}

fn default_probe_timeout() -> u64 {
    2000
}

fn default_outage_multiplier() -> f64 {
    1.0
}
