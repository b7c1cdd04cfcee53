use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("no backend servers configured")]
    NoServers,

    #[error("no resource paths configured")]
    NoResources,

    #[error("invalid backend url {url:?} (expected host:port)")]
    InvalidBackendUrl { url: String },

    #[error("backend {url} has zero weight")]
    ZeroWeight { url: String },

    #[error("duplicate backend url {url}")]
    DuplicateServer { url: String },

    #[error("TLS material not readable at {path}")]
    TlsMaterial {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("servers_outage.multiplier must be positive, got {multiplier}")]
    BadOutageMultiplier { multiplier: f64 },
}
