mod error;
mod types;

pub use error::ConfigError;
pub use types::*;

use crate::backend::Backend;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

pub const DEFAULT_CONFIG_PATH: &str = "configs/config.yaml";

/// Read, parse and validate a YAML configuration file. Any error here is
/// fatal at startup.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let config: Config = serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    validate(&config)?;

    Ok(config)
}

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.servers.is_empty() {
        return Err(ConfigError::NoServers);
    }

    if config.resources.is_empty() {
        return Err(ConfigError::NoResources);
    }

    let mut seen = HashSet::new();
    for server in &config.servers {
        if server.weight == 0 {
            return Err(ConfigError::ZeroWeight {
                url: server.url.clone(),
            });
        }

        // Identity is by URL; a duplicate would break the one-sequence invariant.
        if !seen.insert(server.url.as_str()) {
            return Err(ConfigError::DuplicateServer {
                url: server.url.clone(),
            });
        }

        // Shape check only; the result is rebuilt at assembly time.
        Backend::new(&server.url, server.weight)?;
    }

    if let Some(tls) = &config.https_server {
        for path in [&tls.cert_file, &tls.key_file] {
            fs::metadata(path).map_err(|source| ConfigError::TlsMaterial {
                path: path.clone(),
                source,
            })?;
        }
    }

    if let Some(outage) = &config.servers_outage {
        if outage.multiplier <= 0.0 {
            return Err(ConfigError::BadOutageMultiplier {
                multiplier: outage.multiplier,
            });
        }
    }

    Ok(())
}
