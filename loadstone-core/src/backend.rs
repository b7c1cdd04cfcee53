use crate::conf::ConfigError;
use crate::metrics;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

/// A single upstream server. The `host:port` string is both the dial target
/// and the stable identity used by the pool.
#[derive(Debug)]
pub struct Backend {
    url: String,
    host: String,
    port: u16,
    weight: u32,
    active: AtomicI64,
}

impl Backend {
    pub fn new(url: impl Into<String>, weight: u32) -> Result<Self, ConfigError> {
        let url = url.into();

        let parsed = match url.rsplit_once(':') {
            Some((host, port)) if !host.is_empty() => {
                port.parse::<u16>().ok().map(|port| (host.to_string(), port))
            }
            _ => None,
        };

        let Some((host, port)) = parsed else {
            return Err(ConfigError::InvalidBackendUrl { url });
        };

        Ok(Self {
            url,
            host,
            port,
            weight,
            active: AtomicI64::new(0),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn weight(&self) -> u32 {
        self.weight
    }

    pub fn increment_connections(&self) {
        self.active.fetch_add(1, Ordering::Relaxed);
    }

    pub fn decrement_connections(&self) {
        self.active.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn current_connections(&self) -> i64 {
        self.active.load(Ordering::Relaxed)
    }
}

/// RAII pair for the active-connection counter and the per-backend gauge.
///
/// Invariants:
/// - the counter is incremented exactly once, at construction
/// - the counter is decremented exactly once, on Drop
///
/// Drop covers every exit path of a request: completion, upstream failure,
/// client abort, cancelled future, panic.
#[derive(Debug)]
pub struct ConnectionGuard {
    backend: Arc<Backend>,
}

impl ConnectionGuard {
    pub fn acquire(backend: Arc<Backend>) -> Self {
        backend.increment_connections();
        metrics::inc_active(backend.url());
        Self { backend }
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.backend.decrement_connections();
        metrics::dec_active(self.backend.url());
    }
}
