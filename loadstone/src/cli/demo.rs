use crate::cli::backend;
use anyhow::{Context, Result};
use loadstone_core::{conf, logging, server};
use std::path::Path;
use std::time::Duration;

/// Run the balancer with every configured backend in-process. When
/// `servers_outage` is set (and `after` is non-negative), backend `i` stops
/// after `after * multiplier^i` seconds, so demotion and recovery can be
/// watched live.
pub fn run(config_path: &Path) -> Result<()> {
    let config = conf::load_config(config_path)?;
    logging::init(&config.logging)?;

    // The demo backends get their own runtime; pingora owns the rest.
    // It must stay in scope so its worker threads live.
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("failed to build demo runtime")?;

    for (i, entry) in config.servers.iter().enumerate() {
        let listen = entry.url.clone();

        let stop_after = config.servers_outage.and_then(|outage| {
            (outage.after >= 0.0)
                .then(|| Duration::from_secs_f64(outage.after * outage.multiplier.powi(i as i32)))
        });

        if let Some(delay) = stop_after {
            tracing::info!(
                server = listen.as_str(),
                after_secs = delay.as_secs_f64(),
                "backend outage scheduled"
            );
        }

        runtime.spawn(async move {
            if let Err(error) = backend::serve(&listen, stop_after).await {
                tracing::error!(server = listen.as_str(), error = %error, "demo backend failed");
            }
        });
    }

    server::run(config)
}
