use crate::backend::Backend;
use crate::balance::Balancer;
use crate::conf::{Config, ConfigError};
use crate::health::HealthChecker;
use crate::metrics;
use crate::proxy::Gateway;
use anyhow::Result;
use pingora::prelude::*;
use pingora::server::Server;
use pingora::services::background::background_service;
use std::sync::Arc;

/// Build the full pingora server: the proxy service (plain and, when
/// configured, TLS), the health-check background service and the Prometheus
/// exporter listener. Split from `run` so tests can boot the real thing.
pub fn build_server(config: &Config) -> Result<Server> {
    let mut server = Server::new(None)?;
    server.bootstrap();

    metrics::init();

    let backends = config
        .servers
        .iter()
        .map(|entry| Backend::new(&entry.url, entry.weight).map(Arc::new))
        .collect::<Result<Vec<_>, ConfigError>>()?;

    let balancer = Arc::new(Balancer::new(config.balancing_alg, backends));

    // Front-end proxy service.
    let gateway = Gateway::new(balancer.clone(), config.resources.clone());
    let mut proxy = http_proxy_service(&server.configuration, gateway);
    proxy.add_tcp(&config.http_server.addr());
    if let Some(tls) = &config.https_server {
        proxy.add_tls(&tls.addr(), &tls.cert_file, &tls.key_file)?;
    }
    server.add_service(proxy);

    // Health prober; cancelled through the server's shutdown watch.
    let checker = HealthChecker::new(
        config.health_check.interval(),
        config.health_check.timeout(),
        balancer,
    );
    server.add_service(background_service("health check", checker));

    // Prometheus text format over the process-wide registry.
    let mut prometheus = pingora::services::listening::Service::prometheus_http_service();
    prometheus.add_tcp(&config.metrics_server.addr());
    server.add_service(prometheus);

    Ok(server)
}

/// Run until shutdown. Blocks the calling thread; pingora handles signals,
/// drains in-flight requests and cancels background services.
pub fn run(config: Config) -> Result<()> {
    let server = build_server(&config)?;

    tracing::info!(
        listen = config.http_server.addr(),
        tls_listen = config.https_server.as_ref().map(|tls| tls.addr()),
        metrics = config.metrics_server.addr(),
        algorithm = %config.balancing_alg,
        servers = config.servers.len(),
        "starting balancer"
    );

    server.run_forever();
}
