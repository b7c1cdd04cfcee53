use crate::balance::Balancer;
use async_trait::async_trait;
use pingora::server::ShutdownWatch;
use pingora::services::background::BackgroundService;
use reqwest::StatusCode;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Background prober that keeps the pool's live/down split current.
///
/// Each sweep walks a snapshot of both sequences, never the sequences
/// themselves: a demotion mid-sweep mutates the pool, so indices into it go
/// stale immediately. Backends are therefore resolved by URL when moved.
pub struct HealthChecker {
    interval: Duration,
    timeout: Duration,
    balancer: Arc<Balancer>,
    client: reqwest::Client,
}

impl HealthChecker {
    pub fn new(interval: Duration, timeout: Duration, balancer: Arc<Balancer>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("build health probe client");

        Self {
            interval,
            timeout,
            balancer,
            client,
        }
    }

    /// One full pass: demote live backends that fail their probe, promote
    /// down backends that pass. A single probe result is decisive in both
    /// directions.
    pub async fn sweep(&self) {
        let pool = self.balancer.pool();

        for backend in pool.snapshot_live() {
            if !self.probe(backend.url()).await {
                tracing::info!(server = backend.url(), "demoting unhealthy server");
                pool.demote(backend.url());
            }
        }

        for backend in pool.snapshot_down() {
            if self.probe(backend.url()).await {
                tracing::info!(server = backend.url(), "promoting recovered server");
                pool.promote(backend.url());
            }
        }
    }

    /// A backend is healthy iff `GET http://<url>/health` answers 200 within
    /// the deadline. Probes are always plain HTTP, whatever the front-end
    /// scheme.
    async fn probe(&self, url: &str) -> bool {
        let target = format!("http://{url}/health");
        let start = Instant::now();

        let response = match self.client.get(&target).timeout(self.timeout).send().await {
            Ok(response) => response,
            Err(error) => {
                tracing::info!(server = url, error = %error, "health probe failed");
                return false;
            }
        };

        let status = response.status();
        // Drain the body so the connection is reusable rather than leaked.
        let _ = response.bytes().await;

        if status != StatusCode::OK {
            tracing::info!(
                server = url,
                status = status.as_u16(),
                "health probe returned non-200"
            );
            return false;
        }

        // The client already enforced the deadline; the stopwatch also
        // catches a successful read that arrived too late.
        let elapsed = start.elapsed();
        if elapsed > self.timeout {
            tracing::info!(
                server = url,
                elapsed_ms = elapsed.as_millis() as u64,
                "health probe exceeded deadline"
            );
            return false;
        }

        true
    }
}

#[async_trait]
impl BackgroundService for HealthChecker {
    async fn start(&self, mut shutdown: ShutdownWatch) {
        tracing::info!(
            interval_ms = self.interval.as_millis() as u64,
            timeout_ms = self.timeout.as_millis() as u64,
            "health checker started"
        );

        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = shutdown.changed() => {
                    tracing::info!("health checker shutting down");
                    return;
                }
            }

            self.sweep().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Backend;
    use crate::balance::Algorithm;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;

    /// Stub upstream that always answers `/health` with the given status line.
    fn spawn_stub(status_line: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind stub");
        let addr = listener.local_addr().expect("stub addr").to_string();

        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else { continue };
                let mut buf = [0u8; 1024];
                let _ = stream.read(&mut buf);
                let response = format!(
                    "HTTP/1.1 {status_line}\r\nContent-Length: 2\r\nConnection: close\r\n\r\nok"
                );
                let _ = stream.write_all(response.as_bytes());
            }
        });

        addr
    }

    fn checker_over(urls: &[&str]) -> (HealthChecker, Arc<Balancer>) {
        let backends = urls
            .iter()
            .map(|url| Arc::new(Backend::new(*url, 1).expect("valid url")))
            .collect();
        let balancer = Arc::new(Balancer::new(Algorithm::RoundRobin, backends));
        let checker = HealthChecker::new(
            Duration::from_millis(100),
            Duration::from_secs(1),
            balancer.clone(),
        );
        (checker, balancer)
    }

    fn live_urls(balancer: &Balancer) -> Vec<String> {
        balancer
            .pool()
            .snapshot_live()
            .iter()
            .map(|b| b.url().to_string())
            .collect()
    }

    #[tokio::test]
    async fn sweep_demotes_a_failing_backend() {
        let healthy = spawn_stub("200 OK");
        let failing = spawn_stub("500 Internal Server Error");
        let (checker, balancer) = checker_over(&[&failing, &healthy]);

        checker.sweep().await;

        assert_eq!(live_urls(&balancer), [healthy]);
        assert_eq!(balancer.pool().snapshot_down()[0].url(), failing);

        // Selection can no longer reach the demoted backend.
        for _ in 0..4 {
            assert_ne!(balancer.select(None).expect("one live").url(), failing);
        }
    }

    #[tokio::test]
    async fn sweep_demotes_on_connection_refused() {
        let healthy = spawn_stub("200 OK");
        // Grab a port and release it: nothing listens there.
        let dead = {
            let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
            listener.local_addr().expect("addr").to_string()
        };
        let (checker, balancer) = checker_over(&[&healthy, &dead]);

        checker.sweep().await;

        assert_eq!(live_urls(&balancer), [healthy]);
    }

    #[tokio::test]
    async fn sweep_promotes_a_recovered_backend_to_the_live_tail() {
        let a = spawn_stub("200 OK");
        let b = spawn_stub("200 OK");
        let (checker, balancer) = checker_over(&[&a, &b]);

        // Simulate an earlier demotion of `a`, then let it recover.
        balancer.pool().demote(&a);
        checker.sweep().await;

        assert_eq!(live_urls(&balancer), [b, a], "promotion appends at the tail");
        assert!(balancer.pool().snapshot_down().is_empty());
    }

    #[tokio::test]
    async fn sweep_keeps_probing_when_every_backend_is_down() {
        let failing = spawn_stub("503 Service Unavailable");
        let (checker, balancer) = checker_over(&[&failing]);

        checker.sweep().await;
        assert!(balancer.pool().is_empty_live());

        // A second sweep over an empty live set must not panic or give up.
        checker.sweep().await;
        assert_eq!(balancer.pool().snapshot_down().len(), 1);
    }
}
