use loadstone_core::conf;
use loadstone_core::server::build_server;
use reqwest::blocking::{Client, RequestBuilder};
use std::io::Write;
use std::net::TcpStream;
use std::sync::atomic::{AtomicU16, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use tempfile::NamedTempFile;

/// Global port allocator. Each server takes a pair: front-end + metrics.
static NEXT_PORT: AtomicU16 = AtomicU16::new(21_000);

fn next_port() -> u16 {
    NEXT_PORT.fetch_add(1, Ordering::SeqCst)
}

/// Handle to a running balancer instance.
///
/// The server thread is detached; pingora has no in-process stop, so it
/// lives until the test binary exits.
pub struct TestServer {
    base_url: String,
    metrics_url: String,
    client: Client,

    // MUST be kept alive or the rendered config file is deleted.
    #[allow(dead_code)]
    config_file: NamedTempFile,
}

impl TestServer {
    /// Boot a balancer over the given backends. `interval_ms` is the
    /// health-check sweep interval; pick it long to keep the prober out of a
    /// test's way, short to exercise it.
    pub fn start(algorithm: &str, backends: &[&str], interval_ms: u64) -> Self {
        let listen_port = next_port();
        let metrics_port = next_port();

        let servers: String = backends
            .iter()
            .map(|url| format!("  - url: \"{url}\"\n"))
            .collect();

        let yaml = format!(
            "http_server:\n  host: 127.0.0.1\n  port: {listen_port}\n\
             metrics_server:\n  host: 127.0.0.1\n  port: {metrics_port}\n\
             servers:\n{servers}\
             balancing_alg: {algorithm}\n\
             health_check:\n  interval: {interval_ms}\n  timeout: 1000\n"
        );

        let mut config_file = NamedTempFile::new().expect("create temp config");
        config_file
            .write_all(yaml.as_bytes())
            .expect("write temp config");

        let config = conf::load_config(config_file.path()).expect("failed to load test config");
        let server = build_server(&config).expect("failed to build test server");

        thread::spawn(move || {
            server.run_forever();
        });

        let base_url = format!("http://127.0.0.1:{listen_port}");
        let metrics_url = format!("http://127.0.0.1:{metrics_port}/metrics");
        wait_for_server(&format!("127.0.0.1:{listen_port}"));

        let client = Client::builder()
            .timeout(Duration::from_secs(2))
            .build()
            .expect("failed to build client");

        Self {
            base_url,
            metrics_url,
            client,
            config_file,
        }
    }

    /// Convenience helper for GET requests against the front-end.
    pub fn get(&self, path: &str) -> RequestBuilder {
        self.client.get(format!("{}{}", self.base_url, path))
    }

    /// Body served on `path` right now.
    pub fn fetch_body(&self, path: &str) -> String {
        self.get(path)
            .send()
            .expect("request failed")
            .text()
            .expect("body read failed")
    }

    /// Poll `path` until `predicate` accepts a response body, or panic after
    /// `deadline`. Used to wait out prober sweeps without fixed sleeps.
    pub fn wait_until(&self, path: &str, deadline: Duration, predicate: impl Fn(&str) -> bool) {
        let give_up = Instant::now() + deadline;
        loop {
            let body = self.fetch_body(path);
            if predicate(&body) {
                return;
            }
            if Instant::now() > give_up {
                panic!("condition not reached within {deadline:?}; last body: {body:?}");
            }
            thread::sleep(Duration::from_millis(50));
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn metrics_url(&self) -> &str {
        &self.metrics_url
    }
}

/// Poll until the server accepts connections (or panic).
fn wait_for_server(addr: &str) {
    let deadline = Instant::now() + Duration::from_secs(5);

    loop {
        match TcpStream::connect(addr) {
            Ok(_) => return,
            Err(_) => {
                if Instant::now() > deadline {
                    panic!("server failed to start at {addr}");
                }
                thread::sleep(Duration::from_millis(25));
            }
        }
    }
}
