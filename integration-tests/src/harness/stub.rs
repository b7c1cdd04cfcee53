use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

/// Minimal upstream with a toggleable `/health`: just enough protocol for
/// the prober and the forwarder. Every other path answers 200 with the
/// stub's name as body, so tests can tell which backend served a request.
pub struct StubBackend {
    addr: String,
    healthy: Arc<AtomicBool>,
}

impl StubBackend {
    pub fn start(name: &'static str) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("failed to bind stub backend");
        let addr = listener.local_addr().expect("stub addr").to_string();
        let healthy = Arc::new(AtomicBool::new(true));

        let flag = healthy.clone();
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else { continue };

                let flag = flag.clone();
                thread::spawn(move || {
                    let mut buf = [0u8; 2048];
                    let n = stream.read(&mut buf).unwrap_or(0);
                    let request = String::from_utf8_lossy(&buf[..n]);
                    let path = request.split_whitespace().nth(1).unwrap_or("/");

                    let (status, body) = if path == "/health" {
                        if flag.load(Ordering::SeqCst) {
                            ("200 OK", "ok")
                        } else {
                            ("500 Internal Server Error", "down")
                        }
                    } else {
                        ("200 OK", name)
                    };

                    let response = format!(
                        "HTTP/1.1 {status}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                        body.len()
                    );
                    let _ = stream.write_all(response.as_bytes());
                });
            }
        });

        Self { addr, healthy }
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }
}
