use anyhow::{Context, Result};
use http_body_util::Full;
use hyper::body::{Bytes, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use rand::Rng;
use std::convert::Infallible;
use std::time::Duration;
use tokio::net::TcpListener;

/// One demonstration upstream: `/health`, `/resource1` (with pseudo work)
/// and `/resource2`, the wire contract the prober and forwarder expect.
pub fn run(listen: &str) -> Result<()> {
    let runtime = tokio::runtime::Runtime::new().context("failed to build tokio runtime")?;

    runtime.block_on(async {
        println!("starting backend on {listen}");
        serve(listen, None).await
    })
}

/// Serve the demo routes. With `stop_after` set, the listener is torn down
/// once the delay elapses (the staggered-outage harness).
pub async fn serve(listen: &str, stop_after: Option<Duration>) -> Result<()> {
    let listener = TcpListener::bind(listen)
        .await
        .with_context(|| format!("failed to bind {listen}"))?;

    match stop_after {
        Some(delay) => {
            tokio::select! {
                _ = accept_loop(listener) => {}
                _ = tokio::time::sleep(delay) => {
                    tracing::info!(listen, "scheduled outage, backend stopping");
                }
            }
        }
        None => accept_loop(listener).await,
    }

    Ok(())
}

async fn accept_loop(listener: TcpListener) {
    loop {
        let (stream, _) = match listener.accept().await {
            Ok(connection) => connection,
            Err(error) => {
                tracing::debug!(error = %error, "accept failed");
                continue;
            }
        };

        let io = TokioIo::new(stream);
        tokio::spawn(async move {
            if let Err(error) = http1::Builder::new()
                .serve_connection(io, service_fn(route))
                .await
            {
                tracing::debug!(error = %error, "backend connection error");
            }
        });
    }
}

async fn route(req: Request<Incoming>) -> Result<Response<Full<Bytes>>, Infallible> {
    let response = match req.uri().path() {
        "/health" => text(StatusCode::OK, "ok"),

        "/resource1" => {
            // Pseudo work: mostly fast, occasionally slow enough to trip a
            // tight probe deadline.
            let pause = {
                let mut rng = rand::rng();
                if rng.random_range(0..1001) == 1000 {
                    350
                } else {
                    rng.random_range(0..10)
                }
            };
            tokio::time::sleep(Duration::from_millis(pause)).await;
            text(StatusCode::OK, "resource1\n")
        }

        "/resource2" => text(StatusCode::OK, "resource2\n"),

        _ => text(StatusCode::NOT_FOUND, "not found"),
    };

    Ok(response)
}

fn text(status: StatusCode, body: &'static str) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header("content-type", "text/plain")
        .body(Full::new(Bytes::from_static(body.as_bytes())))
        .expect("static response")
}
