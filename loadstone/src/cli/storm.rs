use anyhow::{Context, Result};
use std::thread;
use std::time::Duration;

/// Keep poking the balancer until the pool drains (503) or the request
/// budget runs out.
pub fn run(url: &str, requests: u64) -> Result<()> {
    let client = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .context("failed to build client")?;

    for i in 0..requests {
        thread::sleep(Duration::from_millis(10));

        let response = match client.get(url).send() {
            Ok(response) => response,
            Err(error) => {
                eprintln!("request {i} failed: {error}");
                continue;
            }
        };

        let status = response.status();
        println!("{} {}", status.as_u16(), response.url());

        if status == reqwest::StatusCode::SERVICE_UNAVAILABLE {
            println!("servers unavailable");
            break;
        }
    }

    Ok(())
}
