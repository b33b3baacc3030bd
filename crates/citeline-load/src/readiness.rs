//! Wait for a collaborator's TCP port before talking to it

use std::net::{TcpStream, ToSocketAddrs};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};

const ATTEMPT_INTERVAL: Duration = Duration::from_secs(1);

/// Block until `host:port` accepts a TCP connection.
///
/// Tries once per second. With `max_wait = None` it waits forever.
pub fn wait_until_open(host: &str, port: u16, max_wait: Option<Duration>) -> Result<()> {
    let start = Instant::now();
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        if try_connect(host, port) {
            if attempts > 1 {
                log::info!("{host}:{port} is up after {attempts} attempts");
            }
            return Ok(());
        }

        if let Some(max) = max_wait {
            if start.elapsed() >= max {
                anyhow::bail!(
                    "{host}:{port} still closed after {:.0}s ({attempts} attempts)",
                    max.as_secs_f64()
                );
            }
        }
        log::info!("Waiting for {host}:{port}...");
        thread::sleep(ATTEMPT_INTERVAL);
    }
}

fn try_connect(host: &str, port: u16) -> bool {
    let Ok(addrs) = (host, port).to_socket_addrs() else {
        log::debug!("{host}:{port} does not resolve yet");
        return false;
    };
    addrs
        .into_iter()
        .any(|addr| TcpStream::connect_timeout(&addr, ATTEMPT_INTERVAL).is_ok())
}

/// `(host, port)` of an HTTP base URL, using the scheme's default port.
pub fn host_port(url: &str) -> Result<(String, u16)> {
    let parsed = reqwest::Url::parse(url).with_context(|| format!("Invalid URL: {url}"))?;
    let host = parsed
        .host_str()
        .with_context(|| format!("URL has no host: {url}"))?
        .to_string();
    let port = parsed
        .port_or_known_default()
        .with_context(|| format!("URL has no port: {url}"))?;
    Ok((host, port))
}
