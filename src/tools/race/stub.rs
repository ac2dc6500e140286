//! Scripted fetcher for race and hunt tests.

use crate::engine::Fetcher;
use crate::tools::fetch::{FetchError, FetchTarget, Fetched};
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Debug, Clone)]
pub(crate) enum Reply {
    Status(u16, &'static [u8]),
    Fail(FetchError),
    /// Never answers within a test's lifetime.
    Hang,
}

#[derive(Debug, Clone)]
struct Script {
    delay: Duration,
    reply: Reply,
}

/// Answers per (url, ip), falling back to per-ip, then to a 404.
#[derive(Default)]
pub(crate) struct StubFetcher {
    by_url_ip: HashMap<(String, IpAddr), Script>,
    by_ip: HashMap<IpAddr, Script>,
    pub(crate) started: AtomicUsize,
    pub(crate) completed: AtomicUsize,
}

impl StubFetcher {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn on(mut self, ip: &str, delay_ms: u64, reply: Reply) -> Self {
        self.by_ip.insert(
            ip.parse().unwrap(),
            Script {
                delay: Duration::from_millis(delay_ms),
                reply,
            },
        );
        self
    }

    pub(crate) fn on_url(mut self, url: &str, ip: &str, delay_ms: u64, reply: Reply) -> Self {
        self.by_url_ip.insert(
            (url.to_string(), ip.parse().unwrap()),
            Script {
                delay: Duration::from_millis(delay_ms),
                reply,
            },
        );
        self
    }

    pub(crate) fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    pub(crate) fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for StubFetcher {
    fn name(&self) -> &'static str {
        "stub"
    }

    async fn fetch(&self, ip: IpAddr, target: &FetchTarget) -> Result<Fetched, FetchError> {
        self.started.fetch_add(1, Ordering::SeqCst);
        let script = self
            .by_url_ip
            .get(&(target.url.clone(), ip))
            .or_else(|| self.by_ip.get(&ip))
            .cloned()
            .unwrap_or(Script {
                delay: Duration::ZERO,
                reply: Reply::Status(404, b""),
            });

        tokio::time::sleep(script.delay).await;
        let out = match script.reply {
            Reply::Status(code, body) => Ok(Fetched {
                ip,
                status: StatusCode::from_u16(code).unwrap(),
                headers: HeaderMap::new(),
                body: body.to_vec(),
            }),
            Reply::Fail(error) => Err(error),
            Reply::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(FetchError::Timeout(Duration::from_secs(3600)))
            }
        };
        self.completed.fetch_add(1, Ordering::SeqCst);
        out
    }
}

pub(crate) fn ips(list: &[&str]) -> Vec<IpAddr> {
    list.iter().map(|s| s.parse().unwrap()).collect()
}
