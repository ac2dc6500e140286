//! Probe Tools
//!
//! Resolve image hostnames from many vantage points to collect the edge IPs a
//! hunt races against.

pub mod cli;
pub mod globalping;

use crate::error::Result;
use crate::tools::batch::batch;
use async_trait::async_trait;
use std::net::IpAddr;
use std::sync::Arc;
use tracing::warn;

/// A service that can resolve a hostname from many network locations.
#[async_trait]
pub trait Provider: Send + Sync {
    fn name(&self) -> &'static str;
    /// Addresses `hostname` resolves to as seen from `locations`.
    async fn resolve(&self, hostname: &str, locations: &[String]) -> Result<Vec<IpAddr>>;
    /// Locations the provider can currently measure from.
    async fn locations(&self) -> Result<Vec<String>>;
}

/// Per-hostname outcome of [`resolve_all`].
#[derive(Debug)]
pub struct Resolution {
    pub hostname: String,
    pub ips: Result<Vec<IpAddr>>,
}

/// Resolve every hostname concurrently. A failing hostname does not affect
/// the others.
pub async fn resolve_all(
    provider: Arc<dyn Provider>,
    hostnames: Vec<String>,
    locations: Arc<Vec<String>>,
    concurrency: usize,
) -> Vec<Resolution> {
    batch(hostnames, concurrency, move |hostname| {
        let provider = Arc::clone(&provider);
        let locations = Arc::clone(&locations);
        async move {
            let ips = provider.resolve(&hostname, &locations).await;
            if let Err(e) = &ips {
                warn!(hostname = %hostname, error = %e, "failed to resolve");
            }
            Resolution { hostname, ips }
        }
    })
    .await
}

/// Merge freshly resolved addresses into `existing`, dropping duplicates and
/// keeping first-seen order.
pub fn merge_resolves(existing: Vec<IpAddr>, fresh: impl IntoIterator<Item = IpAddr>) -> Vec<IpAddr> {
    crate::dedupe!(existing.into_iter().chain(fresh))
}
