mod client;
mod headers;
mod policy;
mod utils;

pub mod types;

// Re-export types for public use
pub use policy::{ImageResponse, PolicyKind, StatusOk};
pub use types::*;
pub use utils::{decode_body, sniff_image_type};

use crate::engine::Fetcher;
use async_trait::async_trait;
use reqwest::header::HOST;
use reqwest::Url;
use std::net::IpAddr;
use tracing::trace;

/// Fetches a URL from one specific edge IP.
///
/// Every call builds a fresh client pinned to `ip:port`, so no connection is
/// ever shared between attempts. The URL hostname still goes out as Host and
/// TLS SNI.
///
/// # Examples
/// ```no_run
/// use weibo_image_hound::engine::Fetcher;
/// use weibo_image_hound::tools::fetch::{DirectIpFetcher, FetchTarget};
///
/// # async fn example() {
/// let ips: Vec<std::net::IpAddr> = vec!["203.0.113.10".parse().unwrap()];
/// let target = FetchTarget::new("https://wx1.sinaimg.cn/large/abc.jpg", 443, ips);
/// let fetcher = DirectIpFetcher::default();
/// match fetcher.fetch(target.ips[0], &target).await {
///     Ok(resp) => println!("HTTP {} ({} bytes)", resp.status, resp.body.len()),
///     Err(e) => eprintln!("{}", e),
/// }
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct DirectIpFetcher {
    options: FetchOptions,
}

impl DirectIpFetcher {
    pub fn new(options: FetchOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &FetchOptions {
        &self.options
    }
}

#[async_trait]
impl Fetcher for DirectIpFetcher {
    fn name(&self) -> &'static str {
        "reqwest-direct-ip"
    }

    async fn fetch(&self, ip: IpAddr, target: &FetchTarget) -> Result<Fetched, FetchError> {
        fetch_from_ip(ip, target, &self.options).await
    }
}

/// Single GET of `target.url` through `ip:target.port`.
pub async fn fetch_from_ip(
    ip: IpAddr,
    target: &FetchTarget,
    options: &FetchOptions,
) -> Result<Fetched, FetchError> {
    let url = Url::parse(&target.url)
        .map_err(|e| FetchError::InvalidRequest(format!("invalid url {}: {}", target.url, e)))?;
    let (request_url, host_override) = client::pin_url(&url, ip, target.port)?;
    let client = client::build_client_for_ip(&url, ip, target.port, options)?;

    let mut headers = headers::request_headers(&target.headers)?;
    if let Some(host) = host_override {
        let value = reqwest::header::HeaderValue::from_str(&host)
            .map_err(|e| FetchError::InvalidRequest(format!("invalid host {}: {}", host, e)))?;
        headers.insert(HOST, value);
    }

    trace!(%ip, port = target.port, url = %target.url, "sending request");
    let response = client
        .get(request_url)
        .headers(headers)
        .timeout(options.request_timeout)
        .send()
        .await
        .map_err(|e| utils::classify_send_error(&e, options.request_timeout))?;

    let status = response.status();
    let headers = response.headers().clone();
    let raw = response
        .bytes()
        .await
        .map_err(|e| utils::classify_body_error(&e, options.request_timeout))?;
    let body = utils::decode_body(&headers, raw.to_vec())?;

    Ok(Fetched {
        ip,
        status,
        headers,
        body,
    })
}
