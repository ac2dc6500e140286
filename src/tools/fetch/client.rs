use super::types::{FetchError, FetchOptions};
use reqwest::{redirect, Client, Url};
use std::net::{IpAddr, SocketAddr};

pub(crate) const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;
pub(crate) const DEFAULT_CLIENT_TIMEOUT_MS: u64 = 15_000;

/// Build a single-use client whose connections all go to `ip:port`.
///
/// The URL host stays untouched, so Host and SNI still name the CDN virtual
/// host. Redirects are surfaced as plain responses and idle connections are
/// never pooled. HTTP/2 is offered through ALPN on TLS edges. Brotli is
/// decoded by hand (see `utils::decode_body`).
pub(crate) fn build_client_for_ip(
    url: &Url,
    ip: IpAddr,
    port: u16,
    options: &FetchOptions,
) -> Result<Client, FetchError> {
    let builder = Client::builder()
        .redirect(redirect::Policy::none())
        .no_proxy()
        .pool_max_idle_per_host(0)
        .gzip(true)
        .deflate(true)
        .brotli(false)
        .http2_adaptive_window(true)
        .connect_timeout(options.client_timeout)
        .timeout(options.client_timeout);

    let builder = match url.domain() {
        Some(host) => builder.resolve(host, SocketAddr::new(ip, port)),
        None => builder,
    };

    builder
        .build()
        .map_err(|e| FetchError::InvalidRequest(format!("failed to build client: {}", e)))
}

/// Rewrite the request URL so it dials `ip:port`.
///
/// Returns the URL to request and, when rewritten, the original authority to
/// send as Host. Hostname URLs on their default port are returned as-is; the
/// resolver override in [`build_client_for_ip`] takes care of them. The
/// resolver override cannot change the port, so any other port goes into the
/// URL itself.
pub(crate) fn pin_url(
    url: &Url,
    ip: IpAddr,
    port: u16,
) -> Result<(Url, Option<String>), FetchError> {
    let is_domain = url.domain().is_some();
    if is_domain && url.port_or_known_default() == Some(port) {
        return Ok((url.clone(), None));
    }

    let host = url
        .host_str()
        .ok_or_else(|| FetchError::InvalidRequest(format!("missing host in {}", url)))?;
    let authority = match url.port() {
        Some(p) => format!("{}:{}", host, p),
        None => host.to_string(),
    };

    let mut pinned = url.clone();
    if !is_domain {
        pinned
            .set_ip_host(ip)
            .map_err(|_| FetchError::InvalidRequest(format!("cannot set host on {}", url)))?;
    }
    pinned
        .set_port(Some(port))
        .map_err(|_| FetchError::InvalidRequest(format!("cannot set port on {}", url)))?;
    Ok((pinned, Some(authority)))
}
