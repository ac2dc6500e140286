//! GlobalPing provider
//!
//! Resolves hostnames by running one-packet ping measurements on the
//! [GlobalPing](https://globalping.io) probe network and collecting the address
//! each probe resolved.

mod models;

use super::Provider;
use crate::error::{HoundError, Result};
use crate::tools::fetch::decode_body;
use crate::types::GlobalPingConfig;
use async_trait::async_trait;
use models::*;
use reqwest::header::{
    HeaderMap, HeaderValue, ACCEPT, ACCEPT_ENCODING, AUTHORIZATION, CONTENT_TYPE, ETAG,
    IF_NONE_MATCH, USER_AGENT,
};
use reqwest::{Client, Method, StatusCode};
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, info, warn};

const BASE_URL: &str = "https://api.globalping.io/v1";
const REQUEST_TIMEOUT_MS: u64 = 15_000;
const POLL_INTERVAL_MS: u64 = 5_000;
const POLL_TIMEOUT_MS: u64 = 60_000;
const CLIENT_USER_AGENT: &str = concat!("WeiboImageHound/", env!("CARGO_PKG_VERSION"));

const STATUS_IN_PROGRESS: &str = "in-progress";
const STATUS_FINISHED: &str = "finished";

pub struct GlobalPingClient {
    client: Client,
    base_url: String,
    token: Option<String>,
    /// Last ETag seen per GET URL, for conditional polling
    etags: Mutex<HashMap<String, String>>,
    poll_interval: Duration,
    poll_timeout: Duration,
}

impl GlobalPingClient {
    pub fn new(config: &GlobalPingConfig) -> Result<Self> {
        let client = Client::builder()
            .gzip(true)
            .deflate(true)
            .brotli(false)
            .timeout(Duration::from_millis(REQUEST_TIMEOUT_MS))
            .build()?;
        Ok(Self {
            client,
            base_url: BASE_URL.to_string(),
            token: config.api_token.clone().filter(|t| !t.is_empty()),
            etags: Mutex::new(HashMap::new()),
            poll_interval: Duration::from_millis(POLL_INTERVAL_MS),
            poll_timeout: Duration::from_millis(POLL_TIMEOUT_MS),
        })
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_polling(mut self, interval: Duration, timeout: Duration) -> Self {
        self.poll_interval = interval;
        self.poll_timeout = timeout;
        self
    }

    /// `POST /measurements`, returns the measurement ID.
    async fn create_measurement(&self, hostname: &str, regions: &[String]) -> Result<String> {
        let request = MeasurementRequest::ping(hostname, regions).map_err(HoundError::provider_error)?;
        let payload = serde_json::to_vec(&request)?;

        let url = format!("{}/measurements", self.base_url);
        let body = self
            .request(Method::POST, &url, Some(payload))
            .await?
            .ok_or_else(|| HoundError::provider_error("empty response to measurement creation"))?;

        let created: MeasurementResponse = serde_json::from_slice(&body).map_err(|e| {
            HoundError::provider_error(format!("failed to unmarshal response body: {}", e))
        })?;
        if created.probes_count == 0 {
            return Err(HoundError::provider_error("no probes available"));
        }
        if created.id.is_empty() {
            return Err(HoundError::provider_error(format!(
                "invalid response: {}",
                String::from_utf8_lossy(&body)
            )));
        }
        Ok(created.id)
    }

    /// Poll `GET /measurements/{id}` until it finishes or the poll timeout hits.
    async fn get_measurement(&self, id: &str) -> Result<Vec<MeasurementResult>> {
        if id.is_empty() {
            return Err(HoundError::provider_error("no measurement ID specified"));
        }
        let url = format!("{}/measurements/{}", self.base_url, id);

        let outcome = tokio::time::timeout(self.poll_timeout, self.poll_measurement(&url, id)).await;
        self.lock_etags().remove(&url);

        match outcome {
            Ok(results) => results,
            Err(_) => Err(HoundError::provider_error(format!(
                "measurement {} timed out after {}s",
                id,
                self.poll_timeout.as_secs()
            ))),
        }
    }

    async fn poll_measurement(&self, url: &str, id: &str) -> Result<Vec<MeasurementResult>> {
        loop {
            tokio::time::sleep(self.poll_interval).await;

            let body = match self.request(Method::GET, url, None).await {
                Ok(Some(body)) => body,
                Ok(None) => {
                    debug!(measurement = %id, "measurement in progress (not modified)");
                    continue;
                }
                Err(e) => {
                    warn!(measurement = %id, error = %e, "failed to get measurement");
                    continue;
                }
            };

            let measurement: MeasurementResponse = serde_json::from_slice(&body).map_err(|e| {
                HoundError::provider_error(format!("failed to unmarshal response body: {}", e))
            })?;
            if measurement.id.is_empty() {
                return Err(HoundError::provider_error(format!(
                    "invalid response: {}",
                    String::from_utf8_lossy(&body)
                )));
            }
            match measurement.status.as_str() {
                STATUS_IN_PROGRESS => {
                    debug!(measurement = %id, "measurement in progress");
                }
                STATUS_FINISHED => {
                    info!(
                        measurement = %id,
                        results = measurement.results.len(),
                        "measurement finished"
                    );
                    return Ok(measurement.results);
                }
                other => {
                    return Err(HoundError::provider_error(format!(
                        "invalid response: unknown status \"{}\"",
                        other
                    )));
                }
            }
        }
    }

    /// `GET /probes`: every currently connected probe.
    async fn get_probes(&self) -> Result<Vec<Probe>> {
        let url = format!("{}/probes", self.base_url);
        let body = self
            .request(Method::GET, &url, None)
            .await?
            .ok_or_else(|| HoundError::provider_error("empty probe list"))?;
        serde_json::from_slice(&body).map_err(|e| {
            HoundError::provider_error(format!("failed to unmarshal response body: {}", e))
        })
    }

    /// Send one API request. `Ok(None)` means 304 Not Modified.
    async fn request(&self, method: Method, url: &str, payload: Option<Vec<u8>>) -> Result<Option<Vec<u8>>> {
        let is_get = method == Method::GET;
        let headers = self.request_headers(url, is_get);

        let mut builder = self.client.request(method, url).headers(headers);
        if let Some(payload) = payload {
            builder = builder.body(payload);
        }
        let response = builder
            .send()
            .await
            .map_err(|e| HoundError::provider_error(format!("failed to send request: {}", e)))?;

        let status = response.status();
        let headers = response.headers().clone();
        let raw = response
            .bytes()
            .await
            .map_err(|e| HoundError::provider_error(format!("failed to read response body: {}", e)))?;
        let body = decode_body(&headers, raw.to_vec())
            .map_err(|e| HoundError::provider_error(e.to_string()))?;

        if is_get {
            if let Some(etag) = headers.get(ETAG).and_then(|v| v.to_str().ok()) {
                if !etag.is_empty() {
                    self.lock_etags().insert(url.to_string(), etag.to_string());
                }
            }
        }

        interpret_response(status, &headers, body)
    }

    fn request_headers(&self, url: &str, is_get: bool) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("br, gzip, deflate"));
        headers.insert(USER_AGENT, HeaderValue::from_static(CLIENT_USER_AGENT));
        if let Some(token) = &self.token {
            if let Ok(value) = HeaderValue::from_str(&format!("Bearer {}", token)) {
                headers.insert(AUTHORIZATION, value);
            }
        }

        if is_get {
            if let Some(etag) = self.lock_etags().get(url) {
                if let Ok(value) = HeaderValue::from_str(etag) {
                    headers.insert(IF_NONE_MATCH, value);
                }
            }
        } else {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }
        headers
    }

    fn lock_etags(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.etags.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl Provider for GlobalPingClient {
    fn name(&self) -> &'static str {
        "globalping"
    }

    async fn resolve(&self, hostname: &str, locations: &[String]) -> Result<Vec<IpAddr>> {
        let id = self
            .create_measurement(hostname, locations)
            .await
            .map_err(|e| HoundError::provider_error(format!("failed to create measurement: {}", e)))?;
        let results = self
            .get_measurement(&id)
            .await
            .map_err(|e| HoundError::provider_error(format!("failed to get measurement: {}", e)))?;

        let mut ips = Vec::with_capacity(results.len());
        for r in results {
            match r.result.resolved_address.as_deref() {
                Some(addr) if !addr.is_empty() => match addr.parse::<IpAddr>() {
                    Ok(ip) => ips.push(ip),
                    Err(_) => debug!(hostname = %hostname, address = %addr, "skipping unparseable address"),
                },
                _ => {}
            }
        }
        Ok(ips)
    }

    async fn locations(&self) -> Result<Vec<String>> {
        let probes = self
            .get_probes()
            .await
            .map_err(|e| HoundError::provider_error(format!("failed to get probes: {}", e)))?;

        let regions = probes
            .into_iter()
            .map(|p| p.location.region)
            .filter(|r| VALID_REGIONS.contains(&r.as_str()));
        Ok(crate::dedupe!(regions))
    }
}

/// Map an API response onto a body, "not modified" or a descriptive error.
fn interpret_response(status: StatusCode, headers: &HeaderMap, body: Vec<u8>) -> Result<Option<Vec<u8>>> {
    match status {
        StatusCode::OK | StatusCode::ACCEPTED => Ok(Some(body)),
        StatusCode::NOT_MODIFIED => Ok(None),
        StatusCode::BAD_REQUEST | StatusCode::NOT_FOUND | StatusCode::UNPROCESSABLE_ENTITY => {
            let parsed: ErrorResponse = serde_json::from_slice(&body).map_err(|e| {
                HoundError::provider_error(format!("failed to unmarshal response body: {}", e))
            })?;
            let mut message = format!(
                "API returned error: (type \"{}\") {}",
                parsed.error.kind, parsed.error.message
            );
            if status == StatusCode::BAD_REQUEST && !parsed.error.params.is_empty() {
                message.push_str("\nError params:\n");
                for (param, msg) in &parsed.error.params {
                    message.push_str(&format!("  - {}: {}\n", param, msg));
                }
            }
            Err(HoundError::Provider(message))
        }
        StatusCode::TOO_MANY_REQUESTS => {
            let reset = headers
                .get("x-ratelimit-reset")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok());
            match reset {
                Some(secs) => Err(HoundError::Provider(format!(
                    "too many requests, try again in {}s",
                    secs
                ))),
                None => Err(HoundError::provider_error("too many requests")),
            }
        }
        other => Err(HoundError::Provider(format!(
            "unexpected response (HTTP {})",
            other.as_u16()
        ))),
    }
}
