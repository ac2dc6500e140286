use crate::types::HeaderSet;
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use super::client::{DEFAULT_CLIENT_TIMEOUT_MS, DEFAULT_REQUEST_TIMEOUT_MS};

/// One URL to fetch from a set of edge IPs.
///
/// Shared read-only between all attempts of a race.
#[derive(Debug, Clone)]
pub struct FetchTarget {
    pub url: String,
    pub port: u16,
    pub ips: Arc<[IpAddr]>,
    pub headers: HeaderSet,
}

impl FetchTarget {
    pub fn new(url: impl Into<String>, port: u16, ips: impl Into<Arc<[IpAddr]>>) -> Self {
        Self {
            url: url.into(),
            port,
            ips: ips.into(),
            headers: HeaderSet::empty(),
        }
    }

    pub fn with_headers(mut self, headers: HeaderSet) -> Self {
        self.headers = headers;
        self
    }
}

/// A complete HTTP response received from one edge IP.
#[derive(Debug, Clone)]
pub struct Fetched {
    /// The IP the connection was made to
    pub ip: IpAddr,
    pub status: StatusCode,
    pub headers: HeaderMap,
    /// Response body, already Brotli-decoded when the server sent `br`
    pub body: Vec<u8>,
}

impl Fetched {
    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }
}

/// Outcome of a single attempt against a single IP.
///
/// `Success` only means a well-formed HTTP response arrived; whether it is the
/// wanted image is decided by a [`crate::engine::SuccessPolicy`].
#[derive(Debug, Clone)]
pub enum FetchResult {
    Success(Fetched),
    Failure { ip: IpAddr, error: FetchError },
}

impl FetchResult {
    pub fn ip(&self) -> IpAddr {
        match self {
            FetchResult::Success(fetched) => fetched.ip,
            FetchResult::Failure { ip, .. } => *ip,
        }
    }

    pub fn response(&self) -> Option<&Fetched> {
        match self {
            FetchResult::Success(fetched) => Some(fetched),
            FetchResult::Failure { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&FetchError> {
        match self {
            FetchResult::Success(_) => None,
            FetchResult::Failure { error, .. } => Some(error),
        }
    }
}

/// Why a single attempt produced no HTTP response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("failed to create request: {0}")]
    InvalidRequest(String),
    #[error("request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),
    #[error("failed to connect: {0}")]
    Connect(String),
    #[error("failed to send request: {0}")]
    Network(String),
    #[error("failed to read response body: {0}")]
    Body(String),
    #[error("failed to decompress response body: {0}")]
    Decompress(String),
}

impl FetchError {
    /// Errors raised before any response headers were received.
    pub fn is_connection(&self) -> bool {
        matches!(
            self,
            FetchError::Timeout(_) | FetchError::Connect(_) | FetchError::Network(_)
        )
    }

    pub fn is_body(&self) -> bool {
        matches!(self, FetchError::Body(_) | FetchError::Decompress(_))
    }
}

/// Tunables for the direct-IP client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchOptions {
    /// Deadline for one attempt, connect through body read.
    pub request_timeout: Duration,
    /// Absolute client deadline, a backstop slightly above `request_timeout`.
    pub client_timeout: Duration,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
            client_timeout: Duration::from_millis(DEFAULT_CLIENT_TIMEOUT_MS),
        }
    }
}

impl FetchOptions {
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        if self.client_timeout < timeout {
            self.client_timeout = timeout + Duration::from_secs(5);
        }
        self
    }
}
