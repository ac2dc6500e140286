use crate::tools::fetch::{FetchError, FetchResult, FetchTarget, Fetched};
use crate::tools::race::Race;
use crate::{error::*, types::*};
use async_trait::async_trait;
use std::net::IpAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Performs one request against one edge IP.
#[async_trait]
pub trait Fetcher: Send + Sync {
    fn name(&self) -> &'static str;
    async fn fetch(
        &self,
        ip: IpAddr,
        target: &FetchTarget,
    ) -> std::result::Result<Fetched, FetchError>;
}

/// Decides whether a response is the uncensored image we are hunting for.
///
/// Returns `Err(reason)` for responses that should not end the hunt.
pub trait SuccessPolicy: Send + Sync {
    fn name(&self) -> &'static str;
    fn check(&self, response: &Fetched) -> std::result::Result<(), String>;
}

/// Progress hooks for a hunt. Every method defaults to doing nothing.
pub trait HuntObserver: Send {
    fn variant_started(&mut self, _index: usize, _url: &str) {}
    /// `rejection` is `None` when the result ended the hunt.
    fn attempt_finished(&mut self, _url: &str, _result: &FetchResult, _rejection: Option<&str>) {}
    fn variant_exhausted(&mut self, _index: usize, _url: &str) {}
}

pub struct NoopObserver;
impl HuntObserver for NoopObserver {}

/// The first accepted response of a hunt.
#[derive(Debug, Clone)]
pub struct HuntSuccess {
    /// Variant URL the response was fetched for
    pub url: String,
    pub variant_index: usize,
    pub response: Fetched,
    /// Results consumed across all variants, this one included
    pub attempts: usize,
}

/// Races every quality variant in order until one edge IP returns an
/// acceptable response.
pub struct Hound {
    fetcher: Arc<dyn Fetcher>,
    policy: Arc<dyn SuccessPolicy>,
    headers: HeaderSet,
}

impl Hound {
    pub fn new(fetcher: Arc<dyn Fetcher>, policy: Arc<dyn SuccessPolicy>) -> Self {
        Self {
            fetcher,
            policy,
            headers: HeaderSet::empty(),
        }
    }

    pub fn with_headers(mut self, headers: HeaderSet) -> Self {
        self.headers = headers;
        self
    }

    pub fn policy_name(&self) -> &'static str {
        self.policy.name()
    }

    pub async fn hunt(
        &self,
        variants: &[String],
        port: u16,
        ips: &[IpAddr],
        observer: &mut dyn HuntObserver,
    ) -> Result<HuntSuccess> {
        let ips: Arc<[IpAddr]> = Arc::from(ips);
        let mut attempts = 0usize;

        for (index, url) in variants.iter().enumerate() {
            observer.variant_started(index, url);
            info!(
                variant = index,
                url = %url,
                ips = ips.len(),
                fetcher = self.fetcher.name(),
                "racing quality variant"
            );

            let target = Arc::new(
                FetchTarget::new(url.clone(), port, Arc::clone(&ips)).with_headers(self.headers.clone()),
            );
            let mut race = Race::start(target, Arc::clone(&self.fetcher), CancellationToken::new());

            while let Some(result) = race.next().await {
                attempts += 1;
                let verdict = self.judge(&result);
                observer.attempt_finished(url, &result, verdict.as_ref().err().map(String::as_str));

                if let Err(reason) = &verdict {
                    debug!(ip = %result.ip(), url = %url, reason = %reason, "attempt did not qualify");
                }
                if let (FetchResult::Success(response), Ok(())) = (result, verdict) {
                    race.cancel();
                    info!(
                        ip = %response.ip,
                        url = %url,
                        status = response.status.as_u16(),
                        bytes = response.body.len(),
                        "found acceptable response"
                    );
                    return Ok(HuntSuccess {
                        url: url.clone(),
                        variant_index: index,
                        response,
                        attempts,
                    });
                }
            }

            let summary = race.finish().await;
            observer.variant_exhausted(index, url);
            info!(
                variant = index,
                url = %url,
                delivered = summary.delivered,
                abandoned = summary.abandoned,
                "all edges failed for variant"
            );
        }

        Err(HoundError::AllVariantsExhausted {
            variants: variants.len(),
            attempts,
        })
    }

    /// Transport failures and rejected responses both count as "not found".
    fn judge(&self, result: &FetchResult) -> std::result::Result<(), String> {
        match result {
            FetchResult::Success(fetched) => self.policy.check(fetched),
            FetchResult::Failure { error, .. } => Err(error.to_string()),
        }
    }
}
