//! Race Tools
//!
//! Fans one request per edge IP out onto the runtime and hands the results back
//! in arrival order. The race never judges a response; its consumer reads until
//! it likes what it sees, then cancels.

#[cfg(test)]
pub(crate) mod stub;

use crate::engine::Fetcher;
use crate::tools::fetch::{FetchResult, FetchTarget};
use futures_util::stream::{self, Stream};
use std::net::IpAddr;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

/// What became of a single attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttemptStatus {
    /// Result was queued for the consumer.
    Sent,
    /// Race was already cancelled before the request started.
    Skipped,
    /// Cancelled while in flight; the result, if any, was dropped.
    Abandoned,
}

/// Per-attempt accounting, available once a race is finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RaceSummary {
    pub candidates: usize,
    /// Results read by the consumer
    pub delivered: usize,
    /// Results queued but never read
    pub unread: usize,
    /// Attempts that produced no result because of cancellation
    pub abandoned: usize,
}

/// One concurrent fetch of a single URL across all candidate IPs.
pub struct Race {
    candidates: usize,
    cancel: CancellationToken,
    results: mpsc::Receiver<FetchResult>,
    tasks: JoinSet<AttemptStatus>,
    delivered: usize,
}

impl Race {
    /// Launch one attempt per IP of `target`, all at once.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(
        target: Arc<FetchTarget>,
        fetcher: Arc<dyn Fetcher>,
        cancel: CancellationToken,
    ) -> Self {
        let candidates = target.ips.len();
        // One slot per IP: a sender never waits on the consumer.
        let (tx, results) = mpsc::channel(candidates.max(1));
        let mut tasks = JoinSet::new();

        for &ip in target.ips.iter() {
            let tx = tx.clone();
            let cancel = cancel.clone();
            let fetcher = Arc::clone(&fetcher);
            let target = Arc::clone(&target);
            tasks.spawn(async move { attempt(ip, target, fetcher, cancel, tx).await });
        }

        debug!(url = %target.url, candidates, "race started");
        Self {
            candidates,
            cancel,
            results,
            tasks,
            delivered: 0,
        }
    }

    /// Next result in arrival order.
    ///
    /// Returns `None` once every IP has reported, or as soon as the race is
    /// cancelled.
    pub async fn next(&mut self) -> Option<FetchResult> {
        if self.delivered >= self.candidates || self.cancel.is_cancelled() {
            return None;
        }
        let result = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            result = self.results.recv() => result,
        }?;
        self.delivered += 1;
        Some(result)
    }

    /// Stop the race. Idempotent, and a no-op on a race that already ended.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn candidates(&self) -> usize {
        self.candidates
    }

    pub fn delivered(&self) -> usize {
        self.delivered
    }

    /// Consume the race as a lazy stream of results.
    pub fn into_stream(self) -> impl Stream<Item = FetchResult> {
        stream::unfold(self, |mut race| async move {
            let result = race.next().await?;
            Some((result, race))
        })
    }

    /// Cancel, wait for every attempt to wind down and report what happened
    /// to each of them.
    pub async fn finish(mut self) -> RaceSummary {
        self.cancel();

        let mut sent = 0usize;
        let mut abandoned = 0usize;
        while let Some(joined) = self.tasks.join_next().await {
            match joined {
                Ok(AttemptStatus::Sent) => sent += 1,
                Ok(AttemptStatus::Skipped) | Ok(AttemptStatus::Abandoned) => abandoned += 1,
                Err(e) => {
                    if e.is_panic() {
                        warn!(error = %e, "race attempt panicked");
                    }
                    abandoned += 1;
                }
            }
        }

        RaceSummary {
            candidates: self.candidates,
            delivered: self.delivered,
            unread: sent.saturating_sub(self.delivered),
            abandoned,
        }
    }
}

impl Drop for Race {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn attempt(
    ip: IpAddr,
    target: Arc<FetchTarget>,
    fetcher: Arc<dyn Fetcher>,
    cancel: CancellationToken,
    tx: mpsc::Sender<FetchResult>,
) -> AttemptStatus {
    if cancel.is_cancelled() {
        return AttemptStatus::Skipped;
    }

    let outcome = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            trace!(%ip, "attempt abandoned in flight");
            return AttemptStatus::Abandoned;
        }
        outcome = fetcher.fetch(ip, &target) => outcome,
    };

    // Cancellation wins over delivery.
    if cancel.is_cancelled() {
        return AttemptStatus::Abandoned;
    }

    let result = match outcome {
        Ok(fetched) => {
            trace!(%ip, status = fetched.status.as_u16(), "attempt answered");
            FetchResult::Success(fetched)
        }
        Err(error) => {
            debug!(%ip, url = %target.url, error = %error, "attempt failed");
            FetchResult::Failure { ip, error }
        }
    };

    match tx.try_send(result) {
        Ok(()) => AttemptStatus::Sent,
        Err(_) => AttemptStatus::Abandoned,
    }
}
