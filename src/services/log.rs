//! Activity log
//!
//! Every `hunt` and `cache` run appends one JSON line to
//! `~/.weibo-image-hound/activity.log`; `logs` reads them back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::net::IpAddr;
use std::path::PathBuf;
use tracing::debug;

use crate::error::{HoundError, Result};

/// How a `hunt` run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HuntOutcome {
    Found {
        /// Quality variant that was served
        variant: String,
        ip: IpAddr,
        bytes: usize,
        attempts: usize,
        saved_to: PathBuf,
    },
    Exhausted {
        variants: usize,
        attempts: usize,
    },
    NoCachedResolves,
    Failed {
        error: String,
    },
}

/// How a `cache` run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CacheOutcome {
    Cached {
        provider: String,
        locations: usize,
        resolves: usize,
        failed_hosts: usize,
    },
    Failed {
        provider: String,
        error: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Activity {
    Hunt { url: String, outcome: HuntOutcome },
    Cache { outcome: CacheOutcome },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub timestamp: DateTime<Utc>,
    pub activity: Activity,
}

impl ActivityRecord {
    pub fn is_failure(&self) -> bool {
        matches!(
            self.activity,
            Activity::Hunt {
                outcome: HuntOutcome::Exhausted { .. } | HuntOutcome::Failed { .. },
                ..
            } | Activity::Cache {
                outcome: CacheOutcome::Failed { .. }
            }
        )
    }

    /// The image URL of a hunt record.
    pub fn url(&self) -> Option<&str> {
        match &self.activity {
            Activity::Hunt { url, .. } => Some(url),
            Activity::Cache { .. } => None,
        }
    }
}

impl fmt::Display for ActivityRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ", self.timestamp.format("%Y-%m-%d %H:%M:%S UTC"))?;
        match &self.activity {
            Activity::Hunt { url, outcome } => match outcome {
                HuntOutcome::Found {
                    variant,
                    ip,
                    bytes,
                    attempts,
                    saved_to,
                } => write!(
                    f,
                    "hunt found {} | {} | {} bytes | {} attempts -> {}",
                    variant,
                    ip,
                    bytes,
                    attempts,
                    saved_to.display()
                ),
                HuntOutcome::Exhausted { variants, attempts } => write!(
                    f,
                    "hunt exhausted {} | {} variants, {} attempts",
                    url, variants, attempts
                ),
                HuntOutcome::NoCachedResolves => write!(f, "hunt skipped {} | no cached resolves", url),
                HuntOutcome::Failed { error } => write!(f, "hunt failed {} | {}", url, error),
            },
            Activity::Cache { outcome } => match outcome {
                CacheOutcome::Cached {
                    provider,
                    locations,
                    resolves,
                    failed_hosts,
                } => write!(
                    f,
                    "cache ok {} | {} locations, {} resolves, {} hosts failed",
                    provider, locations, resolves, failed_hosts
                ),
                CacheOutcome::Failed { provider, error } => {
                    write!(f, "cache failed {} | {}", provider, error)
                }
            },
        }
    }
}

/// Which records [`ActivityLog::read`] returns.
#[derive(Debug, Clone, Default)]
pub struct LogFilter {
    /// Substring of the hunted URL; cache records never match
    pub url: Option<String>,
    pub failures_only: bool,
    pub limit: Option<usize>,
}

impl LogFilter {
    fn matches(&self, record: &ActivityRecord) -> bool {
        if self.failures_only && !record.is_failure() {
            return false;
        }
        match &self.url {
            Some(needle) => record.url().map_or(false, |u| u.contains(needle.as_str())),
            None => true,
        }
    }
}

pub struct ActivityLog {
    path: PathBuf,
}

impl ActivityLog {
    /// `~/.weibo-image-hound/activity.log`
    pub fn open_default() -> Result<Self> {
        let user_dirs = directories::UserDirs::new().ok_or_else(|| {
            HoundError::storage_error("initialization", "could not determine home directory")
        })?;
        Self::in_dir(user_dirs.home_dir().join(".weibo-image-hound"))
    }

    pub fn in_dir(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            path: dir.join("activity.log"),
        })
    }

    pub fn append(&self, activity: Activity) -> Result<ActivityRecord> {
        let record = ActivityRecord {
            timestamp: Utc::now(),
            activity,
        };
        let line = serde_json::to_string(&record)?;

        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        writeln!(file, "{}", line)?;
        Ok(record)
    }

    /// Matching records, most recent first. Unreadable lines are skipped.
    pub fn read(&self, filter: &LogFilter) -> Result<Vec<ActivityRecord>> {
        if !self.path.exists() {
            return Ok(vec![]);
        }

        let reader = BufReader::new(fs::File::open(&self.path)?);
        let mut records = Vec::new();
        for (n, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<ActivityRecord>(&line) {
                Ok(record) if filter.matches(&record) => records.push(record),
                Ok(_) => {}
                Err(e) => debug!(line = n + 1, error = %e, "skipping unreadable activity entry"),
            }
        }

        records.reverse();
        if let Some(limit) = filter.limit {
            records.truncate(limit);
        }
        Ok(records)
    }
}

/// Append `activity` to the default log. A failing log never fails the run.
pub fn record_activity(activity: Activity) {
    let written = ActivityLog::open_default().and_then(|log| log.append(activity));
    if let Err(e) = written {
        debug!(error = %e, "failed to write activity log");
    }
}
