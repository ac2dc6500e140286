//! Hunt Tool
//!
//! Command-line driver: turn one image URL into quality variants, race them
//! against the cached edge IPs and save the first acceptable image.

mod output;
mod tests;

pub use output::*;

use crate::engine::{Hound, HuntObserver, HuntSuccess};
use crate::error::HoundError;
use crate::runtime::block_on;
use crate::services::{record_activity, Activity, HuntOutcome};
use crate::tools::fetch::{DirectIpFetcher, FetchResult, PolicyKind};
use crate::tools::weibo;
use crate::types::Config;
use anyhow::Context;
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;

const HTTPS_PORT: u16 = 443;

#[derive(Debug, Args)]
pub struct HuntArgs {
    /// Weibo image URL, e.g. https://wx1.sinaimg.cn/mw690/<name>.jpg
    pub url: String,
    /// Output file path, or an existing directory to save into
    #[arg(short, long, default_value = "")]
    pub output: String,
    /// What counts as a found image
    #[arg(long, value_enum, default_value = "status")]
    pub policy: PolicyKind,
}

pub fn run_with_args(args: HuntArgs, config: &Config) -> anyhow::Result<()> {
    let outcome = hunt(&args, config);
    record_activity(Activity::Hunt {
        url: args.url.clone(),
        outcome: logged_outcome(&outcome),
    });
    outcome.map(|_| ())
}

/// The activity-log form of a finished hunt.
fn logged_outcome(outcome: &anyhow::Result<HuntOutcome>) -> HuntOutcome {
    match outcome {
        Ok(outcome) => outcome.clone(),
        Err(e) => match e.downcast_ref::<HoundError>() {
            Some(HoundError::AllVariantsExhausted { variants, attempts }) => HuntOutcome::Exhausted {
                variants: *variants,
                attempts: *attempts,
            },
            _ => HuntOutcome::Failed {
                error: format!("{:#}", e),
            },
        },
    }
}

fn hunt(args: &HuntArgs, config: &Config) -> anyhow::Result<HuntOutcome> {
    let output = parse_output_path(&args.output).context("failed to parse output path")?;
    let target = parse_target_url(&args.url).context("invalid Weibo image URL")?;

    let ips = &config.cache.resolves;
    if ips.is_empty() {
        println!("{}", HoundError::NoCachedResolves);
        return Ok(HuntOutcome::NoCachedResolves);
    }
    println!("Using {} cached resolves.", ips.len());

    let (variants, port) = variants_for(&args.url, &target);
    let hound = Hound::new(Arc::new(DirectIpFetcher::default()), args.policy.build());

    let mut progress = ProgressObserver::new((variants.len() * ips.len()) as u64);
    let found = block_on(hound.hunt(&variants, port, ips, &mut progress));
    progress.finish();
    let HuntSuccess {
        url,
        response,
        attempts,
        ..
    } = found?;

    println!("[SUCCESS] {} | {} | {}", url, response.ip, response.body.len());
    let path = output.file_for(&target.url, &response);
    std::fs::write(&path, &response.body)
        .with_context(|| format!("failed to write {}", path.display()))?;
    println!("Saved {} to {}", url, path.display());
    Ok(HuntOutcome::Found {
        variant: url,
        ip: response.ip,
        bytes: response.body.len(),
        attempts,
        saved_to: path,
    })
}

/// Quality variants of `raw` plus the port to dial them on.
///
/// Generated variants are always HTTPS, so they keep the given port only when
/// the input was HTTPS too.
fn variants_for(raw: &str, target: &TargetUrl) -> (Vec<String>, u16) {
    match weibo::urls_of_all_qualities(raw) {
        Some(variants) if target.url.scheme() == "https" => (variants, target.port),
        Some(variants) => (variants, HTTPS_PORT),
        None => (vec![target.url.to_string()], target.port),
    }
}

/// Progress bar over every (variant, IP) attempt.
struct ProgressObserver {
    bar: ProgressBar,
}

impl ProgressObserver {
    fn new(total: u64) -> Self {
        let bar = ProgressBar::new(total);
        if let Ok(style) = ProgressStyle::with_template("{spinner} [{elapsed_precise}] {wide_bar} {pos}/{len}") {
            bar.set_style(style);
        }
        Self { bar }
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl HuntObserver for ProgressObserver {
    fn variant_started(&mut self, _index: usize, url: &str) {
        self.bar.println(format!("Started hunting for {}", url));
    }

    fn attempt_finished(&mut self, _url: &str, result: &FetchResult, _rejection: Option<&str>) {
        self.bar.inc(1);
        if let FetchResult::Failure { ip, error } = result {
            self.bar.println(format!("[FAILED] {} | {}", ip, error));
        }
    }

    fn variant_exhausted(&mut self, _index: usize, url: &str) {
        self.bar.println(format!("[FAILED] All failed for {}", url));
    }
}
