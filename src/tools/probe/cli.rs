/// CLI for the cache command.
use crate::runtime::block_on;
use crate::services::{record_activity, Activity, CacheOutcome, ConfigStore};
use crate::tools::probe::globalping::GlobalPingClient;
use crate::tools::probe::{merge_resolves, resolve_all, Provider};
use crate::tools::weibo;
use crate::types::Config;
use anyhow::{bail, Context};
use clap::{Args, ValueEnum};
use std::sync::Arc;

/// Hostnames resolved at once.
const RESOLVE_CONCURRENCY: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProviderKind {
    #[value(name = "globalping")]
    GlobalPing,
}

impl ProviderKind {
    pub fn name(self) -> &'static str {
        match self {
            ProviderKind::GlobalPing => "globalping",
        }
    }

    pub fn build(self, config: &Config) -> crate::Result<Arc<dyn Provider>> {
        match self {
            ProviderKind::GlobalPing => Ok(Arc::new(GlobalPingClient::new(
                &config.providers.global_ping,
            )?)),
        }
    }
}

#[derive(Debug, Args)]
pub struct CacheArgs {
    /// Probe provider to use
    #[arg(short, long, value_enum, default_value = "globalping")]
    pub provider: ProviderKind,
    /// Replace existing cached resolves instead of merging
    #[arg(short, long)]
    pub force: bool,
}

pub fn run_with_args(args: CacheArgs, store: &dyn ConfigStore, config: &mut Config) -> anyhow::Result<()> {
    let outcome = cache(&args, store, config);
    let logged = match &outcome {
        Ok(done) => done.clone(),
        Err(e) => CacheOutcome::Failed {
            provider: args.provider.name().to_string(),
            error: format!("{:#}", e),
        },
    };
    record_activity(Activity::Cache { outcome: logged });
    outcome.map(|_| ())
}

fn cache(args: &CacheArgs, store: &dyn ConfigStore, config: &mut Config) -> anyhow::Result<CacheOutcome> {
    let provider = args.provider.build(config)?;

    let locations = block_on(provider.locations()).context("failed to get locations")?;
    let locations = crate::dedupe!(locations);
    if locations.is_empty() {
        bail!("{} reported no usable locations", provider.name());
    }
    println!("Using {} locations.", locations.len());

    let hostnames = weibo::hostnames();
    let results = block_on(resolve_all(
        Arc::clone(&provider),
        hostnames,
        Arc::new(locations.clone()),
        RESOLVE_CONCURRENCY,
    ));

    let mut fresh = Vec::new();
    let mut failed_hosts = 0;
    for resolution in results {
        match resolution.ips {
            Ok(ips) => fresh.extend(ips),
            Err(e) => {
                failed_hosts += 1;
                eprintln!("Failed to resolve \"{}\": {}", resolution.hostname, e);
            }
        }
    }

    let existing = if args.force {
        Vec::new()
    } else {
        std::mem::take(&mut config.cache.resolves)
    };
    config.cache.resolves = merge_resolves(existing, fresh);
    let location_count = locations.len();
    config
        .cache
        .locations
        .insert(provider.name().to_string(), locations);

    store
        .save(config)
        .with_context(|| format!("failed to save config to {}", store.path().display()))?;
    println!("Cached {} resolves.", config.cache.resolves.len());
    Ok(CacheOutcome::Cached {
        provider: provider.name().to_string(),
        locations: location_count,
        resolves: config.cache.resolves.len(),
        failed_hosts,
    })
}
