use crate::services::{ActivityLog, ActivityRecord, ConfigStore, LocalFsStore, LogFilter};
use crate::tools::{hunt, probe};
use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "weibo-image-hound",
    version,
    about = "A tool to hunt for uncensored Weibo images",
    long_about = "A tool to hunt for uncensored Weibo images.\n\
                  It tries every quality tier of the given image against image CDN edges \
                  resolved from locations across the world, and keeps the first one that answers."
)]
pub struct Cli {
    /// Config file (default: platform config dir)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Verbose diagnostics on stderr
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Hunt for an uncensored Weibo image, given its URL
    Hunt(hunt::HuntArgs),
    /// Cache resolved IP addresses for all Weibo image hostnames
    Cache(probe::cli::CacheArgs),
    /// Show past hunt and cache runs, most recent first
    Logs(LogsArgs),
}

#[derive(Debug, Args)]
struct LogsArgs {
    /// Only hunts whose URL contains this text
    #[arg(long)]
    url: Option<String>,
    /// Only runs that failed
    #[arg(long)]
    failed: bool,
    /// Maximum number of entries
    #[arg(short = 'n', long, default_value_t = 20)]
    limit: usize,
}

impl LogsArgs {
    fn filter(&self) -> LogFilter {
        LogFilter {
            url: self.url.clone(),
            failures_only: self.failed,
            limit: Some(self.limit),
        }
    }
}

pub fn run() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run_with_cli(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    if let Command::Logs(args) = &cli.cmd {
        let records = ActivityLog::open_default()?.read(&args.filter())?;
        print_logs(&records);
        return Ok(());
    }

    let store = LocalFsStore::from_override(cli.config)?;
    let mut config = store
        .load()
        .with_context(|| format!("failed to load config from {}", store.path().display()))?;

    match cli.cmd {
        Command::Hunt(args) => hunt::run_with_args(args, &config),
        Command::Cache(args) => probe::cli::run_with_args(args, &store, &mut config),
        Command::Logs(_) => Ok(()),
    }
}

fn print_logs(records: &[ActivityRecord]) {
    if records.is_empty() {
        println!("No activity recorded.");
    }
    for record in records {
        println!("{}", record);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
