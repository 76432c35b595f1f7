mod config;
mod feed;

use std::future::Future;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use trend_core::{
    Admission, ItemKey, MAX_WALL_TIME, SharedTracker, TrendTracker, WallTime, millis_to_iso8601,
    now_unix_millis,
};
use trend_store::Store;

use crate::config::AppConfig;

#[derive(Parser)]
#[command(name = "trend", about = "Time-decayed trending item tracker")]
struct Cli {
    /// Path to a trend.toml config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose debug output
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record activations for one or more items
    Record {
        /// Item identifiers
        #[arg(required = true)]
        ids: Vec<String>,

        /// Activation time as Unix milliseconds (default: now)
        #[arg(long, value_parser = clap::value_parser!(u64).range(..=MAX_WALL_TIME))]
        at: Option<WallTime>,
    },

    /// Print the currently trending items
    Top {
        /// Sort by score and print scores
        #[arg(long)]
        ranked: bool,
    },

    /// Show tracker statistics
    Stats,

    /// Stream activations from stdin until EOF or Ctrl-C
    Feed,

    /// Export tracker state to a JSON file
    Export {
        /// Output file path
        path: PathBuf,
    },

    /// Import tracker state from a JSON file
    Import {
        /// Input file path
        path: PathBuf,
    },
}

struct Session {
    store: Store,
    config: AppConfig,
}

fn open(cli: &Cli) -> Result<Session> {
    let data_dir = config::data_dir();
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("failed to create {}", data_dir.display()))?;

    let config = AppConfig::load(cli.config.as_deref(), &data_dir)?;
    let store = Store::open(&data_dir.join(config::DB_FILE)).context("failed to open trend store")?;
    Ok(Session { store, config })
}

fn load_tracker(ctx: &Session) -> Result<TrendTracker> {
    ctx.store
        .load_tracker(&ctx.config.tracker)
        .context("failed to load tracker state")
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Commands::Record { ids, at } => cmd_record(&cli, ids, *at),
        Commands::Top { ranked } => cmd_top(&cli, *ranked),
        Commands::Stats => cmd_stats(&cli),
        Commands::Feed => cmd_feed(&cli).await,
        Commands::Export { path } => cmd_export(&cli, path),
        Commands::Import { path } => cmd_import(&cli, path),
    }
}

fn cmd_record(cli: &Cli, ids: &[String], at: Option<WallTime>) -> Result<()> {
    // Reject empty identifiers before touching any state.
    let keys = ids
        .iter()
        .map(|id| ItemKey::new(id.as_str()).context("item id must not be empty"))
        .collect::<Result<Vec<_>>>()?;

    let ctx = open(cli)?;
    check_no_live_feed()?;
    let mut tracker = load_tracker(&ctx)?;
    let now = at.unwrap_or_else(now_unix_millis);

    for key in &keys {
        let outcome = tracker.record_activation(key, now);
        tracing::debug!(id = %key, ?outcome, "recorded activation");
        match outcome {
            Admission::Incremented => println!("{key}: incremented"),
            Admission::Inserted => println!("{key}: inserted"),
            Admission::Evicted { evicted } => println!("{key}: inserted, evicted {evicted}"),
            Admission::Rejected => println!("{key}: rejected"),
        }
    }

    ctx.store
        .save_tracker(&tracker)
        .context("failed to save tracker state")?;
    Ok(())
}

fn cmd_top(cli: &Cli, ranked: bool) -> Result<()> {
    let ctx = open(cli)?;
    let tracker = load_tracker(&ctx)?;

    if tracker.is_empty() {
        println!("(no trending items)");
        return Ok(());
    }

    if ranked {
        for item in tracker.ranked_items() {
            println!("{} {}", item.id, item.score);
        }
    } else {
        for id in tracker.current_top_items() {
            println!("{id}");
        }
    }
    Ok(())
}

fn cmd_stats(cli: &Cli) -> Result<()> {
    let ctx = open(cli)?;
    let tracker = load_tracker(&ctx)?;
    let clock = tracker.clock();

    println!("capacity:   {}", tracker.config().capacity);
    println!("tracked:    {}", tracker.len());
    println!("last_step:  {}", clock.last_step());
    println!("last_time:  {}", millis_to_iso8601(clock.last_wall_time()));
    Ok(())
}

async fn cmd_feed(cli: &Cli) -> Result<()> {
    let ctx = open(cli)?;
    check_no_live_feed()?;
    let shutdown = shutdown_signal().context("failed to install signal handlers")?;
    let tracker = SharedTracker::new(load_tracker(&ctx)?);
    tracing::info!("starting feed with {} tracked items", tracker.len());

    let pidfile = acquire_pidfile();
    let input = std::io::BufReader::new(std::io::stdin());
    let outcome = feed::run(&ctx.store, tracker, &ctx.config.feed, input, shutdown).await;

    if let Err(e) = ctx.store.checkpoint_truncate() {
        tracing::warn!("WAL checkpoint failed: {e}");
    }
    if let Some(path) = pidfile {
        release_pidfile(&path);
    }

    let summary = outcome?;
    println!(
        "feed done. recorded={}, rejected={}, skipped={}, flushes={}",
        summary.recorded, summary.rejected, summary.skipped, summary.flushes
    );
    Ok(())
}

/// Resolves on SIGINT or SIGTERM. Handlers are registered before returning,
/// so a signal arriving after this call is never missed.
#[cfg(unix)]
fn shutdown_signal() -> std::io::Result<impl Future<Output = ()>> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;
    Ok(async move {
        tokio::select! {
            _ = interrupt.recv() => {}
            _ = terminate.recv() => {}
        }
    })
}

#[cfg(not(unix))]
fn shutdown_signal() -> std::io::Result<impl Future<Output = ()>> {
    Ok(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    })
}

// ---------------------------------------------------------------------------
// Feed pidfile: one writer per data directory
// ---------------------------------------------------------------------------

fn pidfile_path() -> PathBuf {
    config::data_dir().join(config::PID_FILE)
}

/// PID of a running `trend feed` for this data directory, if any.
/// A pidfile left behind by a dead process is removed.
fn live_feed_pid() -> Option<u32> {
    let path = pidfile_path();
    let pid = std::fs::read_to_string(&path)
        .ok()?
        .trim()
        .parse::<u32>()
        .ok()?;

    if is_process_alive(pid) {
        Some(pid)
    } else {
        tracing::info!("cleaned up stale pidfile (PID {pid} is dead)");
        let _ = std::fs::remove_file(&path);
        None
    }
}

/// Refuse to write while a feed owns the in-memory state; its next flush
/// would overwrite our changes.
fn check_no_live_feed() -> Result<()> {
    match live_feed_pid() {
        Some(pid) => anyhow::bail!(
            "trend feed (PID {pid}) is running for this data directory; stop it first"
        ),
        None => Ok(()),
    }
}

fn acquire_pidfile() -> Option<PathBuf> {
    let path = pidfile_path();
    match std::fs::File::create(&path) {
        Ok(mut f) => {
            let _ = write!(f, "{}", std::process::id());
            tracing::info!("wrote pidfile: {}", path.display());
            Some(path)
        }
        Err(e) => {
            tracing::warn!("failed to write pidfile: {e}");
            None
        }
    }
}

fn release_pidfile(path: &Path) {
    let _ = std::fs::remove_file(path);
    tracing::info!("removed pidfile: {}", path.display());
}

#[cfg(unix)]
fn is_process_alive(pid: u32) -> bool {
    // kill(pid, 0) checks existence without sending a signal
    unsafe { libc::kill(pid as libc::pid_t, 0) == 0 }
}

#[cfg(not(unix))]
fn is_process_alive(_pid: u32) -> bool {
    // no liveness probe here: treat any pidfile as live
    true
}

fn cmd_export(cli: &Cli, path: &Path) -> Result<()> {
    let ctx = open(cli)?;
    ctx.store
        .export_json_file(path)
        .context("failed to export tracker state")?;
    println!("exported to {}", path.display());
    Ok(())
}

fn cmd_import(cli: &Cli, path: &Path) -> Result<()> {
    let ctx = open(cli)?;
    check_no_live_feed()?;
    ctx.store
        .import_json_file(path, &ctx.config.tracker)
        .context("failed to import JSON")?;

    let tracker = load_tracker(&ctx)?;
    println!(
        "imported from {}. tracked={}, last_step={}",
        path.display(),
        tracker.len(),
        tracker.clock().last_step()
    );
    Ok(())
}
