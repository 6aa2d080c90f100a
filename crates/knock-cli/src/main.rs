mod collector;
mod screen;

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use knock_core::{Comparison, DurationSequence, KnockError, LockState, Transition};
use knock_store::{KnockHome, Lock, Settings, Store, StoreError};
use serde::Serialize;

use crate::collector::TapCollector;
use crate::screen::{Outcome, Screen};

#[derive(Parser)]
#[command(name = "knock", about = "Secret-knock lock: record a tap rhythm, knock it to unlock")]
struct Cli {
    /// Directory holding knock.db and knock.toml
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Override the idle timeout that ends a knock (ms)
    #[arg(long, global = true)]
    idle_timeout_ms: Option<u64>,

    /// Override the per-gap tolerance (ms)
    #[arg(long, global = true)]
    tolerance_ms: Option<u64>,

    /// Enable verbose debug output
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record a new knock from stdin (one tap per line) and lock
    Record,

    /// Knock on stdin until the lock opens
    Unlock,

    /// Lock again with a pattern retained from the last unlock
    Lock,

    /// Show lock state and the stored pattern
    Status {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Compare comma-separated gaps against the stored pattern without unlocking
    Check {
        /// Gaps in milliseconds, e.g. 400,400
        durations: String,
    },

    /// Forget the pattern and unlock
    Reset,
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

fn open_home(cli: &Cli) -> Result<(KnockHome, Settings)> {
    let base_dir = cli
        .data_dir
        .clone()
        .or_else(|| std::env::var("KNOCK_DATA_DIR").ok().map(PathBuf::from));
    let home = KnockHome::open(base_dir.as_deref()).context("failed to open knock home")?;

    let mut settings = home.settings().clone();
    if let Some(ms) = cli.idle_timeout_ms {
        if ms == 0 {
            bail!("--idle-timeout-ms must be greater than zero");
        }
        settings.idle_timeout_ms = ms;
    }
    if let Some(ms) = cli.tolerance_ms {
        settings.tolerance_ms = ms;
    }
    Ok((home, settings))
}

fn open_lock(cli: &Cli) -> Result<(Lock<Store>, Settings)> {
    let (home, settings) = open_home(cli)?;
    let lock = home.into_lock(&settings).context("failed to open lock")?;
    Ok((lock, settings))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Commands::Record => cmd_record(&cli).await,
        Commands::Unlock => cmd_unlock(&cli).await,
        Commands::Lock => cmd_lock(&cli),
        Commands::Status { json } => cmd_status(&cli, *json),
        Commands::Check { durations } => cmd_check(&cli, durations),
        Commands::Reset => cmd_reset(&cli),
    }
}

async fn cmd_record(cli: &Cli) -> Result<()> {
    let (lock, settings) = open_lock(cli)?;
    if lock.is_locked() {
        bail!("already locked; unlock or reset before recording a new knock");
    }
    run_screen(lock, &settings, "input ended before a knock was recorded").await
}

async fn cmd_unlock(cli: &Cli) -> Result<()> {
    let (lock, settings) = open_lock(cli)?;
    if !lock.is_locked() {
        bail!("not locked; record a knock first");
    }
    run_screen(lock, &settings, "input ended before the lock opened").await
}

async fn run_screen(lock: Lock<Store>, settings: &Settings, ended: &str) -> Result<()> {
    let collector = TapCollector::new(settings.idle_timeout());
    tracing::debug!(idle_timeout = ?collector.idle_timeout(), state = %lock.state(), "arming capture");
    let mut screen = Screen::new(lock, collector);
    let mut out = std::io::stdout();

    let outcome = tokio::select! {
        outcome = screen.run_with_input(std::io::BufReader::new(std::io::stdin()), &mut out) => outcome?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("interrupted, abandoning capture");
            println!("interrupted");
            return Ok(());
        }
    };

    match outcome {
        Outcome::Done(state) => {
            tracing::debug!(%state, "screen finished");
            Ok(())
        }
        Outcome::InputEnded => bail!("{ended}"),
        Outcome::Stopped(e) => Err(e).context("cannot unlock; run `knock reset` to start over"),
    }
}

fn cmd_lock(cli: &Cli) -> Result<()> {
    let (mut lock, _) = open_lock(cli)?;
    match lock.relock().context("failed to lock")? {
        Transition::Locked(pattern) => {
            println!("lock activated ({} taps)", pattern.tap_count());
            Ok(())
        }
        Transition::Rejected(e) => Err(e).context("no retained pattern; record a new knock"),
        Transition::Unlocked => bail!("lock unexpectedly opened"),
    }
}

#[derive(Serialize)]
struct Status<'a> {
    state: LockState,
    pattern: Option<DurationSequence>,
    pattern_error: Option<String>,
    settings: &'a Settings,
}

fn cmd_status(cli: &Cli, json: bool) -> Result<()> {
    let (lock, settings) = open_lock(cli)?;

    let (pattern, pattern_error) = match lock.patterns().retrieve() {
        Ok(p) => (Some(p), None),
        Err(StoreError::Knock(KnockError::NotFound)) => (None, None),
        Err(e) if !e.is_fatal() => (None, Some(e.to_string())),
        Err(e) => return Err(e).context("failed to read pattern"),
    };

    let status = Status {
        state: lock.state(),
        pattern,
        pattern_error,
        settings: &settings,
    };

    if json {
        let text = serde_json::to_string_pretty(&status).context("failed to serialize status")?;
        println!("{text}");
        return Ok(());
    }

    println!("state:      {}", status.state);
    match (&status.pattern, &status.pattern_error) {
        (Some(p), _) => {
            println!("taps:       {}", p.tap_count());
            println!("pattern:    {p}");
        }
        (None, Some(e)) => println!("pattern:    ({e})"),
        (None, None) => println!("pattern:    (none)"),
    }
    println!("timeout:    {}ms", settings.idle_timeout_ms);
    println!("tolerance:  {}ms", settings.tolerance_ms);
    println!(
        "retain:     {}",
        if settings.retain_on_unlock { "yes" } else { "no" }
    );
    Ok(())
}

fn cmd_check(cli: &Cli, durations: &str) -> Result<()> {
    let candidate: DurationSequence = durations
        .parse()
        .with_context(|| format!("invalid durations '{durations}'"))?;
    let (lock, _) = open_lock(cli)?;

    let comparison = lock
        .patterns()
        .compare(&candidate)
        .context("cannot compare")?;
    print_comparison(&mut std::io::stdout(), &comparison)?;
    Ok(())
}

fn print_comparison(out: &mut impl Write, cmp: &Comparison) -> Result<()> {
    if let Some(scale) = cmp.scale {
        writeln!(out, "scale: {scale:.3}")?;
        writeln!(out, "gap  stored  entered  scaled  deviation")?;
        for (i, g) in cmp.gaps.iter().enumerate() {
            writeln!(
                out,
                "{i:>3}  {:>6}  {:>7}  {:>6}  {:>9}",
                g.stored, g.entered, g.scaled, g.deviation
            )?;
        }
    }
    match &cmp.mismatch {
        None => writeln!(out, "result: match")?,
        Some(m) => writeln!(out, "result: no match ({m})")?,
    }
    Ok(())
}

fn cmd_reset(cli: &Cli) -> Result<()> {
    let (mut lock, _) = open_lock(cli)?;
    lock.reset().context("failed to reset lock")?;
    println!("lock reset");
    Ok(())
}
