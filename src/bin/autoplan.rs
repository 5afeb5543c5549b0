//! autoplan - build an autonomous routine from a selection file and print or simulate it.

use anyhow::{Context, Result};
use clap::Parser;
use reef_auto::{
    AutoRoutineMaker, PathDirectory, PathStepResolver, SelectionSnapshot, SynthesisConfig,
    TimedFollower,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Build an autonomous routine the way the robot would at the start of a match.
#[derive(Parser, Debug)]
#[command(name = "autoplan", author, version, about)]
struct Args {
    /// Directory holding `<from> to <to>.path` files
    #[arg(short, long)]
    paths: PathBuf,

    /// Operator selections (TOML, or JSON with a `.json` extension); defaults when omitted
    #[arg(short, long)]
    selection: Option<PathBuf>,

    /// Synthesis config (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Run the routine against a simulated drivetrain instead of just printing it
    #[arg(long)]
    simulate: bool,

    /// Travel-time multiplier for the simulated drivetrain (0 to 1000)
    #[arg(long, default_value_t = 1.0, value_parser = parse_time_scale)]
    time_scale: f32,

    /// Log filter, e.g. `info` or `reef_auto=debug`
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

const MAX_TIME_SCALE: f32 = 1000.0;

fn parse_time_scale(raw: &str) -> std::result::Result<f32, String> {
    let scale: f32 = raw
        .parse()
        .map_err(|err| format!("'{raw}' is not a number: {err}"))?;
    if !(scale.is_finite() && (0.0..=MAX_TIME_SCALE).contains(&scale)) {
        return Err(format!(
            "time scale must be between 0 and {MAX_TIME_SCALE}, got {raw}"
        ));
    }
    Ok(scale)
}

fn load_selection(path: &Path) -> Result<SelectionSnapshot> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading selection {}", path.display()))?;
    let snapshot = if path.extension().is_some_and(|ext| ext == "json") {
        serde_json::from_str(&text)?
    } else {
        toml::from_str(&text)?
    };
    Ok(snapshot)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level)),
        )
        .init();

    let config = match &args.config {
        Some(path) => SynthesisConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => SynthesisConfig::default(),
    };

    let follower = Arc::new(TimedFollower::with_time_scale(args.time_scale));
    let resolver = PathStepResolver::new(
        Arc::new(PathDirectory::new(&args.paths)),
        follower.clone(),
    );
    let mut maker = AutoRoutineMaker::new(resolver, config);
    if let Some(path) = &args.selection {
        maker.apply(&load_selection(path)?);
    }

    let routine = maker.build_auto();
    print!("{routine}");

    if args.simulate {
        let started = tokio::time::Instant::now();
        routine.run().await;
        info!(
            seconds = started.elapsed().as_secs_f64(),
            "Routine finished"
        );
    }
    Ok(())
}
