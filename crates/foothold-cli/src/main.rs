//! `foothold` – terrain evaluation dry-run CLI.
//!
//! Loads a [`TerrainConfig`] (`$FOOTHOLD_CONFIG` or `./foothold.toml`,
//! defaults when absent), rasterizes a synthetic corridor with a step into
//! an occupancy octree, then walks a robot along it, running one planning
//! cycle per stride and printing what the planner would see.
//!
//! Ctrl-C stops the walk after the current cycle.

mod terrain;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use colored::Colorize;
use foothold_runtime::config::{self, TerrainConfig};
use foothold_runtime::{CycleSummary, PlanningSession, init_tracing};
use foothold_types::RobotPose;
use tracing::{info, warn};

use crate::terrain::Corridor;

// ─────────────────────────────────────────────────────────────────────────────
// Arguments
// ─────────────────────────────────────────────────────────────────────────────

/// Terrain evaluation dry run over a synthetic corridor.
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "foothold", version, about, long_about = None)]
struct CliArgs {
    /// Terrain config file (default: $FOOTHOLD_CONFIG or ./foothold.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Planning cycles to run
    #[arg(long, default_value_t = 20)]
    cycles: u32,

    /// Distance walked between cycles (metres)
    #[arg(long, default_value_t = 0.1, value_parser = parse_metres)]
    stride: f64,

    /// x position of the corridor step (metres)
    #[arg(long, default_value_t = 2.0, value_parser = parse_metres)]
    step_at: f64,

    /// Write the effective configuration to this path and exit
    #[arg(long)]
    write_config: Option<PathBuf>,

    /// Print the configuration JSON schema and exit
    #[arg(long)]
    schema: bool,
}

fn parse_metres(raw: &str) -> Result<f64, String> {
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(format!("'{raw}' is not a finite distance")),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Entry point
// ─────────────────────────────────────────────────────────────────────────────

fn main() -> ExitCode {
    let args = CliArgs::parse();
    if args.schema {
        return match config::config_schema() {
            Ok(schema) => {
                println!("{schema}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("{}: {e}", "error".red().bold());
                ExitCode::FAILURE
            }
        };
    }

    let _guard = init_tracing("foothold");
    print_banner();

    let cfg = match load_config(args.config.clone()) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("{}: {e}", "Config error".red());
            return ExitCode::FAILURE;
        }
    };

    if let Some(path) = &args.write_config {
        return match config::save_to(&cfg, path) {
            Ok(()) => {
                println!("  {} Config written to {}", "✓".green().bold(), path.display().to_string().bold());
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("{}: {e}", "Error writing config".red());
                ExitCode::FAILURE
            }
        };
    }

    // ── Shutdown flag ─────────────────────────────────────────────────────
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = shutdown.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – stopping after the current cycle …".yellow().bold());
        shutdown_clone.store(true, Ordering::SeqCst);
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler");
    }

    match run_walk(&cfg, &args, &shutdown) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}: {e}", "error".red().bold());
            ExitCode::FAILURE
        }
    }
}

fn load_config(path: Option<PathBuf>) -> Result<TerrainConfig, foothold_types::FootholdError> {
    let path = path.unwrap_or_else(config::config_path);
    match config::load_from(&path)? {
        Some(cfg) => {
            println!("  Config loaded from {}", path.display().to_string().bold());
            Ok(cfg)
        }
        None => {
            println!("  No config at {}; using defaults.", path.display().to_string().dimmed());
            let mut cfg = TerrainConfig::default();
            config::apply_env_overrides(&mut cfg);
            Ok(cfg)
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Walk
// ─────────────────────────────────────────────────────────────────────────────

fn run_walk(
    cfg: &TerrainConfig,
    args: &CliArgs,
    shutdown: &AtomicBool,
) -> Result<(), foothold_types::FootholdError> {
    let reach = cfg
        .search_areas
        .iter()
        .map(|a| a.max_x)
        .fold(0.0_f64, f64::max);
    let length = f64::from(args.cycles) * args.stride + reach + 1.0;
    let corridor = Corridor::new(length, 1.5).with_step(args.step_at, 0.12);
    let octree = corridor.build(cfg.resolution);
    info!(leaves = octree.len(), length, "synthetic corridor ready");

    let mut session = PlanningSession::new(cfg)?;
    println!(
        "\n  Walking {} cycles at {} m stride (step at x = {} m)\n",
        args.cycles.to_string().bold(),
        args.stride,
        args.step_at
    );

    // Half a cell offset keeps samples on cell centres.
    let offset = cfg.resolution / 2.0;
    for i in 0..args.cycles {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }
        let pose = RobotPose::new(f64::from(i) * args.stride + offset, offset, 0.0, 0.0);
        match session.cycle(&octree, &pose) {
            Ok(summary) => print_cycle(&summary, &pose, &session),
            Err(e) => println!("  {} {:>3}  {}", "✗".red().bold(), i + 1, e.to_string().red()),
        }
    }

    println!(
        "\n  {} {} cycles, {} rewarded cells retained.\n",
        "✓".green().bold(),
        session.cycles(),
        session.reward_map().reward_table().len()
    );
    Ok(())
}

fn print_cycle(summary: &CycleSummary, pose: &RobotPose, session: &PlanningSession) {
    let table = session.reward_map().reward_table();
    let worst = table
        .values()
        .map(|c| c.reward)
        .fold(f64::INFINITY, f64::min);
    let worst = if worst.is_finite() { worst } else { 0.0 };

    let marker = if summary.report.warnings.is_empty() {
        "●".green()
    } else {
        "●".yellow()
    };
    println!(
        "  {} {:>3}  x={:<6.2} evaluated {:>4}  pruned {:>4}  degraded {:>3}  graph {:>5}v/{:>5}e  worst {:+.3}",
        marker,
        summary.cycle,
        pose.x,
        summary.report.evaluated,
        summary.report.pruned,
        summary.report.degraded,
        summary.vertices,
        summary.edges,
        worst
    );
    for warning in &summary.report.warnings {
        println!("        {}", warning.to_string().yellow());
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Banner
// ─────────────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("  {} {}", "foothold".bold().cyan(), format!("v{}", env!("CARGO_PKG_VERSION")).dimmed());
    println!("  Terrain reward mapping for legged locomotion");
    println!();
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Result<CliArgs, clap::Error> {
        CliArgs::try_parse_from(std::iter::once("foothold").chain(list.iter().copied()))
    }

    #[test]
    fn no_arguments_gives_defaults() {
        let parsed = args(&[]).unwrap();
        assert_eq!(parsed.config, None);
        assert_eq!(parsed.cycles, 20);
        assert_eq!(parsed.stride, 0.1);
        assert_eq!(parsed.step_at, 2.0);
        assert_eq!(parsed.write_config, None);
        assert!(!parsed.schema);
    }

    #[test]
    fn parses_all_options() {
        let parsed = args(&[
            "--config", "robot.toml", "--cycles", "5", "--stride", "0.2", "--step-at", "1.0",
            "--schema",
        ])
        .unwrap();
        assert_eq!(parsed.config, Some(PathBuf::from("robot.toml")));
        assert_eq!(parsed.cycles, 5);
        assert_eq!(parsed.stride, 0.2);
        assert_eq!(parsed.step_at, 1.0);
        assert!(parsed.schema);
    }

    #[test]
    fn rejects_bad_input() {
        use clap::error::ErrorKind;

        assert!(args(&["--cycles"]).is_err());
        assert!(args(&["--cycles", "-3"]).is_err());
        assert_eq!(
            args(&["--stride", "NaN"]).unwrap_err().kind(),
            ErrorKind::ValueValidation
        );
        assert_eq!(args(&["--fly"]).unwrap_err().kind(), ErrorKind::UnknownArgument);
    }

    #[test]
    fn help_is_generated() {
        let err = args(&["--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
        assert!(err.to_string().contains("--step-at"));
    }

    #[test]
    fn walk_runs_against_default_config() {
        let cfg = TerrainConfig {
            resolution: 0.1,
            search_areas: vec![foothold_types::SearchArea::new(0.5, 1.5, -0.5, 0.5, -0.8, -0.3, 0.1)],
            ..TerrainConfig::default()
        };
        let cli = args(&["--cycles", "3"]).unwrap();
        let shutdown = AtomicBool::new(false);
        assert!(run_walk(&cfg, &cli, &shutdown).is_ok());
    }

    #[test]
    fn load_config_reads_given_file() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("foothold.toml");
        std::fs::write(&path, "search_radius_cells = 7\n").unwrap();
        let cfg = load_config(Some(path)).unwrap();
        assert_eq!(cfg.search_radius_cells, 7);
    }
}
