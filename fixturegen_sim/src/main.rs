//! fixturegen CLI
//!
//! Render synthetic camera fixtures with ground truth from a YAML run config.

use clap::Parser;
use fixturegen_core::{FixtureError, RunConfig, TestCase};
use fixturegen_env::RaycastBackend;
use fixturegen_sim::{select_tests, PreparedScenario, PreviewLogger, ScenarioRunner};
use std::path::PathBuf;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

/// Synthetic pose-estimation fixture generator
#[derive(Parser, Debug)]
#[command(name = "fixturegen-sim")]
#[command(about = "Render camera fixtures and ground-truth pose logs from waypoint trajectories", long_about = None)]
struct Args {
    /// YAML run configuration
    #[arg(short, long)]
    config: PathBuf,

    /// Output directory (one sub-directory per test)
    #[arg(short, long, default_value = "output")]
    output: PathBuf,

    /// Run without the Rerun preview
    #[arg(long)]
    headless: bool,

    /// Only run the named test (repeatable)
    #[arg(long)]
    only: Vec<String>,

    /// Validate inputs and report frame counts without rendering
    #[arg(long)]
    dry_run: bool,

    /// JSON output for CI parsing
    #[arg(long)]
    json: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn dry_run(config: &RunConfig, tests: &[&TestCase], json: bool) -> Result<(), FixtureError> {
    let mut reports = Vec::with_capacity(tests.len());

    for case in tests {
        let prepared = PreparedScenario::load(case, config.framerate, config.waypoint_time_unit)?;
        info!(
            "{}: {} frames ({:.2}s) x {} cameras, {} fiducials",
            case.name,
            prepared.trajectory.len(),
            prepared.trajectory.duration_secs(),
            case.cameras.len(),
            prepared.map.len()
        );
        reports.push(serde_json::json!({
            "test": case.name,
            "frames": prepared.trajectory.len(),
            "cameras": case.cameras.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
            "fiducials": prepared.map.len(),
        }));
    }

    if json {
        let summary = serde_json::json!({
            "framerate": config.framerate,
            "tests": reports,
        });
        println!("{:#}", summary);
    }
    Ok(())
}

fn run(args: &Args) -> Result<(), FixtureError> {
    let config = RunConfig::load(&args.config)?;
    let tests = select_tests(&config.tests, &args.only)?;

    if args.dry_run {
        return dry_run(&config, &tests, args.json);
    }

    let preview = if args.headless {
        PreviewLogger::disabled()
    } else {
        PreviewLogger::new("fixturegen")
    };

    let backend = RaycastBackend::new(
        config.render.asset_dir.clone(),
        config.render.tag_size,
        config.video_format,
    )
    .with_texture_pattern(config.render.texture_pattern.clone());
    let mut runner = ScenarioRunner::from_config(backend, &config, &args.output).with_preview(preview);

    let summary = runner.run_all(tests)?;

    let summary_path = args.output.join("summary.json");
    summary.write_to_file(&summary_path)?;

    if args.json {
        match serde_json::to_string_pretty(&summary) {
            Ok(text) => println!("{}", text),
            Err(e) => error!("Failed to serialize summary: {}", e),
        }
    } else {
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        info!(
            "✅ {} tests, {} frames per camera in total -> {}",
            summary.results.len(),
            summary.total_frames(),
            args.output.display()
        );
    }

    Ok(())
}

fn main() {
    let args = Args::parse();

    // Initialize logging
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");

    if !args.json {
        info!("fixturegen v{}", env!("CARGO_PKG_VERSION"));
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    }

    // Exit with proper code for CI
    if let Err(e) = run(&args) {
        error!("❌ {}", e);
        std::process::exit(1);
    }
}
