use std::io::{BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use floatfield_client::{Runner, Scenario, Viewport};
use floatfield_shared::SimulationSettings;

#[derive(Parser, Debug)]
#[command(author, version, about = "Headless float field simulation", long_about = None)]
struct Args {
    /// Scenario file (JSON) with viewport, elements, frame count and inputs
    #[arg(short, long)]
    scenario: Option<PathBuf>,

    /// Settings file (JSON); overrides the scenario's settings
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Number of randomly placed elements when the scenario lists none
    #[arg(short = 'n', long, default_value_t = 12)]
    elements: usize,

    /// Number of frames to simulate; overrides the scenario
    #[arg(short, long)]
    frames: Option<u64>,

    /// Seed for random element placement
    #[arg(long, default_value_t = 7)]
    seed: u64,

    /// Viewport width when no scenario is given
    #[arg(long, default_value_t = 1280.0)]
    width: f32,

    /// Viewport height when no scenario is given
    #[arg(long, default_value_t = 720.0)]
    height: f32,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

fn build_scenario(args: &Args) -> Result<Scenario> {
    let mut scenario = match &args.scenario {
        Some(path) => Scenario::load(path)?,
        None => Scenario {
            viewport: Viewport {
                width: args.width,
                height: args.height,
            },
            ..Scenario::default()
        },
    };

    if let Some(path) = &args.settings {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings {}", path.display()))?;
        scenario.settings = SimulationSettings::from_json(&json)
            .with_context(|| format!("Invalid settings {}", path.display()))?;
    }

    if let Some(frames) = args.frames {
        scenario.frames = frames;
    }

    if scenario.elements.is_empty() {
        if args.elements == 0 {
            anyhow::bail!("Nothing to simulate: the scenario lists no elements and --elements is 0");
        }
        log::info!(
            "Placing {} elements at random (seed {})",
            args.elements,
            args.seed
        );
        scenario.place_random_elements(args.elements, args.seed)?;
    }

    Ok(scenario)
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    if args.debug {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Debug)
            .init();
    } else {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Info)
            .init();
    }

    log::info!("Float field client starting...");

    let scenario = build_scenario(&args).context("Failed to prepare scenario")?;
    log::info!(
        "Viewport: {}x{}",
        scenario.viewport.width,
        scenario.viewport.height
    );

    let mut runner = Runner::new(&scenario)?;
    let stdout = std::io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    while let Some(report) = runner.next_frame() {
        serde_json::to_writer(&mut out, &report).context("Failed to write frame report")?;
        out.write_all(b"\n")?;
    }
    out.flush()?;

    log::info!("Simulated {} frames", runner.simulation().frame());
    Ok(())
}
