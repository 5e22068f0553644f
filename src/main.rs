use anyhow::Result;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::time::Instant;
use log::{info, warn, error, debug, trace};

// Define modules used by main
mod aggregate;
mod deposition;
mod grid;
mod output;
mod run_state;
mod simulation;

use adsorption_common::{resolve_inputs, RawInputs, SimulationConfig};
use simulation::AdsorptionSimulation;

/// Simulates gas adsorption on a sensor surface and the resulting resistance change.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Surface type: nanorod, nanoflake or nanoparticle
    #[arg(long, default_value = "nanorod")]
    surface: String,

    /// Gas flow rate (SCCM)
    #[arg(long, allow_hyphen_values = true)]
    flow_rate: String,

    /// Sticking coefficient (0-1)
    #[arg(long, allow_hyphen_values = true)]
    sticking: String,

    /// Baseline resistance R0 (Ohms)
    #[arg(long, allow_hyphen_values = true)]
    r0: String,

    /// Sensitivity coefficient k
    #[arg(long, allow_hyphen_values = true)]
    k: String,

    /// Path to the config.toml file
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// Directory for the run record and CSV exports
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Overrides the RNG seed from the config
    #[arg(long)]
    seed: Option<u64>,
}

fn load_config(path: &Path) -> Result<SimulationConfig> {
    if path.exists() {
        let config = SimulationConfig::load(path)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    } else {
        warn!("Config file '{}' not found. Using default configuration.", path.display());
        Ok(SimulationConfig::default())
    }
}

fn main() -> Result<()> {
    // Initialize the logger
    env_logger::init();
    let args = Args::parse();

    info!("Starting Adsorption Simulation Engine...");

    // --- Resolve Parameters ---
    let raw = RawInputs {
        surface: args.surface.clone(),
        flow_rate: args.flow_rate.clone(),
        sticking_coefficient: args.sticking.clone(),
        baseline_resistance: args.r0.clone(),
        sensitivity: args.k.clone(),
    };
    let parameters = match resolve_inputs(&raw) {
        Ok(parameters) => parameters,
        Err(e) => {
            error!("Input validation failed: {:?}", raw);
            println!("{}", e);
            std::process::exit(2);
        }
    };

    // --- Load Configuration ---
    let mut config = load_config(&args.config)?;
    if let Some(seed) = args.seed {
        config.run.seed = Some(seed);
    }
    debug!("Configuration: {:#?}", config);

    // --- Run Simulation ---
    println!("Simulation running...");
    let mut sim = AdsorptionSimulation::new(config)?;
    let start_time = Instant::now();
    let record = sim.run(parameters, |snapshot| {
        trace!(
            "Frame {} ready ({:.1} s, grid max {:.3e})",
            snapshot.frame,
            snapshot.elapsed_s,
            snapshot.grid.max()
        );
    })?;
    info!(
        "Simulation finished in {:.3} seconds.",
        start_time.elapsed().as_secs_f64()
    );

    if sim.point_cloud().is_empty() {
        warn!("No molecules adsorbed during the run; resistance stays at the baseline.");
    }

    // --- Save Recorded Data ---
    info!("Saving recorded data...");
    let record_path = output::save_all(&record, sim.point_cloud(), &sim.config().output, &args.output_dir)?;

    println!(
        "Simulation data saved to {}. Render it with adsorption-visualizer --input {}",
        record_path.display(),
        record_path.display()
    );
    info!("Simulation Complete.");
    Ok(())
}
