use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;

use formicarium::api::{self, ApiState};
use formicarium::{Simulation, SimulationConfig};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Run in headless mode (HTTP API server)
    #[arg(long)]
    headless: bool,

    /// Port for headless API server
    #[arg(long, default_value_t = 8080)]
    port: u16,

    /// Configuration file path (YAML or JSON). If not specified, searches for config.yaml, config.yml, or config.json in current directory.
    #[arg(short, long)]
    config: Option<String>,

    /// Seed for the random source; overrides `world.rng_seed` from the config
    #[arg(long)]
    seed: Option<u64>,

    /// Batch mode: run this many ticks, then print final statistics as JSON
    #[arg(long, default_value_t = 3_600)]
    ticks: u64,

    /// Batch mode: log statistics every N ticks (0 disables)
    #[arg(long, default_value_t = 600)]
    report_every: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let mut config = load_config(args.config.as_deref())?;
    if let Some(seed) = args.seed {
        config.world.rng_seed = Some(seed);
    }

    let mut rng = match config.world.rng_seed {
        Some(seed) => {
            log::info!("seeding simulation with {seed}");
            StdRng::seed_from_u64(seed)
        }
        None => StdRng::from_entropy(),
    };
    let sim = Simulation::with_config(&mut rng, config)?;

    if args.headless {
        api::run_server(ApiState::with_rng(sim, rng), args.port).await
    } else {
        run_batch(sim, &mut rng, args.ticks, args.report_every)
    }
}

/// Load configuration from file or use default
fn load_config(config_path: Option<&str>) -> Result<SimulationConfig, Box<dyn std::error::Error>> {
    if let Some(path) = config_path {
        SimulationConfig::from_file(path)
            .map_err(|e| format!("Failed to load config from {}: {}", path, e).into())
    } else {
        Ok(SimulationConfig::from_default_paths())
    }
}

fn run_batch(
    mut sim: Simulation,
    rng: &mut StdRng,
    ticks: u64,
    report_every: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    log::info!("running {ticks} ticks");
    for _ in 0..ticks {
        sim.tick(rng);
        if report_every > 0 && sim.tick % report_every == 0 {
            let stats = sim.stats();
            log::info!(
                "tick {}: {} ants, {} food clusters ({:.0} food), {} spiders, {} caterpillars",
                stats.tick,
                stats.total_ants(),
                stats.food_clusters,
                stats.total_food,
                stats.spiders,
                stats.caterpillars
            );
        }
    }
    println!("{}", serde_json::to_string_pretty(&sim.stats())?);
    Ok(())
}
